//! Diurnal activity profile, used to give consecutive files a plausible day/night shape

/// Duration of a file at full activity, in seconds
pub const REFERENCE_DURATION_SECS: f64 = 480.;

// One knot per hour, plus a closing knot at 24h. The curves encode a dip during business hours:
// the activity is obtained by inverting them.
const WEEKDAY_CURVE: [f64; 25] = [
    0., 0.4, 0., 0., 0., 0., 0., 0.1, 0.2, 0.4, 0.95, 0.9, 0.9, 0.95, 0.9, 0.9, 0.9, 0.9, 0.95,
    0.4, 0.1, 0., 0., 0., 0.,
];
const WEEKEND_CURVE: [f64; 25] = [
    0., 0.4, 0., 0., 0., 0., 0., 0., 0.1, 0.2, 0.5, 0.45, 0.45, 0.5, 0.45, 0.45, 0.45, 0.45, 0.5,
    0.2, 0., 0., 0., 0., 0.,
];

/// Natural cubic spline through a set of knots with strictly increasing abscissas
#[derive(Debug, Clone)]
pub struct CubicSpline {
    x: Vec<f64>,
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl CubicSpline {
    /// Fit a natural spline (zero second derivative at both ends).
    ///
    /// # Panics
    ///
    /// Panics if `x` and `y` have different lengths, or if there are fewer than two knots.
    pub fn natural(x: &[f64], y: &[f64]) -> Self {
        assert_eq!(x.len(), y.len(), "as many abscissas as ordinates");
        assert!(x.len() >= 2, "a spline needs at least two knots");
        let n = x.len();
        let a = y.to_vec();
        let mut b = vec![0.; n];
        let mut c = vec![0.; n];
        let mut d = vec![0.; n];

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let mut alpha = vec![0.; n - 1];
        for i in 1..n - 1 {
            alpha[i] = 3. / h[i] * (a[i + 1] - a[i]) - 3. / h[i - 1] * (a[i] - a[i - 1]);
        }

        // tridiagonal system, forward sweep
        let mut l = vec![1.; n];
        let mut mu = vec![0.; n];
        let mut z = vec![0.; n];
        for i in 1..n - 1 {
            l[i] = 2. * (x[i + 1] - x[i - 1]) - h[i - 1] * mu[i - 1];
            mu[i] = h[i] / l[i];
            z[i] = (alpha[i] - h[i - 1] * z[i - 1]) / l[i];
        }

        // back substitution
        for j in (0..n - 1).rev() {
            c[j] = z[j] - mu[j] * c[j + 1];
            b[j] = (a[j + 1] - a[j]) / h[j] - h[j] * (c[j + 1] + 2. * c[j]) / 3.;
            d[j] = (c[j + 1] - c[j]) / (3. * h[j]);
        }

        CubicSpline {
            x: x.to_vec(),
            a,
            b,
            c,
            d,
        }
    }

    /// Evaluate the spline. Values outside the knots are clamped to the first/last knot value.
    pub fn eval(&self, x: f64) -> f64 {
        let n = self.x.len();
        if x <= self.x[0] {
            return self.a[0];
        }
        if x >= self.x[n - 1] {
            return self.a[n - 1];
        }
        // index of the last knot lower than x
        let idx = self.x.partition_point(|&k| k <= x) - 1;
        let dx = x - self.x[idx];
        self.a[idx] + self.b[idx] * dx + self.c[idx] * dx * dx + self.d[idx] * dx * dx * dx
    }
}

/// The activity profiles of weekdays and weekends
#[derive(Debug, Clone)]
pub struct DiurnalProfile {
    weekday: CubicSpline,
    weekend: CubicSpline,
}

impl Default for DiurnalProfile {
    fn default() -> Self {
        let hours: Vec<f64> = (0..=24).map(f64::from).collect();
        DiurnalProfile {
            weekday: CubicSpline::natural(&hours, &WEEKDAY_CURVE),
            weekend: CubicSpline::natural(&hours, &WEEKEND_CURVE),
        }
    }
}

impl DiurnalProfile {
    /// Activity scalar in [0,1] for a decimal hour in [0,24). Hours outside that range have no
    /// activity.
    pub fn activity(&self, hour: f64, weekend: bool) -> f64 {
        if !(0. ..24.).contains(&hour) {
            return 0.;
        }
        // the day boundary is moved to a low-traffic point
        let hour = (hour + 1.) % 24.;
        let spline = if weekend { &self.weekend } else { &self.weekday };
        (1. - spline.eval(hour)).clamp(0., 1.)
    }

    /// Duration of a file starting at that time of day
    pub fn scaled_duration_secs(&self, hour: f64, weekend: bool) -> u64 {
        (REFERENCE_DURATION_SECS * self.activity(hour, weekend)) as u64
    }
}
