use genflux::config::{self, ConfigFile};
use genflux::error::Result;
use genflux::planner;
use genflux::replay::{self, link::InterfaceSender, pacing::HybridSpin};
mod cmd;

use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = cmd::Args::parse();
    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}

fn run(args: cmd::Args) -> Result<()> {
    let file = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ConfigFile::default(),
    };
    match args.command {
        cmd::Command::Pcap {
            command: cmd::PcapCommand::Gen(gen),
        } => {
            let config = gen.into_config(file.generation)?;
            log::debug!("Generation configuration: {config:?}");
            let report = planner::generate(&config)?;
            for f in report.files.iter() {
                log::info!(
                    "{}: {} packets, {} bytes",
                    f.path.display(),
                    f.packets,
                    f.bytes
                );
            }
            log::info!(
                "{} file(s) generated, {} packets (seed {})",
                report.files.len(),
                report.total_packets(),
                report.seed
            );
        }
        cmd::Command::Replay(args) => {
            let config = args.into_config(file.replay)?;
            config.validate()?;

            // Handle ctrl+C
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                if r.load(Ordering::Relaxed) {
                    log::warn!("Ending the replay");
                    r.store(false, Ordering::Relaxed);
                } else {
                    log::warn!("Ending immediately");
                    process::abort();
                }
            }) {
                log::warn!("Cannot set the Ctrl-C handler: {e}");
            }

            let mut sender = InterfaceSender::bind(&config.interface)?;
            log::info!("Bound to {}", sender.name());
            replay::replay(&config, &mut sender, &HybridSpin::default(), &running)?;
        }
    }
    Ok(())
}
