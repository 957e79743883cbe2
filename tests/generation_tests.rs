use genflux::config::{parse_start_time, GenerationConfig, Output};
use genflux::error::{BudgetError, Error};
use genflux::export::open_capture;
use genflux::planner::generate;
use genflux::structs::CaptureRecord;

use pcap_file::pcap::PcapReader;
use pcap_file::DataLink;
use std::fs::{self, File};
use std::time::Duration;
use tempfile::tempdir;

fn base_config(output: Output) -> GenerationConfig {
    GenerationConfig {
        output,
        seed: 42,
        start_time: parse_start_time("2016-10-02T00:00:00Z").unwrap(),
        ..Default::default()
    }
}

#[test]
fn fifty_flows_exact_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flows.pcap");
    let config = GenerationConfig {
        internal_hosts: 10,
        external_hosts: 10,
        exact_size: Some(24 + 50 * 78),
        flow_count: 50,
        packets_per_flow: Some(1),
        ..base_config(Output::File(path.clone()))
    };
    let report = generate(&config).unwrap();
    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].packets, 50);
    assert_eq!(fs::metadata(&path).unwrap().len(), 24 + 50 * 78);

    // read back with the pcap library directly
    let mut reader = PcapReader::new(File::open(&path).unwrap()).unwrap();
    assert_eq!(reader.header().snaplen, 65535);
    assert_eq!(reader.header().datalink, DataLink::ETHERNET);
    let mut count = 0;
    while let Some(packet) = reader.next_packet() {
        assert_eq!(packet.unwrap().data.len(), 62);
        count += 1;
    }
    assert_eq!(count, 50);
}

#[test]
fn random_mode_exact_size() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("random.pcap");
    let config = GenerationConfig {
        exact_size: Some(1 << 20),
        ..base_config(Output::File(path.clone()))
    };
    let report = generate(&config).unwrap();
    assert_eq!(report.files[0].bytes, 1 << 20);
    assert_eq!(fs::metadata(&path).unwrap().len(), 1 << 20);
    assert_eq!(report.total_packets(), ((1 << 20) - 24) / 78);

    let records: Vec<CaptureRecord> = open_capture(&path)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert!(records.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    let start = Duration::from_secs(1_475_366_400);
    let end = start + report.files[0].duration;
    assert!(records.iter().all(|r| r.timestamp >= start));
    // the last gaps may overshoot the window by a few seconds at most
    assert!(records.last().unwrap().timestamp < end + Duration::from_secs(5));
}

#[test]
fn max_size_bounds_random_mode() {
    let dir = tempdir().unwrap();
    let config = GenerationConfig {
        max_size: 100_000,
        ..base_config(Output::Directory(dir.path().to_path_buf()))
    };
    let report = generate(&config).unwrap();
    assert_eq!(report.files[0].path, dir.path().join("generated_0000.pcap"));
    assert_eq!(report.files[0].packets, (100_000 - 24) / 78);
    assert!(report.files[0].bytes <= 100_000);
}

#[test]
fn multiple_files_follow_each_other() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("nested").join("dir");
    let config = GenerationConfig {
        file_count: 4,
        max_size: 10_000,
        ..base_config(Output::Directory(out.clone()))
    };
    let report = generate(&config).unwrap();
    assert_eq!(report.files.len(), 4);
    for (i, file) in report.files.iter().enumerate() {
        assert_eq!(file.path, out.join(format!("generated_{i:06}.pcap")));
        assert!(file.path.exists());
        // diurnal durations are whole seconds of at most 480s
        assert_eq!(file.duration.subsec_nanos(), 0);
        assert!(file.duration <= Duration::from_secs(480));
    }
    for pair in report.files.windows(2) {
        assert_eq!(
            pair[1].start_time.timestamp() - pair[0].start_time.timestamp(),
            pair[0].duration.as_secs() as i64
        );
    }
}

#[test]
fn same_seed_same_files() {
    let dir = tempdir().unwrap();
    let run = |name: &str, seed: u64| {
        let path = dir.path().join(name);
        let config = GenerationConfig {
            seed,
            flow_count: 30,
            ..base_config(Output::File(path.clone()))
        };
        generate(&config).unwrap();
        fs::read(path).unwrap()
    };
    assert_eq!(run("a.pcap", 1), run("b.pcap", 1));
    assert_ne!(run("a.pcap", 1), run("c.pcap", 2));
}

#[test]
fn budget_errors_write_nothing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("never.pcap");
    let config = GenerationConfig {
        flow_count: 100,
        packets_per_flow: Some(3),
        exact_size: Some(1000),
        ..base_config(Output::File(path.clone()))
    };
    match generate(&config) {
        Err(Error::Budget(BudgetError::BelowFlowMinimum {
            required,
            flow_count,
            packets_per_flow,
            ..
        })) => {
            assert_eq!(required, 24 + 300 * 78);
            assert_eq!((flow_count, packets_per_flow), (100, 3));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    assert!(!path.exists());

    let config = GenerationConfig {
        exact_size: Some(50),
        ..base_config(Output::File(path.clone()))
    };
    assert!(matches!(
        generate(&config),
        Err(Error::Budget(BudgetError::TooSmall { .. }))
    ));
    assert!(!path.exists());

    let config = GenerationConfig {
        flow_count: 50,
        packets_per_flow: Some(u64::MAX / 10),
        ..base_config(Output::File(path.clone()))
    };
    assert!(matches!(
        generate(&config),
        Err(Error::Budget(BudgetError::SizeOverflow { .. }))
    ));
    assert!(!path.exists());
}

#[test]
fn capacity_errors() {
    let dir = tempdir().unwrap();
    let config = GenerationConfig {
        internal_hosts: 70_000,
        flow_count: 1,
        ..base_config(Output::Directory(dir.path().to_path_buf()))
    };
    assert!(matches!(generate(&config), Err(Error::Capacity(_))));
}
