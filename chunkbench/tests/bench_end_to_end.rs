//! End-to-end benchmark runs against temporary directories.
#![allow(missing_docs)]

use std::path::Path;

use chunkbench::bench::{
    self, run_with_output, BenchError, BenchmarkConfig, ConfigError, RunResult, WriteStrategy,
};
use serial_test::serial;

fn config(dir: &Path, name: &str, strategy: WriteStrategy, sentinel: u8) -> BenchmarkConfig {
    BenchmarkConfig::builder()
        .nx(64)
        .ny(32)
        .n_images(100)
        .chunk_size(10)
        .basename(dir.join(name))
        .strategy(strategy)
        .sentinel(sentinel)
        .build()
        .unwrap()
}

fn run_quiet(config: &BenchmarkConfig) -> (RunResult, String) {
    let mut out = Vec::new();
    let result = run_with_output(config, &mut out).unwrap();
    (result, String::from_utf8(out).unwrap())
}

#[test]
fn bench_scenario_a() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "scenario_a", WriteStrategy::Direct, 42);
    let (result, report) = run_quiet(&config);

    assert_eq!(result.ncalls, 10);
    assert_eq!(result.total_bytes, 204_800);
    assert_eq!(result.raw_file_size, 204_800);
    assert_eq!(
        std::fs::metadata(config.raw_path()).unwrap().len(),
        204_800
    );
    assert!(std::fs::read(config.raw_path()).unwrap().iter().all(|&byte| byte == 42));
    assert!(result.container_file_size > result.raw_file_size);
    assert_eq!(
        std::fs::metadata(config.container_path()).unwrap().len(),
        result.container_file_size
    );

    // One forward call per chunk write, one reverse call for the read-back
    assert_eq!(result.filter_calls.forward, 10);
    assert_eq!(result.filter_calls.reverse, 1);

    assert!(report.contains("#PARAM ncalls            : 10\n"));
    assert!(report.contains("#PARAM array shape       : (z=100,y=32,x=64)\n"));
    assert!(report.contains("#PARAM chunk shape       : (z=10,y=32,x=64)\n"));
    assert!(report.contains("#PARAM hostname"));
    assert!(report.contains("# read-back of the first chunk verified\n"));
    assert!(report.contains("#RESULTS raw filesize [Byte]         : 204800\n"));

    let metrics = result.metrics();
    assert!(metrics.relative_performance > 0.0);
    assert!(
        (metrics.overhead_per_chunk_us - metrics.overhead / 10.0 * 1e6).abs() < 1e-6
    );
}

#[test]
fn bench_scenario_a_container_contents() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "contents", WriteStrategy::Direct, 7);
    run_quiet(&config);

    let registry = chunkbench_codec::FilterRegistry::new();
    let storage = std::sync::Arc::new(
        chunkbench_storage::store::FileStore::open_read_only(config.container_path()).unwrap(),
    );
    let container = chunkbench::container::Container::open(storage, &registry).unwrap();
    assert_eq!(container.name(), "data");
    assert_eq!(container.shape(), &[100, 32, 64]);
    assert_eq!(container.chunk_shape(), vec![10, 32, 64]);
    assert_eq!(container.num_chunks(), 10);
    assert_eq!(container.shape().iter().product::<u64>(), 100 * 64 * 32);
    let bytes = container
        .retrieve_array_subset(&container.subset_all())
        .unwrap();
    assert!(bytes.iter().all(|&byte| byte == 7));
}

#[test]
fn bench_scenario_b_not_multiple() {
    let dir = tempfile::tempdir().unwrap();
    let result = BenchmarkConfig::builder()
        .n_images(100)
        .chunk_size(7)
        .basename(dir.path().join("scenario_b"))
        .build();
    assert!(matches!(
        result,
        Err(ConfigError::NotMultipleOfChunkSize {
            n_images: 100,
            chunk_size: 7
        })
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn bench_scenario_c_dimension_bound() {
    let dir = tempfile::tempdir().unwrap();
    let result = BenchmarkConfig::builder()
        .nx(9000)
        .basename(dir.path().join("scenario_c"))
        .build();
    assert!(matches!(
        result,
        Err(ConfigError::DimensionTooLarge { nx: 9000, .. })
    ));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn bench_scenario_d_identical_containers() {
    let dir = tempfile::tempdir().unwrap();
    let direct = config(dir.path(), "direct", WriteStrategy::Direct, 42);
    let traditional = config(dir.path(), "traditional", WriteStrategy::Traditional, 42);
    let (direct_result, _) = run_quiet(&direct);
    let (traditional_result, _) = run_quiet(&traditional);

    assert_eq!(
        std::fs::read(direct.container_path()).unwrap(),
        std::fs::read(traditional.container_path()).unwrap()
    );
    assert_eq!(
        direct_result.container_file_size,
        traditional_result.container_file_size
    );
    assert_eq!(traditional_result.filter_calls.forward, 10);
}

#[test]
fn bench_round_trip_sentinels() {
    let dir = tempfile::tempdir().unwrap();
    for (sentinel, strategy) in [
        (0, WriteStrategy::Direct),
        (255, WriteStrategy::Traditional),
        (128, WriteStrategy::Direct),
    ] {
        let config = BenchmarkConfig::builder()
            .nx(5)
            .ny(3)
            .n_images(6)
            .chunk_size(2)
            .basename(dir.path().join(format!("sentinel_{sentinel}")))
            .strategy(strategy)
            .sentinel(sentinel)
            .node_info(false)
            .cpu_time(false)
            .build()
            .unwrap();
        let (result, report) = run_quiet(&config);
        assert_eq!(result.raw_file_size, 6 * 5 * 3);
        assert_eq!(result.raw.cpu, None);
        assert!(!report.contains("#PARAM hostname"));
        assert!(!report.contains("cpu time"));
    }
}

#[test]
fn bench_removes_stale_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "stale", WriteStrategy::Direct, 42);
    std::fs::write(config.container_path(), b"stale container").unwrap();
    std::fs::write(config.raw_path(), vec![0; 1_000_000]).unwrap();
    let (result, _) = run_quiet(&config);
    assert_eq!(result.raw_file_size, 204_800);
}

#[test]
fn bench_json_record() {
    let dir = tempfile::tempdir().unwrap();
    let json = dir.path().join("results.jsonl");
    let mut builder = BenchmarkConfig::builder();
    builder
        .nx(8)
        .ny(8)
        .n_images(4)
        .chunk_size(2)
        .basename(dir.path().join("json"))
        .json(Some(json.clone()));
    let config = builder.build().unwrap();
    run_quiet(&config);
    run_quiet(&config);

    let text = std::fs::read_to_string(&json).unwrap();
    let records: Vec<serde_json::Value> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["result"]["ncalls"], 2);
    assert_eq!(records[0]["result"]["raw_file_size"], 8 * 8 * 4);
    assert!(records[0]["host"]["hostname"].is_string());
    assert!(records[1]["metrics"]["relative_performance"].is_number());
}

#[test]
fn bench_output_directory_missing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(
        &dir.path().join("missing"),
        "out",
        WriteStrategy::Direct,
        42,
    );
    let mut out = Vec::new();
    assert!(matches!(
        run_with_output(&config, &mut out),
        Err(BenchError::RawIo { .. })
    ));
}

#[test]
#[serial]
fn bench_passthrough_logs_once_per_run() {
    testing_logger::setup();
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path(), "logs", WriteStrategy::Traditional, 42);
    run_quiet(&config);

    testing_logger::validate(|captured_logs| {
        let first_calls: Vec<&str> = captured_logs
            .iter()
            .filter(|log| log.body.starts_with("passthrough filter called"))
            .map(|log| log.body.as_str())
            .collect();
        assert_eq!(
            first_calls,
            vec![
                "passthrough filter called for the first time in forward direction",
                "passthrough filter called for the first time in reverse direction",
            ]
        );
    });
}

#[test]
#[serial]
fn bench_run_prints_report() {
    // `run` writes to stdout, only the outcome is checked here
    let dir = tempfile::tempdir().unwrap();
    let mut builder = BenchmarkConfig::builder();
    builder
        .nx(4)
        .ny(4)
        .n_images(2)
        .chunk_size(1)
        .basename(dir.path().join("stdout"));
    let result = bench::run(&builder.build().unwrap()).unwrap();
    assert_eq!(result.ncalls, 2);
}
