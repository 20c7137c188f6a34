//! Derived metrics and report output.
//!
//! The text report is a block of `#PARAM` lines before the run and `#RESULTS` lines after it, one value per line.
//! Its labels are kept stable for log scraping.
//! The JSON record is the machine-readable form, one object per line appended to a file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use super::config::{BenchmarkConfig, WriteStrategy};
use super::host::HostInfo;
use super::timing::TimingSample;

const MIB: f64 = 1024.0 * 1024.0;

/// Passthrough filter invocation counts.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterCalls {
    /// Calls in the forward (write) direction.
    pub forward: u64,
    /// Calls in the reverse (read) direction.
    pub reverse: u64,
}

/// The measurements of one benchmark run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunResult {
    /// The container write strategy.
    pub strategy: WriteStrategy,
    /// The number of chunk writes per phase.
    pub ncalls: u64,
    /// The size of one chunk in bytes.
    pub chunk_bytes: u64,
    /// The number of bytes written per phase.
    pub total_bytes: u64,
    /// The raw write phase.
    pub raw: TimingSample,
    /// The container write phase.
    pub container: TimingSample,
    /// The size of the raw file.
    pub raw_file_size: u64,
    /// The size of the container file.
    pub container_file_size: u64,
    /// Passthrough filter invocations over the whole run, including read-back.
    pub filter_calls: FilterCalls,
}

impl RunResult {
    /// Derive the [`Metrics`] of this run.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        Metrics::new(self)
    }
}

/// Metrics derived from a [`RunResult`].
///
/// Every value is a pure function of the measurements.
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct Metrics {
    /// Container minus raw wall time, in seconds.
    pub overhead: f64,
    /// [`overhead`](Metrics::overhead) per chunk write, in microseconds.
    pub overhead_per_chunk_us: f64,
    /// Container chunk writes per second.
    pub container_calls_per_second: f64,
    /// Raw chunk writes per second.
    pub raw_calls_per_second: f64,
    /// Container throughput in MiB/s.
    pub container_mib_per_second: f64,
    /// Raw throughput in MiB/s.
    pub raw_mib_per_second: f64,
    /// `100 * raw / container` wall time. At least 100 if the container is as fast as raw.
    pub relative_performance: f64,
    /// Container file size overhead relative to the raw file, in percent.
    pub file_size_overhead_percent: f64,
}

impl Metrics {
    /// Derive metrics from `result`.
    #[must_use]
    pub fn new(result: &RunResult) -> Self {
        let ncalls = result.ncalls as f64;
        let total_bytes = result.total_bytes as f64;
        let raw = result.raw.wall;
        let container = result.container.wall;
        let overhead = container - raw;
        Self {
            overhead,
            overhead_per_chunk_us: overhead / ncalls * 1e6,
            container_calls_per_second: ncalls / container,
            raw_calls_per_second: ncalls / raw,
            container_mib_per_second: total_bytes / container / MIB,
            raw_mib_per_second: total_bytes / raw / MIB,
            relative_performance: 100.0 * raw / container,
            file_size_overhead_percent: 100.0
                * (result.container_file_size as f64 - result.raw_file_size as f64)
                / result.raw_file_size as f64,
        }
    }
}

/// Write the `#PARAM` block.
///
/// # Errors
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn write_params(
    out: &mut impl Write,
    config: &BenchmarkConfig,
    host: Option<&HostInfo>,
) -> io::Result<()> {
    writeln!(out, "#PARAM rawfile name      : {}", config.raw_path().display())?;
    writeln!(out, "#PARAM h5file name       : {}", config.container_path().display())?;
    writeln!(out, "#PARAM chunk size [Byte] : {}", config.chunk_bytes())?;
    writeln!(out, "#PARAM ncalls            : {}", config.ncalls())?;
    writeln!(out, "#PARAM total size [Byte] : {}", config.total_bytes())?;
    writeln!(
        out,
        "#PARAM array shape       : (z={},y={},x={})",
        config.n_images(),
        config.ny(),
        config.nx()
    )?;
    writeln!(
        out,
        "#PARAM chunk shape       : (z={},y={},x={})",
        config.chunk_size(),
        config.ny(),
        config.nx()
    )?;
    writeln!(out, "#PARAM write strategy    : {}", config.strategy())?;
    writeln!(out, "#PARAM sentinel          : {}", config.sentinel())?;
    if let Some(host) = host {
        writeln!(out, "#PARAM hostname          : {}", host.hostname)?;
        writeln!(out, "#PARAM os                : {}/{}", host.os, host.arch)?;
        writeln!(out, "#PARAM parallelism       : {}", host.parallelism)?;
    }
    Ok(())
}

/// Write the `#RESULTS` block.
///
/// CPU time lines are written for each phase whose CPU time was measured.
///
/// # Errors
/// Returns an [`io::Error`] if writing to `out` fails.
pub fn write_results(out: &mut impl Write, result: &RunResult, metrics: &Metrics) -> io::Result<()> {
    writeln!(out, "#")?;
    writeln!(out, "#RESULTS h5 elapsed time [s]         : {:.3}", result.container.wall)?;
    writeln!(out, "#RESULTS raw elapsed time [s]        : {:.3}", result.raw.wall)?;
    if let Some(cpu) = result.container.cpu {
        writeln!(out, "#RESULTS h5 cpu time [s]             : {cpu:.3}")?;
    }
    if let Some(cpu) = result.raw.cpu {
        writeln!(out, "#RESULTS raw cpu time [s]            : {cpu:.3}")?;
    }
    writeln!(out, "#RESULTS overhead [s]                : {:.3}", metrics.overhead)?;
    writeln!(out, "#RESULTS overhead per chunk [us]     : {:.3}", metrics.overhead_per_chunk_us)?;
    writeln!(out, "#RESULTS h5  performance1 [call/s]   : {:.3}", metrics.container_calls_per_second)?;
    writeln!(out, "#RESULTS raw performance1 [call/s]   : {:.3}", metrics.raw_calls_per_second)?;
    writeln!(out, "#RESULTS h5  performance2 [MiB/s]    : {:.1}", metrics.container_mib_per_second)?;
    writeln!(out, "#RESULTS raw performance2 [MiB/s]    : {:.1}", metrics.raw_mib_per_second)?;
    writeln!(out, "#RESULTS h5  relative performance [%]: {:.0}", metrics.relative_performance)?;
    writeln!(out, "#RESULTS h5  filesize [Byte]         : {}", result.container_file_size)?;
    writeln!(out, "#RESULTS raw filesize [Byte]         : {}", result.raw_file_size)?;
    writeln!(out, "#RESULTS h5 file size overhead [%]   : {:.2}", metrics.file_size_overhead_percent)?;
    let calls = result.filter_calls;
    writeln!(out, "#RESULTS filter calls [fwd/rev]      : {}/{}", calls.forward, calls.reverse)?;
    writeln!(out, "#")?;
    Ok(())
}

/// One line of the JSON report.
#[derive(Clone, Debug, Serialize)]
pub struct JsonRecord<'a> {
    /// The RFC 3339 time the record was created.
    pub timestamp: String,
    /// The image width.
    pub nx: u64,
    /// The image height.
    pub ny: u64,
    /// The image count.
    pub n_images: u64,
    /// The images per chunk.
    pub chunk_size: u64,
    /// The workload byte value.
    pub sentinel: u8,
    /// The host, if identification is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<&'a HostInfo>,
    /// The measurements.
    pub result: &'a RunResult,
    /// The derived metrics.
    pub metrics: &'a Metrics,
}

impl<'a> JsonRecord<'a> {
    /// Create a record timestamped now.
    #[must_use]
    pub fn new(
        config: &BenchmarkConfig,
        host: Option<&'a HostInfo>,
        result: &'a RunResult,
        metrics: &'a Metrics,
    ) -> Self {
        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            nx: config.nx(),
            ny: config.ny(),
            n_images: config.n_images(),
            chunk_size: config.chunk_size(),
            sentinel: config.sentinel(),
            host,
            result,
            metrics,
        }
    }

    /// Append the record as one line to the file at `path`, creating it if needed.
    ///
    /// # Errors
    /// Returns an [`io::Error`] if the file cannot be opened or written.
    pub fn append_to(&self, path: &Path) -> io::Result<()> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(&line)?;
        file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result() -> RunResult {
        RunResult {
            strategy: WriteStrategy::Direct,
            ncalls: 10,
            chunk_bytes: 20_480,
            total_bytes: 204_800,
            raw: TimingSample {
                wall: 0.5,
                cpu: Some(0.25),
            },
            container: TimingSample {
                wall: 1.0,
                cpu: None,
            },
            raw_file_size: 204_800,
            container_file_size: 204_800 + 2048,
            filter_calls: FilterCalls {
                forward: 10,
                reverse: 1,
            },
        }
    }

    #[test]
    fn metrics_derivation() {
        let metrics = result().metrics();
        assert!((metrics.overhead - 0.5).abs() < 1e-12);
        assert!((metrics.overhead_per_chunk_us - 50_000.0).abs() < 1e-6);
        assert!((metrics.container_calls_per_second - 10.0).abs() < 1e-12);
        assert!((metrics.raw_calls_per_second - 20.0).abs() < 1e-12);
        assert!((metrics.raw_mib_per_second - 204_800.0 / 0.5 / MIB).abs() < 1e-12);
        assert!((metrics.relative_performance - 50.0).abs() < 1e-12);
        assert!((metrics.file_size_overhead_percent - 1.0).abs() < 1e-12);
        assert!(metrics.relative_performance.is_finite() && metrics.relative_performance > 0.0);
    }

    #[test]
    fn results_text() {
        let result = result();
        let mut out = Vec::new();
        write_results(&mut out, &result, &result.metrics()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("#RESULTS h5 elapsed time [s]         : 1.000\n"));
        assert!(text.contains("#RESULTS raw cpu time [s]            : 0.250\n"));
        assert!(!text.contains("#RESULTS h5 cpu time"));
        assert!(text.contains("#RESULTS h5  relative performance [%]: 50\n"));
        assert!(text.contains("#RESULTS h5 file size overhead [%]   : 1.00\n"));
        assert!(text.starts_with("#\n") && text.ends_with("#\n"));
    }

    #[test]
    fn json_record_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");
        let config = BenchmarkConfig::builder().build().unwrap();
        let result = result();
        let metrics = result.metrics();
        let record = JsonRecord::new(&config, None, &result, &metrics);
        record.append_to(&path).unwrap();
        record.append_to(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(value["nx"], 64);
        assert_eq!(value["result"]["strategy"], "direct");
        assert_eq!(value["result"]["raw"]["cpu"], 0.25);
        assert!(value["result"]["container"]["cpu"].is_null());
        assert!(value.get("host").is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }
}
