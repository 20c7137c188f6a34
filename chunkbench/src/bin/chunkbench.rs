//! Benchmark direct chunk writes into a chunked container against raw file writes.

use std::path::PathBuf;
use std::process::ExitCode;

use chunkbench::bench::{self, BenchmarkConfigBuilder, WriteStrategy};
use clap::error::ErrorKind;
use clap::Parser;
use env_logger::Env;

/// Benchmark direct chunk writes into a chunked container against raw file writes.
///
/// Writes `<basename>.raw` and `<basename>.h5`, removing them first if they exist.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Cli {
    /// Image width.
    #[arg(long, default_value_t = 64)]
    nx: u64,

    /// Image height.
    #[arg(long, default_value_t = 32)]
    ny: u64,

    /// Number of images.
    #[arg(long, default_value_t = 100)]
    nimages: u64,

    /// Number of images per chunk. Must divide the number of images.
    #[arg(long, default_value_t = 10)]
    chunk_size: u64,

    /// Output file base name.
    #[arg(long, default_value = "chunkbench")]
    basename: PathBuf,

    /// Select and write each chunk region instead of writing chunks directly.
    #[arg(long)]
    traditional: bool,

    /// Append a JSON record of the run to this file.
    #[arg(long)]
    json: Option<PathBuf>,

    /// The byte value written and verified.
    #[arg(long, default_value_t = 42)]
    sentinel: u8,

    /// Do not measure CPU time.
    #[arg(long)]
    no_cpu_time: bool,

    /// Do not report host identification.
    #[arg(long)]
    no_node_info: bool,
}

impl From<&Cli> for BenchmarkConfigBuilder {
    fn from(cli: &Cli) -> Self {
        let mut builder = bench::BenchmarkConfig::builder();
        builder
            .nx(cli.nx)
            .ny(cli.ny)
            .n_images(cli.nimages)
            .chunk_size(cli.chunk_size)
            .basename(cli.basename.clone())
            .strategy(if cli.traditional {
                WriteStrategy::Traditional
            } else {
                WriteStrategy::Direct
            })
            .json(cli.json.clone())
            .sentinel(cli.sentinel)
            .cpu_time(!cli.no_cpu_time)
            .node_info(!cli.no_node_info);
        builder
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("chunkbench=info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                return ExitCode::SUCCESS;
            }
            // rejected arguments, including negative dimensions
            println!("# FAILURE");
            return ExitCode::FAILURE;
        }
    };

    let result = BenchmarkConfigBuilder::from(&cli)
        .build()
        .map_err(bench::BenchError::from)
        .and_then(|config| bench::run(&config));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            println!("ERROR: {err}");
            println!("# FAILURE");
            ExitCode::FAILURE
        }
    }
}
