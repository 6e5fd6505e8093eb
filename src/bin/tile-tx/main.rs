use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use geo_tile_tx::config::{DEFAULT_WORKERS, SENTINEL2_MAX};
use geo_tile_tx::PipelineConfig;

#[derive(Parser, Debug)]
#[command(name = "tile-tx")]
#[command(
    version,
    about = "Apply an analytic to every tile in a geotiff tile directory",
    long_about = None
)]
struct Args {
    /// Input directory containing geotiff files and metadata.json
    #[arg(short, long, env = "TILE_TX_INPUT", default_value = ".")]
    input: PathBuf,

    /// Output CSV file path
    #[arg(short, long, env = "TILE_TX_OUTPUT")]
    output: PathBuf,

    /// Operation: mean_ndvi, mean, category_counts, category_percentage, category_binary
    #[arg(long, env = "TILE_TX_OPERATION", default_value = "mean_ndvi")]
    operation: String,

    /// Number of workers
    #[arg(short, long, env = "TILE_TX_WORKERS", default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Extension of the tile band files
    #[arg(long, env = "TILE_TX_EXTENSION", default_value = "tif")]
    extension: String,

    /// Truncate uint16 samples above this value (0 disables)
    #[arg(long, env = "TILE_TX_U16_CEILING", default_value_t = SENTINEL2_MAX)]
    u16_ceiling: u16,

    /// Write rows in completion order instead of sorting by tile and date
    #[arg(long)]
    unordered: bool,

    /// Log level or filter directives (RUST_LOG takes precedence)
    #[arg(long, env = "TILE_TX_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Verbose output (debug level)
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            input_dir: self.input.clone(),
            output_file: self.output.clone(),
            operation: self.operation.clone(),
            workers: self.workers,
            extension: self.extension.trim_start_matches('.').to_string(),
            u16_ceiling: (self.u16_ceiling > 0).then_some(self.u16_ceiling),
            sort_rows: !self.unordered,
        }
    }

    /// Filter directives for the subscriber. Plain words other than the
    /// five levels fall back to info; `target=level` lists pass through.
    fn log_directives(&self) -> String {
        if self.verbose {
            return "debug".to_string();
        }
        let level = self.log_level.to_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => level,
            directives if directives.contains('=') => directives.to_string(),
            _ => "info".to_string(),
        }
    }
}

fn setup_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_directives()));

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let start = Instant::now();
    let config = args.pipeline_config();

    let report = geo_tile_tx::run(&config).with_context(|| {
        format!(
            "failed to process tiles in {} into {}",
            config.input_dir.display(),
            config.output_file.display()
        )
    })?;
    report.log();

    info!("finished in {:.3}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = setup_logging(&args) {
        eprintln!("failed to initialise logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_directives() {
        let args = Args::parse_from(["tile-tx", "-o", "out.csv", "--log-level", "WARN"]);
        assert_eq!(args.log_directives(), "warn");

        let args = Args::parse_from(["tile-tx", "-o", "out.csv", "--log-level", "warn", "-v"]);
        assert_eq!(args.log_directives(), "debug");

        let args = Args::parse_from(["tile-tx", "-o", "out.csv", "--log-level", "loud"]);
        assert_eq!(args.log_directives(), "info");

        let args = Args::parse_from(["tile-tx", "-o", "x.csv", "--log-level", "geo_tile_tx=trace"]);
        assert_eq!(args.log_directives(), "geo_tile_tx=trace");
    }

    #[test]
    fn test_pipeline_config_from_args() {
        let args = Args::parse_from([
            "tile-tx",
            "-o",
            "out.csv",
            "--extension",
            ".TIF",
            "--u16-ceiling",
            "0",
            "--unordered",
        ]);
        let config = args.pipeline_config();
        assert_eq!(config.extension, "TIF");
        assert_eq!(config.u16_ceiling, None);
        assert!(!config.sort_rows);
    }
}
