//! One batch run: metadata, analytic, catalog, worker pool, CSV.

use std::sync::Arc;

use tracing::{info, warn};

use crate::analytics::{create_tile_analytic, Operation, TileSource, Transformer};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::metadata::DatasetMetadata;
use crate::output::{sort_rows, CsvSink, OutputRow};
use crate::pool::{ErrorSummary, WorkerPool};
use crate::raster::{default_loader, RasterLoader};
use crate::tile::{ScanStats, TileCatalog};

/// What a run produced, for the caller to report.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub operation: Operation,
    pub tiles: usize,
    pub rows_written: usize,
    pub scan: ScanStats,
    pub errors: ErrorSummary,
    /// Category pixels matching no declared class, over all tiles.
    pub unclassified_pixels: u64,
}

impl RunReport {
    pub fn log(&self) {
        let scan = &self.scan;
        if scan.malformed_names + scan.bad_dates > 0 {
            warn!(
                "skipped {} malformed file names and {} unparseable dates",
                scan.malformed_names, scan.bad_dates
            );
        }
        self.errors.report();
        if self.unclassified_pixels > 0 {
            warn!("{} pixels matched no category", self.unclassified_pixels);
        }
        info!(
            operation = %self.operation,
            tiles = self.tiles,
            rows = self.rows_written,
            "run complete"
        );
    }
}

/// Runs the configured operation with the default raster loader.
pub fn run(config: &PipelineConfig) -> Result<RunReport> {
    run_with_loader(config, default_loader(config.u16_ceiling))
}

/// Runs the configured operation, decoding tiles with `loader`.
pub fn run_with_loader(
    config: &PipelineConfig,
    loader: Box<dyn RasterLoader>,
) -> Result<RunReport> {
    let metadata = DatasetMetadata::load(&config.metadata_path())?;

    let operation = Operation::from_name_or_default(&config.operation);
    let analytic: Arc<dyn Transformer> = Arc::from(create_tile_analytic(&metadata, operation)?);

    let mut sink = CsvSink::create(&config.output_file)?;
    sink.write_header(&analytic.value_names())?;

    let catalog = TileCatalog::scan(&config.input_dir)?;
    let tiles = catalog.flatten();
    let tile_count = tiles.len();

    let source = Arc::new(TileSource::new(
        &config.input_dir,
        config.extension.as_str(),
        loader,
    ));
    let output =
        WorkerPool::new(config.worker_count()).run(tiles, Arc::clone(&analytic), source);

    let mut rows: Vec<OutputRow> = output.rows;
    if config.sort_rows {
        sort_rows(&mut rows);
    }
    for row in &rows {
        sink.write_row(row)?;
    }
    sink.finish()?;

    Ok(RunReport {
        operation,
        tiles: tile_count,
        rows_written: rows.len(),
        scan: catalog.stats().clone(),
        errors: output.errors,
        unclassified_pixels: analytic.unclassified_pixels(),
    })
}
