//! Run configuration shared by the library and the `tile-tx` binary.

use std::path::PathBuf;

/// Name of the dataset metadata document inside the tile directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";

/// Default number of concurrent tile workers.
pub const DEFAULT_WORKERS: usize = 8;

/// Sentinel-2 L2A reflectance maximum; uint16 samples above it are truncated.
pub const SENTINEL2_MAX: u16 = 10_000;

/// Everything a pipeline run needs, built once at process start.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub input_dir: PathBuf,
    pub output_file: PathBuf,
    /// Operation name as given on the command line; unknown names fall back to mean NDVI.
    pub operation: String,
    pub workers: usize,
    /// Extension of the per-band tile files, without the dot.
    pub extension: String,
    /// Ceiling applied to uint16 samples; `None` keeps them untouched.
    pub u16_ceiling: Option<u16>,
    /// Sort output rows by tile id then date.
    pub sort_rows: bool,
}

impl PipelineConfig {
    pub fn metadata_path(&self) -> PathBuf {
        self.input_dir.join(METADATA_FILE_NAME)
    }

    /// Worker count with the zero case mapped to a single worker.
    pub fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_file: PathBuf::from("output.csv"),
            operation: "mean_ndvi".to_string(),
            workers: DEFAULT_WORKERS,
            extension: "tif".to_string(),
            u16_ceiling: Some(SENTINEL2_MAX),
            sort_rows: true,
        }
    }
}
