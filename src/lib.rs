//! Batch analytics over a directory of geospatial raster tiles.
//!
//! Tiles are named `<location>_<YYYYMMDDTHHMMSS>_<band>.<ext>`. They are
//! grouped into per-location time series, pushed through a pool of workers
//! applying one [`analytics::Transformer`], and written as one CSV row per
//! tile and date.

pub mod analytics;
pub mod config;
pub mod error;
pub mod metadata;
pub mod output;
pub mod pipeline;
pub mod pool;
pub mod raster;
pub mod tile;

pub use analytics::{create_tile_analytic, Operation, TileSource, Transformer};
pub use config::PipelineConfig;
pub use error::{Result, TileError};
pub use pipeline::{run, run_with_loader, RunReport};
pub use raster::{GeoBounds, RasterBand, RasterLoader};
pub use tile::{Tile, TileCatalog};
