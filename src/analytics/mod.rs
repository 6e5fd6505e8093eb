//! Per-tile analytic operations.
//!
//! Every operation follows the same three steps: `setup` loads the bands a
//! tile needs, `transform` reduces them to a fixed set of values, and
//! `value_names` labels those values for the output header.

mod category;
mod mean;
mod ndvi;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use tracing::warn;

pub use category::{
    CategoryAnalytic, CategoryCounter, CategoryDescriptor, CategoryPresentation, CategoryTally,
    LAND_COVER_BAND,
};
pub use mean::BandMean;
pub use ndvi::{ndvi_pixel, ndvi_pixels, MeanNdvi, NIR_BAND, RED_BAND};

use crate::error::{MetadataError, RasterError, TransformError};
use crate::metadata::DatasetMetadata;
use crate::raster::{RasterBand, RasterLoader};
use crate::tile::Tile;

/// Where a tile's band files live and how to decode them.
pub struct TileSource {
    pub dir: PathBuf,
    pub extension: String,
    pub loader: Box<dyn RasterLoader>,
}

impl TileSource {
    pub fn new(
        dir: impl Into<PathBuf>,
        extension: impl Into<String>,
        loader: Box<dyn RasterLoader>,
    ) -> Self {
        Self {
            dir: dir.into(),
            extension: extension.into(),
            loader,
        }
    }

    /// Decodes the file holding `band` for `tile`.
    pub fn load_band(&self, tile: &Tile, band: &str) -> Result<RasterBand, RasterError> {
        self.loader
            .load(&tile.band_path(&self.dir, band, &self.extension))
    }
}

/// An operation on tile data.
pub trait Transformer: Send + Sync {
    /// Loads every band the operation needs for `tile`.
    fn setup(&self, source: &TileSource, tile: &Tile) -> Result<Vec<RasterBand>, RasterError>;

    /// Computes the operation's values from bands returned by `setup`.
    fn transform(&self, bands: &[RasterBand]) -> Result<Vec<f64>, TransformError>;

    /// Names of the values, in the order `transform` returns them.
    fn value_names(&self) -> Vec<String>;

    /// Pixels seen so far that matched no output value.
    fn unclassified_pixels(&self) -> u64 {
        0
    }
}

/// The closed set of operations selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    MeanNdvi,
    Mean,
    CategoryCounts,
    CategoryPercentage,
    CategoryBinary,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::MeanNdvi,
        Operation::Mean,
        Operation::CategoryCounts,
        Operation::CategoryPercentage,
        Operation::CategoryBinary,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Operation::MeanNdvi => "mean_ndvi",
            Operation::Mean => "mean",
            Operation::CategoryCounts => "category_counts",
            Operation::CategoryPercentage => "category_percentage",
            Operation::CategoryBinary => "category_binary",
        }
    }

    /// Parses `name`, falling back to mean NDVI (with a warning) when it is not
    /// a known operation.
    pub fn from_name_or_default(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            warn!(
                "unrecognized operation {} - defaulting to {}",
                name,
                Operation::MeanNdvi
            );
            Operation::MeanNdvi
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Operation::ALL
            .into_iter()
            .find(|op| op.name() == wanted)
            .ok_or_else(|| format!("unknown operation {s}"))
    }
}

/// Builds the transformer for `operation`, reading whatever it needs from the
/// dataset metadata.
pub fn create_tile_analytic(
    metadata: &DatasetMetadata,
    operation: Operation,
) -> Result<Box<dyn Transformer>, MetadataError> {
    let analytic: Box<dyn Transformer> = match operation {
        Operation::MeanNdvi => Box::new(MeanNdvi),
        Operation::Mean => Box::new(BandMean::from_metadata(metadata)?),
        Operation::CategoryCounts => Box::new(CategoryAnalytic::from_metadata(
            metadata,
            CategoryPresentation::Raw,
        )?),
        Operation::CategoryPercentage => Box::new(CategoryAnalytic::from_metadata(
            metadata,
            CategoryPresentation::Percentage,
        )?),
        Operation::CategoryBinary => Box::new(CategoryAnalytic::from_metadata(
            metadata,
            CategoryPresentation::Binary,
        )?),
    };
    Ok(analytic)
}
