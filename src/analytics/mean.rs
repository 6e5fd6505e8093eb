use super::{TileSource, Transformer};
use crate::error::{MetadataError, RasterError, TransformError};
use crate::metadata::DatasetMetadata;
use crate::raster::RasterBand;
use crate::tile::Tile;

/// Arithmetic mean of a single band, named by the dataset metadata.
#[derive(Debug, Clone)]
pub struct BandMean {
    band: String,
}

impl BandMean {
    pub fn new(band: impl Into<String>) -> Self {
        Self { band: band.into() }
    }

    /// Uses the first band listed in the metadata (`bands[0].id`).
    pub fn from_metadata(metadata: &DatasetMetadata) -> Result<Self, MetadataError> {
        Ok(Self::new(metadata.first_band_id()?))
    }

    pub fn band(&self) -> &str {
        &self.band
    }
}

impl Transformer for BandMean {
    fn setup(&self, source: &TileSource, tile: &Tile) -> Result<Vec<RasterBand>, RasterError> {
        Ok(vec![source.load_band(tile, &self.band)?])
    }

    fn transform(&self, bands: &[RasterBand]) -> Result<Vec<f64>, TransformError> {
        let Some(band) = bands.first() else {
            return Err(TransformError::BandCount {
                expected: 1,
                actual: 0,
            });
        };
        if band.data.is_empty() {
            return Err(TransformError::EmptyRaster);
        }
        let mean = band.data.iter().sum::<f64>() / band.data.len() as f64;
        Ok(vec![mean])
    }

    fn value_names(&self) -> Vec<String> {
        vec![self.band.clone()]
    }
}
