//! Tile decoding through libgdal (`--features gdal`).

use std::path::Path;

use gdal::raster::{GdalDataType, RasterBand as GdalBand};
use gdal::Dataset;
use tracing::warn;

use super::{RasterBand, RasterLoader, TypedBuffer};
use crate::error::RasterError;

/// Reads band 1 of any GDAL-readable raster.
#[derive(Debug, Clone, Default)]
pub struct GdalLoader {
    u16_ceiling: Option<u16>,
}

impl GdalLoader {
    pub fn new(u16_ceiling: Option<u16>) -> Self {
        Self { u16_ceiling }
    }
}

fn read_all<T: Copy + gdal::raster::GdalType>(
    band: &GdalBand,
    size: (usize, usize),
) -> gdal::errors::Result<Vec<T>> {
    let buffer = band.read_as::<T>((0, 0), size, size, None)?;
    Ok(buffer.into_shape_and_vec().1)
}

impl RasterLoader for GdalLoader {
    fn load(&self, path: &Path) -> Result<RasterBand, RasterError> {
        let gdal_err = |source| RasterError::Gdal {
            path: path.to_path_buf(),
            source,
        };

        let dataset = Dataset::open(path).map_err(gdal_err)?;

        let band_count = dataset.raster_count();
        if band_count == 0 {
            return Err(RasterError::Empty(path.to_path_buf()));
        } else if band_count > 1 {
            warn!("found {} bands in {} - using band 0 only", band_count, path.display());
        }
        let band = dataset.rasterband(1).map_err(gdal_err)?;

        let size = dataset.raster_size();
        let transform = dataset.geo_transform().map_err(gdal_err)?;

        let buffer = match band.band_type() {
            GdalDataType::UInt8 => TypedBuffer::U8(read_all(&band, size).map_err(gdal_err)?),
            GdalDataType::UInt16 => TypedBuffer::U16(read_all(&band, size).map_err(gdal_err)?),
            GdalDataType::Float32 => TypedBuffer::F32(read_all(&band, size).map_err(gdal_err)?),
            GdalDataType::Float64 => TypedBuffer::F64(read_all(&band, size).map_err(gdal_err)?),
            other => {
                return Err(RasterError::UnsupportedSampleType {
                    sample_type: format!("{other:?}"),
                    path: path.to_path_buf(),
                })
            }
        };

        RasterBand::from_typed(buffer, size.0, size.1, &transform, self.u16_ceiling, path)
    }
}
