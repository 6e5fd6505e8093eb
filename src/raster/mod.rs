//! Decoded single-band rasters and the loaders that produce them.
//!
//! Analytics never touch the on-disk format: they receive [`RasterBand`]s whose
//! samples have already been widened to f64, from whichever [`RasterLoader`]
//! the run was configured with.

mod geo;
mod native;
mod typed;

#[cfg(feature = "gdal")]
mod gdal_io;

use std::path::Path;

pub use geo::{GeoBounds, GeoTransform};
pub use native::NativeTiffLoader;
pub use typed::TypedBuffer;

#[cfg(feature = "gdal")]
pub use gdal_io::GdalLoader;

use crate::error::RasterError;

/// One decoded band, row-major, `width * height` samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBand {
    pub data: Vec<f64>,
    pub width: usize,
    pub height: usize,
    pub bounds: GeoBounds,
}

impl RasterBand {
    pub fn new(
        data: Vec<f64>,
        width: usize,
        height: usize,
        bounds: GeoBounds,
    ) -> Result<Self, RasterError> {
        if data.len() != width * height {
            return Err(RasterError::SizeMismatch {
                path: Default::default(),
                len: data.len(),
                width,
                height,
            });
        }
        Ok(Self {
            data,
            width,
            height,
            bounds,
        })
    }

    /// Builds a band from typed samples and an affine transform, as every
    /// loader does after reading a file.
    pub fn from_typed(
        buffer: TypedBuffer,
        width: usize,
        height: usize,
        transform: &GeoTransform,
        u16_ceiling: Option<u16>,
        path: &Path,
    ) -> Result<Self, RasterError> {
        if buffer.len() != width * height {
            return Err(RasterError::SizeMismatch {
                path: path.to_path_buf(),
                len: buffer.len(),
                width,
                height,
            });
        }
        if buffer.is_empty() {
            return Err(RasterError::Empty(path.to_path_buf()));
        }
        let data = buffer.into_f64(u16_ceiling, &path.display().to_string());
        Ok(Self {
            data,
            width,
            height,
            bounds: GeoBounds::from_transform(transform, width, height),
        })
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }
}

/// Decodes a raster file into its first band.
pub trait RasterLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<RasterBand, RasterError>;
}

/// Loader used when nothing else is requested: GDAL when the crate is built
/// with the `gdal` feature.
#[cfg(feature = "gdal")]
pub fn default_loader(u16_ceiling: Option<u16>) -> Box<dyn RasterLoader> {
    Box::new(GdalLoader::new(u16_ceiling))
}

/// Loader used when nothing else is requested: the native TIFF reader.
#[cfg(not(feature = "gdal"))]
pub fn default_loader(u16_ceiling: Option<u16>) -> Box<dyn RasterLoader> {
    Box::new(NativeTiffLoader::new(u16_ceiling))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: GeoTransform = [0.0, 1.0, 0.0, 2.0, 0.0, -1.0];

    #[test]
    fn test_from_typed() {
        let band = RasterBand::from_typed(
            TypedBuffer::U16(vec![1, 2, 3, 20_000]),
            2,
            2,
            &UNIT,
            Some(10_000),
            Path::new("a.tif"),
        )
        .unwrap();
        assert_eq!(band.data, vec![1.0, 2.0, 3.0, 10_000.0]);
        assert_eq!(band.shape(), (2, 2));
        assert_eq!(band.bounds.max_lat, 2.0);
        assert_eq!(band.bounds.min_lat, 0.0);
    }

    #[test]
    fn test_from_typed_rejects_bad_length() {
        let result = RasterBand::from_typed(
            TypedBuffer::U8(vec![1, 2, 3]),
            2,
            2,
            &UNIT,
            None,
            Path::new("a.tif"),
        );
        assert!(matches!(result, Err(RasterError::SizeMismatch { len: 3, .. })));
    }

    #[test]
    fn test_from_typed_rejects_empty() {
        let result = RasterBand::from_typed(
            TypedBuffer::F32(vec![]),
            0,
            0,
            &UNIT,
            None,
            Path::new("a.tif"),
        );
        assert!(matches!(result, Err(RasterError::Empty(_))));
    }
}
