use rayon::prelude::*;

use super::{TileSource, Transformer};
use crate::error::{RasterError, TransformError};
use crate::raster::RasterBand;
use crate::tile::Tile;

/// Sentinel-2 near-infrared band.
pub const NIR_BAND: &str = "B08";
/// Sentinel-2 red band.
pub const RED_BAND: &str = "B04";

/// Non-negative NDVI of one pixel: `max(0, (nir - red) / (nir + red))`, with a
/// zero denominator mapped to 0.
#[inline]
pub fn ndvi_pixel(nir: f64, red: f64) -> f64 {
    let sum = nir + red;
    if sum == 0.0 {
        return 0.0;
    }
    ((nir - red) / sum).max(0.0)
}

/// Per-pixel NDVI over two equally sized sample buffers.
pub fn ndvi_pixels(nir: &[f64], red: &[f64]) -> Vec<f64> {
    let mut ndvi = vec![0.0; nir.len().min(red.len())];
    ndvi.par_iter_mut().enumerate().for_each(|(i, value)| {
        *value = ndvi_pixel(nir[i], red[i]);
    });
    ndvi
}

/// Mean NDVI over a Sentinel-2 tile.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanNdvi;

impl Transformer for MeanNdvi {
    fn setup(&self, source: &TileSource, tile: &Tile) -> Result<Vec<RasterBand>, RasterError> {
        let nir = source.load_band(tile, NIR_BAND)?;
        let red = source.load_band(tile, RED_BAND)?;
        Ok(vec![nir, red])
    }

    fn transform(&self, bands: &[RasterBand]) -> Result<Vec<f64>, TransformError> {
        let [nir, red] = bands else {
            return Err(TransformError::BandCount {
                expected: 2,
                actual: bands.len(),
            });
        };
        if nir.shape() != red.shape() {
            return Err(TransformError::ShapeMismatch(
                nir.width, nir.height, red.width, red.height,
            ));
        }
        if nir.data.is_empty() {
            return Err(TransformError::EmptyRaster);
        }

        let ndvi = ndvi_pixels(&nir.data, &red.data);
        let mean = ndvi.iter().sum::<f64>() / ndvi.len() as f64;
        Ok(vec![mean])
    }

    fn value_names(&self) -> Vec<String> {
        vec!["mean_ndvi".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::band;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_all_zero_pixels() {
        assert_eq!(ndvi_pixels(&[0.0, 0.0, 0.0], &[0.0, 0.0, 0.0]), vec![0.0; 3]);
        let values = MeanNdvi
            .transform(&[band(vec![0.0; 4], 2, 2), band(vec![0.0; 4], 2, 2)])
            .unwrap();
        assert_eq!(values, vec![0.0]);
    }

    #[test]
    fn test_mean_ndvi() {
        let pixels = ndvi_pixels(&[8.0, 0.0], &[2.0, 0.0]);
        assert_relative_eq!(pixels[0], 0.6);
        assert_eq!(pixels[1], 0.0);

        let values = MeanNdvi
            .transform(&[band(vec![8.0, 0.0], 2, 1), band(vec![2.0, 0.0], 2, 1)])
            .unwrap();
        assert_relative_eq!(values[0], 0.3);
    }

    #[test]
    fn test_negative_ratio_floored() {
        assert_eq!(ndvi_pixel(2.0, 8.0), 0.0);
        assert_eq!(ndvi_pixel(0.0, 5.0), 0.0);
        assert_eq!(ndvi_pixel(5.0, 0.0), 1.0);
    }

    #[test]
    fn test_band_count_and_shape() {
        assert!(matches!(
            MeanNdvi.transform(&[band(vec![1.0], 1, 1)]),
            Err(TransformError::BandCount { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            MeanNdvi.transform(&[band(vec![1.0, 2.0], 2, 1), band(vec![1.0, 2.0], 1, 2)]),
            Err(TransformError::ShapeMismatch(2, 1, 1, 2))
        ));
    }

    #[test]
    fn test_value_names() {
        assert_eq!(MeanNdvi.value_names(), vec!["mean_ndvi"]);
    }

    proptest! {
        #[test]
        fn prop_pixel_in_unit_range(nir in 0u16..=10_000, red in 0u16..=10_000) {
            let value = ndvi_pixel(nir as f64, red as f64);
            prop_assert!((0.0..=1.0).contains(&value));
        }
    }
}
