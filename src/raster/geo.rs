//! Geographic extent of a raster derived from its affine geotransform.

use std::fmt;

use itertools::Itertools;

/// GDAL-ordered affine coefficients:
/// `[origin_x, pixel_width, row_rotation, origin_y, col_rotation, pixel_height]`.
pub type GeoTransform = [f64; 6];

/// Rectangular lon/lat extent. Always `min <= max` on both axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Extent covered by a `width` x `height` raster under `transform`.
    ///
    /// All four pixel-grid corners are projected and min/max taken, so north-up
    /// (negative pixel height), south-up and rotated transforms all produce a
    /// well-ordered box.
    pub fn from_transform(transform: &GeoTransform, width: usize, height: usize) -> Self {
        let [x0, dx, rx, y0, ry, dy] = *transform;
        let corner = |col: f64, row: f64| (x0 + col * dx + row * rx, y0 + col * ry + row * dy);

        let (w, h) = (width as f64, height as f64);
        let corners = [corner(0.0, 0.0), corner(w, 0.0), corner(0.0, h), corner(w, h)];

        let (min_lon, max_lon) = corners
            .iter()
            .map(|c| c.0)
            .minmax()
            .into_option()
            .unwrap_or((x0, x0));
        let (min_lat, max_lat) = corners
            .iter()
            .map(|c| c.1)
            .minmax()
            .into_option()
            .unwrap_or((y0, y0));

        Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        }
    }

    /// Corners in min/min, max/min, max/max, min/max order as (lon, lat) pairs.
    pub fn corners(&self) -> [(f64, f64); 4] {
        [
            (self.min_lon, self.min_lat),
            (self.max_lon, self.min_lat),
            (self.max_lon, self.max_lat),
            (self.min_lon, self.max_lat),
        ]
    }
}

impl fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .corners()
            .iter()
            .flat_map(|&(lon, lat)| [lon, lat])
            .map(|v| format!("{v:.6}"))
            .join(",");
        f.write_str(&joined)
    }
}
