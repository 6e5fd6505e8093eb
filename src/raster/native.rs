//! GeoTIFF decoding with the pure-Rust `tiff` crate (no libgdal required).

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tracing::warn;

use super::{GeoTransform, RasterBand, RasterLoader, TypedBuffer};
use crate::error::RasterError;

/// Reads the first band of a GeoTIFF. Georeferencing comes from the
/// ModelTransformation tag or the ModelPixelScale + ModelTiepoint pair.
#[derive(Debug, Clone, Default)]
pub struct NativeTiffLoader {
    u16_ceiling: Option<u16>,
}

impl NativeTiffLoader {
    pub fn new(u16_ceiling: Option<u16>) -> Self {
        Self { u16_ceiling }
    }

    pub fn decode<R: Read + Seek>(
        &self,
        reader: R,
        path: &Path,
    ) -> Result<RasterBand, RasterError> {
        let decode_err = |e: tiff::TiffError| RasterError::Decode {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let mut decoder = Decoder::new(reader).map_err(decode_err)?;
        let (width, height) = decoder.dimensions().map_err(decode_err)?;
        let (width, height) = (width as usize, height as usize);
        let color_type = decoder.colortype().map_err(decode_err)?;
        let bands = band_count(&mut decoder);
        let transform = read_geotransform(&mut decoder)
            .ok_or_else(|| RasterError::MissingGeoreference(path.to_path_buf()))?;

        let buffer = match decoder.read_image().map_err(decode_err)? {
            DecodingResult::U8(data) => TypedBuffer::U8(data),
            DecodingResult::U16(data) => TypedBuffer::U16(data),
            DecodingResult::F32(data) => TypedBuffer::F32(data),
            DecodingResult::F64(data) => TypedBuffer::F64(data),
            _ => {
                return Err(RasterError::UnsupportedSampleType {
                    sample_type: format!("{color_type:?}"),
                    path: path.to_path_buf(),
                })
            }
        };

        let pixels = width * height;
        if pixels == 0 || buffer.is_empty() {
            return Err(RasterError::Empty(path.to_path_buf()));
        }
        if bands > 1 {
            warn!("found {} bands in {} - using band 0 only", bands, path.display());
        }

        // planar files decode to the first plane only, interleaved ones to every sample
        let stride = buffer.len() / pixels;
        RasterBand::from_typed(
            buffer.first_band(stride),
            width,
            height,
            &transform,
            self.u16_ceiling,
            path,
        )
    }
}

impl RasterLoader for NativeTiffLoader {
    fn load(&self, path: &Path) -> Result<RasterBand, RasterError> {
        let file = File::open(path).map_err(|source| RasterError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        self.decode(BufReader::new(file), path)
    }
}

/// SamplesPerPixel, 1 when the tag is absent.
fn band_count<R: Read + Seek>(decoder: &mut Decoder<R>) -> usize {
    decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map_or(1, |samples| samples.max(1) as usize)
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    // 4x4 row-major model transformation matrix
    if let Ok(m) = decoder.get_tag_f64_vec(Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Some([m[3], m[0], m[1], m[7], m[4], m[5]]);
        }
    }

    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some([origin_x, scale[0], 0.0, origin_y, 0.0, -scale[1]])
}
