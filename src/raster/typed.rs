use tracing::warn;

/// Decoded samples in their on-disk type, before widening.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedBuffer {
    U8(Vec<u8>),
    U16(Vec<u16>),
    F32(Vec<f32>),
    F64(Vec<f64>),
}

impl TypedBuffer {
    pub fn len(&self) -> usize {
        match self {
            TypedBuffer::U8(data) => data.len(),
            TypedBuffer::U16(data) => data.len(),
            TypedBuffer::F32(data) => data.len(),
            TypedBuffer::F64(data) => data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            TypedBuffer::U8(_) => "UInt8",
            TypedBuffer::U16(_) => "UInt16",
            TypedBuffer::F32(_) => "Float32",
            TypedBuffer::F64(_) => "Float64",
        }
    }

    /// Keeps every `stride`-th sample starting at the first, i.e. band 0 of
    /// pixel-interleaved data.
    pub fn first_band(self, stride: usize) -> Self {
        fn pick<T: Copy>(data: Vec<T>, stride: usize) -> Vec<T> {
            data.into_iter().step_by(stride).collect()
        }
        if stride <= 1 {
            return self;
        }
        match self {
            TypedBuffer::U8(data) => TypedBuffer::U8(pick(data, stride)),
            TypedBuffer::U16(data) => TypedBuffer::U16(pick(data, stride)),
            TypedBuffer::F32(data) => TypedBuffer::F32(pick(data, stride)),
            TypedBuffer::F64(data) => TypedBuffer::F64(pick(data, stride)),
        }
    }

    /// Widens every sample to f64. uint16 samples above `u16_ceiling` are
    /// truncated to it; `source` only labels the warning.
    pub fn into_f64(self, u16_ceiling: Option<u16>, source: &str) -> Vec<f64> {
        match self {
            TypedBuffer::U8(data) => data.into_iter().map(f64::from).collect(),
            TypedBuffer::U16(data) => {
                let Some(ceiling) = u16_ceiling else {
                    return data.into_iter().map(f64::from).collect();
                };
                let mut truncated = 0usize;
                let widened = data
                    .into_iter()
                    .map(|v| {
                        if v > ceiling {
                            truncated += 1;
                            f64::from(ceiling)
                        } else {
                            f64::from(v)
                        }
                    })
                    .collect();
                if truncated > 0 {
                    warn!("truncated {} values from {}", truncated, source);
                }
                widened
            }
            TypedBuffer::F32(data) => data.into_iter().map(f64::from).collect(),
            TypedBuffer::F64(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening() {
        assert_eq!(
            TypedBuffer::U8(vec![0, 255]).into_f64(None, "t"),
            vec![0.0, 255.0]
        );
        assert_eq!(
            TypedBuffer::F32(vec![0.5, -1.25]).into_f64(None, "t"),
            vec![0.5, -1.25]
        );
        assert_eq!(
            TypedBuffer::F64(vec![1e300]).into_f64(Some(1), "t"),
            vec![1e300]
        );
    }

    #[test]
    fn test_u16_ceiling() {
        let buffer = TypedBuffer::U16(vec![0, 10_000, 10_001, 65_535]);
        assert_eq!(
            buffer.clone().into_f64(Some(10_000), "t"),
            vec![0.0, 10_000.0, 10_000.0, 10_000.0]
        );
        assert_eq!(
            buffer.into_f64(None, "t"),
            vec![0.0, 10_000.0, 10_001.0, 65_535.0]
        );
    }

    #[test]
    fn test_ceiling_ignores_bytes() {
        assert_eq!(
            TypedBuffer::U8(vec![200]).into_f64(Some(100), "t"),
            vec![200.0]
        );
    }

    #[test]
    fn test_first_band() {
        let rgb = TypedBuffer::U8(vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(rgb.first_band(3), TypedBuffer::U8(vec![1, 4]));
        let gray = TypedBuffer::F32(vec![1.0, 2.0]);
        assert_eq!(gray.clone().first_band(1), gray);
    }
}
