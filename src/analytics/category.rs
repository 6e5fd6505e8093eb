//! Land-cover category counting and its three presentations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;
use tracing::debug;

use super::{TileSource, Transformer};
use crate::error::{MetadataError, RasterError, TransformError};
use crate::metadata::{DatasetMetadata, CATEGORY_NAMES_PROPERTY, CATEGORY_VALUES_PROPERTY};
use crate::raster::RasterBand;
use crate::tile::Tile;

/// Copernicus land-cover classification layer.
pub const LAND_COVER_BAND: &str = "discrete_classification";

/// A class label and the pixel value that encodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryDescriptor {
    pub value: u16,
    pub label: String,
}

/// Per-class pixel counts for one band. Pixels whose value matches no class
/// land in `unclassified` and are never reported as a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTally {
    pub counts: Vec<u64>,
    pub unclassified: u64,
    pub pixels: usize,
}

/// Maps pixel values to class indices and counts them.
#[derive(Debug, Clone)]
pub struct CategoryCounter {
    categories: Vec<CategoryDescriptor>,
    index: HashMap<u16, usize>,
}

impl CategoryCounter {
    /// `values` and `labels` are parallel arrays; values must be unique.
    pub fn new(values: Vec<u16>, labels: Vec<String>) -> Result<Self, MetadataError> {
        if values.len() != labels.len() {
            return Err(MetadataError::LengthMismatch {
                values: values.len(),
                labels: labels.len(),
            });
        }

        let mut index = HashMap::with_capacity(values.len());
        let mut categories = Vec::with_capacity(values.len());
        for (idx, (value, label)) in values.into_iter().zip(labels).enumerate() {
            if index.insert(value, idx).is_some() {
                return Err(MetadataError::DuplicateValue(value));
            }
            categories.push(CategoryDescriptor { value, label });
        }

        Ok(Self { categories, index })
    }

    pub fn from_metadata(metadata: &DatasetMetadata) -> Result<Self, MetadataError> {
        let labels = metadata.category_names(CATEGORY_NAMES_PROPERTY)?;
        let values = metadata.category_values(CATEGORY_VALUES_PROPERTY)?;
        Self::new(values, labels)
    }

    pub fn categories(&self) -> &[CategoryDescriptor] {
        &self.categories
    }

    /// Class index for a raw sample; non-integral or unknown values have none.
    pub fn class_index(&self, sample: f64) -> Option<usize> {
        if sample.fract() != 0.0 || !(0.0..=f64::from(u16::MAX)).contains(&sample) {
            return None;
        }
        self.index.get(&(sample as u16)).copied()
    }

    pub fn count(&self, band: &RasterBand) -> CategoryTally {
        let classes = self.categories.len();
        // last slot collects unclassified pixels
        let mut counts = band
            .data
            .par_iter()
            .fold(
                || vec![0u64; classes + 1],
                |mut counts, &sample| {
                    let slot = self.class_index(sample).unwrap_or(classes);
                    counts[slot] += 1;
                    counts
                },
            )
            .reduce(
                || vec![0u64; classes + 1],
                |mut a, b| {
                    a.iter_mut().zip(b).for_each(|(a, b)| *a += b);
                    a
                },
            );

        let unclassified = counts.pop().unwrap_or(0);
        if unclassified > 0 {
            debug!("{} pixels matched no category", unclassified);
        }
        CategoryTally {
            counts,
            unclassified,
            pixels: band.pixel_count(),
        }
    }
}

/// How raw counts are turned into output values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryPresentation {
    /// Pixel count per class.
    Raw,
    /// Count divided by the band's total pixel count.
    Percentage,
    /// 1 when the class occurs at all, else 0.
    Binary,
}

impl CategoryPresentation {
    pub fn present(&self, tally: &CategoryTally) -> Result<Vec<f64>, TransformError> {
        let values = match self {
            CategoryPresentation::Raw => tally.counts.iter().map(|&c| c as f64).collect(),
            CategoryPresentation::Percentage => {
                if tally.pixels == 0 {
                    return Err(TransformError::EmptyRaster);
                }
                let total = tally.pixels as f64;
                tally.counts.iter().map(|&c| c as f64 / total).collect()
            }
            CategoryPresentation::Binary => tally
                .counts
                .iter()
                .map(|&c| if c > 0 { 1.0 } else { 0.0 })
                .collect(),
        };
        Ok(values)
    }
}

/// Category counts over the land-cover band, presented per `presentation`.
#[derive(Debug)]
pub struct CategoryAnalytic {
    counter: CategoryCounter,
    presentation: CategoryPresentation,
    unclassified: AtomicU64,
}

impl CategoryAnalytic {
    pub fn new(counter: CategoryCounter, presentation: CategoryPresentation) -> Self {
        Self {
            counter,
            presentation,
            unclassified: AtomicU64::new(0),
        }
    }

    pub fn from_metadata(
        metadata: &DatasetMetadata,
        presentation: CategoryPresentation,
    ) -> Result<Self, MetadataError> {
        Ok(Self::new(CategoryCounter::from_metadata(metadata)?, presentation))
    }
}

impl Transformer for CategoryAnalytic {
    fn setup(&self, source: &TileSource, tile: &Tile) -> Result<Vec<RasterBand>, RasterError> {
        Ok(vec![source.load_band(tile, LAND_COVER_BAND)?])
    }

    fn transform(&self, bands: &[RasterBand]) -> Result<Vec<f64>, TransformError> {
        if self.counter.categories().is_empty() {
            return Err(TransformError::NoCategories);
        }
        let Some(band) = bands.first() else {
            return Err(TransformError::BandCount {
                expected: 1,
                actual: 0,
            });
        };
        let tally = self.counter.count(band);
        self.unclassified.fetch_add(tally.unclassified, Ordering::Relaxed);
        self.presentation.present(&tally)
    }

    fn unclassified_pixels(&self) -> u64 {
        self.unclassified.load(Ordering::Relaxed)
    }

    fn value_names(&self) -> Vec<String> {
        self.counter
            .categories()
            .iter()
            .map(|category| category.label.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::band;
    use proptest::prelude::*;

    fn water_forest() -> CategoryCounter {
        CategoryCounter::new(vec![1, 2], vec!["water".into(), "forest".into()]).unwrap()
    }

    #[test]
    fn test_raw_counts_skip_unclassified() {
        let tally = water_forest().count(&band(vec![1.0, 1.0, 2.0, 9.0], 2, 2));
        assert_eq!(tally.counts, vec![2, 1]);
        assert_eq!(tally.unclassified, 1);
        assert_eq!(tally.pixels, 4);

        let raw = CategoryAnalytic::new(water_forest(), CategoryPresentation::Raw);
        assert_eq!(
            raw.transform(&[band(vec![1.0, 1.0, 2.0, 9.0], 2, 2)]).unwrap(),
            vec![2.0, 1.0]
        );
        assert_eq!(raw.value_names(), vec!["water", "forest"]);
    }

    #[test]
    fn test_percentage_uses_all_pixels() {
        let analytic = CategoryAnalytic::new(water_forest(), CategoryPresentation::Percentage);
        let values = analytic
            .transform(&[band(vec![1.0, 1.0, 2.0, 9.0], 2, 2)])
            .unwrap();
        assert_eq!(values, vec![0.5, 0.25]);
    }

    #[test]
    fn test_unclassified_pixels_accumulate() {
        let analytic = CategoryAnalytic::new(water_forest(), CategoryPresentation::Raw);
        assert_eq!(analytic.unclassified_pixels(), 0);
        analytic.transform(&[band(vec![1.0, 9.0, 7.0, 2.0], 2, 2)]).unwrap();
        analytic.transform(&[band(vec![0.5, 2.0], 2, 1)]).unwrap();
        assert_eq!(analytic.unclassified_pixels(), 3);
    }

    #[test]
    fn test_binary() {
        let analytic = CategoryAnalytic::new(water_forest(), CategoryPresentation::Binary);
        let values = analytic.transform(&[band(vec![2.0, 2.0, 9.0], 3, 1)]).unwrap();
        assert_eq!(values, vec![0.0, 1.0]);
    }

    #[test]
    fn test_non_integral_samples_unclassified() {
        let counter = water_forest();
        assert_eq!(counter.class_index(1.0), Some(0));
        assert_eq!(counter.class_index(1.5), None);
        assert_eq!(counter.class_index(-1.0), None);
        assert_eq!(counter.class_index(f64::NAN), None);
        assert_eq!(counter.class_index(1e9), None);
    }

    #[test]
    fn test_construction_errors() {
        assert!(matches!(
            CategoryCounter::new(vec![1, 2], vec!["water".into()]),
            Err(MetadataError::LengthMismatch { values: 2, labels: 1 })
        ));
        assert!(matches!(
            CategoryCounter::new(vec![1, 1], vec!["a".into(), "b".into()]),
            Err(MetadataError::DuplicateValue(1))
        ));
    }

    #[test]
    fn test_no_categories() {
        let analytic = CategoryAnalytic::new(
            CategoryCounter::new(vec![], vec![]).unwrap(),
            CategoryPresentation::Raw,
        );
        assert!(matches!(
            analytic.transform(&[band(vec![1.0], 1, 1)]),
            Err(TransformError::NoCategories)
        ));
    }

    #[test]
    fn test_from_metadata_keeps_listed_order() {
        let metadata = DatasetMetadata::from_json(
            r#"{"properties": {
                "discrete_classification_class_values": [80, 20, 50],
                "discrete_classification_class_names": ["water", "shrubs", "urban"]
            }}"#,
        )
        .unwrap();
        let counter = CategoryCounter::from_metadata(&metadata).unwrap();
        let labels: Vec<&str> = counter
            .categories()
            .iter()
            .map(|c| c.label.as_str())
            .collect();
        assert_eq!(labels, vec!["water", "shrubs", "urban"]);
        assert_eq!(counter.class_index(20.0), Some(1));
    }

    proptest! {
        #[test]
        fn prop_presentations_are_consistent(
            samples in prop::collection::vec(0u16..6, 1..200)
        ) {
            let counter = CategoryCounter::new(
                vec![1, 2, 3],
                vec!["a".into(), "b".into(), "c".into()],
            )
            .unwrap();
            let width = samples.len();
            let raster = band(samples.iter().map(|&s| s as f64).collect(), width, 1);
            let tally = counter.count(&raster);

            let percentage = CategoryPresentation::Percentage.present(&tally).unwrap();
            prop_assert!(percentage.iter().sum::<f64>() <= 1.0 + 1e-12);
            for (p, c) in percentage.iter().zip(&tally.counts) {
                prop_assert_eq!(*p, *c as f64 / width as f64);
            }

            let binary = CategoryPresentation::Binary.present(&tally).unwrap();
            prop_assert!(binary.iter().all(|&b| b == 0.0 || b == 1.0));

            let total: u64 = tally.counts.iter().sum::<u64>() + tally.unclassified;
            prop_assert_eq!(total as usize, width);
        }
    }
}
