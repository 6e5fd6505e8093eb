//! Dataset metadata (`metadata.json`) shipped alongside a tile directory.
//!
//! Only a handful of paths are read:
//!
//! ```text
//! bands[].id                                          -> band mean source band
//! properties.discrete_classification_class_values     -> land-cover class values
//! properties.discrete_classification_class_names      -> land-cover class labels
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::MetadataError;

pub const CATEGORY_VALUES_PROPERTY: &str = "discrete_classification_class_values";
pub const CATEGORY_NAMES_PROPERTY: &str = "discrete_classification_class_names";

#[derive(Debug, Clone, Deserialize)]
pub struct BandDescriptor {
    pub id: String,
}

/// Parsed metadata document; read-only for the whole run.
#[derive(Debug, Clone)]
pub struct DatasetMetadata {
    document: Value,
}

impl DatasetMetadata {
    pub fn load(path: &Path) -> Result<Self, MetadataError> {
        let raw = fs::read_to_string(path).map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, MetadataError> {
        Ok(Self {
            document: serde_json::from_str(raw)?,
        })
    }

    /// Band descriptors listed under `bands`.
    pub fn bands(&self) -> Result<Vec<BandDescriptor>, MetadataError> {
        let bands = self
            .document
            .get("bands")
            .ok_or_else(|| MetadataError::MissingField("bands".to_string()))?;
        Vec::<BandDescriptor>::deserialize(bands).map_err(|e| MetadataError::Malformed {
            field: "bands".to_string(),
            index: 0,
            reason: e.to_string(),
        })
    }

    /// Id of the first listed band.
    pub fn first_band_id(&self) -> Result<String, MetadataError> {
        self.bands()?
            .into_iter()
            .next()
            .map(|band| band.id)
            .ok_or_else(|| MetadataError::MissingField("bands[0].id".to_string()))
    }

    pub fn category_values(&self, property: &str) -> Result<Vec<u16>, MetadataError> {
        let field = format!("properties.{property}");
        self.property_array(property)?
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .as_u64()
                    .and_then(|v| u16::try_from(v).ok())
                    .ok_or_else(|| MetadataError::Malformed {
                        field: field.clone(),
                        index,
                        reason: format!("{value} is not a 16-bit unsigned integer"),
                    })
            })
            .collect()
    }

    pub fn category_names(&self, property: &str) -> Result<Vec<String>, MetadataError> {
        let field = format!("properties.{property}");
        self.property_array(property)?
            .iter()
            .enumerate()
            .map(|(index, value)| {
                value
                    .as_str()
                    .map(str::to_string)
                    .ok_or_else(|| MetadataError::Malformed {
                        field: field.clone(),
                        index,
                        reason: format!("{value} is not a string"),
                    })
            })
            .collect()
    }

    fn property_array(&self, property: &str) -> Result<&Vec<Value>, MetadataError> {
        self.document
            .get("properties")
            .and_then(|properties| properties.get(property))
            .and_then(Value::as_array)
            .ok_or_else(|| MetadataError::MissingField(format!("array properties.{property}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAND_COVER: &str = r#"{
        "bands": [{"id": "discrete_classification"}, {"id": "other"}],
        "properties": {
            "discrete_classification_class_values": [1, 2],
            "discrete_classification_class_names": ["water", "forest"]
        }
    }"#;

    #[test]
    fn test_first_band_id() {
        let metadata = DatasetMetadata::from_json(LAND_COVER).unwrap();
        assert_eq!(metadata.first_band_id().unwrap(), "discrete_classification");
    }

    #[test]
    fn test_category_arrays() {
        let metadata = DatasetMetadata::from_json(LAND_COVER).unwrap();
        assert_eq!(
            metadata.category_values(CATEGORY_VALUES_PROPERTY).unwrap(),
            vec![1, 2]
        );
        assert_eq!(
            metadata.category_names(CATEGORY_NAMES_PROPERTY).unwrap(),
            vec!["water".to_string(), "forest".to_string()]
        );
    }

    #[test]
    fn test_missing_bands() {
        let metadata = DatasetMetadata::from_json(r#"{"bands": []}"#).unwrap();
        assert!(matches!(
            metadata.first_band_id(),
            Err(MetadataError::MissingField(_))
        ));
        let metadata = DatasetMetadata::from_json("{}").unwrap();
        assert!(metadata.bands().is_err());
    }

    #[test]
    fn test_malformed_category_value() {
        let metadata = DatasetMetadata::from_json(
            r#"{"properties": {"discrete_classification_class_values": [1, "two", 70000]}}"#,
        )
        .unwrap();
        match metadata.category_values(CATEGORY_VALUES_PROPERTY) {
            Err(MetadataError::Malformed { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_category_names_not_array() {
        let metadata = DatasetMetadata::from_json(
            r#"{"properties": {"discrete_classification_class_names": "water"}}"#,
        )
        .unwrap();
        assert!(matches!(
            metadata.category_names(CATEGORY_NAMES_PROPERTY),
            Err(MetadataError::MissingField(_))
        ));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            DatasetMetadata::from_json("{not json"),
            Err(MetadataError::Parse(_))
        ));
    }
}
