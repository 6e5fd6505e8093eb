//! Error types for tile analytics

use std::path::PathBuf;

use thiserror::Error;

/// Failures decoding a single raster file.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("band file not loaded: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    #[error("unhandled band type {sample_type} for {path}")]
    UnsupportedSampleType { sample_type: String, path: PathBuf },

    #[error("no georeferencing found in {0}")]
    MissingGeoreference(PathBuf),

    #[error("raster {0} contains no bands")]
    Empty(PathBuf),

    #[error("raster {path} has {len} samples, expected {width}x{height}")]
    SizeMismatch {
        path: PathBuf,
        len: usize,
        width: usize,
        height: usize,
    },

    #[cfg(feature = "gdal")]
    #[error("GDAL error for {path}: {source}")]
    Gdal {
        path: PathBuf,
        #[source]
        source: gdal::errors::GdalError,
    },
}

/// Failures reading the dataset metadata document.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("failed to read metadata {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("metadata is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to find {0} in metadata")]
    MissingField(String),

    #[error("malformed entry {index} in {field}: {reason}")]
    Malformed {
        field: String,
        index: usize,
        reason: String,
    },

    #[error("{values} category values but {labels} category names")]
    LengthMismatch { values: usize, labels: usize },

    #[error("category value {0} listed more than once")]
    DuplicateValue(u16),
}

/// Failures scanning the tile directory.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("failed to read tile directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures computing analytic values from decoded bands.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("expected {expected} bands, got {actual}")]
    BandCount { expected: usize, actual: usize },

    #[error("band shapes differ: {0}x{1} vs {2}x{3}")]
    ShapeMismatch(usize, usize, usize, usize),

    #[error("raster has no pixels")]
    EmptyRaster,

    #[error("labels unspecified")]
    NoCategories,
}

/// Top-level error for the pipeline.
#[derive(Error, Debug)]
pub enum TileError {
    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("output error: {0}")]
    Output(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TileError>;
