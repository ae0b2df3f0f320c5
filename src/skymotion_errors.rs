use thiserror::Error;

use crate::{constants::ImageIndex, sources::catalog_reader::ParseCatalogError};

#[derive(Error, Debug)]
pub enum SkymotionError {
    #[error("Invalid detection parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid observation timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Missing time field for date without time part: {0}")]
    MissingTimeField(String),

    #[error("Invalid exclusion zone: {0}")]
    InvalidExclusionZone(String),

    #[error("Error during the source catalog parsing: {0}")]
    CatalogParse(ParseCatalogError),

    #[error("Image index {0} appears in more than one catalog")]
    DuplicateImageIndex(ImageIndex),

    #[error("Image index {0} is not part of the input images")]
    UnknownImage(ImageIndex),

    #[error("Unsupported segment batch schema version: {0}")]
    UnsupportedBatchVersion(u32),

    #[error("Worker pool error: {0}")]
    WorkerPool(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<ParseCatalogError> for SkymotionError {
    fn from(err: ParseCatalogError) -> Self {
        SkymotionError::CatalogParse(err)
    }
}

impl From<rayon::ThreadPoolBuildError> for SkymotionError {
    fn from(err: rayon::ThreadPoolBuildError) -> Self {
        SkymotionError::WorkerPool(err.to_string())
    }
}

impl PartialEq for SkymotionError {
    fn eq(&self, other: &Self) -> bool {
        use SkymotionError::*;
        match (self, other) {
            (InvalidParameter(a), InvalidParameter(b)) => a == b,
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (MissingTimeField(a), MissingTimeField(b)) => a == b,
            (InvalidExclusionZone(a), InvalidExclusionZone(b)) => a == b,
            (CatalogParse(a), CatalogParse(b)) => a == b,
            (DuplicateImageIndex(a), DuplicateImageIndex(b)) => a == b,
            (UnknownImage(a), UnknownImage(b)) => a == b,
            (UnsupportedBatchVersion(a), UnsupportedBatchVersion(b)) => a == b,
            (WorkerPool(a), WorkerPool(b)) => a == b,

            // Not comparable: equal when same variant
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,
            (JsonError(_), JsonError(_)) => true,

            _ => false,
        }
    }
}
