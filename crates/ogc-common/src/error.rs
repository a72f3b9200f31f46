//! Error types for the feature server.

use thiserror::Error;

/// Result type alias using FeaturesError.
pub type FeaturesResult<T> = Result<T, FeaturesError>;

/// Primary error type for feature query operations.
#[derive(Debug, Error)]
pub enum FeaturesError {
    // === Client input errors (safe to echo back) ===
    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("unknown query parameter(s) found: {0}")]
    UnknownParameters(String),

    #[error("{0}")]
    InvalidLimit(String),

    #[error("{0}")]
    InvalidBbox(String),

    #[error("{0}")]
    InvalidCrs(String),

    /// Reserved query surface (datetime, CQL filter) that is rejected
    /// rather than silently ignored.
    #[error("{0} param is currently not supported")]
    UnsupportedParameter(String),

    #[error("feature ID must be a number")]
    NonNumericFeatureId,

    #[error("Requested format not supported: {0}")]
    UnsupportedFormat(String),

    // === Not-found conditions ===
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Feature {feature_id} not found in collection {collection}")]
    FeatureNotFound {
        collection: String,
        feature_id: i64,
    },

    // === Backend/internal errors (never sent to clients verbatim) ===
    #[error("Datasource error: {0}")]
    DatasourceError(String),

    #[error("Failed to map row to feature: {0}")]
    RowMappingError(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

impl FeaturesError {
    /// Get the HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            FeaturesError::InvalidParameter { .. }
            | FeaturesError::UnknownParameters(_)
            | FeaturesError::InvalidLimit(_)
            | FeaturesError::InvalidBbox(_)
            | FeaturesError::InvalidCrs(_)
            | FeaturesError::UnsupportedParameter(_)
            | FeaturesError::NonNumericFeatureId
            | FeaturesError::UnsupportedFormat(_) => 400,

            FeaturesError::CollectionNotFound(_) | FeaturesError::FeatureNotFound { .. } => 404,

            _ => 500,
        }
    }

    /// Whether the error message is safe to expose to a client. Backend
    /// errors may disclose datasource structure and must be sanitized at
    /// the boundary.
    pub fn is_client_safe(&self) -> bool {
        self.http_status_code() < 500
    }
}

impl From<std::io::Error> for FeaturesError {
    fn from(err: std::io::Error) -> Self {
        FeaturesError::InternalError(err.to_string())
    }
}
