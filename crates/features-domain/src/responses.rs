//! Exception response bodies for error replies.

use serde::{Deserialize, Serialize};

/// Problem-style body returned with every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptionResponse {
    /// Exception type identifier.
    #[serde(rename = "type")]
    pub type_: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// HTTP status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,

    /// Detailed error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ExceptionResponse {
    /// Create a new exception response.
    pub fn new(type_: impl Into<String>, status: u16, detail: impl Into<String>) -> Self {
        Self {
            type_: type_.into(),
            title: None,
            status: Some(status),
            detail: Some(detail.into()),
        }
    }

    /// Set the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Create a 400 Bad Request exception.
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-features-1/1.0/invalid-parameter-value",
            400,
            detail,
        )
        .with_title("Bad Request")
    }

    /// Create a 404 Not Found exception.
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-features-1/1.0/not-found",
            404,
            detail,
        )
        .with_title("Not Found")
    }

    /// Create a 500 Internal Server Error exception.
    pub fn internal_error(detail: impl Into<String>) -> Self {
        Self::new(
            "http://www.opengis.net/def/exceptions/ogcapi-features-1/1.0/server-error",
            500,
            detail,
        )
        .with_title("Internal Server Error")
    }
}
