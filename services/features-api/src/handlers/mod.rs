//! HTTP request handlers for the features API.

pub mod features;
pub mod health;

use axum::http::{header, StatusCode};
use axum::response::Response;

use features_domain::ExceptionResponse;
use ogc_common::FeaturesError;

pub(crate) fn error_response(status: StatusCode, exc: ExceptionResponse) -> Response {
    let json = serde_json::to_string(&exc).unwrap_or_default();
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(json.into())
        .unwrap()
}

/// Map a validation error to its HTTP response. Only for errors whose
/// message may be echoed to the client; backend errors are sanitized at
/// the call site instead.
pub(crate) fn client_error_response(err: &FeaturesError) -> Response {
    debug_assert!(err.is_client_safe());
    let status = StatusCode::from_u16(err.http_status_code())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let exc = if status == StatusCode::NOT_FOUND {
        ExceptionResponse::not_found(err.to_string())
    } else {
        ExceptionResponse::bad_request(err.to_string())
    };
    error_response(status, exc)
}
