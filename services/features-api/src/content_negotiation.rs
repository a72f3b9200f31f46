//! Content negotiation for the `f` query parameter and Accept header.

use axum::http::{header, HeaderMap};

use ogc_common::FeaturesError;

/// Media types the items endpoints can produce.
pub const SUPPORTED_MEDIA_TYPES: &[&str] = &["application/geo+json", "application/json"];

/// Output format for feature responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// GeoJSON format (default)
    #[default]
    GeoJson,
}

impl OutputFormat {
    /// Get the Content-Type header value for this format.
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "application/geo+json",
        }
    }

    /// Value used for the `f` parameter in generated links.
    pub fn query_value(&self) -> &'static str {
        match self {
            OutputFormat::GeoJson => "json",
        }
    }

    /// Parse format from the `f` query parameter value.
    /// Supports various aliases for convenience.
    pub fn from_query_param(f: &str) -> Option<Self> {
        match f.to_lowercase().as_str() {
            "json" | "geojson" | "geo+json" | "application/json" | "application/geo+json" => {
                Some(OutputFormat::GeoJson)
            }
            _ => None,
        }
    }

    /// Parse format from an Accept header media type.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        match media_type {
            "application/geo+json" | "application/json" => Some(OutputFormat::GeoJson),
            _ => None,
        }
    }
}

/// Negotiate the output format based on the `f` query parameter and
/// Accept header.
///
/// Priority:
/// 1. If `f` is provided (and non-empty), use it (explicit format request)
/// 2. Otherwise, check the Accept header for a preferred format
/// 3. Default to GeoJSON if no preference is specified
pub fn negotiate_format(
    headers: &HeaderMap,
    f_param: Option<&str>,
) -> Result<OutputFormat, FeaturesError> {
    // Treat empty string as no parameter (some clients send f= with an
    // empty value)
    if let Some(f) = f_param {
        if !f.is_empty() {
            return OutputFormat::from_query_param(f)
                .ok_or_else(|| FeaturesError::UnsupportedFormat(f.to_string()));
        }
    }

    let accept = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("*/*");

    // Parse Accept header with quality values
    let mut accepted_types: Vec<(&str, f32)> = accept
        .split(',')
        .filter_map(|s| {
            let parts: Vec<&str> = s.split(';').collect();
            let media_type = parts.first()?.trim();
            if media_type.is_empty() {
                return None;
            }

            let quality = parts
                .iter()
                .find_map(|p| {
                    let p = p.trim();
                    if let Some(q) = p.strip_prefix("q=") {
                        q.parse::<f32>().ok()
                    } else {
                        None
                    }
                })
                .unwrap_or(1.0);

            Some((media_type, quality))
        })
        .collect();

    accepted_types.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    for (media_type, _) in &accepted_types {
        if *media_type == "*/*" || *media_type == "application/*" {
            return Ok(OutputFormat::GeoJson);
        }
        if let Some(format) = OutputFormat::from_media_type(media_type) {
            return Ok(format);
        }
    }

    if accepted_types.is_empty() {
        return Ok(OutputFormat::GeoJson);
    }

    Err(FeaturesError::UnsupportedFormat(accept.to_string()))
}
