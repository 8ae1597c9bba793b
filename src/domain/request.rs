//! Inbound merge request validation. Runs before any resource is created.

use serde_json::Value;
use thiserror::Error;
use url::Url;

pub const MAX_VIDEO_URLS: usize = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("videoUrls is required")]
    Missing,
    #[error("videoUrls must be an array")]
    NotAnArray,
    #[error("videoUrls must contain at least one URL")]
    Empty,
    #[error("videoUrls may contain at most {max} URLs, got {got}")]
    TooMany { max: usize, got: usize },
    #[error("videoUrls[{index}] is not a valid http(s) URL")]
    InvalidUrl { index: usize },
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("request body exceeds {max} bytes")]
    BodyTooLarge { max: usize },
}

/// Extracts the ordered URL list from a raw JSON body.
///
/// The body is inspected as an untyped value so that a non-array
/// `videoUrls` produces a precise error instead of a generic decode failure.
pub fn parse_video_urls(body: &Value, max_urls: usize) -> Result<Vec<String>, ValidationError> {
    let urls = body.get("videoUrls").ok_or(ValidationError::Missing)?;
    let urls = urls.as_array().ok_or(ValidationError::NotAnArray)?;

    if urls.is_empty() {
        return Err(ValidationError::Empty);
    }
    if urls.len() > max_urls {
        return Err(ValidationError::TooMany {
            max: max_urls,
            got: urls.len(),
        });
    }

    urls.iter()
        .enumerate()
        .map(|(index, value)| {
            let raw = value
                .as_str()
                .ok_or(ValidationError::InvalidUrl { index })?;
            match Url::parse(raw) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(raw.to_string()),
                _ => Err(ValidationError::InvalidUrl { index }),
            }
        })
        .collect()
}
