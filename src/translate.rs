use crate::timing;
use crate::types::{SyntheticRequest, SyntheticResponse, UsageRecord, WebhookEvent};
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Policy tag value marking an event for full-payload logging.
pub const FULL_PAYLOAD_POLICY: &str = "payload";

const SECURE_SCHEME: &str = "https";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("undecodable event payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("malformed request url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("status code field {0:?} does not start with three digits")]
    InvalidStatus(String),
    #[error("invalid datetime {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        source: chrono::ParseError,
    },
    #[error("invalid time_to_serve_request {value:?}: {source}")]
    InvalidInterval {
        value: String,
        source: std::num::ParseIntError,
    },
}

impl TranslateError {
    /// Structural decode failure, as opposed to a well-formed event carrying
    /// an invalid field.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

/// Parse the raw webhook body into an event record. The payload must be a
/// JSON object; serde would otherwise also accept a top-level array by
/// matching fields positionally.
pub fn decode_event(body: &[u8]) -> Result<WebhookEvent, TranslateError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if !value.is_object() {
        return Err(TranslateError::Decode(serde::de::Error::custom(
            "top-level value is not an object",
        )));
    }
    Ok(serde_json::from_value(value)?)
}

/// Whether the gateway marked this event for full-payload logging. Anything
/// other than the exact literal (including absent) means discard.
pub fn wants_full_payload(event: &WebhookEvent) -> bool {
    event.log_policy == FULL_PAYLOAD_POLICY
}

/// Reconstruct both halves of the exchange plus timing. Pure function of the
/// event's fields.
pub fn translate(event: &WebhookEvent) -> Result<UsageRecord, TranslateError> {
    Ok(UsageRecord {
        request: build_request(event)?,
        response: build_response(event)?,
        timing: timing::compute_timing(event)?,
    })
}

pub fn build_request(event: &WebhookEvent) -> Result<SyntheticRequest, TranslateError> {
    let raw = format!(
        "{}://{}{}?{}",
        event.request_protocol, event.host, event.uri_path, event.query_string
    );
    let url = Url::parse(&raw).map_err(|source| TranslateError::InvalidUrl { url: raw, source })?;
    Ok(SyntheticRequest {
        method: event.request_method.clone(),
        url,
        host: event.host.clone(),
        headers: flatten_headers(&event.request_http_headers),
        body: Bytes::from(event.request_body.clone()),
        secure: event.request_protocol.eq_ignore_ascii_case(SECURE_SCHEME),
    })
}

pub fn build_response(event: &WebhookEvent) -> Result<SyntheticResponse, TranslateError> {
    Ok(SyntheticResponse {
        status: parse_status(&event.status_code)?,
        headers: flatten_headers(&event.response_http_headers),
        body: Bytes::from(event.response_body.clone()),
    })
}

/// Collapse the gateway's ordered list of single-key maps into a header map.
/// Keys are case-insensitive; the last entry in sequence order wins.
fn flatten_headers(entries: &[HashMap<String, String>]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for entry in entries {
        for (key, value) in entry {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::debug!(key = %key, "skipping malformed header entry");
                continue;
            };
            headers.insert(name, value);
        }
    }
    headers
}

/// The gateway reports status as text, possibly with a reason phrase
/// ("404 Not Found"). The numeric status is exactly the first three digits.
fn parse_status(field: &str) -> Result<u16, TranslateError> {
    let digits = field
        .get(..3)
        .filter(|d| d.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| TranslateError::InvalidStatus(field.to_string()))?;
    digits
        .parse()
        .map_err(|_| TranslateError::InvalidStatus(field.to_string()))
}
