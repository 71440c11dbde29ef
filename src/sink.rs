use crate::types::UsageRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// Downstream usage-logging client.
///
/// The adapter treats delivery as a black box: `send` is fire-and-forget and
/// must be safe to call from many request tasks at once. Implementations own
/// sampling, batching, and retry; the caller never sees a delivery failure.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn send(&self, record: &UsageRecord, custom_fields: Option<&HashMap<String, String>>);
}

#[derive(Debug, Clone)]
pub struct SinkOptions {
    /// Destination endpoint of the usage-logging pipeline.
    pub url: String,
    /// Rule expression controlling what the pipeline samples. Carried as-is;
    /// an empty expression disables submission entirely.
    pub rules: String,
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("usage logger url is not set")]
    MissingUrl,
    #[error("invalid usage logger url {url:?}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
}

/// Sink that submits each usage message to the logging pipeline over HTTP.
/// Created once at startup and shared by every request task.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
    rules: String,
}

impl HttpSink {
    pub fn new(options: SinkOptions) -> Result<Self, SinkError> {
        if options.url.is_empty() {
            return Err(SinkError::MissingUrl);
        }
        let endpoint = Url::parse(&options.url).map_err(|source| SinkError::InvalidUrl {
            url: options.url.clone(),
            source,
        })?;
        Ok(Self {
            client: reqwest::Client::new(),
            endpoint,
            rules: options.rules,
        })
    }

    fn enabled(&self) -> bool {
        !self.rules.trim().is_empty()
    }
}

#[async_trait]
impl UsageSink for HttpSink {
    async fn send(&self, record: &UsageRecord, custom_fields: Option<&HashMap<String, String>>) {
        if !self.enabled() {
            tracing::debug!("usage sink disabled by empty rules");
            return;
        }
        let message = encode_message(record, custom_fields);
        let request = self.client.post(self.endpoint.clone()).json(&message);
        // Submission runs detached so a slow backend never stalls the
        // webhook response path.
        tokio::spawn(async move {
            match request.send().await {
                Ok(response) if !response.status().is_success() => {
                    tracing::warn!(status = %response.status(), "usage logger rejected message");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(error = %err, "failed to submit usage message");
                }
            }
        });
    }
}

/// Flatten one record into the pipeline's name/value-pair message format.
fn encode_message(
    record: &UsageRecord,
    custom_fields: Option<&HashMap<String, String>>,
) -> Vec<(String, String)> {
    let mut message = vec![
        ("request_method".to_string(), record.request.method.clone()),
        ("request_url".to_string(), record.request.url.to_string()),
    ];
    for (name, value) in &record.request.headers {
        message.push((
            format!("request_header:{}", name.as_str()),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }
    if !record.request.body.is_empty() {
        message.push((
            "request_body".to_string(),
            String::from_utf8_lossy(&record.request.body).into_owned(),
        ));
    }
    message.push((
        "response_code".to_string(),
        record.response.status.to_string(),
    ));
    for (name, value) in &record.response.headers {
        message.push((
            format!("response_header:{}", name.as_str()),
            String::from_utf8_lossy(value.as_bytes()).into_owned(),
        ));
    }
    if !record.response.body.is_empty() {
        message.push((
            "response_body".to_string(),
            String::from_utf8_lossy(&record.response.body).into_owned(),
        ));
    }
    message.push(("now".to_string(), record.timing.time_millis.to_string()));
    message.push((
        "interval".to_string(),
        record.timing.interval_millis.to_string(),
    ));
    if let Some(fields) = custom_fields {
        for (key, value) in fields {
            message.push((format!("custom_field:{key}"), value.clone()));
        }
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SyntheticRequest, SyntheticResponse, Timing};
    use axum::body::Bytes;
    use axum::http::HeaderMap;

    fn record() -> UsageRecord {
        let mut response_headers = HeaderMap::new();
        response_headers.insert("content-type", "application/json".parse().unwrap());
        UsageRecord {
            request: SyntheticRequest {
                method: "POST".to_string(),
                url: Url::parse("https://api.example.com/v1/orders?limit=10").unwrap(),
                host: "api.example.com".to_string(),
                headers: HeaderMap::new(),
                body: Bytes::from_static(b"{\"q\":1}"),
                secure: true,
            },
            response: SyntheticResponse {
                status: 201,
                headers: response_headers,
                body: Bytes::new(),
            },
            timing: Timing {
                time_millis: 1_641_038_400_250,
                interval_millis: 42,
            },
        }
    }

    fn field<'a>(message: &'a [(String, String)], name: &str) -> Option<&'a str> {
        message
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn message_carries_exchange_and_timing() {
        let message = encode_message(&record(), None);
        assert_eq!(field(&message, "request_method"), Some("POST"));
        assert_eq!(
            field(&message, "request_url"),
            Some("https://api.example.com/v1/orders?limit=10")
        );
        assert_eq!(field(&message, "request_body"), Some("{\"q\":1}"));
        assert_eq!(field(&message, "response_code"), Some("201"));
        assert_eq!(
            field(&message, "response_header:content-type"),
            Some("application/json")
        );
        assert_eq!(field(&message, "now"), Some("1641038400250"));
        assert_eq!(field(&message, "interval"), Some("42"));
    }

    #[test]
    fn empty_bodies_are_omitted() {
        let message = encode_message(&record(), None);
        assert_eq!(field(&message, "response_body"), None);
    }

    #[test]
    fn custom_fields_are_appended() {
        let extras = HashMap::from([("tenant".to_string(), "acme".to_string())]);
        let message = encode_message(&record(), Some(&extras));
        assert_eq!(field(&message, "custom_field:tenant"), Some("acme"));
    }

    #[test]
    fn sink_requires_a_destination_url() {
        let missing = HttpSink::new(SinkOptions {
            url: String::new(),
            rules: "include debug".to_string(),
        });
        assert!(matches!(missing, Err(SinkError::MissingUrl)));

        let invalid = HttpSink::new(SinkOptions {
            url: "not a url".to_string(),
            rules: "include debug".to_string(),
        });
        assert!(matches!(invalid, Err(SinkError::InvalidUrl { .. })));
    }
}
