use axum::body::Bytes;
use axum::http::HeaderMap;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// One API-gateway transaction event, as delivered by the gateway's webhook.
///
/// Only the request/response/timing fields participate in reconstruction; the
/// rest is gateway metadata carried so that a payload containing it still
/// decodes. Unknown fields are ignored and absent fields take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct WebhookEvent {
    pub log_policy: String,
    #[serde(rename = "@version")]
    pub version: String,
    pub tags: Vec<String>,
    pub gateway_ip: String,

    pub uri_path: String,
    pub request_method: String,
    pub request_protocol: String,
    pub request_http_headers: Vec<HashMap<String, String>>,
    pub request_body: String,
    pub host: String,
    pub http_user_agent: String,
    pub query_string: String,
    pub client_ip: String,
    pub immediate_client_ip: String,

    pub status_code: String,
    pub response_http_headers: Vec<HashMap<String, String>>,
    pub response_body: String,

    pub time_to_serve_request: String,
    pub datetime: String,
    #[serde(rename = "@timestamp")]
    pub timestamp: String,

    pub bytes_sent: String,
    pub bytes_received: String,
    pub transaction_id: String,
    pub global_transaction_id: String,
    pub latency_info: Vec<HashMap<String, String>>,
    pub opentracing_info: Vec<Value>,

    pub headers: HashMap<String, String>,
    pub domain_name: String,
    pub endpoint_url: String,

    pub api_id: String,
    pub api_name: String,
    pub api_version: String,
    pub org_id: String,
    pub org_name: String,
    pub app_name: String,
    pub product_name: String,
    pub developer_org_id: String,
    pub developer_org_name: String,
    pub developer_org_title: String,
    pub resource_id: String,
    pub resource_path: String,
    pub plan_id: String,
    pub plan_name: String,
    pub catalog_id: String,
    pub catalog_name: String,
    pub client_id: String,
    pub billing: HashMap<String, Value>,
}

/// In-memory reconstruction of the request half of a gateway transaction.
/// Never transmitted over a real connection.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticRequest {
    pub method: String,
    pub url: Url,
    pub host: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// True iff the scheme names an encrypted transport. Informational only;
    /// carries no handshake state.
    pub secure: bool,
}

/// In-memory reconstruction of the response half of a gateway transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// When the transaction completed and how long it took, in the units the
/// downstream pipeline expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Epoch milliseconds; sub-millisecond precision truncated.
    pub time_millis: i64,
    /// Passed through from the event with no unit conversion.
    pub interval_millis: i64,
}

/// Everything the forwarder hands to the logging client for one event.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageRecord {
    pub request: SyntheticRequest,
    pub response: SyntheticResponse,
    pub timing: Timing,
}
