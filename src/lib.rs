//! Webhook adapter that translates API-gateway transaction events into
//! synthetic HTTP request/response pairs and forwards them, with timing,
//! to a downstream usage-logging pipeline.

pub mod http_server;
pub mod sink;
pub mod timing;
pub mod translate;
pub mod types;
