use crate::sink::UsageSink;
use crate::translate::{self, TranslateError};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use uuid::Uuid;

#[derive(Clone)]
struct AppState {
    sink: Arc<dyn UsageSink>,
}

/// Build the webhook router around an injected sink, so tests can substitute
/// a recording fake for the real logging client.
pub fn router(sink: Arc<dyn UsageSink>) -> Router {
    Router::new()
        .route("/", post(handle_event))
        .with_state(AppState { sink })
}

pub async fn serve(listener: TcpListener, sink: Arc<dyn UsageSink>) -> std::io::Result<()> {
    axum::serve(listener, router(sink)).await
}

/// Terminal state of one event's translation. The HTTP status is derived
/// from this exactly once per request.
enum Outcome {
    Forwarded,
    Discarded,
    Failed(TranslateError),
}

async fn handle_event(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let event_id = Uuid::new_v4();
    match process(&state, &body).await {
        Outcome::Forwarded => {
            tracing::debug!(%event_id, "event forwarded to usage logger");
            StatusCode::OK
        }
        Outcome::Discarded => {
            // Expected common case for events not marked for payload logging.
            tracing::info!(%event_id, "event not logged; log_policy is not \"payload\"");
            StatusCode::OK
        }
        Outcome::Failed(err) if err.is_decode() => {
            tracing::warn!(%event_id, error = %err, "rejected undecodable event");
            StatusCode::BAD_REQUEST
        }
        Outcome::Failed(err) => {
            tracing::warn!(%event_id, error = %err, "rejected invalid event");
            StatusCode::UNPROCESSABLE_ENTITY
        }
    }
}

async fn process(state: &AppState, body: &[u8]) -> Outcome {
    let event = match translate::decode_event(body) {
        Ok(event) => event,
        Err(err) => return Outcome::Failed(err),
    };
    if !translate::wants_full_payload(&event) {
        return Outcome::Discarded;
    }
    match translate::translate(&event) {
        Ok(record) => {
            state.sink.send(&record, None).await;
            Outcome::Forwarded
        }
        Err(err) => Outcome::Failed(err),
    }
}
