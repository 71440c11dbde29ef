use crate::translate::TranslateError;
use crate::types::{Timing, WebhookEvent};
use chrono::DateTime;

/// Derive the absolute completion time and serve duration for one event.
///
/// The datetime field must be RFC 3339 with an explicit offset; fractional
/// seconds down to nanoseconds are accepted and truncated to milliseconds.
/// The serve duration is passed through as-is — the gateway already reports
/// it in the unit the downstream pipeline expects, and sign/magnitude are
/// not checked here.
pub fn compute_timing(event: &WebhookEvent) -> Result<Timing, TranslateError> {
    let completed = DateTime::parse_from_rfc3339(&event.datetime).map_err(|source| {
        TranslateError::InvalidTimestamp {
            value: event.datetime.clone(),
            source,
        }
    })?;
    let interval_millis = event.time_to_serve_request.parse().map_err(|source| {
        TranslateError::InvalidInterval {
            value: event.time_to_serve_request.clone(),
            source,
        }
    })?;
    Ok(Timing {
        time_millis: completed.timestamp_millis(),
        interval_millis,
    })
}
