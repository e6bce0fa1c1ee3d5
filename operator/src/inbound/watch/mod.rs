//! Watch stream intake.
//!
//! Reads Kubernetes-style watch events (`{"type": ..., "object": {...}}`)
//! from a byte stream, concatenated or newline-delimited, and forwards them
//! to the controller. Objects of kind `Database` are tenant descriptors and
//! objects of kind `Secret` are credential holders; other kinds are ignored.
//! Events that do not match the expected shape are logged and skipped. A
//! syntax error ends the stream, since the reader cannot resynchronise.

mod dto;

use std::io::Read;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use self::dto::WatchEventDto;
use super::ResourceEvent;

/// Counters describing one pass over a watch stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchSummary {
    /// Events handed to the controller.
    pub forwarded: usize,
    /// Events dropped as malformed.
    pub skipped: usize,
    /// Events about kinds the operator does not watch.
    pub ignored: usize,
}

/// Failures that end a watch stream early.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The stream could not be read.
    #[error("watch stream read failed: {0}")]
    Io(#[source] serde_json::Error),
    /// The stream is not valid JSON.
    #[error("watch stream is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),
}

/// Reasons a single watch event is skipped.
#[derive(Debug, Error)]
pub enum WatchEventError {
    /// The event is not a `{"type", "object"}` envelope.
    #[error("malformed watch event: {0}")]
    Envelope(#[source] serde_json::Error),
    /// The object's `kind` is not a string.
    #[error("unreadable kind: {0}")]
    Kind(#[source] serde_json::Error),
    /// The object does not match the shape of its kind.
    #[error("malformed {kind}: {source}")]
    Object {
        /// Kind named by the object.
        kind: &'static str,
        /// Decoding failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Decode one watch event.
///
/// Returns `Ok(None)` for kinds the operator does not watch.
///
/// # Examples
/// ```
/// use operator::domain::ResourceKey;
/// use operator::inbound::{ResourceEvent, decode_watch_event};
/// use serde_json::json;
///
/// let event = decode_watch_event(json!({
///     "type": "DELETED",
///     "object": {"kind": "Secret", "metadata": {"name": "db", "namespace": "ns"}}
/// }))
/// .expect("event decodes");
/// assert_eq!(event, Some(ResourceEvent::CredentialDeleted(ResourceKey::new("ns", "db"))));
/// ```
pub fn decode_watch_event(value: Value) -> Result<Option<ResourceEvent>, WatchEventError> {
    let dto = WatchEventDto::deserialize(value).map_err(WatchEventError::Envelope)?;
    dto.into_resource_event()
}

/// Forward every event in `reader` to `events`.
///
/// Blocks the calling thread; run it off the async runtime. Returns once
/// the stream ends or the receiving side is dropped.
pub fn read_watch_events<R: Read>(
    reader: R,
    events: &mpsc::Sender<ResourceEvent>,
) -> Result<WatchSummary, WatchError> {
    let mut summary = WatchSummary::default();
    for value in serde_json::Deserializer::from_reader(reader).into_iter::<Value>() {
        let value = value.map_err(|err| {
            if err.is_io() {
                WatchError::Io(err)
            } else {
                WatchError::Syntax(err)
            }
        })?;

        match decode_watch_event(value) {
            Ok(Some(event)) => {
                debug!(resource = %event.key(), "Received watch event");
                if events.blocking_send(event).is_err() {
                    info!("Controller stopped; closing watch stream");
                    return Ok(summary);
                }
                summary.forwarded += 1;
            }
            Ok(None) => summary.ignored += 1,
            Err(err) => {
                warn!(error = %err, "Skipping malformed watch event");
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}
