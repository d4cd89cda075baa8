//! SSE streaming of mount notifications.
//!
//! Converts a notification channel subscription into an SSE stream so an
//! out-of-process relocation layer can wait for an entry's off-screen subtree.

use axum::response::sse::Event;
use futures::stream::Stream;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use crate::notify::EventKey;

/// Payload of a single SSE notification.
#[derive(Debug, Serialize)]
pub struct NotificationChunk {
    pub identification: String,
    pub event: String,
    pub args: Vec<Value>,
}

/// Convert a subscription receiver into an SSE stream.
pub fn notifications_to_sse_stream(
    rx: mpsc::UnboundedReceiver<Vec<Value>>,
    key: EventKey,
) -> impl Stream<Item = Result<Event, std::convert::Infallible>> {
    UnboundedReceiverStream::new(rx).map(move |args| {
        let chunk = NotificationChunk {
            identification: key.identification.clone(),
            event: key.event.clone(),
            args,
        };

        let data = serde_json::to_string(&chunk).unwrap_or_default();
        Ok(Event::default().event(key.event.as_str()).data(data))
    })
}
