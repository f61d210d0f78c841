use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

/// Streams broadcast messages accepted by `keep` as named SSE events with a JSON
/// payload. Slow clients skip what they missed.
pub(crate) fn broadcast_sse<T, F>(
    receiver: broadcast::Receiver<T>,
    event_name: &'static str,
    keep: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Serialize + Clone + Send + 'static,
    F: Fn(&T) -> bool + Send + 'static,
{
    let stream = BroadcastStream::new(receiver).filter_map(move |message| match message {
        Ok(item) if keep(&item) => match serde_json::to_string(&item) {
            Ok(data) => Some(Ok(Event::default().event(event_name).data(data))),
            Err(err) => {
                tracing::error!(error = %err, event = event_name, "Failed to encode SSE event");
                None
            }
        },
        Ok(_) => None,
        Err(BroadcastStreamRecvError::Lagged(skipped)) => {
            tracing::warn!(skipped, event = event_name, "SSE subscriber lagged");
            None
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
