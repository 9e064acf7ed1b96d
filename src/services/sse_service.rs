//! Bridges per-match broadcast channels to SSE responses.

use std::convert::Infallible;

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use tokio::sync::broadcast;
use tokio_stream::wrappers::{BroadcastStream, errors::BroadcastStreamRecvError};
use tracing::warn;

use crate::dto::events::ServerEvent;

/// Convert a match channel subscription into a stream of SSE frames.
///
/// Lagging subscribers skip the missed events instead of terminating the
/// stream; clients are expected to refetch the match view after a gap.
pub fn to_sse_stream(
    receiver: broadcast::Receiver<ServerEvent>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(receiver).filter_map(|message| async move {
        match message {
            Ok(server_event) => {
                match Event::default()
                    .event(server_event.event.clone())
                    .json_data(&server_event.data)
                {
                    Ok(frame) => Some(Ok(frame)),
                    Err(err) => {
                        warn!(event = %server_event.event, error = %err, "dropping unserializable event");
                        None
                    }
                }
            }
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                warn!(skipped, "subscriber lagged behind the match channel");
                None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_come_out_as_frames_in_order() {
        let (sender, receiver) = broadcast::channel(8);
        let mut stream = Box::pin(to_sse_stream(receiver));

        sender
            .send(ServerEvent {
                event: "status.changed".into(),
                data: serde_json::json!({"to": "in_progress"}),
            })
            .unwrap();
        drop(sender);

        let frame = stream.next().await.unwrap();
        assert!(frame.is_ok());
        assert!(stream.next().await.is_none());
    }
}
