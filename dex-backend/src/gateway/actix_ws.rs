//! WebSocket event stream
//!
//! Pushes every event published on the bus to the connected client as a JSON
//! text frame, the same shape `GET /api/events` returns. A client that falls
//! behind skips ahead and receives a `lagged` frame with the number of events
//! it missed.

use actix_web::{web, HttpRequest, HttpResponse};
use actix_ws::AggregatedMessage;
use futures_util::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};

use super::protocol::StampedEvent;
use crate::AppState;

pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, msg_stream) = actix_ws::handle(&req, stream)?;

    // Subscribe before the upgrade completes so no event published after the
    // handshake is lost
    let events = state.broadcaster.subscribe();
    actix_web::rt::spawn(handle_ws_connection(session, msg_stream, events));

    Ok(response)
}

async fn handle_ws_connection(
    mut session: actix_ws::Session,
    msg_stream: actix_ws::MessageStream,
    mut events: broadcast::Receiver<StampedEvent>,
) {
    log::info!("[WEBSOCKET] Event client connected");

    let mut msg_stream = msg_stream
        .aggregate_continuations()
        .max_continuation_size(64 * 1024);

    loop {
        tokio::select! {
            frame = next_frame(&mut events) => {
                let Some(frame) = frame else {
                    break;
                };
                if session.text(frame).await.is_err() {
                    log::warn!("[WEBSOCKET] Failed to send event, dropping client");
                    break;
                }
            }
            msg = msg_stream.next() => {
                match msg {
                    Some(Ok(AggregatedMessage::Ping(data))) => {
                        if session.pong(&data).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(AggregatedMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        log::error!("[WEBSOCKET] Protocol error: {:?}", e);
                        break;
                    }
                    // The stream is push-only
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = session.close(None).await;
    log::info!("[WEBSOCKET] Event client disconnected");
}

/// Next event from the bus as a text frame, or `None` once the bus is gone
async fn next_frame(events: &mut broadcast::Receiver<StampedEvent>) -> Option<String> {
    loop {
        match events.recv().await {
            Ok(stamped) => match serde_json::to_string(&stamped) {
                Ok(json) => return Some(json),
                Err(e) => {
                    log::error!(
                        "[WEBSOCKET] Failed to serialize '{}': {}",
                        stamped.event.name(),
                        e
                    );
                }
            },
            Err(RecvError::Lagged(skipped)) => {
                log::warn!("[WEBSOCKET] Client lagged, skipped {} events", skipped);
                return Some(
                    serde_json::json!({
                        "event": "lagged",
                        "data": { "skipped": skipped }
                    })
                    .to_string(),
                );
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DexEvent, EventBroadcaster};
    use chrono::Utc;
    use serde_json::Value;

    #[tokio::test]
    async fn test_frames_follow_the_bus() {
        let broadcaster = EventBroadcaster::new();
        let mut events = broadcaster.subscribe();

        broadcaster.broadcast(DexEvent::TradeStarted { id: "t1".to_string() });
        broadcaster.broadcast(DexEvent::QueueSwept { removed: 3 });

        let first: Value = serde_json::from_str(&next_frame(&mut events).await.unwrap()).unwrap();
        assert_eq!(first["event"], "trade_started");
        assert_eq!(first["data"]["id"], "t1");
        assert!(first["at"].is_string());

        let second: Value = serde_json::from_str(&next_frame(&mut events).await.unwrap()).unwrap();
        assert_eq!(second["event"], "queue_swept");
        assert_eq!(second["data"]["removed"], 3);
    }

    #[tokio::test]
    async fn test_slow_client_gets_lagged_frame() {
        let (sender, mut events) = broadcast::channel(2);
        for removed in 0..3 {
            sender
                .send(StampedEvent {
                    at: Utc::now(),
                    event: DexEvent::QueueSwept { removed },
                })
                .unwrap();
        }

        let lagged: Value = serde_json::from_str(&next_frame(&mut events).await.unwrap()).unwrap();
        assert_eq!(lagged["event"], "lagged");
        assert_eq!(lagged["data"]["skipped"], 1);

        let next: Value = serde_json::from_str(&next_frame(&mut events).await.unwrap()).unwrap();
        assert_eq!(next["data"]["removed"], 1);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_stream() {
        let (sender, mut events) = broadcast::channel::<StampedEvent>(4);
        drop(sender);
        assert!(next_frame(&mut events).await.is_none());
    }
}
