use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{
    sync::{broadcast::error::RecvError, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    dto::{
        validation::validate_user_id,
        ws::{ClientMessage, ServerMessage},
    },
    services::pet_service,
    state::SharedState,
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle the lifecycle of a realtime client: `join` first, then receive the
/// joined pet's updates until either side closes.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("websocket join timed out");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let user_id = match parse_join(&initial_message) {
        Ok(user_id) => user_id,
        Err(reason) => {
            warn!(reason, "rejecting websocket client");
            send(&outbound_tx, &ServerMessage::Error { error: reason });
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let mut updates = state.pet_channels().subscribe(&user_id);
    info!(user_id, "realtime client joined");
    send(
        &outbound_tx,
        &ServerMessage::Joined {
            user_id: user_id.clone(),
        },
    );
    if let Ok(pet) = pet_service::get_pet(&state, &user_id).await {
        send(&outbound_tx, &ServerMessage::PetUpdate { pet });
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(pet) => {
                    if !send(&outbound_tx, &ServerMessage::PetUpdate { pet }) {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id, skipped, "realtime client lagged behind pet updates");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { .. }) => {
                        warn!(user_id, "ignoring duplicate join message");
                    }
                    Ok(ClientMessage::Unknown) | Err(_) => {
                        warn!(user_id, payload = %text, "ignoring unsupported client message");
                    }
                },
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(Message::Binary(_) | Message::Pong(_))) => {}
                Some(Err(err)) => {
                    warn!(user_id, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    drop(updates);
    state.pet_channels().release(&user_id);
    info!(user_id, "realtime client left");

    finalize(writer_task, outbound_tx).await;
}

/// Extract the user id of a `join` message.
fn parse_join(text: &str) -> Result<String, String> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Join { user_id }) => {
            validate_user_id(&user_id).map_err(|_| format!("invalid user id `{user_id}`"))?;
            Ok(user_id)
        }
        Ok(ClientMessage::Unknown) => Err("first message must be a join".into()),
        Err(err) => Err(format!("malformed message: {err}")),
    }
}

/// Queue a message for the writer task. Returns `false` once the writer is gone.
fn send(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) -> bool {
    match serde_json::to_string(message) {
        Ok(payload) => tx.send(Message::Text(payload.into())).is_ok(),
        Err(err) => {
            warn!(error = %err, "failed to serialize websocket message");
            true
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_must_join_with_a_valid_id() {
        assert_eq!(
            parse_join(r#"{"type":"join","userId":"42"}"#).unwrap(),
            "42"
        );
        assert!(parse_join(r#"{"type":"join","userId":""}"#).is_err());
        assert!(parse_join(r#"{"type":"feed"}"#).is_err());
        assert!(parse_join("not json").is_err());
    }

    #[test]
    fn queued_messages_are_json_text_frames() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        assert!(send(
            &tx,
            &ServerMessage::Error {
                error: "nope".into()
            }
        ));
        match rx.try_recv().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), r#"{"type":"error","error":"nope"}"#),
            other => panic!("unexpected frame {other:?}"),
        }

        drop(rx);
        assert!(!send(
            &tx,
            &ServerMessage::Joined {
                user_id: "42".into()
            }
        ));
    }
}
