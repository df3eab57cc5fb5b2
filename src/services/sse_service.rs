use std::{convert::Infallible, time::Duration};

use async_stream::stream;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::{
    dto::{
        pet::PetView,
        sse::{Handshake, ServerEvent},
    },
    services::pet_events::PET_UPDATE_EVENT,
    state::{SharedState, pet::Pet},
};

const HANDSHAKE_EVENT: &str = "handshake";

/// Subscribe to the public activity feed, starting with a handshake event.
pub fn activity_stream(
    state: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let receiver = state.activity_sse().subscribe();
    let handshake = handshake_event("activity", state.is_degraded());
    to_sse_stream(receiver, handshake)
}

/// Convert a broadcast receiver into an SSE response, forwarding events until
/// the client disconnects.
fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    handshake: Option<Event>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        if let Some(event) = handshake {
            if tx.send(Ok(event)).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        // Slow clients skip entries instead of stalling the feed.
                        Err(RecvError::Lagged(_)) => continue,
                    }
                }
            }
        }

        info!("activity SSE stream disconnected");
    });

    with_keep_alive(ReceiverStream::new(rx))
}

/// Stream the snapshots of one pet: a handshake, the current state when it
/// exists, then every published update.
pub fn pet_stream(
    state: SharedState,
    user_id: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = stream! {
        let _release = ChannelRelease {
            state: state.clone(),
            user_id: user_id.clone(),
        };
        let mut receiver = state.pet_channels().subscribe(&user_id);
        info!(user_id, "pet SSE stream connected");

        if let Some(event) = handshake_event("pet", state.is_degraded()) {
            yield Ok(event);
        }
        if let Some(current) = current_pet(&state, &user_id).await {
            if let Some(event) = pet_event(&current) {
                yield Ok(event);
            }
        }

        loop {
            match receiver.recv().await {
                Ok(pet) => {
                    if let Some(event) = pet_event(&pet) {
                        yield Ok(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id, skipped, "pet SSE subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    with_keep_alive(events)
}

/// Drops the pet channel once the stream owning the last receiver goes away.
struct ChannelRelease {
    state: SharedState,
    user_id: String,
}

impl Drop for ChannelRelease {
    fn drop(&mut self) {
        self.state.pet_channels().release(&self.user_id);
        info!(user_id = %self.user_id, "pet SSE stream disconnected");
    }
}

async fn current_pet(state: &SharedState, user_id: &str) -> Option<PetView> {
    let store = state.require_store().await.ok()?;
    match store.find_pet(user_id.to_owned()).await {
        Ok(entity) => entity.map(|entity| PetView::from(&Pet::from(entity))),
        Err(err) => {
            warn!(user_id, error = %err, "failed to load pet for SSE stream");
            None
        }
    }
}

fn pet_event(pet: &PetView) -> Option<Event> {
    match ServerEvent::json(PET_UPDATE_EVENT.to_string(), pet) {
        Ok(payload) => Some(to_event(payload)),
        Err(err) => {
            warn!(error = %err, "failed to serialize pet update");
            None
        }
    }
}

fn handshake_event(stream: &str, degraded: bool) -> Option<Event> {
    let handshake = Handshake {
        stream: stream.to_owned(),
        degraded,
    };
    ServerEvent::json(HANDSHAKE_EVENT.to_string(), &handshake)
        .ok()
        .map(to_event)
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

fn with_keep_alive<S>(stream: S) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    S: Stream<Item = Result<Event, Infallible>> + Send + 'static,
{
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

#[cfg(test)]
mod tests {
    use axum::{http::header::CONTENT_TYPE, response::IntoResponse};
    use futures::StreamExt;

    use super::*;
    use crate::{config::AppConfig, state::testing::test_app};

    #[tokio::test]
    async fn activity_stream_opens_with_a_handshake() {
        let app = test_app(AppConfig::default()).await;
        let sse = {
            let state = app.state.clone();
            activity_stream(&state)
        };

        let response = sse.into_response();
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");

        let mut body = response.into_body().into_data_stream();
        let first = body.next().await.unwrap().unwrap();
        let text = String::from_utf8(first.to_vec()).unwrap();
        assert!(text.contains("event: handshake"));
        assert!(text.contains(r#""stream":"activity""#));
    }

    #[tokio::test]
    async fn pet_stream_releases_its_channel_when_dropped() {
        let app = test_app(AppConfig::default()).await;
        let mut body = pet_stream(app.state.clone(), "42".into())
            .into_response()
            .into_body()
            .into_data_stream();

        let first = body.next().await.unwrap().unwrap();
        assert!(String::from_utf8(first.to_vec()).unwrap().contains("event: handshake"));
        assert_eq!(app.state.pet_channels().active_channels(), 1);

        drop(body);
        assert_eq!(app.state.pet_channels().active_channels(), 0);
    }
}
