//! Application events emitted by the call coordinator
//!
//! Hosts receive [`CallEvent`]s through an [`EventEmitter`], either as a
//! `Stream` ([`EventEmitter::subscribe`]) or with the simpler
//! [`EventIterator`]. [`CallEvent::name`] gives the camelCase name UI
//! layers key their handlers on.

use serde::Serialize;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::state::PubSubSnapshot;
use crate::types::{PublisherId, StreamId, StreamKind, SubscriberId};

/// Events emitted by the coordinator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum CallEvent {
    /// An operation failed; `message` is ready to show to the user
    Error {
        message: String,
    },

    /// Local camera is published and initial subscriptions have settled
    StartCall {
        publisher_id: PublisherId,
        state: PubSubSnapshot,
    },

    /// All publishers and subscribers were torn down
    EndCall {
        state: PubSubSnapshot,
    },

    SubscribeToCamera {
        subscriber_id: SubscriberId,
        stream_id: StreamId,
        state: PubSubSnapshot,
    },

    SubscribeToScreen {
        subscriber_id: SubscriberId,
        stream_id: StreamId,
        state: PubSubSnapshot,
    },

    UnsubscribeFromCamera {
        stream_id: StreamId,
        state: PubSubSnapshot,
    },

    UnsubscribeFromScreen {
        stream_id: StreamId,
        state: PubSubSnapshot,
    },

    /// Legacy companion of `subscribeToScreen`
    StartViewingSharedScreen {
        subscriber_id: SubscriberId,
    },

    /// Legacy companion of `unsubscribeFromScreen`
    EndViewingSharedScreen {
        stream_id: StreamId,
    },
}

impl CallEvent {
    /// Subscription event for a stream of `kind`
    pub fn subscribed(
        kind: StreamKind,
        subscriber_id: SubscriberId,
        stream_id: StreamId,
        state: PubSubSnapshot,
    ) -> Self {
        match kind {
            StreamKind::Camera => CallEvent::SubscribeToCamera {
                subscriber_id,
                stream_id,
                state,
            },
            StreamKind::Screen => CallEvent::SubscribeToScreen {
                subscriber_id,
                stream_id,
                state,
            },
        }
    }

    /// Unsubscription event for a stream of `kind`
    pub fn unsubscribed(kind: StreamKind, stream_id: StreamId, state: PubSubSnapshot) -> Self {
        match kind {
            StreamKind::Camera => CallEvent::UnsubscribeFromCamera { stream_id, state },
            StreamKind::Screen => CallEvent::UnsubscribeFromScreen { stream_id, state },
        }
    }

    /// Event name as seen by the UI layer
    pub fn name(&self) -> &'static str {
        match self {
            CallEvent::Error { .. } => "error",
            CallEvent::StartCall { .. } => "startCall",
            CallEvent::EndCall { .. } => "endCall",
            CallEvent::SubscribeToCamera { .. } => "subscribeToCamera",
            CallEvent::SubscribeToScreen { .. } => "subscribeToScreen",
            CallEvent::UnsubscribeFromCamera { .. } => "unsubscribeFromCamera",
            CallEvent::UnsubscribeFromScreen { .. } => "unsubscribeFromScreen",
            CallEvent::StartViewingSharedScreen { .. } => "startViewingSharedScreen",
            CallEvent::EndViewingSharedScreen { .. } => "endViewingSharedScreen",
        }
    }
}

/// Event stream type
pub type EventStream = BroadcastStream<CallEvent>;

/// Simple event iterator that doesn't require StreamExt
pub struct EventIterator {
    stream: EventStream,
}

impl EventIterator {
    pub fn new(stream: EventStream) -> Self {
        Self { stream }
    }

    /// Next event, skipping over notices of dropped (lagged) events
    pub async fn next(&mut self) -> Option<CallEvent> {
        use tokio_stream::StreamExt;
        loop {
            match self.stream.next().await? {
                Ok(event) => return Some(event),
                Err(e) => tracing::warn!("Event receiver lagged: {}", e),
            }
        }
    }
}

/// Application event bus
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<CallEvent>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn emit(&self, event: CallEvent) {
        tracing::debug!(event = event.name(), "Emitting call event");
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> EventStream {
        BroadcastStream::new(self.sender.subscribe())
    }

    pub fn subscribe_simple(&self) -> EventIterator {
        EventIterator::new(self.subscribe())
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("receivers", &self.receiver_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_specific_names() {
        let snapshot = PubSubSnapshot::default();
        let cam = CallEvent::subscribed(StreamKind::Camera, "sub".into(), "s".into(), snapshot.clone());
        let screen = CallEvent::unsubscribed(StreamKind::Screen, "s".into(), snapshot);
        assert_eq!(cam.name(), "subscribeToCamera");
        assert_eq!(screen.name(), "unsubscribeFromScreen");
    }

    #[test]
    fn test_serialized_tag_matches_name() {
        let event = CallEvent::EndViewingSharedScreen { stream_id: "s9".into() };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["streamId"], "s9");
    }

    #[tokio::test]
    async fn test_emitter_delivers_to_all_receivers() {
        let emitter = EventEmitter::new(8);
        let mut a = emitter.subscribe_simple();
        let mut b = emitter.subscribe_simple();
        assert_eq!(emitter.receiver_count(), 2);

        emitter.emit(CallEvent::Error { message: "boom".into() });
        assert_eq!(a.next().await.map(|e| e.name()), Some("error"));
        assert_eq!(b.next().await.map(|e| e.name()), Some("error"));
    }
}
