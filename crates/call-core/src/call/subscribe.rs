//! Subscribe/unsubscribe flow and the remote stream lifecycle

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::container::ContainerRequest;
use crate::error::CallResult;
use crate::events::CallEvent;
use crate::sdk::SubscriberRef;
use crate::types::{RemoteStream, StreamId, StreamKind};

use super::{CallCoordinator, SubscribeOutcome};

/// Clears the in-flight marker for a stream, also when the subscribe
/// future is dropped early
struct PendingGuard<'a> {
    pending: &'a DashMap<StreamId, bool>,
    stream_id: StreamId,
}

impl PendingGuard<'_> {
    /// Whether the stream was destroyed while this subscribe was running
    fn cancelled(&self) -> bool {
        self.pending.get(&self.stream_id).is_some_and(|flag| *flag)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.stream_id);
    }
}

impl CallCoordinator {
    /// Subscribe to a remote stream
    ///
    /// Subscribing to a stream that already has a subscriber (or one being
    /// created) returns [`SubscribeOutcome::AlreadySubscribed`] without
    /// touching the SDK. If the stream is destroyed while the SDK call is
    /// running, the new subscriber is torn down again and
    /// [`SubscribeOutcome::StreamGone`] is returned.
    ///
    /// # Errors
    ///
    /// Returns the SDK error if the subscriber could not be created.
    pub async fn subscribe(&self, stream: &RemoteStream) -> CallResult<SubscribeOutcome> {
        self.subscribe_with(stream, false).await
    }

    /// Subscribe to a stream taken from the registry; gives up if the
    /// stream has already left it
    pub(crate) async fn subscribe_known(&self, stream: &RemoteStream) -> CallResult<SubscribeOutcome> {
        self.subscribe_with(stream, true).await
    }

    async fn subscribe_with(&self, stream: &RemoteStream, known: bool) -> CallResult<SubscribeOutcome> {
        let guard = match self.pending.entry(stream.id.clone()) {
            Entry::Occupied(_) => {
                tracing::debug!(stream_id = %stream.id, "Subscribe already in progress");
                return Ok(SubscribeOutcome::AlreadySubscribed);
            }
            Entry::Vacant(slot) => {
                slot.insert(false);
                PendingGuard {
                    pending: &self.pending,
                    stream_id: stream.id.clone(),
                }
            }
        };
        if self.state.subscriber_for_stream(&stream.id).is_some() {
            tracing::debug!(stream_id = %stream.id, "Already subscribed");
            return Ok(SubscribeOutcome::AlreadySubscribed);
        }
        if known && !self.state.has_stream(&stream.id) {
            tracing::debug!(stream_id = %stream.id, "Stream destroyed before subscribing");
            return Ok(SubscribeOutcome::StreamGone);
        }

        let connection_data = stream.connection_data();
        let container = self.containers.resolve(ContainerRequest::subscriber(
            stream.kind,
            connection_data.as_ref(),
            &stream.id,
        ));
        let properties = self.properties_for(stream.kind);

        let subscriber = match self
            .sdk_call("subscribe", self.session.subscribe(stream, &container, properties))
            .await
        {
            Ok(subscriber) => subscriber,
            Err(e) => {
                tracing::error!(stream_id = %stream.id, "Failed to subscribe: {}", e);
                return Err(e);
            }
        };

        let subscriber_id = subscriber.id();
        self.state.add_subscriber(subscriber.clone());

        // Checked after registering so a concurrent destroy either flags
        // us here or finds the subscriber and removes it itself
        if guard.cancelled() {
            tracing::info!(
                stream_id = %stream.id,
                subscriber_id = %subscriber_id,
                "Stream destroyed while subscribing"
            );
            self.state.remove_subscriber(stream.kind, &subscriber_id);
            if let Err(e) = self
                .sdk_call("unsubscribe", self.session.unsubscribe(&subscriber))
                .await
            {
                tracing::warn!(subscriber_id = %subscriber_id, "SDK unsubscribe failed: {}", e);
            }
            return Ok(SubscribeOutcome::StreamGone);
        }

        tracing::info!(
            stream_id = %stream.id,
            subscriber_id = %subscriber_id,
            kind = %stream.kind,
            container = %container,
            "Subscribed to stream"
        );

        self.events.emit(CallEvent::subscribed(
            stream.kind,
            subscriber_id.clone(),
            stream.id.clone(),
            self.state.snapshot(),
        ));
        if stream.kind == StreamKind::Screen {
            self.events.emit(CallEvent::StartViewingSharedScreen {
                subscriber_id: subscriber_id.clone(),
            });
        }

        Ok(SubscribeOutcome::Subscribed(subscriber_id))
    }

    /// Tear down a subscriber and drop it from the registry
    ///
    /// SDK failures are logged; the subscriber is removed either way.
    pub async fn unsubscribe(&self, subscriber: &SubscriberRef) {
        let id = subscriber.id();
        let kind = subscriber.stream().kind;
        if let Err(e) = self
            .sdk_call("unsubscribe", self.session.unsubscribe(subscriber))
            .await
        {
            tracing::warn!(subscriber_id = %id, "SDK unsubscribe failed: {}", e);
        }
        self.state.remove_subscriber(kind, &id);
        tracing::info!(subscriber_id = %id, "Unsubscribed");
    }

    /// Remember a newly created remote stream; returns whether it should be
    /// subscribed to right away
    pub(crate) fn record_stream(&self, stream: &RemoteStream) -> bool {
        tracing::debug!(stream_id = %stream.id, kind = %stream.kind, "Stream created");
        self.state.add_stream(stream.clone());
        self.is_active() && self.settings.auto_subscribe
    }

    pub(crate) async fn auto_subscribe(&self, stream: RemoteStream) {
        if let Err(e) = self.subscribe_known(&stream).await {
            tracing::warn!(stream_id = %stream.id, "Auto-subscribe failed: {}", e);
        }
    }

    pub(crate) fn on_stream_destroyed(&self, stream: &RemoteStream) {
        tracing::debug!(stream_id = %stream.id, kind = %stream.kind, "Stream destroyed");

        // Stream leaves the registry before the in-flight check so a
        // subscribe that has not started yet sees it gone
        self.state.remove_stream(&stream.id);
        if let Some(mut cancelled) = self.pending.get_mut(&stream.id) {
            *cancelled = true;
        }

        // The SDK disposes of the subscriber together with its stream
        let attached = self
            .state
            .subscribers(stream.kind)
            .into_iter()
            .find(|s| s.stream().id == stream.id);
        if let Some(subscriber) = attached {
            self.state.remove_subscriber(stream.kind, &subscriber.id());
        }

        if stream.kind == StreamKind::Screen {
            self.events.emit(CallEvent::EndViewingSharedScreen {
                stream_id: stream.id.clone(),
            });
        }
        self.events.emit(CallEvent::unsubscribed(
            stream.kind,
            stream.id.clone(),
            self.state.snapshot(),
        ));
    }
}
