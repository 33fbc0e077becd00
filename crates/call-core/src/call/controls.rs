//! Local and remote audio/video toggles

use crate::error::{CallError, CallResult};
use crate::types::{MediaSource, PublisherId, StreamKind, SubscriberId};

use super::CallCoordinator;

impl CallCoordinator {
    /// Enable or disable sending audio or video on a local publisher
    pub fn enable_local_av(&self, id: &PublisherId, source: MediaSource, enabled: bool) -> CallResult<()> {
        let publisher = StreamKind::ALL
            .into_iter()
            .find_map(|kind| self.state.publisher(kind, id))
            .ok_or_else(|| CallError::PublisherNotFound { id: id.clone() })?;

        source.set_published(publisher.as_ref(), enabled);
        tracing::debug!(publisher_id = %id, %source, enabled, "Local media toggled");
        Ok(())
    }

    /// Enable or disable receiving audio or video from a remote stream
    pub fn enable_remote_av(&self, id: &SubscriberId, source: MediaSource, enabled: bool) -> CallResult<()> {
        let subscriber = StreamKind::ALL
            .into_iter()
            .find_map(|kind| self.state.subscriber(kind, id))
            .ok_or_else(|| CallError::SubscriberNotFound { id: id.clone() })?;

        source.set_subscribed(subscriber.as_ref(), enabled);
        tracing::debug!(subscriber_id = %id, %source, enabled, "Remote media toggled");
        Ok(())
    }
}
