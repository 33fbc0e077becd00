//! Seam to the real-time communication SDK
//!
//! Everything media related (negotiation, transport, encoding) lives behind
//! [`RtcSession`]. The coordinator only creates and tears down publishers
//! and subscribers through it and listens to its stream lifecycle events.
//!
//! ```text
//! ┌─────────────────────────┐
//! │    CallCoordinator      │
//! └───────────┬─────────────┘
//!             │ init_publisher / publish / subscribe / ...
//! ┌───────────▼─────────────┐
//! │   RtcSession (SDK)      │──► SessionEvent::StreamCreated / StreamDestroyed
//! └─────────────────────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::container::Container;
use crate::types::{DisplayProperties, MediaSource, PublisherId, RemoteStream, StreamKind, SubscriberId};

/// Error reported by the SDK
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct SdkError {
    /// Numeric SDK error code, when the SDK provides one
    pub code: Option<i32>,
    pub message: String,
}

impl SdkError {
    /// Error without a code
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Error carrying an SDK code
    pub fn with_code(code: i32, message: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            message: message.into(),
        }
    }
}

/// Stream lifecycle events fired by the session
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A remote participant started publishing
    StreamCreated(RemoteStream),
    /// A remote stream went away
    StreamDestroyed(RemoteStream),
}

/// Handle to an outbound local stream
pub trait PublisherHandle: Send + Sync {
    fn id(&self) -> PublisherId;

    fn kind(&self) -> StreamKind;

    /// Start or stop sending audio
    fn publish_audio(&self, enabled: bool);

    /// Start or stop sending video
    fn publish_video(&self, enabled: bool);
}

/// Handle to an inbound remote stream
pub trait SubscriberHandle: Send + Sync {
    fn id(&self) -> SubscriberId;

    /// Stream this subscriber is attached to
    fn stream(&self) -> &RemoteStream;

    /// Start or stop receiving audio
    fn subscribe_to_audio(&self, enabled: bool);

    /// Start or stop receiving video
    fn subscribe_to_video(&self, enabled: bool);
}

/// Shared publisher handle
pub type PublisherRef = Arc<dyn PublisherHandle>;

/// Shared subscriber handle
pub type SubscriberRef = Arc<dyn SubscriberHandle>;

impl fmt::Debug for dyn PublisherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .finish()
    }
}

impl fmt::Debug for dyn SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id())
            .field("stream", &self.stream().id)
            .finish()
    }
}

impl MediaSource {
    /// Toggle this source on a local publisher
    pub fn set_published(self, publisher: &dyn PublisherHandle, enabled: bool) {
        match self {
            MediaSource::Audio => publisher.publish_audio(enabled),
            MediaSource::Video => publisher.publish_video(enabled),
        }
    }

    /// Toggle this source on a remote subscriber
    pub fn set_subscribed(self, subscriber: &dyn SubscriberHandle, enabled: bool) {
        match self {
            MediaSource::Audio => subscriber.subscribe_to_audio(enabled),
            MediaSource::Video => subscriber.subscribe_to_video(enabled),
        }
    }
}

/// Connected session of the RTC SDK
#[async_trait]
pub trait RtcSession: Send + Sync {
    /// Create a local camera publisher rendered into `container`
    async fn init_publisher(
        &self,
        container: &Container,
        properties: &DisplayProperties,
    ) -> Result<PublisherRef, SdkError>;

    /// Start sending a publisher's media to the session
    async fn publish(&self, publisher: &PublisherRef) -> Result<(), SdkError>;

    /// Stop sending a publisher's media
    async fn unpublish(&self, publisher: &PublisherRef) -> Result<(), SdkError>;

    /// Subscribe to a remote stream, rendering it into `container`
    async fn subscribe(
        &self,
        stream: &RemoteStream,
        container: &Container,
        properties: &DisplayProperties,
    ) -> Result<SubscriberRef, SdkError>;

    /// Tear down a subscriber
    async fn unsubscribe(&self, subscriber: &SubscriberRef) -> Result<(), SdkError>;

    /// Receiver for stream lifecycle events
    fn events(&self) -> broadcast::Receiver<SessionEvent>;
}
