//! In-memory RTC session
//!
//! [`MockSession`] stands in for the SDK in tests and demos. It records
//! every SDK call, hands out [`MockPublisher`]/[`MockSubscriber`] handles
//! that remember their audio/video toggles, and can be told to fail or
//! stall individual operations.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::container::Container;
use crate::sdk::{
    PublisherHandle, PublisherRef, RtcSession, SdkError, SessionEvent, SubscriberHandle, SubscriberRef,
};
use crate::types::{DisplayProperties, PublisherId, RemoteStream, StreamId, StreamKind, SubscriberId};

/// SDK call recorded by [`MockSession`]
#[derive(Debug, Clone, PartialEq)]
pub enum SdkCall {
    InitPublisher { container: Container },
    Publish(PublisherId),
    Unpublish(PublisherId),
    Subscribe { stream_id: StreamId, container: Container },
    Unsubscribe(SubscriberId),
}

/// Publisher handle that records its toggles
#[derive(Debug)]
pub struct MockPublisher {
    id: PublisherId,
    kind: StreamKind,
    audio: AtomicBool,
    video: AtomicBool,
}

impl MockPublisher {
    pub fn new(id: impl Into<PublisherId>, kind: StreamKind) -> Self {
        Self {
            id: id.into(),
            kind,
            audio: AtomicBool::new(true),
            video: AtomicBool::new(true),
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.load(Ordering::SeqCst)
    }

    pub fn video_enabled(&self) -> bool {
        self.video.load(Ordering::SeqCst)
    }
}

impl PublisherHandle for MockPublisher {
    fn id(&self) -> PublisherId {
        self.id.clone()
    }

    fn kind(&self) -> StreamKind {
        self.kind
    }

    fn publish_audio(&self, enabled: bool) {
        self.audio.store(enabled, Ordering::SeqCst);
    }

    fn publish_video(&self, enabled: bool) {
        self.video.store(enabled, Ordering::SeqCst);
    }
}

/// Subscriber handle that records its toggles
#[derive(Debug)]
pub struct MockSubscriber {
    id: SubscriberId,
    stream: RemoteStream,
    audio: AtomicBool,
    video: AtomicBool,
}

impl MockSubscriber {
    pub fn new(id: impl Into<SubscriberId>, stream: RemoteStream) -> Self {
        Self {
            id: id.into(),
            stream,
            audio: AtomicBool::new(true),
            video: AtomicBool::new(true),
        }
    }

    pub fn audio_enabled(&self) -> bool {
        self.audio.load(Ordering::SeqCst)
    }

    pub fn video_enabled(&self) -> bool {
        self.video.load(Ordering::SeqCst)
    }
}

impl SubscriberHandle for MockSubscriber {
    fn id(&self) -> SubscriberId {
        self.id.clone()
    }

    fn stream(&self) -> &RemoteStream {
        &self.stream
    }

    fn subscribe_to_audio(&self, enabled: bool) {
        self.audio.store(enabled, Ordering::SeqCst);
    }

    fn subscribe_to_video(&self, enabled: bool) {
        self.video.store(enabled, Ordering::SeqCst);
    }
}

/// Scriptable stand-in for the SDK session
pub struct MockSession {
    events_tx: broadcast::Sender<SessionEvent>,
    calls: Mutex<Vec<SdkCall>>,
    publishers: Mutex<Vec<Arc<MockPublisher>>>,
    subscribers: Mutex<Vec<Arc<MockSubscriber>>>,
    publisher_error: Mutex<Option<SdkError>>,
    subscribe_errors: Mutex<HashMap<StreamId, SdkError>>,
    subscribe_delay: Mutex<Option<Duration>>,
    stall_subscribes: AtomicBool,
}

impl MockSession {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(64);
        Self {
            events_tx,
            calls: Mutex::new(Vec::new()),
            publishers: Mutex::new(Vec::new()),
            subscribers: Mutex::new(Vec::new()),
            publisher_error: Mutex::new(None),
            subscribe_errors: Mutex::new(HashMap::new()),
            subscribe_delay: Mutex::new(None),
            stall_subscribes: AtomicBool::new(false),
        }
    }

    /// Fire a session event to every listener
    pub fn emit(&self, event: SessionEvent) {
        let _ = self.events_tx.send(event);
    }

    pub fn stream_created(&self, stream: RemoteStream) {
        self.emit(SessionEvent::StreamCreated(stream));
    }

    pub fn stream_destroyed(&self, stream: RemoteStream) {
        self.emit(SessionEvent::StreamDestroyed(stream));
    }

    /// Make the next publisher creations fail with `error`
    pub fn fail_publisher(&self, error: SdkError) {
        *self.publisher_error.lock() = Some(error);
    }

    /// Make subscriptions to one stream fail with `error`
    pub fn fail_subscribe(&self, stream_id: impl Into<StreamId>, error: SdkError) {
        self.subscribe_errors.lock().insert(stream_id.into(), error);
    }

    /// Delay every subscribe by `delay`
    pub fn delay_subscribes(&self, delay: Duration) {
        *self.subscribe_delay.lock() = Some(delay);
    }

    /// Never complete subscribe calls
    pub fn stall_subscribes(&self) {
        self.stall_subscribes.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<SdkCall> {
        self.calls.lock().clone()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SdkCall::Subscribe { .. }))
            .count()
    }

    pub fn publisher_inits(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| matches!(c, SdkCall::InitPublisher { .. }))
            .count()
    }

    pub fn publisher(&self, id: &PublisherId) -> Option<Arc<MockPublisher>> {
        self.publishers.lock().iter().find(|p| &p.id == id).cloned()
    }

    pub fn subscriber(&self, id: &SubscriberId) -> Option<Arc<MockSubscriber>> {
        self.subscribers.lock().iter().find(|s| &s.id == id).cloned()
    }

    fn record(&self, call: SdkCall) {
        self.calls.lock().push(call);
    }
}

impl Default for MockSession {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RtcSession for MockSession {
    async fn init_publisher(
        &self,
        container: &Container,
        _properties: &DisplayProperties,
    ) -> Result<PublisherRef, SdkError> {
        self.record(SdkCall::InitPublisher {
            container: container.clone(),
        });
        if let Some(err) = self.publisher_error.lock().clone() {
            return Err(err);
        }
        let publisher = Arc::new(MockPublisher::new(
            format!("publisher-{}", Uuid::new_v4()),
            StreamKind::Camera,
        ));
        self.publishers.lock().push(publisher.clone());
        Ok(publisher)
    }

    async fn publish(&self, publisher: &PublisherRef) -> Result<(), SdkError> {
        self.record(SdkCall::Publish(publisher.id()));
        Ok(())
    }

    async fn unpublish(&self, publisher: &PublisherRef) -> Result<(), SdkError> {
        self.record(SdkCall::Unpublish(publisher.id()));
        Ok(())
    }

    async fn subscribe(
        &self,
        stream: &RemoteStream,
        container: &Container,
        _properties: &DisplayProperties,
    ) -> Result<SubscriberRef, SdkError> {
        self.record(SdkCall::Subscribe {
            stream_id: stream.id.clone(),
            container: container.clone(),
        });

        let delay = *self.subscribe_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.stall_subscribes.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        let error = self.subscribe_errors.lock().get(&stream.id).cloned();
        if let Some(err) = error {
            return Err(err);
        }
        let subscriber = Arc::new(MockSubscriber::new(
            format!("subscriber-{}", Uuid::new_v4()),
            stream.clone(),
        ));
        self.subscribers.lock().push(subscriber.clone());
        Ok(subscriber)
    }

    async fn unsubscribe(&self, subscriber: &SubscriberRef) -> Result<(), SdkError> {
        self.record(SdkCall::Unsubscribe(subscriber.id()));
        Ok(())
    }

    fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events_tx.subscribe()
    }
}
