//! Publisher/subscriber registry
//!
//! The coordinator never keeps its own copy of who is published or
//! subscribed; it goes through a [`PubSubStore`] so the host can share one
//! registry between several UI components. [`PubSubState`] is the default
//! in-memory store.

use std::collections::BTreeMap;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::sdk::{PublisherRef, SubscriberRef};
use crate::types::{PublisherId, RemoteStream, StreamId, StreamKind, SubscriberId};

/// Shared registry of publishers, subscribers and known remote streams
pub trait PubSubStore: Send + Sync {
    fn add_publisher(&self, publisher: PublisherRef);

    fn remove_publisher(&self, kind: StreamKind, id: &PublisherId) -> Option<PublisherRef>;

    fn remove_all_publishers(&self) -> Vec<PublisherRef>;

    fn publisher(&self, kind: StreamKind, id: &PublisherId) -> Option<PublisherRef>;

    fn publishers(&self, kind: StreamKind) -> Vec<PublisherRef>;

    /// Register a subscriber and map its stream to it
    fn add_subscriber(&self, subscriber: SubscriberRef);

    fn remove_subscriber(&self, kind: StreamKind, id: &SubscriberId) -> Option<SubscriberRef>;

    fn remove_all_subscribers(&self) -> Vec<SubscriberRef>;

    fn subscriber(&self, kind: StreamKind, id: &SubscriberId) -> Option<SubscriberRef>;

    fn subscribers(&self, kind: StreamKind) -> Vec<SubscriberRef>;

    /// Subscriber currently attached to a stream, if any
    fn subscriber_for_stream(&self, stream_id: &StreamId) -> Option<SubscriberId>;

    fn add_stream(&self, stream: RemoteStream);

    fn remove_stream(&self, stream_id: &StreamId) -> Option<RemoteStream>;

    fn streams(&self) -> Vec<RemoteStream>;

    fn has_stream(&self, stream_id: &StreamId) -> bool {
        self.streams().iter().any(|s| &s.id == stream_id)
    }

    /// Number of known remote streams of one kind
    fn stream_count(&self, kind: StreamKind) -> usize {
        self.streams().iter().filter(|s| s.kind == kind).count()
    }

    /// Aggregate view handed to the host with call events
    fn snapshot(&self) -> PubSubSnapshot;
}

/// Ids grouped by stream kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindIds<T> {
    pub camera: Vec<T>,
    pub screen: Vec<T>,
}

impl<T> Default for KindIds<T> {
    fn default() -> Self {
        Self {
            camera: Vec::new(),
            screen: Vec::new(),
        }
    }
}

impl<T> KindIds<T> {
    pub fn get(&self, kind: StreamKind) -> &[T] {
        match kind {
            StreamKind::Camera => &self.camera,
            StreamKind::Screen => &self.screen,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.camera.is_empty() && self.screen.is_empty()
    }
}

/// Per-kind counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub camera: usize,
    pub screen: usize,
    pub total: usize,
}

impl KindCounts {
    fn of<T>(ids: &KindIds<T>) -> Self {
        Self {
            camera: ids.camera.len(),
            screen: ids.screen.len(),
            total: ids.camera.len() + ids.screen.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PubSubMeta {
    pub publishers: KindCounts,
    pub subscribers: KindCounts,
}

/// Point-in-time view of the registry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubSubSnapshot {
    pub publishers: KindIds<PublisherId>,
    pub subscribers: KindIds<SubscriberId>,
    pub stream_map: BTreeMap<StreamId, SubscriberId>,
    pub meta: PubSubMeta,
}

impl PubSubSnapshot {
    pub fn new(
        publishers: KindIds<PublisherId>,
        subscribers: KindIds<SubscriberId>,
        stream_map: BTreeMap<StreamId, SubscriberId>,
    ) -> Self {
        let meta = PubSubMeta {
            publishers: KindCounts::of(&publishers),
            subscribers: KindCounts::of(&subscribers),
        };
        Self {
            publishers,
            subscribers,
            stream_map,
            meta,
        }
    }
}

struct ByKind<K, V> {
    camera: DashMap<K, V>,
    screen: DashMap<K, V>,
}

impl<K: Eq + std::hash::Hash + Ord + Clone, V: Clone> ByKind<K, V> {
    fn new() -> Self {
        Self {
            camera: DashMap::new(),
            screen: DashMap::new(),
        }
    }

    fn of(&self, kind: StreamKind) -> &DashMap<K, V> {
        match kind {
            StreamKind::Camera => &self.camera,
            StreamKind::Screen => &self.screen,
        }
    }

    fn values(&self, kind: StreamKind) -> Vec<V> {
        self.of(kind).iter().map(|e| e.value().clone()).collect()
    }

    fn drain(&self) -> Vec<V> {
        let mut drained = Vec::new();
        for kind in StreamKind::ALL {
            let map = self.of(kind);
            let keys: Vec<K> = map.iter().map(|e| e.key().clone()).collect();
            for key in keys {
                if let Some((_, value)) = map.remove(&key) {
                    drained.push(value);
                }
            }
        }
        drained
    }

    fn sorted_keys(&self) -> KindIds<K> {
        let keys = |kind: StreamKind| {
            let mut keys: Vec<K> = self.of(kind).iter().map(|e| e.key().clone()).collect();
            keys.sort();
            keys
        };
        KindIds {
            camera: keys(StreamKind::Camera),
            screen: keys(StreamKind::Screen),
        }
    }
}

/// In-memory [`PubSubStore`]
pub struct PubSubState {
    publishers: ByKind<PublisherId, PublisherRef>,
    subscribers: ByKind<SubscriberId, SubscriberRef>,
    streams: DashMap<StreamId, RemoteStream>,
    stream_map: DashMap<StreamId, SubscriberId>,
}

impl PubSubState {
    pub fn new() -> Self {
        Self {
            publishers: ByKind::new(),
            subscribers: ByKind::new(),
            streams: DashMap::new(),
            stream_map: DashMap::new(),
        }
    }
}

impl Default for PubSubState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PubSubState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PubSubState")
            .field("snapshot", &self.snapshot())
            .field("streams", &self.streams.len())
            .finish()
    }
}

impl PubSubStore for PubSubState {
    fn add_publisher(&self, publisher: PublisherRef) {
        self.publishers.of(publisher.kind()).insert(publisher.id(), publisher);
    }

    fn remove_publisher(&self, kind: StreamKind, id: &PublisherId) -> Option<PublisherRef> {
        self.publishers.of(kind).remove(id).map(|(_, p)| p)
    }

    fn remove_all_publishers(&self) -> Vec<PublisherRef> {
        self.publishers.drain()
    }

    fn publisher(&self, kind: StreamKind, id: &PublisherId) -> Option<PublisherRef> {
        self.publishers.of(kind).get(id).map(|p| p.value().clone())
    }

    fn publishers(&self, kind: StreamKind) -> Vec<PublisherRef> {
        self.publishers.values(kind)
    }

    fn add_subscriber(&self, subscriber: SubscriberRef) {
        let kind = subscriber.stream().kind;
        self.stream_map.insert(subscriber.stream().id.clone(), subscriber.id());
        self.subscribers.of(kind).insert(subscriber.id(), subscriber);
    }

    fn remove_subscriber(&self, kind: StreamKind, id: &SubscriberId) -> Option<SubscriberRef> {
        let (_, subscriber) = self.subscribers.of(kind).remove(id)?;
        self.stream_map
            .remove_if(&subscriber.stream().id, |_, mapped| mapped == id);
        Some(subscriber)
    }

    fn remove_all_subscribers(&self) -> Vec<SubscriberRef> {
        self.stream_map.clear();
        self.subscribers.drain()
    }

    fn subscriber(&self, kind: StreamKind, id: &SubscriberId) -> Option<SubscriberRef> {
        self.subscribers.of(kind).get(id).map(|s| s.value().clone())
    }

    fn subscribers(&self, kind: StreamKind) -> Vec<SubscriberRef> {
        self.subscribers.values(kind)
    }

    fn subscriber_for_stream(&self, stream_id: &StreamId) -> Option<SubscriberId> {
        self.stream_map.get(stream_id).map(|s| s.value().clone())
    }

    fn add_stream(&self, stream: RemoteStream) {
        self.streams.insert(stream.id.clone(), stream);
    }

    fn remove_stream(&self, stream_id: &StreamId) -> Option<RemoteStream> {
        self.stream_map.remove(stream_id);
        self.streams.remove(stream_id).map(|(_, s)| s)
    }

    fn has_stream(&self, stream_id: &StreamId) -> bool {
        self.streams.contains_key(stream_id)
    }

    fn streams(&self) -> Vec<RemoteStream> {
        let mut streams: Vec<RemoteStream> = self.streams.iter().map(|e| e.value().clone()).collect();
        streams.sort_by(|a, b| a.id.cmp(&b.id));
        streams
    }

    fn snapshot(&self) -> PubSubSnapshot {
        let stream_map = self
            .stream_map
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        PubSubSnapshot::new(
            self.publishers.sorted_keys(),
            self.subscribers.sorted_keys(),
            stream_map,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockPublisher, MockSubscriber};
    use std::sync::Arc;

    #[test]
    fn test_subscriber_registration_maps_stream() {
        let state = PubSubState::new();
        let stream = RemoteStream::new("s1", StreamKind::Screen, "c1");
        state.add_stream(stream.clone());
        let sub: SubscriberRef = Arc::new(MockSubscriber::new("sub-1", stream.clone()));
        state.add_subscriber(sub);

        assert_eq!(state.subscriber_for_stream(&stream.id), Some(SubscriberId::new("sub-1")));
        let snapshot = state.snapshot();
        assert_eq!(snapshot.subscribers.screen, vec![SubscriberId::new("sub-1")]);
        assert_eq!(snapshot.meta.subscribers.total, 1);

        state.remove_subscriber(StreamKind::Screen, &SubscriberId::new("sub-1"));
        assert!(state.subscriber_for_stream(&stream.id).is_none());
        assert_eq!(state.stream_count(StreamKind::Screen), 1);
    }

    #[test]
    fn test_remove_all_drains_both_kinds() {
        let state = PubSubState::new();
        state.add_publisher(Arc::new(MockPublisher::new("p-cam", StreamKind::Camera)));
        state.add_publisher(Arc::new(MockPublisher::new("p-screen", StreamKind::Screen)));
        assert_eq!(state.snapshot().meta.publishers.total, 2);

        let removed = state.remove_all_publishers();
        assert_eq!(removed.len(), 2);
        assert!(state.snapshot().publishers.is_empty());
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let state = PubSubState::new();
        let json = serde_json::to_value(state.snapshot()).unwrap();
        assert!(json.get("streamMap").is_some());
        assert_eq!(json["meta"]["publishers"]["total"], 0);
    }

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = PubSubSnapshot::default();
        assert!(snapshot.publishers.is_empty());
        assert!(snapshot.subscribers.is_empty());
        assert_eq!(snapshot, PubSubState::new().snapshot());
    }

    #[test]
    fn test_has_stream_tracks_registry() {
        let state = PubSubState::new();
        let stream = RemoteStream::new("s1", StreamKind::Camera, "c1");
        assert!(!state.has_stream(&stream.id));

        state.add_stream(stream.clone());
        assert!(state.has_stream(&stream.id));

        state.remove_stream(&stream.id);
        assert!(!state.has_stream(&stream.id));
    }
}
