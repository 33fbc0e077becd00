//! Session event bridge behaviour

use std::sync::Arc;
use std::time::Duration;

use groupcall_core::mock::MockSession;
use groupcall_core::{
    CallCoordinator, CallOptions, DefaultContainers, EventEmitter, PubSubState, PubSubStore, RemoteStream,
    StreamKind,
};

fn coordinator(session: &Arc<MockSession>, state: &Arc<PubSubState>, auto_subscribe: bool) -> Arc<CallCoordinator> {
    let options = CallOptions::builder()
        .session(session.clone())
        .state(state.clone())
        .events(EventEmitter::default())
        .stream_containers(Arc::new(DefaultContainers))
        .auto_subscribe(auto_subscribe)
        .build()
        .expect("valid options");
    CallCoordinator::init(options)
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test]
async fn test_auto_subscribe_disabled_ignores_new_streams() {
    let session = Arc::new(MockSession::new());
    let state = Arc::new(PubSubState::new());
    let call = coordinator(&session, &state, false);
    call.start_call().await.unwrap();

    session.stream_created(RemoteStream::new("late", StreamKind::Camera, "erin"));
    settle().await;

    assert_eq!(session.subscribe_calls(), 0);
    assert_eq!(state.streams().len(), 1);
}

#[tokio::test]
async fn test_duplicate_stream_events_subscribe_once() {
    let session = Arc::new(MockSession::new());
    let state = Arc::new(PubSubState::new());
    let call = coordinator(&session, &state, true);
    call.start_call().await.unwrap();
    session.delay_subscribes(Duration::from_millis(10));

    let stream = RemoteStream::new("dup", StreamKind::Camera, "frank");
    session.stream_created(stream.clone());
    session.stream_created(stream.clone());
    settle().await;

    assert_eq!(session.subscribe_calls(), 1);
    assert!(state.subscriber_for_stream(&stream.id).is_some());
}

#[tokio::test]
async fn test_shared_state_is_visible_to_host() {
    let session = Arc::new(MockSession::new());
    let state = Arc::new(PubSubState::new());
    let call = coordinator(&session, &state, true);

    call.start_call().await.unwrap();
    session.stream_created(RemoteStream::new("s", StreamKind::Screen, "gina"));
    settle().await;

    // The host reads the same registry the coordinator writes
    let snapshot = state.snapshot();
    assert_eq!(snapshot.meta.publishers.camera, 1);
    assert_eq!(snapshot.meta.subscribers.screen, 1);
}

#[tokio::test]
async fn test_bridge_stops_when_coordinator_dropped() {
    let session = Arc::new(MockSession::new());
    let state = Arc::new(PubSubState::new());
    let call = coordinator(&session, &state, true);
    drop(call);
    settle().await;

    session.stream_created(RemoteStream::new("after-drop", StreamKind::Camera, "hank"));
    settle().await;

    assert!(state.streams().is_empty());
}

#[tokio::test]
async fn test_stream_gone_before_auto_subscribe_settles() {
    let session = Arc::new(MockSession::new());
    let state = Arc::new(PubSubState::new());
    let call = coordinator(&session, &state, true);
    call.start_call().await.unwrap();
    session.delay_subscribes(Duration::from_millis(20));

    let stream = RemoteStream::new("flicker", StreamKind::Camera, "ivy");
    session.stream_created(stream.clone());
    session.stream_destroyed(stream.clone());
    settle().await;

    assert!(state.streams().is_empty());
    assert!(state.subscriber_for_stream(&stream.id).is_none());
    assert_eq!(state.snapshot().meta.subscribers.total, 0);
}
