//! Walk through a group call against the in-memory session
//!
//! Run with `RUST_LOG=groupcall_core=debug cargo run --example group_call_demo`.

use std::sync::Arc;
use std::time::Duration;

use groupcall_core::mock::MockSession;
use groupcall_core::{
    CallCoordinator, CallOptions, CallSettings, Container, ContainerRequest, EventEmitter, MediaSource,
    PubSubState, RemoteStream, StreamKind,
};

/// Give each remote participant their own tile
fn tile_for(req: ContainerRequest<'_>) -> Container {
    match req.stream_id {
        Some(stream_id) => Container::new(format!("#tile-{}", stream_id)),
        None => Container::new("#local-preview"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "groupcall_core=info".into()),
        )
        .init();

    let settings: CallSettings = serde_json::from_str(r#"{ "connectionLimit": 4 }"#)?;
    let session = Arc::new(MockSession::new());
    let events = EventEmitter::default();
    let mut ui = events.subscribe_simple();

    let call = CallCoordinator::init(
        CallOptions::builder()
            .session(session.clone())
            .state(Arc::new(PubSubState::new()))
            .events(events)
            .stream_containers(Arc::new(tile_for))
            .settings(settings)
            .build()?,
    );

    tokio::spawn(async move {
        while let Some(event) = ui.next().await {
            println!("ui <- {}", serde_json::to_string(&event).unwrap_or_else(|_| event.name().to_string()));
        }
    });

    session.stream_created(
        RemoteStream::new("ada-camera", StreamKind::Camera, "ada").with_connection_data(r#"{"name":"Ada"}"#),
    );
    tokio::time::sleep(Duration::from_millis(20)).await;

    let started = call.start_call().await?;
    println!("joined as {}", started.publisher_id);

    session.stream_created(RemoteStream::new("ada-screen", StreamKind::Screen, "ada"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    call.enable_local_av(&started.publisher_id, MediaSource::Audio, false)?;

    session.stream_destroyed(RemoteStream::new("ada-screen", StreamKind::Screen, "ada"));
    tokio::time::sleep(Duration::from_millis(20)).await;

    call.end_call().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    Ok(())
}
