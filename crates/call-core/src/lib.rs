//! # groupcall-core - Group Call Coordination
//!
//! This crate coordinates the publish/subscribe lifecycle of a group video
//! call on top of a real-time communication SDK:
//! - publishes the local camera when the host starts a call
//! - subscribes to remote camera and screen streams as they appear
//! - enforces an optional participant connection limit
//! - emits application events (`startCall`, `subscribeToCamera`, ...) for the UI
//!
//! Media negotiation, transport and encoding stay inside the SDK, which is
//! reached through the [`RtcSession`] trait.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use groupcall_core::{CallCoordinator, CallEvent, CallOptions, DefaultContainers, EventEmitter, PubSubState};
//! use groupcall_core::mock::MockSession;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let events = EventEmitter::default();
//!     let mut ui = events.subscribe_simple();
//!
//!     let call = CallCoordinator::init(
//!         CallOptions::builder()
//!             .session(Arc::new(MockSession::new()))
//!             .state(Arc::new(PubSubState::new()))
//!             .events(events)
//!             .stream_containers(Arc::new(DefaultContainers))
//!             .build()?,
//!     );
//!
//!     call.start_call().await?;
//!     while let Some(event) = ui.next().await {
//!         println!("{}", event.name());
//!         if matches!(event, CallEvent::StartCall { .. }) {
//!             break;
//!         }
//!     }
//!
//!     call.end_call().await;
//!     Ok(())
//! }
//! ```

pub mod call;
pub mod config;
pub mod container;
pub mod error;
pub mod events;
pub mod sdk;
pub mod state;
pub mod types;

#[cfg(any(test, feature = "mock-session"))]
pub mod mock;

// Re-export main types
pub use call::{CallCoordinator, CallStarted, FailedSubscription, SubscribeOutcome};
pub use config::{CallOptions, CallOptionsBuilder, CallSettings};
pub use container::{Container, ContainerRequest, ContainerResolver, DefaultContainers, PubSubRole};
pub use error::{CallError, CallResult};
pub use events::{CallEvent, EventEmitter, EventIterator, EventStream};
pub use sdk::{PublisherHandle, PublisherRef, RtcSession, SdkError, SessionEvent, SubscriberHandle, SubscriberRef};
pub use state::{PubSubSnapshot, PubSubState, PubSubStore};
pub use types::{DisplayProperties, MediaSource, PublisherId, RemoteStream, StreamId, StreamKind, SubscriberId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
