//! Call coordinator
//!
//! [`CallCoordinator`] is the facade hosts talk to. It owns nothing media
//! related: publishers and subscribers are created by the [`RtcSession`],
//! tracked in the shared [`PubSubStore`], and every visible change is
//! announced as a [`CallEvent`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐        CallEvent
//! │       Host / UI         │◄──────────────────────┐
//! └───────────┬─────────────┘                       │
//!             │ start_call / end_call / toggles     │
//! ┌───────────▼─────────────┐                ┌──────┴───────┐
//! │    CallCoordinator      │───────────────►│ EventEmitter │
//! │  publish.rs             │                └──────────────┘
//! │  subscribe.rs           │◄── SessionEvent (bridge task)
//! │  controls.rs            │
//! └───────────┬─────────────┘
//!             │
//! ┌───────────▼─────────────┐   ┌──────────────┐
//! │   RtcSession (SDK)      │   │ PubSubStore  │
//! └─────────────────────────┘   └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use groupcall_core::{CallCoordinator, CallOptions, DefaultContainers, EventEmitter, PubSubState};
//! use groupcall_core::mock::MockSession;
//!
//! # async fn example() -> Result<(), groupcall_core::CallError> {
//! let options = CallOptions::builder()
//!     .session(Arc::new(MockSession::new()))
//!     .state(Arc::new(PubSubState::new()))
//!     .events(EventEmitter::default())
//!     .stream_containers(Arc::new(DefaultContainers))
//!     .connection_limit(8)
//!     .build()?;
//!
//! let call = CallCoordinator::init(options);
//! let started = call.start_call().await?;
//! println!("publishing as {}", started.publisher_id);
//! call.end_call().await;
//! # Ok(())
//! # }
//! ```

mod controls;
mod publish;
mod subscribe;


use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::config::{CallOptions, CallSettings};
use crate::container::ContainerResolver;
use crate::error::{CallError, CallResult};
use crate::events::{CallEvent, EventEmitter};
use crate::sdk::{RtcSession, SdkError, SessionEvent};
use crate::state::{PubSubSnapshot, PubSubStore};
use crate::types::{DisplayProperties, PublisherId, StreamId, StreamKind, SubscriberId};

/// Result of a successful [`CallCoordinator::start_call`]
#[derive(Debug, Clone)]
pub struct CallStarted {
    pub publisher_id: PublisherId,
    /// Registry state once initial subscriptions settled
    pub state: PubSubSnapshot,
    /// Initial subscriptions that failed; the call is up regardless
    pub failed_subscriptions: Vec<FailedSubscription>,
    pub started_at: DateTime<Utc>,
}

/// A stream that could not be subscribed to during call start
#[derive(Debug, Clone)]
pub struct FailedSubscription {
    pub stream_id: StreamId,
    pub error: CallError,
}

/// Result of [`CallCoordinator::subscribe`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscriber was created
    Subscribed(SubscriberId),
    /// The stream already has a subscriber, or one is being created
    AlreadySubscribed,
    /// The stream was destroyed before the subscriber was registered
    StreamGone,
}

/// Coordinates publish/subscribe lifecycle of one group call
pub struct CallCoordinator {
    session: Arc<dyn RtcSession>,
    state: Arc<dyn PubSubStore>,
    events: EventEmitter,
    containers: Arc<dyn ContainerResolver>,
    settings: CallSettings,
    active: AtomicBool,
    /// Held by the `start_call` in progress
    starting: AtomicBool,
    /// Streams with a subscribe in flight, flagged `true` once destroyed
    pending: DashMap<StreamId, bool>,
    bridge: Mutex<Option<JoinHandle<()>>>,
}

impl CallCoordinator {
    /// Create a coordinator and start listening to session stream events
    ///
    /// Must be called from within a tokio runtime.
    pub fn init(options: CallOptions) -> Arc<Self> {
        let CallOptions {
            session,
            state,
            events,
            stream_containers,
            settings,
        } = options;

        let receiver = session.events();
        let coordinator = Arc::new(Self {
            session,
            state,
            events,
            containers: stream_containers,
            settings,
            active: AtomicBool::new(false),
            starting: AtomicBool::new(false),
            pending: DashMap::new(),
            bridge: Mutex::new(None),
        });

        let handle = tokio::spawn(run_bridge(Arc::downgrade(&coordinator), receiver));
        *coordinator.bridge.lock() = Some(handle);

        tracing::info!(
            connection_limit = ?coordinator.settings.connection_limit,
            auto_subscribe = coordinator.settings.auto_subscribe,
            "Call coordinator initialized"
        );
        coordinator
    }

    /// Whether a call is running (between `start_call` and `end_call`)
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    pub fn settings(&self) -> &CallSettings {
        &self.settings
    }

    pub fn state(&self) -> &Arc<dyn PubSubStore> {
        &self.state
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    /// Current registry view
    pub fn snapshot(&self) -> PubSubSnapshot {
        self.state.snapshot()
    }

    /// Apply one session event
    ///
    /// The background bridge calls this for every event the session fires;
    /// hosts that drive the SDK themselves can call it directly.
    pub async fn handle_session_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::StreamCreated(stream) => {
                if self.record_stream(&stream) {
                    self.auto_subscribe(stream).await;
                }
            }
            SessionEvent::StreamDestroyed(stream) => self.on_stream_destroyed(&stream),
        }
    }

    fn properties_for(&self, kind: StreamKind) -> &DisplayProperties {
        match kind {
            StreamKind::Camera => &self.settings.call_properties,
            StreamKind::Screen => &self.settings.screen_properties,
        }
    }

    /// Run an SDK operation, bounded by the configured timeout
    async fn sdk_call<T, F>(&self, operation: &str, call: F) -> CallResult<T>
    where
        F: Future<Output = Result<T, SdkError>>,
    {
        match self.settings.sdk_timeout() {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(result) => result.map_err(CallError::from),
                Err(_) => Err(CallError::timeout(
                    operation,
                    u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                )),
            },
            None => call.await.map_err(CallError::from),
        }
    }

    /// Log an error and tell the host about it
    fn report_error(&self, error: &CallError) {
        let message = error.user_message();
        tracing::error!(code = ?error.sdk_code(), "{}", error);
        self.events.emit(CallEvent::Error { message });
    }
}

impl Drop for CallCoordinator {
    fn drop(&mut self) {
        if let Some(handle) = self.bridge.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for CallCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallCoordinator")
            .field("active", &self.is_active())
            .field("settings", &self.settings)
            .field("pending", &self.pending.len())
            .finish()
    }
}

/// Forward session events to the coordinator until either goes away
async fn run_bridge(coordinator: Weak<CallCoordinator>, mut receiver: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        let event = match receiver.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!("Session event bridge lagged, {} events dropped", skipped);
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };
        match event {
            SessionEvent::StreamCreated(stream) => {
                // Subscribing runs on its own task so a slow SDK call does
                // not hold up later events
                if coordinator.record_stream(&stream) {
                    tokio::spawn(async move { coordinator.auto_subscribe(stream).await });
                }
            }
            SessionEvent::StreamDestroyed(stream) => coordinator.on_stream_destroyed(&stream),
        }
    }
    tracing::debug!("Session event bridge stopped");
}
