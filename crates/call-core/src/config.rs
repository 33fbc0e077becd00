//! Call configuration
//!
//! [`CallSettings`] holds the plain, serializable part of the configuration
//! (display properties, connection limit, auto-subscribe) so hosts can load
//! it from JSON. [`CallOptions`] adds the collaborators the coordinator
//! talks to, and is assembled with [`CallOptionsBuilder`].
//!
//! ```rust
//! use groupcall_core::config::CallSettings;
//!
//! let settings: CallSettings = serde_json::from_str(
//!     r#"{ "connectionLimit": 4, "autoSubscribe": false }"#,
//! ).unwrap();
//! assert_eq!(settings.connection_limit, Some(4));
//! assert!(!settings.auto_subscribe);
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::container::ContainerResolver;
use crate::error::{CallError, CallResult};
use crate::events::EventEmitter;
use crate::sdk::RtcSession;
use crate::state::PubSubStore;
use crate::types::DisplayProperties;

/// Serializable call settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CallSettings {
    /// Properties for the local camera publisher and camera subscribers
    pub call_properties: DisplayProperties,
    /// Properties for screen subscribers
    pub screen_properties: DisplayProperties,
    /// Maximum camera participants allowed when joining
    pub connection_limit: Option<usize>,
    /// Subscribe to streams created while the call is active
    pub auto_subscribe: bool,
    /// Upper bound on any single SDK operation, in milliseconds
    pub sdk_timeout_ms: Option<u64>,
}

impl Default for CallSettings {
    fn default() -> Self {
        Self {
            call_properties: DisplayProperties::default(),
            screen_properties: DisplayProperties::screen(),
            connection_limit: None,
            auto_subscribe: true,
            sdk_timeout_ms: None,
        }
    }
}

impl CallSettings {
    pub fn sdk_timeout(&self) -> Option<Duration> {
        self.sdk_timeout_ms.map(Duration::from_millis)
    }
}

/// Everything a [`CallCoordinator`](crate::CallCoordinator) needs
#[derive(Clone)]
pub struct CallOptions {
    pub session: Arc<dyn RtcSession>,
    /// Registry of publishers, subscribers and streams
    pub state: Arc<dyn PubSubStore>,
    /// Application event bus
    pub events: EventEmitter,
    pub stream_containers: Arc<dyn ContainerResolver>,
    pub settings: CallSettings,
}

impl CallOptions {
    pub fn builder() -> CallOptionsBuilder {
        CallOptionsBuilder::new()
    }
}

impl std::fmt::Debug for CallOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallOptions")
            .field("session", &"<rtc session>")
            .field("state", &"<pubsub store>")
            .field("events", &self.events)
            .field("stream_containers", &"<resolver>")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Builder for [`CallOptions`]
#[derive(Default)]
pub struct CallOptionsBuilder {
    session: Option<Arc<dyn RtcSession>>,
    state: Option<Arc<dyn PubSubStore>>,
    events: Option<EventEmitter>,
    stream_containers: Option<Arc<dyn ContainerResolver>>,
    settings: CallSettings,
}

impl CallOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connected SDK session (required)
    pub fn session(mut self, session: Arc<dyn RtcSession>) -> Self {
        self.session = Some(session);
        self
    }

    /// Set the publisher/subscriber/stream registry (required)
    pub fn state(mut self, state: Arc<dyn PubSubStore>) -> Self {
        self.state = Some(state);
        self
    }

    /// Set the application event bus (required)
    pub fn events(mut self, events: EventEmitter) -> Self {
        self.events = Some(events);
        self
    }

    /// Set the container resolver (required)
    pub fn stream_containers(mut self, resolver: Arc<dyn ContainerResolver>) -> Self {
        self.stream_containers = Some(resolver);
        self
    }

    /// Replace all plain settings at once
    pub fn settings(mut self, settings: CallSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn call_properties(mut self, properties: DisplayProperties) -> Self {
        self.settings.call_properties = properties;
        self
    }

    pub fn screen_properties(mut self, properties: DisplayProperties) -> Self {
        self.settings.screen_properties = properties;
        self
    }

    pub fn connection_limit(mut self, limit: usize) -> Self {
        self.settings.connection_limit = Some(limit);
        self
    }

    pub fn auto_subscribe(mut self, enable: bool) -> Self {
        self.settings.auto_subscribe = enable;
        self
    }

    pub fn sdk_timeout(mut self, timeout: Duration) -> Self {
        self.settings.sdk_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Validate and build the options
    ///
    /// Every missing collaborator is logged before the build fails, so a
    /// host sees all of them at once.
    pub fn build(self) -> CallResult<CallOptions> {
        let mut missing = Vec::new();
        if self.session.is_none() {
            missing.push("session");
        }
        if self.state.is_none() {
            missing.push("state");
        }
        if self.events.is_none() {
            missing.push("events");
        }
        if self.stream_containers.is_none() {
            missing.push("stream_containers");
        }
        for field in &missing {
            tracing::error!("Options: {} is needed", field);
        }

        if self.settings.connection_limit == Some(0) {
            tracing::error!("Options: connection_limit must be at least 1");
            return Err(CallError::config("connection_limit must be at least 1"));
        }

        match (self.session, self.state, self.events, self.stream_containers) {
            (Some(session), Some(state), Some(events), Some(stream_containers)) => Ok(CallOptions {
                session,
                state,
                events,
                stream_containers,
                settings: self.settings,
            }),
            _ => Err(CallError::config(format!("missing required options: {}", missing.join(", ")))),
        }
    }
}
