//! Resolution of the UI containers publishers and subscribers render into

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{StreamId, StreamKind};

/// Which side of the call a container is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PubSubRole {
    Publisher,
    Subscriber,
}

/// Opaque reference to a host UI element, typically a CSS selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Container(String);

impl Container {
    pub fn new(selector: impl Into<String>) -> Self {
        Self(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Container {
    fn from(selector: &str) -> Self {
        Self(selector.to_string())
    }
}

/// Everything the host knows when it is asked for a container
#[derive(Debug, Clone, Copy)]
pub struct ContainerRequest<'a> {
    pub role: PubSubRole,
    pub kind: StreamKind,
    /// Decoded connection metadata of the remote participant
    pub connection_data: Option<&'a serde_json::Value>,
    /// Remote stream id, set for subscribers only
    pub stream_id: Option<&'a StreamId>,
}

impl<'a> ContainerRequest<'a> {
    /// Request for the local publisher of `kind`
    pub fn publisher(kind: StreamKind) -> Self {
        Self {
            role: PubSubRole::Publisher,
            kind,
            connection_data: None,
            stream_id: None,
        }
    }

    /// Request for a subscriber to a remote stream
    pub fn subscriber(
        kind: StreamKind,
        connection_data: Option<&'a serde_json::Value>,
        stream_id: &'a StreamId,
    ) -> Self {
        Self {
            role: PubSubRole::Subscriber,
            kind,
            connection_data,
            stream_id: Some(stream_id),
        }
    }
}

/// Host callback that maps a request to a container
pub trait ContainerResolver: Send + Sync {
    fn resolve(&self, request: ContainerRequest<'_>) -> Container;
}

impl<F> ContainerResolver for F
where
    F: Fn(ContainerRequest<'_>) -> Container + Send + Sync,
{
    fn resolve(&self, request: ContainerRequest<'_>) -> Container {
        self(request)
    }
}

/// Resolver that uses one fixed selector per role and kind,
/// e.g. `#cameraSubscriberContainer`
#[derive(Debug, Clone, Default)]
pub struct DefaultContainers;

impl ContainerResolver for DefaultContainers {
    fn resolve(&self, request: ContainerRequest<'_>) -> Container {
        let role = match request.role {
            PubSubRole::Publisher => "Publisher",
            PubSubRole::Subscriber => "Subscriber",
        };
        Container::new(format!("#{}{}Container", request.kind, role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_containers() {
        let resolver = DefaultContainers;
        assert_eq!(
            resolver.resolve(ContainerRequest::publisher(StreamKind::Camera)).as_str(),
            "#cameraPublisherContainer"
        );
        let id = StreamId::new("s1");
        assert_eq!(
            resolver.resolve(ContainerRequest::subscriber(StreamKind::Screen, None, &id)).as_str(),
            "#screenSubscriberContainer"
        );
    }

    #[test]
    fn test_closure_resolver_sees_connection_data() {
        let resolver = |req: ContainerRequest<'_>| {
            let user = req
                .connection_data
                .and_then(|d| d.get("userId"))
                .and_then(|v| v.as_str())
                .unwrap_or("anon");
            Container::new(format!("#tile-{}", user))
        };
        let data = serde_json::json!({ "userId": "u42" });
        let id = StreamId::new("s1");
        let container = resolver.resolve(ContainerRequest::subscriber(StreamKind::Camera, Some(&data), &id));
        assert_eq!(container.as_str(), "#tile-u42");
    }
}
