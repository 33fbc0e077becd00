//! Core types shared by the coordinator, the SDK seam and the registry

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap an SDK-assigned identifier
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the raw identifier
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a remote stream, assigned by the SDK
    StreamId
);
string_id!(
    /// Identifier of a local publisher
    PublisherId
);
string_id!(
    /// Identifier of a subscriber to a remote stream
    SubscriberId
);
string_id!(
    /// Identifier of a participant connection
    ConnectionId
);

/// The two media source kinds a stream can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Participant camera (audio-only participants are counted here too)
    Camera,
    /// Shared screen
    Screen,
}

impl StreamKind {
    /// All kinds, in registry order
    pub const ALL: [StreamKind; 2] = [StreamKind::Camera, StreamKind::Screen];

    /// Lowercase wire name (`camera` / `screen`)
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamKind::Camera => "camera",
            StreamKind::Screen => "screen",
        }
    }
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media track a toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaSource {
    Audio,
    Video,
}

impl fmt::Display for MediaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaSource::Audio => f.write_str("audio"),
            MediaSource::Video => f.write_str("video"),
        }
    }
}

/// Connection a remote stream belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    /// Application metadata attached when the participant connected,
    /// usually a JSON document
    pub data: Option<String>,
}

/// A stream published by another participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteStream {
    pub id: StreamId,
    pub kind: StreamKind,
    pub connection: ConnectionInfo,
    pub name: Option<String>,
    pub has_audio: bool,
    pub has_video: bool,
}

impl RemoteStream {
    /// Create a stream with audio and video enabled and no metadata
    pub fn new(id: impl Into<StreamId>, kind: StreamKind, connection_id: impl Into<ConnectionId>) -> Self {
        Self {
            id: id.into(),
            kind,
            connection: ConnectionInfo {
                id: connection_id.into(),
                data: None,
            },
            name: None,
            has_audio: true,
            has_video: true,
        }
    }

    /// Attach raw connection metadata
    pub fn with_connection_data(mut self, data: impl Into<String>) -> Self {
        self.connection.data = Some(data.into());
        self
    }

    /// Decode the connection metadata as JSON
    ///
    /// Missing or malformed metadata yields `None`.
    pub fn connection_data(&self) -> Option<serde_json::Value> {
        let raw = self.connection.data.as_deref()?;
        match serde_json::from_str(raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(stream_id = %self.id, "Ignoring malformed connection data: {}", e);
                None
            }
        }
    }
}

/// Where the SDK inserts its video element relative to the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertMode {
    Replace,
    After,
    Before,
    Append,
}

/// How the video is scaled inside its element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FitMode {
    Cover,
    Contain,
}

/// Display options handed to the SDK when creating publishers and subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DisplayProperties {
    pub insert_mode: InsertMode,
    pub width: String,
    pub height: String,
    pub show_controls: bool,
    pub fit_mode: Option<FitMode>,
    pub name: Option<String>,
    /// Start with audio enabled
    pub audio: bool,
    /// Start with video enabled
    pub video: bool,
}

impl Default for DisplayProperties {
    fn default() -> Self {
        Self {
            insert_mode: InsertMode::Append,
            width: "100%".to_string(),
            height: "100%".to_string(),
            show_controls: false,
            fit_mode: None,
            name: None,
            audio: true,
            video: true,
        }
    }
}

impl DisplayProperties {
    /// Defaults used for shared screens
    pub fn screen() -> Self {
        Self {
            fit_mode: Some(FitMode::Contain),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_data_decoding() {
        let stream = RemoteStream::new("s1", StreamKind::Camera, "c1")
            .with_connection_data(r#"{"userName":"Ada"}"#);
        let data = stream.connection_data().unwrap();
        assert_eq!(data["userName"], "Ada");

        let broken = RemoteStream::new("s2", StreamKind::Camera, "c2").with_connection_data("not json");
        assert!(broken.connection_data().is_none());

        let empty = RemoteStream::new("s3", StreamKind::Screen, "c3");
        assert!(empty.connection_data().is_none());
    }

    #[test]
    fn test_display_properties_deserialize_with_defaults() {
        let props: DisplayProperties =
            serde_json::from_str(r#"{"insertMode":"replace","showControls":true}"#).unwrap();
        assert_eq!(props.insert_mode, InsertMode::Replace);
        assert!(props.show_controls);
        assert_eq!(props.width, "100%");
        assert!(props.audio && props.video);
    }

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(StreamKind::Camera.to_string(), "camera");
        assert_eq!(serde_json::to_string(&StreamKind::Screen).unwrap(), "\"screen\"");
    }
}
