//! Error types for the group call coordinator

use thiserror::Error;

use crate::sdk::SdkError;
use crate::types::{PublisherId, SubscriberId};

/// SDK error code reported when the client cannot reach the media servers
pub const NETWORK_ERROR_CODE: i32 = 1010;

/// Message shown to users for [`NETWORK_ERROR_CODE`]
pub const NETWORK_ERROR_MESSAGE: &str = "Check your network connection";

/// Result type for call operations
pub type CallResult<T> = Result<T, CallError>;

/// Errors that can occur while coordinating a call
#[derive(Debug, Clone, Error)]
pub enum CallError {
    /// The RTC SDK rejected an operation
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// Joining would exceed the configured participant cap
    #[error("Connection limit exceeded: {current} camera streams present, limit is {limit}")]
    ConnectionLimitExceeded { limit: usize, current: usize },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Operation not allowed in the current call state
    #[error("Invalid state: {message}")]
    InvalidState { message: String },

    /// No publisher with this id
    #[error("Publisher not found: {id}")]
    PublisherNotFound { id: PublisherId },

    /// No subscriber with this id
    #[error("Subscriber not found: {id}")]
    SubscriberNotFound { id: SubscriberId },

    /// An SDK operation did not complete in time
    #[error("{operation} timed out after {millis} ms")]
    Timeout { operation: String, millis: u64 },
}

impl CallError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, millis: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            millis,
        }
    }

    /// SDK error code, if this error came from the SDK
    pub fn sdk_code(&self) -> Option<i32> {
        match self {
            Self::Sdk(err) => err.code,
            _ => None,
        }
    }

    /// Human readable message for the host UI
    ///
    /// SDK errors keep the SDK's own message, except the network error
    /// code which is replaced by a connectivity hint.
    pub fn user_message(&self) -> String {
        match self {
            Self::Sdk(err) if err.code == Some(NETWORK_ERROR_CODE) => {
                NETWORK_ERROR_MESSAGE.to_string()
            }
            Self::Sdk(err) => err.message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_code_maps_to_hint() {
        let err = CallError::from(SdkError::with_code(1010, "OT_CONNECT_FAILED"));
        assert_eq!(err.user_message(), "Check your network connection");
        assert_eq!(err.sdk_code(), Some(1010));
    }

    #[test]
    fn test_other_sdk_errors_pass_through() {
        let err = CallError::from(SdkError::with_code(1500, "Unable to publish"));
        assert_eq!(err.user_message(), "Unable to publish");

        let err = CallError::from(SdkError::new("no code here"));
        assert_eq!(err.user_message(), "no code here");
        assert_eq!(err.sdk_code(), None);
    }

    #[test]
    fn test_policy_errors_use_display() {
        let err = CallError::ConnectionLimitExceeded { limit: 2, current: 2 };
        assert!(err.user_message().contains("limit is 2"));
    }
}
