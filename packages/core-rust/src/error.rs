//! Error model shared by the registry and the engine.

use serde::{Deserialize, Serialize};

/// A failure reported by the vendor on the event stream.
///
/// Both fields are carried opaquely: interpreting codes is the caller's
/// concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("Error Code {code} Reason {reason}")]
pub struct IbError {
    pub reason: String,
    pub code: i32,
}

impl IbError {
    #[must_use]
    pub fn new(reason: impl Into<String>, code: i32) -> Self {
        Self {
            reason: reason.into(),
            code,
        }
    }
}

/// The channel to the gateway failed as a whole (socket closed, handshake
/// rejected), as opposed to a single operation failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("connection error: {message}")]
pub struct ConnectionError {
    pub message: String,
}

impl ConnectionError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A descriptor was rejected at registration time.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("subscriptions should always have one or more callbacks: {name}")]
    SubscriptionWithoutCallbacks { name: &'static str },
    #[error("descriptor {name} declares both a static subscription and a subscription flag")]
    ConflictingPersistence { name: &'static str },
    #[error("unsolicited stream {name} must declare at least one callback")]
    UnsolicitedWithoutCallbacks { name: &'static str },
    #[error("unsolicited stream {name} cannot correlate by identifier")]
    UnsolicitedWithIdentifier { name: &'static str },
    #[error("descriptor {name} has an implicit terminator but no callbacks")]
    DoneFlagWithoutCallbacks { name: &'static str },
    #[error("descriptor {name} awaits a cancel acknowledgement but has no cancel action")]
    AckWithoutCancel { name: &'static str },
    #[error("descriptor {name} lists {action} in more than one role")]
    DuplicateRole { name: &'static str, action: &'static str },
    #[error("{action} is already classified by {existing}, cannot add it to {name}")]
    DuplicateAction {
        name: &'static str,
        action: &'static str,
        existing: &'static str,
    },
    #[error("descriptor name already registered: {name}")]
    DuplicateName { name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ib_error_display_carries_code_and_reason() {
        let err = IbError::new("No security definition has been found", 200);
        assert_eq!(
            err.to_string(),
            "Error Code 200 Reason No security definition has been found"
        );
    }

    #[test]
    fn connection_error_display() {
        let err = ConnectionError::new("socket closed");
        assert_eq!(err.to_string(), "connection error: socket closed");
    }

    #[test]
    fn validation_error_names_the_descriptor() {
        let err = ValidationError::DuplicateAction {
            name: "calculateOptionPrice",
            action: "cancelMktData",
            existing: "reqMktData",
        };
        assert!(err.to_string().contains("reqMktData"));
        assert!(err.to_string().contains("calculateOptionPrice"));
    }
}
