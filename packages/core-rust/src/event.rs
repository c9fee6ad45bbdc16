//! Transport-facing records: what the engine sends and what it receives.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::action::{EventKind, RequestAction};
use crate::error::IbError;
use crate::types::{Params, Value};

/// Identifier the vendor uses for "no specific request".
pub const NO_IDENTIFIER: i64 = -1;

/// Numeric correlation key assigned to a request and echoed on its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub i64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One outbound action handed to the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    pub action: RequestAction,
    pub identifier: Option<RequestId>,
    pub params: Params,
}

/// One inbound event, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InboundEvent {
    /// A callback carrying data.
    Reply {
        kind: EventKind,
        identifier: Option<i64>,
        payload: Value,
        /// Vendor's self-marked-last flag for implicit-terminator families.
        done: bool,
    },
    /// A vendor error tuple. `identifier` of `None` or `-1` addresses no
    /// specific request.
    Error {
        identifier: Option<i64>,
        error: IbError,
    },
}

impl InboundEvent {
    #[must_use]
    pub fn reply(kind: EventKind, identifier: Option<i64>, payload: impl Into<Value>) -> Self {
        InboundEvent::Reply {
            kind,
            identifier,
            payload: payload.into(),
            done: false,
        }
    }

    #[must_use]
    pub fn error(identifier: Option<i64>, code: i32, reason: impl Into<String>) -> Self {
        InboundEvent::Error {
            identifier,
            error: IbError::new(reason, code),
        }
    }

    /// Marks a reply as the last of its batch. No effect on errors.
    #[must_use]
    pub fn with_done(mut self, last: bool) -> Self {
        if let InboundEvent::Reply { done, .. } = &mut self {
            *done = last;
        }
        self
    }

    /// The identifier, with the vendor's `-1` sentinel folded into `None`.
    #[must_use]
    pub fn request_id(&self) -> Option<RequestId> {
        let raw = match self {
            InboundEvent::Reply { identifier, .. } | InboundEvent::Error { identifier, .. } => {
                *identifier
            }
        };
        raw.filter(|id| *id != NO_IDENTIFIER).map(RequestId)
    }
}

/// A single result item delivered to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub kind: EventKind,
    pub payload: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_identifier_is_no_identifier() {
        let broadcast = InboundEvent::error(Some(NO_IDENTIFIER), 1100, "Connectivity lost");
        assert_eq!(broadcast.request_id(), None);

        let addressed = InboundEvent::error(Some(7), 200, "No security definition");
        assert_eq!(addressed.request_id(), Some(RequestId(7)));

        let untagged = InboundEvent::reply(EventKind::CurrentTime, None, 1_700_000_000_i64);
        assert_eq!(untagged.request_id(), None);
    }

    #[test]
    fn with_done_only_touches_replies() {
        let ev = InboundEvent::reply(EventKind::HistoricalTicks, Some(3), Value::Null).with_done(true);
        assert!(matches!(ev, InboundEvent::Reply { done: true, .. }));

        let err = InboundEvent::error(Some(3), 162, "pacing").with_done(true);
        assert!(matches!(err, InboundEvent::Error { .. }));
    }
}
