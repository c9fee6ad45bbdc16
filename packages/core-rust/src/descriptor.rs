//! Operation descriptors: the static classification of one vendor operation
//! family into an interaction shape.

use serde::{Deserialize, Serialize};

use crate::action::{Action, EventKind, RequestAction};
use crate::error::ValidationError;
use crate::types::{Params, Value};

// ---------------------------------------------------------------------------
// Shape vocabulary
// ---------------------------------------------------------------------------

/// How the replies of an operation family are shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionShape {
    /// Request with no observable reply.
    FireAndForget,
    /// Exactly one reply completes the request.
    SingleReply,
    /// Replies until a terminator event or a self-marked-last reply.
    ReplyStream,
    /// Replies until cancelled.
    Subscription,
    /// One-shot or subscription depending on a request flag.
    DualMode,
    /// Pushed by the vendor without a request.
    Unsolicited,
}

/// How the vendor confirms a cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelAck {
    /// No confirmation; the operation is terminal once the cancel is sent.
    #[default]
    Immediate,
    /// Stays `Cancelling` until a terminator, a self-marked-last reply or an
    /// error for the identifier arrives.
    AwaitTerminal,
}

/// The request parameter that switches a dual-mode call into a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionFlag {
    pub name: &'static str,
    /// The flag value that makes the call persistent.
    pub value: bool,
}

// ---------------------------------------------------------------------------
// OperationDescriptor
// ---------------------------------------------------------------------------

/// Immutable classification of one vendor operation family.
///
/// Built with the consuming builder methods below and validated when added to
/// an [`OperationRegistry`](crate::registry::OperationRegistry).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    name: &'static str,
    request: Option<RequestAction>,
    cancel: Option<RequestAction>,
    callbacks: Vec<EventKind>,
    terminator: Option<EventKind>,
    uses_identifier: bool,
    has_done_flag: bool,
    is_subscription: bool,
    subscription_flag: Option<SubscriptionFlag>,
    cancel_ack: CancelAck,
}

impl OperationDescriptor {
    /// A caller-initiated family keyed by its request action's wire name.
    #[must_use]
    pub fn request(action: RequestAction) -> Self {
        Self::blank(action.as_str(), Some(action))
    }

    /// A family the vendor pushes on its own, keyed by `name`.
    #[must_use]
    pub fn unsolicited(name: &'static str, callbacks: impl IntoIterator<Item = EventKind>) -> Self {
        Self::blank(name, None).callbacks(callbacks)
    }

    fn blank(name: &'static str, request: Option<RequestAction>) -> Self {
        Self {
            name,
            request,
            cancel: None,
            callbacks: Vec::new(),
            terminator: None,
            uses_identifier: false,
            has_done_flag: false,
            is_subscription: false,
            subscription_flag: None,
            cancel_ack: CancelAck::Immediate,
        }
    }

    #[must_use]
    pub fn cancel(mut self, action: RequestAction) -> Self {
        self.cancel = Some(action);
        self
    }

    #[must_use]
    pub fn callbacks(mut self, kinds: impl IntoIterator<Item = EventKind>) -> Self {
        self.callbacks.extend(kinds);
        self
    }

    #[must_use]
    pub fn terminator(mut self, kind: EventKind) -> Self {
        self.terminator = Some(kind);
        self
    }

    #[must_use]
    pub fn with_identifier(mut self) -> Self {
        self.uses_identifier = true;
        self
    }

    #[must_use]
    pub fn with_done_flag(mut self) -> Self {
        self.has_done_flag = true;
        self
    }

    #[must_use]
    pub fn subscription(mut self) -> Self {
        self.is_subscription = true;
        self
    }

    #[must_use]
    pub fn subscription_when(mut self, name: &'static str, value: bool) -> Self {
        self.subscription_flag = Some(SubscriptionFlag { name, value });
        self
    }

    #[must_use]
    pub fn cancel_ack(mut self, ack: CancelAck) -> Self {
        self.cancel_ack = ack;
        self
    }

    // -- accessors ----------------------------------------------------------

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn request_action(&self) -> Option<RequestAction> {
        self.request
    }

    #[must_use]
    pub fn cancel_action(&self) -> Option<RequestAction> {
        self.cancel
    }

    #[must_use]
    pub fn callback_actions(&self) -> &[EventKind] {
        &self.callbacks
    }

    #[must_use]
    pub fn terminator_action(&self) -> Option<EventKind> {
        self.terminator
    }

    #[must_use]
    pub fn uses_identifier(&self) -> bool {
        self.uses_identifier
    }

    #[must_use]
    pub fn has_done_flag(&self) -> bool {
        self.has_done_flag
    }

    #[must_use]
    pub fn is_persistent_subscription(&self) -> bool {
        self.is_subscription
    }

    #[must_use]
    pub fn subscription_flag(&self) -> Option<SubscriptionFlag> {
        self.subscription_flag
    }

    #[must_use]
    pub fn cancel_acknowledgement(&self) -> CancelAck {
        self.cancel_ack
    }

    // -- derived ------------------------------------------------------------

    #[must_use]
    pub fn shape(&self) -> InteractionShape {
        if self.request.is_none() {
            InteractionShape::Unsolicited
        } else if self.subscription_flag.is_some() {
            InteractionShape::DualMode
        } else if self.is_subscription {
            InteractionShape::Subscription
        } else if self.callbacks.is_empty() && self.terminator.is_none() {
            InteractionShape::FireAndForget
        } else if self.terminator.is_some() || self.has_done_flag {
            InteractionShape::ReplyStream
        } else {
            InteractionShape::SingleReply
        }
    }

    /// Whether a call started with `params` is persistent.
    ///
    /// A missing or non-boolean flag parameter resolves to one-shot.
    #[must_use]
    pub fn resolve_subscription(&self, params: &Params) -> bool {
        if self.request.is_none() {
            return true;
        }
        match self.subscription_flag {
            Some(flag) => params.get(flag.name).and_then(Value::as_bool) == Some(flag.value),
            None => self.is_subscription,
        }
    }

    /// Whether `kind` is one of this family's callbacks or its terminator.
    #[must_use]
    pub fn claims(&self, kind: EventKind) -> bool {
        self.terminator == Some(kind) || self.callbacks.contains(&kind)
    }

    /// Every action this descriptor classifies, request side first.
    #[must_use]
    pub fn actions(&self) -> Vec<Action> {
        self.request
            .into_iter()
            .chain(self.cancel)
            .map(Action::Request)
            .chain(self.callbacks.iter().copied().map(Action::Event))
            .chain(self.terminator.map(Action::Event))
            .collect()
    }

    /// The event kinds this descriptor can receive (callbacks, then terminator).
    pub fn event_kinds(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.callbacks.iter().copied().chain(self.terminator)
    }

    /// Checks the invariants that concern this descriptor alone.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant as a [`ValidationError`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        let name = self.name;

        if (self.is_subscription || self.subscription_flag.is_some()) && self.callbacks.is_empty() {
            return Err(ValidationError::SubscriptionWithoutCallbacks { name });
        }
        if self.is_subscription && self.subscription_flag.is_some() {
            return Err(ValidationError::ConflictingPersistence { name });
        }
        if self.request.is_none() {
            if self.callbacks.is_empty() {
                return Err(ValidationError::UnsolicitedWithoutCallbacks { name });
            }
            if self.uses_identifier {
                return Err(ValidationError::UnsolicitedWithIdentifier { name });
            }
        }
        if self.has_done_flag && self.callbacks.is_empty() {
            return Err(ValidationError::DoneFlagWithoutCallbacks { name });
        }
        if self.cancel_ack == CancelAck::AwaitTerminal && self.cancel.is_none() {
            return Err(ValidationError::AckWithoutCancel { name });
        }

        let actions = self.actions();
        for (i, action) in actions.iter().enumerate() {
            if actions[..i].contains(action) {
                return Err(ValidationError::DuplicateRole {
                    name,
                    action: action.as_str(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OperationSummary
// ---------------------------------------------------------------------------

/// Serializable view of a descriptor for tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationSummary {
    pub name: &'static str,
    pub shape: InteractionShape,
    pub request: Option<RequestAction>,
    pub cancel: Option<RequestAction>,
    pub callbacks: Vec<EventKind>,
    pub terminator: Option<EventKind>,
    pub uses_identifier: bool,
    pub subscription_flag: Option<SubscriptionFlag>,
}

impl From<&OperationDescriptor> for OperationSummary {
    fn from(d: &OperationDescriptor) -> Self {
        Self {
            name: d.name,
            shape: d.shape(),
            request: d.request,
            cancel: d.cancel,
            callbacks: d.callbacks.clone(),
            terminator: d.terminator,
            uses_identifier: d.uses_identifier,
            subscription_flag: d.subscription_flag,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
