use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::action::{Action, EventKind, RequestAction};
use crate::catalog;
use crate::descriptor::{OperationDescriptor, OperationSummary};
use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// OperationRegistry
// ---------------------------------------------------------------------------

/// Validated table of operation descriptors.
///
/// Provides the lookups the dispatcher needs:
/// - **By name** (`get`): the key callers pass to `start`
/// - **By request action** (`by_request`)
/// - **By event kind, identifier-less** (`uncorrelated_for`): the single
///   descriptor that owns an event kind when no identifier correlates it
/// - **By event kind, any** (`claimants`): every descriptor naming the kind
///
/// Built once at startup and shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    /// Registration order, for listing and deterministic verification.
    descriptors: Vec<Arc<OperationDescriptor>>,
    by_name: HashMap<&'static str, usize>,
    /// Request and cancel actions -> owning descriptor.
    by_request_role: HashMap<RequestAction, usize>,
    by_request: HashMap<RequestAction, usize>,
    uncorrelated: HashMap<EventKind, usize>,
    claimants: HashMap<EventKind, Vec<usize>>,
}

impl OperationRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over the built-in vendor catalog.
    ///
    /// # Errors
    ///
    /// Returns the first descriptor of the catalog that fails validation.
    pub fn builtin() -> Result<Self, ValidationError> {
        Self::from_descriptors(catalog::descriptors())
    }

    /// Registers every descriptor in order.
    ///
    /// # Errors
    ///
    /// Stops at the first descriptor that fails validation.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = OperationDescriptor>,
    ) -> Result<Self, ValidationError> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }
        Ok(registry)
    }

    /// Validates and adds a descriptor.
    ///
    /// Besides the descriptor's own invariants, checks membership against what
    /// is already registered: a request or cancel action belongs to one
    /// descriptor, and an event kind belongs to at most one identifier-less
    /// descriptor. Event kinds may be shared between identifier-correlated
    /// descriptors, since the identifier resolves them.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] and leaves the registry unchanged.
    pub fn register(&mut self, descriptor: OperationDescriptor) -> Result<(), ValidationError> {
        descriptor.validate()?;
        let name = descriptor.name();

        if self.by_name.contains_key(name) {
            return Err(ValidationError::DuplicateName { name });
        }
        for action in descriptor.request_action().into_iter().chain(descriptor.cancel_action()) {
            if let Some(&idx) = self.by_request_role.get(&action) {
                return Err(ValidationError::DuplicateAction {
                    name,
                    action: action.as_str(),
                    existing: self.descriptors[idx].name(),
                });
            }
        }
        if !descriptor.uses_identifier() {
            for kind in descriptor.event_kinds() {
                if let Some(&idx) = self.uncorrelated.get(&kind) {
                    return Err(ValidationError::DuplicateAction {
                        name,
                        action: kind.as_str(),
                        existing: self.descriptors[idx].name(),
                    });
                }
            }
        }

        let idx = self.descriptors.len();
        self.by_name.insert(name, idx);
        if let Some(request) = descriptor.request_action() {
            self.by_request.insert(request, idx);
        }
        for action in descriptor.request_action().into_iter().chain(descriptor.cancel_action()) {
            self.by_request_role.insert(action, idx);
        }
        for kind in descriptor.event_kinds() {
            if !descriptor.uses_identifier() {
                self.uncorrelated.insert(kind, idx);
            }
            self.claimants.entry(kind).or_default().push(idx);
        }
        self.descriptors.push(Arc::new(descriptor));
        Ok(())
    }

    /// Retrieve a descriptor by its registry name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<OperationDescriptor>> {
        self.by_name.get(name).map(|&idx| &self.descriptors[idx])
    }

    /// Retrieve the descriptor initiated by `action`.
    #[must_use]
    pub fn by_request(&self, action: RequestAction) -> Option<&Arc<OperationDescriptor>> {
        self.by_request.get(&action).map(|&idx| &self.descriptors[idx])
    }

    /// The identifier-less descriptor that owns `kind`, if any.
    #[must_use]
    pub fn uncorrelated_for(&self, kind: EventKind) -> Option<&Arc<OperationDescriptor>> {
        self.uncorrelated.get(&kind).map(|&idx| &self.descriptors[idx])
    }

    /// Every descriptor that lists `kind` as a callback or terminator.
    #[must_use]
    pub fn claimants(&self, kind: EventKind) -> Vec<&Arc<OperationDescriptor>> {
        self.claimants
            .get(&kind)
            .map(|idxs| idxs.iter().map(|&idx| &self.descriptors[idx]).collect())
            .unwrap_or_default()
    }

    /// All descriptors in registration order.
    #[must_use]
    pub fn descriptors(&self) -> &[Arc<OperationDescriptor>] {
        &self.descriptors
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Every action referenced by any descriptor in any role.
    #[must_use]
    pub fn classified_actions(&self) -> BTreeSet<Action> {
        self.descriptors.iter().flat_map(|d| d.actions()).collect()
    }

    /// Introspection for tooling, in registration order.
    #[must_use]
    pub fn list_registered_operations(&self) -> Vec<OperationSummary> {
        self.descriptors
            .iter()
            .map(|d| OperationSummary::from(d.as_ref()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
