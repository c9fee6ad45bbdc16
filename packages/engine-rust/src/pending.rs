//! Pending-operation records and the table that indexes them.
//!
//! The table is the dispatcher's only shared mutable state. It is plain data
//! guarded by the dispatcher's mutex; nothing here locks or awaits.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::trace;
use twsbridge_core::{OperationDescriptor, OutboundRequest, Reply, RequestId};

use crate::handle::{Delivery, OperationId};

/// Lifecycle state of a live operation. Terminated operations are removed
/// from the table, so they have no state here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    Active,
    /// Cancel sent; waiting for the vendor to confirm.
    Cancelling,
}

// ---------------------------------------------------------------------------
// PendingOperation
// ---------------------------------------------------------------------------

/// Runtime record correlating inbound events to one in-flight request.
#[derive(Debug)]
pub struct PendingOperation {
    pub id: OperationId,
    pub identifier: Option<RequestId>,
    pub descriptor: Arc<OperationDescriptor>,
    pub state: OperationState,
    /// Resolved once at start.
    pub is_subscription: bool,
    /// Replies so far. Kept for one-shots only.
    pub accumulated: Vec<Reply>,
    sink: mpsc::UnboundedSender<Delivery>,
}

impl PendingOperation {
    pub(crate) fn new(
        id: OperationId,
        identifier: Option<RequestId>,
        descriptor: Arc<OperationDescriptor>,
        is_subscription: bool,
        sink: mpsc::UnboundedSender<Delivery>,
    ) -> Self {
        Self {
            id,
            identifier,
            descriptor,
            state: OperationState::Active,
            is_subscription,
            accumulated: Vec::new(),
            sink,
        }
    }

    /// Pushes a reply to the caller, recording it for one-shots. Returns
    /// `false` if the handle was dropped.
    pub(crate) fn forward(&mut self, reply: Reply) -> bool {
        if !self.is_subscription {
            self.accumulated.push(reply.clone());
        }
        self.deliver(Delivery::Reply(reply))
    }

    /// Pushes a delivery to the caller. Returns `false` if the handle was
    /// dropped; a one-shot still runs to its terminal event, a subscription
    /// is abandoned by the dispatcher.
    pub(crate) fn deliver(&self, delivery: Delivery) -> bool {
        if self.sink.send(delivery).is_err() {
            trace!(operation = %self.id, "result handle dropped, delivery discarded");
            return false;
        }
        true
    }

    /// Whether the caller's handle is gone.
    #[must_use]
    pub fn is_abandoned(&self) -> bool {
        self.sink.is_closed()
    }

    #[must_use]
    pub fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            id: self.id,
            key: self.descriptor.name(),
            identifier: self.identifier,
            state: self.state,
            is_subscription: self.is_subscription,
            replies: self.accumulated.len(),
        }
    }
}

/// Point-in-time view of a pending operation, for introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingSnapshot {
    pub id: OperationId,
    pub key: &'static str,
    pub identifier: Option<RequestId>,
    pub state: OperationState,
    pub is_subscription: bool,
    /// Replies accumulated so far (always zero for subscriptions).
    pub replies: usize,
}

// ---------------------------------------------------------------------------
// PendingTable
// ---------------------------------------------------------------------------

/// Live operations indexed by engine id, vendor identifier, and (for
/// identifier-less descriptors) descriptor name.
#[derive(Debug, Default)]
pub struct PendingTable {
    operations: HashMap<OperationId, PendingOperation>,
    by_identifier: HashMap<RequestId, OperationId>,
    /// At most one outstanding operation per identifier-less descriptor.
    uncorrelated: HashMap<&'static str, OperationId>,
    /// Cancels owed for abandoned subscriptions, sent outside the lock.
    cancels: Vec<OutboundRequest>,
    closed: bool,
}

impl PendingTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, op: PendingOperation) {
        match op.identifier {
            Some(identifier) => {
                self.by_identifier.insert(identifier, op.id);
            }
            None => {
                self.uncorrelated.insert(op.descriptor.name(), op.id);
            }
        }
        self.operations.insert(op.id, op);
    }

    /// Removes an operation and its index entries.
    pub fn remove(&mut self, id: OperationId) -> Option<PendingOperation> {
        let op = self.operations.remove(&id)?;
        match op.identifier {
            Some(identifier) => {
                self.by_identifier.remove(&identifier);
            }
            None => {
                self.uncorrelated.remove(op.descriptor.name());
            }
        }
        Some(op)
    }

    #[must_use]
    pub fn get(&self, id: OperationId) -> Option<&PendingOperation> {
        self.operations.get(&id)
    }

    pub fn get_mut(&mut self, id: OperationId) -> Option<&mut PendingOperation> {
        self.operations.get_mut(&id)
    }

    #[must_use]
    pub fn by_identifier(&self, identifier: RequestId) -> Option<OperationId> {
        self.by_identifier.get(&identifier).copied()
    }

    /// The outstanding operation of an identifier-less descriptor.
    #[must_use]
    pub fn outstanding(&self, name: &str) -> Option<OperationId> {
        self.uncorrelated.get(name).copied()
    }

    /// Ids of every operation in `state`, ascending.
    #[must_use]
    pub fn ids_in_state(&self, state: OperationState) -> Vec<OperationId> {
        let mut ids: Vec<_> = self
            .operations
            .values()
            .filter(|op| op.state == state)
            .map(|op| op.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn queue_cancel(&mut self, request: OutboundRequest) {
        self.cancels.push(request);
    }

    /// Takes the queued cancels in the order they were queued.
    pub fn take_cancels(&mut self) -> Vec<OutboundRequest> {
        std::mem::take(&mut self.cancels)
    }

    /// Removes and returns every operation, ascending by id. Queued cancels
    /// are discarded with them.
    pub fn drain_all(&mut self) -> Vec<PendingOperation> {
        self.by_identifier.clear();
        self.uncorrelated.clear();
        self.cancels.clear();
        let mut ops: Vec<_> = self.operations.drain().map(|(_, op)| op).collect();
        ops.sort_unstable_by_key(|op| op.id);
        ops
    }

    #[must_use]
    pub fn snapshots(&self) -> Vec<PendingSnapshot> {
        let mut snapshots: Vec<_> = self.operations.values().map(PendingOperation::snapshot).collect();
        snapshots.sort_unstable_by_key(|s| s.id);
        snapshots
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use twsbridge_core::{EventKind, RequestAction, Value};

    use super::*;

    fn descriptor(action: RequestAction) -> Arc<OperationDescriptor> {
        Arc::new(OperationDescriptor::request(action).callbacks([EventKind::Position]))
    }

    fn op(
        id: u64,
        identifier: Option<i64>,
        action: RequestAction,
    ) -> (PendingOperation, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let op = PendingOperation::new(
            OperationId(id),
            identifier.map(RequestId),
            descriptor(action),
            false,
            tx,
        );
        (op, rx)
    }

    #[test]
    fn insert_indexes_by_identifier_and_name() {
        let mut table = PendingTable::new();
        let (a, _rx_a) = op(1, Some(10), RequestAction::ReqContractDetails);
        let (b, _rx_b) = op(2, None, RequestAction::ReqPositions);
        table.insert(a);
        table.insert(b);

        assert_eq!(table.len(), 2);
        assert_eq!(table.by_identifier(RequestId(10)), Some(OperationId(1)));
        assert_eq!(table.outstanding("reqPositions"), Some(OperationId(2)));
        assert_eq!(table.outstanding("reqContractDetails"), None);
    }

    #[test]
    fn remove_clears_indexes() {
        let mut table = PendingTable::new();
        let (a, _rx_a) = op(1, Some(10), RequestAction::ReqContractDetails);
        let (b, _rx_b) = op(2, None, RequestAction::ReqPositions);
        table.insert(a);
        table.insert(b);

        assert!(table.remove(OperationId(1)).is_some());
        assert!(table.remove(OperationId(2)).is_some());
        assert!(table.remove(OperationId(2)).is_none());
        assert!(table.is_empty());
        assert_eq!(table.by_identifier(RequestId(10)), None);
        assert_eq!(table.outstanding("reqPositions"), None);
    }

    #[test]
    fn drain_all_returns_everything_in_order() {
        let mut table = PendingTable::new();
        for id in [3, 1, 2] {
            let (op, _rx) = op(id, Some(i64::try_from(id).unwrap()), RequestAction::ReqContractDetails);
            table.insert(op);
        }
        let drained: Vec<_> = table.drain_all().into_iter().map(|op| op.id.0).collect();
        assert_eq!(drained, vec![1, 2, 3]);
        assert!(table.is_empty());
        assert_eq!(table.by_identifier(RequestId(1)), None);
    }

    #[test]
    fn ids_in_state_filters() {
        let mut table = PendingTable::new();
        let (a, _rx_a) = op(1, Some(1), RequestAction::ReqContractDetails);
        let (b, _rx_b) = op(2, Some(2), RequestAction::ReqContractDetails);
        table.insert(a);
        table.insert(b);
        table.get_mut(OperationId(2)).unwrap().state = OperationState::Cancelling;

        assert_eq!(table.ids_in_state(OperationState::Active), vec![OperationId(1)]);
        assert_eq!(table.ids_in_state(OperationState::Cancelling), vec![OperationId(2)]);
    }

    #[tokio::test]
    async fn forward_accumulates_one_shots_only() {
        let (mut one_shot, mut rx) = op(1, Some(1), RequestAction::ReqContractDetails);
        let reply = Reply {
            kind: EventKind::Position,
            payload: Value::Int(1),
        };
        one_shot.forward(reply.clone());
        assert_eq!(one_shot.accumulated, vec![reply.clone()]);
        assert!(matches!(rx.recv().await, Some(Delivery::Reply(r)) if r == reply));

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut subscription =
            PendingOperation::new(OperationId(2), Some(RequestId(2)), descriptor(RequestAction::ReqMktDepth), true, tx);
        subscription.forward(reply);
        assert!(subscription.accumulated.is_empty());
        assert_eq!(subscription.snapshot().replies, 0);
    }

    #[test]
    fn deliver_to_dropped_handle_reports_abandonment() {
        let (op, rx) = op(1, Some(1), RequestAction::ReqContractDetails);
        assert!(!op.is_abandoned());
        drop(rx);
        assert!(op.is_abandoned());
        assert!(!op.deliver(Delivery::Completed));
    }

    #[test]
    fn queued_cancels_are_taken_once_and_cleared_by_drain() {
        let mut table = PendingTable::new();
        let cancel = |n| OutboundRequest {
            action: RequestAction::CancelMktDepth,
            identifier: Some(RequestId(n)),
            params: twsbridge_core::Params::new(),
        };
        table.queue_cancel(cancel(1));
        table.queue_cancel(cancel(2));
        let taken: Vec<_> = table.take_cancels().into_iter().map(|r| r.identifier).collect();
        assert_eq!(taken, vec![Some(RequestId(1)), Some(RequestId(2))]);
        assert!(table.take_cancels().is_empty());

        table.queue_cancel(cancel(3));
        let _ = table.drain_all();
        assert!(table.take_cancels().is_empty());
    }

    #[test]
    fn closed_flag_round_trip() {
        let mut table = PendingTable::new();
        assert!(!table.is_closed());
        table.set_closed(true);
        assert!(table.is_closed());
        table.set_closed(false);
        assert!(!table.is_closed());
    }
}
