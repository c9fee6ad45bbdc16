//! Correlation engine: multiplexes the single inbound event stream into
//! independent logical operations.
//!
//! `start` and `cancel` may be called concurrently from any task. `route` and
//! `connection_lost` are driven by one sequential consumer (the
//! [`InboundPump`](crate::pump::InboundPump)) in arrival order. All of them
//! share the pending table behind one mutex that is never held across an
//! `.await`.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use metrics::{counter, gauge};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, info_span, warn};
use twsbridge_core::{
    CancelAck, ConnectionError, EventKind, IbError, InboundEvent, InteractionShape,
    OperationDescriptor, OperationRegistry, OutboundRequest, Params, Reply, RequestId, Value,
};

use crate::config::EngineConfig;
use crate::error::{DispatchError, OperationError};
use crate::handle::{Delivery, OperationHandle, OperationId};
use crate::pending::{OperationState, PendingOperation, PendingSnapshot, PendingTable};
use crate::transport::{Transport, TransportEvent};

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    registry: Arc<OperationRegistry>,
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    table: Mutex<PendingTable>,
    next_operation: AtomicU64,
    next_identifier: AtomicI64,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        registry: Arc<OperationRegistry>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> Self {
        let first = config.first_request_id;
        Self {
            registry,
            transport,
            config,
            table: Mutex::new(PendingTable::new()),
            next_operation: AtomicU64::new(1),
            next_identifier: AtomicI64::new(first),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OperationRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bounded channel for the transport reader, sized by
    /// [`EngineConfig::inbound_channel_capacity`].
    #[must_use]
    pub fn inbound_channel(&self) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
        crate::transport::inbound_channel(self.config.inbound_channel_capacity)
    }

    /// Starts the operation registered under `key`.
    ///
    /// The pending record is in the table before the request is sent, so a
    /// reply that races the send is still correlated. Fire-and-forget
    /// operations are sent and return an already-completed handle.
    /// Unsolicited streams register a listener and send nothing.
    ///
    /// # Errors
    ///
    /// - `UnknownOperation` if `key` is not registered
    /// - `OperationAlreadyActive` if an identifier-less operation of the same
    ///   descriptor is outstanding and its handle is still held
    /// - `Connection` if the dispatcher is closed or the send fails
    pub async fn start(&self, key: &str, params: Params) -> Result<OperationHandle, DispatchError> {
        let descriptor = self
            .registry
            .get(key)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownOperation {
                key: key.to_string(),
            })?;
        let name = descriptor.name();
        let id = OperationId(self.next_operation.fetch_add(1, Ordering::Relaxed));

        if descriptor.shape() == InteractionShape::FireAndForget {
            return self.fire(&descriptor, id, params).await;
        }

        let is_subscription = descriptor.resolve_subscription(&params);
        let (tx, rx) = mpsc::unbounded_channel();
        let identifier = {
            let mut table = self.table.lock();
            if table.is_closed() {
                return Err(closed().into());
            }
            if let Some(existing) = table.outstanding(name).filter(|_| !descriptor.uses_identifier()) {
                if table
                    .get(existing)
                    .is_some_and(|op| op.is_subscription && op.is_abandoned())
                {
                    abandon(&mut table, existing);
                } else {
                    return Err(DispatchError::OperationAlreadyActive {
                        key: name.to_string(),
                    });
                }
            }
            let identifier = descriptor.uses_identifier().then(|| self.allocate_identifier());
            table.insert(PendingOperation::new(
                id,
                identifier,
                Arc::clone(&descriptor),
                is_subscription,
                tx,
            ));
            record_active(table.len());
            identifier
        };
        // The replaced stream's cancel goes out before the new request.
        self.flush_cancels().await;

        if let Some(action) = descriptor.request_action() {
            let request = OutboundRequest {
                action,
                identifier,
                params,
            };
            if let Err(err) = self.transport.send(request).await {
                self.discard(id);
                warn!(operation = name, error = %err, "request send failed");
                return Err(err.into());
            }
        }

        counter!("twsbridge_operations_started_total", "operation" => name).increment(1);
        debug!(operation = name, %id, ?identifier, is_subscription, "operation started");
        Ok(OperationHandle::new(id, name, identifier, is_subscription, rx))
    }

    async fn fire(
        &self,
        descriptor: &OperationDescriptor,
        id: OperationId,
        params: Params,
    ) -> Result<OperationHandle, DispatchError> {
        if self.is_closed() {
            return Err(closed().into());
        }
        let name = descriptor.name();
        let identifier = descriptor.uses_identifier().then(|| self.allocate_identifier());
        if let Some(action) = descriptor.request_action() {
            self.transport
                .send(OutboundRequest {
                    action,
                    identifier,
                    params,
                })
                .await?;
        }
        counter!("twsbridge_operations_started_total", "operation" => name).increment(1);
        debug!(operation = name, %id, ?identifier, "fire-and-forget sent");
        Ok(OperationHandle::completed(id, name, identifier))
    }

    /// Requests cancellation of the operation behind `handle`.
    ///
    /// Idempotent: an operation that already terminated, or whose cancel is
    /// already in flight, is left alone and nothing is sent. Unsolicited
    /// streams are retired locally. Otherwise the cancel action is sent, and
    /// the operation retires at once or when the vendor confirms, depending on
    /// the descriptor's [`CancelAck`].
    ///
    /// # Errors
    ///
    /// - `NotCancellable` if the descriptor has no cancel action
    /// - `Connection` if the send fails; the operation stays `Active`
    pub async fn cancel(&self, handle: &OperationHandle) -> Result<(), DispatchError> {
        let id = handle.id();
        let (name, action, identifier, ack) = {
            let mut table = self.table.lock();
            let Some(op) = table.get_mut(id) else {
                return Ok(());
            };
            if op.state == OperationState::Cancelling {
                return Ok(());
            }
            let descriptor = Arc::clone(&op.descriptor);
            if descriptor.request_action().is_none() {
                if let Some(op) = table.remove(id) {
                    op.deliver(Delivery::Completed);
                    record_retired("cancelled");
                }
                record_active(table.len());
                return Ok(());
            }
            let Some(action) = descriptor.cancel_action() else {
                return Err(DispatchError::NotCancellable {
                    key: descriptor.name().to_string(),
                });
            };
            op.state = OperationState::Cancelling;
            (
                descriptor.name(),
                action,
                op.identifier,
                descriptor.cancel_acknowledgement(),
            )
        };

        let request = OutboundRequest {
            action,
            identifier,
            params: Params::new(),
        };
        if let Err(err) = self.transport.send(request).await {
            self.revert_cancel(id);
            warn!(operation = name, %id, error = %err, "cancel send failed");
            return Err(err.into());
        }

        match ack {
            CancelAck::Immediate => self.retire(id, Delivery::Completed, "cancelled"),
            CancelAck::AwaitTerminal => {
                debug!(operation = name, %id, ?identifier, "cancel sent, awaiting confirmation");
            }
        }
        Ok(())
    }

    /// Routes one inbound event to at most one pending operation, or for an
    /// unaddressed error, to every active one.
    pub fn route(&self, event: InboundEvent) {
        let identifier = event.request_id();
        let span = info_span!("route", ?identifier);
        let _enter = span.enter();
        counter!("twsbridge_events_routed_total").increment(1);

        match event {
            InboundEvent::Error { error, .. } => self.route_error(identifier, error),
            InboundEvent::Reply {
                kind,
                payload,
                done,
                ..
            } => self.route_reply(identifier, kind, payload, done),
        }
    }

    fn route_error(&self, identifier: Option<RequestId>, error: IbError) {
        let Some(identifier) = identifier else {
            if self.config.informational_codes.contains(&error.code) {
                info!(code = error.code, reason = %error.reason, "gateway notice");
            } else {
                self.broadcast_error(&error);
            }
            return;
        };

        let mut table = self.table.lock();
        let retired = table.by_identifier(identifier).and_then(|id| table.remove(id));
        record_active(table.len());
        drop(table);

        match retired {
            Some(op) if op.state == OperationState::Cancelling => {
                debug!(operation = op.descriptor.name(), %identifier, code = error.code, "cancel confirmed");
                op.deliver(Delivery::Completed);
                record_retired("cancelled");
            }
            Some(op) => {
                debug!(operation = op.descriptor.name(), %identifier, code = error.code, "operation failed");
                op.deliver(Delivery::Failed(OperationError::Ib(error)));
                record_retired("failed");
            }
            None => {
                debug!(%identifier, code = error.code, reason = %error.reason, "error for unknown identifier dropped");
                counter!("twsbridge_events_dropped_total").increment(1);
            }
        }
    }

    fn broadcast_error(&self, error: &IbError) {
        let mut table = self.table.lock();
        let retired: Vec<_> = table
            .ids_in_state(OperationState::Active)
            .into_iter()
            .filter_map(|id| table.remove(id))
            .collect();
        record_active(table.len());
        drop(table);

        warn!(code = error.code, reason = %error.reason, affected = retired.len(), "unaddressed gateway error");
        for op in retired {
            op.deliver(Delivery::Failed(OperationError::Ib(error.clone())));
            record_retired("failed");
        }
    }

    fn route_reply(&self, identifier: Option<RequestId>, kind: EventKind, payload: Value, done: bool) {
        let mut table = self.table.lock();
        let Some(id) = self.resolve_target(&table, identifier, kind) else {
            drop(table);
            debug!(%kind, ?identifier, "no pending operation for event, dropped");
            counter!("twsbridge_events_dropped_total").increment(1);
            return;
        };
        let Some(op) = table.get_mut(id) else {
            return;
        };

        let descriptor = Arc::clone(&op.descriptor);
        let cancelling = op.state == OperationState::Cancelling;
        let is_subscription = op.is_subscription;
        let reply = Reply { kind, payload };
        let mut delivered = true;

        let finished = if descriptor.terminator_action() == Some(kind) {
            if is_subscription && !cancelling {
                // Informational for subscriptions: the stream goes on.
                delivered = op.deliver(Delivery::Reply(reply));
                false
            } else {
                true
            }
        } else {
            delivered = op.forward(reply);
            let marked_last = descriptor.has_done_flag() && done;
            if is_subscription {
                cancelling && marked_last
            } else {
                marked_last || (descriptor.terminator_action().is_none() && !descriptor.has_done_flag())
            }
        };

        if finished {
            if let Some(op) = table.remove(id) {
                op.deliver(Delivery::Completed);
                record_retired(if cancelling { "cancelled" } else { "completed" });
            }
            record_active(table.len());
        } else if is_subscription && !delivered {
            abandon(&mut table, id);
        }
    }

    /// Sends the cancels owed for subscriptions whose handles were dropped.
    /// The inbound pump calls this after every routed event.
    pub async fn flush_cancels(&self) {
        let cancels = self.table.lock().take_cancels();
        for request in cancels {
            let (action, identifier) = (request.action, request.identifier);
            match self.transport.send(request).await {
                Ok(()) => debug!(%action, ?identifier, "abandoned subscription cancelled"),
                Err(err) => {
                    warn!(%action, ?identifier, error = %err, "abandoned subscription cancel failed");
                }
            }
        }
    }

    /// By identifier first (the operation must claim the kind), then by the
    /// identifier-less descriptor that owns the kind.
    fn resolve_target(
        &self,
        table: &PendingTable,
        identifier: Option<RequestId>,
        kind: EventKind,
    ) -> Option<OperationId> {
        identifier
            .and_then(|identifier| table.by_identifier(identifier))
            .filter(|id| table.get(*id).is_some_and(|op| op.descriptor.claims(kind)))
            .or_else(|| {
                let descriptor = self.registry.uncorrelated_for(kind)?;
                table.outstanding(descriptor.name())
            })
    }

    /// Fails every pending operation with `error` and closes the dispatcher
    /// until [`reopen`](Self::reopen).
    pub fn connection_lost(&self, error: ConnectionError) {
        let drained = {
            let mut table = self.table.lock();
            table.set_closed(true);
            table.drain_all()
        };
        record_active(0);

        warn!(reason = %error.message, failed = drained.len(), "connection lost");
        for op in drained {
            op.deliver(Delivery::Failed(OperationError::Connection(error.clone())));
            record_retired("disconnected");
        }
    }

    /// Accepts new operations again after the connection was re-established.
    pub fn reopen(&self) {
        self.table.lock().set_closed(false);
        info!("dispatcher reopened");
    }

    /// Raises the next identifier to at least `floor`.
    ///
    /// Order ids share the identifier space and must not go below the
    /// vendor's `nextValidId`.
    pub fn advance_identifiers(&self, floor: i64) {
        self.next_identifier.fetch_max(floor, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.table.lock().is_closed()
    }

    /// Live operations, ascending by id.
    #[must_use]
    pub fn active_operations(&self) -> Vec<PendingSnapshot> {
        self.table.lock().snapshots()
    }

    fn allocate_identifier(&self) -> RequestId {
        RequestId(self.next_identifier.fetch_add(1, Ordering::Relaxed))
    }

    fn retire(&self, id: OperationId, delivery: Delivery, outcome: &'static str) {
        let mut table = self.table.lock();
        if let Some(op) = table.remove(id) {
            op.deliver(delivery);
            record_retired(outcome);
        }
        record_active(table.len());
    }

    /// Drops a record whose request never reached the transport.
    fn discard(&self, id: OperationId) {
        let mut table = self.table.lock();
        table.remove(id);
        record_active(table.len());
    }

    fn revert_cancel(&self, id: OperationId) {
        if let Some(op) = self.table.lock().get_mut(id) {
            op.state = OperationState::Active;
        }
    }
}

fn closed() -> ConnectionError {
    ConnectionError::new("dispatcher is closed")
}

/// Retires a subscription whose handle was dropped. Its cancel is queued for
/// [`Dispatcher::flush_cancels`] unless one was already sent.
fn abandon(table: &mut PendingTable, id: OperationId) {
    let Some(op) = table.remove(id) else {
        return;
    };
    let descriptor = &op.descriptor;
    if op.state == OperationState::Active && descriptor.request_action().is_some() {
        if let Some(action) = descriptor.cancel_action() {
            table.queue_cancel(OutboundRequest {
                action,
                identifier: op.identifier,
                params: Params::new(),
            });
        }
    }
    debug!(operation = descriptor.name(), id = %op.id, "result handle dropped, operation abandoned");
    record_retired("abandoned");
    record_active(table.len());
}

fn record_retired(outcome: &'static str) {
    counter!("twsbridge_operations_retired_total", "outcome" => outcome).increment(1);
}

#[allow(clippy::cast_precision_loss)]
fn record_active(len: usize) {
    gauge!("twsbridge_operations_active").set(len as f64);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
