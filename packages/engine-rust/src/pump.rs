//! Inbound pump: the single sequential consumer of transport events.
//!
//! Spawns a tokio task that:
//! 1. Receives [`TransportEvent`]s from the transport reader's channel
//! 2. Routes each inbound event through the dispatcher, in arrival order,
//!    then sends any cancels owed for abandoned subscriptions
//! 3. Fails every pending operation when the connection closes
//! 4. Exits on [`InboundPump::stop`] or when the channel ends

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use twsbridge_core::ConnectionError;

use crate::dispatcher::Dispatcher;
use crate::transport::TransportEvent;

pub struct InboundPump {
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl InboundPump {
    /// Starts consuming `rx` on a new task.
    ///
    /// A `Closed` event fails pending operations and leaves the pump running,
    /// so a reconnecting reader can keep using the same channel once the
    /// dispatcher is reopened. The end of the channel is treated as a final
    /// close.
    #[must_use]
    pub fn start(dispatcher: Arc<Dispatcher>, mut rx: mpsc::Receiver<TransportEvent>) -> Self {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = rx.recv() => {
                        match event {
                            Some(TransportEvent::Event(event)) => {
                                dispatcher.route(event);
                                dispatcher.flush_cancels().await;
                            }
                            Some(TransportEvent::Closed { reason }) => {
                                dispatcher.connection_lost(ConnectionError::new(reason));
                            }
                            None => {
                                if !dispatcher.is_closed() {
                                    dispatcher.connection_lost(ConnectionError::new("inbound stream ended"));
                                }
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => {
                        debug!("inbound pump shutdown requested");
                        break;
                    }
                }
            }
            info!("inbound pump stopped");
        });

        Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Whether the consumer task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the pump and waits for the task to finish. Events still queued
    /// in the channel are not routed.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
