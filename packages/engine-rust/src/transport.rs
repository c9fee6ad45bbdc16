//! Seam between the engine and the physical gateway connection.
//!
//! The socket and wire codec live outside this crate. An adapter implements
//! [`Transport`] for the outbound half and feeds [`TransportEvent`]s into the
//! channel consumed by the [`InboundPump`](crate::pump::InboundPump).

use async_trait::async_trait;
use tokio::sync::mpsc;
use twsbridge_core::{ConnectionError, InboundEvent, OutboundRequest};

/// Outbound half of the gateway connection.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hands one request to the connection.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionError` when the connection cannot accept it.
    async fn send(&self, request: OutboundRequest) -> Result<(), ConnectionError>;
}

/// Inbound half: what the transport reader pushes, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    Event(InboundEvent),
    /// The connection dropped. Every pending operation fails with `reason`.
    Closed { reason: String },
}

impl From<InboundEvent> for TransportEvent {
    fn from(event: InboundEvent) -> Self {
        TransportEvent::Event(event)
    }
}

/// Bounded channel between the transport reader and the inbound pump.
#[must_use]
pub fn inbound_channel(
    capacity: usize,
) -> (mpsc::Sender<TransportEvent>, mpsc::Receiver<TransportEvent>) {
    mpsc::channel(capacity)
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// In-process transport that queues outbound requests on an mpsc channel.
///
/// A socket adapter drains the receiver and encodes each request onto the
/// wire. Tests drain it to assert on what was sent.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    outbound: mpsc::UnboundedSender<OutboundRequest>,
}

impl ChannelTransport {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundRequest>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        (Self { outbound }, rx)
    }

    /// Whether the receiving side is still attached.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.outbound.is_closed()
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn send(&self, request: OutboundRequest) -> Result<(), ConnectionError> {
        self.outbound
            .send(request)
            .map_err(|_| ConnectionError::new("outbound channel closed"))
    }
}

#[cfg(test)]
mod tests {
    use twsbridge_core::{EventKind, Params, RequestAction, RequestId};

    use super::*;

    fn request() -> OutboundRequest {
        OutboundRequest {
            action: RequestAction::ReqCurrentTime,
            identifier: None,
            params: Params::new(),
        }
    }

    #[tokio::test]
    async fn send_queues_requests_in_order() {
        let (transport, mut rx) = ChannelTransport::new();
        transport.send(request()).await.unwrap();
        transport
            .send(OutboundRequest {
                action: RequestAction::CancelMktData,
                identifier: Some(RequestId(4)),
                params: Params::new(),
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await.unwrap().action, RequestAction::ReqCurrentTime);
        assert_eq!(rx.recv().await.unwrap().identifier, Some(RequestId(4)));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_dropped() {
        let (transport, rx) = ChannelTransport::new();
        assert!(transport.is_connected());
        drop(rx);
        assert!(!transport.is_connected());

        let err = transport.send(request()).await.unwrap_err();
        assert_eq!(err, ConnectionError::new("outbound channel closed"));
    }

    #[tokio::test]
    async fn inbound_channel_carries_events() {
        let (tx, mut rx) = inbound_channel(4);
        tx.send(InboundEvent::reply(EventKind::CurrentTime, None, 1_i64).into())
            .await
            .unwrap();
        tx.send(TransportEvent::Closed {
            reason: "eof".to_string(),
        })
        .await
        .unwrap();

        assert!(matches!(rx.recv().await, Some(TransportEvent::Event(_))));
        assert!(matches!(rx.recv().await, Some(TransportEvent::Closed { .. })));
    }
}
