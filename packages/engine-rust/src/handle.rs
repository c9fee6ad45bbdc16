//! Caller-side view of one logical operation.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use serde::Serialize;
use tokio::sync::mpsc;
use twsbridge_core::{Reply, RequestId};

use crate::error::OperationError;

/// Engine-local identity of an operation, independent of the vendor
/// identifier (which identifier-less operations do not have).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OperationId(pub u64);

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// What the dispatcher pushes into a result sink.
#[derive(Debug)]
pub(crate) enum Delivery {
    Reply(Reply),
    Completed,
    Failed(OperationError),
}

/// Receives the results of one operation.
///
/// Yields replies in arrival order, then exactly one terminal signal: a
/// clean end (`None`) or an error (`Some(Err(..))` followed by `None`).
#[derive(Debug)]
pub struct OperationHandle {
    id: OperationId,
    key: &'static str,
    identifier: Option<RequestId>,
    is_subscription: bool,
    rx: mpsc::UnboundedReceiver<Delivery>,
    finished: bool,
}

impl OperationHandle {
    pub(crate) fn new(
        id: OperationId,
        key: &'static str,
        identifier: Option<RequestId>,
        is_subscription: bool,
        rx: mpsc::UnboundedReceiver<Delivery>,
    ) -> Self {
        Self {
            id,
            key,
            identifier,
            is_subscription,
            rx,
            finished: false,
        }
    }

    /// A handle whose operation completed the moment it was sent.
    pub(crate) fn completed(id: OperationId, key: &'static str, identifier: Option<RequestId>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(Delivery::Completed);
        Self::new(id, key, identifier, false, rx)
    }

    #[must_use]
    pub fn id(&self) -> OperationId {
        self.id
    }

    /// The registry key the operation was started with.
    #[must_use]
    pub fn key(&self) -> &'static str {
        self.key
    }

    #[must_use]
    pub fn identifier(&self) -> Option<RequestId> {
        self.identifier
    }

    #[must_use]
    pub fn is_subscription(&self) -> bool {
        self.is_subscription
    }

    /// Whether the terminal signal has been observed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next result, or `None` once the operation has terminated.
    pub async fn next(&mut self) -> Option<Result<Reply, OperationError>> {
        if self.finished {
            return None;
        }
        let delivery = self.rx.recv().await;
        self.settle(delivery)
    }

    /// Drains a one-shot operation into its full result list.
    ///
    /// # Errors
    ///
    /// Returns the operation's terminal error; replies received before it are
    /// discarded.
    pub async fn collect(mut self) -> Result<Vec<Reply>, OperationError> {
        let mut replies = Vec::new();
        while let Some(item) = self.next().await {
            replies.push(item?);
        }
        Ok(replies)
    }

    fn settle(&mut self, delivery: Option<Delivery>) -> Option<Result<Reply, OperationError>> {
        match delivery {
            Some(Delivery::Reply(reply)) => Some(Ok(reply)),
            Some(Delivery::Failed(err)) => {
                self.finished = true;
                Some(Err(err))
            }
            // Sender dropped without a terminal signal only when the
            // dispatcher itself is gone.
            Some(Delivery::Completed) | None => {
                self.finished = true;
                None
            }
        }
    }
}

impl Stream for OperationHandle {
    type Item = Result<Reply, OperationError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(delivery) => Poll::Ready(this.settle(delivery)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use twsbridge_core::{EventKind, IbError, Value};

    use super::*;

    fn reply(n: i64) -> Reply {
        Reply {
            kind: EventKind::HistoricalData,
            payload: Value::Int(n),
        }
    }

    fn open() -> (mpsc::UnboundedSender<Delivery>, OperationHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = OperationHandle::new(OperationId(1), "reqHistoricalData", Some(RequestId(9)), false, rx);
        (tx, handle)
    }

    #[tokio::test]
    async fn yields_replies_then_ends() {
        let (tx, mut handle) = open();
        tx.send(Delivery::Reply(reply(1))).unwrap();
        tx.send(Delivery::Reply(reply(2))).unwrap();
        tx.send(Delivery::Completed).unwrap();

        assert_eq!(handle.next().await.unwrap().unwrap(), reply(1));
        assert_eq!(handle.next().await.unwrap().unwrap(), reply(2));
        assert!(handle.next().await.is_none());
        assert!(handle.is_finished());
        // Stays terminated.
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn error_is_terminal() {
        let (tx, mut handle) = open();
        tx.send(Delivery::Failed(IbError::new("pacing violation", 162).into()))
            .unwrap();
        // Anything after the terminal signal is never observed.
        tx.send(Delivery::Reply(reply(3))).unwrap();

        let err = handle.next().await.unwrap().unwrap_err();
        assert_eq!(err, OperationError::Ib(IbError::new("pacing violation", 162)));
        assert!(handle.next().await.is_none());
    }

    #[tokio::test]
    async fn collect_gathers_one_shot_results() {
        let (tx, handle) = open();
        tx.send(Delivery::Reply(reply(1))).unwrap();
        tx.send(Delivery::Completed).unwrap();
        assert_eq!(handle.collect().await.unwrap(), vec![reply(1)]);
    }

    #[tokio::test]
    async fn completed_handle_ends_immediately() {
        let handle = OperationHandle::completed(OperationId(4), "reqGlobalCancel", None);
        assert!(handle.collect().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn stream_impl_matches_next() {
        let (tx, handle) = open();
        tx.send(Delivery::Reply(reply(7))).unwrap();
        tx.send(Delivery::Completed).unwrap();

        let items: Vec<_> = StreamExt::collect(handle).await;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].as_ref().unwrap(), &reply(7));
    }
}
