//! twsbridge engine: correlates requests and callback events over a single
//! gateway connection.
//!
//! A [`Dispatcher`] starts operations from the registry, an [`InboundPump`]
//! feeds it the transport's events in order, and each caller reads its own
//! results from an [`OperationHandle`].

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod logging;
pub mod pending;
pub mod pump;
pub mod transport;

pub use config::EngineConfig;
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, OperationError};
pub use handle::{OperationHandle, OperationId};
pub use logging::{init_tracing, LogConfig, LogFormat};
pub use pending::{OperationState, PendingSnapshot};
pub use pump::InboundPump;
pub use transport::{inbound_channel, ChannelTransport, Transport, TransportEvent};
