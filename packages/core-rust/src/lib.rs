//! twsbridge core: vendor action vocabulary, operation descriptors, the
//! validated registry, and coverage verification.

pub mod action;
pub mod catalog;
pub mod coverage;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod registry;
pub mod types;

pub use action::{vendor_surface, Action, EventKind, RequestAction, UnknownAction};
pub use coverage::{verify_coverage, CoverageConfig, CoverageReport};
pub use descriptor::{CancelAck, InteractionShape, OperationDescriptor, OperationSummary, SubscriptionFlag};
pub use error::{ConnectionError, IbError, ValidationError};
pub use event::{InboundEvent, OutboundRequest, Reply, RequestId, NO_IDENTIFIER};
pub use registry::OperationRegistry;
pub use types::{Params, Value};
