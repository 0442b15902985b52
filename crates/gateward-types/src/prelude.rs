pub use crate::counter_store::{CounterStore, TenantResolver};
pub use crate::error::{Error, GwResult};
pub use crate::types::{TenantId, Timestamp};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
