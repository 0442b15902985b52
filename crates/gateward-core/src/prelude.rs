pub use gateward_types::counter_store::{CounterStore, TenantResolver};
pub use gateward_types::error::{Error, GwResult};
pub use gateward_types::types::{TenantId, Timestamp};

pub use tracing::{debug, debug_span, error, error_span, info, info_span, warn, warn_span};

// vim: ts=4
