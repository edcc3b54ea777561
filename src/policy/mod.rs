//! Block policy for device-admin operations.
//! The table is compiled in; nothing here is learned at runtime.

mod audit;
pub mod engine;
mod table;
mod types;

pub use audit::{AuditEvent, AuditSink, JsonlAuditSink, TracingAuditSink};
pub use engine::{BlockOutcome, EnforcementInterceptor, InterceptionEngine};
pub use table::PolicyTable;
pub use types::{
    OperationName, OverloadDescriptor, ParamKind, PolicyEntry, ReturnKind, TypedValue,
};
