//! Overload resolution, hook installation and the per-call protocol.

pub mod lifecycle;
pub mod protocol;
pub mod resolver;

pub use lifecycle::{HookHandle, HookLifecycle, InstallCause, InstallError, InstallReport};
pub use protocol::{dispatch, HookEvent, InvocationContext, InvocationPhase, Interceptor};
pub use resolver::OverloadResolver;
