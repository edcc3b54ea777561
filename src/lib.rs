//! Admin Guard Library
//!
//! Intercepts a fixed set of device-admin operations (lock, wipe, password
//! reset) on a third-party component, returns a type-correct placeholder
//! instead of running them, and alerts the operator.

pub mod activation;
pub mod config;
pub mod guard;
pub mod hooks;
pub mod host;
pub mod logging;
pub mod policy;

pub use activation::{ActivationError, ActivationGate, ActivationReport, OperationReport};
pub use config::{ConfigError, GuardConfig, LogConfig};
pub use guard::Guard;
pub use logging::init_logging;
