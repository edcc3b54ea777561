//! Capabilities supplied by the host process.
//!
//! The guard never reaches into the host directly. Reflection, context
//! discovery and alert presentation all come in through the traits below so
//! the core can be driven by a real host adapter or by [`InProcessRuntime`].

mod alerts;
pub mod in_process;

pub use alerts::{ChainedContextProvider, LogAlertSink, StaticContextProvider, UnavailableContext};
pub use in_process::InProcessRuntime;

use crate::hooks::{HookHandle, Interceptor};
use crate::policy::OverloadDescriptor;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Component not loaded: {0}")]
    ComponentNotFound(String),

    #[error("Overload not found: {0}")]
    OverloadNotFound(String),

    #[error("Failed to deoptimize {0}: {1}")]
    Deoptimize(String, String),

    #[error("Failed to bind hook on {0}: {1}")]
    Bind(String, String),

    #[error("Overload already hooked: {0}")]
    AlreadyHooked(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("No host context available: {0}")]
    ContextUnavailable(String),

    #[error("Failed to create notification channel {0}: {1}")]
    Channel(String, String),

    #[error("Failed to post notification: {0}")]
    Delivery(String),
}

// ============================================================================
// Reflection capability
// ============================================================================

/// Reflection-equivalent access to the monitored component.
pub trait HostRuntime: Send + Sync {
    /// Every operation the component exposes, all overloads included.
    fn list_operations(&self, component: &str) -> Result<Vec<OverloadDescriptor>, RuntimeError>;

    /// Moves the overload off any compiled/inlined path so a bound hook is
    /// guaranteed to run.
    fn force_interceptable(&self, descriptor: &OverloadDescriptor) -> Result<(), RuntimeError>;

    fn bind(
        &self,
        descriptor: &OverloadDescriptor,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<HookHandle, RuntimeError>;
}

// ============================================================================
// Context and alerting
// ============================================================================

/// Opaque live handle into the host, good enough to reach an alerting sink.
#[derive(Clone)]
pub struct HostContext {
    source: String,
    handle: Arc<dyn Any + Send + Sync>,
}

impl HostContext {
    pub fn new<T: Any + Send + Sync>(source: impl Into<String>, handle: T) -> Self {
        Self {
            source: source.into(),
            handle: Arc::new(handle),
        }
    }

    /// Which provider produced this context.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.handle.downcast_ref::<T>()
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

pub trait AmbientContextProvider: Send + Sync {
    /// Best-effort lookup. Unavailability is an ordinary `Err` value.
    fn try_get_context(&self) -> Result<HostContext, SinkError>;
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChannelImportance {
    Low,
    Default,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    pub id: String,
    pub name: String,
    pub importance: ChannelImportance,
}

impl Default for ChannelSpec {
    fn default() -> Self {
        Self {
            id: "admin_guard_channel".to_string(),
            name: "Admin Guard Notifications".to_string(),
            importance: ChannelImportance::High,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i32,
    pub channel_id: String,
    pub title: String,
    pub text: String,
    pub auto_cancel: bool,
}

pub trait AlertingSink: Send + Sync {
    /// Called before every post; implementations that have no channel
    /// concept keep the default.
    fn ensure_channel(&self, _context: &HostContext, _channel: &ChannelSpec) -> Result<(), SinkError> {
        Ok(())
    }

    fn notify(&self, context: &HostContext, notification: &Notification) -> Result<(), SinkError>;
}
