use super::protocol::Interceptor;
use crate::host::{HostRuntime, RuntimeError};
use crate::policy::{OverloadDescriptor, ReturnKind};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstallCause {
    #[error("{0}")]
    Deoptimize(RuntimeError),

    #[error("{0}")]
    Bind(RuntimeError),

    #[error("placeholder kind {placeholder} does not match declared return kind {declared}")]
    ReturnKindMismatch {
        declared: ReturnKind,
        placeholder: ReturnKind,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed hooking {descriptor}: {cause}")]
pub struct InstallError {
    pub descriptor: OverloadDescriptor,
    pub cause: InstallCause,
}

// ============================================================================
// Hook handles
// ============================================================================

/// Proof that an interceptor is bound to one overload. Lives for the rest of
/// the process.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HookHandle {
    pub id: Uuid,
    pub descriptor: OverloadDescriptor,
    pub installed_at: String,
}

impl HookHandle {
    pub fn new(descriptor: OverloadDescriptor) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            installed_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Outcome of installing one operation's overload set.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub installed: Vec<HookHandle>,
    pub failed: Vec<InstallError>,
}

impl InstallReport {
    pub fn attempted(&self) -> usize {
        self.installed.len() + self.failed.len()
    }
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Installs interceptors and owns every handle that came out of it.
#[derive(Debug, Default)]
pub struct HookLifecycle {
    handles: Vec<HookHandle>,
    failures: Vec<InstallError>,
}

impl HookLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handles(&self) -> &[HookHandle] {
        &self.handles
    }

    pub fn failures(&self) -> &[InstallError] {
        &self.failures
    }

    /// Hooks a single overload. A failure is recorded and returned but never
    /// affects other overloads.
    pub fn install<F>(
        &mut self,
        runtime: &dyn HostRuntime,
        descriptor: &OverloadDescriptor,
        factory: F,
    ) -> Result<HookHandle, InstallError>
    where
        F: FnOnce(&OverloadDescriptor) -> Arc<dyn Interceptor>,
    {
        match Self::try_install(runtime, descriptor, factory) {
            Ok(handle) => {
                info!("Hooked {}", descriptor);
                self.handles.push(handle.clone());
                Ok(handle)
            }
            Err(e) => {
                warn!("{}", e);
                self.failures.push(e.clone());
                Err(e)
            }
        }
    }

    /// Hooks every overload in `descriptors` independently.
    pub fn install_all<F>(
        &mut self,
        runtime: &dyn HostRuntime,
        descriptors: &[OverloadDescriptor],
        factory: F,
    ) -> InstallReport
    where
        F: Fn(&OverloadDescriptor) -> Arc<dyn Interceptor>,
    {
        let mut report = InstallReport::default();
        for descriptor in descriptors {
            match self.install(runtime, descriptor, &factory) {
                Ok(handle) => report.installed.push(handle),
                Err(e) => report.failed.push(e),
            }
        }
        report
    }

    fn try_install<F>(
        runtime: &dyn HostRuntime,
        descriptor: &OverloadDescriptor,
        factory: F,
    ) -> Result<HookHandle, InstallError>
    where
        F: FnOnce(&OverloadDescriptor) -> Arc<dyn Interceptor>,
    {
        let fail = |cause| InstallError {
            descriptor: descriptor.clone(),
            cause,
        };

        let interceptor = factory(descriptor);
        if let Some(placeholder) = interceptor.placeholder_kind() {
            if placeholder != descriptor.returns {
                return Err(fail(InstallCause::ReturnKindMismatch {
                    declared: descriptor.returns,
                    placeholder,
                }));
            }
        }

        runtime
            .force_interceptable(descriptor)
            .map_err(|e| fail(InstallCause::Deoptimize(e)))?;

        runtime
            .bind(descriptor, interceptor)
            .map_err(|e| fail(InstallCause::Bind(e)))
    }
}
