//! Activation gate.
//!
//! Reacts to the host's "component loaded" events. When the configured
//! target shows up, every enforced operation is resolved and hooked, each
//! independently of the others. Activation happens at most once.

use crate::hooks::{HookHandle, HookLifecycle, InstallError, OverloadResolver};
use crate::host::{HostRuntime, RuntimeError};
use crate::policy::{InterceptionEngine, OperationName};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    #[error("Failed to list operations of {component}: {source}")]
    Catalog {
        component: String,
        source: RuntimeError,
    },

    #[error("Error setting hooks: {0}")]
    Panicked(String),
}

#[derive(Debug, Clone)]
pub struct OperationReport {
    pub operation: OperationName,
    pub resolved: usize,
    pub installed: Vec<HookHandle>,
    pub failed: Vec<InstallError>,
}

#[derive(Debug, Clone)]
pub enum ActivationReport {
    /// Not the target component.
    Ignored,
    /// Target seen again after activation already ran.
    AlreadyActivated,
    Activated(Vec<OperationReport>),
    Failed(ActivationError),
}

impl ActivationReport {
    pub fn hooks_installed(&self) -> usize {
        match self {
            ActivationReport::Activated(reports) => {
                reports.iter().map(|r| r.installed.len()).sum()
            }
            _ => 0,
        }
    }
}

pub struct ActivationGate {
    target_identity: String,
    target_component: String,
    enforced: Vec<OperationName>,
    runtime: Arc<dyn HostRuntime>,
    engine: Arc<InterceptionEngine>,
    lifecycle: HookLifecycle,
    activated: bool,
}

impl ActivationGate {
    pub fn new(
        target_identity: impl Into<String>,
        target_component: impl Into<String>,
        enforced: Vec<OperationName>,
        runtime: Arc<dyn HostRuntime>,
        engine: Arc<InterceptionEngine>,
    ) -> Self {
        Self {
            target_identity: target_identity.into(),
            target_component: target_component.into(),
            enforced,
            runtime,
            engine,
            lifecycle: HookLifecycle::new(),
            activated: false,
        }
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn lifecycle(&self) -> &HookLifecycle {
        &self.lifecycle
    }

    pub fn on_component_loaded(&mut self, identity: &str) -> ActivationReport {
        debug!("Component loaded: {}", identity);

        if identity != self.target_identity {
            return ActivationReport::Ignored;
        }
        if self.activated {
            info!("{} loaded again; hooks already attempted", identity);
            return ActivationReport::AlreadyActivated;
        }
        self.activated = true;

        info!("Target {} loaded, installing hooks on {}", identity, self.target_component);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.install_hooks()));

        let report = match outcome {
            Ok(Ok(reports)) => ActivationReport::Activated(reports),
            Ok(Err(e)) => ActivationReport::Failed(e),
            Err(payload) => ActivationReport::Failed(ActivationError::Panicked(panic_message(
                payload.as_ref(),
            ))),
        };

        match &report {
            ActivationReport::Failed(e) => error!("{}", e),
            _ => info!(
                "Activation finished: {} hook(s) installed",
                report.hooks_installed()
            ),
        }
        report
    }

    fn install_hooks(&mut self) -> Result<Vec<OperationReport>, ActivationError> {
        let catalog = self
            .runtime
            .list_operations(&self.target_component)
            .map_err(|source| ActivationError::Catalog {
                component: self.target_component.clone(),
                source,
            })?;

        let mut reports = Vec::with_capacity(self.enforced.len());
        for &operation in &self.enforced {
            let overloads = OverloadResolver::resolve(operation.as_str(), &catalog);
            if overloads.is_empty() && operation.is_optional() {
                info!("{} is not available on this runtime version", operation);
            }

            let engine = &self.engine;
            let install = self.lifecycle.install_all(self.runtime.as_ref(), &overloads, |_| {
                engine.interceptor_for(operation)
            });

            reports.push(OperationReport {
                operation,
                resolved: overloads.len(),
                installed: install.installed,
                failed: install.failed,
            });
        }
        Ok(reports)
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
