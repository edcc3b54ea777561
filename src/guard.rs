//! Guard entry point.
//!
//! One `Guard` is created per host process. It wires the configuration,
//! the shared [`InterceptionEngine`] and the [`ActivationGate`] together and
//! forwards the host's load events.

use crate::activation::{ActivationGate, ActivationReport};
use crate::config::{ConfigError, GuardConfig};
use crate::hooks::HookHandle;
use crate::host::{AlertingSink, AmbientContextProvider, HostRuntime};
use crate::policy::InterceptionEngine;
use std::sync::Arc;
use tracing::info;

pub struct Guard {
    config: GuardConfig,
    engine: Arc<InterceptionEngine>,
    gate: ActivationGate,
}

impl Guard {
    fn new(
        process_name: &str,
        config: GuardConfig,
        runtime: Arc<dyn HostRuntime>,
        engine: InterceptionEngine,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!("Admin guard loaded in: {}", process_name);

        let engine = Arc::new(engine);
        let gate = ActivationGate::new(
            config.target_identity.clone(),
            config.target_component.clone(),
            config.enforced.clone(),
            runtime,
            engine.clone(),
        );
        Ok(Self {
            config,
            engine,
            gate,
        })
    }

    /// Builds the guard and its engine from `config`, so notification and
    /// audit settings always come from the same config the gate uses.
    pub fn with_collaborators(
        process_name: &str,
        config: GuardConfig,
        runtime: Arc<dyn HostRuntime>,
        context_provider: Box<dyn AmbientContextProvider>,
        alert_sink: Box<dyn AlertingSink>,
    ) -> Result<Self, ConfigError> {
        let engine = InterceptionEngine::from_config(&config, context_provider, alert_sink);
        Self::new(process_name, config, runtime, engine)
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<InterceptionEngine> {
        &self.engine
    }

    pub fn hooks(&self) -> &[HookHandle] {
        self.gate.lifecycle().handles()
    }

    pub fn on_component_loaded(&mut self, identity: &str) -> ActivationReport {
        info!("onComponentLoaded: {}", identity);
        self.gate.on_component_loaded(identity)
    }
}
