use super::{AlertingSink, AmbientContextProvider, HostContext, Notification, SinkError};
use tracing::{debug, warn};

/// Sink that surfaces alerts through the log. Used when the host offers no
/// notification surface of its own.
pub struct LogAlertSink;

impl AlertingSink for LogAlertSink {
    fn notify(&self, context: &HostContext, notification: &Notification) -> Result<(), SinkError> {
        warn!(
            target: "admin_guard::alert",
            id = notification.id,
            channel = %notification.channel_id,
            context = context.source(),
            "{}: {}",
            notification.title,
            notification.text
        );
        Ok(())
    }
}

/// Always hands out the same context.
pub struct StaticContextProvider {
    context: HostContext,
}

impl StaticContextProvider {
    pub fn new(context: HostContext) -> Self {
        Self { context }
    }
}

impl AmbientContextProvider for StaticContextProvider {
    fn try_get_context(&self) -> Result<HostContext, SinkError> {
        Ok(self.context.clone())
    }
}

/// Provider for hosts with no reachable context at all.
pub struct UnavailableContext;

impl AmbientContextProvider for UnavailableContext {
    fn try_get_context(&self) -> Result<HostContext, SinkError> {
        Err(SinkError::ContextUnavailable("no provider configured".to_string()))
    }
}

/// Tries each provider in order and returns the first context found, so a
/// host can register its primary lookup followed by older fallbacks.
#[derive(Default)]
pub struct ChainedContextProvider {
    providers: Vec<Box<dyn AmbientContextProvider>>,
}

impl ChainedContextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, provider: Box<dyn AmbientContextProvider>) -> Self {
        self.providers.push(provider);
        self
    }
}

impl AmbientContextProvider for ChainedContextProvider {
    fn try_get_context(&self) -> Result<HostContext, SinkError> {
        let mut last_error = None;
        for (index, provider) in self.providers.iter().enumerate() {
            match provider.try_get_context() {
                Ok(context) => return Ok(context),
                Err(e) => {
                    debug!("Context provider #{} unavailable: {}", index, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| {
            SinkError::ContextUnavailable("no context providers registered".to_string())
        }))
    }
}
