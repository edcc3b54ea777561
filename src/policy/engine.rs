use super::audit::{AuditEvent, AuditSink, TracingAuditSink};
use super::table::PolicyTable;
use super::types::{OperationName, PolicyEntry};
use crate::config::GuardConfig;
use crate::hooks::{Interceptor, InvocationContext};
use crate::host::{AlertingSink, AmbientContextProvider, ChannelSpec, Notification, SinkError};
use crate::policy::ReturnKind;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, trace, warn};

pub const DEFAULT_NOTIFICATION_ID_BASE: i32 = 1234;

/// Result of enforcing one intercepted call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOutcome {
    pub operation: OperationName,
    pub notification_id: i32,
    pub notified: bool,
}

/// Decides intercepted calls and tells the operator about them.
///
/// One engine is shared by every installed interceptor.
pub struct InterceptionEngine {
    policy: &'static PolicyTable,
    context_provider: Box<dyn AmbientContextProvider>,
    alert_sink: Box<dyn AlertingSink>,
    audit_sink: Mutex<Box<dyn AuditSink>>,
    channel: ChannelSpec,
    notification_id_base: i32,
}

impl InterceptionEngine {
    pub fn new(
        context_provider: Box<dyn AmbientContextProvider>,
        alert_sink: Box<dyn AlertingSink>,
    ) -> Self {
        Self {
            policy: PolicyTable::global(),
            context_provider,
            alert_sink,
            audit_sink: Mutex::new(Box::new(TracingAuditSink)),
            channel: ChannelSpec::default(),
            notification_id_base: DEFAULT_NOTIFICATION_ID_BASE,
        }
    }

    /// Engine with the notification settings and audit trail from `config`.
    pub fn from_config(
        config: &GuardConfig,
        context_provider: Box<dyn AmbientContextProvider>,
        alert_sink: Box<dyn AlertingSink>,
    ) -> Self {
        let engine = Self::new(context_provider, alert_sink)
            .with_channel(config.channel.clone())
            .with_notification_id_base(config.notification_id_base);
        match &config.audit_log {
            Some(path) => engine.with_audit_sink(Box::new(super::audit::JsonlAuditSink::new(
                path.clone(),
            ))),
            None => engine,
        }
    }

    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit_sink = Mutex::new(sink);
        self
    }

    pub fn with_channel(mut self, channel: ChannelSpec) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_notification_id_base(mut self, base: i32) -> Self {
        self.notification_id_base = base;
        self
    }

    pub fn channel(&self) -> &ChannelSpec {
        &self.channel
    }

    pub fn policy(&self, operation: OperationName) -> &PolicyEntry {
        self.policy.lookup(operation)
    }

    /// Wraps on overflow; this runs inside the intercepted call.
    pub fn notification_id(&self, operation: OperationName) -> i32 {
        self.notification_id_base
            .wrapping_add(self.policy(operation).notification_offset)
    }

    /// Interceptor enforcing `operation`, bound to this engine.
    pub fn interceptor_for(self: &Arc<Self>, operation: OperationName) -> Arc<dyn Interceptor> {
        Arc::new(EnforcementInterceptor {
            engine: Arc::clone(self),
            operation,
        })
    }

    /// Blocks the call in `ctx`. The placeholder is committed before the
    /// operator is notified, so a failing sink cannot undo enforcement.
    pub fn decide(&self, operation: OperationName, ctx: &mut InvocationContext<'_>) -> BlockOutcome {
        let entry = self.policy(operation);
        ctx.return_and_skip(entry.placeholder.clone());

        let notification_id = self.notification_id(operation);
        let delivery = self.post_notification(entry, notification_id);
        if let Err(e) = &delivery {
            warn!("Not posting notification '{}': {}", entry.title, e);
        }

        info!("Blocked {} (placeholder {:?})", ctx.descriptor(), entry.placeholder);

        let outcome = BlockOutcome {
            operation,
            notification_id,
            notified: delivery.is_ok(),
        };
        self.audit(ctx, &outcome, delivery.err());
        outcome
    }

    fn post_notification(&self, entry: &PolicyEntry, id: i32) -> Result<(), SinkError> {
        let notification = Notification {
            id,
            channel_id: self.channel.id.clone(),
            title: entry.title.to_string(),
            text: entry.message.to_string(),
            auto_cancel: true,
        };

        // Sinks are host code; a panic there must not unwind into the caller.
        panic::catch_unwind(AssertUnwindSafe(|| {
            let context = self.context_provider.try_get_context()?;
            self.alert_sink.ensure_channel(&context, &self.channel)?;
            self.alert_sink.notify(&context, &notification)
        }))
        .unwrap_or_else(|_| Err(SinkError::Delivery("alerting sink panicked".to_string())))
    }

    fn audit(&self, ctx: &InvocationContext<'_>, outcome: &BlockOutcome, error: Option<SinkError>) {
        let event = AuditEvent::blocked(
            ctx.id(),
            outcome.operation,
            ctx.descriptor().signature(),
            outcome.notification_id,
            outcome.notified,
            error.map(|e| e.to_string()),
        );
        let written = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut sink = self.audit_sink.lock().unwrap_or_else(PoisonError::into_inner);
            sink.log(event)
        }));
        match written {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to write audit event: {}", e),
            Err(_) => warn!("Audit sink panicked; event dropped"),
        }
    }
}

/// Interceptor installed on every overload of one enforced operation.
pub struct EnforcementInterceptor {
    engine: Arc<InterceptionEngine>,
    operation: OperationName,
}

impl EnforcementInterceptor {
    pub fn operation(&self) -> OperationName {
        self.operation
    }
}

impl Interceptor for EnforcementInterceptor {
    fn on_before(&self, ctx: &mut InvocationContext<'_>) {
        debug!("Before {}", ctx.descriptor().signature());
        self.engine.decide(self.operation, ctx);
    }

    fn on_after(&self, ctx: &InvocationContext<'_>) {
        trace!("After {}", ctx.descriptor().signature());
    }

    fn placeholder_kind(&self) -> Option<ReturnKind> {
        Some(self.engine.policy(self.operation).placeholder.kind())
    }
}
