//! Per-call interception protocol.
//!
//! Every intercepted call walks `Pending -> Decided -> Completed`. The
//! interceptor sees the call in `Pending` and may settle it with
//! [`InvocationContext::return_and_skip`]; once settled the real body is
//! never run and the placeholder becomes the call's result.

use crate::policy::{OverloadDescriptor, ReturnKind, TypedValue};
use tracing::{trace, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationPhase {
    Pending,
    Decided,
    Completed,
}

/// State of one intercepted call. Lives on the caller's stack.
#[derive(Debug)]
pub struct InvocationContext<'a> {
    id: Uuid,
    descriptor: &'a OverloadDescriptor,
    args: &'a [TypedValue],
    result: Option<TypedValue>,
    phase: InvocationPhase,
    skipped: bool,
}

impl<'a> InvocationContext<'a> {
    pub fn new(descriptor: &'a OverloadDescriptor, args: &'a [TypedValue]) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            args,
            result: None,
            phase: InvocationPhase::Pending,
            skipped: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &OverloadDescriptor {
        self.descriptor
    }

    pub fn args(&self) -> &[TypedValue] {
        self.args
    }

    pub fn phase(&self) -> InvocationPhase {
        self.phase
    }

    pub fn result(&self) -> Option<&TypedValue> {
        self.result.as_ref()
    }

    /// True once the call was settled without running the real body.
    pub fn is_skipped(&self) -> bool {
        self.skipped
    }

    /// Settles the call with `value`. Only honoured while `Pending`; a call
    /// that is already decided keeps its first result.
    pub fn return_and_skip(&mut self, value: TypedValue) {
        if self.phase != InvocationPhase::Pending {
            return;
        }
        self.result = Some(value);
        self.skipped = true;
        self.phase = InvocationPhase::Decided;
    }

    fn complete_with(&mut self, value: TypedValue) {
        self.result = Some(value);
        self.phase = InvocationPhase::Decided;
    }

    fn into_result(self) -> TypedValue {
        self.result.unwrap_or(TypedValue::Void)
    }
}

/// What an interceptor is told about a call.
#[derive(Debug)]
pub enum HookEvent<'e, 'a> {
    Before(&'e mut InvocationContext<'a>),
    After(&'e InvocationContext<'a>),
}

pub trait Interceptor: Send + Sync {
    fn on_before(&self, ctx: &mut InvocationContext<'_>);

    fn on_after(&self, _ctx: &InvocationContext<'_>) {}

    /// Kind of the value this interceptor substitutes, if it substitutes one.
    /// Checked against the overload's declared return kind before binding.
    fn placeholder_kind(&self) -> Option<ReturnKind> {
        None
    }

    fn handle(&self, event: HookEvent<'_, '_>) {
        match event {
            HookEvent::Before(ctx) => self.on_before(ctx),
            HookEvent::After(ctx) => self.on_after(ctx),
        }
    }
}

/// Drives one call through `interceptor`, running `body` only if the
/// interceptor did not settle the call.
pub fn dispatch<F>(
    interceptor: &dyn Interceptor,
    descriptor: &OverloadDescriptor,
    args: &[TypedValue],
    body: F,
) -> TypedValue
where
    F: FnOnce(&[TypedValue]) -> TypedValue,
{
    let mut ctx = InvocationContext::new(descriptor, args);
    trace!("Invocation {} pending on {}", ctx.id, descriptor);

    interceptor.handle(HookEvent::Before(&mut ctx));

    if ctx.skipped {
        let kind = ctx.result.as_ref().map(TypedValue::kind);
        if kind != Some(descriptor.returns) {
            warn!(
                "Invocation {} on {} settled with {:?}, declared {}",
                ctx.id, descriptor, kind, descriptor.returns
            );
        }
        trace!("Invocation {} skipped real body", ctx.id);
    } else {
        let value = body(args);
        ctx.complete_with(value);
    }

    ctx.phase = InvocationPhase::Completed;
    interceptor.handle(HookEvent::After(&ctx));
    ctx.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct Skipper(TypedValue);

    impl Interceptor for Skipper {
        fn on_before(&self, ctx: &mut InvocationContext<'_>) {
            ctx.return_and_skip(self.0.clone());
        }
    }

    #[derive(Default)]
    struct Observer {
        phases: Mutex<Vec<InvocationPhase>>,
    }

    impl Interceptor for Observer {
        fn on_before(&self, ctx: &mut InvocationContext<'_>) {
            self.phases.lock().unwrap().push(ctx.phase());
        }

        fn on_after(&self, ctx: &InvocationContext<'_>) {
            self.phases.lock().unwrap().push(ctx.phase());
        }
    }

    fn lock_now() -> OverloadDescriptor {
        OverloadDescriptor::new("Dpm", "lockNow", vec![], ReturnKind::Void)
    }

    #[test]
    fn test_skip_never_runs_body() {
        let calls = AtomicUsize::new(0);
        let descriptor = lock_now();
        let result = dispatch(&Skipper(TypedValue::Void), &descriptor, &[], |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            TypedValue::Void
        });

        assert_eq!(result, TypedValue::Void);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_mismatched_skip_value_is_returned_without_panic() {
        let calls = AtomicUsize::new(0);
        let descriptor = lock_now();
        let result = dispatch(&Skipper(TypedValue::Bool(false)), &descriptor, &[], |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            TypedValue::Void
        });

        assert_eq!(result, TypedValue::Bool(false));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_pass_through_runs_body_once() {
        let calls = AtomicUsize::new(0);
        let descriptor = OverloadDescriptor::new("Dpm", "isAdmin", vec![], ReturnKind::Boolean);
        let observer = Observer::default();
        let result = dispatch(&observer, &descriptor, &[], |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            TypedValue::Bool(true)
        });

        assert_eq!(result, TypedValue::Bool(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            *observer.phases.lock().unwrap(),
            vec![InvocationPhase::Pending, InvocationPhase::Completed]
        );
    }

    #[test]
    fn test_first_decision_wins() {
        let descriptor = OverloadDescriptor::new("Dpm", "reset", vec![], ReturnKind::Boolean);
        let args: [TypedValue; 0] = [];
        let mut ctx = InvocationContext::new(&descriptor, &args);
        ctx.return_and_skip(TypedValue::Bool(false));
        ctx.return_and_skip(TypedValue::Bool(true));

        assert_eq!(ctx.phase(), InvocationPhase::Decided);
        assert_eq!(ctx.result(), Some(&TypedValue::Bool(false)));
    }

    #[test]
    fn test_handle_routes_events() {
        let observer = Observer::default();
        let descriptor = lock_now();
        let args = [TypedValue::Int(1)];
        let mut ctx = InvocationContext::new(&descriptor, &args);

        observer.handle(HookEvent::Before(&mut ctx));
        observer.handle(HookEvent::After(&ctx));

        assert_eq!(observer.phases.lock().unwrap().len(), 2);
        assert_eq!(ctx.args(), &[TypedValue::Int(1)]);
    }
}
