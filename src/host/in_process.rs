//! In-process host runtime.
//!
//! Registers plain Rust closures as the operations of named components and
//! routes calls through bound interceptors. Operations start on a compiled
//! fast path that ignores hooks until [`HostRuntime::force_interceptable`]
//! moves them off it.

use super::{HostRuntime, RuntimeError};
use crate::hooks::{dispatch, HookHandle, Interceptor};
use crate::policy::{OverloadDescriptor, TypedValue};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

type Body = Arc<dyn Fn(&[TypedValue]) -> TypedValue + Send + Sync>;

struct Slot {
    descriptor: OverloadDescriptor,
    body: Body,
    interceptable: bool,
    hook: Option<Arc<dyn Interceptor>>,
}

#[derive(Default)]
struct Faults {
    deoptimize: HashSet<OverloadDescriptor>,
    bind: HashSet<OverloadDescriptor>,
}

#[derive(Default)]
pub struct InProcessRuntime {
    components: RwLock<HashMap<String, Vec<Slot>>>,
    faults: RwLock<Faults>,
}

impl InProcessRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `body` as the implementation of `descriptor`, replacing any
    /// previous definition and dropping its hook.
    pub fn define<F>(&self, descriptor: OverloadDescriptor, body: F)
    where
        F: Fn(&[TypedValue]) -> TypedValue + Send + Sync + 'static,
    {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slots = components.entry(descriptor.component.clone()).or_default();
        slots.retain(|slot| slot.descriptor != descriptor);
        slots.push(Slot {
            descriptor,
            body: Arc::new(body),
            interceptable: false,
            hook: None,
        });
    }

    /// Makes the next `force_interceptable` on `descriptor` fail.
    pub fn fail_force_interceptable(&self, descriptor: &OverloadDescriptor) {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .deoptimize
            .insert(descriptor.clone());
    }

    /// Makes the next `bind` on `descriptor` fail.
    pub fn fail_bind(&self, descriptor: &OverloadDescriptor) {
        self.faults
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .bind
            .insert(descriptor.clone());
    }

    pub fn is_hooked(&self, descriptor: &OverloadDescriptor) -> bool {
        self.with_slot(descriptor, |slot| slot.hook.is_some())
            .unwrap_or(false)
    }

    pub fn is_interceptable(&self, descriptor: &OverloadDescriptor) -> bool {
        self.with_slot(descriptor, |slot| slot.interceptable)
            .unwrap_or(false)
    }

    /// Calls the operation the way the component's caller would.
    pub fn invoke(
        &self,
        descriptor: &OverloadDescriptor,
        args: &[TypedValue],
    ) -> Result<TypedValue, RuntimeError> {
        let (body, hook) = self
            .with_slot(descriptor, |slot| {
                let hook = if slot.interceptable { slot.hook.clone() } else { None };
                (slot.body.clone(), hook)
            })
            .ok_or_else(|| RuntimeError::OverloadNotFound(descriptor.to_string()))?;

        match hook {
            Some(interceptor) => Ok(dispatch(interceptor.as_ref(), descriptor, args, |args| {
                body(args)
            })),
            None => {
                trace!("Direct call to {}", descriptor);
                Ok(body(args))
            }
        }
    }

    fn with_slot<R>(&self, descriptor: &OverloadDescriptor, f: impl FnOnce(&Slot) -> R) -> Option<R> {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        components
            .get(&descriptor.component)?
            .iter()
            .find(|slot| &slot.descriptor == descriptor)
            .map(f)
    }

    fn with_slot_mut<R>(
        &self,
        descriptor: &OverloadDescriptor,
        f: impl FnOnce(&mut Slot) -> R,
    ) -> Result<R, RuntimeError> {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        components
            .get_mut(&descriptor.component)
            .and_then(|slots| slots.iter_mut().find(|slot| &slot.descriptor == descriptor))
            .map(f)
            .ok_or_else(|| RuntimeError::OverloadNotFound(descriptor.to_string()))
    }

    fn take_fault(&self, descriptor: &OverloadDescriptor, bind: bool) -> bool {
        let mut faults = self.faults.write().unwrap_or_else(PoisonError::into_inner);
        if bind {
            faults.bind.remove(descriptor)
        } else {
            faults.deoptimize.remove(descriptor)
        }
    }
}

impl HostRuntime for InProcessRuntime {
    fn list_operations(&self, component: &str) -> Result<Vec<OverloadDescriptor>, RuntimeError> {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let slots = components
            .get(component)
            .ok_or_else(|| RuntimeError::ComponentNotFound(component.to_string()))?;
        Ok(slots.iter().map(|slot| slot.descriptor.clone()).collect())
    }

    fn force_interceptable(&self, descriptor: &OverloadDescriptor) -> Result<(), RuntimeError> {
        if self.take_fault(descriptor, false) {
            return Err(RuntimeError::Deoptimize(
                descriptor.to_string(),
                "injected fault".to_string(),
            ));
        }
        self.with_slot_mut(descriptor, |slot| slot.interceptable = true)?;
        debug!("Deoptimized {}", descriptor);
        Ok(())
    }

    fn bind(
        &self,
        descriptor: &OverloadDescriptor,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<HookHandle, RuntimeError> {
        if self.take_fault(descriptor, true) {
            return Err(RuntimeError::Bind(
                descriptor.to_string(),
                "injected fault".to_string(),
            ));
        }
        self.with_slot_mut(descriptor, |slot| {
            if slot.hook.is_some() {
                return Err(RuntimeError::AlreadyHooked(descriptor.to_string()));
            }
            slot.hook = Some(interceptor);
            Ok(HookHandle::new(descriptor.clone()))
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::InvocationContext;
    use crate::policy::{ParamKind, ReturnKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Deny;

    impl Interceptor for Deny {
        fn on_before(&self, ctx: &mut InvocationContext<'_>) {
            ctx.return_and_skip(TypedValue::Bool(false));
        }
    }

    fn reset() -> OverloadDescriptor {
        OverloadDescriptor::new(
            "Dpm",
            "resetPasswordWithToken",
            vec![ParamKind::String, ParamKind::Bytes, ParamKind::Int],
            ReturnKind::Boolean,
        )
    }

    fn counted(runtime: &InProcessRuntime, descriptor: OverloadDescriptor) -> Arc<AtomicUsize> {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        runtime.define(descriptor, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            TypedValue::Bool(true)
        });
        calls
    }

    #[test]
    fn test_unhooked_call_runs_body() {
        let runtime = InProcessRuntime::new();
        let calls = counted(&runtime, reset());

        assert_eq!(runtime.invoke(&reset(), &[]).unwrap(), TypedValue::Bool(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_fast_path_bypasses_hook_until_deoptimized() {
        let runtime = InProcessRuntime::new();
        let calls = counted(&runtime, reset());
        runtime.bind(&reset(), Arc::new(Deny)).unwrap();

        assert_eq!(runtime.invoke(&reset(), &[]).unwrap(), TypedValue::Bool(true));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        runtime.force_interceptable(&reset()).unwrap();
        assert!(runtime.is_interceptable(&reset()));
        assert_eq!(runtime.invoke(&reset(), &[]).unwrap(), TypedValue::Bool(false));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_bind_rejected() {
        let runtime = InProcessRuntime::new();
        counted(&runtime, reset());
        runtime.bind(&reset(), Arc::new(Deny)).unwrap();

        assert_eq!(
            runtime.bind(&reset(), Arc::new(Deny)).unwrap_err(),
            RuntimeError::AlreadyHooked(reset().to_string())
        );
    }

    #[test]
    fn test_injected_faults_fire_once() {
        let runtime = InProcessRuntime::new();
        counted(&runtime, reset());
        runtime.fail_force_interceptable(&reset());

        assert!(runtime.force_interceptable(&reset()).is_err());
        assert!(runtime.force_interceptable(&reset()).is_ok());
    }

    #[test]
    fn test_list_operations_unknown_component() {
        let runtime = InProcessRuntime::new();
        assert_eq!(
            runtime.list_operations("Missing").unwrap_err(),
            RuntimeError::ComponentNotFound("Missing".to_string())
        );
    }

    #[test]
    fn test_invoke_unknown_overload() {
        let runtime = InProcessRuntime::new();
        assert!(matches!(
            runtime.invoke(&reset(), &[]),
            Err(RuntimeError::OverloadNotFound(_))
        ));
    }
}
