//! The central dispatch entry point.
//!
//! Every intercepted call site routes through [`Dispatcher::dispatch`], handing over the call
//! site description, the real receiver, the boxed arguments and a closure running the original
//! body. The dispatcher decides between three outcomes:
//!
//! ```text
//! dispatch(site, instance, args, original)
//!         │
//!         ▼
//! ┌───────────────────┐
//! │  Direct-call gate │───► token matches ───► original(args)
//! └───────────────────┘
//!         │ no token
//!         ▼
//! ┌───────────────────┐
//! │  Shadow lookup    │───► no definition ───► NoShadowBound
//! └───────────────────┘
//!         │
//!         ▼
//! ┌───────────────────┐
//! │  Bind substitute  │  (lazy, once per real object)
//! └───────────────────┘
//!         │
//!         ▼
//! ┌───────────────────┐
//! │  Find handler     │───► none ───► UnknownMethodBehavior
//! └───────────────────┘
//!         │
//!         ▼
//!   handler(state, invocation)
//! ```
//!
//! Failures raised while binding or invoking a substitute come back as
//! [`Error::DispatchFailure`] with the original cause attached.

use std::{fmt, sync::Arc};

use strum::{Display, EnumIter, EnumString};

use crate::{
    dispatch::{
        gate::{CallTarget, DirectCallGate},
        identity::{IdentityRegistry, Substitute},
        object::{describe, ClassId, ObjectRef, PlatformObject},
        shadow::{Invocation, ShadowDefinition, ShadowTable},
        value::ShadowValue,
    },
    Error, Result,
};

/// Behavior when a bound shadow has no handler for the dispatched method.
///
/// # Choosing a Behavior
///
/// - Use [`ReturnDefault`](Self::ReturnDefault) for lenient shadows that only implement the
///   methods a test cares about (default)
/// - Use [`CallOriginal`](Self::CallOriginal) to fall through to the real body
/// - Use [`Fail`](Self::Fail) for strict runs where every reached method must be shadowed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum UnknownMethodBehavior {
    /// Return [`ShadowValue::Void`] without running anything.
    #[default]
    ReturnDefault,

    /// Run the original body passed to the dispatcher.
    CallOriginal,

    /// Fail with [`Error::NoShadowBound`] naming the method signature.
    Fail,
}

/// Static description of an intercepted call site.
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    /// Declaring class of the called method.
    pub class: ClassId,

    /// Method name.
    pub method: &'a str,

    /// Parameter type descriptors, e.g. `["int", "java.lang.String"]`.
    pub param_types: &'a [&'a str],
}

impl<'a> CallSite<'a> {
    /// Describes a call to `class.method(param_types)`.
    #[must_use]
    pub fn new(class: impl Into<ClassId>, method: &'a str, param_types: &'a [&'a str]) -> Self {
        Self {
            class: class.into(),
            method,
            param_types,
        }
    }

    fn signature(&self) -> String {
        format!("{}({})", self.method, self.param_types.join(","))
    }
}

/// Routes intercepted calls to their substitutes.
///
/// The dispatcher owns no mutable state of its own: it shares the immutable [`ShadowTable`]
/// and the [`IdentityRegistry`] and [`DirectCallGate`] of the running environment. Cloning is
/// cheap and every clone observes the same state.
#[derive(Clone)]
pub struct Dispatcher {
    table: Arc<ShadowTable>,
    registry: Arc<IdentityRegistry>,
    gate: Arc<DirectCallGate>,
    unknown_method: UnknownMethodBehavior,
}

impl Dispatcher {
    /// Creates a dispatcher over shared environment state.
    #[must_use]
    pub fn new(
        table: Arc<ShadowTable>,
        registry: Arc<IdentityRegistry>,
        gate: Arc<DirectCallGate>,
    ) -> Self {
        Self {
            table,
            registry,
            gate,
            unknown_method: UnknownMethodBehavior::default(),
        }
    }

    /// Sets the behavior for methods the bound shadow does not handle.
    #[must_use]
    pub fn with_unknown_method(mut self, behavior: UnknownMethodBehavior) -> Self {
        self.unknown_method = behavior;
        self
    }

    /// The shadow table this dispatcher resolves against.
    #[must_use]
    pub fn table(&self) -> &ShadowTable {
        &self.table
    }

    /// The identity registry holding substitute bindings.
    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    /// The direct-call gate consulted before every dispatch.
    #[must_use]
    pub fn gate(&self) -> &DirectCallGate {
        &self.gate
    }

    /// Dispatches one intercepted call.
    ///
    /// # Arguments
    ///
    /// * `site` - Declaring class, method name and parameter descriptors
    /// * `instance` - The real receiver, `None` for static calls
    /// * `args` - Arguments boxed with [`autobox`](crate::dispatch::autobox) or [`args!`](crate::args)
    /// * `original` - Runs the unshadowed body; only called for direct calls or under
    ///   [`UnknownMethodBehavior::CallOriginal`]
    ///
    /// # Errors
    ///
    /// * [`Error::ProtocolViolation`] - A direct call is pending on this thread for another target
    /// * [`Error::NoShadowBound`] - Neither the receiver's class nor the declaring class is shadowed
    /// * [`Error::DispatchFailure`] - The substitute could not be created or its handler failed
    pub fn dispatch<F>(
        &self,
        site: &CallSite<'_>,
        instance: Option<&ObjectRef>,
        args: &[ShadowValue],
        original: F,
    ) -> Result<ShadowValue>
    where
        F: FnOnce(&[ShadowValue]) -> Result<ShadowValue>,
    {
        let target = match instance {
            Some(real) => CallTarget::instance(real),
            None => CallTarget::Class(site.class.clone()),
        };
        if self.gate.should_bypass_substitution(&target)? {
            return original(args);
        }

        let definition = self.resolve_definition(site, instance)?;
        let class = definition.class();

        let substitute = self
            .bind(&definition, instance)
            .map_err(|e| e.into_dispatch_failure(class.name(), site.method))?;

        let handler = match instance {
            Some(_) => definition.find_method(site.method, site.param_types),
            None => definition.find_static_method(site.method, site.param_types),
        };
        let Some(handler) = handler else {
            return match self.unknown_method {
                UnknownMethodBehavior::ReturnDefault => Ok(ShadowValue::Void),
                UnknownMethodBehavior::CallOriginal => original(args),
                UnknownMethodBehavior::Fail => Err(Error::NoShadowBound {
                    class: class.to_string(),
                    method: site.signature(),
                }),
            };
        };

        let invocation = Invocation {
            class,
            method: site.method,
            param_types: site.param_types,
            instance,
            args,
            dispatcher: self,
        };
        handler(substitute.as_ref(), &invocation)
            .map_err(|e| e.into_dispatch_failure(class.name(), site.method))
    }

    /// Shadows are resolved on the receiver's runtime class first, then on the declaring class.
    fn resolve_definition(
        &self,
        site: &CallSite<'_>,
        instance: Option<&ObjectRef>,
    ) -> Result<Arc<ShadowDefinition>> {
        let runtime = instance.map(|real| real.class_id());
        runtime
            .as_ref()
            .and_then(|class| self.table.find(class))
            .or_else(|| self.table.find(&site.class))
            .cloned()
            .ok_or_else(|| Error::NoShadowBound {
                class: runtime.unwrap_or_else(|| site.class.clone()).to_string(),
                method: site.method.to_string(),
            })
    }

    fn bind(
        &self,
        definition: &ShadowDefinition,
        instance: Option<&ObjectRef>,
    ) -> Result<Arc<Substitute>> {
        match instance {
            Some(real) => self
                .registry
                .bind_with(real, || definition.create_substitute(Some(real))),
            None => self
                .registry
                .bind_static_with(definition.class(), || definition.create_substitute(None)),
        }
    }

    /// Returns the substitute bound to `real`, binding it now if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoShadowBound`] if the object's class is not shadowed, or the factory's
    /// failure wrapped in [`Error::DispatchFailure`].
    pub fn substitute_of(&self, real: &ObjectRef) -> Result<Arc<Substitute>> {
        let class = real.class_id();
        let definition = self.table.find(&class).ok_or_else(|| Error::NoShadowBound {
            class: class.to_string(),
            method: "<bind>".to_string(),
        })?;
        self.bind(definition, Some(real))
            .map_err(|e| e.into_dispatch_failure(class.name(), "<bind>"))
    }

    /// Marks `real` so the next dispatch on this thread runs its original body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if a direct call is already pending on this thread.
    pub fn direct_on<'a, T: PlatformObject + ?Sized>(&self, real: &'a Arc<T>) -> Result<&'a Arc<T>> {
        log::debug!("marking {} for direct call", describe(real));
        self.gate.mark_for_direct_call(real)
    }

    /// Marks `class` so the next static dispatch on this thread runs its original body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if a direct call is already pending on this thread.
    pub fn direct_on_class(&self, class: &ClassId) -> Result<()> {
        self.gate.mark_class_for_direct_call(class)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("shadowed_classes", &self.table.len())
            .field("registry", &self.registry)
            .field("unknown_method", &self.unknown_method)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        args,
        dispatch::shadow::ShadowClass,
        test::{view, CountingShadow, TestView, VIEW_CLASS},
    };
    use std::{
        error::Error as _,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn dispatcher() -> Dispatcher {
        let mut table = ShadowTable::new();
        table.register(
            ShadowClass::<CountingShadow>::new(VIEW_CLASS)
                .method("invalidate", &[], |shadow, _| {
                    shadow.calls.fetch_add(1, Ordering::SeqCst);
                    Ok(ShadowValue::Void)
                })
                .method("setAlpha", &["float"], |shadow, call| {
                    shadow.calls.fetch_add(1, Ordering::SeqCst);
                    Ok(call.arg(0)?.clone())
                })
                .method("getCalls", &[], |shadow, _| {
                    let calls = shadow.calls.load(Ordering::SeqCst);
                    Ok(i64::try_from(calls).unwrap_or(i64::MAX).into())
                })
                .method("explode", &[], |_, _| {
                    Err(Error::InvalidState("shadow failure".to_string()))
                })
                .static_method("generateViewId", &[], |shadow, _| {
                    let next = shadow.calls.fetch_add(1, Ordering::SeqCst) + 1;
                    Ok(i32::try_from(next).unwrap_or(i32::MAX).into())
                }),
        );
        Dispatcher::new(
            Arc::new(table),
            Arc::new(IdentityRegistry::new()),
            Arc::new(DirectCallGate::new()),
        )
    }

    fn unreachable_original(_: &[ShadowValue]) -> Result<ShadowValue> {
        panic!("original body must not run")
    }

    #[test]
    fn test_dispatch_reaches_shadow() {
        let dispatcher = dispatcher();
        let real = view();
        let site = CallSite::new(VIEW_CLASS, "setAlpha", &["float"]);

        let result = dispatcher
            .dispatch(&site, Some(&real), &args![0.5f32], unreachable_original)
            .unwrap();
        assert_eq!(result, ShadowValue::F32(0.5));
    }

    #[test]
    fn test_state_is_per_object() {
        let dispatcher = dispatcher();
        let a = view();
        let b = view();
        let invalidate = CallSite::new(VIEW_CLASS, "invalidate", &[]);
        let get_calls = CallSite::new(VIEW_CLASS, "getCalls", &[]);

        for _ in 0..3 {
            dispatcher
                .dispatch(&invalidate, Some(&a), &[], unreachable_original)
                .unwrap();
        }

        let a_calls = dispatcher
            .dispatch(&get_calls, Some(&a), &[], unreachable_original)
            .unwrap();
        let b_calls = dispatcher
            .dispatch(&get_calls, Some(&b), &[], unreachable_original)
            .unwrap();
        assert_eq!(a_calls, ShadowValue::I64(3));
        assert_eq!(b_calls, ShadowValue::I64(0));
    }

    #[test]
    fn test_direct_call_runs_original_once() {
        let dispatcher = dispatcher();
        let real = view();
        let site = CallSite::new(VIEW_CLASS, "invalidate", &[]);
        let originals = AtomicUsize::new(0);
        let original = |_: &[ShadowValue]| {
            originals.fetch_add(1, Ordering::SeqCst);
            Ok(ShadowValue::Void)
        };

        let marked = dispatcher.direct_on(&real).unwrap();
        dispatcher.dispatch(&site, Some(marked), &[], original).unwrap();
        dispatcher.dispatch(&site, Some(&real), &[], original).unwrap();

        assert_eq!(originals.load(Ordering::SeqCst), 1);
        let shadow = dispatcher.substitute_of(&real).unwrap();
        let calls = &shadow.state::<CountingShadow>().unwrap().calls;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_direct_call_on_other_object_is_violation() {
        let dispatcher = dispatcher();
        let marked = view();
        let other = view();
        let site = CallSite::new(VIEW_CLASS, "invalidate", &[]);

        dispatcher.direct_on(&marked).unwrap();
        let err = dispatcher
            .dispatch(&site, Some(&other), &[], unreachable_original)
            .unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { .. }));
        assert!(!dispatcher.gate().is_pending());
    }

    #[test]
    fn test_unshadowed_class() {
        let dispatcher = dispatcher();
        let site = CallSite::new("android.app.Activity", "finish", &[]);
        let err = dispatcher
            .dispatch(&site, None, &[], unreachable_original)
            .unwrap_err();
        assert!(matches!(err, Error::NoShadowBound { .. }));
    }

    #[test]
    fn test_handler_failure_is_wrapped() {
        let dispatcher = dispatcher();
        let real = view();
        let site = CallSite::new(VIEW_CLASS, "explode", &[]);

        let err = dispatcher
            .dispatch(&site, Some(&real), &[], unreachable_original)
            .unwrap_err();
        assert!(matches!(err, Error::DispatchFailure { .. }));
        assert_eq!(err.source().unwrap().to_string(), "shadow failure");
    }

    #[test]
    fn test_static_dispatch_uses_class_state() {
        let dispatcher = dispatcher();
        let site = CallSite::new(VIEW_CLASS, "generateViewId", &[]);

        let first = dispatcher.dispatch(&site, None, &[], unreachable_original).unwrap();
        let second = dispatcher.dispatch(&site, None, &[], unreachable_original).unwrap();
        assert_eq!(first, ShadowValue::I32(1));
        assert_eq!(second, ShadowValue::I32(2));
    }

    #[test]
    fn test_static_direct_call() {
        let dispatcher = dispatcher();
        let site = CallSite::new(VIEW_CLASS, "generateViewId", &[]);

        dispatcher.direct_on_class(&site.class).unwrap();
        let result = dispatcher
            .dispatch(&site, None, &[], |_| Ok(ShadowValue::I32(-1)))
            .unwrap();
        assert_eq!(result, ShadowValue::I32(-1));
    }

    #[test]
    fn test_unknown_method_behaviors() {
        let real = view();
        let site = CallSite::new(VIEW_CLASS, "requestLayout", &[]);

        let lenient = dispatcher();
        let result = lenient
            .dispatch(&site, Some(&real), &[], unreachable_original)
            .unwrap();
        assert!(result.is_void());

        let passthrough = dispatcher().with_unknown_method(UnknownMethodBehavior::CallOriginal);
        let result = passthrough
            .dispatch(&site, Some(&real), &[], |_| Ok(ShadowValue::Bool(true)))
            .unwrap();
        assert_eq!(result, ShadowValue::Bool(true));

        let strict = dispatcher().with_unknown_method(UnknownMethodBehavior::Fail);
        let err = strict
            .dispatch(&site, Some(&real), &[], unreachable_original)
            .unwrap_err();
        match err {
            Error::NoShadowBound { method, .. } => assert_eq!(method, "requestLayout()"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_subclass_instance_falls_back_to_declaring_class() {
        #[derive(Debug, Default)]
        struct CustomView;
        impl PlatformObject for CustomView {
            fn class_id(&self) -> ClassId {
                ClassId::new("com.example.CustomView")
            }
        }

        let dispatcher = dispatcher();
        let real: ObjectRef = Arc::new(CustomView);
        let site = CallSite::new(VIEW_CLASS, "invalidate", &[]);
        assert!(dispatcher
            .dispatch(&site, Some(&real), &[], unreachable_original)
            .is_ok());

        let plain: ObjectRef = Arc::new(TestView::default());
        assert!(dispatcher.substitute_of(&plain).is_ok());
    }
}
