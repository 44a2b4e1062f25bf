//! Direct-call gate: the single-shot "run the original behaviour" escape hatch.
//!
//! A shadow that wants to call through to the unshadowed implementation of a method marks the
//! target with [`DirectCallGate::mark_for_direct_call`] and then makes the call as usual. The
//! next dispatch on that thread consumes the token and, if it is aimed at the marked object,
//! runs the original body instead of the substitute.
//!
//! Tokens are keyed by [`ThreadId`], so concurrent threads never observe or clear each other's
//! pending requests. At most one token may be pending per thread.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use shadowhost::dispatch::{CallTarget, ClassId, DirectCallGate, ObjectRef, PlatformObject};
//!
//! #[derive(Debug)]
//! struct View;
//! impl PlatformObject for View {
//!     fn class_id(&self) -> ClassId { ClassId::new("android.view.View") }
//! }
//!
//! let gate = DirectCallGate::new();
//! let view: ObjectRef = Arc::new(View);
//!
//! gate.mark_for_direct_call(&view)?;
//! assert!(gate.should_bypass_substitution(&CallTarget::instance(&view))?);
//! assert!(!gate.should_bypass_substitution(&CallTarget::instance(&view))?);
//! # Ok::<(), shadowhost::Error>(())
//! ```

use std::{
    fmt,
    sync::Arc,
    thread::{self, ThreadId},
};

use dashmap::DashMap;

use crate::{
    dispatch::object::{ClassId, ObjectId, PlatformObject},
    Error, Result,
};

/// The receiver of a dispatched call, as seen by the gate.
#[derive(Clone, PartialEq, Eq)]
pub enum CallTarget {
    /// An instance call, identified by object identity.
    Instance {
        /// Identity of the receiver
        id: ObjectId,
        /// Class of the receiver, for diagnostics
        class: ClassId,
    },
    /// A static call on a class.
    Class(ClassId),
}

impl CallTarget {
    /// Target describing an instance call on `object`.
    #[must_use]
    pub fn instance<T: PlatformObject + ?Sized>(object: &Arc<T>) -> Self {
        CallTarget::Instance {
            id: ObjectId::of(object),
            class: object.class_id(),
        }
    }

    /// Target describing a static call on `class`.
    #[must_use]
    pub fn class(class: ClassId) -> Self {
        CallTarget::Class(class)
    }

    fn same_target(&self, other: &CallTarget) -> bool {
        match (self, other) {
            (CallTarget::Instance { id: a, .. }, CallTarget::Instance { id: b, .. }) => a == b,
            (CallTarget::Class(a), CallTarget::Class(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for CallTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallTarget::Instance { id, class } => write!(f, "{class}@{id}"),
            CallTarget::Class(class) => write!(f, "class {class}"),
        }
    }
}

/// Per-thread single-shot direct-call tokens.
#[derive(Default)]
pub struct DirectCallGate {
    pending: DashMap<ThreadId, CallTarget>,
}

impl DirectCallGate {
    /// Creates a gate with no pending tokens.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `object` as the target of the next dispatch on the current thread.
    ///
    /// Returns `object` unchanged so the mark can be used inline at the call site.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if a token is already pending on this thread. The
    /// pending token is cleared in that case, so the thread starts from a clean state.
    pub fn mark_for_direct_call<'a, T: PlatformObject + ?Sized>(
        &self,
        object: &'a Arc<T>,
    ) -> Result<&'a Arc<T>> {
        self.mark(CallTarget::instance(object))?;
        Ok(object)
    }

    /// Marks `class` as the target of the next static dispatch on the current thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if a token is already pending on this thread.
    pub fn mark_class_for_direct_call(&self, class: &ClassId) -> Result<()> {
        self.mark(CallTarget::Class(class.clone()))
    }

    fn mark(&self, target: CallTarget) -> Result<()> {
        let thread = thread::current().id();
        if let Some((_, previous)) = self.pending.remove(&thread) {
            return Err(Error::ProtocolViolation {
                expected: previous.to_string(),
                actual: target.to_string(),
            });
        }
        self.pending.insert(thread, target);
        Ok(())
    }

    /// Consumes the current thread's pending token against `target`.
    ///
    /// # Returns
    ///
    /// * `Ok(false)` - No token is pending; nothing changes
    /// * `Ok(true)` - The pending token named `target`; it is now cleared
    ///
    /// # Errors
    ///
    /// Returns [`Error::ProtocolViolation`] if the pending token names a different target.
    /// The token is cleared before the error is returned.
    pub fn should_bypass_substitution(&self, target: &CallTarget) -> Result<bool> {
        let thread = thread::current().id();
        let Some((_, expected)) = self.pending.remove(&thread) else {
            return Ok(false);
        };

        if expected.same_target(target) {
            log::debug!("direct call to {target}");
            Ok(true)
        } else {
            Err(Error::ProtocolViolation {
                expected: expected.to_string(),
                actual: target.to_string(),
            })
        }
    }

    /// Returns `true` if the current thread has a pending token.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.contains_key(&thread::current().id())
    }

    /// Clears the current thread's pending token, if any.
    pub fn clear(&self) {
        self.pending.remove(&thread::current().id());
    }

    /// Clears the pending tokens of every thread.
    pub fn clear_all(&self) {
        self.pending.clear();
    }
}

impl fmt::Debug for DirectCallGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectCallGate")
            .field("pending", &self.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dispatch::object::describe,
        test::{view, VIEW_CLASS},
    };

    #[test]
    fn test_consumes_exactly_once() {
        let gate = DirectCallGate::new();
        let real = view();

        let marked = gate.mark_for_direct_call(&real).unwrap();
        assert!(Arc::ptr_eq(marked, &real));
        assert!(gate.is_pending());

        let target = CallTarget::instance(&real);
        assert!(gate.should_bypass_substitution(&target).unwrap());
        assert!(!gate.should_bypass_substitution(&target).unwrap());
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_no_token_has_no_effect() {
        let gate = DirectCallGate::new();
        let target = CallTarget::instance(&view());
        assert!(!gate.should_bypass_substitution(&target).unwrap());
    }

    #[test]
    fn test_double_mark_is_protocol_violation() {
        let gate = DirectCallGate::new();
        let a = view();
        let b = view();

        gate.mark_for_direct_call(&a).unwrap();
        let err = gate.mark_for_direct_call(&b).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation { .. }));
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_mismatch_clears_and_reports_both() {
        let gate = DirectCallGate::new();
        let expected = view();
        let actual = view();

        gate.mark_for_direct_call(&expected).unwrap();
        let err = gate
            .should_bypass_substitution(&CallTarget::instance(&actual))
            .unwrap_err();

        match err {
            Error::ProtocolViolation {
                expected: e,
                actual: a,
            } => {
                assert_eq!(e, describe(&expected));
                assert_eq!(a, describe(&actual));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(!gate.is_pending());
    }

    #[test]
    fn test_tokens_are_thread_local() {
        let gate = Arc::new(DirectCallGate::new());
        let real = view();
        gate.mark_for_direct_call(&real).unwrap();

        let other = {
            let gate = Arc::clone(&gate);
            let real = Arc::clone(&real);
            std::thread::spawn(move || {
                gate.should_bypass_substitution(&CallTarget::instance(&real))
                    .unwrap()
            })
        };
        assert!(!other.join().unwrap());

        assert!(gate
            .should_bypass_substitution(&CallTarget::instance(&real))
            .unwrap());
    }

    #[test]
    fn test_class_token_does_not_match_instance() {
        let gate = DirectCallGate::new();
        let class = ClassId::new(VIEW_CLASS);

        gate.mark_class_for_direct_call(&class).unwrap();
        assert!(gate
            .should_bypass_substitution(&CallTarget::class(class.clone()))
            .unwrap());

        gate.mark_class_for_direct_call(&class).unwrap();
        assert!(gate
            .should_bypass_substitution(&CallTarget::instance(&view()))
            .is_err());
    }
}
