//! Identity registry mapping real platform objects to their substitutes.
//!
//! Every real object that passes through the dispatcher is bound, lazily and exactly once,
//! to a [`Substitute`] holding the shadow state for that object. The registry keys bindings
//! by [`ObjectId`] and only keeps a [`Weak`] handle to the real object, so a binding never
//! extends the lifetime of the object it describes. Bindings whose object has been dropped
//! are treated as absent. Binding prunes them once the map outgrows a threshold that doubles
//! with the number of live bindings, so a long test creating many short-lived objects keeps
//! the map, and the shadow state it owns, bounded.
//!
//! # Thread Safety
//!
//! The registry is shared process-wide state. It is backed by a [`DashMap`] so binding and
//! lookup are safe from any thread; tear-down from a background thread is a supported case.
//! Substitute creation runs outside of the map's shard locks, which lets a factory dispatch
//! further calls while it builds its state. If two threads race to bind the same object, the
//! first insertion wins and both observe the same substitute.

use std::{
    any::Any,
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Weak,
    },
};

use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    dispatch::object::{ClassId, ObjectId, ObjectRef, PlatformObject},
    Result,
};

/// The substitute ("shadow") standing in for one real object or one class.
///
/// A substitute owns the type-erased shadow state produced by the registered factory.
/// Handlers recover the concrete state with [`Substitute::state`].
pub struct Substitute {
    class: ClassId,
    state: Box<dyn Any + Send + Sync>,
}

impl Substitute {
    /// Wraps shadow state for the given class.
    #[must_use]
    pub fn new<S: Any + Send + Sync>(class: ClassId, state: S) -> Self {
        Self {
            class,
            state: Box::new(state),
        }
    }

    /// Wraps already boxed shadow state.
    #[must_use]
    pub fn from_boxed(class: ClassId, state: Box<dyn Any + Send + Sync>) -> Self {
        Self { class, state }
    }

    /// The class whose shadow definition produced this substitute.
    #[must_use]
    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// Returns the shadow state if it is of type `S`.
    #[must_use]
    pub fn state<S: Any>(&self) -> Option<&S> {
        self.state.downcast_ref::<S>()
    }
}

impl fmt::Debug for Substitute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substitute")
            .field("class", &self.class)
            .finish_non_exhaustive()
    }
}

struct Binding {
    real: Weak<dyn PlatformObject>,
    substitute: Arc<Substitute>,
}

impl Binding {
    fn is_bound_to(&self, id: ObjectId) -> bool {
        self.real.strong_count() > 0 && self.real.as_ptr().cast::<()>() as usize == id.value()
    }
}

/// Binding count at which the first automatic prune runs.
const PRUNE_THRESHOLD: usize = 64;

/// Registry of real-object to substitute bindings.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shadowhost::dispatch::{ClassId, IdentityRegistry, ObjectRef, PlatformObject, Substitute};
///
/// #[derive(Debug)]
/// struct Window;
/// impl PlatformObject for Window {
///     fn class_id(&self) -> ClassId { ClassId::new("android.view.Window") }
/// }
///
/// let registry = IdentityRegistry::new();
/// let window: ObjectRef = Arc::new(Window);
///
/// let first = registry.bind_with(&window, || Ok(Substitute::new(window.class_id(), 0u32)))?;
/// let second = registry.bind_with(&window, || Ok(Substitute::new(window.class_id(), 1u32)))?;
/// assert!(Arc::ptr_eq(&first, &second));
/// # Ok::<(), shadowhost::Error>(())
/// ```
pub struct IdentityRegistry {
    bindings: DashMap<ObjectId, Binding>,
    statics: DashMap<ClassId, Arc<Substitute>>,
    prune_at: AtomicUsize,
}

impl Default for IdentityRegistry {
    fn default() -> Self {
        Self {
            bindings: DashMap::new(),
            statics: DashMap::new(),
            prune_at: AtomicUsize::new(PRUNE_THRESHOLD),
        }
    }
}

impl IdentityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the substitute bound to `real`, creating it with `create` on first use.
    ///
    /// Binding is idempotent per object identity: every call for the same live object
    /// returns the same substitute instance, and `create` is not invoked once a binding
    /// exists.
    ///
    /// # Errors
    ///
    /// Returns whatever error `create` reports; nothing is bound in that case.
    pub fn bind_with<F>(&self, real: &ObjectRef, create: F) -> Result<Arc<Substitute>>
    where
        F: FnOnce() -> Result<Substitute>,
    {
        if let Some(existing) = self.lookup(real) {
            return Ok(existing);
        }

        let candidate = Arc::new(create()?);
        let id = ObjectId::of(real);

        match self.bindings.entry(id) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_bound_to(id) {
                    return Ok(Arc::clone(&occupied.get().substitute));
                }
                log::warn!("replacing stale shadow binding at {id}");
                occupied.insert(Binding {
                    real: Arc::downgrade(real),
                    substitute: Arc::clone(&candidate),
                });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Binding {
                    real: Arc::downgrade(real),
                    substitute: Arc::clone(&candidate),
                });
            }
        }

        log::debug!("bound shadow {} to {}@{id}", candidate.class(), real.class_id());
        self.maybe_prune();
        Ok(candidate)
    }

    /// Prunes once the map reaches the threshold, then moves the threshold to twice the
    /// surviving bindings.
    fn maybe_prune(&self) {
        if self.bindings.len() < self.prune_at.load(Ordering::Relaxed) {
            return;
        }
        self.prune();
        let next = (self.bindings.len() * 2).max(PRUNE_THRESHOLD);
        self.prune_at.store(next, Ordering::Relaxed);
    }

    /// Returns the substitute bound to `real`, if any.
    ///
    /// A binding left behind by a dropped object whose address was reused is never
    /// returned.
    #[must_use]
    pub fn lookup(&self, real: &ObjectRef) -> Option<Arc<Substitute>> {
        let id = ObjectId::of(real);
        let stale = {
            let binding = self.bindings.get(&id)?;
            if binding.is_bound_to(id) {
                return Some(Arc::clone(&binding.substitute));
            }
            true
        };

        if stale {
            self.bindings.remove_if(&id, |_, binding| !binding.is_bound_to(id));
        }
        None
    }

    /// Removes the binding for `real`, returning its substitute.
    pub fn unbind(&self, real: &ObjectRef) -> Option<Arc<Substitute>> {
        let id = ObjectId::of(real);
        self.bindings
            .remove_if(&id, |_, binding| binding.is_bound_to(id))
            .map(|(_, binding)| binding.substitute)
    }

    /// Returns the class-level substitute for static calls, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns whatever error `create` reports; nothing is bound in that case.
    pub fn bind_static_with<F>(&self, class: &ClassId, create: F) -> Result<Arc<Substitute>>
    where
        F: FnOnce() -> Result<Substitute>,
    {
        if let Some(existing) = self.statics.get(class) {
            return Ok(Arc::clone(&existing));
        }

        let candidate = Arc::new(create()?);
        let bound = self
            .statics
            .entry(class.clone())
            .or_insert_with(|| candidate);
        Ok(Arc::clone(&bound))
    }

    /// Returns the class-level substitute, if one has been created.
    #[must_use]
    pub fn lookup_static(&self, class: &ClassId) -> Option<Arc<Substitute>> {
        self.statics.get(class).map(|s| Arc::clone(&s))
    }

    /// Drops bindings whose real object no longer exists.
    ///
    /// # Returns
    ///
    /// The number of bindings removed.
    pub fn prune(&self) -> usize {
        let before = self.bindings.len();
        self.bindings.retain(|id, binding| binding.is_bound_to(*id));
        let removed = before.saturating_sub(self.bindings.len());
        if removed > 0 {
            log::debug!("pruned {removed} stale shadow bindings");
        }
        removed
    }

    /// Number of instance bindings, including stale ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` if no instance or static bindings exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty() && self.statics.is_empty()
    }

    /// Removes every binding.
    pub fn clear(&self) {
        self.bindings.clear();
        self.statics.clear();
        self.prune_at.store(PRUNE_THRESHOLD, Ordering::Relaxed);
    }
}

impl fmt::Debug for IdentityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityRegistry")
            .field("bindings", &self.bindings.len())
            .field("statics", &self.statics.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{view, TestView, VIEW_CLASS};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory(counter: &AtomicUsize) -> Result<Substitute> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Substitute::new(ClassId::new(VIEW_CLASS), ()))
    }

    #[test]
    fn test_bind_is_idempotent() {
        let registry = IdentityRegistry::new();
        let created = AtomicUsize::new(0);
        let real = view();

        let first = registry.bind_with(&real, || counting_factory(&created)).unwrap();
        let second = registry.bind_with(&real, || counting_factory(&created)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_equal_objects_get_independent_substitutes() {
        let registry = IdentityRegistry::new();
        let a: ObjectRef = Arc::new(TestView::default());
        let b: ObjectRef = Arc::new(TestView::default());

        let sa = registry
            .bind_with(&a, || Ok(Substitute::new(a.class_id(), 1u8)))
            .unwrap();
        let sb = registry
            .bind_with(&b, || Ok(Substitute::new(b.class_id(), 2u8)))
            .unwrap();

        assert!(!Arc::ptr_eq(&sa, &sb));
        assert_eq!(sa.state::<u8>(), Some(&1));
        assert_eq!(sb.state::<u8>(), Some(&2));
    }

    #[test]
    fn test_lookup_absent() {
        let registry = IdentityRegistry::new();
        assert!(registry.lookup(&view()).is_none());
    }

    #[test]
    fn test_registry_does_not_keep_object_alive() {
        let registry = IdentityRegistry::new();
        let real = view();
        let weak = Arc::downgrade(&real);
        registry
            .bind_with(&real, || Ok(Substitute::new(real.class_id(), ())))
            .unwrap();

        drop(real);
        assert!(weak.upgrade().is_none());
        assert_eq!(registry.prune(), 1);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_binding_prunes_dead_objects() {
        let registry = IdentityRegistry::new();
        let kept: Vec<ObjectRef> = (0..10).map(|_| view()).collect();
        for real in &kept {
            registry
                .bind_with(real, || Ok(Substitute::new(real.class_id(), ())))
                .unwrap();
        }

        let state = Arc::new(());
        for _ in 0..1_000 {
            let real = view();
            let shared = Arc::clone(&state);
            registry
                .bind_with(&real, || Ok(Substitute::new(real.class_id(), shared)))
                .unwrap();
        }

        assert!(registry.len() <= PRUNE_THRESHOLD);
        assert!(Arc::strong_count(&state) <= PRUNE_THRESHOLD + 1);
        assert!(kept.iter().all(|real| registry.lookup(real).is_some()));
    }

    #[test]
    fn test_failed_factory_binds_nothing() {
        let registry = IdentityRegistry::new();
        let real = view();
        let result = registry.bind_with(&real, || {
            Err(crate::Error::InvalidState("factory failed".to_string()))
        });

        assert!(result.is_err());
        assert!(registry.lookup(&real).is_none());
    }

    #[test]
    fn test_static_binding_is_per_class() {
        let registry = IdentityRegistry::new();
        let class = ClassId::new(VIEW_CLASS);
        let first = registry
            .bind_static_with(&class, || Ok(Substitute::new(class.clone(), 0u8)))
            .unwrap();
        let second = registry
            .bind_static_with(&class, || Ok(Substitute::new(class.clone(), 1u8)))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.lookup_static(&class).is_some());
        registry.clear();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_binding_yields_one_substitute() {
        let registry = Arc::new(IdentityRegistry::new());
        let real = view();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let real = Arc::clone(&real);
                std::thread::spawn(move || {
                    registry
                        .bind_with(&real, || Ok(Substitute::new(real.class_id(), ())))
                        .unwrap()
                })
            })
            .collect();

        let substitutes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(substitutes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
