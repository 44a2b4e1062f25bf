//! Platform object identity.
//!
//! Intercepted calls carry the "real" framework object they were made on. This module
//! defines the [`PlatformObject`] trait those objects implement, the [`ClassId`] naming a
//! platform class, and [`ObjectId`], the identity key used by the registry and the direct-call
//! gate. Identity is always the allocation address of the shared object, never value equality:
//! two structurally identical objects must receive independent substitutes.

use std::{any::Any, fmt, sync::Arc};

/// Shared handle to a platform framework object.
pub type ObjectRef = Arc<dyn PlatformObject>;

/// Name of a platform framework class, e.g. `android.view.View`.
///
/// Cloning is cheap; the name is reference counted.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(Arc<str>);

impl ClassId {
    /// Creates a class identifier from its fully qualified name.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self(Arc::from(name))
    }

    /// Returns the fully qualified class name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Returns the simple name (the part after the last `.`).
    #[must_use]
    pub fn simple_name(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Debug for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ClassId({})", self.0)
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Upcast helper so trait objects can be downcast to their concrete type.
pub trait AsAny {
    /// Returns `self` as [`Any`].
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A real platform framework object whose calls are intercepted.
///
/// Implementors only need to name their class. Everything else about the object is opaque
/// to the dispatch layer.
///
/// # Examples
///
/// ```rust
/// use shadowhost::dispatch::{ClassId, PlatformObject};
///
/// #[derive(Debug)]
/// struct View;
///
/// impl PlatformObject for View {
///     fn class_id(&self) -> ClassId {
///         ClassId::new("android.view.View")
///     }
/// }
/// ```
pub trait PlatformObject: AsAny + Send + Sync + fmt::Debug {
    /// The class this object is an instance of.
    fn class_id(&self) -> ClassId;
}

/// Downcasts a platform object to its concrete type.
#[must_use]
pub fn downcast_object<T: Any>(object: &dyn PlatformObject) -> Option<&T> {
    object.as_any().downcast_ref::<T>()
}

/// Identity of a platform object: the address of its shared allocation.
///
/// An `ObjectId` is only meaningful while the object is alive. Holders that outlive the
/// object pair it with a [`std::sync::Weak`] to detect address reuse.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

impl ObjectId {
    /// Returns the identity of a shared object.
    #[must_use]
    pub fn of<T: ?Sized>(object: &Arc<T>) -> Self {
        Self(Arc::as_ptr(object).cast::<()>() as usize)
    }

    /// Returns the raw address value.
    #[must_use]
    pub fn value(&self) -> usize {
        self.0
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({:#x})", self.0)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Human readable `Class@address` description used in diagnostics.
pub(crate) fn describe<T: PlatformObject + ?Sized>(object: &Arc<T>) -> String {
    format!("{}@{}", object.class_id(), ObjectId::of(object))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestView;

    #[test]
    fn test_identity_is_by_reference() {
        let a: ObjectRef = Arc::new(TestView::default());
        let b: ObjectRef = Arc::new(TestView::default());
        let a2 = Arc::clone(&a);

        assert_eq!(ObjectId::of(&a), ObjectId::of(&a2));
        assert_ne!(ObjectId::of(&a), ObjectId::of(&b));
    }

    #[test]
    fn test_downcast() {
        let view: ObjectRef = Arc::new(TestView::default());
        assert!(downcast_object::<TestView>(view.as_ref()).is_some());
        assert!(downcast_object::<String>(view.as_ref()).is_none());
    }

    #[test]
    fn test_class_names() {
        let class = ClassId::new("android.view.View");
        assert_eq!(class.name(), "android.view.View");
        assert_eq!(class.simple_name(), "View");
        assert_eq!(class.to_string(), "android.view.View");
    }
}
