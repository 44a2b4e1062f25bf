//! Constructor table for building platform objects without going through their public API.
//!
//! Shadows and the environment sometimes need an instance of a platform class (an
//! application object, a framework singleton) whose normal construction path is unavailable
//! in the test host. All such construction goes through [`ObjectFactory`], which selects a
//! registered constructor by class and declared parameter types.

use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    dispatch::{
        object::{ClassId, ObjectRef},
        value::ShadowValue,
    },
    Error, Result,
};

/// Constructor closure. Receives the boxed arguments, already checked for arity.
pub type Constructor = Arc<dyn Fn(&[ShadowValue]) -> Result<ObjectRef> + Send + Sync>;

struct ConstructorEntry {
    params: Vec<String>,
    constructor: Constructor,
}

/// Registry of constructors keyed by class and parameter descriptors.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use shadowhost::dispatch::{ClassId, ObjectFactory, ObjectRef, PlatformObject};
///
/// #[derive(Debug)]
/// struct Intent { action: String }
/// impl PlatformObject for Intent {
///     fn class_id(&self) -> ClassId { ClassId::new("android.content.Intent") }
/// }
///
/// let mut factory = ObjectFactory::new();
/// factory.register("android.content.Intent", &["java.lang.String"], |args| {
///     let action = args[0].as_str().unwrap_or_default().to_string();
///     Ok(Arc::new(Intent { action }) as ObjectRef)
/// });
///
/// let intent = factory.new_instance(
///     &ClassId::new("android.content.Intent"),
///     &["java.lang.String"],
///     &shadowhost::args!["android.intent.action.MAIN"],
/// )?;
/// assert_eq!(intent.class_id().simple_name(), "Intent");
/// # Ok::<(), shadowhost::Error>(())
/// ```
#[derive(Default)]
pub struct ObjectFactory {
    constructors: HashMap<ClassId, Vec<ConstructorEntry>>,
}

impl ObjectFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor, replacing an earlier one with the same parameter list.
    pub fn register<F>(&mut self, class: impl Into<ClassId>, params: &[&str], constructor: F)
    where
        F: Fn(&[ShadowValue]) -> Result<ObjectRef> + Send + Sync + 'static,
    {
        let params: Vec<String> = params.iter().map(|p| (*p).to_string()).collect();
        let entries = self.constructors.entry(class.into()).or_default();
        let constructor: Constructor = Arc::new(constructor);
        match entries.iter_mut().find(|e| e.params == params) {
            Some(existing) => existing.constructor = constructor,
            None => entries.push(ConstructorEntry {
                params,
                constructor,
            }),
        }
    }

    /// Returns `true` if `class` has a constructor for `params`.
    #[must_use]
    pub fn has_constructor(&self, class: &ClassId, params: &[&str]) -> bool {
        self.find(class, params).is_some()
    }

    fn find(&self, class: &ClassId, params: &[&str]) -> Option<&Constructor> {
        self.constructors.get(class)?.iter().find_map(|entry| {
            entry
                .params
                .iter()
                .map(String::as_str)
                .eq(params.iter().copied())
                .then_some(&entry.constructor)
        })
    }

    /// Constructs `class` through its no-argument constructor.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoConstructor`] if no such constructor is registered.
    pub fn new_instance_of(&self, class: &ClassId) -> Result<ObjectRef> {
        self.new_instance(class, &[], &[])
    }

    /// Constructs `class` through the constructor declared with `params`.
    ///
    /// # Errors
    ///
    /// * [`Error::NoConstructor`] - No constructor matches `params`
    /// * [`Error::InvalidState`] - `args` does not match the arity of `params`
    /// * Any error raised by the constructor itself
    pub fn new_instance(
        &self,
        class: &ClassId,
        params: &[&str],
        args: &[ShadowValue],
    ) -> Result<ObjectRef> {
        let constructor = self.find(class, params).ok_or_else(|| Error::NoConstructor {
            class: class.to_string(),
            params: params.join(","),
        })?;

        if args.len() != params.len() {
            return Err(Error::InvalidState(format!(
                "{class}({}) called with {} arguments",
                params.join(","),
                args.len()
            )));
        }

        log::debug!("constructing {class}({})", params.join(","));
        constructor(args)
    }
}

impl fmt::Debug for ObjectFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectFactory")
            .field("classes", &self.constructors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, test::{TestView, VIEW_CLASS}};

    fn factory() -> ObjectFactory {
        let mut factory = ObjectFactory::new();
        factory.register(VIEW_CLASS, &[], |_| Ok(Arc::new(TestView::default()) as ObjectRef));
        factory.register(VIEW_CLASS, &["int"], |args| {
            let id = args[0].as_i32().unwrap_or_default();
            Ok(Arc::new(TestView::with_id(id)) as ObjectRef)
        });
        factory
    }

    #[test]
    fn test_selects_by_parameter_types() {
        let factory = factory();
        let class = ClassId::new(VIEW_CLASS);

        let plain = factory.new_instance_of(&class).unwrap();
        let with_id = factory.new_instance(&class, &["int"], &args![7i32]).unwrap();

        assert_eq!(plain.class_id(), class);
        let view = crate::dispatch::downcast_object::<TestView>(with_id.as_ref()).unwrap();
        assert_eq!(view.id, 7);
    }

    #[test]
    fn test_missing_constructor() {
        let factory = factory();
        let err = factory
            .new_instance(&ClassId::new(VIEW_CLASS), &["long"], &args![1i64])
            .unwrap_err();
        assert!(matches!(err, Error::NoConstructor { ref params, .. } if params == "long"));
    }

    #[test]
    fn test_arity_mismatch() {
        let factory = factory();
        let err = factory
            .new_instance(&ClassId::new(VIEW_CLASS), &["int"], &[])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
    }
}
