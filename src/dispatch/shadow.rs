//! Shadow definitions and the dispatch table.
//!
//! A shadow is described by a [`ShadowClass`] builder: a state factory producing the per-object
//! substitute state, plus handlers keyed by method name and parameter descriptors. Definitions
//! are collected into a [`ShadowTable`], which is immutable once the environment has been set
//! up, so lookups on the dispatch path never lock.

use std::{any::Any, collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use crate::{
    dispatch::{
        dispatcher::Dispatcher,
        identity::Substitute,
        object::{ClassId, ObjectRef},
        value::ShadowValue,
    },
    Error, Result,
};

/// Everything a handler sees about the call it is serving.
pub struct Invocation<'a> {
    /// Class the call was dispatched against.
    pub class: &'a ClassId,

    /// Method name.
    pub method: &'a str,

    /// Parameter type descriptors of the called signature.
    pub param_types: &'a [&'a str],

    /// The real receiver, `None` for static calls.
    pub instance: Option<&'a ObjectRef>,

    /// Boxed arguments, in call order.
    pub args: &'a [ShadowValue],

    /// The dispatcher serving this call, for re-entrant dispatch.
    pub dispatcher: &'a Dispatcher,
}

impl Invocation<'_> {
    /// Returns the argument at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the call has fewer arguments.
    pub fn arg(&self, index: usize) -> Result<&ShadowValue> {
        self.args.get(index).ok_or_else(|| {
            Error::InvalidState(format!(
                "{}.{} has no argument {index} ({} given)",
                self.class,
                self.method,
                self.args.len()
            ))
        })
    }

    /// Returns the receiver of an instance call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] for static calls.
    pub fn receiver(&self) -> Result<&ObjectRef> {
        self.instance.ok_or_else(|| {
            Error::InvalidState(format!("{}.{} is a static call", self.class, self.method))
        })
    }
}

/// Type-erased method handler stored in a [`ShadowDefinition`].
pub type ShadowHandler =
    Arc<dyn Fn(&Substitute, &Invocation<'_>) -> Result<ShadowValue> + Send + Sync>;

/// Type-erased state factory. Receives the real object, or `None` for the class-level state.
pub type StateFactory = Arc<dyn Fn(Option<&ObjectRef>) -> Result<Substitute> + Send + Sync>;

struct MethodEntry {
    params: Vec<String>,
    handler: ShadowHandler,
}

#[derive(Default)]
struct MethodTable {
    by_name: HashMap<String, Vec<MethodEntry>>,
}

impl MethodTable {
    fn insert(&mut self, name: &str, params: &[&str], handler: ShadowHandler) {
        let entries = self.by_name.entry(name.to_string()).or_default();
        let params: Vec<String> = params.iter().map(|p| (*p).to_string()).collect();
        if let Some(existing) = entries.iter_mut().find(|e| e.params == params) {
            existing.handler = handler;
        } else {
            entries.push(MethodEntry { params, handler });
        }
    }

    fn find(&self, name: &str, params: &[&str]) -> Option<&ShadowHandler> {
        self.by_name.get(name)?.iter().find_map(|entry| {
            entry
                .params
                .iter()
                .map(String::as_str)
                .eq(params.iter().copied())
                .then_some(&entry.handler)
        })
    }

    fn len(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }
}

/// A registered shadow: state factories and handlers for one platform class.
pub struct ShadowDefinition {
    class: ClassId,
    factory: StateFactory,
    methods: MethodTable,
    static_methods: MethodTable,
}

impl ShadowDefinition {
    /// The class this definition shadows.
    #[must_use]
    pub fn class(&self) -> &ClassId {
        &self.class
    }

    /// Creates substitute state for `real`, or the class-level state when `real` is `None`.
    ///
    /// # Errors
    ///
    /// Propagates failures of the registered factory.
    pub fn create_substitute(&self, real: Option<&ObjectRef>) -> Result<Substitute> {
        (self.factory)(real)
    }

    /// Finds the instance handler for a method signature.
    #[must_use]
    pub fn find_method(&self, name: &str, params: &[&str]) -> Option<&ShadowHandler> {
        self.methods.find(name, params)
    }

    /// Finds the static handler for a method signature.
    #[must_use]
    pub fn find_static_method(&self, name: &str, params: &[&str]) -> Option<&ShadowHandler> {
        self.static_methods.find(name, params)
    }

    /// Number of instance and static handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.methods.len() + self.static_methods.len()
    }
}

impl fmt::Debug for ShadowDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShadowDefinition")
            .field("class", &self.class)
            .field("methods", &self.methods.len())
            .field("static_methods", &self.static_methods.len())
            .finish()
    }
}

/// Typed builder for a [`ShadowDefinition`] whose substitute state is `S`.
///
/// Handlers receive `&S`; state that handlers mutate needs interior mutability.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use shadowhost::dispatch::{ShadowClass, ShadowValue};
///
/// #[derive(Default)]
/// struct ShadowView {
///     visibility: AtomicI32,
/// }
///
/// let definition = ShadowClass::<ShadowView>::new("android.view.View")
///     .method("setVisibility", &["int"], |shadow, call| {
///         let value = call.arg(0)?.as_i32().unwrap_or_default();
///         shadow.visibility.store(value, Ordering::SeqCst);
///         Ok(ShadowValue::Void)
///     })
///     .method("getVisibility", &[], |shadow, _| {
///         Ok(shadow.visibility.load(Ordering::SeqCst).into())
///     })
///     .build();
///
/// assert_eq!(definition.handler_count(), 2);
/// ```
pub struct ShadowClass<S> {
    class: ClassId,
    factory: Option<StateFactory>,
    methods: MethodTable,
    static_methods: MethodTable,
    _state: PhantomData<fn() -> S>,
}

impl<S> ShadowClass<S>
where
    S: Default + Any + Send + Sync,
{
    /// Starts a shadow for `class`. State defaults to `S::default()`.
    #[must_use]
    pub fn new(class: impl Into<ClassId>) -> Self {
        Self {
            class: class.into(),
            factory: None,
            methods: MethodTable::default(),
            static_methods: MethodTable::default(),
            _state: PhantomData,
        }
    }

    /// Builds instance state from the real object instead of `S::default()`.
    ///
    /// The class-level state used by static handlers is always `S::default()`.
    #[must_use]
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ObjectRef) -> S + Send + Sync + 'static,
    {
        let class = self.class.clone();
        self.factory = Some(Arc::new(move |real: Option<&ObjectRef>| {
            let state = real.map_or_else(S::default, &factory);
            Ok(Substitute::new(class.clone(), state))
        }));
        self
    }

    /// Registers an instance method handler.
    ///
    /// Registering the same name and parameter list twice replaces the earlier handler.
    #[must_use]
    pub fn method<F>(mut self, name: &str, params: &[&str], handler: F) -> Self
    where
        F: Fn(&S, &Invocation<'_>) -> Result<ShadowValue> + Send + Sync + 'static,
    {
        self.methods.insert(name, params, Self::erase(handler));
        self
    }

    /// Registers a static method handler.
    #[must_use]
    pub fn static_method<F>(mut self, name: &str, params: &[&str], handler: F) -> Self
    where
        F: Fn(&S, &Invocation<'_>) -> Result<ShadowValue> + Send + Sync + 'static,
    {
        self.static_methods.insert(name, params, Self::erase(handler));
        self
    }

    fn erase<F>(handler: F) -> ShadowHandler
    where
        F: Fn(&S, &Invocation<'_>) -> Result<ShadowValue> + Send + Sync + 'static,
    {
        Arc::new(move |substitute: &Substitute, call: &Invocation<'_>| {
            let state = substitute.state::<S>().ok_or_else(|| {
                Error::InvalidState(format!(
                    "substitute for {} does not hold {}",
                    substitute.class(),
                    std::any::type_name::<S>()
                ))
            })?;
            handler(state, call)
        })
    }

    /// Finishes the definition.
    #[must_use]
    pub fn build(self) -> ShadowDefinition {
        let factory: StateFactory = match self.factory {
            Some(factory) => factory,
            None => {
                let class = self.class.clone();
                Arc::new(move |_: Option<&ObjectRef>| {
                    Ok(Substitute::new(class.clone(), S::default()))
                })
            }
        };
        ShadowDefinition {
            class: self.class,
            factory,
            methods: self.methods,
            static_methods: self.static_methods,
        }
    }
}

impl<S> From<ShadowClass<S>> for ShadowDefinition
where
    S: Default + Any + Send + Sync,
{
    fn from(builder: ShadowClass<S>) -> Self {
        builder.build()
    }
}

/// Dispatch table: shadow definitions keyed by platform class.
#[derive(Default, Debug)]
pub struct ShadowTable {
    definitions: HashMap<ClassId, Arc<ShadowDefinition>>,
}

impl ShadowTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, replacing any earlier one for the same class.
    pub fn register(&mut self, definition: impl Into<ShadowDefinition>) {
        let definition = definition.into();
        if self
            .definitions
            .insert(definition.class.clone(), Arc::new(definition))
            .is_some()
        {
            log::debug!("replaced shadow definition");
        }
    }

    /// Returns the definition for `class`.
    #[must_use]
    pub fn find(&self, class: &ClassId) -> Option<&Arc<ShadowDefinition>> {
        self.definitions.get(class)
    }

    /// Returns `true` if `class` has a definition.
    #[must_use]
    pub fn contains(&self, class: &ClassId) -> bool {
        self.definitions.contains_key(class)
    }

    /// Number of shadowed classes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no class is shadowed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{CountingShadow, VIEW_CLASS};

    #[test]
    fn test_overloads_are_distinct() {
        let definition = ShadowClass::<CountingShadow>::new(VIEW_CLASS)
            .method("setAlpha", &["float"], |_, _| Ok(ShadowValue::I32(1)))
            .method("setAlpha", &["int"], |_, _| Ok(ShadowValue::I32(2)))
            .build();

        assert!(definition.find_method("setAlpha", &["float"]).is_some());
        assert!(definition.find_method("setAlpha", &["int"]).is_some());
        assert!(definition.find_method("setAlpha", &[]).is_none());
        assert!(definition.find_method("setAlpha", &["int", "int"]).is_none());
        assert_eq!(definition.handler_count(), 2);
    }

    #[test]
    fn test_reregistering_replaces_handler() {
        let definition = ShadowClass::<CountingShadow>::new(VIEW_CLASS)
            .method("invalidate", &[], |_, _| Ok(ShadowValue::I32(1)))
            .method("invalidate", &[], |_, _| Ok(ShadowValue::I32(2)))
            .build();
        assert_eq!(definition.handler_count(), 1);
    }

    #[test]
    fn test_static_and_instance_tables_are_separate() {
        let definition = ShadowClass::<CountingShadow>::new(VIEW_CLASS)
            .static_method("generateViewId", &[], |_, _| Ok(ShadowValue::I32(1)))
            .build();
        assert!(definition.find_method("generateViewId", &[]).is_none());
        assert!(definition.find_static_method("generateViewId", &[]).is_some());
    }

    #[test]
    fn test_default_factory() {
        let definition = ShadowClass::<CountingShadow>::new(VIEW_CLASS).build();
        let substitute = definition.create_substitute(None).unwrap();
        assert!(substitute.state::<CountingShadow>().is_some());
        assert_eq!(substitute.class().name(), VIEW_CLASS);
    }

    #[test]
    fn test_table_lookup() {
        let mut table = ShadowTable::new();
        table.register(ShadowClass::<CountingShadow>::new(VIEW_CLASS));

        assert!(table.contains(&ClassId::new(VIEW_CLASS)));
        assert!(table.find(&ClassId::new("android.app.Activity")).is_none());
        assert_eq!(table.len(), 1);
    }
}
