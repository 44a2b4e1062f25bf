//! Runtime context of a set-up environment.
//!
//! A [`RuntimeContext`] is created by
//! [`TestEnvironment::set_up_application_state`](crate::environment::TestEnvironment::set_up_application_state)
//! and dropped at tear-down. It owns everything scoped to one test: the schedulers, the
//! effective configuration, the identity registry, the direct-call gate and the storage tree.
//! A fresh context never observes state from a previous one.

use std::sync::{Arc, RwLock};

use crate::{
    config::{Configuration, DisplayMetrics, QualifierResolver, ResourceTable},
    dispatch::{DirectCallGate, Dispatcher, IdentityRegistry, ObjectFactory, ObjectRef},
    environment::{application::ApplicationInfo, storage::AppStorage},
    scheduler::{Scheduler, SchedulerSet},
    Result,
};

/// Per-test state of the simulated runtime.
pub struct RuntimeContext {
    schedulers: SchedulerSet,
    configuration: RwLock<Configuration>,
    resolver: QualifierResolver,
    dispatcher: Dispatcher,
    objects: Arc<ObjectFactory>,
    resources: Arc<ResourceTable>,
    application_info: ApplicationInfo,
    storage: AppStorage,
}

/// The pieces a [`RuntimeContext`] is assembled from.
pub(crate) struct ContextParts {
    pub schedulers: SchedulerSet,
    pub configuration: Configuration,
    pub resolver: QualifierResolver,
    pub dispatcher: Dispatcher,
    pub objects: Arc<ObjectFactory>,
    pub resources: Arc<ResourceTable>,
    pub application_info: ApplicationInfo,
    pub storage: AppStorage,
}

impl RuntimeContext {
    pub(crate) fn new(parts: ContextParts) -> Self {
        Self {
            schedulers: parts.schedulers,
            configuration: RwLock::new(parts.configuration),
            resolver: parts.resolver,
            dispatcher: parts.dispatcher,
            objects: parts.objects,
            resources: parts.resources,
            application_info: parts.application_info,
            storage: parts.storage,
        }
    }

    /// Handle to this context's scheduler set.
    ///
    /// The handle shares the context's queues and mode, so it keeps working across
    /// [`TestEnvironment::set_use_global_scheduler`](crate::environment::TestEnvironment::set_use_global_scheduler)
    /// switches.
    #[must_use]
    pub fn schedulers(&self) -> SchedulerSet {
        self.schedulers.clone()
    }

    /// The main-thread scheduler.
    #[must_use]
    pub fn master_scheduler(&self) -> Arc<Scheduler> {
        self.schedulers.foreground()
    }

    /// The scheduler background work is currently posted to.
    ///
    /// Resolved at call time; after a global mode switch ask again, or post through
    /// [`RuntimeContext::schedulers`].
    #[must_use]
    pub fn background_scheduler(&self) -> Arc<Scheduler> {
        self.schedulers.background()
    }

    pub(crate) fn set_use_global_scheduler(&self, global: bool) {
        self.schedulers.set_global(global);
    }

    /// Runs every foreground task due at the current virtual time.
    ///
    /// Returns the number of tasks run.
    pub fn idle_main_looper(&self) -> usize {
        self.master_scheduler().idle()
    }

    /// Snapshot of the effective configuration.
    #[must_use]
    pub fn configuration(&self) -> Configuration {
        read_lock!(self.configuration).clone()
    }

    /// The effective configuration as a canonical qualifier string.
    #[must_use]
    pub fn qualifiers(&self) -> String {
        read_lock!(self.configuration).qualifier_string()
    }

    /// Display metrics derived from the effective configuration.
    #[must_use]
    pub fn display_metrics(&self) -> DisplayMetrics {
        read_lock!(self.configuration).display_metrics()
    }

    /// Resolves `qualifiers` against the effective configuration and installs the result.
    ///
    /// The write lock is held across resolution, so concurrent updates apply one after the
    /// other and a failed resolution leaves the configuration untouched.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnknownQualifier`] if the string does not parse.
    pub(crate) fn apply_qualifiers(&self, qualifiers: &str) -> Result<Configuration> {
        let mut current = write_lock!(self.configuration);
        let resolved = self.resolver.resolve(&current, qualifiers)?;
        *current = resolved.clone();
        log::debug!("qualifiers now {resolved}");
        Ok(resolved)
    }

    /// The dispatcher bound to this context's registry and gate.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// The registered constructors.
    #[must_use]
    pub fn objects(&self) -> &ObjectFactory {
        &self.objects
    }

    /// Constructs `class` through its no-argument constructor.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoConstructor`] if none is registered.
    pub fn new_instance_of(&self, class: &str) -> Result<ObjectRef> {
        self.objects.new_instance_of(&class.into())
    }

    /// The application's resources.
    #[must_use]
    pub fn resources(&self) -> &ResourceTable {
        &self.resources
    }

    /// Looks up `@kind/name` under the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ResourceNotFound`] if no variant matches.
    pub fn get_resource(&self, kind: &str, name: &str) -> Result<String> {
        let configuration = read_lock!(self.configuration);
        self.resources
            .get(kind, name, &configuration)
            .map(str::to_string)
    }

    /// Package information of the running application.
    #[must_use]
    pub fn application_info(&self) -> &ApplicationInfo {
        &self.application_info
    }

    /// The application's storage tree.
    #[must_use]
    pub fn storage(&self) -> &AppStorage {
        &self.storage
    }

    /// The identity registry.
    #[must_use]
    pub fn registry(&self) -> &IdentityRegistry {
        self.dispatcher.registry()
    }

    /// The direct-call gate.
    #[must_use]
    pub fn gate(&self) -> &DirectCallGate {
        self.dispatcher.gate()
    }

    /// Drops all pending work and bindings.
    pub(crate) fn release(&self) {
        self.schedulers.reset_all();
        self.dispatcher.registry().clear();
        self.dispatcher.gate().clear_all();
    }
}

impl std::fmt::Debug for RuntimeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuntimeContext")
            .field("package", &self.application_info.package_name)
            .field("qualifiers", &self.qualifiers())
            .field("schedulers", &self.schedulers)
            .finish()
    }
}
