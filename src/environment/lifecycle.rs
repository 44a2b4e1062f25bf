//! Set-up and tear-down of the simulated runtime.
//!
//! [`TestEnvironment`] is the only place a [`RuntimeContext`] is created or released.
//! Set-up is all-or-nothing: every piece is built locally and committed only once all of
//! them succeeded, so a failed attempt leaves nothing behind for the next test to observe.

use std::{
    sync::{Arc, Mutex, RwLock},
    thread::{self, ThreadId},
};

use crate::{
    config::{Configuration, DisplayMetrics, Locale, QualifierResolver, ResourceTable},
    dispatch::{DirectCallGate, Dispatcher, IdentityRegistry, ObjectFactory, ShadowTable},
    environment::{
        application::{
            Application, ApplicationFactory, ApplicationInfo, DefaultApplication, Manifest,
        },
        config::EnvironmentConfig,
        context::{ContextParts, RuntimeContext},
        storage::AppStorage,
    },
    scheduler::{Scheduler, SchedulerSet},
    Error, Result,
};

/// The simulated platform runtime for one test at a time.
///
/// Created through [`EnvironmentBuilder`](crate::environment::EnvironmentBuilder). The
/// environment can be set up and torn down repeatedly; each set-up gets a fresh
/// [`RuntimeContext`].
///
/// # Thread Safety
///
/// All methods take `&self` and the environment is [`Send`] + [`Sync`]. Tear-down may run on
/// a different thread than set-up.
///
/// # Examples
///
/// ```rust
/// use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
/// use shadowhost::environment::{Application, EnvironmentBuilder};
///
/// #[derive(Default)]
/// struct CountingApp(Arc<AtomicUsize>);
///
/// impl Application for CountingApp {
///     fn on_terminate(&self) {
///         self.0.fetch_add(1, Ordering::SeqCst);
///     }
/// }
///
/// let terminated = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&terminated);
/// let env = EnvironmentBuilder::new()
///     .application(move |_| Ok(CountingApp(Arc::clone(&counter))))
///     .build()?;
///
/// env.set_up_application_state()?;
/// assert!(env.is_main_thread());
/// env.tear_down_application();
/// assert_eq!(terminated.load(Ordering::SeqCst), 1);
/// # Ok::<(), shadowhost::Error>(())
/// ```
pub struct TestEnvironment {
    settings: RwLock<EnvironmentConfig>,
    shadows: Arc<ShadowTable>,
    objects: Arc<ObjectFactory>,
    manifest: Arc<dyn Manifest>,
    resources: Arc<ResourceTable>,
    application_factory: Option<ApplicationFactory>,
    lifecycle: Mutex<()>,
    context: RwLock<Option<Arc<RuntimeContext>>>,
    application: Mutex<Option<Arc<dyn Application>>>,
    main_thread: RwLock<Option<ThreadId>>,
}

impl TestEnvironment {
    pub(crate) fn new(
        settings: EnvironmentConfig,
        shadows: Arc<ShadowTable>,
        objects: Arc<ObjectFactory>,
        manifest: Arc<dyn Manifest>,
        resources: Arc<ResourceTable>,
        application_factory: Option<ApplicationFactory>,
    ) -> Self {
        Self {
            settings: RwLock::new(settings),
            shadows,
            objects,
            manifest,
            resources,
            application_factory,
            lifecycle: Mutex::new(()),
            context: RwLock::new(None),
            application: Mutex::new(None),
            main_thread: RwLock::new(None),
        }
    }

    /// Sets up the simulated runtime and makes the calling thread the main thread.
    ///
    /// In order: resolves the initial qualifiers, creates the schedulers, registry, gate and
    /// storage, resolves the manifest meta-data, builds the application, commits the context
    /// and finally calls [`Application::on_create`].
    ///
    /// An application installed with [`TestEnvironment::set_application`] is used instead of
    /// building a new one.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] - The environment is already set up
    /// * [`Error::UnknownQualifier`] - The configured qualifiers do not parse
    /// * [`Error::FileError`] - A storage directory could not be created
    /// * [`Error::ResourceNotFound`] - A manifest reference does not resolve
    /// * Any error from the application factory or `on_create`
    ///
    /// On error nothing is committed, except that an application whose `on_create` failed
    /// stays installed so that [`TestEnvironment::tear_down_application`] terminates it.
    pub fn set_up_application_state(&self) -> Result<()> {
        let _lifecycle = lock!(self.lifecycle);
        if read_lock!(self.context).is_some() {
            return Err(Error::InvalidState(
                "application state is already set up".to_string(),
            ));
        }

        let settings = read_lock!(self.settings).clone();
        let api_level = settings.api_level;

        let resolver = QualifierResolver::new(api_level).with_rules(settings.merge_rules.clone());
        let configuration =
            resolver.resolve(&Configuration::platform_default(api_level), &settings.qualifiers)?;

        let package_name = self.manifest.package_name();
        let storage = AppStorage::create(settings.storage_root.as_deref(), package_name, api_level)?;
        let meta_data = self.manifest.init_meta_data(&self.resources, &configuration)?;

        let application_info = ApplicationInfo {
            package_name: package_name.to_string(),
            class_name: self.manifest.application_class().map(str::to_string),
            target_sdk_version: api_level,
            source_dir: storage.source_dir().to_path_buf(),
            public_source_dir: storage.public_source_dir().to_path_buf(),
            data_dir: storage.data_dir().to_path_buf(),
            credential_protected_data_dir: storage
                .credential_protected_data_dir()
                .map(|p| p.to_path_buf()),
            device_protected_data_dir: storage.device_protected_data_dir().map(|p| p.to_path_buf()),
            meta_data,
        };

        let dispatcher = Dispatcher::new(
            Arc::clone(&self.shadows),
            Arc::new(IdentityRegistry::new()),
            Arc::new(DirectCallGate::new()),
        )
        .with_unknown_method(settings.unknown_method);

        let context = Arc::new(RuntimeContext::new(ContextParts {
            schedulers: SchedulerSet::new(settings.use_global_scheduler),
            configuration,
            resolver,
            dispatcher,
            objects: Arc::clone(&self.objects),
            resources: Arc::clone(&self.resources),
            application_info,
            storage,
        }));

        let installed = lock!(self.application).clone();
        let application = match (installed, &self.application_factory) {
            (Some(application), _) => application,
            (None, Some(factory)) => factory(context.as_ref())?,
            (None, None) => Arc::new(DefaultApplication),
        };

        let previous_main = write_lock!(self.main_thread).replace(thread::current().id());
        *write_lock!(self.context) = Some(Arc::clone(&context));
        *lock!(self.application) = Some(Arc::clone(&application));

        if let Err(error) = application.on_create() {
            log::warn!("application on_create failed, rolling back set-up: {error}");
            write_lock!(self.context).take();
            *write_lock!(self.main_thread) = previous_main;
            context.release();
            return Err(error);
        }

        log::debug!(
            "set up {package_name} on API {api_level} with qualifiers {}",
            context.qualifiers()
        );
        Ok(())
    }

    /// Terminates the application and releases the runtime context.
    ///
    /// Safe to call unconditionally: without an application this only logs a warning, and a
    /// second call finds nothing left to release. The application's
    /// [`Application::on_terminate`] runs at most once per installed application.
    pub fn tear_down_application(&self) {
        let _lifecycle = lock!(self.lifecycle);

        let application = lock!(self.application).take();
        match application {
            Some(application) => application.on_terminate(),
            None => log::warn!("tear-down without an application"),
        }

        let context = write_lock!(self.context).take();
        if let Some(context) = context {
            context.release();
            log::debug!("tore down {}", context.application_info().package_name);
        }
    }

    /// Returns `true` if the environment is currently set up.
    #[must_use]
    pub fn is_set_up(&self) -> bool {
        read_lock!(self.context).is_some()
    }

    /// The runtime context of the current set-up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn context(&self) -> Result<Arc<RuntimeContext>> {
        read_lock!(self.context)
            .clone()
            .ok_or_else(|| Error::InvalidState("application state is not set up".to_string()))
    }

    /// Returns `true` if the calling thread is the simulated main thread.
    #[must_use]
    pub fn is_main_thread(&self) -> bool {
        *read_lock!(self.main_thread) == Some(thread::current().id())
    }

    /// Makes `thread` the simulated main thread.
    pub fn set_main_thread(&self, thread: ThreadId) {
        *write_lock!(self.main_thread) = Some(thread);
    }

    /// The simulated main thread, if one was recorded.
    #[must_use]
    pub fn main_thread(&self) -> Option<ThreadId> {
        *read_lock!(self.main_thread)
    }

    /// Switches between merged and independent scheduler timelines.
    ///
    /// Applies to the running context, if any, and to every later set-up.
    pub fn set_use_global_scheduler(&self, global: bool) {
        write_lock!(self.settings).use_global_scheduler = global;
        if let Some(context) = read_lock!(self.context).as_ref() {
            context.set_use_global_scheduler(global);
        }
    }

    /// Returns `true` if background work runs on the foreground timeline.
    #[must_use]
    pub fn uses_global_scheduler(&self) -> bool {
        read_lock!(self.settings).use_global_scheduler
    }

    /// The main-thread scheduler shared by every simulated looper.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn master_scheduler(&self) -> Result<Arc<Scheduler>> {
        Ok(self.context()?.master_scheduler())
    }

    /// The foreground and background schedulers.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn schedulers(&self) -> Result<SchedulerSet> {
        Ok(self.context()?.schedulers())
    }

    /// Runs the foreground tasks due at the current virtual time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn idle_main_looper(&self) -> Result<usize> {
        Ok(self.context()?.idle_main_looper())
    }

    /// The dispatcher of the current set-up.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        Ok(self.context()?.dispatcher().clone())
    }

    /// The effective configuration as a canonical qualifier string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn qualifiers(&self) -> Result<String> {
        Ok(self.context()?.qualifiers())
    }

    /// The effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn configuration(&self) -> Result<Configuration> {
        Ok(self.context()?.configuration())
    }

    /// Display metrics of the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn display_metrics(&self) -> Result<DisplayMetrics> {
        Ok(self.context()?.display_metrics())
    }

    /// The locale of the effective configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn default_locale(&self) -> Result<Locale> {
        Ok(self.context()?.configuration().locale)
    }

    /// Changes the effective configuration and notifies the application.
    ///
    /// A string starting with `+` is merged into the current configuration; any other string
    /// replaces it.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] - The environment is not set up
    /// * [`Error::UnknownQualifier`] - The string does not parse; the configuration is unchanged
    pub fn set_qualifiers(&self, qualifiers: &str) -> Result<()> {
        let context = self.context()?;
        let configuration = context.apply_qualifiers(qualifiers)?;
        let application = lock!(self.application).clone();
        if let Some(application) = application {
            application.on_configuration_changed(&configuration);
        }
        Ok(())
    }

    /// Looks up `@kind/name` under the effective configuration.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidState`] - The environment is not set up
    /// * [`Error::ResourceNotFound`] - No variant matches
    pub fn get_resource(&self, kind: &str, name: &str) -> Result<String> {
        self.context()?.get_resource(kind, name)
    }

    /// Package information of the running application.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] if the environment is not set up.
    pub fn application_info(&self) -> Result<ApplicationInfo> {
        Ok(self.context()?.application_info().clone())
    }

    /// The installed application, if any.
    #[must_use]
    pub fn application(&self) -> Option<Arc<dyn Application>> {
        lock!(self.application).clone()
    }

    /// Installs `application` directly.
    ///
    /// The next tear-down terminates it; a later set-up uses it instead of building one.
    pub fn set_application(&self, application: Arc<dyn Application>) {
        let previous = lock!(self.application).replace(application);
        if previous.is_some() {
            log::debug!("replaced the installed application");
        }
    }

    /// The manifest this environment was built with.
    #[must_use]
    pub fn manifest(&self) -> &dyn Manifest {
        self.manifest.as_ref()
    }
}

impl std::fmt::Debug for TestEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnvironment")
            .field("package", &self.manifest.package_name())
            .field("set_up", &self.is_set_up())
            .field("main_thread", &self.main_thread())
            .finish()
    }
}
