//! The simulated application: its lifecycle callbacks, manifest and package information.

use std::{collections::BTreeMap, fmt, path::PathBuf, sync::Arc};

use crate::{
    config::{Configuration, ResourceTable},
    environment::context::RuntimeContext,
    Result,
};

/// Lifecycle callbacks of the simulated application object.
///
/// All callbacks have empty default implementations.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use shadowhost::environment::Application;
///
/// #[derive(Default)]
/// struct MyApp {
///     terminated: AtomicBool,
/// }
///
/// impl Application for MyApp {
///     fn on_terminate(&self) {
///         self.terminated.store(true, Ordering::SeqCst);
///     }
/// }
/// ```
pub trait Application: Send + Sync {
    /// Called once the environment is set up.
    ///
    /// # Errors
    ///
    /// A failure aborts set-up; the application stays installed so tear-down still
    /// terminates it.
    fn on_create(&self) -> Result<()> {
        Ok(())
    }

    /// Called after the effective configuration changed.
    fn on_configuration_changed(&self, _configuration: &Configuration) {}

    /// Called exactly once when the environment is torn down.
    fn on_terminate(&self) {}
}

/// Application used when none is configured.
#[derive(Debug, Default)]
pub struct DefaultApplication;

impl Application for DefaultApplication {}

/// Builds the application object once the runtime context exists.
pub type ApplicationFactory =
    Arc<dyn Fn(&RuntimeContext) -> Result<Arc<dyn Application>> + Send + Sync>;

/// Resolved `<meta-data>` entries, by name.
pub type MetaData = BTreeMap<String, String>;

/// The application's manifest.
pub trait Manifest: Send + Sync + fmt::Debug {
    /// Package name, e.g. `com.example.app`.
    fn package_name(&self) -> &str;

    /// Fully qualified application class, if the manifest names one.
    fn application_class(&self) -> Option<&str> {
        None
    }

    /// Resolves the manifest's meta-data against the resource table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`](crate::Error::ResourceNotFound) for a reference
    /// with no matching resource.
    fn init_meta_data(&self, resources: &ResourceTable, config: &Configuration) -> Result<MetaData>;
}

/// A manifest described in code.
///
/// Meta-data values of the form `@type/name` are resolved through the resource table at
/// set-up; other values are kept verbatim.
///
/// # Examples
///
/// ```rust
/// use shadowhost::config::{Configuration, ResourceTable};
/// use shadowhost::environment::{AppManifest, Manifest};
///
/// let mut resources = ResourceTable::new();
/// resources.add("string", "api_key", "", "k-123")?;
///
/// let manifest = AppManifest::new("com.example.app")
///     .with_meta_data("com.example.API_KEY", "@string/api_key")
///     .with_meta_data("com.example.MODE", "debug");
///
/// let meta = manifest.init_meta_data(&resources, &Configuration::default())?;
/// assert_eq!(meta["com.example.API_KEY"], "k-123");
/// assert_eq!(meta["com.example.MODE"], "debug");
/// # Ok::<(), shadowhost::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct AppManifest {
    package_name: String,
    application_class: Option<String>,
    meta_data: Vec<(String, String)>,
}

impl AppManifest {
    /// Creates a manifest for `package_name` with no meta-data.
    #[must_use]
    pub fn new(package_name: &str) -> Self {
        Self {
            package_name: package_name.to_string(),
            application_class: None,
            meta_data: Vec::new(),
        }
    }

    /// Names the application class.
    #[must_use]
    pub fn with_application_class(mut self, class: &str) -> Self {
        self.application_class = Some(class.to_string());
        self
    }

    /// Adds a meta-data entry.
    #[must_use]
    pub fn with_meta_data(mut self, name: &str, value: &str) -> Self {
        self.meta_data.push((name.to_string(), value.to_string()));
        self
    }
}

impl Manifest for AppManifest {
    fn package_name(&self) -> &str {
        &self.package_name
    }

    fn application_class(&self) -> Option<&str> {
        self.application_class.as_deref()
    }

    fn init_meta_data(&self, resources: &ResourceTable, config: &Configuration) -> Result<MetaData> {
        self.meta_data
            .iter()
            .map(|(name, value)| {
                let resolved = resources.resolve_reference(value, config)?;
                Ok((name.clone(), resolved.to_string()))
            })
            .collect()
    }
}

/// Package information of the running application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationInfo {
    /// Package name.
    pub package_name: String,
    /// Application class named by the manifest.
    pub class_name: Option<String>,
    /// API level the application runs against.
    pub target_sdk_version: u32,
    /// Directory holding the application's code.
    pub source_dir: PathBuf,
    /// Publicly readable code directory.
    pub public_source_dir: PathBuf,
    /// Private data directory.
    pub data_dir: PathBuf,
    /// Credential-protected data directory, API 24 and later.
    pub credential_protected_data_dir: Option<PathBuf>,
    /// Device-protected data directory, API 24 and later.
    pub device_protected_data_dir: Option<PathBuf>,
    /// Resolved manifest meta-data.
    pub meta_data: MetaData,
}
