//! Fluent construction of a [`TestEnvironment`].

use std::{path::PathBuf, sync::Arc};

use crate::{
    config::{MergeRules, ResourceTable},
    dispatch::{
        ClassId, ObjectFactory, ObjectRef, ShadowDefinition, ShadowTable, ShadowValue,
        UnknownMethodBehavior,
    },
    environment::{
        application::{AppManifest, Application, ApplicationFactory, Manifest},
        config::EnvironmentConfig,
        context::RuntimeContext,
        lifecycle::TestEnvironment,
    },
    Error, Result,
};

/// Builder for creating [`TestEnvironment`] instances.
///
/// The shadow table and constructors are fixed once the environment is built; everything
/// else scoped to a single test is created at set-up.
///
/// # Examples
///
/// ```rust
/// use shadowhost::environment::{AppManifest, EnvironmentBuilder};
///
/// let env = EnvironmentBuilder::new()
///     .api_level(30)
///     .qualifiers("fr-rFR-land")
///     .manifest(AppManifest::new("com.example.app"))
///     .build()?;
///
/// env.set_up_application_state()?;
/// assert!(env.qualifiers()?.starts_with("fr-rFR-"));
/// env.tear_down_application();
/// # Ok::<(), shadowhost::Error>(())
/// ```
#[derive(Default)]
pub struct EnvironmentBuilder {
    config: EnvironmentConfig,
    shadows: ShadowTable,
    objects: ObjectFactory,
    manifest: Option<Arc<dyn Manifest>>,
    resources: ResourceTable,
    application: Option<ApplicationFactory>,
}

impl EnvironmentBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: EnvironmentConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the platform API level.
    #[must_use]
    pub fn api_level(mut self, api_level: u32) -> Self {
        self.config.api_level = api_level;
        self
    }

    /// Sets the initial qualifier string.
    #[must_use]
    pub fn qualifiers(mut self, qualifiers: &str) -> Self {
        self.config.qualifiers = qualifiers.to_string();
        self
    }

    /// Merges background scheduling into the foreground timeline.
    #[must_use]
    pub fn use_global_scheduler(mut self, global: bool) -> Self {
        self.config.use_global_scheduler = global;
        self
    }

    /// Sets what happens when a bound shadow lacks a handler.
    #[must_use]
    pub fn unknown_method(mut self, behavior: UnknownMethodBehavior) -> Self {
        self.config.unknown_method = behavior;
        self
    }

    /// Creates application storage under `root` instead of a temporary directory.
    #[must_use]
    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = Some(root.into());
        self
    }

    /// Sets the merge policy for additive qualifier strings.
    #[must_use]
    pub fn merge_rules(mut self, rules: MergeRules) -> Self {
        self.config.merge_rules = rules;
        self
    }

    /// Registers a shadow class.
    #[must_use]
    pub fn shadow(mut self, definition: impl Into<ShadowDefinition>) -> Self {
        self.shadows.register(definition);
        self
    }

    /// Registers a constructor for `class` with the given parameter types.
    #[must_use]
    pub fn constructor<F>(mut self, class: impl Into<ClassId>, params: &[&str], constructor: F) -> Self
    where
        F: Fn(&[ShadowValue]) -> Result<ObjectRef> + Send + Sync + 'static,
    {
        self.objects.register(class, params, constructor);
        self
    }

    /// Sets the manifest. Without one, an [`AppManifest`] for the configured package name is
    /// used.
    #[must_use]
    pub fn manifest(mut self, manifest: impl Manifest + 'static) -> Self {
        self.manifest = Some(Arc::new(manifest));
        self
    }

    /// Sets the application's resources.
    #[must_use]
    pub fn resources(mut self, resources: ResourceTable) -> Self {
        self.resources = resources;
        self
    }

    /// Sets how the application object is built at set-up.
    #[must_use]
    pub fn application<F, A>(mut self, factory: F) -> Self
    where
        F: Fn(&RuntimeContext) -> Result<A> + Send + Sync + 'static,
        A: Application + 'static,
    {
        self.application = Some(Arc::new(move |context: &RuntimeContext| {
            factory(context).map(|app| Arc::new(app) as Arc<dyn Application>)
        }));
        self
    }

    /// Builds the environment.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] for an API level of zero or an empty package name.
    pub fn build(self) -> Result<TestEnvironment> {
        if self.config.api_level == 0 {
            return Err(Error::InvalidState("API level must be positive".to_string()));
        }

        let manifest = match self.manifest {
            Some(manifest) => manifest,
            None => Arc::new(AppManifest::new(&self.config.package_name)),
        };
        if manifest.package_name().is_empty() {
            return Err(Error::InvalidState("package name must not be empty".to_string()));
        }

        log::debug!(
            "environment for {} with {} shadow(s)",
            manifest.package_name(),
            self.shadows.len()
        );

        Ok(TestEnvironment::new(
            self.config,
            Arc::new(self.shadows),
            Arc::new(self.objects),
            manifest,
            Arc::new(self.resources),
            self.application,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_api_level_rejected() {
        let result = EnvironmentBuilder::new().api_level(0).build();
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_empty_package_rejected() {
        let result = EnvironmentBuilder::new().manifest(AppManifest::new("")).build();
        assert!(matches!(result, Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_default_manifest_uses_configured_package() {
        let env = EnvironmentBuilder::new()
            .config(EnvironmentConfig {
                package_name: "com.example.configured".to_string(),
                ..Default::default()
            })
            .build()
            .unwrap();
        env.set_up_application_state().unwrap();
        assert_eq!(env.application_info().unwrap().package_name, "com.example.configured");
        env.tear_down_application();
    }
}
