//! Test environment configuration.
//!
//! [`EnvironmentConfig`] collects everything that shapes a simulated run: platform version,
//! initial device qualifiers, scheduler mode, dispatch strictness and where the application's
//! storage lives.
//!
//! # Configuration Presets
//!
//! - [`EnvironmentConfig::legacy()`] - Independent foreground and background queues (default)
//! - [`EnvironmentConfig::global_scheduler()`] - One merged timeline for both queues
//! - [`EnvironmentConfig::strict()`] - Unshadowed methods fail instead of returning void
//!
//! # Example
//!
//! ```rust
//! use shadowhost::environment::EnvironmentConfig;
//!
//! // Use a preset
//! let config = EnvironmentConfig::global_scheduler();
//!
//! // Or customize
//! let config = EnvironmentConfig {
//!     api_level: 30,
//!     qualifiers: "fr-rCA-land".to_string(),
//!     ..Default::default()
//! };
//! ```

use std::path::PathBuf;

use crate::{
    config::{MergeRules, DEFAULT_API_LEVEL},
    dispatch::UnknownMethodBehavior,
};

/// Package name used when none is configured.
pub const DEFAULT_PACKAGE_NAME: &str = "org.shadowhost.default";

/// Configuration of a [`TestEnvironment`](crate::environment::TestEnvironment).
///
/// # Default Configuration
///
/// - API level 28
/// - No qualifiers (platform defaults)
/// - Independent foreground and background schedulers
/// - Unshadowed methods return void
/// - Storage in a fresh temporary directory
#[derive(Clone, Debug)]
pub struct EnvironmentConfig {
    /// Platform API level; also the version qualifier of every resolved configuration.
    pub api_level: u32,

    /// Initial qualifier string, resolved against the platform defaults at set-up.
    pub qualifiers: String,

    /// Merge background scheduling into the foreground timeline.
    pub use_global_scheduler: bool,

    /// What a dispatch does when the bound shadow has no handler.
    pub unknown_method: UnknownMethodBehavior,

    /// Root for the application's storage directories.
    ///
    /// `None` creates a temporary directory that is removed when the environment is torn
    /// down.
    pub storage_root: Option<PathBuf>,

    /// Package name of the simulated application.
    pub package_name: String,

    /// Merge policy for additive (`+`) qualifier strings.
    pub merge_rules: MergeRules,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            api_level: DEFAULT_API_LEVEL,
            qualifiers: String::new(),
            use_global_scheduler: false,
            unknown_method: UnknownMethodBehavior::ReturnDefault,
            storage_root: None,
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            merge_rules: MergeRules::default(),
        }
    }
}

impl EnvironmentConfig {
    /// Independent foreground and background queues; only the foreground queue is idled
    /// implicitly.
    #[must_use]
    pub fn legacy() -> Self {
        Self::default()
    }

    /// Background work runs on the foreground timeline.
    #[must_use]
    pub fn global_scheduler() -> Self {
        Self {
            use_global_scheduler: true,
            ..Default::default()
        }
    }

    /// Every dispatched method must have a handler.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            unknown_method: UnknownMethodBehavior::Fail,
            ..Default::default()
        }
    }
}
