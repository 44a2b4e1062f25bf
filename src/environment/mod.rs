//! Environment lifecycle for simulated application runs.
//!
//! This module ties the other subsystems together. A [`TestEnvironment`] is built once with
//! its shadow table, constructors, manifest and resources; each test then sets it up, runs,
//! and tears it down again.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                       TestEnvironment                         │
//! │   settings · shadows · constructors · manifest · resources    │
//! ├───────────────────────────────────────────────────────────────┤
//! │ set_up_application_state()                                    │
//! │   resolve qualifiers ─► schedulers ─► storage ─► meta-data    │
//! │   ─► application ─► commit ─► on_create                       │
//! │                                                               │
//! │          ┌───────────────── RuntimeContext ──────────────┐    │
//! │          │ SchedulerSet  Configuration  Dispatcher       │    │
//! │          │ IdentityRegistry  DirectCallGate  AppStorage  │    │
//! │          └───────────────────────────────────────────────┘    │
//! │                                                               │
//! │ tear_down_application()                                       │
//! │   on_terminate ─► reset schedulers ─► clear registry/gate     │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Components
//!
//! - [`TestEnvironment`] - Set-up, tear-down and the main-thread marker
//! - [`EnvironmentBuilder`] - Fluent construction
//! - [`EnvironmentConfig`] - API level, qualifiers, scheduler mode and storage location
//! - [`RuntimeContext`] - State scoped to one set-up
//! - [`Application`] / [`Manifest`] - The simulated application
//! - [`AppStorage`] - The application's directory tree
//!
//! # Example
//!
//! ```rust
//! use shadowhost::environment::EnvironmentBuilder;
//!
//! let env = EnvironmentBuilder::new().qualifiers("w123dp-h456dp").build()?;
//! env.set_up_application_state()?;
//!
//! env.set_qualifiers("+land")?;
//! assert!(env.qualifiers()?.contains("w456dp-h123dp"));
//!
//! let scheduler = env.master_scheduler()?;
//! scheduler.post(|| {});
//! assert_eq!(env.idle_main_looper()?, 1);
//!
//! env.tear_down_application();
//! # Ok::<(), shadowhost::Error>(())
//! ```

pub mod application;
pub mod builder;
pub mod config;
pub mod context;
pub mod lifecycle;
pub mod storage;

pub use application::{
    AppManifest, Application, ApplicationFactory, ApplicationInfo, DefaultApplication, Manifest,
    MetaData,
};
pub use builder::EnvironmentBuilder;
pub use config::{EnvironmentConfig, DEFAULT_PACKAGE_NAME};
pub use context::RuntimeContext;
pub use lifecycle::TestEnvironment;
pub use storage::AppStorage;
