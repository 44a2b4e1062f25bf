//! # shadowhost Prelude
//!
//! The most commonly used types and traits, for glob import.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all shadowhost operations
pub use crate::Error;

/// The result type used throughout shadowhost
pub use crate::Result;

// ================================================================================================
// Environment
// ================================================================================================

/// Environment lifecycle and construction
pub use crate::environment::{
    AppManifest, Application, ApplicationInfo, EnvironmentBuilder, EnvironmentConfig, Manifest,
    RuntimeContext, TestEnvironment,
};

// ================================================================================================
// Dispatch
// ================================================================================================

/// Interception and substitute dispatch
pub use crate::dispatch::{
    CallSite, ClassId, Dispatcher, Invocation, ObjectRef, PlatformObject, ShadowClass,
    ShadowValue, UnknownMethodBehavior,
};

/// Boxed argument lists
pub use crate::args;

// ================================================================================================
// Scheduling
// ================================================================================================

/// Virtual-time task queues
pub use crate::scheduler::{QueueName, Scheduler, SchedulerSet};

// ================================================================================================
// Configuration
// ================================================================================================

/// Device configuration and resources
pub use crate::config::{Configuration, DisplayMetrics, Locale, QualifierResolver, ResourceTable};
