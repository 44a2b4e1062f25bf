// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # shadowhost
//!
//! Runs code written against a platform application framework inside a plain test host.
//! Calls that would reach a framework class are intercepted and handed to a per-test
//! substitute ("shadow"), while the platform's threading and device-configuration model is
//! simulated deterministically in a single process.
//!
//! ## Features
//!
//! - **Call interception** - One dispatch entry point resolves a shadow per real object,
//!   keeps identity stable and never extends the real object's lifetime
//! - **Direct calls** - A per-thread, single-shot escape hatch to run the original body
//! - **Virtual time** - Foreground and background queues driven by explicit clock advances,
//!   optionally merged into one timeline
//! - **Device qualifiers** - Locale, screen, density and friends parsed, defaulted and
//!   merged exactly like the platform does
//! - **Environment lifecycle** - All-or-nothing set-up, exactly-once termination and a
//!   main-thread marker that follows the thread that set up
//!
//! ## Quick Start
//!
//! ```rust
//! use shadowhost::prelude::*;
//!
//! let env = EnvironmentBuilder::new()
//!     .qualifiers("fr-rFR-w360dp-h640dp")
//!     .build()?;
//! env.set_up_application_state()?;
//!
//! assert!(env.is_main_thread());
//! assert_eq!(env.default_locale()?.language, "fr");
//!
//! let scheduler = env.master_scheduler()?;
//! scheduler.post_delayed(100, || {});
//! assert_eq!(scheduler.advance_by(100), 1);
//!
//! env.tear_down_application();
//! # Ok::<(), shadowhost::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`dispatch`] - Shadow table, identity registry, direct-call gate and the dispatcher
//! - [`scheduler`] - Deterministic virtual-time task queues
//! - [`config`] - Qualifier parsing, platform defaults, additive merging and resources
//! - [`environment`] - Set-up, tear-down and the per-test runtime context
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result). Nothing is retried
//! internally: every operation is in-memory and deterministic.
//!
//! ```rust
//! use shadowhost::{Error, environment::EnvironmentBuilder};
//!
//! let env = EnvironmentBuilder::new().build()?;
//! match env.qualifiers() {
//!     Err(Error::InvalidState(message)) => println!("not set up yet: {message}"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! # Ok::<(), shadowhost::Error>(())
//! ```
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and never installs a logger itself.
#[macro_use]
pub(crate) mod macros;

pub(crate) mod error;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use shadowhost::prelude::*;
///
/// let env = EnvironmentBuilder::new().build()?;
/// env.set_up_application_state()?;
/// let metrics: DisplayMetrics = env.display_metrics()?;
/// assert_eq!(metrics.density_dpi, 160);
/// env.tear_down_application();
/// # Ok::<(), shadowhost::Error>(())
/// ```
pub mod prelude;

pub mod config;
pub mod dispatch;
pub mod environment;
pub mod scheduler;

/// `shadowhost` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// `shadowhost` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
