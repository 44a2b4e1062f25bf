//! Call interception and substitute dispatch.
//!
//! This module is the core of the crate: the path every intercepted platform call takes on
//! its way to a test-supplied substitute ("shadow").
//!
//! # Overview
//!
//! - **Identity-preserving binding**: each real object gets exactly one substitute, created
//!   lazily on first interception and never keeping the real object alive
//! - **Direct calls**: a per-thread, single-shot escape hatch that runs the original body for
//!   exactly one call on one object
//! - **Typed shadows**: handlers keyed by method name and parameter descriptors, operating on
//!   strongly typed substitute state
//! - **Uniform values**: arguments are boxed losslessly into [`ShadowValue`]
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`object`] | [`PlatformObject`], [`ClassId`] and identity keys |
//! | [`value`] | [`ShadowValue`], [`autobox`] and the [`args!`](crate::args) macro |
//! | [`identity`] | [`IdentityRegistry`] binding real objects to substitutes |
//! | [`gate`] | [`DirectCallGate`] per-thread direct-call tokens |
//! | [`shadow`] | [`ShadowClass`] builder and the [`ShadowTable`] |
//! | [`dispatcher`] | [`Dispatcher`], the single dispatch entry point |
//! | [`construct`] | [`ObjectFactory`] for constructor-bypassing instantiation |
//!
//! # Examples
//!
//! ```rust
//! use std::sync::{atomic::{AtomicBool, Ordering}, Arc};
//! use shadowhost::{args, dispatch::*};
//!
//! #[derive(Debug)]
//! struct Button;
//! impl PlatformObject for Button {
//!     fn class_id(&self) -> ClassId { ClassId::new("android.widget.Button") }
//! }
//!
//! #[derive(Default)]
//! struct ShadowButton { enabled: AtomicBool }
//!
//! let mut table = ShadowTable::new();
//! table.register(
//!     ShadowClass::<ShadowButton>::new("android.widget.Button")
//!         .method("setEnabled", &["boolean"], |shadow, call| {
//!             let enabled = call.arg(0)?.as_bool().unwrap_or(false);
//!             shadow.enabled.store(enabled, Ordering::SeqCst);
//!             Ok(ShadowValue::Void)
//!         }),
//! );
//!
//! let dispatcher = Dispatcher::new(
//!     Arc::new(table),
//!     Arc::new(IdentityRegistry::new()),
//!     Arc::new(DirectCallGate::new()),
//! );
//!
//! let button: ObjectRef = Arc::new(Button);
//! let site = CallSite::new("android.widget.Button", "setEnabled", &["boolean"]);
//! dispatcher.dispatch(&site, Some(&button), &args![true], |_| Ok(ShadowValue::Void))?;
//!
//! let shadow = dispatcher.substitute_of(&button)?;
//! assert!(shadow.state::<ShadowButton>().unwrap().enabled.load(Ordering::SeqCst));
//! # Ok::<(), shadowhost::Error>(())
//! ```

pub mod construct;
pub mod dispatcher;
pub mod gate;
pub mod identity;
pub mod object;
pub mod shadow;
pub mod value;

pub use construct::{Constructor, ObjectFactory};
pub use dispatcher::{CallSite, Dispatcher, UnknownMethodBehavior};
pub use gate::{CallTarget, DirectCallGate};
pub use identity::{IdentityRegistry, Substitute};
pub use object::{downcast_object, AsAny, ClassId, ObjectId, ObjectRef, PlatformObject};
pub use shadow::{Invocation, ShadowClass, ShadowDefinition, ShadowHandler, ShadowTable, StateFactory};
pub use value::{autobox, ShadowValue};
