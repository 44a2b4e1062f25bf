//! Device configuration qualifiers.
//!
//! The simulated device is described by an effective [`Configuration`]: locale, screen
//! dimensions and buckets, density, input devices and platform version. Tests change it with
//! qualifier strings in the platform's resource-directory syntax, e.g. `fr-rCA-land-xhdpi`.
//!
//! # Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`device`] | Attribute enums, [`Density`] and [`Locale`] |
//! | [`qualifiers`] | [`QualifierCategory`] order and [`Qualifiers`] parsing |
//! | [`configuration`] | [`Configuration`], [`DisplayMetrics`] and the defaulting rules |
//! | [`resolver`] | [`QualifierResolver`] and additive [`MergeRules`] |
//! | [`resources`] | [`ResourceTable`] best-match lookup |
//!
//! # Resolution Pipeline
//!
//! ```text
//! "+w124dp" ──► parse ──► Qualifiers (partial)
//!                              │
//!                              ▼
//!               merge onto baseline (additive strings only)
//!                              │
//!                              ▼
//!               apply_rules(api_level) ──► Configuration (version = api_level)
//! ```

pub mod configuration;
pub mod device;
pub mod qualifiers;
pub mod resolver;
pub mod resources;

pub use configuration::{apply_rules, Configuration, DisplayMetrics};
pub use device::{
    ColorGamut, Density, Hdr, KeysHidden, Keyboard, LayoutDirection, Locale, NavHidden,
    Navigation, NightMode, Orientation, ScreenLong, ScreenRound, ScreenSize, Touchscreen,
    UiModeType, API_N, API_O, DEFAULT_API_LEVEL,
};
pub use qualifiers::{QualifierCategory, Qualifiers};
pub use resolver::{MergeMode, MergeRules, QualifierResolver, ADDITIVE_MARKER};
pub use resources::ResourceTable;
