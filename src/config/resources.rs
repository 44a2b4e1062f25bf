//! In-memory resource table with qualifier-based variant selection.
//!
//! Resources are plain string values keyed by type and name (`@string/app_name`). Each may
//! carry several variants, each tagged with the qualifiers it was declared under. Lookup picks
//! the variant best matching the effective [`Configuration`]:
//!
//! 1. Drop variants contradicting the configuration.
//! 2. Walk the categories in canonical order. Where some remaining variants name the
//!    category, keep only those scoring best for it.
//! 3. The first survivor wins.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::{
    config::{
        configuration::Configuration,
        device::{Density, DENSITY_DEFAULT},
        qualifiers::{QualifierCategory, Qualifiers},
    },
    Error, Result,
};

#[derive(Debug, Clone)]
struct Variant {
    qualifiers: Qualifiers,
    value: String,
}

/// Table of resource values.
///
/// # Examples
///
/// ```rust
/// use shadowhost::config::{Configuration, QualifierResolver, ResourceTable};
///
/// let mut table = ResourceTable::new();
/// table.add("string", "greeting", "", "Hello")?;
/// table.add("string", "greeting", "fr", "Bonjour")?;
///
/// let french = QualifierResolver::new(28).resolve(&Configuration::default(), "fr-rFR")?;
/// assert_eq!(table.get("string", "greeting", &french)?, "Bonjour");
/// assert_eq!(table.get("string", "greeting", &Configuration::default())?, "Hello");
/// # Ok::<(), shadowhost::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    entries: HashMap<(String, String), Vec<Variant>>,
}

impl ResourceTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a variant of `@kind/name` declared under `qualifiers` (`""` for the default).
    ///
    /// A second variant with identical qualifiers replaces the first.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQualifier`] if `qualifiers` does not parse.
    pub fn add(&mut self, kind: &str, name: &str, qualifiers: &str, value: &str) -> Result<()> {
        let qualifiers = Qualifiers::parse(qualifiers)?;
        let variants = self
            .entries
            .entry((kind.to_string(), name.to_string()))
            .or_default();
        match variants.iter_mut().find(|v| v.qualifiers == qualifiers) {
            Some(existing) => existing.value = value.to_string(),
            None => variants.push(Variant {
                qualifiers,
                value: value.to_string(),
            }),
        }
        Ok(())
    }

    /// Returns `true` if any variant of `@kind/name` exists.
    #[must_use]
    pub fn contains(&self, kind: &str, name: &str) -> bool {
        self.entries
            .contains_key(&(kind.to_string(), name.to_string()))
    }

    /// Number of distinct resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selects the value of `@kind/name` best matching `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] if the resource does not exist or no variant is
    /// compatible with `config`.
    pub fn get(&self, kind: &str, name: &str, config: &Configuration) -> Result<&str> {
        let not_found = || Error::ResourceNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
            qualifiers: config.qualifier_string(),
        };

        let variants = self
            .entries
            .get(&(kind.to_string(), name.to_string()))
            .ok_or_else(not_found)?;

        let mut candidates: Vec<&Variant> = variants
            .iter()
            .filter(|v| is_compatible(&v.qualifiers, config))
            .collect();

        for category in QualifierCategory::iter() {
            let best = candidates
                .iter()
                .filter_map(|v| score(&v.qualifiers, category, config))
                .max();
            if let Some(best) = best {
                candidates.retain(|v| score(&v.qualifiers, category, config) == Some(best));
            }
            if candidates.len() <= 1 {
                break;
            }
        }

        candidates
            .first()
            .map(|v| v.value.as_str())
            .ok_or_else(not_found)
    }

    /// Resolves `@kind/name` references; any other value is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResourceNotFound`] for a reference that does not resolve.
    pub fn resolve_reference<'a>(&'a self, value: &'a str, config: &Configuration) -> Result<&'a str> {
        let Some((kind, name)) = value.strip_prefix('@').and_then(|r| r.split_once('/')) else {
            return Ok(value);
        };
        self.get(kind, name, config)
    }
}

fn is_compatible(variant: &Qualifiers, config: &Configuration) -> bool {
    let locale_ok = variant.locale.as_ref().map_or(true, |locale| {
        locale.language == config.locale.language
            && locale
                .script
                .as_ref()
                .map_or(true, |s| config.locale.script.as_ref() == Some(s))
            && locale
                .region
                .as_ref()
                .map_or(true, |r| config.locale.region.as_ref() == Some(r))
    });

    fn eq<T: PartialEq>(want: Option<T>, have: T) -> bool {
        want.map_or(true, |w| w == have)
    }
    fn at_most<T: PartialOrd>(want: Option<T>, have: T) -> bool {
        want.map_or(true, |w| w <= have)
    }

    locale_ok
        && variant.mcc.map_or(true, |m| config.mcc == Some(m))
        && variant.mnc.map_or(true, |m| config.mnc == Some(m))
        && eq(variant.layout_direction, config.layout_direction)
        && at_most(variant.smallest_width, config.smallest_width_dp)
        && at_most(variant.width, config.screen_width_dp)
        && at_most(variant.height, config.screen_height_dp)
        && at_most(variant.screen_size, config.screen_size)
        && eq(variant.screen_long, config.screen_long)
        && eq(variant.screen_round, config.screen_round)
        && variant.color_gamut.map_or(true, |c| config.color_gamut == Some(c))
        && variant.hdr.map_or(true, |h| config.hdr == Some(h))
        && eq(variant.orientation, config.orientation)
        && variant.ui_mode_type.map_or(true, |u| config.ui_mode_type == Some(u))
        && eq(variant.night_mode, config.night_mode)
        && eq(variant.touchscreen, config.touchscreen)
        && eq(variant.keys_hidden, config.keys_hidden)
        && eq(variant.keyboard, config.keyboard)
        && eq(variant.nav_hidden, config.nav_hidden)
        && eq(variant.navigation, config.navigation)
        && at_most(variant.version, config.version)
}

/// How well a compatible variant matches `config` in one category; `None` if it does not
/// name the category. Higher is better.
fn score(variant: &Qualifiers, category: QualifierCategory, config: &Configuration) -> Option<u64> {
    if !variant.is_set(category) {
        return None;
    }
    let value = match category {
        QualifierCategory::Locale => variant.locale.as_ref().map_or(0, |l| {
            1 + u64::from(l.script.is_some()) + u64::from(l.region.is_some())
        }),
        QualifierCategory::SmallestWidth => variant.smallest_width.map_or(0, u64::from),
        QualifierCategory::Width => variant.width.map_or(0, u64::from),
        QualifierCategory::Height => variant.height.map_or(0, u64::from),
        QualifierCategory::ScreenSize => variant.screen_size.map_or(0, |s| s as u64),
        QualifierCategory::Version => variant.version.map_or(0, u64::from),
        QualifierCategory::Density => density_score(variant.density, config.density),
        _ => 1,
    };
    Some(value)
}

/// Exact density first, then the nearest higher one (scaled down), then the nearest lower.
fn density_score(variant: Option<Density>, device: Density) -> u64 {
    let target = u64::from(device.dpi().unwrap_or(DENSITY_DEFAULT));
    match variant {
        Some(Density::Any) => 3_000_000,
        Some(Density::Dpi(dpi)) => {
            let dpi = u64::from(dpi);
            if dpi == target {
                2_000_000
            } else if dpi > target {
                1_000_000 - (dpi - target)
            } else {
                dpi
            }
        }
        Some(Density::NoDpi) | None => 1,
    }
}
