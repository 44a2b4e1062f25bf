//! Qualifier resolution: parsing a qualifier string and merging it onto a baseline.
//!
//! Two modes exist:
//!
//! - **Replacing** (`"land"`): the string is a complete description. Anything it does not
//!   name takes the platform default, never the baseline's value.
//! - **Additive** (`"+land"`): the string is overlaid onto the baseline. Categories it does
//!   not name keep the baseline's value, subject to the per-category [`MergeRules`].
//!
//! In both modes the version token is forced to the resolver's API level, and the operation
//! is atomic: a parse failure returns an error and produces no configuration.

use std::collections::HashMap;

use strum::{Display, EnumString, IntoEnumIterator};

use crate::{
    config::{
        configuration::{apply_rules, Configuration},
        device::{Density, Orientation},
        qualifiers::{QualifierCategory, Qualifiers},
    },
    Error, Result,
};

/// Prefix marking an additive qualifier string.
pub const ADDITIVE_MARKER: char = '+';

/// How an additive merge treats one category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum MergeMode {
    /// Keep the baseline value unless the new string names the category.
    Overlay,
    /// Like `Overlay`, but drop the baseline value (so it is recomputed) whenever the new
    /// string names another category of the same group. For the locale this also means a
    /// new locale replaces the old one whole instead of inheriting its script and region.
    Replace,
}

/// Categories whose values are derived from one another.
const GROUPS: &[&[QualifierCategory]] = &[
    &[QualifierCategory::Locale, QualifierCategory::LayoutDirection],
    &[
        QualifierCategory::SmallestWidth,
        QualifierCategory::Width,
        QualifierCategory::Height,
    ],
    &[QualifierCategory::ScreenSize, QualifierCategory::ScreenLong],
];

fn group_of(category: QualifierCategory) -> &'static [QualifierCategory] {
    GROUPS
        .iter()
        .copied()
        .find(|group| group.contains(&category))
        .unwrap_or(&[])
}

/// Per-category merge policy for additive resolution.
///
/// Defaults: locale, layout direction and smallest width use [`MergeMode::Replace`];
/// everything else uses [`MergeMode::Overlay`]. So `+ar` re-derives the layout direction
/// from the new locale, and `+w124dp` re-derives the smallest width, while `+land` leaves
/// the screen size bucket alone.
///
/// # Examples
///
/// ```rust
/// use shadowhost::config::{MergeMode, MergeRules, QualifierCategory};
///
/// let rules = MergeRules::default().with(QualifierCategory::Locale, MergeMode::Overlay);
/// assert_eq!(rules.mode(QualifierCategory::Locale), MergeMode::Overlay);
/// assert_eq!(rules.mode(QualifierCategory::SmallestWidth), MergeMode::Replace);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergeRules {
    modes: HashMap<QualifierCategory, MergeMode>,
}

impl Default for MergeRules {
    fn default() -> Self {
        let modes = [
            QualifierCategory::Locale,
            QualifierCategory::LayoutDirection,
            QualifierCategory::SmallestWidth,
        ]
        .into_iter()
        .map(|c| (c, MergeMode::Replace))
        .collect();
        Self { modes }
    }
}

impl MergeRules {
    /// Overrides the mode of one category.
    #[must_use]
    pub fn with(mut self, category: QualifierCategory, mode: MergeMode) -> Self {
        self.modes.insert(category, mode);
        self
    }

    /// Mode of `category`.
    #[must_use]
    pub fn mode(&self, category: QualifierCategory) -> MergeMode {
        self.modes
            .get(&category)
            .copied()
            .unwrap_or(MergeMode::Overlay)
    }

    /// Overlays `update` onto `baseline`.
    #[must_use]
    pub fn merge(&self, baseline: &Qualifiers, update: &Qualifiers) -> Qualifiers {
        let mut merged = baseline.clone();
        let mut touched: Vec<QualifierCategory> = QualifierCategory::iter()
            .filter(|c| update.is_set(*c))
            .collect();

        if let (Some(size), None, None) = (update.screen_size, update.width, update.height) {
            let (min_w, min_h) = size.min_dp();
            let width = merged.width.unwrap_or(0);
            let height = merged.height.unwrap_or(0);
            let landscape = match merged.orientation {
                Some(Orientation::Land) => true,
                Some(_) => false,
                None => width > height,
            };
            let (min_w, min_h) = if landscape { (min_h, min_w) } else { (min_w, min_h) };
            merged.width = Some(width.max(min_w));
            merged.height = Some(height.max(min_h));
            touched.push(QualifierCategory::Width);
        }

        for category in QualifierCategory::iter() {
            let mode = self.mode(category);
            if update.is_set(category) {
                let overlaid = category == QualifierCategory::Locale
                    && mode == MergeMode::Overlay
                    && overlay_locale(&mut merged, update);
                if !overlaid {
                    merged.copy_from(update, category);
                }
            } else if mode == MergeMode::Replace
                && group_of(category).iter().any(|c| touched.contains(c))
            {
                merged.clear(category);
            }
        }
        merged
    }
}

/// Merges a partial locale field by field. Returns `false` if there was nothing to merge.
fn overlay_locale(merged: &mut Qualifiers, update: &Qualifiers) -> bool {
    let (Some(old), Some(new)) = (merged.locale.as_mut(), update.locale.as_ref()) else {
        return false;
    };
    let script = new.script.clone().or_else(|| old.script.take());
    let region = new.region.clone().or_else(|| old.region.take());
    old.language.clone_from(&new.language);
    old.script = script;
    old.region = region;
    true
}

/// Resolves qualifier strings against a baseline at a fixed API level.
///
/// # Examples
///
/// ```rust
/// use shadowhost::config::{Configuration, QualifierResolver};
///
/// let resolver = QualifierResolver::new(28);
/// let first = resolver.resolve(&Configuration::default(), "w123dp-h456dp")?;
/// let second = resolver.resolve(&first, "+w124dp")?;
/// assert!(second.qualifier_string().contains("w124dp-h456dp"));
///
/// let replaced = resolver.resolve(&second, "land")?;
/// assert!(replaced.qualifier_string().contains("w470dp-h320dp"));
/// # Ok::<(), shadowhost::Error>(())
/// ```
#[derive(Clone, Debug)]
pub struct QualifierResolver {
    api_level: u32,
    rules: MergeRules,
}

impl QualifierResolver {
    /// Creates a resolver for `api_level` with the default merge rules.
    #[must_use]
    pub fn new(api_level: u32) -> Self {
        Self {
            api_level,
            rules: MergeRules::default(),
        }
    }

    /// Replaces the merge rules.
    #[must_use]
    pub fn with_rules(mut self, rules: MergeRules) -> Self {
        self.rules = rules;
        self
    }

    /// The API level appended as the version token.
    #[must_use]
    pub fn api_level(&self) -> u32 {
        self.api_level
    }

    /// The merge rules used for additive strings.
    #[must_use]
    pub fn rules(&self) -> &MergeRules {
        &self.rules
    }

    /// Resolves `qualifiers` against `baseline`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQualifier`] if a token cannot be parsed, or if the density
    /// token is `anydpi`/`nodpi`, which do not describe a device.
    pub fn resolve(&self, baseline: &Configuration, qualifiers: &str) -> Result<Configuration> {
        let trimmed = qualifiers.trim();
        let (additive, body) = match trimmed.strip_prefix(ADDITIVE_MARKER) {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };

        let parsed = Qualifiers::parse(body)?;
        if let Some(density @ (Density::Any | Density::NoDpi)) = parsed.density {
            return Err(Error::UnknownQualifier {
                token: density.to_string(),
                reason: "not a device density",
            });
        }
        if let Some(version) = parsed.version.filter(|v| *v != self.api_level) {
            log::warn!(
                "ignoring version qualifier v{version}, the host runs API {}",
                self.api_level
            );
        }

        let mut merged = if additive {
            self.rules.merge(&baseline.to_qualifiers(), &parsed)
        } else {
            parsed
        };
        merged.version = None;

        let config = apply_rules(&merged, self.api_level);
        log::debug!("resolved qualifiers '{qualifiers}' to {config}");
        Ok(config)
    }
}
