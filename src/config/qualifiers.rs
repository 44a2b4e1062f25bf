//! Qualifier string parsing.
//!
//! A qualifier string is a `-` separated list of tokens, each naming the value of one
//! [`QualifierCategory`]. Categories must appear in their canonical order and at most once,
//! e.g. `en-rUS-w360dp-h640dp-land-xhdpi`. Parsing produces a partial [`Qualifiers`] value:
//! only the categories named by the string are set.

use std::{fmt, str::FromStr};

use strum::{Display, EnumIter, IntoEnumIterator};

use crate::{
    config::device::{
        ColorGamut, Density, Hdr, KeysHidden, Keyboard, LayoutDirection, Locale, NavHidden,
        Navigation, NightMode, Orientation, ScreenLong, ScreenRound, ScreenSize, Touchscreen,
        UiModeType,
    },
    Error, Result,
};

/// Qualifier categories in canonical order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum QualifierCategory {
    /// Mobile country code, `mcc310`.
    Mcc,
    /// Mobile network code, `mnc004`.
    Mnc,
    /// Language, script and region.
    Locale,
    /// `ldltr` / `ldrtl`.
    LayoutDirection,
    /// `sw600dp`.
    SmallestWidth,
    /// `w720dp`.
    Width,
    /// `h1024dp`.
    Height,
    /// `small` .. `xlarge`.
    ScreenSize,
    /// `long` / `notlong`.
    ScreenLong,
    /// `round` / `notround`.
    ScreenRound,
    /// `widecg` / `nowidecg`.
    ColorGamut,
    /// `highdr` / `lowdr`.
    Hdr,
    /// `port` / `land` / `square`.
    Orientation,
    /// `car`, `desk`, `television`, ...
    UiModeType,
    /// `night` / `notnight`.
    NightMode,
    /// `mdpi`, `xhdpi`, `420dpi`, ...
    Density,
    /// `notouch` / `stylus` / `finger`.
    Touchscreen,
    /// `keysexposed` / `keyshidden` / `keyssoft`.
    KeysHidden,
    /// `nokeys` / `qwerty` / `12key`.
    Keyboard,
    /// `navexposed` / `navhidden`.
    NavHidden,
    /// `nonav` / `dpad` / `trackball` / `wheel`.
    Navigation,
    /// `v28`.
    Version,
}

/// A partially specified device configuration: one optional value per category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Qualifiers {
    pub mcc: Option<u16>,
    pub mnc: Option<u16>,
    pub locale: Option<Locale>,
    pub layout_direction: Option<LayoutDirection>,
    pub smallest_width: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub screen_size: Option<ScreenSize>,
    pub screen_long: Option<ScreenLong>,
    pub screen_round: Option<ScreenRound>,
    pub color_gamut: Option<ColorGamut>,
    pub hdr: Option<Hdr>,
    pub orientation: Option<Orientation>,
    pub ui_mode_type: Option<UiModeType>,
    pub night_mode: Option<NightMode>,
    pub density: Option<Density>,
    pub touchscreen: Option<Touchscreen>,
    pub keys_hidden: Option<KeysHidden>,
    pub keyboard: Option<Keyboard>,
    pub nav_hidden: Option<NavHidden>,
    pub navigation: Option<Navigation>,
    pub version: Option<u32>,
}

macro_rules! category_fields {
    ($($category:ident => $field:ident),+ $(,)?) => {
        impl Qualifiers {
            /// Returns `true` if `category` has a value.
            #[must_use]
            pub fn is_set(&self, category: QualifierCategory) -> bool {
                match category {
                    $(QualifierCategory::$category => self.$field.is_some(),)+
                }
            }

            /// Copies the value of `category` from `other`, including an absent value.
            pub fn copy_from(&mut self, other: &Qualifiers, category: QualifierCategory) {
                match category {
                    $(QualifierCategory::$category => self.$field = other.$field.clone(),)+
                }
            }

            /// Clears the value of `category`.
            pub fn clear(&mut self, category: QualifierCategory) {
                match category {
                    $(QualifierCategory::$category => self.$field = None,)+
                }
            }
        }
    };
}

category_fields! {
    Mcc => mcc,
    Mnc => mnc,
    Locale => locale,
    LayoutDirection => layout_direction,
    SmallestWidth => smallest_width,
    Width => width,
    Height => height,
    ScreenSize => screen_size,
    ScreenLong => screen_long,
    ScreenRound => screen_round,
    ColorGamut => color_gamut,
    Hdr => hdr,
    Orientation => orientation,
    UiModeType => ui_mode_type,
    NightMode => night_mode,
    Density => density,
    Touchscreen => touchscreen,
    KeysHidden => keys_hidden,
    Keyboard => keyboard,
    NavHidden => nav_hidden,
    Navigation => navigation,
    Version => version,
}

/// Parses `<prefix><digits><suffix>`.
fn prefixed_number<T: FromStr>(token: &str, prefix: &str, suffix: &str) -> Option<T> {
    let digits = token.strip_prefix(prefix)?.strip_suffix(suffix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn is_language(token: &str) -> bool {
    (2..=3).contains(&token.len()) && token.bytes().all(|b| b.is_ascii_lowercase())
}

fn parse_region(token: &str) -> Option<String> {
    let region = token.strip_prefix('r')?;
    let alpha = region.len() == 2 && region.bytes().all(|b| b.is_ascii_uppercase());
    let numeric = region.len() == 3 && region.bytes().all(|b| b.is_ascii_digit());
    (alpha || numeric).then(|| region.to_string())
}

/// Parses the `b+lang[+Script][+REGION]` form.
fn parse_bcp47(token: &str) -> Option<Locale> {
    let mut parts = token.strip_prefix("b+")?.split('+');
    let language = parts.next().filter(|l| {
        (2..=3).contains(&l.len()) && l.bytes().all(|b| b.is_ascii_alphabetic())
    })?;
    let mut locale = Locale::new(language);

    for part in parts {
        let alpha = part.bytes().all(|b| b.is_ascii_alphabetic());
        let digits = part.bytes().all(|b| b.is_ascii_digit());
        match part.len() {
            4 if alpha && locale.script.is_none() && locale.region.is_none() => {
                locale = locale.with_script(part);
            }
            2 if alpha && locale.region.is_none() => locale = locale.with_region(part),
            3 if digits && locale.region.is_none() => locale = locale.with_region(part),
            _ => return None,
        }
    }
    Some(locale)
}

/// Attempts to read `token` as a value of `category`, storing it in `out`.
fn parse_token(out: &mut Qualifiers, category: QualifierCategory, token: &str) -> bool {
    fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
        match value {
            Some(v) => {
                *slot = Some(v);
                true
            }
            None => false,
        }
    }

    match category {
        QualifierCategory::Mcc => set(&mut out.mcc, prefixed_number(token, "mcc", "")),
        QualifierCategory::Mnc => set(&mut out.mnc, prefixed_number(token, "mnc", "")),
        QualifierCategory::Locale => {
            let locale = if token.starts_with("b+") {
                parse_bcp47(token)
            } else if is_language(token) && !is_keyword(token) {
                Some(Locale::new(token))
            } else {
                None
            };
            set(&mut out.locale, locale)
        }
        QualifierCategory::LayoutDirection => set(&mut out.layout_direction, token.parse().ok()),
        QualifierCategory::SmallestWidth => {
            set(&mut out.smallest_width, prefixed_number(token, "sw", "dp"))
        }
        QualifierCategory::Width => set(&mut out.width, prefixed_number(token, "w", "dp")),
        QualifierCategory::Height => set(&mut out.height, prefixed_number(token, "h", "dp")),
        QualifierCategory::ScreenSize => set(&mut out.screen_size, token.parse().ok()),
        QualifierCategory::ScreenLong => set(&mut out.screen_long, token.parse().ok()),
        QualifierCategory::ScreenRound => set(&mut out.screen_round, token.parse().ok()),
        QualifierCategory::ColorGamut => set(&mut out.color_gamut, token.parse().ok()),
        QualifierCategory::Hdr => set(&mut out.hdr, token.parse().ok()),
        QualifierCategory::Orientation => set(&mut out.orientation, token.parse().ok()),
        QualifierCategory::UiModeType => set(&mut out.ui_mode_type, token.parse().ok()),
        QualifierCategory::NightMode => set(&mut out.night_mode, token.parse().ok()),
        QualifierCategory::Density => set(&mut out.density, token.parse().ok()),
        QualifierCategory::Touchscreen => set(&mut out.touchscreen, token.parse().ok()),
        QualifierCategory::KeysHidden => set(&mut out.keys_hidden, token.parse().ok()),
        QualifierCategory::Keyboard => set(&mut out.keyboard, token.parse().ok()),
        QualifierCategory::NavHidden => set(&mut out.nav_hidden, token.parse().ok()),
        QualifierCategory::Navigation => set(&mut out.navigation, token.parse().ok()),
        QualifierCategory::Version => set(&mut out.version, prefixed_number(token, "v", "")),
    }
}

/// Returns `true` if `token` is a value of some category other than locale.
pub(crate) fn is_keyword(token: &str) -> bool {
    let mut scratch = Qualifiers::default();
    QualifierCategory::iter()
        .filter(|c| *c != QualifierCategory::Locale)
        .any(|c| parse_token(&mut scratch, c, token))
}

/// Finds the category `token` belongs to, ignoring order.
fn category_of(token: &str) -> Option<QualifierCategory> {
    let mut scratch = Qualifiers::default();
    QualifierCategory::iter().find(|c| parse_token(&mut scratch, *c, token))
}

impl Qualifiers {
    /// Parses a qualifier string. An empty string yields an empty value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownQualifier`] naming the first token that is unrecognised,
    /// repeats a category, or appears out of canonical order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use shadowhost::config::{Qualifiers, ScreenSize, Orientation};
    ///
    /// let parsed = Qualifiers::parse("fr-rCA-large-land")?;
    /// assert_eq!(parsed.screen_size, Some(ScreenSize::Large));
    /// assert_eq!(parsed.orientation, Some(Orientation::Land));
    /// assert_eq!(parsed.locale.unwrap().region.as_deref(), Some("CA"));
    /// assert!(parsed.width.is_none());
    /// # Ok::<(), shadowhost::Error>(())
    /// ```
    pub fn parse(qualifiers: &str) -> Result<Self> {
        let mut out = Qualifiers::default();
        if qualifiers.is_empty() {
            return Ok(out);
        }

        let mut last: Option<QualifierCategory> = None;
        let mut tokens = qualifiers.split('-').peekable();

        while let Some(token) = tokens.next() {
            if token.is_empty() {
                return Err(Error::UnknownQualifier {
                    token: qualifiers.to_string(),
                    reason: "empty qualifier",
                });
            }

            let matched = QualifierCategory::iter()
                .filter(|c| last.map_or(true, |l| *c > l))
                .find(|c| parse_token(&mut out, *c, token));

            let Some(category) = matched else {
                let reason = match category_of(token) {
                    Some(c) if Some(c) == last => "category given twice",
                    Some(_) => "out of order",
                    None => "unrecognised",
                };
                return Err(Error::UnknownQualifier {
                    token: token.to_string(),
                    reason,
                });
            };

            if category == QualifierCategory::Locale {
                if let Some(region) = tokens.peek().and_then(|t| parse_region(t)) {
                    if let Some(locale) = out.locale.as_mut() {
                        if locale.region.is_none() {
                            locale.region = Some(region);
                            tokens.next();
                        }
                    }
                }
            }
            last = Some(category);
        }

        Ok(out)
    }

    /// Returns `true` if no category is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        QualifierCategory::iter().all(|c| !self.is_set(c))
    }

    fn token(&self, category: QualifierCategory) -> Option<String> {
        match category {
            QualifierCategory::Mcc => self.mcc.map(|v| format!("mcc{v:03}")),
            QualifierCategory::Mnc => self.mnc.map(|v| format!("mnc{v:02}")),
            QualifierCategory::Locale => self.locale.as_ref().map(Locale::qualifier),
            QualifierCategory::LayoutDirection => self.layout_direction.map(|v| v.to_string()),
            QualifierCategory::SmallestWidth => self.smallest_width.map(|v| format!("sw{v}dp")),
            QualifierCategory::Width => self.width.map(|v| format!("w{v}dp")),
            QualifierCategory::Height => self.height.map(|v| format!("h{v}dp")),
            QualifierCategory::ScreenSize => self.screen_size.map(|v| v.to_string()),
            QualifierCategory::ScreenLong => self.screen_long.map(|v| v.to_string()),
            QualifierCategory::ScreenRound => self.screen_round.map(|v| v.to_string()),
            QualifierCategory::ColorGamut => self.color_gamut.map(|v| v.to_string()),
            QualifierCategory::Hdr => self.hdr.map(|v| v.to_string()),
            QualifierCategory::Orientation => self.orientation.map(|v| v.to_string()),
            QualifierCategory::UiModeType => self.ui_mode_type.map(|v| v.to_string()),
            QualifierCategory::NightMode => self.night_mode.map(|v| v.to_string()),
            QualifierCategory::Density => self.density.map(|v| v.to_string()),
            QualifierCategory::Touchscreen => self.touchscreen.map(|v| v.to_string()),
            QualifierCategory::KeysHidden => self.keys_hidden.map(|v| v.to_string()),
            QualifierCategory::Keyboard => self.keyboard.map(|v| v.to_string()),
            QualifierCategory::NavHidden => self.nav_hidden.map(|v| v.to_string()),
            QualifierCategory::Navigation => self.navigation.map(|v| v.to_string()),
            QualifierCategory::Version => self.version.map(|v| format!("v{v}")),
        }
    }
}

/// Prints the set categories in canonical order, `-` separated.
impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for token in QualifierCategory::iter().filter_map(|c| self.token(c)) {
            if !first {
                f.write_str("-")?;
            }
            f.write_str(&token)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Qualifiers {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Qualifiers::parse(s)
    }
}
