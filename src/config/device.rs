//! Device attribute types named by configuration qualifiers.
//!
//! Each attribute is a small enum whose [`Display`](std::fmt::Display) and
//! [`FromStr`](std::str::FromStr) forms are exactly the qualifier tokens, so parsing and
//! printing a qualifier string is a matter of walking the categories in order.

use std::{fmt, str::FromStr};

use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::config::qualifiers::is_keyword;

/// First API level with credential- and device-protected storage (Nougat).
pub const API_N: u32 = 24;

/// First API level with wide colour gamut and HDR qualifiers (Oreo).
pub const API_O: u32 = 26;

/// API level used when the environment does not name one.
pub const DEFAULT_API_LEVEL: u32 = 28;

/// Density of the baseline `mdpi` bucket; one dp is one pixel at this density.
pub const DENSITY_DEFAULT: u16 = 160;

macro_rules! qualifier_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[allow(missing_docs)]
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
            Display, EnumString, IntoStaticStr, EnumIter,
        )]
        #[strum(serialize_all = "lowercase")]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }
    };
}

qualifier_enum! {
    /// Screen size bucket (`small` through `xlarge`), ordered smallest first.
    ScreenSize {
        /// At least 320x426dp.
        Small,
        /// At least 320x470dp.
        Normal,
        /// At least 480x640dp.
        Large,
        /// At least 720x960dp.
        Xlarge,
    }
}

impl ScreenSize {
    /// Minimum portrait dimensions of the bucket in dp, as `(width, height)`.
    #[must_use]
    pub fn min_dp(self) -> (u32, u32) {
        match self {
            ScreenSize::Small => (320, 426),
            ScreenSize::Normal => (320, 470),
            ScreenSize::Large => (480, 640),
            ScreenSize::Xlarge => (720, 960),
        }
    }

    /// Largest bucket whose minimum dimensions fit inside `width` x `height` dp.
    ///
    /// Orientation does not matter; screens smaller than every bucket are `small`.
    #[must_use]
    pub fn matching(width: u32, height: u32) -> Self {
        let (lesser, greater) = (width.min(height), width.max(height));
        [
            ScreenSize::Xlarge,
            ScreenSize::Large,
            ScreenSize::Normal,
            ScreenSize::Small,
        ]
        .into_iter()
        .find(|size| {
            let (w, h) = size.min_dp();
            lesser >= w && greater >= h
        })
        .unwrap_or(ScreenSize::Small)
    }
}

qualifier_enum! {
    /// Whether the screen is notably longer than a baseline screen.
    ScreenLong { Long, Notlong }
}

qualifier_enum! {
    /// Round or rectangular screen.
    ScreenRound { Round, Notround }
}

qualifier_enum! {
    /// Wide colour gamut support.
    ColorGamut { Widecg, Nowidecg }
}

qualifier_enum! {
    /// High dynamic range support.
    Hdr { Highdr, Lowdr }
}

qualifier_enum! {
    /// Screen orientation.
    Orientation { Port, Land, Square }
}

qualifier_enum! {
    /// UI mode type. A regular handset has no UI mode token and is represented by `None`.
    UiModeType {
        Car,
        Desk,
        Television,
        Appliance,
        Watch,
        Vrheadset,
    }
}

qualifier_enum! {
    /// Night mode.
    NightMode { Night, Notnight }
}

qualifier_enum! {
    /// Touchscreen type.
    Touchscreen { Notouch, Stylus, Finger }
}

qualifier_enum! {
    /// Keyboard availability.
    KeysHidden { Keysexposed, Keyshidden, Keyssoft }
}

qualifier_enum! {
    /// Primary text input method.
    Keyboard {
        Nokeys,
        Qwerty,
        /// Twelve-key phone keypad.
        #[strum(serialize = "12key")]
        TwelveKey,
    }
}

qualifier_enum! {
    /// Navigation key availability.
    NavHidden { Navexposed, Navhidden }
}

qualifier_enum! {
    /// Primary non-touch navigation method.
    Navigation { Nonav, Dpad, Trackball, Wheel }
}

qualifier_enum! {
    /// Layout direction.
    LayoutDirection {
        /// Left to right.
        #[strum(serialize = "ldltr")]
        Ltr,
        /// Right to left.
        #[strum(serialize = "ldrtl")]
        Rtl,
    }
}

/// Screen density qualifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Density {
    /// A concrete density in dots per inch.
    Dpi(u16),
    /// `anydpi`: vector resources usable at any density.
    Any,
    /// `nodpi`: resources that are never scaled.
    NoDpi,
}

const NAMED_DENSITIES: &[(&str, u16)] = &[
    ("ldpi", 120),
    ("mdpi", 160),
    ("tvdpi", 213),
    ("hdpi", 240),
    ("xhdpi", 320),
    ("xxhdpi", 480),
    ("xxxhdpi", 640),
];

impl Density {
    /// Baseline `mdpi` density.
    pub const MEDIUM: Density = Density::Dpi(DENSITY_DEFAULT);

    /// Dots per inch, for concrete densities.
    #[must_use]
    pub fn dpi(self) -> Option<u16> {
        match self {
            Density::Dpi(dpi) => Some(dpi),
            Density::Any | Density::NoDpi => None,
        }
    }
}

impl Default for Density {
    fn default() -> Self {
        Density::MEDIUM
    }
}

impl fmt::Display for Density {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Density::Any => f.write_str("anydpi"),
            Density::NoDpi => f.write_str("nodpi"),
            Density::Dpi(dpi) => match NAMED_DENSITIES.iter().find(|(_, v)| v == dpi) {
                Some((name, _)) => f.write_str(name),
                None => write!(f, "{dpi}dpi"),
            },
        }
    }
}

impl FromStr for Density {
    type Err = ();

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "anydpi" => return Ok(Density::Any),
            "nodpi" => return Ok(Density::NoDpi),
            _ => {}
        }
        if let Some((_, dpi)) = NAMED_DENSITIES.iter().find(|(name, _)| *name == token) {
            return Ok(Density::Dpi(*dpi));
        }
        token
            .strip_suffix("dpi")
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse::<u16>().ok())
            .filter(|dpi| *dpi > 0)
            .map(Density::Dpi)
            .ok_or(())
    }
}

/// Languages written right to left.
const RTL_LANGUAGES: &[&str] = &[
    "ar", "arc", "ckb", "dv", "fa", "ha", "he", "iw", "khw", "ks", "ps", "sd", "ug", "ur", "yi",
];

/// Scripts written right to left.
const RTL_SCRIPTS: &[&str] = &["Arab", "Hebr", "Nkoo", "Syrc", "Thaa"];

/// A locale as carried by the locale qualifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Locale {
    /// Lowercase ISO 639 language code.
    pub language: String,
    /// Title-case ISO 15924 script code.
    pub script: Option<String>,
    /// Uppercase ISO 3166 region or three-digit UN M.49 code.
    pub region: Option<String>,
}

impl Locale {
    /// Creates a locale with only a language.
    #[must_use]
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_ascii_lowercase(),
            script: None,
            region: None,
        }
    }

    /// Sets the region.
    #[must_use]
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_ascii_uppercase());
        self
    }

    /// Sets the script.
    #[must_use]
    pub fn with_script(mut self, script: &str) -> Self {
        let mut chars = script.chars();
        let normalized = chars
            .next()
            .map(|first| {
                first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
            })
            .unwrap_or_default();
        self.script = Some(normalized);
        self
    }

    /// `en-US`, the platform default.
    #[must_use]
    pub fn en_us() -> Self {
        Locale::new("en").with_region("US")
    }

    /// Returns `true` if text in this locale is laid out right to left.
    #[must_use]
    pub fn is_rtl(&self) -> bool {
        match &self.script {
            Some(script) => RTL_SCRIPTS.contains(&script.as_str()),
            None => RTL_LANGUAGES.contains(&self.language.as_str()),
        }
    }

    /// The qualifier form: `en`, `en-rUS`, or `b+sr+Latn+RS` when a script or numeric
    /// region is present. A language that reads as another qualifier (`car`) also takes the
    /// `b+` form.
    #[must_use]
    pub fn qualifier(&self) -> String {
        let numeric_region = self
            .region
            .as_deref()
            .is_some_and(|r| r.bytes().all(|b| b.is_ascii_digit()));

        if self.script.is_some() || numeric_region || is_keyword(&self.language) {
            let mut out = format!("b+{}", self.language);
            for part in [&self.script, &self.region].into_iter().flatten() {
                out.push('+');
                out.push_str(part);
            }
            out
        } else {
            match &self.region {
                Some(region) => format!("{}-r{region}", self.language),
                None => self.language.clone(),
            }
        }
    }
}

impl Default for Locale {
    fn default() -> Self {
        Locale::en_us()
    }
}

/// BCP 47 tag, e.g. `fr-Cyrl-UK`.
impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.language)?;
        if let Some(script) = &self.script {
            write!(f, "-{script}")?;
        }
        if let Some(region) = &self.region {
            write!(f, "-{region}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_tokens_round_trip_through_strum() {
        assert_eq!("xlarge".parse::<ScreenSize>().unwrap(), ScreenSize::Xlarge);
        assert_eq!(ScreenSize::Xlarge.to_string(), "xlarge");
        assert_eq!("12key".parse::<Keyboard>().unwrap(), Keyboard::TwelveKey);
        assert_eq!(LayoutDirection::Rtl.to_string(), "ldrtl");
        let name: &'static str = KeysHidden::Keyssoft.into();
        assert_eq!(name, "keyssoft");
    }

    #[test]
    fn test_normal_ui_mode_has_no_token() {
        assert!("normal".parse::<UiModeType>().is_err());
        assert_eq!(UiModeType::iter().count(), 6);
    }

    #[test]
    fn test_screen_size_matching() {
        assert_eq!(ScreenSize::matching(320, 470), ScreenSize::Normal);
        assert_eq!(ScreenSize::matching(640, 480), ScreenSize::Large);
        assert_eq!(ScreenSize::matching(720, 960), ScreenSize::Xlarge);
        assert_eq!(ScreenSize::matching(100, 125), ScreenSize::Small);
        assert_eq!(ScreenSize::matching(320, 450), ScreenSize::Small);
    }

    #[test]
    fn test_density_tokens() {
        assert_eq!("xhdpi".parse::<Density>(), Ok(Density::Dpi(320)));
        assert_eq!("420dpi".parse::<Density>(), Ok(Density::Dpi(420)));
        assert_eq!("nodpi".parse::<Density>(), Ok(Density::NoDpi));
        assert!("dpi".parse::<Density>().is_err());
        assert!("0dpi".parse::<Density>().is_err());
        assert_eq!(Density::Dpi(213).to_string(), "tvdpi");
        assert_eq!(Density::Dpi(420).to_string(), "420dpi");
    }

    #[test]
    fn test_locale_forms() {
        let plain = Locale::en_us();
        assert_eq!(plain.qualifier(), "en-rUS");
        assert_eq!(plain.to_string(), "en-US");

        let scripted = Locale::new("fr").with_script("cyrl").with_region("uk");
        assert_eq!(scripted.qualifier(), "b+fr+Cyrl+UK");
        assert_eq!(scripted.to_string(), "fr-Cyrl-UK");

        let numeric = Locale::new("es").with_region("419");
        assert_eq!(numeric.qualifier(), "b+es+419");

        assert_eq!(Locale::new("car").qualifier(), "b+car");
        assert_eq!(Locale::new("car").with_region("US").qualifier(), "b+car+US");
    }

    #[test]
    fn test_rtl() {
        assert!(Locale::new("ar").is_rtl());
        assert!(Locale::new("he").with_region("IL").is_rtl());
        assert!(!Locale::new("az").with_script("Latn").is_rtl());
        assert!(Locale::new("az").with_script("Arab").is_rtl());
        assert!(!Locale::en_us().is_rtl());
    }
}
