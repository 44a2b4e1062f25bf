//! Fully resolved device configuration and the platform's defaulting rules.

use std::fmt;

use crate::config::{
    device::{
        ColorGamut, Density, Hdr, KeysHidden, Keyboard, LayoutDirection, Locale, NavHidden,
        Navigation, NightMode, Orientation, ScreenLong, ScreenRound, ScreenSize, Touchscreen,
        UiModeType, API_O, DEFAULT_API_LEVEL, DENSITY_DEFAULT,
    },
    qualifiers::Qualifiers,
};

/// The effective device configuration.
///
/// Every attribute has a concrete value. Attributes the platform leaves undefined stay
/// `None`: mobile codes, the UI mode of a regular handset, and colour gamut and HDR below
/// API 26.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Configuration {
    pub mcc: Option<u16>,
    pub mnc: Option<u16>,
    pub locale: Locale,
    pub layout_direction: LayoutDirection,
    pub smallest_width_dp: u32,
    pub screen_width_dp: u32,
    pub screen_height_dp: u32,
    pub screen_size: ScreenSize,
    pub screen_long: ScreenLong,
    pub screen_round: ScreenRound,
    pub color_gamut: Option<ColorGamut>,
    pub hdr: Option<Hdr>,
    pub orientation: Orientation,
    pub ui_mode_type: Option<UiModeType>,
    pub night_mode: NightMode,
    pub density: Density,
    pub touchscreen: Touchscreen,
    pub keys_hidden: KeysHidden,
    pub keyboard: Keyboard,
    pub nav_hidden: NavHidden,
    pub navigation: Navigation,
    pub version: u32,
}

impl Configuration {
    /// The platform default configuration at `api_level`.
    #[must_use]
    pub fn platform_default(api_level: u32) -> Self {
        apply_rules(&Qualifiers::default(), api_level)
    }

    /// Every attribute as a fully populated [`Qualifiers`] value.
    #[must_use]
    pub fn to_qualifiers(&self) -> Qualifiers {
        Qualifiers {
            mcc: self.mcc,
            mnc: self.mnc,
            locale: Some(self.locale.clone()),
            layout_direction: Some(self.layout_direction),
            smallest_width: Some(self.smallest_width_dp),
            width: Some(self.screen_width_dp),
            height: Some(self.screen_height_dp),
            screen_size: Some(self.screen_size),
            screen_long: Some(self.screen_long),
            screen_round: Some(self.screen_round),
            color_gamut: self.color_gamut,
            hdr: self.hdr,
            orientation: Some(self.orientation),
            ui_mode_type: self.ui_mode_type,
            night_mode: Some(self.night_mode),
            density: Some(self.density),
            touchscreen: Some(self.touchscreen),
            keys_hidden: Some(self.keys_hidden),
            keyboard: Some(self.keyboard),
            nav_hidden: Some(self.nav_hidden),
            navigation: Some(self.navigation),
            version: Some(self.version),
        }
    }

    /// The canonical qualifier string, ending with the version token.
    #[must_use]
    pub fn qualifier_string(&self) -> String {
        self.to_qualifiers().to_string()
    }

    /// Derived pixel metrics for this configuration.
    #[must_use]
    pub fn display_metrics(&self) -> DisplayMetrics {
        DisplayMetrics::from(self)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::platform_default(DEFAULT_API_LEVEL)
    }
}

impl fmt::Display for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_qualifiers(), f)
    }
}

/// Pixel metrics derived from a configuration's dimensions and density.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DisplayMetrics {
    /// Dots per inch of the density bucket.
    pub density_dpi: u16,
    /// Scale from dp to pixels (`density_dpi / 160`).
    pub density: f32,
    /// Scale applied to fonts; equal to `density` without a user font scale.
    pub scaled_density: f32,
    /// Screen width in pixels.
    pub width_pixels: u32,
    /// Screen height in pixels.
    pub height_pixels: u32,
}

impl DisplayMetrics {
    /// Converts dp to pixels at this density, rounding to nearest.
    #[must_use]
    pub fn dp_to_px(&self, dp: u32) -> u32 {
        dp_to_px(dp, self.density_dpi)
    }
}

fn dp_to_px(dp: u32, dpi: u16) -> u32 {
    let dpi = u64::from(dpi);
    let px = (u64::from(dp) * dpi + u64::from(DENSITY_DEFAULT) / 2) / u64::from(DENSITY_DEFAULT);
    u32::try_from(px).unwrap_or(u32::MAX)
}

impl From<&Configuration> for DisplayMetrics {
    fn from(config: &Configuration) -> Self {
        let density_dpi = config.density.dpi().unwrap_or(DENSITY_DEFAULT);
        let density = f32::from(density_dpi) / f32::from(DENSITY_DEFAULT);
        DisplayMetrics {
            density_dpi,
            density,
            scaled_density: density,
            width_pixels: dp_to_px(config.screen_width_dp, density_dpi),
            height_pixels: dp_to_px(config.screen_height_dp, density_dpi),
        }
    }
}

/// Fills every unset attribute of `qualifiers` with the platform's default.
///
/// The rules, in order:
///
/// 1. Locale defaults to `en-US`; layout direction follows the locale.
/// 2. If orientation is unset but both dimensions are given, it follows the dimensions.
/// 3. Missing dimensions come from the requested size bucket (`normal` if none), with the
///    height stretched by a quarter for `long` screens.
/// 4. Smallest width is the lesser dimension; the size bucket is the largest that fits;
///    the screen is `long` when its aspect ratio is at least 1.75.
/// 5. Dimensions are swapped to agree with an explicit `port` or `land` orientation.
/// 6. The version is always `api_level`; colour gamut and HDR default only from API 26.
#[must_use]
pub fn apply_rules(qualifiers: &Qualifiers, api_level: u32) -> Configuration {
    let locale = qualifiers.locale.clone().unwrap_or_default();
    let layout_direction = qualifiers.layout_direction.unwrap_or(if locale.is_rtl() {
        LayoutDirection::Rtl
    } else {
        LayoutDirection::Ltr
    });

    let requested_size = qualifiers.screen_size.unwrap_or(ScreenSize::Normal);
    let (bucket_width, bucket_height) = requested_size.min_dp();

    let mut orientation = qualifiers.orientation;
    if orientation.is_none() {
        if let (Some(w), Some(h)) = (qualifiers.width, qualifiers.height) {
            orientation = Some(if w > h {
                Orientation::Land
            } else {
                Orientation::Port
            });
        }
    }

    let mut width = qualifiers.width.unwrap_or(bucket_width);
    let mut height = qualifiers.height.unwrap_or_else(|| {
        if qualifiers.screen_long == Some(ScreenLong::Long) {
            bucket_height.saturating_mul(5) / 4
        } else {
            bucket_height
        }
    });

    let lesser = width.min(height);
    let greater = width.max(height);
    let smallest_width_dp = qualifiers.smallest_width.unwrap_or(lesser);
    let screen_size = qualifiers
        .screen_size
        .unwrap_or_else(|| ScreenSize::matching(width, height));
    let screen_long = qualifiers.screen_long.unwrap_or(
        if u64::from(greater) * 4 >= u64::from(lesser) * 7 {
            ScreenLong::Long
        } else {
            ScreenLong::Notlong
        },
    );

    let orientation = match orientation {
        None if width > height => Orientation::Land,
        None => Orientation::Port,
        Some(Orientation::Port) if width > height => {
            std::mem::swap(&mut width, &mut height);
            Orientation::Port
        }
        Some(Orientation::Land) if width < height => {
            std::mem::swap(&mut width, &mut height);
            Orientation::Land
        }
        Some(explicit) => explicit,
    };

    let wide_gamut_defaults = api_level >= API_O;

    Configuration {
        mcc: qualifiers.mcc,
        mnc: qualifiers.mnc,
        locale,
        layout_direction,
        smallest_width_dp,
        screen_width_dp: width,
        screen_height_dp: height,
        screen_size,
        screen_long,
        screen_round: qualifiers.screen_round.unwrap_or(ScreenRound::Notround),
        color_gamut: qualifiers
            .color_gamut
            .or(wide_gamut_defaults.then_some(ColorGamut::Nowidecg)),
        hdr: qualifiers.hdr.or(wide_gamut_defaults.then_some(Hdr::Lowdr)),
        orientation,
        ui_mode_type: qualifiers.ui_mode_type,
        night_mode: qualifiers.night_mode.unwrap_or(NightMode::Notnight),
        density: qualifiers.density.unwrap_or_default(),
        touchscreen: qualifiers.touchscreen.unwrap_or(Touchscreen::Finger),
        keys_hidden: qualifiers.keys_hidden.unwrap_or(KeysHidden::Keyssoft),
        keyboard: qualifiers.keyboard.unwrap_or(Keyboard::Nokeys),
        nav_hidden: qualifiers.nav_hidden.unwrap_or(NavHidden::Navhidden),
        navigation: qualifiers.navigation.unwrap_or(Navigation::Nonav),
        version: api_level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolved(input: &str, api: u32) -> Configuration {
        apply_rules(&Qualifiers::parse(input).unwrap(), api)
    }

    #[test]
    fn test_platform_default() {
        assert_eq!(
            Configuration::default().qualifier_string(),
            "en-rUS-ldltr-sw320dp-w320dp-h470dp-normal-notlong-notround-nowidecg-lowdr-port-\
             notnight-mdpi-finger-keyssoft-nokeys-navhidden-nonav-v28"
        );
    }

    #[test]
    fn test_wide_gamut_only_from_o() {
        let pre_o = Configuration::platform_default(25);
        assert!(pre_o.color_gamut.is_none());
        assert!(!pre_o.qualifier_string().contains("nowidecg"));
        assert!(pre_o.qualifier_string().ends_with("-v25"));
    }

    #[test]
    fn test_large_land() {
        let config = resolved("large-land", 28);
        assert_eq!(config.screen_size, ScreenSize::Large);
        assert_eq!(config.orientation, Orientation::Land);
        assert_eq!((config.screen_width_dp, config.screen_height_dp), (640, 480));
        assert_eq!(config.smallest_width_dp, 480);
        assert!(config.qualifier_string().contains(
            "large-notlong-notround-nowidecg-lowdr-land-notnight-mdpi-finger-keyssoft-nokeys-navhidden-nonav-v28"
        ));
    }

    #[test]
    fn test_land_swaps_default_dimensions() {
        let config = resolved("land", 28);
        assert_eq!((config.screen_width_dp, config.screen_height_dp), (470, 320));
    }

    #[test]
    fn test_orientation_from_dimensions() {
        let config = resolved("w800dp-h400dp", 28);
        assert_eq!(config.orientation, Orientation::Land);
        assert_eq!(config.screen_long, ScreenLong::Long);
        assert_eq!(config.screen_size, ScreenSize::Normal);
    }

    #[test]
    fn test_long_stretches_height() {
        let config = resolved("long", 28);
        assert_eq!(config.screen_height_dp, 587);
    }

    #[test]
    fn test_rtl_locale_sets_direction() {
        assert_eq!(resolved("ar", 28).layout_direction, LayoutDirection::Rtl);
        assert_eq!(resolved("ar-ldltr", 28).layout_direction, LayoutDirection::Ltr);
    }

    #[test]
    fn test_display_metrics() {
        let config = resolved("w360dp-h640dp-xxhdpi", 28);
        let metrics = config.display_metrics();
        assert_eq!(metrics.density_dpi, 480);
        assert!((metrics.density - 3.0).abs() < f32::EPSILON);
        assert_eq!((metrics.width_pixels, metrics.height_pixels), (1080, 1920));
        assert_eq!(metrics.dp_to_px(1), 3);
    }
}
