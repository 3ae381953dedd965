//! Terminal color system levels and their detection.
//!
//! A terminal's color system is resolved from, in order of precedence:
//!
//! 1. an explicit override (set programmatically, or pre-seeded from the
//!    override variable, `TERMKIT_COLORSYS` by default)
//! 2. `NO_COLOR` being present, which disables color entirely
//! 3. `COLORTERM` being `24bit` or `truecolor`
//! 4. `COLORTERM` being `256color`
//! 5. the standard 16-color palette otherwise
//!
//! Detection reads the environment once into a [`ColorEnv`] snapshot so the
//! policy itself can be tested without touching process state.

use std::cmp::Ordering;
use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TerminalSettings;
use crate::error::Error;

/// Color depth supported by a terminal.
///
/// Levels are totally ordered: `NoColor < Standard < EightBit < True`.
/// Ordering is only defined between two `ColorSystem` values; comparing
/// against any other type does not compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColorSystem {
    /// No-color terminal. See <https://no-color.org/>.
    #[serde(rename = "NO_COLOR")]
    NoColor,
    /// Standard 3-bit color system of the basic 16 colors.
    #[serde(rename = "STANDARD")]
    Standard,
    /// xterm 8-bit colors, 0-255.
    #[serde(rename = "EIGHT_BIT")]
    EightBit,
    /// 24-bit RGB colors.
    #[serde(rename = "TRUE")]
    True,
}

impl ColorSystem {
    /// All levels, lowest first.
    pub const ALL: [ColorSystem; 4] = [
        ColorSystem::NoColor,
        ColorSystem::Standard,
        ColorSystem::EightBit,
        ColorSystem::True,
    ];

    /// Numeric rank used for ordering.
    pub const fn rank(self) -> i8 {
        match self {
            ColorSystem::NoColor => -1,
            ColorSystem::Standard => 0,
            ColorSystem::EightBit => 1,
            ColorSystem::True => 2,
        }
    }

    /// Canonical member name, as accepted by the override variable.
    pub const fn name(self) -> &'static str {
        match self {
            ColorSystem::NoColor => "NO_COLOR",
            ColorSystem::Standard => "STANDARD",
            ColorSystem::EightBit => "EIGHT_BIT",
            ColorSystem::True => "TRUE",
        }
    }

    /// Look up a level by its exact member name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.name() == name)
    }
}

impl PartialOrd for ColorSystem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColorSystem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for ColorSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColorSystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| Error::UnknownColorSystem(s.to_string()))
    }
}

/// Snapshot of the environment signals that drive color detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorEnv {
    /// Raw value of the override variable, if set
    pub override_name: Option<String>,
    /// Whether the no-color variable is present (any value)
    pub no_color: bool,
    /// Value of the color-term variable, empty when unset
    pub colorterm: String,
}

impl ColorEnv {
    /// Read the variables named in `settings` from the process environment.
    pub fn from_env(settings: &TerminalSettings) -> Self {
        Self {
            override_name: env::var(&settings.colorsystem_var).ok(),
            no_color: env::var_os(&settings.no_color_var).is_some(),
            colorterm: env::var(&settings.colorterm_var).unwrap_or_default(),
        }
    }

    /// The override pre-seeded by the environment.
    ///
    /// An unrecognized name is ignored so detection falls through to the
    /// remaining signals.
    pub fn forced(&self) -> Option<ColorSystem> {
        let name = self.override_name.as_deref()?;
        match ColorSystem::from_name(name) {
            Some(level) => Some(level),
            None => {
                debug!("Ignoring unknown color system override: {:?}", name);
                None
            }
        }
    }

    /// Resolve the color system, with `forced` taking precedence over
    /// every environment hint.
    pub fn resolve(&self, forced: Option<ColorSystem>) -> ColorSystem {
        if let Some(level) = forced {
            return level;
        }

        if self.no_color {
            return ColorSystem::NoColor;
        }

        match self.colorterm.trim().to_lowercase().as_str() {
            "24bit" | "truecolor" => ColorSystem::True,
            "256color" => ColorSystem::EightBit,
            _ => ColorSystem::Standard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_env(override_name: Option<&str>, no_color: bool, colorterm: &str) -> ColorEnv {
        ColorEnv {
            override_name: override_name.map(str::to_string),
            no_color,
            colorterm: colorterm.to_string(),
        }
    }

    #[test]
    fn test_ordering() {
        assert!(ColorSystem::NoColor < ColorSystem::Standard);
        assert!(ColorSystem::Standard < ColorSystem::EightBit);
        assert!(ColorSystem::EightBit < ColorSystem::True);
        assert!(ColorSystem::True >= ColorSystem::True);
        assert!(ColorSystem::Standard <= ColorSystem::True);
        assert!(ColorSystem::True > ColorSystem::NoColor);
        assert_eq!(ColorSystem::ALL.iter().max(), Some(&ColorSystem::True));
    }

    #[test]
    fn test_names_roundtrip() {
        for level in ColorSystem::ALL {
            assert_eq!(ColorSystem::from_name(level.name()), Some(level));
            assert_eq!(level.to_string().parse::<ColorSystem>().unwrap(), level);
        }
        assert_eq!(ColorSystem::from_name("true"), None);
        assert!(matches!(
            "SIXTEEN".parse::<ColorSystem>(),
            Err(Error::UnknownColorSystem(_))
        ));
    }

    #[test]
    fn test_serde_uses_member_names() {
        let json = serde_json::to_string(&ColorSystem::EightBit).unwrap();
        assert_eq!(json, "\"EIGHT_BIT\"");
        let level: ColorSystem = serde_json::from_str("\"NO_COLOR\"").unwrap();
        assert_eq!(level, ColorSystem::NoColor);
    }

    #[test]
    fn test_forced_wins_over_everything() {
        let env = make_env(None, true, "truecolor");
        assert_eq!(env.resolve(Some(ColorSystem::EightBit)), ColorSystem::EightBit);
    }

    #[test]
    fn test_no_color_beats_colorterm() {
        let env = make_env(None, true, "truecolor");
        assert_eq!(env.resolve(None), ColorSystem::NoColor);
    }

    #[test]
    fn test_colorterm_hints() {
        assert_eq!(make_env(None, false, "truecolor").resolve(None), ColorSystem::True);
        assert_eq!(make_env(None, false, "24bit").resolve(None), ColorSystem::True);
        assert_eq!(make_env(None, false, " TrueColor ").resolve(None), ColorSystem::True);
        assert_eq!(make_env(None, false, "256color").resolve(None), ColorSystem::EightBit);
        assert_eq!(make_env(None, false, "").resolve(None), ColorSystem::Standard);
        assert_eq!(make_env(None, false, "yes").resolve(None), ColorSystem::Standard);
    }

    #[test]
    fn test_env_override_parsing() {
        assert_eq!(make_env(Some("TRUE"), false, "").forced(), Some(ColorSystem::True));
        assert_eq!(make_env(Some("bogus"), false, "").forced(), None);
        assert_eq!(make_env(None, false, "").forced(), None);
    }

    #[test]
    fn test_unknown_override_falls_through() {
        let env = make_env(Some("bogus"), false, "256color");
        assert_eq!(env.resolve(env.forced()), ColorSystem::EightBit);
    }

    #[test]
    fn test_precedence_over_all_combinations() {
        let overrides = [None, Some("STANDARD"), Some("TRUE"), Some("junk")];
        let colorterms = ["", "256color", "truecolor", "24bit", "other"];

        for override_name in overrides {
            for no_color in [false, true] {
                for colorterm in colorterms {
                    let env = make_env(override_name, no_color, colorterm);
                    let expected = match override_name.and_then(ColorSystem::from_name) {
                        Some(level) => level,
                        None if no_color => ColorSystem::NoColor,
                        None if colorterm == "truecolor" || colorterm == "24bit" => {
                            ColorSystem::True
                        }
                        None if colorterm == "256color" => ColorSystem::EightBit,
                        None => ColorSystem::Standard,
                    };
                    assert_eq!(
                        env.resolve(env.forced()),
                        expected,
                        "override={override_name:?} no_color={no_color} colorterm={colorterm:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_from_env_reads_configured_variables() {
        let settings = TerminalSettings {
            colorsystem_var: "TERMKIT_COLOR_TEST_OVERRIDE".to_string(),
            no_color_var: "TERMKIT_COLOR_TEST_NO_COLOR".to_string(),
            colorterm_var: "TERMKIT_COLOR_TEST_COLORTERM".to_string(),
            ..TerminalSettings::default()
        };
        env::set_var("TERMKIT_COLOR_TEST_OVERRIDE", "EIGHT_BIT");
        env::set_var("TERMKIT_COLOR_TEST_NO_COLOR", "");
        env::set_var("TERMKIT_COLOR_TEST_COLORTERM", "truecolor");

        let color_env = ColorEnv::from_env(&settings);

        assert_eq!(color_env, make_env(Some("EIGHT_BIT"), true, "truecolor"));
        assert_eq!(color_env.forced(), Some(ColorSystem::EightBit));
    }

    #[test]
    fn test_from_env_with_unset_variables() {
        let settings = TerminalSettings {
            colorsystem_var: "TERMKIT_COLOR_TEST_UNSET_OVERRIDE".to_string(),
            no_color_var: "TERMKIT_COLOR_TEST_UNSET_NO_COLOR".to_string(),
            colorterm_var: "TERMKIT_COLOR_TEST_UNSET_COLORTERM".to_string(),
            ..TerminalSettings::default()
        };

        let color_env = ColorEnv::from_env(&settings);

        assert_eq!(color_env, ColorEnv::default());
        assert_eq!(color_env.resolve(color_env.forced()), ColorSystem::Standard);
    }
}
