//! Reporter configuration.
//!
//! Color output follows the usual terminal conventions: it is enabled only
//! when the diagnostic stream is a terminal and `NO_COLOR` is unset or
//! empty, unless a color choice is forced explicitly.

use std::{
    env,
    fmt,
    io::{self, IsTerminal},
    str::FromStr,
};

/// Environment variable that disables colored output when non-empty.
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// When to style the rendered report.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorChoice {
    /// Style only when the output is a terminal.
    #[default]
    Auto,
    /// Always emit escape sequences.
    Always,
    /// Never emit escape sequences.
    Never,
}

impl ColorChoice {
    /// Decide whether to style output, given whether it is a terminal.
    #[must_use]
    pub fn resolve(self, is_terminal: bool) -> bool {
        match self {
            Self::Auto => is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

impl FromStr for ColorChoice {
    type Err = ParseColorChoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(ParseColorChoiceError(other.to_owned())),
        }
    }
}

/// Error returned when parsing an unknown [`ColorChoice`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseColorChoiceError(String);

impl fmt::Display for ParseColorChoiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown color choice {:?}, expected auto, always or never",
            self.0
        )
    }
}

impl std::error::Error for ParseColorChoiceError {}

/// Initial state of a [`Reporter`](crate::Reporter).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Color policy for rendered reports.
    pub color: ColorChoice,
    /// Whether panics are rendered at all.
    pub enabled: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            color: ColorChoice::Auto,
            enabled: true,
        }
    }
}

impl Config {
    /// Configuration derived from the process environment.
    ///
    /// A non-empty `NO_COLOR` forces [`ColorChoice::Never`].
    #[must_use]
    pub fn from_env() -> Self {
        let no_color = env::var_os(NO_COLOR_ENV).is_some_and(|v| !v.is_empty());
        Self::default().color(if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        })
    }

    /// Set the color policy.
    #[must_use]
    pub fn color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set whether panics are rendered.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Resolve the color policy against the standard error stream.
    #[must_use]
    pub fn stderr_color(&self) -> bool { self.color.resolve(io::stderr().is_terminal()) }
}
