//! Reporting levels and the threshold used to filter them.
//!
//! [`Level`] tags a single reporting event. [`LevelFilter`] is the configured
//! threshold; events whose level is more verbose than the filter are dropped
//! before they reach any plugin. Step events bypass the filter because they
//! denote test progress.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::config::ConfigError;

/// Severity attached to a reporting event.
///
/// Variants are ordered from least to most verbose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Failures the test author should act on.
    Error,
    /// Suspicious but non-fatal conditions.
    Warn,
    /// Test progress marker carrying a sequence number.
    Step,
    /// Informational narrative.
    Info,
    /// Detail useful while debugging a test.
    Debug,
    /// Most verbose diagnostic output.
    Trace,
}

impl Level {
    /// Returns the lowercase label for the level.
    ///
    /// # Examples
    ///
    /// ```
    /// use attest::Level;
    ///
    /// assert_eq!(Level::Step.as_str(), "step");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Step => "step",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold controlling which events reach reporting plugins.
///
/// Ordering is `None < Error < Warn < Step < Info < Debug < Trace`.
///
/// # Examples
///
/// ```
/// use attest::{Level, LevelFilter};
///
/// let filter = LevelFilter::Warn;
/// assert!(filter.allows(Level::Error));
/// assert!(!filter.allows(Level::Info));
/// // Step events always pass.
/// assert!(LevelFilter::None.allows(Level::Step));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelFilter {
    /// Suppress every leveled event except steps.
    None,
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Errors, warnings, and steps.
    Step,
    /// Informational events and above.
    #[default]
    Info,
    /// Debug events and above.
    Debug,
    /// Everything.
    Trace,
}

impl LevelFilter {
    /// Returns `true` when an event at `level` should be forwarded.
    #[must_use]
    pub fn allows(self, level: Level) -> bool {
        level == Level::Step || self >= Self::from(level)
    }

    /// Returns the lowercase label for the filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Step => "step",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl From<Level> for LevelFilter {
    fn from(level: Level) -> Self {
        match level {
            Level::Error => Self::Error,
            Level::Warn => Self::Warn,
            Level::Step => Self::Step,
            Level::Info => Self::Info,
            Level::Debug => Self::Debug,
            Level::Trace => Self::Trace,
        }
    }
}

impl FromStr for LevelFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(Self::None),
            "error" => Ok(Self::Error),
            "warn" | "warning" => Ok(Self::Warn),
            "step" => Ok(Self::Step),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "trace" => Ok(Self::Trace),
            _ => Err(ConfigError::InvalidLogLevel(s.to_owned())),
        }
    }
}

impl fmt::Display for LevelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
