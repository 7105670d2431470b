//! Harness configuration.
//!
//! Read from the environment, leniently: unknown values fall back to the
//! defaults instead of failing.
//! - `CRASHCHECK_COLOR`: `always` / `never` / `auto` (default). `auto` turns
//!   color on unless `NO_COLOR` is set. The `no-color` cargo feature forces
//!   plain output regardless.
//! - `CRASHCHECK_LOG`: path of a JSONL event log. Unset means no log.
//! - `CRASHCHECK_SIGNALS`: `catchall` (default) or `none`.

use std::path::PathBuf;

pub const COLOR_ENV: &str = "CRASHCHECK_COLOR";
pub const LOG_ENV: &str = "CRASHCHECK_LOG";
pub const SIGNALS_ENV: &str = "CRASHCHECK_SIGNALS";
pub const NO_COLOR_ENV: &str = "NO_COLOR";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    Always,
    Never,
    #[default]
    Auto,
}

impl ColorMode {
    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" | "on" | "yes" | "true" | "1" => Self::Always,
            "never" | "off" | "no" | "false" | "0" => Self::Never,
            _ => Self::Auto,
        }
    }
}

/// Whether the harness installs the fatal-signal handlers on its own.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum SignalPolicy {
    #[default]
    CatchAll,
    None,
}

impl SignalPolicy {
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" | "no" | "false" | "0" => Self::None,
            _ => Self::CatchAll,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub color: ColorMode,
    pub log_path: Option<PathBuf>,
    pub signals: SignalPolicy,
    /// `NO_COLOR` was present when the config was read.
    pub no_color_env: bool,
}

impl HarnessConfig {
    /// Read the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            color: lookup(COLOR_ENV)
                .map(|v| ColorMode::from_str_loose(&v))
                .unwrap_or_default(),
            log_path: lookup(LOG_ENV)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            signals: lookup(SIGNALS_ENV)
                .map(|v| SignalPolicy::from_str_loose(&v))
                .unwrap_or_default(),
            no_color_env: lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()),
        }
    }

    /// Resolved color decision, before the `no-color` feature is applied.
    #[must_use]
    pub fn color_enabled(&self) -> bool {
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => !self.no_color_env,
        }
    }
}
