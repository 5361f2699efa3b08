// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide settings for off-screen surfaces and readback.
//!
//! Settings are read once and then treated as read-only by every component.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How pixels are transferred from a surface into host memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadbackStrategy {
    /// Transfer straight into host memory; the call blocks until complete.
    #[serde(alias = "sync")]
    Synchronous,
    /// Stage the transfer through a pixel pack buffer, then map and copy.
    #[serde(alias = "pbo")]
    Staged,
}

/// The native resource backing each off-screen surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceBacking {
    /// A pbuffer.
    Pbuffer,
    /// A host pixmap wrapped into a GLX pixmap.
    Pixmap,
}

impl SurfaceBacking {
    /// Returns the plural noun used in diagnostics.
    pub const fn label(&self) -> &'static str {
        match self {
            SurfaceBacking::Pbuffer => "Pbuffers",
            SurfaceBacking::Pixmap => "Pixmaps",
        }
    }
}

/// An error raised while loading [`OffscreenSettings`].
#[derive(Debug)]
pub enum SettingsError {
    /// A variable held a value outside its accepted set.
    InvalidValue {
        /// The variable or field name.
        key: String,
        /// The rejected value.
        value: String,
    },
    /// A JSON document could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsError::InvalidValue { key, value } => {
                write!(f, "Invalid value '{value}' for setting '{key}'")
            }
            SettingsError::Parse(err) => write!(f, "Failed to parse settings: {err}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SettingsError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SettingsError {
    fn from(err: serde_json::Error) -> Self {
        SettingsError::Parse(err)
    }
}

/// The read-only configuration consumed by the drawable layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffscreenSettings {
    /// The readback strategy every manager starts with.
    pub readback: ReadbackStrategy,
    /// Emit once-per-condition informational diagnostics.
    pub verbose: bool,
    /// Export per-frame color and frame-count signatures for a test harness.
    pub autotest: bool,
    /// The backing used for newly allocated surfaces.
    pub backing: SurfaceBacking,
    /// Whether the transport forces an alpha channel into readback formats.
    /// Only used to phrase remediation hints.
    pub force_alpha: bool,
    /// Log readback throughput periodically.
    pub profile: bool,
}

impl Default for OffscreenSettings {
    fn default() -> Self {
        Self {
            readback: ReadbackStrategy::Staged,
            verbose: false,
            autotest: false,
            backing: SurfaceBacking::Pbuffer,
            force_alpha: false,
            profile: false,
        }
    }
}

impl OffscreenSettings {
    /// Environment variable selecting the readback strategy (`sync` or `pbo`).
    pub const ENV_READBACK: &'static str = "OFFSTAGE_READBACK";
    /// Environment variable enabling verbose diagnostics.
    pub const ENV_VERBOSE: &'static str = "OFFSTAGE_VERBOSE";
    /// Environment variable enabling the test probe.
    pub const ENV_AUTOTEST: &'static str = "OFFSTAGE_AUTOTEST";
    /// Environment variable selecting the surface backing (`pbuffer` or `pixmap`).
    pub const ENV_DRAWABLE: &'static str = "OFFSTAGE_DRAWABLE";
    /// Environment variable describing the transport's forced-alpha mode.
    pub const ENV_FORCEALPHA: &'static str = "OFFSTAGE_FORCEALPHA";
    /// Environment variable enabling the readback profiler.
    pub const ENV_PROFILE: &'static str = "OFFSTAGE_PROFILE";

    /// Loads settings from the process environment, falling back to defaults
    /// for unset variables.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads settings through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();

        if let Some(value) = lookup(Self::ENV_READBACK) {
            settings.readback = match value.trim().to_ascii_lowercase().as_str() {
                "sync" | "synchronous" => ReadbackStrategy::Synchronous,
                "pbo" | "staged" => ReadbackStrategy::Staged,
                _ => return Err(invalid(Self::ENV_READBACK, &value)),
            };
        }
        if let Some(value) = lookup(Self::ENV_DRAWABLE) {
            settings.backing = match value.trim().to_ascii_lowercase().as_str() {
                "pbuffer" => SurfaceBacking::Pbuffer,
                "pixmap" => SurfaceBacking::Pixmap,
                _ => return Err(invalid(Self::ENV_DRAWABLE, &value)),
            };
        }
        if let Some(value) = lookup(Self::ENV_VERBOSE) {
            settings.verbose = parse_flag(Self::ENV_VERBOSE, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_AUTOTEST) {
            settings.autotest = parse_flag(Self::ENV_AUTOTEST, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_FORCEALPHA) {
            settings.force_alpha = parse_flag(Self::ENV_FORCEALPHA, &value)?;
        }
        if let Some(value) = lookup(Self::ENV_PROFILE) {
            settings.profile = parse_flag(Self::ENV_PROFILE, &value)?;
        }

        Ok(settings)
    }

    /// Parses settings from a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        Ok(serde_json::from_str(json)?)
    }
}

fn invalid(key: &str, value: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let settings = OffscreenSettings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, OffscreenSettings::default());
        assert_eq!(settings.readback, ReadbackStrategy::Staged);
        assert_eq!(settings.backing, SurfaceBacking::Pbuffer);
    }

    #[test]
    fn environment_overrides() {
        let settings = OffscreenSettings::from_lookup(lookup_from(&[
            ("OFFSTAGE_READBACK", "sync"),
            ("OFFSTAGE_DRAWABLE", "Pixmap"),
            ("OFFSTAGE_VERBOSE", "1"),
            ("OFFSTAGE_AUTOTEST", "yes"),
            ("OFFSTAGE_FORCEALPHA", "0"),
        ]))
        .unwrap();
        assert_eq!(settings.readback, ReadbackStrategy::Synchronous);
        assert_eq!(settings.backing, SurfaceBacking::Pixmap);
        assert!(settings.verbose);
        assert!(settings.autotest);
        assert!(!settings.force_alpha);
        assert!(!settings.profile);
    }

    #[test]
    fn rejects_unknown_values() {
        let err = OffscreenSettings::from_lookup(lookup_from(&[("OFFSTAGE_READBACK", "none")]))
            .unwrap_err();
        assert_eq!(
            format!("{err}"),
            "Invalid value 'none' for setting 'OFFSTAGE_READBACK'"
        );
        assert!(
            OffscreenSettings::from_lookup(lookup_from(&[("OFFSTAGE_VERBOSE", "maybe")])).is_err()
        );
    }

    #[test]
    fn json_with_partial_fields() {
        let settings =
            OffscreenSettings::from_json(r#"{ "readback": "pbo", "backing": "pixmap" }"#).unwrap();
        assert_eq!(settings.readback, ReadbackStrategy::Staged);
        assert_eq!(settings.backing, SurfaceBacking::Pixmap);
        assert!(!settings.autotest);

        assert!(OffscreenSettings::from_json("{ not json").is_err());
    }
}
