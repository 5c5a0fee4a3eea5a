//! Configuration file support
//!
//! Settings live in a TOML file, by default
//! `<config dir>/breathwork/config.toml`:
//!
//! ```toml
//! default_pattern = "4-7-8 Breathing"
//! repetitions = 4
//! countdown_seconds = 3
//!
//! [sound]
//! hold_after_inhale_level = 0.03
//!
//! [sound.voice]
//! base_frequency = 174.6
//! partial_weights = [0.6, 0.3, 0.1]
//!
//! [patterns."Slow Exhale"]
//! inhale = 4
//! exhale = 10
//! description = "Twice as long out as in."
//! ```
//!
//! Every field is optional.

use crate::error::{Error, Result};
use crate::pattern::{BreathingPattern, PatternCatalog, DEFAULT_PATTERN};
use crate::sound::SoundConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Pattern selected on startup
    pub default_pattern: String,
    /// Cycles per session
    pub repetitions: u32,
    /// Get-ready countdown before the first breath
    pub countdown_seconds: u32,
    pub sound: SoundConfig,
    /// Extra patterns, added after the built-in ones
    pub patterns: BTreeMap<String, BreathingPattern>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_pattern: DEFAULT_PATTERN.to_string(),
            repetitions: 5,
            countdown_seconds: 3,
            sound: SoundConfig::default(),
            patterns: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Parse a TOML document
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an explicit config file; it must exist
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        info!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Load `path` if given, else the default location if present, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("breathwork").join("config.toml"))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        if self.repetitions == 0 {
            return Err(Error::Config("repetitions must be at least 1".to_string()));
        }
        let sound = &self.sound;
        if !(sound.lead_in.is_finite() && sound.lead_in >= 0.0) {
            return Err(Error::Config(format!(
                "sound.lead_in must be a non-negative number of seconds, got {}",
                sound.lead_in
            )));
        }
        if sound.curve_resolution < 2 {
            return Err(Error::Config(format!(
                "sound.curve_resolution must be at least 2, got {}",
                sound.curve_resolution
            )));
        }
        self.catalog()?;
        Ok(())
    }

    /// Built-in patterns plus the ones from this config
    pub fn catalog(&self) -> Result<PatternCatalog> {
        let mut catalog = PatternCatalog::builtin();
        for (name, pattern) in &self.patterns {
            catalog.insert(name.clone(), pattern.clone())?;
        }
        if catalog.get(&self.default_pattern).is_none() {
            return Err(Error::UnknownPattern(self.default_pattern.clone()));
        }
        Ok(catalog)
    }
}
