//! Breathing patterns and the built-in catalog
//!
//! A pattern is four phase durations in whole seconds plus a description.
//! A duration of 0 means the phase is skipped. Inhale and exhale must be
//! strictly positive.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four intervals of a breathing cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Inhale,
    HoldAfterInhale,
    Exhale,
    HoldAfterExhale,
}

impl Phase {
    /// Cycle order
    pub const ALL: [Phase; 4] = [
        Phase::Inhale,
        Phase::HoldAfterInhale,
        Phase::Exhale,
        Phase::HoldAfterExhale,
    ];

    /// Next phase in cycle order, wrapping back to inhale
    pub fn next(self) -> Phase {
        match self {
            Phase::Inhale => Phase::HoldAfterInhale,
            Phase::HoldAfterInhale => Phase::Exhale,
            Phase::Exhale => Phase::HoldAfterExhale,
            Phase::HoldAfterExhale => Phase::Inhale,
        }
    }

    /// Instruction shown to the user
    pub fn label(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe In",
            Phase::HoldAfterInhale | Phase::HoldAfterExhale => "Hold",
            Phase::Exhale => "Breathe Out",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Inhale => "inhale",
            Phase::HoldAfterInhale => "holdAfterInhale",
            Phase::Exhale => "exhale",
            Phase::HoldAfterExhale => "holdAfterExhale",
        }
    }

    pub fn is_hold(self) -> bool {
        matches!(self, Phase::HoldAfterInhale | Phase::HoldAfterExhale)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase durations (seconds) and description of one breathing technique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingPattern {
    pub inhale: u32,
    #[serde(default)]
    pub hold_after_inhale: u32,
    pub exhale: u32,
    #[serde(default)]
    pub hold_after_exhale: u32,
    #[serde(default)]
    pub description: String,
}

impl BreathingPattern {
    /// Create a validated pattern
    pub fn new(
        inhale: u32,
        hold_after_inhale: u32,
        exhale: u32,
        hold_after_exhale: u32,
        description: impl Into<String>,
    ) -> Result<Self> {
        let pattern = Self {
            inhale,
            hold_after_inhale,
            exhale,
            hold_after_exhale,
            description: description.into(),
        };
        pattern.validate()?;
        Ok(pattern)
    }

    /// Reject patterns that would never leave a phase
    pub fn validate(&self) -> Result<()> {
        if self.inhale == 0 || self.exhale == 0 {
            return Err(Error::DegeneratePattern(format!(
                "inhale and exhale must be positive (got inhale={}, exhale={})",
                self.inhale, self.exhale
            )));
        }
        Ok(())
    }

    /// Configured duration of a phase in seconds
    pub fn duration(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::HoldAfterInhale => self.hold_after_inhale,
            Phase::Exhale => self.exhale,
            Phase::HoldAfterExhale => self.hold_after_exhale,
        }
    }

    /// Length of one full cycle in seconds
    pub fn cycle_seconds(&self) -> u32 {
        self.inhale + self.hold_after_inhale + self.exhale + self.hold_after_exhale
    }

    pub fn breaths_per_minute(&self) -> f32 {
        60.0 / self.cycle_seconds().max(1) as f32
    }

    /// Phases visited in one cycle, skipping zero-length holds
    pub fn active_phases(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL
            .into_iter()
            .filter(move |&phase| self.duration(phase) > 0)
    }
}

/// Name of the pattern selected on startup
pub const DEFAULT_PATTERN: &str = "Box Breathing";

/// Ordered, named collection of patterns
#[derive(Debug, Clone, Default)]
pub struct PatternCatalog {
    entries: Vec<(String, BreathingPattern)>,
}

impl PatternCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in techniques, in selector order
    pub fn builtin() -> Self {
        let builtin = [
            (
                "Box Breathing",
                (4, 4, 4, 4),
                "Equal parts inhale, hold, exhale, and hold. Great for stress relief.",
            ),
            (
                "4-7-8 Breathing",
                (4, 7, 8, 0),
                "Inhale for 4, hold for 7, exhale for 8. Helps with sleep and anxiety.",
            ),
            (
                "Deep Calm",
                (5, 2, 7, 0),
                "Long exhales promote relaxation and parasympathetic response.",
            ),
            (
                "Alternate Nostril",
                (4, 4, 6, 2),
                "Traditional yogic breathing for balance and focus.",
            ),
            (
                "Ocean Breath",
                (4, 0, 6, 0),
                "Ujjayi breath with slight throat constriction, creating an ocean sound.",
            ),
            (
                "Energizing Breath",
                (2, 0, 2, 0),
                "Quick, rhythmic breathing to increase energy and alertness.",
            ),
            (
                "Lion's Breath",
                (4, 2, 4, 2),
                "Deep inhale through nose, explosive exhale with tongue out. Releases tension.",
            ),
        ];

        let entries = builtin
            .into_iter()
            .map(|(name, (inhale, hold_in, exhale, hold_out), description)| {
                (
                    name.to_string(),
                    BreathingPattern {
                        inhale,
                        hold_after_inhale: hold_in,
                        exhale,
                        hold_after_exhale: hold_out,
                        description: description.to_string(),
                    },
                )
            })
            .collect();

        Self { entries }
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<&BreathingPattern> {
        self.position(name).map(|idx| &self.entries[idx].1)
    }

    /// Canonical spelling of a pattern name
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].0.as_str())
    }

    /// Add a pattern, replacing any entry with the same name
    pub fn insert(&mut self, name: impl Into<String>, pattern: BreathingPattern) -> Result<()> {
        let name = name.into();
        pattern.validate().map_err(|e| match e {
            Error::DegeneratePattern(msg) => Error::DegeneratePattern(format!("'{}': {}", name, msg)),
            other => other,
        })?;

        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = pattern,
            None => self.entries.push((name, pattern)),
        }
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BreathingPattern)> {
        self.entries.iter().map(|(name, p)| (name.as_str(), p))
    }

    /// Name following `name` in selector order, wrapping around
    pub fn next_name(&self, name: &str) -> Option<&str> {
        let idx = self.position(name)?;
        let next = (idx + 1) % self.entries.len();
        Some(self.entries[next].0.as_str())
    }

    /// Name preceding `name` in selector order, wrapping around
    pub fn previous_name(&self, name: &str) -> Option<&str> {
        let idx = self.position(name)?;
        let prev = (idx + self.entries.len() - 1) % self.entries.len();
        Some(self.entries[prev].0.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}
