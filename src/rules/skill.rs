use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkillKind {
    Prospecting,
    Panning,
    Excavation,
    Trading,
    Fitness,
}

impl SkillKind {
    pub const ALL: [SkillKind; 5] = [
        SkillKind::Prospecting,
        SkillKind::Panning,
        SkillKind::Excavation,
        SkillKind::Trading,
        SkillKind::Fitness,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SkillKind::Prospecting => "prospecting",
            SkillKind::Panning => "panning",
            SkillKind::Excavation => "excavation",
            SkillKind::Trading => "trading",
            SkillKind::Fitness => "fitness",
        }
    }
}

impl fmt::Display for SkillKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSkillError {
    pub value: String,
}

impl fmt::Display for ParseSkillError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown skill {}", self.value)
    }
}

impl std::error::Error for ParseSkillError {}

impl FromStr for SkillKind {
    type Err = ParseSkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SkillKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ParseSkillError {
                value: s.to_string(),
            })
    }
}

/// Concave growth curve: level 1 at 0 xp, level 2 at 49 xp, level 5 at 784 xp.
pub fn level_from_xp(xp: f64) -> u32 {
    if !xp.is_finite() || xp <= 0.0 {
        return 1;
    }
    (1.0 + xp.sqrt() / 7.0).floor() as u32
}

/// Experience counters for the five skills. Levels are always derived.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSet {
    #[serde(default)]
    prospecting: f64,
    #[serde(default)]
    panning: f64,
    #[serde(default)]
    excavation: f64,
    #[serde(default)]
    trading: f64,
    #[serde(default)]
    fitness: f64,
}

impl SkillSet {
    pub fn xp(&self, kind: SkillKind) -> f64 {
        match kind {
            SkillKind::Prospecting => self.prospecting,
            SkillKind::Panning => self.panning,
            SkillKind::Excavation => self.excavation,
            SkillKind::Trading => self.trading,
            SkillKind::Fitness => self.fitness,
        }
    }

    pub fn level(&self, kind: SkillKind) -> u32 {
        level_from_xp(self.xp(kind))
    }

    /// Add experience. Negative, zero and non-finite amounts are ignored.
    /// Returns the new level when this gain crossed a level boundary.
    pub fn gain_xp(&mut self, kind: SkillKind, amount: f64) -> Option<u32> {
        if !amount.is_finite() || amount <= 0.0 {
            return None;
        }
        let before = self.level(kind);
        *self.slot_mut(kind) += amount;
        let after = self.level(kind);
        (after != before).then_some(after)
    }

    /// Restore a persisted counter. Garbage values load as zero.
    pub fn set_xp(&mut self, kind: SkillKind, xp: f64) {
        *self.slot_mut(kind) = if xp.is_finite() { xp.max(0.0) } else { 0.0 };
    }

    fn slot_mut(&mut self, kind: SkillKind) -> &mut f64 {
        match kind {
            SkillKind::Prospecting => &mut self.prospecting,
            SkillKind::Panning => &mut self.panning,
            SkillKind::Excavation => &mut self.excavation,
            SkillKind::Trading => &mut self.trading,
            SkillKind::Fitness => &mut self.fitness,
        }
    }
}
