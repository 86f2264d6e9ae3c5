//! Fill-level classification shared by bin badges and the band filter

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillBand {
    Low,
    Medium,
    High,
    Critical,
}

impl FillBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            FillBand::Low => "low",
            FillBand::Medium => "medium",
            FillBand::High => "high",
            FillBand::Critical => "critical",
        }
    }

    /// Single-character gauge marker used by the text renderer.
    pub fn marker(&self) -> char {
        match self {
            FillBand::Low => '.',
            FillBand::Medium => '-',
            FillBand::High => '+',
            FillBand::Critical => '!',
        }
    }
}

impl fmt::Display for FillBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FillBand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(FillBand::Low),
            "medium" => Ok(FillBand::Medium),
            "high" => Ok(FillBand::High),
            "critical" => Ok(FillBand::Critical),
            other => Err(format!("unknown fill band '{other}' (low, medium, high, critical)")),
        }
    }
}

/// Lower (exclusive) bounds of the upper three bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillBreakpoints {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
}

impl Default for FillBreakpoints {
    fn default() -> Self {
        Self {
            critical: 85.0,
            high: 70.0,
            medium: 50.0,
        }
    }
}

impl FillBreakpoints {
    pub fn classify(&self, fill_level: f64) -> FillBand {
        if fill_level > self.critical {
            FillBand::Critical
        } else if fill_level > self.high {
            FillBand::High
        } else if fill_level > self.medium {
            FillBand::Medium
        } else {
            FillBand::Low
        }
    }

    /// critical `(critical, ∞)`, high `(high, critical]`, medium `(medium, high]`, low `(-∞, medium]`
    pub fn contains(&self, band: FillBand, fill_level: f64) -> bool {
        self.classify(fill_level) == band
    }

    pub fn validate(&self) -> Result<(), String> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !(in_range(self.critical) && in_range(self.high) && in_range(self.medium)) {
            return Err("fill breakpoints must lie within 0..=100".into());
        }
        if !(self.critical > self.high && self.high > self.medium) {
            return Err(format!(
                "fill breakpoints must be strictly descending (critical {} > high {} > medium {})",
                self.critical, self.high, self.medium
            ));
        }
        Ok(())
    }
}
