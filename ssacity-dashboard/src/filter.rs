//! Client-side bin filtering over the current snapshot (no re-fetch)

use crate::bands::{FillBand, FillBreakpoints};
use crate::models::Bin;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BinFilter {
    #[default]
    All,
    /// Case-insensitive match on bin id or location
    Search(String),
    Band(FillBand),
}

impl BinFilter {
    pub fn search(term: impl Into<String>) -> Self {
        let term = term.into();
        if term.trim().is_empty() {
            BinFilter::All
        } else {
            BinFilter::Search(term)
        }
    }

    pub fn matches(&self, bin: &Bin, breakpoints: &FillBreakpoints) -> bool {
        match self {
            BinFilter::All => true,
            BinFilter::Search(term) => {
                let needle = term.trim().to_lowercase();
                needle.is_empty()
                    || bin.bin_id.to_lowercase().contains(&needle)
                    || bin.location.to_lowercase().contains(&needle)
            }
            BinFilter::Band(band) => breakpoints.contains(*band, bin.fill_level),
        }
    }

    /// Matching bins, server order preserved.
    pub fn apply<'a>(&self, bins: &'a [Bin], breakpoints: &FillBreakpoints) -> Vec<&'a Bin> {
        bins.iter().filter(|b| self.matches(b, breakpoints)).collect()
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, BinFilter::All)
    }
}

impl fmt::Display for BinFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinFilter::All => f.write_str("all bins"),
            BinFilter::Search(term) => write!(f, "search \"{}\"", term.trim()),
            BinFilter::Band(band) => write!(f, "{band} fill"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Bin> {
        vec![
            Bin::new("BIN-001", "Downtown Square - Area 1", 92.0),
            Bin::new("BIN-002", "Central Park - Area 2", 71.0),
            Bin::new("BIN-003", "Shopping Mall - Area 3", 55.0),
            Bin::new("BIN-004", "Central Station - Area 4", 50.0),
            Bin::new("BIN-005", "Hospital Area - Area 5", 85.0),
        ]
    }

    #[test]
    fn test_empty_search_returns_everything() {
        let bins = sample();
        let bp = FillBreakpoints::default();

        assert_eq!(BinFilter::search(""), BinFilter::All);
        assert_eq!(BinFilter::search("   ").apply(&bins, &bp).len(), bins.len());
        // constructed directly, a blank term still matches all
        let all: Vec<&Bin> = BinFilter::Search("  ".into()).apply(&bins, &bp);
        assert_eq!(all.iter().map(|b| &b.bin_id).collect::<Vec<_>>(),
                   bins.iter().map(|b| &b.bin_id).collect::<Vec<_>>());
    }

    #[test]
    fn test_search_id_and_location() {
        let bins = sample();
        let bp = FillBreakpoints::default();

        let central = BinFilter::search("central").apply(&bins, &bp);
        assert_eq!(central.len(), 2);

        let by_id = BinFilter::search("bin-003").apply(&bins, &bp);
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id[0].location, "Shopping Mall - Area 3");

        assert!(BinFilter::search("airport").apply(&bins, &bp).is_empty());
    }

    #[test]
    fn test_band_filter_bounds() {
        let bins = sample();
        let bp = FillBreakpoints::default();

        let ids = |band| {
            BinFilter::Band(band)
                .apply(&bins, &bp)
                .iter()
                .map(|b| b.bin_id.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(ids(FillBand::Critical), vec!["BIN-001"]);
        assert_eq!(ids(FillBand::High), vec!["BIN-002", "BIN-005"]);
        assert_eq!(ids(FillBand::Medium), vec!["BIN-003"]);
        assert_eq!(ids(FillBand::Low), vec!["BIN-004"]);
    }

    #[test]
    fn test_display() {
        assert_eq!(BinFilter::Band(FillBand::High).to_string(), "high fill");
        assert!(!BinFilter::All.is_active());
    }
}
