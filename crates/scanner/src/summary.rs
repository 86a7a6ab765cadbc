use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use crate::scan::ScanMatch;

/// Forward-return statistics for one horizon, over matches where the return
/// is available.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HorizonStats {
    pub days: usize,
    pub samples: usize,
    pub wins: usize,
    /// Percent of samples with a positive return.
    pub win_rate: Decimal,
    /// Most negative return seen; `None` without samples.
    pub max_loss: Option<Decimal>,
    pub avg_return: Option<Decimal>,
}

/// Aggregate outcome of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanSummary {
    pub matches: usize,
    pub horizons: Vec<HorizonStats>,
}

impl ScanSummary {
    pub fn from_matches(matches: &[ScanMatch], forward_days: &[usize]) -> Self {
        Self {
            matches: matches.len(),
            horizons: forward_days.iter().map(|&days| horizon_stats(matches, days)).collect(),
        }
    }

    pub fn horizon(&self, days: usize) -> Option<&HorizonStats> {
        self.horizons.iter().find(|h| h.days == days)
    }
}

fn horizon_stats(matches: &[ScanMatch], days: usize) -> HorizonStats {
    let returns: Vec<Decimal> = matches.iter().filter_map(|m| m.forward(days)).collect();
    let samples = returns.len();
    let wins = returns.iter().filter(|r| **r > Decimal::ZERO).count();

    let win_rate = if samples == 0 {
        Decimal::ZERO
    } else {
        (Decimal::from(wins) / Decimal::from(samples) * dec!(100)).round_dp(2)
    };

    let avg_return = if samples == 0 {
        None
    } else {
        Some((returns.iter().sum::<Decimal>() / Decimal::from(samples)).round_dp(2))
    };

    HorizonStats {
        days,
        samples,
        wins,
        win_rate,
        max_loss: returns.iter().min().copied(),
        avg_return,
    }
}
