pub mod atr;
pub mod bollinger;
pub mod change;
pub mod ema;
pub mod macd;
pub mod math;
pub mod rsi;
pub mod sma;
pub mod supertrend;
pub mod wma;

use rust_decimal::Decimal;

/// An indicator column aligned with its input: `None` marks the warm-up
/// region (or a value that could not be computed).
pub type Series = Vec<Option<Decimal>>;

/// Errors raised while computing an indicator series.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndicatorError {
    #[error("{indicator}: invalid period {period}")]
    InvalidPeriod { indicator: &'static str, period: usize },
    #[error("arithmetic overflow")]
    Overflow,
    #[error("division by zero")]
    DivisionByZero,
}

/// Trait for streaming (incremental) single-input indicators.
/// Feed one value at a time; the indicator maintains internal state.
pub trait Indicator {
    /// Process the next value and return the indicator output (if ready).
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError>;

    /// Reset the indicator to its initial state.
    fn reset(&mut self);

    /// The minimum number of observations needed before the indicator produces output.
    fn period(&self) -> usize;

    /// Whether the indicator has enough data to produce output.
    fn is_ready(&self) -> bool;
}

/// One OHLC candle as seen by range-based indicators (ATR, SuperTrend).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hlc {
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

/// Drive `indicator` left to right over `values`.
///
/// Undefined inputs produce undefined outputs and are not fed to the
/// indicator, so a column computed from another column's warm-up region
/// starts its own warm-up at the first defined input.
pub fn run<I: Indicator>(indicator: &mut I, values: &[Option<Decimal>]) -> Result<Series, IndicatorError> {
    values
        .iter()
        .map(|v| match v {
            Some(x) => indicator.next(*x),
            None => Ok(None),
        })
        .collect()
}

/// Round every defined value to two decimals (banker's rounding).
pub fn round2(series: Series) -> Series {
    series.into_iter().map(|v| v.map(|x| x.round_dp(2))).collect()
}

pub(crate) fn defined(values: &[Decimal]) -> Vec<Option<Decimal>> {
    values.iter().copied().map(Some).collect()
}

pub(crate) fn check_period(indicator: &'static str, period: usize) -> Result<(), IndicatorError> {
    if period == 0 {
        Err(IndicatorError::InvalidPeriod { indicator, period })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sma::Sma;
    use rust_decimal_macros::dec;

    #[test]
    fn test_run_skips_undefined_inputs() {
        let mut sma = Sma::new(2).unwrap();
        let out = run(&mut sma, &[None, Some(dec!(1)), Some(dec!(3)), Some(dec!(5))]).unwrap();
        assert_eq!(out, vec![None, None, Some(dec!(2)), Some(dec!(4))]);
    }

    #[test]
    fn test_round2_is_half_even() {
        let out = round2(vec![Some(dec!(1.005)), Some(dec!(1.015)), None]);
        assert_eq!(out, vec![Some(dec!(1.00)), Some(dec!(1.02)), None]);
    }
}
