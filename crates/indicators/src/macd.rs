use crate::ema::Ema;
use crate::math::sub;
use crate::{round2, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;

/// MACD (Moving Average Convergence Divergence).
///
/// Composed of three span EMAs:
/// - Fast EMA (default 12)
/// - Slow EMA (default 26)
/// - Signal EMA (default 9) of the MACD line
///
/// All three seed at the first observation, so output starts on the first bar.
#[derive(Debug, Clone)]
pub struct Macd {
    fast_ema: Ema,
    slow_ema: Ema,
    signal_ema: Ema,
    output: Option<MacdOutput>,
}

/// MACD line and signal line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdOutput {
    pub macd: Decimal,
    pub signal: Decimal,
}

/// MACD columns aligned with the input closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MacdSeries {
    pub macd: Series,
    pub signal: Series,
}

impl Macd {
    pub fn new(fast_period: usize, slow_period: usize, signal_period: usize) -> Result<Self, IndicatorError> {
        if fast_period >= slow_period {
            return Err(IndicatorError::InvalidPeriod { indicator: "MACD", period: fast_period });
        }
        Ok(Self {
            fast_ema: Ema::new(fast_period)?,
            slow_ema: Ema::new(slow_period)?,
            signal_ema: Ema::new(signal_period)?,
            output: None,
        })
    }

    /// Standard MACD (12, 26, 9).
    pub fn default_periods() -> Result<Self, IndicatorError> {
        Self::new(12, 26, 9)
    }

    pub fn output(&self) -> Option<MacdOutput> {
        self.output
    }

    /// Process next value and return full output if ready.
    pub fn next_output(&mut self, value: Decimal) -> Result<Option<MacdOutput>, IndicatorError> {
        let fast = self.fast_ema.next(value)?;
        let slow = self.slow_ema.next(value)?;

        if let (Some(f), Some(s)) = (fast, slow) {
            let macd = sub(f, s)?;
            if let Some(signal) = self.signal_ema.next(macd)? {
                self.output = Some(MacdOutput { macd, signal });
            }
        }

        Ok(self.output)
    }
}

impl Indicator for Macd {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        Ok(self.next_output(value)?.map(|o| o.macd))
    }

    fn reset(&mut self) {
        self.fast_ema.reset();
        self.slow_ema.reset();
        self.signal_ema.reset();
        self.output = None;
    }

    fn period(&self) -> usize {
        self.slow_ema.period()
    }

    fn is_ready(&self) -> bool {
        self.output.is_some()
    }
}

/// MACD(12, 26, 9) over a close series. The signal line smooths the unrounded
/// MACD line; both columns are rounded to two decimals on the way out.
pub fn macd(closes: &[Decimal]) -> Result<MacdSeries, IndicatorError> {
    let mut macd = Macd::default_periods()?;
    let mut out = MacdSeries::default();
    for close in closes {
        let o = macd.next_output(*close)?;
        out.macd.push(o.map(|o| o.macd));
        out.signal.push(o.map(|o| o.signal));
    }
    Ok(MacdSeries {
        macd: round2(out.macd),
        signal: round2(out.signal),
    })
}
