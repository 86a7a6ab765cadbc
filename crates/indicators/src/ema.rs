use crate::math::{add, div, mul, sub};
use crate::{check_period, round2, run, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;

/// Exponential Moving Average (EMA).
///
/// `ema[i] = ema[i-1] + alpha * (x[i] - ema[i-1])`, seeded with the first
/// observation. Output is withheld until `min_periods` observations have been
/// absorbed; the recurrence itself runs from the very first one.
#[derive(Debug, Clone)]
pub struct Ema {
    len: usize,
    alpha: Decimal,
    min_periods: usize,
    current: Option<Decimal>,
    count: usize,
}

impl Ema {
    /// Span-based EMA, `alpha = 2 / (span + 1)`, emitting from the first value.
    pub fn new(span: usize) -> Result<Self, IndicatorError> {
        check_period("EMA", span)?;
        let alpha = div(Decimal::TWO, Decimal::from(span) + Decimal::ONE)?;
        Ok(Self {
            len: span,
            alpha,
            min_periods: 1,
            current: None,
            count: 0,
        })
    }

    /// Wilder's smoothing, `alpha = 1 / period`, emitting once `period`
    /// observations have been seen.
    pub fn wilder(period: usize) -> Result<Self, IndicatorError> {
        check_period("Wilder", period)?;
        let alpha = div(Decimal::ONE, Decimal::from(period))?;
        Ok(Self {
            len: period,
            alpha,
            min_periods: period,
            current: None,
            count: 0,
        })
    }

    pub fn value(&self) -> Option<Decimal> {
        if self.is_ready() {
            self.current
        } else {
            None
        }
    }
}

impl Indicator for Ema {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        self.count += 1;
        let next = match self.current {
            None => value,
            Some(prev) => add(prev, mul(self.alpha, sub(value, prev)?)?)?,
        };
        self.current = Some(next);
        Ok(self.value())
    }

    fn reset(&mut self) {
        self.current = None;
        self.count = 0;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.count >= self.min_periods
    }
}

/// Span EMA over a column that may carry a leading undefined region,
/// rounded to two decimals.
pub fn ema(values: &[Option<Decimal>], span: usize) -> Result<Series, IndicatorError> {
    let mut ema = Ema::new(span)?;
    run(&mut ema, values).map(round2)
}
