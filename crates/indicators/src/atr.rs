use crate::ema::Ema;
use crate::math::sub;
use crate::{round2, Hlc, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;

/// Average True Range (ATR).
///
/// True range is `max(high - low, |high - prev_close|, |low - prev_close|)`;
/// the first bar has no previous close and contributes `high - low`.
/// Smoothed with Wilder's EMA, so the first value appears on bar `period`.
#[derive(Debug, Clone)]
pub struct Atr {
    len: usize,
    prev_close: Option<Decimal>,
    smoother: Ema,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            len: period,
            prev_close: None,
            smoother: Ema::wilder(period)?,
        })
    }

    /// Feed high, low, close and compute ATR.
    pub fn next_hlc(&mut self, high: Decimal, low: Decimal, close: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        let hl = sub(high, low)?;
        let tr = match self.prev_close {
            Some(prev_c) => {
                let hc = sub(high, prev_c)?.abs();
                let lc = sub(low, prev_c)?.abs();
                hl.max(hc).max(lc)
            }
            None => hl,
        };
        self.prev_close = Some(close);
        self.smoother.next(tr)
    }

    pub fn value(&self) -> Option<Decimal> {
        self.smoother.value()
    }

    pub fn reset(&mut self) {
        self.prev_close = None;
        self.smoother.reset();
    }

    pub fn period(&self) -> usize {
        self.len
    }

    pub fn is_ready(&self) -> bool {
        self.smoother.is_ready()
    }
}

/// ATR over a candle series, rounded to two decimals.
pub fn atr(bars: &[Hlc], period: usize) -> Result<Series, IndicatorError> {
    let mut atr = Atr::new(period)?;
    let out = bars
        .iter()
        .map(|b| atr.next_hlc(b.high, b.low, b.close))
        .collect::<Result<Series, _>>()?;
    Ok(round2(out))
}
