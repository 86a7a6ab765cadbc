use crate::ema::Ema;
use crate::math::{add, div, sub};
use crate::{defined, round2, run, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Relative Strength Index (RSI).
/// Uses Wilder's smoothing (alpha = 1/period) for average gain/loss.
///
/// Observations are close-to-close changes, so the first value appears after
/// `period + 1` closes. When the average loss is zero the index is 100.
#[derive(Debug, Clone)]
pub struct Rsi {
    len: usize,
    prev_value: Option<Decimal>,
    avg_gain: Ema,
    avg_loss: Ema,
}

impl Rsi {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            len: period,
            prev_value: None,
            avg_gain: Ema::wilder(period)?,
            avg_loss: Ema::wilder(period)?,
        })
    }

    pub fn value(&self) -> Result<Option<Decimal>, IndicatorError> {
        match (self.avg_gain.value(), self.avg_loss.value()) {
            (Some(ag), Some(al)) => {
                if al.is_zero() {
                    Ok(Some(dec!(100)))
                } else {
                    let rs = div(ag, al)?;
                    Ok(Some(sub(dec!(100), div(dec!(100), add(Decimal::ONE, rs)?)?)?))
                }
            }
            _ => Ok(None),
        }
    }
}

impl Indicator for Rsi {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        if let Some(prev) = self.prev_value {
            let change = sub(value, prev)?;
            let gain = change.max(Decimal::ZERO);
            let loss = (-change).max(Decimal::ZERO);
            self.avg_gain.next(gain)?;
            self.avg_loss.next(loss)?;
        }

        self.prev_value = Some(value);
        self.value()
    }

    fn reset(&mut self) {
        self.prev_value = None;
        self.avg_gain.reset();
        self.avg_loss.reset();
    }

    fn period(&self) -> usize {
        self.len + 1 // need one extra data point for the first change
    }

    fn is_ready(&self) -> bool {
        self.avg_gain.is_ready()
    }
}

/// RSI of a close series, rounded to two decimals.
pub fn rsi(closes: &[Decimal], period: usize) -> Result<Series, IndicatorError> {
    let mut rsi = Rsi::new(period)?;
    run(&mut rsi, &defined(closes)).map(round2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_warm_up_and_values() {
        let closes = [dec!(90), dec!(95), dec!(100), dec!(97), dec!(103)];
        let out = rsi(&closes, 3).unwrap();
        // Wilder averages need `period` price changes, so the first value
        // lands on index `period`, one bar after the window fills.
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        assert_eq!(out[2], None);
        // avg gain 10/3, avg loss 1 → 100 - 100 / (13/3)
        assert_eq!(out[3], Some(dec!(76.92)));
        // avg gain 38/9, avg loss 2/3 → 100 - 100 / (22/3)
        assert_eq!(out[4], Some(dec!(86.36)));
    }

    #[test]
    fn test_rsi_all_gains_is_100() {
        let closes: Vec<Decimal> = (1..=10).map(Decimal::from).collect();
        let out = rsi(&closes, 3).unwrap();
        for v in out.iter().skip(3) {
            assert_eq!(*v, Some(dec!(100)));
        }
    }

    #[test]
    fn test_rsi_bounded() {
        let closes = [
            dec!(44), dec!(44.34), dec!(44.09), dec!(43.61), dec!(44.33),
            dec!(44.83), dec!(45.10), dec!(45.42), dec!(45.84), dec!(46.08),
            dec!(45.89), dec!(46.03), dec!(45.61), dec!(46.28), dec!(46.28),
            dec!(46.00), dec!(46.03), dec!(46.41), dec!(46.22), dec!(45.64),
        ];
        let out = rsi(&closes, 14).unwrap();
        assert!(out[..14].iter().all(Option::is_none));
        for v in out[14..].iter() {
            let v = v.unwrap();
            assert!(v >= Decimal::ZERO && v <= dec!(100));
        }
    }

    #[test]
    fn test_rsi_all_losses_is_zero() {
        let closes: Vec<Decimal> = (1..=8).rev().map(Decimal::from).collect();
        let out = rsi(&closes, 3).unwrap();
        assert_eq!(out[5], Some(Decimal::ZERO));
    }
}
