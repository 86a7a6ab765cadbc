use crate::math::{add, div, mul};
use crate::{check_period, round2, run, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Linear-Weighted Moving Average (WMA).
///
/// Weights run 1..=period, the most recent value carrying `period`.
#[derive(Debug, Clone)]
pub struct Wma {
    len: usize,
    buffer: VecDeque<Decimal>,
    weight_sum: Decimal,
}

impl Wma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("WMA", period)?;
        let weight_sum = Decimal::from(period * (period + 1) / 2);
        Ok(Self {
            len: period,
            buffer: VecDeque::with_capacity(period),
            weight_sum,
        })
    }

    pub fn value(&self) -> Result<Option<Decimal>, IndicatorError> {
        if self.buffer.len() < self.len {
            return Ok(None);
        }
        let mut weighted = Decimal::ZERO;
        for (i, v) in self.buffer.iter().enumerate() {
            weighted = add(weighted, mul(*v, Decimal::from(i + 1))?)?;
        }
        div(weighted, self.weight_sum).map(Some)
    }
}

impl Indicator for Wma {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        self.buffer.push_back(value);
        if self.buffer.len() > self.len {
            self.buffer.pop_front();
        }
        self.value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.len
    }
}

/// WMA over a column that may carry a leading undefined region, rounded to
/// two decimals.
pub fn wma(values: &[Option<Decimal>], period: usize) -> Result<Series, IndicatorError> {
    let mut wma = Wma::new(period)?;
    run(&mut wma, values).map(round2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wma_weights_recent_highest() {
        let mut wma = Wma::new(3).unwrap();
        assert_eq!(wma.next(dec!(1)).unwrap(), None);
        assert_eq!(wma.next(dec!(2)).unwrap(), None);
        // (1*1 + 2*2 + 3*3) / 6
        assert_eq!(wma.next(dec!(3)).unwrap().unwrap().round_dp(4), dec!(2.3333));
        // (2*1 + 3*2 + 6*3) / 6
        assert_eq!(wma.next(dec!(6)).unwrap().unwrap().round_dp(4), dec!(4.3333));
    }

    #[test]
    fn test_wma_series_undefined_until_full_window() {
        let input = vec![None, Some(dec!(6)), Some(dec!(6)), Some(dec!(12))];
        let out = wma(&input, 3).unwrap();
        assert!(out[..3].iter().all(Option::is_none));
        // (6 + 12 + 36) / 6
        assert_eq!(out[3], Some(dec!(9)));
    }
}
