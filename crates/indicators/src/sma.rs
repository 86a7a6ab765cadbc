use crate::math::{add, div, sub};
use crate::{check_period, defined, round2, run, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;
use std::collections::VecDeque;

/// Simple Moving Average (SMA).
#[derive(Debug, Clone)]
pub struct Sma {
    len: usize,
    buffer: VecDeque<Decimal>,
    sum: Decimal,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        check_period("SMA", period)?;
        Ok(Self {
            len: period,
            buffer: VecDeque::with_capacity(period),
            sum: Decimal::ZERO,
        })
    }

    /// Get the current SMA value without feeding new data.
    pub fn value(&self) -> Result<Option<Decimal>, IndicatorError> {
        if self.buffer.len() == self.len {
            div(self.sum, Decimal::from(self.len)).map(Some)
        } else {
            Ok(None)
        }
    }

    /// The values currently inside the window, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &Decimal> {
        self.buffer.iter()
    }
}

impl Indicator for Sma {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        self.sum = add(self.sum, value)?;
        self.buffer.push_back(value);

        if self.buffer.len() > self.len {
            if let Some(removed) = self.buffer.pop_front() {
                self.sum = sub(self.sum, removed)?;
            }
        }

        self.value()
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.sum = Decimal::ZERO;
    }

    fn period(&self) -> usize {
        self.len
    }

    fn is_ready(&self) -> bool {
        self.buffer.len() == self.len
    }
}

/// Rolling mean over `period` values, rounded to two decimals.
pub fn sma(values: &[Decimal], period: usize) -> Result<Series, IndicatorError> {
    let mut sma = Sma::new(period)?;
    run(&mut sma, &defined(values)).map(round2)
}
