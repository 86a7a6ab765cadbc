//! Checked `Decimal` arithmetic. `Decimal` panics on overflow, and a single
//! symbol's bad data must not take down a batch, so every indicator goes
//! through these helpers instead of the bare operators.

use crate::IndicatorError;
use rust_decimal::Decimal;

pub fn add(a: Decimal, b: Decimal) -> Result<Decimal, IndicatorError> {
    a.checked_add(b).ok_or(IndicatorError::Overflow)
}

pub fn sub(a: Decimal, b: Decimal) -> Result<Decimal, IndicatorError> {
    a.checked_sub(b).ok_or(IndicatorError::Overflow)
}

pub fn mul(a: Decimal, b: Decimal) -> Result<Decimal, IndicatorError> {
    a.checked_mul(b).ok_or(IndicatorError::Overflow)
}

pub fn div(a: Decimal, b: Decimal) -> Result<Decimal, IndicatorError> {
    if b.is_zero() {
        return Err(IndicatorError::DivisionByZero);
    }
    a.checked_div(b).ok_or(IndicatorError::Overflow)
}

/// Newton's method square root for Decimal.
pub fn sqrt(value: Decimal) -> Result<Decimal, IndicatorError> {
    if value <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }
    let mut guess = div(value, Decimal::TWO)?;
    let epsilon = Decimal::new(1, 12);
    for _ in 0..100 {
        let next_guess = div(add(guess, div(value, guess)?)?, Decimal::TWO)?;
        let diff = (next_guess - guess).abs();
        guess = next_guess;
        if diff < epsilon {
            break;
        }
    }
    Ok(guess)
}
