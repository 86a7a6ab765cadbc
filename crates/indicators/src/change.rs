use crate::math::{div, mul, sub};
use crate::{round2, IndicatorError, Series};
use rust_decimal::Decimal;

/// Percentage change between consecutive values:
/// `(x[i] / x[i-1] - 1) * 100`, rounded to two decimals.
///
/// Undefined for the first value and wherever the previous value is zero.
pub fn pct_change(values: &[Decimal]) -> Result<Series, IndicatorError> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<Decimal> = None;
    for &x in values {
        let change = match prev {
            Some(p) if !p.is_zero() => Some(mul(sub(div(x, p)?, Decimal::ONE)?, Decimal::ONE_HUNDRED)?),
            _ => None,
        };
        out.push(change);
        prev = Some(x);
    }
    Ok(round2(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_pct_change() {
        let out = pct_change(&[dec!(100), dec!(105), dec!(99.75)]).unwrap();
        assert_eq!(out, vec![None, Some(dec!(5.00)), Some(dec!(-5.00))]);
    }

    #[test]
    fn test_zero_previous_is_undefined() {
        let out = pct_change(&[dec!(0), dec!(10), dec!(11)]).unwrap();
        assert_eq!(out[1], None);
        assert_eq!(out[2], Some(dec!(10.00)));
    }
}
