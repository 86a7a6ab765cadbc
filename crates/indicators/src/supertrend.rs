use crate::atr::atr;
use crate::math::{add, div, mul, sub};
use crate::{round2, Hlc, IndicatorError, Series};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trend side reported by SuperTrend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
}

impl TrendDirection {
    /// `+1` for up, `-1` for down.
    pub fn signum(self) -> i16 {
        match self {
            TrendDirection::Up => 1,
            TrendDirection::Down => -1,
        }
    }

    pub fn from_signum(value: i16) -> Option<Self> {
        match value {
            1 => Some(TrendDirection::Up),
            -1 => Some(TrendDirection::Down),
            _ => None,
        }
    }
}

/// SuperTrend columns aligned with the input candles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuperTrendSeries {
    pub value: Series,
    pub direction: Vec<Option<TrendDirection>>,
    pub final_upper: Series,
    pub final_lower: Series,
}

/// Band state carried from one bar to the next.
#[derive(Debug, Clone, Copy)]
struct BandState {
    final_upper: Decimal,
    final_lower: Decimal,
    value: Decimal,
    close: Decimal,
}

/// Path-dependent SuperTrend state machine.
///
/// The recurrence starts on the first bar with a defined ATR: that bar takes
/// the upper band and a down trend. From then on the final bands only move
/// toward price unless price closed through them on the previous bar, and the
/// trend flips on a close above the previous SuperTrend value.
#[derive(Debug, Clone)]
pub struct SuperTrend {
    multiplier: Decimal,
    state: Option<BandState>,
}

impl SuperTrend {
    pub fn new(multiplier: Decimal) -> Self {
        Self { multiplier, state: None }
    }

    /// Advance one bar given its (rounded) ATR.
    pub fn next(&mut self, bar: &Hlc, atr: Option<Decimal>) -> Result<Option<(BandSnapshot, TrendDirection)>, IndicatorError> {
        let Some(atr) = atr else {
            return Ok(None);
        };
        let hl2 = div(add(bar.high, bar.low)?, Decimal::TWO)?;
        let offset = mul(self.multiplier, atr)?;
        let basic_upper = add(hl2, offset)?;
        let basic_lower = sub(hl2, offset)?;

        let (next, direction) = match self.state {
            None => (
                BandState {
                    final_upper: basic_upper,
                    final_lower: basic_lower,
                    value: basic_upper,
                    close: bar.close,
                },
                TrendDirection::Down,
            ),
            Some(prev) => {
                let final_upper = if basic_upper < prev.final_upper || prev.close > prev.final_upper {
                    basic_upper
                } else {
                    prev.final_upper
                };
                let final_lower = if basic_lower > prev.final_lower || prev.close < prev.final_lower {
                    basic_lower
                } else {
                    prev.final_lower
                };
                let (value, direction) = if bar.close > prev.value {
                    (final_lower, TrendDirection::Up)
                } else {
                    (final_upper, TrendDirection::Down)
                };
                (
                    BandState {
                        final_upper,
                        final_lower,
                        value,
                        close: bar.close,
                    },
                    direction,
                )
            }
        };

        self.state = Some(next);
        Ok(Some((
            BandSnapshot {
                value: next.value,
                final_upper: next.final_upper,
                final_lower: next.final_lower,
            },
            direction,
        )))
    }

    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// One bar's SuperTrend value and final bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandSnapshot {
    pub value: Decimal,
    pub final_upper: Decimal,
    pub final_lower: Decimal,
}

/// SuperTrend(atr_period, multiplier) over a candle series.
///
/// The whole prefix shapes every later value, so callers recomputing a tail
/// must pass enough preceding candles for the band state to converge.
pub fn supertrend(bars: &[Hlc], atr_period: usize, multiplier: Decimal) -> Result<SuperTrendSeries, IndicatorError> {
    let atr = atr(bars, atr_period)?;
    let mut st = SuperTrend::new(multiplier);
    let mut out = SuperTrendSeries::default();

    for (bar, atr) in bars.iter().zip(atr) {
        match st.next(bar, atr)? {
            Some((snap, direction)) => {
                out.value.push(Some(snap.value));
                out.direction.push(Some(direction));
                out.final_upper.push(Some(snap.final_upper));
                out.final_lower.push(Some(snap.final_lower));
            }
            None => {
                out.value.push(None);
                out.direction.push(None);
                out.final_upper.push(None);
                out.final_lower.push(None);
            }
        }
    }

    Ok(SuperTrendSeries {
        value: round2(out.value),
        direction: out.direction,
        final_upper: round2(out.final_upper),
        final_lower: round2(out.final_lower),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hlc(high: Decimal, low: Decimal, close: Decimal) -> Hlc {
        Hlc { high, low, close }
    }

    #[test]
    fn test_seed_is_upper_band_and_down() {
        // ATR(1) is defined on the first bar: TR = 2, hl2 = 100, upper = 106
        let bars = [hlc(dec!(101), dec!(99), dec!(100)), hlc(dec!(108), dec!(106), dec!(107))];
        let st = supertrend(&bars, 1, dec!(3)).unwrap();
        assert_eq!(st.direction[0], Some(TrendDirection::Down));
        assert_eq!(st.value[0], st.final_upper[0]);
        assert_eq!(st.value[0], Some(dec!(106)));
        // close 107 > previous value 106 → flip up onto the lower band
        assert_eq!(st.direction[1], Some(TrendDirection::Up));
        assert_eq!(st.value[1], st.final_lower[1]);
    }

    #[test]
    fn test_undefined_during_atr_warm_up() {
        let bars: Vec<Hlc> = (0..15)
            .map(|i| {
                let c = Decimal::from(100 + i);
                hlc(c + dec!(1), c - dec!(1), c)
            })
            .collect();
        let st = supertrend(&bars, 10, dec!(3)).unwrap();
        assert!(st.value[..9].iter().all(Option::is_none));
        assert!(st.direction[..9].iter().all(Option::is_none));
        assert_eq!(st.direction[9], Some(TrendDirection::Down));
        assert!(st.value[9..].iter().all(Option::is_some));
    }

    #[test]
    fn test_upper_band_ratchets_down_only() {
        // flat closes below the band: upper band may not widen back out
        let bars = [
            hlc(dec!(101), dec!(99), dec!(100)),
            hlc(dec!(100.5), dec!(99.5), dec!(100)),
            hlc(dec!(103), dec!(97), dec!(100)),
        ];
        let st = supertrend(&bars, 1, dec!(1)).unwrap();
        let uppers: Vec<Decimal> = st.final_upper.iter().map(|v| v.unwrap()).collect();
        assert!(uppers[1] <= uppers[0]);
        assert_eq!(uppers[2], uppers[1]);
        assert!(st.direction.iter().all(|d| *d == Some(TrendDirection::Down)));
    }

    #[test]
    fn test_direction_signum_round_trip() {
        assert_eq!(TrendDirection::from_signum(TrendDirection::Up.signum()), Some(TrendDirection::Up));
        assert_eq!(TrendDirection::from_signum(0), None);
    }
}
