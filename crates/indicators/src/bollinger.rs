use crate::math::{add, div, mul, sqrt, sub};
use crate::sma::Sma;
use crate::{round2, Indicator, IndicatorError, Series};
use rust_decimal::Decimal;

/// Bollinger Bands.
///
/// Middle band is the SMA; the bands sit `num_std` sample standard deviations
/// (divisor n - 1) either side of it.
#[derive(Debug, Clone)]
pub struct BollingerBands {
    num_std: Decimal,
    sma: Sma,
    output: Option<BollingerOutput>,
}

/// Bollinger Bands output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BollingerOutput {
    pub upper: Decimal,
    pub middle: Decimal,
    pub lower: Decimal,
}

/// Bollinger columns aligned with the input closes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BollingerSeries {
    pub upper: Series,
    pub middle: Series,
    pub lower: Series,
}

impl BollingerBands {
    pub fn new(period: usize, num_std_dev: Decimal) -> Result<Self, IndicatorError> {
        if period < 2 {
            return Err(IndicatorError::InvalidPeriod { indicator: "Bollinger", period });
        }
        Ok(Self {
            num_std: num_std_dev,
            sma: Sma::new(period)?,
            output: None,
        })
    }

    /// Standard Bollinger Bands (20, 2).
    pub fn default_periods() -> Result<Self, IndicatorError> {
        Self::new(20, Decimal::TWO)
    }

    /// Sample standard deviation of the current window around `mean`.
    fn std_dev(&self, mean: Decimal) -> Result<Decimal, IndicatorError> {
        let mut squares = Decimal::ZERO;
        let mut n = 0usize;
        for v in self.sma.window() {
            let diff = sub(*v, mean)?;
            squares = add(squares, mul(diff, diff)?)?;
            n += 1;
        }
        let variance = div(squares, Decimal::from(n - 1))?;
        sqrt(variance)
    }

    pub fn output(&self) -> Option<BollingerOutput> {
        self.output
    }

    pub fn next_output(&mut self, value: Decimal) -> Result<Option<BollingerOutput>, IndicatorError> {
        if let Some(mid) = self.sma.next(value)? {
            let band = mul(self.num_std, self.std_dev(mid)?)?;
            self.output = Some(BollingerOutput {
                upper: add(mid, band)?,
                middle: mid,
                lower: sub(mid, band)?,
            });
        }
        Ok(self.output)
    }
}

impl Indicator for BollingerBands {
    fn next(&mut self, value: Decimal) -> Result<Option<Decimal>, IndicatorError> {
        Ok(self.next_output(value)?.map(|o| o.middle))
    }

    fn reset(&mut self) {
        self.sma.reset();
        self.output = None;
    }

    fn period(&self) -> usize {
        self.sma.period()
    }

    fn is_ready(&self) -> bool {
        self.output.is_some()
    }
}

/// Bollinger Bands over a close series, every band rounded to two decimals.
pub fn bollinger(closes: &[Decimal], period: usize, num_std_dev: Decimal) -> Result<BollingerSeries, IndicatorError> {
    let mut bb = BollingerBands::new(period, num_std_dev)?;
    let mut out = BollingerSeries::default();
    for close in closes {
        let o = bb.next_output(*close)?;
        out.upper.push(o.map(|o| o.upper));
        out.middle.push(o.map(|o| o.middle));
        out.lower.push(o.map(|o| o.lower));
    }
    Ok(BollingerSeries {
        upper: round2(out.upper),
        middle: round2(out.middle),
        lower: round2(out.lower),
    })
}
