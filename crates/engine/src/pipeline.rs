//! Composition of the series primitives into full indicator rows for one
//! (symbol, timeframe) slice.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::warn;
use trendscan_core::{Bar, IndicatorRow, SeriesKey};
use trendscan_indicators::bollinger::{bollinger, BollingerSeries};
use trendscan_indicators::macd::{macd, MacdSeries};
use trendscan_indicators::supertrend::{supertrend, SuperTrendSeries};
use trendscan_indicators::{atr::atr, change::pct_change, ema::ema, rsi::rsi, sma::sma, wma::wma};
use trendscan_indicators::{Hlc, IndicatorError, Series};

use crate::error::EngineError;

/// Which rows the pipeline hands back.
///
/// `Latest` is a projection of the full computation: every column is still
/// computed over the whole slice and only the final row is returned. Callers
/// must pass the same trailing history they would for `Full`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Full,
    Latest,
}

/// Every indicator column of a slice, aligned with its bars.
#[derive(Debug, Clone, Default)]
struct Columns {
    sma_20: Series,
    sma_50: Series,
    sma_200: Series,
    rsi_3: Series,
    rsi_9: Series,
    rsi_14: Series,
    ema_rsi_9_3: Series,
    wma_rsi_9_21: Series,
    pct_price_change: Series,
    macd: MacdSeries,
    bollinger: BollingerSeries,
    atr_14: Series,
    supertrend: SuperTrendSeries,
}

/// Compute indicator rows for `bars`, which must belong to `key` and be in
/// strictly increasing date order.
///
/// A column whose primitive fails is logged and left undefined; the other
/// columns and the batch carry on.
pub fn compute_indicator_rows(key: SeriesKey, bars: &[Bar], mode: OutputMode) -> Result<Vec<IndicatorRow>, EngineError> {
    if let Some(w) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
        return Err(EngineError::UnorderedBars { key, date: w[1].date });
    }
    if bars.is_empty() {
        return Ok(Vec::new());
    }

    let cols = compute_columns(key, bars);
    let range = match mode {
        OutputMode::Full => 0..bars.len(),
        OutputMode::Latest => bars.len() - 1..bars.len(),
    };

    Ok(range.map(|i| row_at(key, &bars[i], &cols, i)).collect())
}

fn compute_columns(key: SeriesKey, bars: &[Bar]) -> Columns {
    let n = bars.len();
    let closes: Vec<Decimal> = bars.iter().map(|b| b.close).collect();
    let adj: Vec<Decimal> = bars.iter().map(|b| b.adj_close).collect();
    let hlc: Vec<Hlc> = bars
        .iter()
        .map(|b| Hlc {
            high: b.high,
            low: b.low,
            close: b.close,
        })
        .collect();

    let undefined = || vec![None; n];
    let rsi_9 = degrade(key, "rsi_9", rsi(&closes, 9), undefined);

    Columns {
        sma_20: degrade(key, "sma_20", sma(&adj, 20), undefined),
        sma_50: degrade(key, "sma_50", sma(&adj, 50), undefined),
        sma_200: degrade(key, "sma_200", sma(&adj, 200), undefined),
        rsi_3: degrade(key, "rsi_3", rsi(&closes, 3), undefined),
        rsi_14: degrade(key, "rsi_14", rsi(&closes, 14), undefined),
        ema_rsi_9_3: degrade(key, "ema_rsi_9_3", ema(&rsi_9, 3), undefined),
        wma_rsi_9_21: degrade(key, "wma_rsi_9_21", wma(&rsi_9, 21), undefined),
        rsi_9,
        pct_price_change: degrade(key, "pct_price_change", pct_change(&adj), undefined),
        macd: degrade(key, "macd", macd(&closes), || MacdSeries {
            macd: undefined(),
            signal: undefined(),
        }),
        bollinger: degrade(key, "bollinger", bollinger(&closes, 20, dec!(2)), || BollingerSeries {
            upper: undefined(),
            middle: undefined(),
            lower: undefined(),
        }),
        atr_14: degrade(key, "atr_14", atr(&hlc, 14), undefined),
        supertrend: degrade(key, "supertrend", supertrend(&hlc, 10, dec!(3)), || SuperTrendSeries {
            value: undefined(),
            direction: vec![None; n],
            final_upper: undefined(),
            final_lower: undefined(),
        }),
    }
}

fn degrade<T>(key: SeriesKey, column: &'static str, result: Result<T, IndicatorError>, undefined: impl FnOnce() -> T) -> T {
    result.unwrap_or_else(|e| {
        warn!(series = %key, column, error = %e, "indicator column left undefined");
        undefined()
    })
}

fn row_at(key: SeriesKey, bar: &Bar, cols: &Columns, i: usize) -> IndicatorRow {
    let at = |s: &Series| s.get(i).copied().flatten();
    IndicatorRow {
        symbol_id: key.symbol_id,
        timeframe: key.timeframe,
        date: bar.date,
        is_final: bar.is_final,
        sma_20: at(&cols.sma_20),
        sma_50: at(&cols.sma_50),
        sma_200: at(&cols.sma_200),
        rsi_3: at(&cols.rsi_3),
        rsi_9: at(&cols.rsi_9),
        rsi_14: at(&cols.rsi_14),
        ema_rsi_9_3: at(&cols.ema_rsi_9_3),
        wma_rsi_9_21: at(&cols.wma_rsi_9_21),
        pct_price_change: at(&cols.pct_price_change),
        macd: at(&cols.macd.macd),
        macd_signal: at(&cols.macd.signal),
        bb_upper: at(&cols.bollinger.upper),
        bb_middle: at(&cols.bollinger.middle),
        bb_lower: at(&cols.bollinger.lower),
        atr_14: at(&cols.atr_14),
        supertrend: at(&cols.supertrend.value),
        supertrend_dir: cols.supertrend.direction.get(i).copied().flatten().map(|d| d.signum()),
    }
}
