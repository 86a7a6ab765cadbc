//! Synthetic in-progress weekly and monthly bars, and the indicator rows
//! estimated from them.
//!
//! Every refresh replaces the previous synthetic bars and rows wholesale, so
//! a stale partial never survives into the next run.

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use trendscan_core::{AssetKind, Bar, BarSink, BarSource, IndicatorRow, IndicatorStore, SeriesKey, Timeframe};

use crate::cancel::CancelFlag;
use crate::error::EngineError;
use crate::pipeline::{compute_indicator_rows, OutputMode};
use crate::refresh::SeriesFailure;

/// Where the fold window starts and how the synthetic bars are dated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialStamp {
    /// Fold from the earlier of the last final weekly and monthly bar dates;
    /// date the synthetic bars with the latest final daily date.
    LatestDaily,
    /// Fold only daily bars on or after the given date, and date the
    /// synthetic bars with it.
    From(NaiveDate),
}

/// Outcome of a partial bar refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialBarsReport {
    pub weekly: usize,
    pub monthly: usize,
    pub bars_written: u64,
    pub cancelled: bool,
}

/// Outcome of a partial indicator refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialIndicatorsReport {
    pub rows_written: u64,
    pub failures: Vec<SeriesFailure>,
    pub cancelled: bool,
}

/// Fold daily bars dated after `anchor` and on or after `from` into one
/// candle: first open, highest high, lowest low, last close and adjusted
/// close.
///
/// `anchor` is the date of the last final bar of `timeframe`; a daily bar on
/// that date belongs to the closed period and is never folded.
/// `daily` must be sorted by date. Returns `None` when no bar qualifies.
pub fn fold_partial_bar(
    symbol_id: i64,
    timeframe: Timeframe,
    daily: &[Bar],
    anchor: NaiveDate,
    from: NaiveDate,
    stamp: NaiveDate,
) -> Option<Bar> {
    let mut in_range = daily.iter().filter(|b| b.date > anchor && b.date >= from);
    let first = in_range.next()?;
    let mut bar = Bar {
        symbol_id,
        timeframe,
        date: stamp,
        open: first.open,
        high: first.high,
        low: first.low,
        close: first.close,
        adj_close: first.adj_close,
        volume: None,
        is_final: false,
    };
    for b in in_range {
        bar.high = bar.high.max(b.high);
        bar.low = bar.low.min(b.low);
        bar.close = b.close;
        bar.adj_close = b.adj_close;
    }
    Some(bar)
}

/// Rebuild the single non-final weekly and monthly bar of every symbol.
///
/// The fold is anchored on the last final weekly and monthly bars of the
/// whole universe; with either missing there is no lower bound and the call
/// fails. Daily bars after the last final weekly date fold into the weekly
/// candle, and after the last final monthly date into the monthly one.
/// `PartialStamp::From` further restricts both folds to bars on or after its
/// date. All previous non-final bars are replaced in one atomic write.
pub async fn refresh_partial_bars<S>(
    store: &S,
    kind: AssetKind,
    stamp: PartialStamp,
    cancel: &CancelFlag,
) -> Result<PartialBarsReport, EngineError>
where
    S: BarSource + BarSink + ?Sized,
{
    let last_week = store
        .last_final_bar_date(kind, Timeframe::Weekly)
        .await?
        .ok_or(EngineError::PartialAnchorMissing {
            kind,
            timeframe: Timeframe::Weekly,
        })?;
    let last_month = store
        .last_final_bar_date(kind, Timeframe::Monthly)
        .await?
        .ok_or(EngineError::PartialAnchorMissing {
            kind,
            timeframe: Timeframe::Monthly,
        })?;

    let (window_start, stamp_date) = match stamp {
        PartialStamp::LatestDaily => {
            let latest = store
                .last_final_bar_date(kind, Timeframe::Daily)
                .await?
                .ok_or(EngineError::NoDailyBars(kind))?;
            (last_week.min(last_month), latest)
        }
        PartialStamp::From(date) => (date, date),
    };
    info!(%kind, %last_week, %last_month, %window_start, stamp = %stamp_date, "Refreshing partial bars");

    let symbols = store.symbols(kind).await?;
    if symbols.is_empty() {
        return Err(EngineError::NoSymbols(kind));
    }

    let mut report = PartialBarsReport::default();
    let mut partials = Vec::new();
    for symbol in &symbols {
        if cancel.is_cancelled() {
            info!(%kind, "Partial bar refresh cancelled before writing");
            report.cancelled = true;
            return Ok(report);
        }

        let daily_key = SeriesKey::new(kind, symbol.id, Timeframe::Daily);
        let daily = store.get_bars(daily_key, Some(window_start), false).await?;

        if let Some(bar) = fold_partial_bar(symbol.id, Timeframe::Weekly, &daily, last_week, window_start, stamp_date) {
            partials.push(bar);
            report.weekly += 1;
        }
        if let Some(bar) = fold_partial_bar(symbol.id, Timeframe::Monthly, &daily, last_month, window_start, stamp_date) {
            partials.push(bar);
            report.monthly += 1;
        }
        debug!(ticker = %symbol.ticker, daily = daily.len(), "folded partial bars");
    }

    report.bars_written = store.replace_partial_bars(kind, &partials).await?;
    info!(
        %kind,
        weekly = report.weekly,
        monthly = report.monthly,
        written = report.bars_written,
        "Partial bars refreshed"
    );
    Ok(report)
}

/// Rebuild the non-final weekly and monthly indicator rows of every symbol.
///
/// Each series is computed over its whole history including the non-final
/// bar and projected to its last row; the row is kept only when that last
/// bar is the non-final one. Rows from previous runs are replaced in one
/// atomic write.
pub async fn refresh_partial_indicators<S>(
    store: &S,
    kind: AssetKind,
    cancel: &CancelFlag,
) -> Result<PartialIndicatorsReport, EngineError>
where
    S: BarSource + IndicatorStore + ?Sized,
{
    let symbols = store.symbols(kind).await?;
    if symbols.is_empty() {
        return Err(EngineError::NoSymbols(kind));
    }

    info!(%kind, symbols = symbols.len(), "Refreshing partial indicators");
    let mut report = PartialIndicatorsReport::default();
    let mut rows: Vec<IndicatorRow> = Vec::new();

    for timeframe in [Timeframe::Weekly, Timeframe::Monthly] {
        for symbol in &symbols {
            if cancel.is_cancelled() {
                info!(%kind, "Partial indicator refresh cancelled before writing");
                report.cancelled = true;
                return Ok(report);
            }

            let key = SeriesKey::new(kind, symbol.id, timeframe);
            match partial_row(store, key).await {
                Ok(Some(row)) => rows.push(row),
                Ok(None) => {}
                Err(e) => {
                    warn!(series = %key, ticker = %symbol.ticker, error = %e, "Partial indicator failed, skipping");
                    report.failures.push(SeriesFailure {
                        key,
                        ticker: symbol.ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    report.rows_written = store.replace_partial_indicator_rows(kind, &rows).await?;
    info!(%kind, rows = report.rows_written, failures = report.failures.len(), "Partial indicators refreshed");
    Ok(report)
}

async fn partial_row<S>(store: &S, key: SeriesKey) -> Result<Option<IndicatorRow>, EngineError>
where
    S: BarSource + ?Sized,
{
    let bars = store.get_bars(key, None, true).await?;
    match bars.last() {
        Some(last) if !last.is_final => {}
        _ => return Ok(None),
    }
    let mut latest = compute_indicator_rows(key, &bars, OutputMode::Latest)?;
    Ok(latest.pop())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn daily(date: NaiveDate, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Bar {
        Bar {
            symbol_id: 1,
            timeframe: Timeframe::Daily,
            date,
            open,
            high,
            low,
            close,
            adj_close: close,
            volume: Some(dec!(100)),
            is_final: true,
        }
    }

    #[test]
    fn test_fold_takes_extremes_and_last_close() {
        let bars = [
            daily(d(2024, 1, 2), dec!(10), dec!(12), dec!(9), dec!(11)),
            daily(d(2024, 1, 3), dec!(11), dec!(15), dec!(10), dec!(14)),
            daily(d(2024, 1, 4), dec!(14), dec!(14.5), dec!(8), dec!(13)),
        ];
        let bar = fold_partial_bar(1, Timeframe::Weekly, &bars, d(2024, 1, 1), d(2024, 1, 3), d(2024, 1, 4)).unwrap();
        assert_eq!(bar.open, dec!(11));
        assert_eq!(bar.high, dec!(15));
        assert_eq!(bar.low, dec!(8));
        assert_eq!(bar.close, dec!(13));
        assert_eq!(bar.date, d(2024, 1, 4));
        assert_eq!(bar.timeframe, Timeframe::Weekly);
        assert!(!bar.is_final);
        assert_eq!(bar.volume, None);
    }

    #[test]
    fn test_fold_empty_window() {
        let bars = [daily(d(2024, 1, 2), dec!(10), dec!(12), dec!(9), dec!(11))];
        assert!(fold_partial_bar(1, Timeframe::Monthly, &bars, d(2024, 1, 1), d(2024, 2, 1), d(2024, 2, 1)).is_none());
    }

    #[test]
    fn test_fold_skips_anchor_day() {
        let bars = [
            daily(d(2024, 1, 1), dec!(50), dec!(999), dec!(1), dec!(60)),
            daily(d(2024, 1, 2), dec!(10), dec!(12), dec!(9), dec!(11)),
            daily(d(2024, 1, 3), dec!(11), dec!(15), dec!(10), dec!(14)),
        ];
        let bar = fold_partial_bar(1, Timeframe::Weekly, &bars, d(2024, 1, 1), d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        assert_eq!(bar.open, dec!(10));
        assert_eq!(bar.high, dec!(15));
        assert_eq!(bar.low, dec!(9));
        assert_eq!(bar.volume, None);

        // only the anchor day in range
        assert!(fold_partial_bar(1, Timeframe::Weekly, &bars[..1], d(2024, 1, 1), d(2024, 1, 1), d(2024, 1, 1)).is_none());
    }
}
