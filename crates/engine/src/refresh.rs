use chrono::NaiveDate;
use tracing::{debug, info, warn};
use trendscan_core::{AssetKind, BarSource, IndicatorStore, SeriesKey, Timeframe};

use crate::cancel::CancelFlag;
use crate::config::DEFAULT_LOOKBACK;
use crate::error::EngineError;
use crate::pipeline::{compute_indicator_rows, OutputMode};

/// Whether to resume from the last persisted row or rebuild every series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    Incremental,
    Full,
}

/// Caller-supplied switches for one refresh run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    pub mode: RefreshMode,
    pub lookback: usize,
    pub include_weekly: bool,
    pub include_monthly: bool,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            mode: RefreshMode::Incremental,
            lookback: DEFAULT_LOOKBACK,
            include_weekly: true,
            include_monthly: true,
        }
    }
}

impl RefreshConfig {
    /// Daily always, then weekly and monthly when enabled.
    pub fn timeframes(&self) -> Vec<Timeframe> {
        let mut tfs = vec![Timeframe::Daily];
        if self.include_weekly {
            tfs.push(Timeframe::Weekly);
        }
        if self.include_monthly {
            tfs.push(Timeframe::Monthly);
        }
        tfs
    }
}

/// A series that was skipped because it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesFailure {
    pub key: SeriesKey,
    pub ticker: String,
    pub error: String,
}

/// Outcome of a refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub series_processed: usize,
    pub rows_written: u64,
    pub failures: Vec<SeriesFailure>,
    pub cancelled: bool,
}

/// Outcome of refreshing one series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeriesOutcome {
    /// Last final indicator date before this run, if any.
    pub last_persisted: Option<NaiveDate>,
    /// First bar date loaded for the computation.
    pub window_start: Option<NaiveDate>,
    pub rows_written: u64,
}

/// Refresh indicator rows for every symbol of `kind`.
///
/// Series are processed one at a time, timeframe by timeframe. A failing series
/// is logged and recorded in the report; only batch-level preconditions (no
/// symbols at all, an unreachable store while listing symbols) abort the run.
pub async fn refresh_indicators<S>(
    store: &S,
    kind: AssetKind,
    config: &RefreshConfig,
    cancel: &CancelFlag,
) -> Result<RefreshReport, EngineError>
where
    S: BarSource + IndicatorStore + ?Sized,
{
    let symbols = store.symbols(kind).await?;
    if symbols.is_empty() {
        return Err(EngineError::NoSymbols(kind));
    }

    let mut report = RefreshReport::default();
    for timeframe in config.timeframes() {
        info!(%kind, %timeframe, symbols = symbols.len(), mode = ?config.mode, "Refreshing indicators");
        let mut tf_rows = 0u64;

        for symbol in &symbols {
            if cancel.is_cancelled() {
                info!(%kind, %timeframe, "Refresh cancelled");
                report.cancelled = true;
                return Ok(report);
            }

            let key = SeriesKey::new(kind, symbol.id, timeframe);
            match refresh_series(store, key, config).await {
                Ok(outcome) => {
                    debug!(
                        series = %key,
                        ticker = %symbol.ticker,
                        rows = outcome.rows_written,
                        since = ?outcome.window_start,
                        "series refreshed"
                    );
                    tf_rows += outcome.rows_written;
                    report.series_processed += 1;
                }
                Err(e) => {
                    warn!(series = %key, ticker = %symbol.ticker, error = %e, "Series refresh failed, skipping");
                    report.failures.push(SeriesFailure {
                        key,
                        ticker: symbol.ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(%kind, %timeframe, rows = tf_rows, "Timeframe refresh complete");
        report.rows_written += tf_rows;
    }

    Ok(report)
}

/// Refresh one (symbol, timeframe) series.
///
/// Without a persisted final row the whole final-bar history is computed.
/// Otherwise the slice starts `lookback` final bars back from the last
/// persisted date, the pipeline runs over the whole slice, and only rows
/// dated after the last persisted date are written. Computing the new rows
/// alone would restart every recurrence from scratch.
pub async fn refresh_series<S>(store: &S, key: SeriesKey, config: &RefreshConfig) -> Result<SeriesOutcome, EngineError>
where
    S: BarSource + IndicatorStore + ?Sized,
{
    let last_persisted = match config.mode {
        RefreshMode::Full => None,
        RefreshMode::Incremental => store.last_indicator_date(key).await?,
    };

    let window_start = match last_persisted {
        Some(last) => store.lookback_start(key, last, config.lookback).await?,
        None => None,
    };

    let bars = store.get_bars(key, window_start, false).await?;
    if bars.is_empty() {
        return Err(EngineError::NoBars { key });
    }

    let rows = compute_indicator_rows(key, &bars, OutputMode::Full)?;
    let fresh: Vec<_> = rows
        .into_iter()
        .filter(|r| last_persisted.map_or(true, |last| r.date > last))
        .collect();

    let rows_written = if fresh.is_empty() {
        0
    } else {
        store.upsert_indicator_rows(key.kind, &fresh).await?
    };

    Ok(SeriesOutcome {
        last_persisted,
        window_start: bars.first().map(|b| b.date),
        rows_written,
    })
}
