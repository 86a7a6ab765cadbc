use crate::models::*;
use async_trait::async_trait;
use chrono::NaiveDate;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during data operations.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("Data not found: {0}")]
    NotFound(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Database error: {0}")]
    DatabaseError(String),
}

// ---------------------------------------------------------------------------
// Bar Source / Sink
// ---------------------------------------------------------------------------

/// Read access to stored bars.
#[async_trait]
pub trait BarSource: Send + Sync {
    /// All symbols of a universe, ordered by ticker.
    async fn symbols(&self, kind: AssetKind) -> Result<Vec<Symbol>, DataError>;

    /// Bars for one series in ascending date order, starting at `since`
    /// (inclusive) when given. Only final bars unless `include_partial`.
    async fn get_bars(
        &self,
        key: SeriesKey,
        since: Option<NaiveDate>,
        include_partial: bool,
    ) -> Result<Vec<Bar>, DataError>;

    /// Date of the `lookback`-th final bar counting back from `anchor`
    /// (the bar at or before `anchor` is the first). `None` when fewer than
    /// `lookback` bars exist, meaning the whole history is needed.
    async fn lookback_start(
        &self,
        key: SeriesKey,
        anchor: NaiveDate,
        lookback: usize,
    ) -> Result<Option<NaiveDate>, DataError>;

    /// Latest final bar date for a timeframe across the whole universe.
    async fn last_final_bar_date(
        &self,
        kind: AssetKind,
        timeframe: Timeframe,
    ) -> Result<Option<NaiveDate>, DataError>;
}

/// Write access to stored bars.
#[async_trait]
pub trait BarSink: Send + Sync {
    /// Look up a ticker, registering it when unknown.
    async fn ensure_symbol(&self, kind: AssetKind, ticker: &str) -> Result<Symbol, DataError>;

    /// Insert or overwrite bars keyed by (symbol, timeframe, date).
    async fn upsert_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError>;

    /// Delete every non-final bar of the universe and insert `bars` in their
    /// place, atomically. A synthetic bar never overwrites a final bar that
    /// shares its key.
    async fn replace_partial_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError>;
}

// ---------------------------------------------------------------------------
// Indicator Store
// ---------------------------------------------------------------------------

/// Persistence and lookup of indicator rows.
#[async_trait]
pub trait IndicatorStore: Send + Sync {
    /// Insert or overwrite rows keyed by (symbol, timeframe, date), last write
    /// wins. All rows are committed together or not at all.
    async fn upsert_indicator_rows(&self, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, DataError>;

    /// Delete every non-final indicator row of the universe and insert `rows`
    /// in their place, atomically.
    async fn replace_partial_indicator_rows(
        &self,
        kind: AssetKind,
        rows: &[IndicatorRow],
    ) -> Result<u64, DataError>;

    /// Latest date of a final indicator row for the series.
    async fn last_indicator_date(&self, key: SeriesKey) -> Result<Option<NaiveDate>, DataError>;

    /// Rows for the series in ascending date order within the inclusive range.
    async fn indicator_rows(
        &self,
        key: SeriesKey,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorRow>, DataError>;

    /// The row with the greatest date `<= date`.
    async fn row_at_or_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError>;

    /// The row with the greatest date `< date`.
    async fn row_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError>;
}

/// Persistence of 52-week statistics.
#[async_trait]
pub trait StatsStore: Send + Sync {
    /// One row per symbol; a later write replaces the earlier one.
    async fn upsert_week52_stats(&self, kind: AssetKind, stats: &[Week52Stats]) -> Result<u64, DataError>;

    async fn week52_stats(&self, kind: AssetKind) -> Result<Vec<Week52Stats>, DataError>;
}
