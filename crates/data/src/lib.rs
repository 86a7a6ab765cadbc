pub mod csv_loader;
pub mod db;
pub mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use trendscan_core::{
    AssetKind, Bar, BarSink, BarSource, DataError, IndicatorRow, IndicatorStore, SeriesKey, StatsStore, Symbol,
    Timeframe, Week52Stats,
};

/// Summary of a CSV directory import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub files: usize,
    pub bars: u64,
}

/// A directory of `<TICKER>.csv` files holding one timeframe of bars.
pub struct CsvDirectory {
    pub directory: PathBuf,
}

impl CsvDirectory {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /// Tickers with a CSV file in the directory, sorted.
    pub fn available_tickers(&self) -> Result<Vec<String>, DataError> {
        let mut tickers = Vec::new();
        for entry in std::fs::read_dir(&self.directory)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "csv").unwrap_or(false) {
                if let Some(stem) = path.file_stem() {
                    tickers.push(stem.to_string_lossy().to_string());
                }
            }
        }
        tickers.sort();
        Ok(tickers)
    }

    fn file_for(&self, ticker: &str) -> PathBuf {
        self.directory.join(format!("{}.csv", ticker))
    }

    /// Register every ticker and upsert its bars as final bars.
    pub async fn import<S: BarSink + ?Sized>(
        &self,
        sink: &S,
        kind: AssetKind,
        timeframe: Timeframe,
    ) -> Result<ImportReport, DataError> {
        let mut report = ImportReport::default();
        for ticker in self.available_tickers()? {
            let symbol = sink.ensure_symbol(kind, &ticker).await?;
            let bars = load_file(&self.file_for(&ticker), symbol.id, timeframe)?;
            report.bars += sink.upsert_bars(kind, &bars).await?;
            report.files += 1;
            tracing::debug!(%ticker, bars = bars.len(), "imported CSV");
        }
        tracing::info!(%kind, %timeframe, files = report.files, bars = report.bars, "CSV import complete");
        Ok(report)
    }
}

fn load_file(path: &Path, symbol_id: i64, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound(format!("CSV file not found: {}", path.display())));
    }
    csv_loader::load_bars_from_csv(path, symbol_id, timeframe)
}

fn db_err(e: sqlx::Error) -> DataError {
    DataError::DatabaseError(e.to_string())
}

/// A PostgreSQL-backed store over the per-universe tables.
#[derive(Clone)]
pub struct PostgresStore {
    pub pool: sqlx::PgPool,
}

impl PostgresStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BarSource for PostgresStore {
    async fn symbols(&self, kind: AssetKind) -> Result<Vec<Symbol>, DataError> {
        db::load_symbols(&self.pool, kind).await.map_err(db_err)
    }

    async fn get_bars(
        &self,
        key: SeriesKey,
        since: Option<NaiveDate>,
        include_partial: bool,
    ) -> Result<Vec<Bar>, DataError> {
        db::load_bars(&self.pool, key, since, include_partial).await.map_err(db_err)
    }

    async fn lookback_start(
        &self,
        key: SeriesKey,
        anchor: NaiveDate,
        lookback: usize,
    ) -> Result<Option<NaiveDate>, DataError> {
        db::lookback_start(&self.pool, key, anchor, lookback).await.map_err(db_err)
    }

    async fn last_final_bar_date(&self, kind: AssetKind, timeframe: Timeframe) -> Result<Option<NaiveDate>, DataError> {
        db::last_final_bar_date(&self.pool, kind, timeframe).await.map_err(db_err)
    }
}

#[async_trait]
impl BarSink for PostgresStore {
    async fn ensure_symbol(&self, kind: AssetKind, ticker: &str) -> Result<Symbol, DataError> {
        db::ensure_symbol(&self.pool, kind, ticker).await.map_err(db_err)
    }

    async fn upsert_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError> {
        db::upsert_bars(&self.pool, kind, bars).await.map_err(db_err)
    }

    async fn replace_partial_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError> {
        db::replace_partial_bars(&self.pool, kind, bars).await.map_err(db_err)
    }
}

#[async_trait]
impl IndicatorStore for PostgresStore {
    async fn upsert_indicator_rows(&self, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, DataError> {
        db::upsert_indicator_rows(&self.pool, kind, rows).await.map_err(db_err)
    }

    async fn replace_partial_indicator_rows(&self, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, DataError> {
        db::replace_partial_indicator_rows(&self.pool, kind, rows).await.map_err(db_err)
    }

    async fn last_indicator_date(&self, key: SeriesKey) -> Result<Option<NaiveDate>, DataError> {
        db::last_indicator_date(&self.pool, key).await.map_err(db_err)
    }

    async fn indicator_rows(
        &self,
        key: SeriesKey,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorRow>, DataError> {
        db::load_indicator_rows(&self.pool, key, from, to).await.map_err(db_err)
    }

    async fn row_at_or_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError> {
        db::indicator_row_before(&self.pool, key, date, false).await.map_err(db_err)
    }

    async fn row_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError> {
        db::indicator_row_before(&self.pool, key, date, true).await.map_err(db_err)
    }
}

#[async_trait]
impl StatsStore for PostgresStore {
    async fn upsert_week52_stats(&self, kind: AssetKind, stats: &[Week52Stats]) -> Result<u64, DataError> {
        db::upsert_week52_stats(&self.pool, kind, stats).await.map_err(db_err)
    }

    async fn week52_stats(&self, kind: AssetKind) -> Result<Vec<Week52Stats>, DataError> {
        db::load_week52_stats(&self.pool, kind).await.map_err(db_err)
    }
}
