//! As-of alignment of daily, weekly and monthly indicator rows.
//!
//! For a reference date `D` the weekly row is the latest one dated on or
//! before the Monday of `D`'s week, and the monthly row the latest one dated
//! on or before the first of `D`'s month. Nothing dated after `D` is ever
//! returned. A timeframe with no eligible row resolves to `None`.

use chrono::NaiveDate;
use trendscan_core::{AssetKind, DataError, IndicatorRow, IndicatorStore, SeriesKey, Timeframe};

/// How the daily row is matched against the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DailyMatch {
    /// Only a row dated exactly on the reference date.
    #[default]
    Exact,
    /// The latest row dated on or before the reference date.
    AtOrBefore,
}

/// Rows resolved for one symbol as of one date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AsOfRows {
    pub daily: Option<IndicatorRow>,
    /// The daily row immediately preceding `daily` (next-smaller date),
    /// or preceding the reference date when `daily` is missing.
    pub previous_daily: Option<IndicatorRow>,
    pub weekly: Option<IndicatorRow>,
    pub monthly: Option<IndicatorRow>,
}

/// Upper date bound for rows of `timeframe` as of `date`.
pub fn as_of_bound(timeframe: Timeframe, date: NaiveDate) -> NaiveDate {
    timeframe.period_start(date)
}

/// The row with the greatest date `<= bound`. `rows` must be sorted by date.
pub fn latest_at_or_before(rows: &[IndicatorRow], bound: NaiveDate) -> Option<&IndicatorRow> {
    let idx = rows.partition_point(|r| r.date <= bound);
    idx.checked_sub(1).map(|i| &rows[i])
}

/// The row with the greatest date `< bound`. `rows` must be sorted by date.
pub fn latest_before(rows: &[IndicatorRow], bound: NaiveDate) -> Option<&IndicatorRow> {
    let idx = rows.partition_point(|r| r.date < bound);
    idx.checked_sub(1).map(|i| &rows[i])
}

/// Preloaded indicator history for one symbol, resolved in memory. Used when
/// many dates are evaluated for the same symbol.
#[derive(Debug, Clone, Default)]
pub struct FrameHistory {
    pub daily: Vec<IndicatorRow>,
    pub weekly: Vec<IndicatorRow>,
    pub monthly: Vec<IndicatorRow>,
}

impl FrameHistory {
    /// Load every row up to `to` for the symbol's three timeframes.
    pub async fn load<S>(store: &S, kind: AssetKind, symbol_id: i64, to: Option<NaiveDate>) -> Result<Self, DataError>
    where
        S: IndicatorStore + ?Sized,
    {
        let key = |tf| SeriesKey::new(kind, symbol_id, tf);
        Ok(Self {
            daily: store.indicator_rows(key(Timeframe::Daily), None, to).await?,
            weekly: store.indicator_rows(key(Timeframe::Weekly), None, to).await?,
            monthly: store.indicator_rows(key(Timeframe::Monthly), None, to).await?,
        })
    }

    pub fn resolve(&self, date: NaiveDate, daily_match: DailyMatch) -> AsOfRows {
        let daily = match daily_match {
            DailyMatch::Exact => latest_at_or_before(&self.daily, date).filter(|r| r.date == date),
            DailyMatch::AtOrBefore => latest_at_or_before(&self.daily, date),
        };
        let previous_bound = daily.map(|r| r.date).unwrap_or(date);

        AsOfRows {
            daily: daily.cloned(),
            previous_daily: latest_before(&self.daily, previous_bound).cloned(),
            weekly: latest_at_or_before(&self.weekly, as_of_bound(Timeframe::Weekly, date)).cloned(),
            monthly: latest_at_or_before(&self.monthly, as_of_bound(Timeframe::Monthly, date)).cloned(),
        }
    }
}

/// Store-backed aligner for point lookups.
///
/// Weekly and monthly rows are bounded by the start of the reference date's
/// week or month, not by the date itself, so a higher-timeframe row stamped
/// later in the current period (such as a non-final row) is never selected.
pub struct Aligner<'a, S: ?Sized> {
    store: &'a S,
    daily_match: DailyMatch,
}

impl<'a, S> Aligner<'a, S>
where
    S: IndicatorStore + ?Sized,
{
    pub fn new(store: &'a S, daily_match: DailyMatch) -> Self {
        Self { store, daily_match }
    }

    /// Resolve the daily, previous daily, weekly and monthly rows as of `date`.
    pub async fn resolve_as_of(&self, kind: AssetKind, symbol_id: i64, date: NaiveDate) -> Result<AsOfRows, DataError> {
        let key = |tf| SeriesKey::new(kind, symbol_id, tf);

        let daily = match self.daily_match {
            DailyMatch::Exact => self
                .store
                .row_at_or_before(key(Timeframe::Daily), date)
                .await?
                .filter(|r| r.date == date),
            DailyMatch::AtOrBefore => self.store.row_at_or_before(key(Timeframe::Daily), date).await?,
        };
        let previous_bound = daily.as_ref().map(|r| r.date).unwrap_or(date);
        let previous_daily = self.previous_daily_row(kind, symbol_id, previous_bound).await?;

        let weekly = self
            .store
            .row_at_or_before(key(Timeframe::Weekly), as_of_bound(Timeframe::Weekly, date))
            .await?;
        let monthly = self
            .store
            .row_at_or_before(key(Timeframe::Monthly), as_of_bound(Timeframe::Monthly, date))
            .await?;

        Ok(AsOfRows {
            daily,
            previous_daily,
            weekly,
            monthly,
        })
    }

    /// The daily row with the next-smaller date than `date`, skipping any
    /// calendar gap.
    pub async fn previous_daily_row(
        &self,
        kind: AssetKind,
        symbol_id: i64,
        date: NaiveDate,
    ) -> Result<Option<IndicatorRow>, DataError> {
        self.store
            .row_before(SeriesKey::new(kind, symbol_id, Timeframe::Daily), date)
            .await
    }
}
