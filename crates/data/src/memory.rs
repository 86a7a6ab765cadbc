use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use trendscan_core::{
    AssetKind, Bar, BarSink, BarSource, DataError, IndicatorRow, IndicatorStore, SeriesKey, StatsStore, Symbol,
    Timeframe, Week52Stats,
};

#[derive(Debug, Default)]
struct Tables {
    symbols: BTreeMap<(AssetKind, i64), String>,
    bars: BTreeMap<SeriesKey, BTreeMap<NaiveDate, Bar>>,
    indicators: BTreeMap<SeriesKey, BTreeMap<NaiveDate, IndicatorRow>>,
    week52: BTreeMap<(AssetKind, i64), Week52Stats>,
    next_id: i64,
}

/// Process-local store with the same semantics as the Postgres tables.
/// Backs tests and dry runs over CSV imports.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn series_key(kind: AssetKind, symbol_id: i64, timeframe: Timeframe) -> SeriesKey {
    SeriesKey::new(kind, symbol_id, timeframe)
}

#[async_trait]
impl BarSource for InMemoryStore {
    async fn symbols(&self, kind: AssetKind) -> Result<Vec<Symbol>, DataError> {
        let inner = self.inner.read().await;
        let mut out: Vec<Symbol> = inner
            .symbols
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|((_, id), ticker)| Symbol {
                id: *id,
                ticker: ticker.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(out)
    }

    async fn get_bars(
        &self,
        key: SeriesKey,
        since: Option<NaiveDate>,
        include_partial: bool,
    ) -> Result<Vec<Bar>, DataError> {
        let inner = self.inner.read().await;
        let Some(series) = inner.bars.get(&key) else {
            return Ok(Vec::new());
        };
        let lower = since.unwrap_or(NaiveDate::MIN);
        Ok(series
            .range(lower..)
            .map(|(_, bar)| bar)
            .filter(|bar| include_partial || bar.is_final)
            .cloned()
            .collect())
    }

    async fn lookback_start(
        &self,
        key: SeriesKey,
        anchor: NaiveDate,
        lookback: usize,
    ) -> Result<Option<NaiveDate>, DataError> {
        let inner = self.inner.read().await;
        let Some(series) = inner.bars.get(&key) else {
            return Ok(None);
        };
        Ok(series
            .range(..=anchor)
            .rev()
            .filter(|(_, bar)| bar.is_final)
            .nth(lookback.saturating_sub(1))
            .map(|(date, _)| *date))
    }

    async fn last_final_bar_date(&self, kind: AssetKind, timeframe: Timeframe) -> Result<Option<NaiveDate>, DataError> {
        let inner = self.inner.read().await;
        Ok(inner
            .bars
            .iter()
            .filter(|(key, _)| key.kind == kind && key.timeframe == timeframe)
            .filter_map(|(_, series)| series.values().rev().find(|b| b.is_final).map(|b| b.date))
            .max())
    }
}

#[async_trait]
impl BarSink for InMemoryStore {
    async fn ensure_symbol(&self, kind: AssetKind, ticker: &str) -> Result<Symbol, DataError> {
        let mut inner = self.inner.write().await;
        if let Some(((_, id), _)) = inner.symbols.iter().find(|((k, _), t)| *k == kind && t.as_str() == ticker) {
            return Ok(Symbol {
                id: *id,
                ticker: ticker.to_string(),
            });
        }
        inner.next_id += 1;
        let id = inner.next_id;
        inner.symbols.insert((kind, id), ticker.to_string());
        Ok(Symbol {
            id,
            ticker: ticker.to_string(),
        })
    }

    async fn upsert_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError> {
        let mut inner = self.inner.write().await;
        for bar in bars {
            inner
                .bars
                .entry(series_key(kind, bar.symbol_id, bar.timeframe))
                .or_default()
                .insert(bar.date, bar.clone());
        }
        Ok(bars.len() as u64)
    }

    async fn replace_partial_bars(&self, kind: AssetKind, bars: &[Bar]) -> Result<u64, DataError> {
        let mut inner = self.inner.write().await;
        for (_, series) in inner.bars.iter_mut().filter(|(key, _)| key.kind == kind) {
            series.retain(|_, bar| bar.is_final);
        }
        let mut count = 0u64;
        for bar in bars {
            let series = inner
                .bars
                .entry(series_key(kind, bar.symbol_id, bar.timeframe))
                .or_default();
            if !series.contains_key(&bar.date) {
                series.insert(bar.date, bar.clone());
                count += 1;
            }
        }
        Ok(count)
    }
}

#[async_trait]
impl IndicatorStore for InMemoryStore {
    async fn upsert_indicator_rows(&self, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, DataError> {
        let mut inner = self.inner.write().await;
        for row in rows {
            inner
                .indicators
                .entry(series_key(kind, row.symbol_id, row.timeframe))
                .or_default()
                .insert(row.date, row.clone());
        }
        Ok(rows.len() as u64)
    }

    async fn replace_partial_indicator_rows(&self, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, DataError> {
        let mut inner = self.inner.write().await;
        for (_, series) in inner.indicators.iter_mut().filter(|(key, _)| key.kind == kind) {
            series.retain(|_, row| row.is_final);
        }
        let mut count = 0u64;
        for row in rows {
            let series = inner
                .indicators
                .entry(series_key(kind, row.symbol_id, row.timeframe))
                .or_default();
            if !series.contains_key(&row.date) {
                series.insert(row.date, row.clone());
                count += 1;
            }
        }
        Ok(count)
    }

    async fn last_indicator_date(&self, key: SeriesKey) -> Result<Option<NaiveDate>, DataError> {
        let inner = self.inner.read().await;
        Ok(inner
            .indicators
            .get(&key)
            .and_then(|rows| rows.values().rev().find(|r| r.is_final))
            .map(|r| r.date))
    }

    async fn indicator_rows(
        &self,
        key: SeriesKey,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<IndicatorRow>, DataError> {
        let inner = self.inner.read().await;
        let Some(rows) = inner.indicators.get(&key) else {
            return Ok(Vec::new());
        };
        let lower = from.unwrap_or(NaiveDate::MIN);
        let upper = to.unwrap_or(NaiveDate::MAX);
        if lower > upper {
            return Ok(Vec::new());
        }
        Ok(rows.range(lower..=upper).map(|(_, r)| r.clone()).collect())
    }

    async fn row_at_or_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError> {
        let inner = self.inner.read().await;
        Ok(inner
            .indicators
            .get(&key)
            .and_then(|rows| rows.range(..=date).next_back())
            .map(|(_, r)| r.clone()))
    }

    async fn row_before(&self, key: SeriesKey, date: NaiveDate) -> Result<Option<IndicatorRow>, DataError> {
        let inner = self.inner.read().await;
        Ok(inner
            .indicators
            .get(&key)
            .and_then(|rows| rows.range(..date).next_back())
            .map(|(_, r)| r.clone()))
    }
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn upsert_week52_stats(&self, kind: AssetKind, stats: &[Week52Stats]) -> Result<u64, DataError> {
        let mut inner = self.inner.write().await;
        for s in stats {
            inner.week52.insert((kind, s.symbol_id), s.clone());
        }
        Ok(stats.len() as u64)
    }

    async fn week52_stats(&self, kind: AssetKind) -> Result<Vec<Week52Stats>, DataError> {
        let inner = self.inner.read().await;
        Ok(inner
            .week52
            .iter()
            .filter(|((k, _), _)| *k == kind)
            .map(|(_, s)| s.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(symbol_id: i64, tf: Timeframe, date: NaiveDate, close: Decimal, is_final: bool) -> Bar {
        Bar {
            symbol_id,
            timeframe: tf,
            date,
            open: close,
            high: close,
            low: close,
            close,
            adj_close: close,
            volume: None,
            is_final,
        }
    }

    #[tokio::test]
    async fn test_ensure_symbol_is_idempotent() {
        let store = InMemoryStore::new();
        let a = store.ensure_symbol(AssetKind::Equity, "TCS").await.unwrap();
        let b = store.ensure_symbol(AssetKind::Equity, "TCS").await.unwrap();
        let c = store.ensure_symbol(AssetKind::Equity, "INFY").await.unwrap();
        assert_eq!(a, b);
        assert_ne!(a.id, c.id);
        let tickers: Vec<String> = store.symbols(AssetKind::Equity).await.unwrap().into_iter().map(|s| s.ticker).collect();
        assert_eq!(tickers, vec!["INFY", "TCS"]);
        assert!(store.symbols(AssetKind::Index).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookback_start_counts_final_bars() {
        let store = InMemoryStore::new();
        let key = SeriesKey::new(AssetKind::Equity, 1, Timeframe::Daily);
        let bars: Vec<Bar> = (1..=10).map(|i| bar(1, Timeframe::Daily, d(2024, 1, i), dec!(1), true)).collect();
        store.upsert_bars(AssetKind::Equity, &bars).await.unwrap();

        // 3rd bar back from the 10th (10, 9, 8)
        assert_eq!(store.lookback_start(key, d(2024, 1, 10), 3).await.unwrap(), Some(d(2024, 1, 8)));
        assert_eq!(store.lookback_start(key, d(2024, 1, 10), 1).await.unwrap(), Some(d(2024, 1, 10)));
        assert_eq!(store.lookback_start(key, d(2024, 1, 10), 11).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_partial_bar_never_overwrites_final() {
        let store = InMemoryStore::new();
        let key = SeriesKey::new(AssetKind::Equity, 1, Timeframe::Weekly);
        store
            .upsert_bars(AssetKind::Equity, &[bar(1, Timeframe::Weekly, d(2024, 1, 1), dec!(10), true)])
            .await
            .unwrap();

        let n = store
            .replace_partial_bars(
                AssetKind::Equity,
                &[
                    bar(1, Timeframe::Weekly, d(2024, 1, 1), dec!(99), false),
                    bar(1, Timeframe::Weekly, d(2024, 1, 8), dec!(11), false),
                ],
            )
            .await
            .unwrap();
        assert_eq!(n, 1);

        let all = store.get_bars(key, None, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].close, dec!(10));
        assert!(all[0].is_final);
        assert!(!all[1].is_final);

        // a second refresh replaces the earlier partial
        store
            .replace_partial_bars(AssetKind::Equity, &[bar(1, Timeframe::Weekly, d(2024, 1, 8), dec!(12), false)])
            .await
            .unwrap();
        let all = store.get_bars(key, None, true).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[1].close, dec!(12));
        assert_eq!(store.get_bars(key, None, false).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_last_indicator_date_ignores_partial_rows() {
        let store = InMemoryStore::new();
        let key = SeriesKey::new(AssetKind::Index, 7, Timeframe::Daily);
        store
            .upsert_indicator_rows(AssetKind::Index, &[IndicatorRow::empty(7, Timeframe::Daily, d(2024, 3, 1), true)])
            .await
            .unwrap();
        store
            .replace_partial_indicator_rows(AssetKind::Index, &[IndicatorRow::empty(7, Timeframe::Daily, d(2024, 3, 4), false)])
            .await
            .unwrap();

        assert_eq!(store.last_indicator_date(key).await.unwrap(), Some(d(2024, 3, 1)));
        assert_eq!(store.row_at_or_before(key, d(2024, 3, 5)).await.unwrap().unwrap().date, d(2024, 3, 4));
        assert_eq!(store.row_before(key, d(2024, 3, 4)).await.unwrap().unwrap().date, d(2024, 3, 1));
        assert!(store.row_before(key, d(2024, 3, 1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_week52_upsert_replaces() {
        let store = InMemoryStore::new();
        let first = Week52Stats {
            symbol_id: 1,
            high: dec!(120),
            low: dec!(80),
            as_of: d(2024, 1, 1),
        };
        let second = Week52Stats {
            high: dec!(125),
            as_of: d(2024, 1, 2),
            ..first.clone()
        };
        store.upsert_week52_stats(AssetKind::Equity, &[first]).await.unwrap();
        store.upsert_week52_stats(AssetKind::Equity, &[second.clone()]).await.unwrap();
        assert_eq!(store.week52_stats(AssetKind::Equity).await.unwrap(), vec![second]);
    }
}
