mod common;

use common::*;
use trendscan_core::{AssetKind, IndicatorRow, IndicatorStore, Timeframe};
use trendscan_data::InMemoryStore;
use trendscan_engine::{Aligner, DailyMatch, FrameHistory};

async fn store_with_rows() -> InMemoryStore {
    let store = InMemoryStore::new();
    let rows = |tf, dates: &[chrono::NaiveDate]| -> Vec<IndicatorRow> {
        dates.iter().map(|&date| IndicatorRow::empty(5, tf, date, true)).collect()
    };
    store
        .upsert_indicator_rows(
            AssetKind::Equity,
            &rows(Timeframe::Daily, &[d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1), d(2024, 3, 4)]),
        )
        .await
        .unwrap();
    store
        .upsert_indicator_rows(
            AssetKind::Equity,
            &rows(Timeframe::Weekly, &[d(2024, 2, 19), d(2024, 2, 26), d(2024, 3, 4)]),
        )
        .await
        .unwrap();
    store
        .upsert_indicator_rows(AssetKind::Equity, &rows(Timeframe::Monthly, &[d(2024, 2, 1), d(2024, 3, 1)]))
        .await
        .unwrap();
    store
}

#[tokio::test]
async fn store_backed_resolution_matches_preloaded() {
    let store = store_with_rows().await;
    let aligner = Aligner::new(&store, DailyMatch::Exact);
    let history = FrameHistory::load(&store, AssetKind::Equity, 5, None).await.unwrap();

    for date in [d(2024, 2, 29), d(2024, 3, 1), d(2024, 3, 2), d(2024, 3, 4)] {
        let from_store = aligner.resolve_as_of(AssetKind::Equity, 5, date).await.unwrap();
        assert_eq!(from_store, history.resolve(date, DailyMatch::Exact), "as of {date}");
    }
}

#[tokio::test]
async fn no_row_is_dated_after_the_query() {
    let store = store_with_rows().await;
    let aligner = Aligner::new(&store, DailyMatch::AtOrBefore);

    // Friday 2024-03-01: week started Monday 2024-02-26, month on 2024-03-01
    let r = aligner.resolve_as_of(AssetKind::Equity, 5, d(2024, 3, 1)).await.unwrap();
    assert_eq!(r.daily.unwrap().date, d(2024, 3, 1));
    assert_eq!(r.previous_daily.unwrap().date, d(2024, 2, 29));
    assert_eq!(r.weekly.unwrap().date, d(2024, 2, 26));
    assert_eq!(r.monthly.unwrap().date, d(2024, 3, 1));

    // Sunday falls back to Friday
    let r = aligner.resolve_as_of(AssetKind::Equity, 5, d(2024, 3, 3)).await.unwrap();
    assert_eq!(r.daily.unwrap().date, d(2024, 3, 1));

    // Before the first weekly row
    let r = aligner.resolve_as_of(AssetKind::Equity, 5, d(2024, 2, 1)).await.unwrap();
    assert!(r.daily.is_none());
    assert!(r.weekly.is_none());
    assert_eq!(r.monthly.unwrap().date, d(2024, 2, 1));

    let prev = aligner.previous_daily_row(AssetKind::Equity, 5, d(2024, 3, 4)).await.unwrap();
    assert_eq!(prev.unwrap().date, d(2024, 3, 1));
}
