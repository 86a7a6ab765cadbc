#![allow(dead_code)]

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use trendscan_core::{AssetKind, Bar, BarSink, Symbol, Timeframe};
use trendscan_data::InMemoryStore;

pub fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Weekdays starting at `start`.
pub fn trading_days(start: NaiveDate, n: usize) -> Vec<NaiveDate> {
    let mut out = Vec::with_capacity(n);
    let mut date = start;
    while out.len() < n {
        if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            out.push(date);
        }
        date += Duration::days(1);
    }
    out
}

/// A deterministic, non-monotonic close path.
pub fn close_at(i: usize) -> Decimal {
    let swing = Decimal::from((i * 37) % 23) - dec!(11);
    let drift = Decimal::from(i as i64) / dec!(4);
    dec!(150) + drift + swing / dec!(2)
}

pub fn bar(symbol_id: i64, timeframe: Timeframe, date: NaiveDate, close: Decimal, is_final: bool) -> Bar {
    Bar {
        symbol_id,
        timeframe,
        date,
        open: close - dec!(0.5),
        high: close + dec!(1.25),
        low: close - dec!(1.75),
        close,
        adj_close: close,
        volume: Some(dec!(1000)),
        is_final,
    }
}

pub fn daily_bars(symbol_id: i64, start: NaiveDate, n: usize) -> Vec<Bar> {
    trading_days(start, n)
        .into_iter()
        .enumerate()
        .map(|(i, date)| bar(symbol_id, Timeframe::Daily, date, close_at(i), true))
        .collect()
}

pub async fn seed_symbol(store: &InMemoryStore, kind: AssetKind, ticker: &str) -> Symbol {
    store.ensure_symbol(kind, ticker).await.unwrap()
}

pub async fn seed_bars(store: &InMemoryStore, kind: AssetKind, bars: &[Bar]) {
    store.upsert_bars(kind, bars).await.unwrap();
}
