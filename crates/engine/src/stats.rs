use chrono::{Months, NaiveDate};
use tracing::info;
use trendscan_core::{AssetKind, Bar, BarSource, SeriesKey, StatsStore, Timeframe, Week52Stats};

use crate::cancel::CancelFlag;
use crate::error::EngineError;

/// Outcome of a 52-week statistics refresh.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Week52Report {
    pub symbols_updated: usize,
    pub cancelled: bool,
}

/// First date of the trailing one-year window ending at `as_of`.
pub fn window_start(as_of: NaiveDate) -> NaiveDate {
    as_of.checked_sub_months(Months::new(12)).unwrap_or(NaiveDate::MIN)
}

/// Highest high and lowest low over daily bars dated in `[window_start(as_of), as_of]`.
pub fn week52_from_bars(symbol_id: i64, bars: &[Bar], as_of: NaiveDate) -> Option<Week52Stats> {
    let start = window_start(as_of);
    let mut in_window = bars.iter().filter(|b| b.date >= start && b.date <= as_of);
    let first = in_window.next()?;
    let (high, low) = in_window.fold((first.high, first.low), |(h, l), b| (h.max(b.high), l.min(b.low)));
    Some(Week52Stats {
        symbol_id,
        high,
        low,
        as_of,
    })
}

/// Recompute the 52-week high/low of every symbol of `kind` as of `as_of`
/// from final daily bars. Symbols without bars in the window are left as is.
pub async fn refresh_week52_stats<S>(
    store: &S,
    kind: AssetKind,
    as_of: NaiveDate,
    cancel: &CancelFlag,
) -> Result<Week52Report, EngineError>
where
    S: BarSource + StatsStore + ?Sized,
{
    let symbols = store.symbols(kind).await?;
    if symbols.is_empty() {
        return Err(EngineError::NoSymbols(kind));
    }

    let start = window_start(as_of);
    let mut report = Week52Report::default();
    let mut stats = Vec::new();
    for symbol in &symbols {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let bars = store
            .get_bars(SeriesKey::new(kind, symbol.id, Timeframe::Daily), Some(start), false)
            .await?;
        if let Some(s) = week52_from_bars(symbol.id, &bars, as_of) {
            stats.push(s);
        }
    }

    if !stats.is_empty() {
        store.upsert_week52_stats(kind, &stats).await?;
    }
    report.symbols_updated = stats.len();
    info!(%kind, %as_of, symbols = report.symbols_updated, "52-week stats refreshed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn bar(date: NaiveDate, high: Decimal, low: Decimal) -> Bar {
        Bar {
            symbol_id: 3,
            timeframe: Timeframe::Daily,
            date,
            open: low,
            high,
            low,
            close: high,
            adj_close: high,
            volume: None,
            is_final: true,
        }
    }

    #[test]
    fn test_window_is_one_year_inclusive() {
        assert_eq!(window_start(d(2024, 6, 30)), d(2023, 6, 30));
        assert_eq!(window_start(d(2024, 2, 29)), d(2023, 2, 28));
    }

    #[test]
    fn test_week52_ignores_bars_outside_window() {
        let bars = [
            bar(d(2023, 6, 29), dec!(500), dec!(1)),
            bar(d(2023, 6, 30), dec!(120), dec!(90)),
            bar(d(2024, 1, 15), dec!(150), dec!(110)),
            bar(d(2024, 6, 30), dec!(130), dec!(95)),
            bar(d(2024, 7, 1), dec!(900), dec!(2)),
        ];
        let stats = week52_from_bars(3, &bars, d(2024, 6, 30)).unwrap();
        assert_eq!(stats.high, dec!(150));
        assert_eq!(stats.low, dec!(90));
        assert_eq!(stats.as_of, d(2024, 6, 30));
    }

    #[test]
    fn test_week52_without_bars() {
        assert!(week52_from_bars(3, &[], d(2024, 6, 30)).is_none());
    }
}
