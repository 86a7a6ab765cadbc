//! Rule evaluation over stored indicator rows.
//!
//! `scan_range` walks every final daily bar in `[from, to]` for every symbol
//! against preloaded history; `scan_as_of` answers a single date through the
//! store-backed aligner. Both attach forward returns measured over the next
//! `n` daily bars, which may fall after `to`.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info};
use trendscan_core::{AssetKind, Bar, BarSource, IndicatorStore, SeriesKey, Symbol, Timeframe};
use trendscan_engine::{Aligner, AsOfRows, DailyMatch, FrameHistory};

use crate::rules::{AsOfView, RuleSet};
use crate::ScanError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForwardReturn {
    pub days: usize,
    /// Percent change of close after `days` bars; `None` when not yet available.
    pub pct: Option<Decimal>,
}

/// One symbol passing a rule set on one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanMatch {
    pub ticker: String,
    pub symbol_id: i64,
    pub date: NaiveDate,
    pub close: Decimal,
    pub daily_rsi_3: Option<Decimal>,
    pub daily_rsi_9: Option<Decimal>,
    pub weekly_rsi_3: Option<Decimal>,
    pub monthly_rsi_3: Option<Decimal>,
    pub forward_returns: Vec<ForwardReturn>,
}

impl ScanMatch {
    pub fn forward(&self, days: usize) -> Option<Decimal> {
        self.forward_returns.iter().find(|r| r.days == days).and_then(|r| r.pct)
    }
}

/// `round((close[i+n] - close[i]) / close[i] * 100, 2)`.
pub fn forward_return(bars: &[Bar], i: usize, days: usize) -> Option<Decimal> {
    let base = bars.get(i)?.close;
    let later = bars.get(i.checked_add(days)?)?.close;
    if base.is_zero() {
        return None;
    }
    Some(((later - base).checked_div(base)? * dec!(100)).round_dp(2))
}

fn build_match(
    symbol: &Symbol,
    rows: &AsOfRows,
    bars: &[Bar],
    i: usize,
    forward_days: &[usize],
) -> ScanMatch {
    let bar = &bars[i];
    ScanMatch {
        ticker: symbol.ticker.clone(),
        symbol_id: symbol.id,
        date: bar.date,
        close: bar.close,
        daily_rsi_3: rows.daily.as_ref().and_then(|r| r.rsi_3),
        daily_rsi_9: rows.daily.as_ref().and_then(|r| r.rsi_9),
        weekly_rsi_3: rows.weekly.as_ref().and_then(|r| r.rsi_3),
        monthly_rsi_3: rows.monthly.as_ref().and_then(|r| r.rsi_3),
        forward_returns: forward_days
            .iter()
            .map(|&days| ForwardReturn {
                days,
                pct: forward_return(bars, i, days),
            })
            .collect(),
    }
}

/// Evaluate `rules` on every daily row dated in `[from, to]`. Matches are
/// ordered by date, then ticker.
pub async fn scan_range<S>(
    store: &S,
    kind: AssetKind,
    rules: &RuleSet,
    from: NaiveDate,
    to: NaiveDate,
    forward_days: &[usize],
) -> Result<Vec<ScanMatch>, ScanError>
where
    S: BarSource + IndicatorStore + ?Sized,
{
    if from > to {
        return Err(ScanError::InvalidRange { from, to });
    }

    let symbols = store.symbols(kind).await?;
    info!(%kind, rules = %rules.name, %from, %to, symbols = symbols.len(), "Scanning date range");

    let mut matches = Vec::new();
    for symbol in &symbols {
        let history = FrameHistory::load(store, kind, symbol.id, Some(to)).await?;
        let key = SeriesKey::new(kind, symbol.id, Timeframe::Daily);
        let bars = store.get_bars(key, Some(from), false).await?;

        let before = matches.len();
        for (i, bar) in bars.iter().enumerate().take_while(|(_, b)| b.date <= to) {
            let rows = history.resolve(bar.date, DailyMatch::Exact);
            if rows.daily.is_none() {
                continue;
            }
            if rules.matches(&AsOfView::new(&rows, Some(bar.close))) {
                matches.push(build_match(symbol, &rows, &bars, i, forward_days));
            }
        }
        debug!(symbol_id = symbol.id, ticker = %symbol.ticker, hits = matches.len() - before, "Symbol scanned");
    }

    matches.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));
    info!(rules = %rules.name, matches = matches.len(), "Scan complete");
    Ok(matches)
}

/// Evaluate `rules` for every symbol as of a single trading date.
pub async fn scan_as_of<S>(
    store: &S,
    kind: AssetKind,
    rules: &RuleSet,
    date: NaiveDate,
    forward_days: &[usize],
) -> Result<Vec<ScanMatch>, ScanError>
where
    S: BarSource + IndicatorStore + ?Sized,
{
    let symbols = store.symbols(kind).await?;
    let aligner = Aligner::new(store, DailyMatch::Exact);

    let mut matches = Vec::new();
    for symbol in &symbols {
        let rows = aligner.resolve_as_of(kind, symbol.id, date).await?;
        if rows.daily.is_none() {
            continue;
        }
        let key = SeriesKey::new(kind, symbol.id, Timeframe::Daily);
        let bars = store.get_bars(key, Some(date), false).await?;
        let Some(first) = bars.first().filter(|b| b.date == date) else {
            continue;
        };
        if rules.matches(&AsOfView::new(&rows, Some(first.close))) {
            matches.push(build_match(symbol, &rows, &bars, 0, forward_days));
        }
    }

    matches.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    info!(%kind, rules = %rules.name, %date, matches = matches.len(), "As-of scan complete");
    Ok(matches)
}
