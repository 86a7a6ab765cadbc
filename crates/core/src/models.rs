use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Universe
// ---------------------------------------------------------------------------

/// Which universe a symbol belongs to. Equities and indices live in separate
/// tables but share the same engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Equity,
    Index,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Equity => "equity",
            AssetKind::Index => "index",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equity" | "equities" => Ok(AssetKind::Equity),
            "index" | "indices" => Ok(AssetKind::Index),
            other => Err(format!("unknown asset kind '{other}'")),
        }
    }
}

/// A tradeable symbol (e.g. RELIANCE, NIFTY50).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub id: i64,
    pub ticker: String,
}

// ---------------------------------------------------------------------------
// Timeframe
// ---------------------------------------------------------------------------

/// Bar cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Daily, Timeframe::Weekly, Timeframe::Monthly];

    /// Storage code used in the `timeframe` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1wk",
            Timeframe::Monthly => "1mo",
        }
    }

    /// Start of the period containing `date`: the date itself for daily, the
    /// Monday of its week for weekly, the first of its month for monthly.
    pub fn period_start(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Timeframe::Daily => date,
            Timeframe::Weekly => date - Duration::days(i64::from(date.weekday().num_days_from_monday())),
            Timeframe::Monthly => date.with_day(1).unwrap_or(date),
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" | "daily" => Ok(Timeframe::Daily),
            "1wk" | "weekly" => Ok(Timeframe::Weekly),
            "1mo" | "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!("unknown timeframe '{other}'")),
        }
    }
}

/// Identifies one bar/indicator series: a symbol of a given kind at a given cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    pub kind: AssetKind,
    pub symbol_id: i64,
    pub timeframe: Timeframe,
}

impl SeriesKey {
    pub fn new(kind: AssetKind, symbol_id: i64, timeframe: Timeframe) -> Self {
        Self { kind, symbol_id, timeframe }
    }

    pub fn with_timeframe(self, timeframe: Timeframe) -> Self {
        Self { timeframe, ..self }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.kind, self.symbol_id, self.timeframe)
    }
}

// ---------------------------------------------------------------------------
// Market Data
// ---------------------------------------------------------------------------

/// A single OHLC(V) bar.
///
/// At most one non-final bar exists per (symbol, timeframe): the synthetic
/// in-progress period, replaced wholesale on every partial refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol_id: i64,
    pub timeframe: Timeframe,
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub adj_close: Decimal,
    pub volume: Option<Decimal>,
    pub is_final: bool,
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

/// The persisted indicator row for one (symbol, timeframe, date).
///
/// Derived only from bars up to and including `date`. `None` marks a value
/// still in its warm-up region or one that failed to compute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub symbol_id: i64,
    pub timeframe: Timeframe,
    pub date: NaiveDate,
    pub is_final: bool,
    pub sma_20: Option<Decimal>,
    pub sma_50: Option<Decimal>,
    pub sma_200: Option<Decimal>,
    pub rsi_3: Option<Decimal>,
    pub rsi_9: Option<Decimal>,
    pub rsi_14: Option<Decimal>,
    pub ema_rsi_9_3: Option<Decimal>,
    pub wma_rsi_9_21: Option<Decimal>,
    pub pct_price_change: Option<Decimal>,
    pub macd: Option<Decimal>,
    pub macd_signal: Option<Decimal>,
    pub bb_upper: Option<Decimal>,
    pub bb_middle: Option<Decimal>,
    pub bb_lower: Option<Decimal>,
    pub atr_14: Option<Decimal>,
    pub supertrend: Option<Decimal>,
    /// `+1` up, `-1` down.
    pub supertrend_dir: Option<i16>,
}

impl IndicatorRow {
    /// An all-undefined row for the given bar slot.
    pub fn empty(symbol_id: i64, timeframe: Timeframe, date: NaiveDate, is_final: bool) -> Self {
        Self {
            symbol_id,
            timeframe,
            date,
            is_final,
            sma_20: None,
            sma_50: None,
            sma_200: None,
            rsi_3: None,
            rsi_9: None,
            rsi_14: None,
            ema_rsi_9_3: None,
            wma_rsi_9_21: None,
            pct_price_change: None,
            macd: None,
            macd_signal: None,
            bb_upper: None,
            bb_middle: None,
            bb_lower: None,
            atr_14: None,
            supertrend: None,
            supertrend_dir: None,
        }
    }
}

/// Trailing one-year high/low for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Week52Stats {
    pub symbol_id: i64,
    pub high: Decimal,
    pub low: Decimal,
    pub as_of: NaiveDate,
}
