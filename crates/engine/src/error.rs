use chrono::NaiveDate;
use trendscan_core::{AssetKind, DataError, SeriesKey, Timeframe};

/// Errors raised by the refresh controllers.
///
/// Batch-level variants abort a whole run; series-level ones are caught by
/// the controllers and recorded in their reports.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("no {0} symbols in the store")]
    NoSymbols(AssetKind),
    #[error("no final {timeframe} bar exists for {kind}; cannot anchor the partial fold")]
    PartialAnchorMissing { kind: AssetKind, timeframe: Timeframe },
    #[error("no final daily bars for {0}")]
    NoDailyBars(AssetKind),
    #[error("{key}: no bars")]
    NoBars { key: SeriesKey },
    #[error("{key}: bars out of order at {date}")]
    UnorderedBars { key: SeriesKey, date: NaiveDate },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Data(#[from] DataError),
}
