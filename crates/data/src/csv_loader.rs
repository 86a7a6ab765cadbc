use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr;
use trendscan_core::{Bar, DataError, Timeframe};

/// Load daily/weekly/monthly bars for one symbol from a CSV file.
///
/// Expected columns (case-insensitive, flexible ordering):
/// `date` (or `timestamp`, `datetime`), `open`, `high`, `low`, `close`,
/// optionally `adj_close` (or `adj close`, `adjclose`) and `volume`.
/// A missing adjusted close falls back to the close. Rows come back sorted by
/// date and marked final.
pub fn load_bars_from_csv(path: &Path, symbol_id: i64, timeframe: Timeframe) -> Result<Vec<Bar>, DataError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(format!("Failed to open CSV: {}", e)))?;

    let headers = reader
        .headers()
        .map_err(|e| DataError::ParseError(format!("Failed to read headers: {}", e)))?
        .clone();

    let col_map = resolve_bar_columns(&headers)?;

    let mut bars = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| DataError::ParseError(format!("CSV record error: {}", e)))?;

        let field = |idx: usize| record.get(idx).unwrap_or("");
        let date = parse_date(field(col_map.date))?;
        let open = parse_decimal(field(col_map.open), "open")?;
        let high = parse_decimal(field(col_map.high), "high")?;
        let low = parse_decimal(field(col_map.low), "low")?;
        let close = parse_decimal(field(col_map.close), "close")?;
        let adj_close = match col_map.adj_close {
            Some(idx) => parse_decimal(field(idx), "adj_close")?,
            None => close,
        };
        let volume = match col_map.volume {
            Some(idx) if !field(idx).is_empty() => Some(parse_decimal(field(idx), "volume")?),
            _ => None,
        };

        bars.push(Bar {
            symbol_id,
            timeframe,
            date,
            open,
            high,
            low,
            close,
            adj_close,
            volume,
            is_final: true,
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

struct BarColumnMap {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: Option<usize>,
}

fn resolve_bar_columns(headers: &csv::StringRecord) -> Result<BarColumnMap, DataError> {
    let date = find_column(headers, &["date", "timestamp", "datetime", "time"])
        .ok_or_else(|| DataError::ParseError("No date column found".into()))?;
    let open = find_column(headers, &["open", "o"])
        .ok_or_else(|| DataError::ParseError("No open column found".into()))?;
    let high = find_column(headers, &["high", "h"])
        .ok_or_else(|| DataError::ParseError("No high column found".into()))?;
    let low = find_column(headers, &["low", "l"])
        .ok_or_else(|| DataError::ParseError("No low column found".into()))?;
    let close = find_column(headers, &["close", "c"])
        .ok_or_else(|| DataError::ParseError("No close column found".into()))?;
    let adj_close = find_column(headers, &["adj_close", "adj close", "adjclose"]);
    let volume = find_column(headers, &["volume", "vol", "v"]);

    Ok(BarColumnMap {
        date,
        open,
        high,
        low,
        close,
        adj_close,
        volume,
    })
}

fn find_column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|header| names.contains(&header.trim().to_lowercase().as_str()))
}

fn parse_decimal(s: &str, field: &str) -> Result<Decimal, DataError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| DataError::ParseError(format!("Failed to parse {} '{}': {}", field, s, e)))
}

fn parse_date(s: &str) -> Result<NaiveDate, DataError> {
    let s = s.trim();

    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%Y%m%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(date);
        }
    }

    // Timestamps keep only their calendar date
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Ok(dt.date_naive());
    }

    Err(DataError::ParseError(format!("Unable to parse date: '{}'", s)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_loads_and_sorts_bars() {
        let file = write_csv(
            "Date,Open,High,Low,Close,Adj Close,Volume\n\
             2024-01-03,101,103,100,102,101.5,2000\n\
             2024-01-02,100,102,99,101,100.5,1500\n",
        );
        let bars = load_bars_from_csv(file.path(), 42, Timeframe::Daily).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].adj_close, dec!(100.5));
        assert_eq!(bars[1].volume, Some(dec!(2000)));
        assert!(bars.iter().all(|b| b.symbol_id == 42 && b.is_final));
    }

    #[test]
    fn test_adj_close_defaults_to_close() {
        let file = write_csv("date,open,high,low,close\n2024-02-01,10,11,9,10.5\n");
        let bars = load_bars_from_csv(file.path(), 1, Timeframe::Weekly).unwrap();
        assert_eq!(bars[0].adj_close, dec!(10.5));
        assert_eq!(bars[0].volume, None);
        assert_eq!(bars[0].timeframe, Timeframe::Weekly);
    }

    #[test]
    fn test_missing_close_column_is_an_error() {
        let file = write_csv("date,open,high,low\n2024-02-01,10,11,9\n");
        assert!(matches!(
            load_bars_from_csv(file.path(), 1, Timeframe::Daily),
            Err(DataError::ParseError(_))
        ));
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(parse_date("2024-03-15").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15 00:00:00").unwrap(), expected);
        assert_eq!(parse_date("2024-03-15T09:15:00+05:30").unwrap(), expected);
        assert!(parse_date("yesterday").is_err());
    }
}
