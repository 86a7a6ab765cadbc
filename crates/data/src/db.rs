use chrono::NaiveDate;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row, Transaction};
use trendscan_core::{AssetKind, Bar, IndicatorRow, SeriesKey, Symbol, Timeframe, Week52Stats};

/// Run embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Table and key-column names for one universe.
#[derive(Debug, Clone, Copy)]
pub struct Tables {
    pub symbols: &'static str,
    pub prices: &'static str,
    pub indicators: &'static str,
    pub week52: &'static str,
    pub id: &'static str,
}

pub fn tables(kind: AssetKind) -> Tables {
    match kind {
        AssetKind::Equity => Tables {
            symbols: "equity_symbols",
            prices: "equity_price_data",
            indicators: "equity_indicators",
            week52: "equity_52week_stats",
            id: "symbol_id",
        },
        AssetKind::Index => Tables {
            symbols: "index_symbols",
            prices: "index_price_data",
            indicators: "index_indicators",
            week52: "index_52week_stats",
            id: "index_id",
        },
    }
}

const INDICATOR_COLUMNS: &str = "date, is_final, sma_20, sma_50, sma_200, rsi_3, rsi_9, rsi_14, \
     ema_rsi_9_3, wma_rsi_9_21, pct_price_change, macd, macd_signal, \
     bb_upper, bb_middle, bb_lower, atr_14, supertrend, supertrend_dir";

// ---------------------------------------------------------------------------
// Symbols
// ---------------------------------------------------------------------------

pub async fn load_symbols(pool: &PgPool, kind: AssetKind) -> Result<Vec<Symbol>, sqlx::Error> {
    let t = tables(kind);
    let rows = sqlx::query(&format!("SELECT {id} AS id, symbol FROM {symbols} ORDER BY symbol", id = t.id, symbols = t.symbols))
        .fetch_all(pool)
        .await?;

    rows.iter()
        .map(|r| {
            Ok(Symbol {
                id: r.try_get("id")?,
                ticker: r.try_get("symbol")?,
            })
        })
        .collect()
}

pub async fn ensure_symbol(pool: &PgPool, kind: AssetKind, ticker: &str) -> Result<Symbol, sqlx::Error> {
    let t = tables(kind);
    let row = sqlx::query(&format!(
        "INSERT INTO {symbols} (symbol) VALUES ($1)
         ON CONFLICT (symbol) DO UPDATE SET symbol = EXCLUDED.symbol
         RETURNING {id} AS id, symbol",
        symbols = t.symbols,
        id = t.id
    ))
    .bind(ticker)
    .fetch_one(pool)
    .await?;

    Ok(Symbol {
        id: row.try_get("id")?,
        ticker: row.try_get("symbol")?,
    })
}

// ---------------------------------------------------------------------------
// Bars
// ---------------------------------------------------------------------------

/// Load bars for one series in ascending date order.
pub async fn load_bars(
    pool: &PgPool,
    key: SeriesKey,
    since: Option<NaiveDate>,
    include_partial: bool,
) -> Result<Vec<Bar>, sqlx::Error> {
    let t = tables(key.kind);
    let rows = sqlx::query(&format!(
        "SELECT date, open, high, low, close, adj_close, volume, is_final
         FROM {prices}
         WHERE {id} = $1 AND timeframe = $2
           AND ($3::date IS NULL OR date >= $3)
           AND ($4 OR is_final)
         ORDER BY date ASC",
        prices = t.prices,
        id = t.id
    ))
    .bind(key.symbol_id)
    .bind(key.timeframe.as_str())
    .bind(since)
    .bind(include_partial)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(Bar {
                symbol_id: key.symbol_id,
                timeframe: key.timeframe,
                date: r.try_get("date")?,
                open: r.try_get("open")?,
                high: r.try_get("high")?,
                low: r.try_get("low")?,
                close: r.try_get("close")?,
                adj_close: r.try_get("adj_close")?,
                volume: r.try_get("volume")?,
                is_final: r.try_get("is_final")?,
            })
        })
        .collect()
}

/// Date of the `lookback`-th final bar at or before `anchor`, counting back.
pub async fn lookback_start(
    pool: &PgPool,
    key: SeriesKey,
    anchor: NaiveDate,
    lookback: usize,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    let t = tables(key.kind);
    let offset = i64::try_from(lookback.saturating_sub(1)).unwrap_or(i64::MAX);
    let row = sqlx::query(&format!(
        "SELECT date FROM {prices}
         WHERE {id} = $1 AND timeframe = $2 AND is_final AND date <= $3
         ORDER BY date DESC
         OFFSET $4 LIMIT 1",
        prices = t.prices,
        id = t.id
    ))
    .bind(key.symbol_id)
    .bind(key.timeframe.as_str())
    .bind(anchor)
    .bind(offset)
    .fetch_optional(pool)
    .await?;

    row.map(|r| r.try_get("date")).transpose()
}

pub async fn last_final_bar_date(
    pool: &PgPool,
    kind: AssetKind,
    timeframe: Timeframe,
) -> Result<Option<NaiveDate>, sqlx::Error> {
    let t = tables(kind);
    let row = sqlx::query(&format!(
        "SELECT MAX(date) AS last FROM {prices} WHERE timeframe = $1 AND is_final",
        prices = t.prices
    ))
    .bind(timeframe.as_str())
    .fetch_one(pool)
    .await?;
    row.try_get("last")
}

async fn insert_bar(
    tx: &mut Transaction<'_, Postgres>,
    t: Tables,
    bar: &Bar,
    on_conflict: &str,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(&format!(
        "INSERT INTO {prices} ({id}, timeframe, date, open, high, low, close, adj_close, volume, is_final)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT ({id}, timeframe, date) {on_conflict}",
        prices = t.prices,
        id = t.id
    ))
    .bind(bar.symbol_id)
    .bind(bar.timeframe.as_str())
    .bind(bar.date)
    .bind(bar.open)
    .bind(bar.high)
    .bind(bar.low)
    .bind(bar.close)
    .bind(bar.adj_close)
    .bind(bar.volume)
    .bind(bar.is_final)
    .execute(&mut **tx)
    .await?;
    Ok(done.rows_affected())
}

/// Insert or overwrite bars in one transaction.
pub async fn upsert_bars(pool: &PgPool, kind: AssetKind, bars: &[Bar]) -> Result<u64, sqlx::Error> {
    let t = tables(kind);
    let mut tx = pool.begin().await?;
    let mut count = 0u64;
    for bar in bars {
        count += insert_bar(
            &mut tx,
            t,
            bar,
            "DO UPDATE SET open = EXCLUDED.open, high = EXCLUDED.high, low = EXCLUDED.low,
                 close = EXCLUDED.close, adj_close = EXCLUDED.adj_close,
                 volume = EXCLUDED.volume, is_final = EXCLUDED.is_final",
        )
        .await?;
    }
    tx.commit().await?;
    Ok(count)
}

/// Swap the universe's non-final bars for `bars`. Keys already held by a
/// final bar are skipped.
pub async fn replace_partial_bars(pool: &PgPool, kind: AssetKind, bars: &[Bar]) -> Result<u64, sqlx::Error> {
    let t = tables(kind);
    let mut tx = pool.begin().await?;
    sqlx::query(&format!("DELETE FROM {prices} WHERE NOT is_final", prices = t.prices))
        .execute(&mut *tx)
        .await?;
    let mut count = 0u64;
    for bar in bars {
        count += insert_bar(&mut tx, t, bar, "DO NOTHING").await?;
    }
    tx.commit().await?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Indicators
// ---------------------------------------------------------------------------

fn indicator_from_row(key: SeriesKey, r: &PgRow) -> Result<IndicatorRow, sqlx::Error> {
    Ok(IndicatorRow {
        symbol_id: key.symbol_id,
        timeframe: key.timeframe,
        date: r.try_get("date")?,
        is_final: r.try_get("is_final")?,
        sma_20: r.try_get("sma_20")?,
        sma_50: r.try_get("sma_50")?,
        sma_200: r.try_get("sma_200")?,
        rsi_3: r.try_get("rsi_3")?,
        rsi_9: r.try_get("rsi_9")?,
        rsi_14: r.try_get("rsi_14")?,
        ema_rsi_9_3: r.try_get("ema_rsi_9_3")?,
        wma_rsi_9_21: r.try_get("wma_rsi_9_21")?,
        pct_price_change: r.try_get("pct_price_change")?,
        macd: r.try_get("macd")?,
        macd_signal: r.try_get("macd_signal")?,
        bb_upper: r.try_get("bb_upper")?,
        bb_middle: r.try_get("bb_middle")?,
        bb_lower: r.try_get("bb_lower")?,
        atr_14: r.try_get("atr_14")?,
        supertrend: r.try_get("supertrend")?,
        supertrend_dir: r.try_get("supertrend_dir")?,
    })
}

async fn insert_indicator_row(
    tx: &mut Transaction<'_, Postgres>,
    t: Tables,
    row: &IndicatorRow,
    on_conflict: &str,
) -> Result<u64, sqlx::Error> {
    let done = sqlx::query(&format!(
        "INSERT INTO {indicators} ({id}, timeframe, {INDICATOR_COLUMNS})
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13,
                 $14, $15, $16, $17, $18, $19, $20, $21)
         ON CONFLICT ({id}, timeframe, date) {on_conflict}",
        indicators = t.indicators,
        id = t.id
    ))
    .bind(row.symbol_id)
    .bind(row.timeframe.as_str())
    .bind(row.date)
    .bind(row.is_final)
    .bind(row.sma_20)
    .bind(row.sma_50)
    .bind(row.sma_200)
    .bind(row.rsi_3)
    .bind(row.rsi_9)
    .bind(row.rsi_14)
    .bind(row.ema_rsi_9_3)
    .bind(row.wma_rsi_9_21)
    .bind(row.pct_price_change)
    .bind(row.macd)
    .bind(row.macd_signal)
    .bind(row.bb_upper)
    .bind(row.bb_middle)
    .bind(row.bb_lower)
    .bind(row.atr_14)
    .bind(row.supertrend)
    .bind(row.supertrend_dir)
    .execute(&mut **tx)
    .await?;
    Ok(done.rows_affected())
}

/// Insert or overwrite indicator rows in one transaction.
pub async fn upsert_indicator_rows(pool: &PgPool, kind: AssetKind, rows: &[IndicatorRow]) -> Result<u64, sqlx::Error> {
    let t = tables(kind);
    let mut tx = pool.begin().await?;
    let mut count = 0u64;
    for row in rows {
        count += insert_indicator_row(
            &mut tx,
            t,
            row,
            "DO UPDATE SET is_final = EXCLUDED.is_final,
                 sma_20 = EXCLUDED.sma_20, sma_50 = EXCLUDED.sma_50, sma_200 = EXCLUDED.sma_200,
                 rsi_3 = EXCLUDED.rsi_3, rsi_9 = EXCLUDED.rsi_9, rsi_14 = EXCLUDED.rsi_14,
                 ema_rsi_9_3 = EXCLUDED.ema_rsi_9_3, wma_rsi_9_21 = EXCLUDED.wma_rsi_9_21,
                 pct_price_change = EXCLUDED.pct_price_change,
                 macd = EXCLUDED.macd, macd_signal = EXCLUDED.macd_signal,
                 bb_upper = EXCLUDED.bb_upper, bb_middle = EXCLUDED.bb_middle, bb_lower = EXCLUDED.bb_lower,
                 atr_14 = EXCLUDED.atr_14, supertrend = EXCLUDED.supertrend,
                 supertrend_dir = EXCLUDED.supertrend_dir",
        )
        .await?;
    }
    tx.commit().await?;
    Ok(count)
}

/// Swap the universe's non-final indicator rows for `rows`.
pub async fn replace_partial_indicator_rows(
    pool: &PgPool,
    kind: AssetKind,
    rows: &[IndicatorRow],
) -> Result<u64, sqlx::Error> {
    let t = tables(kind);
    let mut tx = pool.begin().await?;
    sqlx::query(&format!("DELETE FROM {indicators} WHERE NOT is_final", indicators = t.indicators))
        .execute(&mut *tx)
        .await?;
    let mut count = 0u64;
    for row in rows {
        count += insert_indicator_row(&mut tx, t, row, "DO NOTHING").await?;
    }
    tx.commit().await?;
    Ok(count)
}

pub async fn last_indicator_date(pool: &PgPool, key: SeriesKey) -> Result<Option<NaiveDate>, sqlx::Error> {
    let t = tables(key.kind);
    let row = sqlx::query(&format!(
        "SELECT MAX(date) AS last FROM {indicators} WHERE {id} = $1 AND timeframe = $2 AND is_final",
        indicators = t.indicators,
        id = t.id
    ))
    .bind(key.symbol_id)
    .bind(key.timeframe.as_str())
    .fetch_one(pool)
    .await?;
    row.try_get("last")
}

pub async fn load_indicator_rows(
    pool: &PgPool,
    key: SeriesKey,
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
) -> Result<Vec<IndicatorRow>, sqlx::Error> {
    let t = tables(key.kind);
    let rows = sqlx::query(&format!(
        "SELECT {INDICATOR_COLUMNS} FROM {indicators}
         WHERE {id} = $1 AND timeframe = $2
           AND ($3::date IS NULL OR date >= $3)
           AND ($4::date IS NULL OR date <= $4)
         ORDER BY date ASC",
        indicators = t.indicators,
        id = t.id
    ))
    .bind(key.symbol_id)
    .bind(key.timeframe.as_str())
    .bind(from)
    .bind(to)
    .fetch_all(pool)
    .await?;

    rows.iter().map(|r| indicator_from_row(key, r)).collect()
}

/// Latest row dated `<= date` (or `< date` when `strict`).
pub async fn indicator_row_before(
    pool: &PgPool,
    key: SeriesKey,
    date: NaiveDate,
    strict: bool,
) -> Result<Option<IndicatorRow>, sqlx::Error> {
    let t = tables(key.kind);
    let cmp = if strict { "<" } else { "<=" };
    let row = sqlx::query(&format!(
        "SELECT {INDICATOR_COLUMNS} FROM {indicators}
         WHERE {id} = $1 AND timeframe = $2 AND date {cmp} $3
         ORDER BY date DESC
         LIMIT 1",
        indicators = t.indicators,
        id = t.id
    ))
    .bind(key.symbol_id)
    .bind(key.timeframe.as_str())
    .bind(date)
    .fetch_optional(pool)
    .await?;

    row.map(|r| indicator_from_row(key, &r)).transpose()
}

// ---------------------------------------------------------------------------
// 52-week statistics
// ---------------------------------------------------------------------------

pub async fn upsert_week52_stats(pool: &PgPool, kind: AssetKind, stats: &[Week52Stats]) -> Result<u64, sqlx::Error> {
    let t = tables(kind);
    let mut tx = pool.begin().await?;
    let mut count = 0u64;
    for s in stats {
        let done = sqlx::query(&format!(
            "INSERT INTO {week52} ({id}, week52_high, week52_low, as_of_date)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ({id}) DO UPDATE
             SET week52_high = EXCLUDED.week52_high, week52_low = EXCLUDED.week52_low,
                 as_of_date = EXCLUDED.as_of_date",
            week52 = t.week52,
            id = t.id
        ))
        .bind(s.symbol_id)
        .bind(s.high)
        .bind(s.low)
        .bind(s.as_of)
        .execute(&mut *tx)
        .await?;
        count += done.rows_affected();
    }
    tx.commit().await?;
    Ok(count)
}

pub async fn load_week52_stats(pool: &PgPool, kind: AssetKind) -> Result<Vec<Week52Stats>, sqlx::Error> {
    let t = tables(kind);
    let rows = sqlx::query(&format!(
        "SELECT {id} AS id, week52_high, week52_low, as_of_date FROM {week52} ORDER BY {id}",
        week52 = t.week52,
        id = t.id
    ))
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|r| {
            Ok(Week52Stats {
                symbol_id: r.try_get("id")?,
                high: r.try_get("week52_high")?,
                low: r.try_get("week52_low")?,
                as_of: r.try_get("as_of_date")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_per_kind() {
        let eq = tables(AssetKind::Equity);
        assert_eq!(eq.prices, "equity_price_data");
        assert_eq!(eq.id, "symbol_id");
        let ix = tables(AssetKind::Index);
        assert_eq!(ix.indicators, "index_indicators");
        assert_eq!(ix.id, "index_id");
    }

    #[test]
    fn test_indicator_columns_match_placeholders() {
        // id + timeframe + listed columns
        let n = INDICATOR_COLUMNS.split(',').count() + 2;
        assert_eq!(n, 21);
    }
}
