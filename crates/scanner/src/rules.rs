use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use trendscan_core::IndicatorRow;
use trendscan_engine::AsOfRows;

use crate::ScanError;

/// Which timeframe row an operand reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frame {
    Daily,
    Weekly,
    Monthly,
}

/// An indicator column, named as in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    #[serde(rename = "sma_20")]
    Sma20,
    #[serde(rename = "sma_50")]
    Sma50,
    #[serde(rename = "sma_200")]
    Sma200,
    #[serde(rename = "rsi_3")]
    Rsi3,
    #[serde(rename = "rsi_9")]
    Rsi9,
    #[serde(rename = "rsi_14")]
    Rsi14,
    #[serde(rename = "ema_rsi_9_3")]
    EmaRsi93,
    #[serde(rename = "wma_rsi_9_21")]
    WmaRsi921,
    PctPriceChange,
    Macd,
    MacdSignal,
    BbUpper,
    BbMiddle,
    BbLower,
    #[serde(rename = "atr_14")]
    Atr14,
    Supertrend,
    SupertrendDir,
}

impl Field {
    pub fn value(self, row: &IndicatorRow) -> Option<Decimal> {
        match self {
            Field::Sma20 => row.sma_20,
            Field::Sma50 => row.sma_50,
            Field::Sma200 => row.sma_200,
            Field::Rsi3 => row.rsi_3,
            Field::Rsi9 => row.rsi_9,
            Field::Rsi14 => row.rsi_14,
            Field::EmaRsi93 => row.ema_rsi_9_3,
            Field::WmaRsi921 => row.wma_rsi_9_21,
            Field::PctPriceChange => row.pct_price_change,
            Field::Macd => row.macd,
            Field::MacdSignal => row.macd_signal,
            Field::BbUpper => row.bb_upper,
            Field::BbMiddle => row.bb_middle,
            Field::BbLower => row.bb_lower,
            Field::Atr14 => row.atr_14,
            Field::Supertrend => row.supertrend,
            Field::SupertrendDir => row.supertrend_dir.map(Decimal::from),
        }
    }
}

/// Comparison operator, written as its symbol in rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

impl CmpOp {
    pub fn apply(self, left: Decimal, right: Decimal) -> bool {
        match self {
            CmpOp::Gt => left > right,
            CmpOp::Ge => left >= right,
            CmpOp::Lt => left < right,
            CmpOp::Le => left <= right,
            CmpOp::Eq => left == right,
            CmpOp::Ne => left != right,
        }
    }
}

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    Field { frame: Frame, field: Field },
    /// `num / den` on the same row; undefined when `den` is zero.
    Ratio { frame: Frame, num: Field, den: Field },
    /// The daily close on the evaluated date.
    Close,
    Const { value: Decimal },
}

impl Operand {
    pub fn field(frame: Frame, field: Field) -> Self {
        Operand::Field { frame, field }
    }

    pub fn ratio(frame: Frame, num: Field, den: Field) -> Self {
        Operand::Ratio { frame, num, den }
    }

    pub fn constant(value: Decimal) -> Self {
        Operand::Const { value }
    }

    pub fn eval(&self, view: &AsOfView<'_>) -> Option<Decimal> {
        match self {
            Operand::Field { frame, field } => field.value(view.row(*frame)?),
            Operand::Ratio { frame, num, den } => {
                let row = view.row(*frame)?;
                let den = den.value(row)?;
                if den.is_zero() {
                    return None;
                }
                num.value(row)?.checked_div(den)
            }
            Operand::Close => view.close,
            Operand::Const { value } => Some(*value),
        }
    }
}

/// A single test. A condition with an undefined operand never holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Compare { left: Operand, op: CmpOp, right: Operand },
    /// `prev_op(previous daily value, level) && curr_op(daily value, level)`,
    /// where the previous row is the one with the next-smaller date.
    Crossover {
        field: Field,
        level: Decimal,
        prev_op: CmpOp,
        curr_op: CmpOp,
    },
}

impl Condition {
    pub fn compare(left: Operand, op: CmpOp, right: Operand) -> Self {
        Condition::Compare { left, op, right }
    }

    /// Crossing up through `level`: previous `<= level`, current `> level`.
    pub fn crosses_above(field: Field, level: Decimal) -> Self {
        Condition::Crossover {
            field,
            level,
            prev_op: CmpOp::Le,
            curr_op: CmpOp::Gt,
        }
    }

    pub fn holds(&self, view: &AsOfView<'_>) -> bool {
        match self {
            Condition::Compare { left, op, right } => match (left.eval(view), right.eval(view)) {
                (Some(l), Some(r)) => op.apply(l, r),
                _ => false,
            },
            Condition::Crossover {
                field,
                level,
                prev_op,
                curr_op,
            } => {
                let prev = view.previous_daily.and_then(|r| field.value(r));
                let curr = view.daily.and_then(|r| field.value(r));
                match (prev, curr) {
                    (Some(p), Some(c)) => prev_op.apply(p, *level) && curr_op.apply(c, *level),
                    _ => false,
                }
            }
        }
    }
}

/// A named conjunction of conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleSet {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub conditions: Vec<Condition>,
}

impl RuleSet {
    pub fn matches(&self, view: &AsOfView<'_>) -> bool {
        self.conditions.iter().all(|c| c.holds(view))
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ScanError> {
        let rules: Self = toml::from_str(s).map_err(|e| ScanError::InvalidRules(e.to_string()))?;
        if rules.conditions.is_empty() {
            return Err(ScanError::InvalidRules(format!("rule set '{}' has no conditions", rules.name)));
        }
        Ok(rules)
    }

    pub fn load(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ScanError::InvalidRules(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&text)
    }
}

/// Everything a rule can read for one symbol on one date.
#[derive(Debug, Clone, Copy, Default)]
pub struct AsOfView<'a> {
    pub daily: Option<&'a IndicatorRow>,
    pub previous_daily: Option<&'a IndicatorRow>,
    pub weekly: Option<&'a IndicatorRow>,
    pub monthly: Option<&'a IndicatorRow>,
    pub close: Option<Decimal>,
}

impl<'a> AsOfView<'a> {
    pub fn new(rows: &'a AsOfRows, close: Option<Decimal>) -> Self {
        Self {
            daily: rows.daily.as_ref(),
            previous_daily: rows.previous_daily.as_ref(),
            weekly: rows.weekly.as_ref(),
            monthly: rows.monthly.as_ref(),
            close,
        }
    }

    pub fn row(&self, frame: Frame) -> Option<&'a IndicatorRow> {
        match frame {
            Frame::Daily => self.daily,
            Frame::Weekly => self.weekly,
            Frame::Monthly => self.monthly,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use trendscan_core::Timeframe;

    fn row(rsi_3: Option<Decimal>, rsi_9: Option<Decimal>, ema: Option<Decimal>) -> IndicatorRow {
        let mut r = IndicatorRow::empty(1, Timeframe::Daily, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), true);
        r.rsi_3 = rsi_3;
        r.rsi_9 = rsi_9;
        r.ema_rsi_9_3 = ema;
        r
    }

    #[test]
    fn test_compare_and_ratio() {
        let daily = row(Some(dec!(70)), Some(dec!(66)), Some(dec!(55)));
        let view = AsOfView {
            daily: Some(&daily),
            close: Some(dec!(120)),
            ..Default::default()
        };
        let ratio = Condition::compare(
            Operand::ratio(Frame::Daily, Field::Rsi9, Field::EmaRsi93),
            CmpOp::Gt,
            Operand::constant(dec!(1.1)),
        );
        // 66 / 55 = 1.2
        assert!(ratio.holds(&view));
        assert!(Condition::compare(Operand::Close, CmpOp::Ge, Operand::constant(dec!(100))).holds(&view));
        assert!(!Condition::compare(Operand::Close, CmpOp::Lt, Operand::constant(dec!(100))).holds(&view));
    }

    #[test]
    fn test_missing_operand_is_false() {
        let daily = row(Some(dec!(70)), None, Some(dec!(0)));
        let view = AsOfView {
            daily: Some(&daily),
            ..Default::default()
        };
        // undefined numerator, zero denominator, missing frame, missing close
        let conds = [
            Condition::compare(Operand::field(Frame::Daily, Field::Rsi9), CmpOp::Lt, Operand::constant(dec!(1000))),
            Condition::compare(
                Operand::ratio(Frame::Daily, Field::Rsi3, Field::EmaRsi93),
                CmpOp::Gt,
                Operand::constant(dec!(0)),
            ),
            Condition::compare(Operand::field(Frame::Weekly, Field::Rsi3), CmpOp::Gt, Operand::constant(dec!(0))),
            Condition::compare(Operand::Close, CmpOp::Gt, Operand::constant(dec!(0))),
        ];
        for c in &conds {
            assert!(!c.holds(&view), "{c:?}");
        }
    }

    #[test]
    fn test_crossover_needs_previous_row() {
        let prev = row(Some(dec!(58)), None, None);
        let curr = row(Some(dec!(61)), None, None);
        let cross = Condition::crosses_above(Field::Rsi3, dec!(60));

        let view = AsOfView {
            daily: Some(&curr),
            previous_daily: Some(&prev),
            ..Default::default()
        };
        assert!(cross.holds(&view));

        let no_prev = AsOfView {
            daily: Some(&curr),
            ..Default::default()
        };
        assert!(!cross.holds(&no_prev));

        // already above yesterday: no cross
        let above = row(Some(dec!(62)), None, None);
        let stayed = AsOfView {
            daily: Some(&curr),
            previous_daily: Some(&above),
            ..Default::default()
        };
        assert!(!cross.holds(&stayed));
    }

    #[test]
    fn test_rule_set_from_toml() {
        let rules = RuleSet::from_toml_str(
            r#"
            name = "momentum"

            [[conditions]]
            type = "compare"
            op = ">"
            left = { kind = "field", frame = "weekly", field = "rsi_3" }
            right = { kind = "const", value = "50" }

            [[conditions]]
            type = "crossover"
            field = "rsi_3"
            level = "55"
            prev_op = "<"
            curr_op = ">="

            [[conditions]]
            type = "compare"
            op = ">="
            left = { kind = "close" }
            right = { kind = "const", value = "100" }
            "#,
        )
        .unwrap();
        assert_eq!(rules.name, "momentum");
        assert_eq!(rules.conditions.len(), 3);
        assert_eq!(
            rules.conditions[1],
            Condition::Crossover {
                field: Field::Rsi3,
                level: dec!(55),
                prev_op: CmpOp::Lt,
                curr_op: CmpOp::Ge,
            }
        );
    }

    #[test]
    fn test_rule_set_rejects_empty_and_unknown_fields() {
        assert!(RuleSet::from_toml_str("name = \"x\"\nconditions = []").is_err());
        let bad_field = r#"
            name = "x"
            [[conditions]]
            type = "crossover"
            field = "rsi_5"
            level = "1"
            prev_op = "<"
            curr_op = ">"
        "#;
        assert!(matches!(RuleSet::from_toml_str(bad_field), Err(ScanError::InvalidRules(_))));
    }
}
