//! The built-in scanners.

use rust_decimal_macros::dec;

use crate::rules::{CmpOp, Condition, Field, Frame, Operand, RuleSet};

pub const SCANNER_1: &str = "scanner-1";
pub const SCANNER_2: &str = "scanner-2";

pub fn names() -> [&'static str; 2] {
    [SCANNER_1, SCANNER_2]
}

pub fn preset(name: &str) -> Option<RuleSet> {
    match name {
        SCANNER_1 => Some(scanner_1()),
        SCANNER_2 => Some(scanner_2()),
        _ => None,
    }
}

pub fn all() -> Vec<RuleSet> {
    vec![scanner_1(), scanner_2()]
}

fn field_vs(frame: Frame, field: Field, op: CmpOp, value: rust_decimal::Decimal) -> Condition {
    Condition::compare(Operand::field(frame, field), op, Operand::constant(value))
}

/// Daily RSI(9) momentum building over its averages while RSI(3) crosses 60,
/// with weekly and monthly RSI(3) above 50.
pub fn scanner_1() -> RuleSet {
    RuleSet {
        name: SCANNER_1.to_string(),
        description: Some("RSI(3) crosses 60 with RSI(9) leading its averages; weekly and monthly RSI(3) > 50".into()),
        conditions: vec![
            Condition::compare(
                Operand::ratio(Frame::Daily, Field::Rsi9, Field::EmaRsi93),
                CmpOp::Gt,
                Operand::constant(dec!(1.1)),
            ),
            Condition::compare(
                Operand::ratio(Frame::Daily, Field::EmaRsi93, Field::WmaRsi921),
                CmpOp::Gt,
                Operand::constant(dec!(1.1)),
            ),
            Condition::crosses_above(Field::Rsi3, dec!(60)),
            field_vs(Frame::Monthly, Field::Rsi3, CmpOp::Gt, dec!(50)),
            field_vs(Frame::Weekly, Field::Rsi3, CmpOp::Gt, dec!(50)),
            field_vs(Frame::Daily, Field::PctPriceChange, CmpOp::Le, dec!(5)),
            Condition::compare(Operand::Close, CmpOp::Ge, Operand::constant(dec!(100))),
        ],
    }
}

/// Strong higher-timeframe RSI(3) with daily RSI(3) crossing 55 and RSI(9)
/// stacked above its EMA and WMA on both daily and weekly.
pub fn scanner_2() -> RuleSet {
    RuleSet {
        name: SCANNER_2.to_string(),
        description: Some("RSI(3) crosses 55 with weekly and monthly RSI(3) > 60 and stacked RSI(9) averages".into()),
        conditions: vec![
            Condition::compare(Operand::Close, CmpOp::Ge, Operand::constant(dec!(100))),
            field_vs(Frame::Monthly, Field::Rsi3, CmpOp::Gt, dec!(60)),
            field_vs(Frame::Weekly, Field::Rsi3, CmpOp::Gt, dec!(60)),
            Condition::Crossover {
                field: Field::Rsi3,
                level: dec!(55),
                prev_op: CmpOp::Lt,
                curr_op: CmpOp::Ge,
            },
            Condition::compare(
                Operand::field(Frame::Daily, Field::Rsi9),
                CmpOp::Ge,
                Operand::field(Frame::Daily, Field::EmaRsi93),
            ),
            Condition::compare(
                Operand::field(Frame::Daily, Field::EmaRsi93),
                CmpOp::Ge,
                Operand::field(Frame::Daily, Field::WmaRsi921),
            ),
            Condition::compare(
                Operand::ratio(Frame::Daily, Field::Rsi9, Field::EmaRsi93),
                CmpOp::Ge,
                Operand::constant(dec!(1.2)),
            ),
            Condition::compare(
                Operand::field(Frame::Weekly, Field::Rsi9),
                CmpOp::Ge,
                Operand::field(Frame::Weekly, Field::EmaRsi93),
            ),
            Condition::compare(
                Operand::field(Frame::Weekly, Field::EmaRsi93),
                CmpOp::Ge,
                Operand::field(Frame::Weekly, Field::WmaRsi921),
            ),
            field_vs(Frame::Daily, Field::PctPriceChange, CmpOp::Lt, dec!(10)),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::AsOfView;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use trendscan_core::{IndicatorRow, Timeframe};

    fn row(tf: Timeframe) -> IndicatorRow {
        IndicatorRow::empty(1, tf, NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(), true)
    }

    fn with_rsi(mut r: IndicatorRow, rsi_3: Decimal, rsi_9: Decimal, ema: Decimal, wma: Decimal) -> IndicatorRow {
        r.rsi_3 = Some(rsi_3);
        r.rsi_9 = Some(rsi_9);
        r.ema_rsi_9_3 = Some(ema);
        r.wma_rsi_9_21 = Some(wma);
        r
    }

    #[test]
    fn test_lookup_by_name() {
        for name in names() {
            assert_eq!(preset(name).unwrap().name, name);
        }
        assert!(preset("scanner-9").is_none());
        assert_eq!(all().len(), 2);
    }

    #[test]
    fn test_scanner_1_matches_textbook_setup() {
        let mut daily = with_rsi(row(Timeframe::Daily), dec!(62), dec!(73), dec!(60), dec!(50));
        daily.pct_price_change = Some(dec!(3.5));
        let prev = with_rsi(row(Timeframe::Daily), dec!(40), dec!(50), dec!(50), dec!(50));
        let weekly = with_rsi(row(Timeframe::Weekly), dec!(55), dec!(60), dec!(58), dec!(50));
        let monthly = with_rsi(row(Timeframe::Monthly), dec!(51), dec!(60), dec!(58), dec!(50));

        let mut view = AsOfView {
            daily: Some(&daily),
            previous_daily: Some(&prev),
            weekly: Some(&weekly),
            monthly: Some(&monthly),
            close: Some(dec!(250)),
        };
        assert!(scanner_1().matches(&view));

        // penny stock filter
        view.close = Some(dec!(99.95));
        assert!(!scanner_1().matches(&view));

        // no monthly row yet: not evaluable, so no match
        view.close = Some(dec!(250));
        view.monthly = None;
        assert!(!scanner_1().matches(&view));
    }

    #[test]
    fn test_scanner_2_crossover_boundary() {
        let mut daily = with_rsi(row(Timeframe::Daily), dec!(55), dec!(72), dec!(60), dec!(55));
        daily.pct_price_change = Some(dec!(2));
        let prev = with_rsi(row(Timeframe::Daily), dec!(54.99), dec!(50), dec!(50), dec!(50));
        let weekly = with_rsi(row(Timeframe::Weekly), dec!(61), dec!(65), dec!(60), dec!(55));
        let monthly = with_rsi(row(Timeframe::Monthly), dec!(70), dec!(65), dec!(60), dec!(55));

        let view = AsOfView {
            daily: Some(&daily),
            previous_daily: Some(&prev),
            weekly: Some(&weekly),
            monthly: Some(&monthly),
            close: Some(dec!(100)),
        };
        // 72 / 60 = 1.2 exactly, rsi_3 lands exactly on 55
        assert!(scanner_2().matches(&view));

        let prev_at_level = with_rsi(row(Timeframe::Daily), dec!(55), dec!(50), dec!(50), dec!(50));
        let view = AsOfView {
            previous_daily: Some(&prev_at_level),
            ..view
        };
        assert!(!scanner_2().matches(&view));
    }
}
