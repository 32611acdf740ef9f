//! Formatter Module
//!
//! セル値をCSVフィールド用の文字列に変換するモジュール。

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

use crate::api::{DateFormat, FormulaMode};
use crate::types::{CellValue, RawCellData};

/// f64で正確に表現できる整数の上限（2^53）
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// 1900年システムで存在しない1900年2月29日を表すシリアル値
const LEAP_BUG_SERIAL: f64 = 60.0;

/// セルフォーマッター
///
/// セル値のフォーマット処理のファサードとして機能します。
#[derive(Debug, Clone)]
pub(crate) struct CellFormatter {
    date_formatter: DateFormatter,
    formula_mode: FormulaMode,
}

impl CellFormatter {
    pub fn new(date_format: DateFormat, formula_mode: FormulaMode) -> Self {
        Self {
            date_formatter: DateFormatter { date_format },
            formula_mode,
        }
    }

    /// セル値をフォーマット
    ///
    /// # 引数
    ///
    /// * `raw_cell` - パーサーから抽出された生のセルデータ
    /// * `is_1904` - 1904年エポックを使用するかどうか
    ///
    /// # 戻り値
    ///
    /// CSVにそのまま書き出せる文字列（エスケープはCSVライター側で行う）
    pub fn format_cell(&self, raw_cell: &RawCellData, is_1904: bool) -> String {
        if self.formula_mode == FormulaMode::Formula {
            if let Some(ref formula) = raw_cell.formula {
                return format!("={}", formula);
            }
        }

        match &raw_cell.value {
            CellValue::Int(i) => i.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::String(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Error(e) => e.clone(),
            CellValue::DateTime(serial) => self.date_formatter.format(*serial, is_1904),
            CellValue::Duration(days) => format_duration(*days),
            CellValue::DateTimeIso(s) | CellValue::DurationIso(s) => s.clone(),
            CellValue::Empty => String::new(),
        }
    }
}

/// 数値を文字列に変換
///
/// 小数部のない値は`.0`なしの整数表記、それ以外は往復可能な最短表記にします。
pub(crate) fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// 経過時間（日単位）を`[h]:mm:ss`形式に変換
pub(crate) fn format_duration(days: f64) -> String {
    let total_seconds = (days * SECONDS_PER_DAY).round() as i64;
    let sign = if total_seconds < 0 { "-" } else { "" };
    let total_seconds = total_seconds.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60
    )
}

/// 日付フォーマッター
///
/// Excelのシリアル日付値を文字列に変換します。
///
/// # エポックシステム
///
/// - 1900年システム（デフォルト）
///   - シリアル値1 = 1900年1月1日
///   - シリアル値60 = 1900年2月29日（存在しない日、Excelのうるう年バグ）。
///     ISO 8601形式ではそのまま`1900-02-29`と出力し、独自書式では1900年2月28日として扱う
///   - シリアル値61以降は1899年12月30日起算
/// - 1904年システム（Mac版Excel）
///   - シリアル値0 = 1904年1月1日
#[derive(Debug, Clone)]
pub(crate) struct DateFormatter {
    date_format: DateFormat,
}

impl DateFormatter {
    /// 日付として表現できないシリアル値（負の値など）は数値としてそのまま出力します。
    pub fn format(&self, serial_value: f64, is_1904: bool) -> String {
        let Some(datetime) = serial_to_datetime(serial_value, is_1904) else {
            return format_number(serial_value);
        };

        match &self.date_format {
            DateFormat::Iso8601 => {
                let time = datetime.format("%H:%M:%S").to_string();
                if serial_value < 1.0 {
                    // 時刻のみの値（エポックによらない）
                    return time;
                }

                let date = if !is_1904 && serial_value.floor() == LEAP_BUG_SERIAL {
                    "1900-02-29".to_string()
                } else {
                    datetime.format("%Y-%m-%d").to_string()
                };
                if datetime.num_seconds_from_midnight() != 0 {
                    format!("{} {}", date, time)
                } else {
                    date
                }
            }
            DateFormat::Custom(format_str) => datetime.format(format_str).to_string(),
        }
    }
}

/// シリアル値を日時に変換（負の値や範囲外は`None`）
pub(crate) fn serial_to_datetime(serial_value: f64, is_1904: bool) -> Option<NaiveDateTime> {
    if !serial_value.is_finite() || serial_value < 0.0 {
        return None;
    }

    let epoch = if is_1904 {
        NaiveDate::from_ymd_opt(1904, 1, 1)?
    } else if serial_value < LEAP_BUG_SERIAL {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };

    let days = serial_value.floor();
    let seconds = ((serial_value - days) * SECONDS_PER_DAY).round() as i64;

    epoch
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::try_days(days as i64)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellCoord;

    fn raw(value: CellValue) -> RawCellData {
        RawCellData {
            coord: CellCoord::new(0, 0),
            value,
            formula: None,
        }
    }

    fn default_formatter() -> CellFormatter {
        CellFormatter::new(DateFormat::Iso8601, FormulaMode::CachedValue)
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(42.0), "42");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(2.75), "2.75");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1e20), "100000000000000000000");
    }

    #[test]
    fn test_format_scalar_values() {
        let formatter = default_formatter();
        assert_eq!(formatter.format_cell(&raw(CellValue::Int(7)), false), "7");
        assert_eq!(
            formatter
                .format_cell(&raw(CellValue::String("a,b\"c".to_string())), false),
            "a,b\"c"
        );
        assert_eq!(formatter.format_cell(&raw(CellValue::Bool(true)), false), "TRUE");
        assert_eq!(formatter.format_cell(&raw(CellValue::Bool(false)), false), "FALSE");
        assert_eq!(
            formatter
                .format_cell(&raw(CellValue::Error("#N/A".to_string())), false),
            "#N/A"
        );
        assert_eq!(formatter.format_cell(&raw(CellValue::Empty), false), "");
    }

    #[test]
    fn test_serial_to_datetime_1900() {
        let date = |serial| serial_to_datetime(serial, false).unwrap().date();
        assert_eq!(date(1.0), NaiveDate::from_ymd_opt(1900, 1, 1).unwrap());
        assert_eq!(date(59.0), NaiveDate::from_ymd_opt(1900, 2, 28).unwrap());
        assert_eq!(date(61.0), NaiveDate::from_ymd_opt(1900, 3, 1).unwrap());
        assert_eq!(date(45658.0), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_serial_to_datetime_1904() {
        let datetime = serial_to_datetime(0.0, true).unwrap();
        assert_eq!(datetime.date(), NaiveDate::from_ymd_opt(1904, 1, 1).unwrap());
        let datetime = serial_to_datetime(1.5, true).unwrap();
        assert_eq!(
            datetime,
            NaiveDate::from_ymd_opt(1904, 1, 2)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_serial_to_datetime_negative() {
        assert!(serial_to_datetime(-1.0, false).is_none());
        assert!(serial_to_datetime(f64::NAN, false).is_none());
    }

    #[test]
    fn test_date_formatter_iso8601() {
        let formatter = default_formatter();
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(45658.0)), false),
            "2025-01-01"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(45658.75)), false),
            "2025-01-01 18:00:00"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(0.5)), false),
            "12:00:00"
        );
    }

    #[test]
    fn test_date_formatter_time_only_in_both_epochs() {
        let formatter = default_formatter();
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(0.5)), true),
            "12:00:00"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(0.75)), false),
            formatter.format_cell(&raw(CellValue::DateTime(0.75)), true)
        );
        // 1904年システムのシリアル値1以降は日付
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(1.0)), true),
            "1904-01-02"
        );
    }

    #[test]
    fn test_date_formatter_leap_bug_serial() {
        let formatter = default_formatter();
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(59.0)), false),
            "1900-02-28"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(60.0)), false),
            "1900-02-29"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(60.25)), false),
            "1900-02-29 06:00:00"
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(61.0)), false),
            "1900-03-01"
        );
        // 1904年システムには存在しない
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(60.0)), true),
            "1904-03-01"
        );

        let custom = CellFormatter::new(
            DateFormat::Custom("%Y/%m/%d".to_string()),
            FormulaMode::CachedValue,
        );
        assert_eq!(
            custom.format_cell(&raw(CellValue::DateTime(60.0)), false),
            "1900/02/28"
        );
    }

    #[test]
    fn test_date_formatter_custom() {
        let formatter = CellFormatter::new(
            DateFormat::Custom("%d/%m/%Y".to_string()),
            FormulaMode::CachedValue,
        );
        assert_eq!(
            formatter.format_cell(&raw(CellValue::DateTime(45658.0)), false),
            "01/01/2025"
        );
    }

    #[test]
    fn test_date_formatter_out_of_range_falls_back_to_number() {
        let formatter = default_formatter();
        assert_eq!(formatter.format_cell(&raw(CellValue::DateTime(-2.5)), false), "-2.5");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(1.5), "36:00:00");
        assert_eq!(format_duration(0.010416666666666666), "0:15:00");
        assert_eq!(format_duration(-0.5), "-12:00:00");
    }

    #[test]
    fn test_formula_mode() {
        let cell = RawCellData {
            coord: CellCoord::new(1, 0),
            value: CellValue::Number(100.0),
            formula: Some("SUM(A1:D1)".to_string()),
        };

        let cached = default_formatter();
        assert_eq!(cached.format_cell(&cell, false), "100");

        let formula = CellFormatter::new(DateFormat::Iso8601, FormulaMode::Formula);
        assert_eq!(formula.format_cell(&cell, false), "=SUM(A1:D1)");

        // 数式を持たないセルは値を出力
        assert_eq!(formula.format_cell(&raw(CellValue::Int(5)), false), "5");
    }
}
