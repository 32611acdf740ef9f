//! Export Report Module
//!
//! 書き出し結果（書き出したCSV、スキップしたシート、失敗したワークブック）を表す型。

use std::path::PathBuf;

use serde::Serialize;

use crate::job::JobKind;

/// シートの書き出し結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SheetStatus {
    /// CSVを書き出した
    Written,
    /// 既存ファイルがあり、上書きしなかった
    Skipped,
}

/// 1シート分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetReport {
    /// シート名
    pub sheet: String,
    /// CSVファイルのパス
    pub path: PathBuf,
    /// 書き出した行数（スキップ時は0）
    pub rows: usize,
    /// 書き出した列数（スキップ時は0）
    pub columns: usize,
    pub status: SheetStatus,
}

/// 1ワークブック分の結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookReport {
    pub source: PathBuf,
    pub export_dir: PathBuf,
    pub sheets: Vec<SheetReport>,
}

/// 書き出しに失敗したワークブック
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookFailure {
    pub source: PathBuf,
    /// エラーメッセージ
    pub error: String,
}

/// ジョブ全体の結果
///
/// `--json`指定時はこの構造体がそのままJSONとして出力されます。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub input: PathBuf,
    pub output_root: PathBuf,
    pub kind: JobKind,
    pub workbooks: Vec<WorkbookReport>,
    pub failures: Vec<WorkbookFailure>,
}

impl ExportReport {
    /// 失敗したワークブックがなければ`true`
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// 書き出したCSVの数
    pub fn written_count(&self) -> usize {
        self.count(SheetStatus::Written)
    }

    /// スキップしたシートの数
    pub fn skipped_count(&self) -> usize {
        self.count(SheetStatus::Skipped)
    }

    fn count(&self, status: SheetStatus) -> usize {
        self.workbooks
            .iter()
            .flat_map(|workbook| &workbook.sheets)
            .filter(|sheet| sheet.status == status)
            .count()
    }

    /// JSON文字列に変換
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str, status: SheetStatus) -> SheetReport {
        SheetReport {
            sheet: name.to_string(),
            path: PathBuf::from(format!("Exports/book/{}.csv", name)),
            rows: 2,
            columns: 3,
            status,
        }
    }

    fn report() -> ExportReport {
        ExportReport {
            input: PathBuf::from("book.xlsx"),
            output_root: PathBuf::from("Exports"),
            kind: JobKind::Single,
            workbooks: vec![WorkbookReport {
                source: PathBuf::from("book.xlsx"),
                export_dir: PathBuf::from("Exports/book"),
                sheets: vec![
                    sheet("Sheet1", SheetStatus::Written),
                    sheet("Sheet2", SheetStatus::Skipped),
                    sheet("Sheet3", SheetStatus::Written),
                ],
            }],
            failures: Vec::new(),
        }
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert!(report.is_success());
        assert_eq!(report.written_count(), 2);
        assert_eq!(report.skipped_count(), 1);
    }

    #[test]
    fn test_failure_marks_unsuccessful() {
        let mut report = report();
        report.failures.push(WorkbookFailure {
            source: PathBuf::from("broken.xlsx"),
            error: "ZIP archive error: invalid Zip archive".to_string(),
        });
        assert!(!report.is_success());
    }

    #[test]
    fn test_to_json() {
        let json = report().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["kind"], "single");
        assert_eq!(value["workbooks"][0]["sheets"][0]["sheet"], "Sheet1");
        assert_eq!(value["workbooks"][0]["sheets"][1]["status"], "skipped");
        assert_eq!(value["failures"].as_array().unwrap().len(), 0);
    }
}
