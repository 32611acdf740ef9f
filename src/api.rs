//! Public API Types
//!
//! 公開APIで使用する列挙型を定義するモジュール。

/// 日付の出力形式
///
/// Excelの日付セルをCSVに書き出す際の出力形式を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DateFormat {
    /// ISO 8601形式
    ///
    /// 時刻成分がない場合は `2025-11-20`、ある場合は `2025-11-20 13:45:00`。
    Iso8601,

    /// カスタム形式（chrono互換フォーマット文字列）
    ///
    /// # フォーマット指定子（主要なもの）
    ///
    /// - `%Y`: 4桁の年（例: 2025）
    /// - `%m`: 2桁の月（01-12）
    /// - `%d`: 2桁の日（01-31）
    /// - `%H`: 24時間形式の時（00-23）
    /// - `%M`: 分（00-59）
    /// - `%S`: 秒（00-59）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use xlsxcsv::{DateFormat, ExporterBuilder};
    ///
    /// # fn main() -> Result<(), xlsxcsv::Xlsx2CsvError> {
    /// let exporter = ExporterBuilder::new()
    ///     .with_date_format(DateFormat::Custom("%d/%m/%Y".to_string()))
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    Custom(String),
}

/// 数式セルの出力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormulaMode {
    /// キャッシュされた結果値を出力（デフォルト）
    ///
    /// 例: `=SUM(A1:A10)` → `100`
    CachedValue,

    /// 数式文字列を出力
    ///
    /// 例: `=SUM(A1:A10)` → `=SUM(A1:A10)`
    Formula,
}

/// シート選択方式
///
/// 書き出し対象のシートを選択する方法を指定します。
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SheetSelector {
    /// すべてのシートを書き出す（デフォルト）
    All,

    /// インデックス指定（0始まり）
    Index(usize),

    /// シート名指定
    Name(String),

    /// 複数のインデックス指定
    Indices(Vec<usize>),

    /// 複数のシート名指定
    Names(Vec<String>),
}

/// 出力先のCSVが既に存在する場合の扱い
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OverwritePolicy {
    /// 既存ファイルを上書きする（デフォルト）
    Overwrite,

    /// 既存ファイルを残し、そのシートの書き出しをスキップする
    Skip,

    /// `Xlsx2CsvError::AlreadyExists`でワークブックの処理を失敗させる
    Error,

    /// 呼び出し側の確認コールバックに判断を委ねる
    ///
    /// `Exporter::export_with()`に渡したコールバックが`true`を返した場合のみ上書きします。
    /// `Exporter::export()`ではコールバックがないため、`Skip`と同じ扱いになります。
    Ask,
}

impl std::str::FromStr for OverwritePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "overwrite" => Ok(OverwritePolicy::Overwrite),
            "skip" => Ok(OverwritePolicy::Skip),
            "error" => Ok(OverwritePolicy::Error),
            "ask" => Ok(OverwritePolicy::Ask),
            other => Err(format!(
                "unknown policy '{}' (expected overwrite, skip, error or ask)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_policy_from_str() {
        assert_eq!("overwrite".parse(), Ok(OverwritePolicy::Overwrite));
        assert_eq!("SKIP".parse(), Ok(OverwritePolicy::Skip));
        assert_eq!("error".parse(), Ok(OverwritePolicy::Error));
        assert_eq!("Ask".parse(), Ok(OverwritePolicy::Ask));
        assert!("replace".parse::<OverwritePolicy>().is_err());
    }
}
