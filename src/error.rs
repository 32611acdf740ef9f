//! Error Types Module
//!
//! クレート全体で使用する構造化エラー型を定義するモジュール。
//! `thiserror`を使用して、エラーの自動変換とメッセージフォーマットを実現する。

use std::path::PathBuf;
use thiserror::Error;

/// xlsxcsvクレート全体で使用するエラー型
///
/// 入力パスの解決、ワークブックの読み込み、CSVの書き出し中に発生する
/// すべてのエラーを統一的に扱うために使用されます。
///
/// # エラーの種類
///
/// - `Io`: I/O操作中に発生したエラー（ファイル読み込み・書き込み失敗など）
/// - `Parse`: ワークブックの解析中に発生したエラー（calamine由来）
/// - `Csv`: CSVの書き出し中に発生したエラー（csv由来）
/// - `InvalidInput`: 入力パスが存在しない、拡張子が違う、ワークブックがない
/// - `Config`: 設定の検証に失敗したエラー
/// - `AlreadyExists`: 出力先のCSVが既に存在し、上書きが許可されていない
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::{ExportJob, Xlsx2CsvError};
///
/// match ExportJob::resolve("missing.xlsx", "Exports") {
///     Err(Xlsx2CsvError::InvalidInput(msg)) => eprintln!("{}", msg),
///     _ => {}
/// }
/// ```
#[derive(Error, Debug)]
pub enum Xlsx2CsvError {
    /// I/O操作中に発生したエラー
    ///
    /// `#[from]`属性により、`std::io::Error`から自動的に変換されます。
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// ワークブックの解析中に発生したエラー
    ///
    /// ファイル形式が不正、破損したファイル、パスワード保護などが原因となります。
    #[error("Failed to parse Excel file: {0}")]
    Parse(#[from] calamine::Error),

    /// CSVの書き出し中に発生したエラー
    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    /// UTF-8文字列の変換エラー
    ///
    /// XML解析時にUTF-8文字列への変換に失敗した場合に発生します。
    #[error("UTF-8 conversion error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// ZIPアーカイブの解析エラー
    ///
    /// XLSXファイル（ZIPアーカイブ）の解析中に発生したエラーです。
    #[error("ZIP archive error: {0}")]
    Zip(String),

    /// `xl/workbook.xml`の解析エラー
    #[error("XML parse error: {0}")]
    Xml(String),

    /// 入力パスが不正
    ///
    /// 存在しないパス、`.xlsx`以外のファイル、ワークブックを含まない
    /// ディレクトリ、出力先と同じパスなどが指定された場合に発生します。
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 設定の検証に失敗したエラー
    ///
    /// `ExporterBuilder::build()`時、またはシート選択の解決時に発生します。
    ///
    /// # 例
    ///
    /// ```rust,no_run
    /// use xlsxcsv::{ExporterBuilder, Xlsx2CsvError};
    ///
    /// let result = ExporterBuilder::new().with_delimiter('→').build();
    ///
    /// if let Err(Xlsx2CsvError::Config(msg)) = result {
    ///     println!("設定エラー: {}", msg);
    /// }
    /// ```
    #[error("Configuration error: {0}")]
    Config(String),

    /// 出力先ファイルが既に存在する（`OverwritePolicy::Error`の場合）
    #[error("Output file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// セキュリティ制限に違反したエラー
    ///
    /// ZIP bomb攻撃、パストラバーサル攻撃、ファイルサイズ制限などの
    /// セキュリティ制限に違反した場合に発生します。
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}
