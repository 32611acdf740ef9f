//! Export Job Module
//!
//! 入力パス（ワークブックまたはディレクトリ）と出力ルートから、
//! 書き出し対象のワークブックと出力ディレクトリの対応を解決するモジュール。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::Xlsx2CsvError;

/// ワークブックの拡張子
pub const WORKBOOK_EXTENSION: &str = "xlsx";

/// 出力ルートのデフォルト名
pub const DEFAULT_EXPORT_ROOT: &str = "Exports";

/// Excelが開いているワークブックの横に作るロックファイルの接頭辞
const LOCK_FILE_PREFIX: &str = "~$";

/// ジョブの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// 単一のワークブック
    Single,
    /// ディレクトリ内のワークブック群
    Batch,
}

/// 1つのワークブックとその出力ディレクトリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookTarget {
    /// 入力ワークブックのパス
    pub source: PathBuf,
    /// CSVの出力先ディレクトリ
    ///
    /// ディレクトリ入力ではワークブック名（拡張子なし）のディレクトリ、
    /// 単一ファイル入力では出力ルートそのもの。
    pub export_dir: PathBuf,
}

/// 書き出しジョブ
///
/// # 出力先
///
/// - 単一ファイル: `<output_root>/<sheet>.csv`
/// - ディレクトリ: `<output_root>/<入力ディレクトリからの相対パス>/<stem>/<sheet>.csv`
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::{ExportJob, JobKind};
///
/// # fn main() -> Result<(), xlsxcsv::Xlsx2CsvError> {
/// let job = ExportJob::resolve("reports", "Exports")?;
/// assert_eq!(job.kind(), JobKind::Batch);
/// for target in job.targets() {
///     println!("{} -> {}", target.source.display(), target.export_dir.display());
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    input: PathBuf,
    output_root: PathBuf,
    kind: JobKind,
    targets: Vec<WorkbookTarget>,
}

impl ExportJob {
    /// 入力パスを解決してジョブを生成する
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExportJob)` - 1つ以上のワークブックが見つかった場合
    /// * `Err(Xlsx2CsvError::InvalidInput)` - 入力パスが存在しない、`.xlsx`ではない、
    ///   ワークブックを含まない、出力ルートと同じ、または出力ディレクトリが衝突する場合
    /// * `Err(Xlsx2CsvError::Io)` - ディレクトリの走査に失敗した場合
    pub fn resolve(
        input: impl AsRef<Path>,
        output_root: impl AsRef<Path>,
    ) -> Result<Self, Xlsx2CsvError> {
        let input = input.as_ref().to_path_buf();
        let output_root = output_root.as_ref().to_path_buf();

        if !input.exists() {
            return Err(Xlsx2CsvError::InvalidInput(format!(
                "'{}' does not exist",
                input.display()
            )));
        }

        if same_path(&input, &output_root) {
            return Err(Xlsx2CsvError::InvalidInput(
                "the input path must be different from the output path".to_string(),
            ));
        }

        if input.is_file() {
            if !is_workbook_path(&input) {
                return Err(Xlsx2CsvError::InvalidInput(format!(
                    "'{}' is not a valid workbook (expected a .{} file) or directory",
                    input.display(),
                    WORKBOOK_EXTENSION
                )));
            }
            info!(workbook = %input.display(), "found input workbook");
            // 単一ファイルは出力ルートの直下に書き出す
            return Ok(Self {
                targets: vec![WorkbookTarget {
                    source: input.clone(),
                    export_dir: output_root.clone(),
                }],
                input,
                output_root,
                kind: JobKind::Single,
            });
        }

        if !input.is_dir() {
            return Err(Xlsx2CsvError::InvalidInput(format!(
                "'{}' is not a valid workbook or directory",
                input.display()
            )));
        }

        info!(directory = %input.display(), "found input directory");
        let workbooks = discover_workbooks(&input, &output_root)?;
        if workbooks.is_empty() {
            return Err(Xlsx2CsvError::InvalidInput(format!(
                "no workbooks found in '{}'",
                input.display()
            )));
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(workbooks.len());
        for source in workbooks {
            let relative = source.strip_prefix(&input).map_err(|_| {
                Xlsx2CsvError::InvalidInput(format!(
                    "'{}' is not inside '{}'",
                    source.display(),
                    input.display()
                ))
            })?;
            let mut export_dir = output_root.clone();
            if let Some(parent) = relative.parent() {
                export_dir.push(parent);
            }
            export_dir.push(workbook_stem(&source)?);

            if !seen.insert(export_dir.clone()) {
                return Err(Xlsx2CsvError::InvalidInput(format!(
                    "more than one workbook maps to the export directory '{}'",
                    export_dir.display()
                )));
            }
            debug!(workbook = %source.display(), export_dir = %export_dir.display(), "discovered workbook");
            targets.push(WorkbookTarget { source, export_dir });
        }

        Ok(Self {
            input,
            output_root,
            kind: JobKind::Batch,
            targets,
        })
    }

    /// 入力パス
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// 出力ルート
    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// ジョブの種類
    pub fn kind(&self) -> JobKind {
        self.kind
    }

    /// 書き出し対象（パス順）
    pub fn targets(&self) -> &[WorkbookTarget] {
        &self.targets
    }
}

/// `.xlsx`拡張子を持ち、ロックファイルではないパスかどうか
pub fn is_workbook_path(path: &Path) -> bool {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case(WORKBOOK_EXTENSION))
        .unwrap_or(false);
    let is_lock_file = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with(LOCK_FILE_PREFIX))
        .unwrap_or(false);
    has_extension && !is_lock_file
}

/// ディレクトリを再帰的に走査してワークブックを収集する
///
/// 出力ルートが入力ディレクトリの内側にある場合、その配下は走査しません。
fn discover_workbooks(root: &Path, output_root: &Path) -> Result<Vec<PathBuf>, Xlsx2CsvError> {
    let excluded = fs::canonicalize(output_root).ok();

    let mut workbooks = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| match (&excluded, fs::canonicalize(e.path())) {
            (Some(excluded), Ok(path)) => !path.starts_with(excluded),
            _ => true,
        })
    {
        let entry = entry.map_err(|e| {
            Xlsx2CsvError::Io(std::io::Error::other(format!(
                "Failed to read directory entry: {e}"
            )))
        })?;
        if entry.file_type().is_file() && is_workbook_path(entry.path()) {
            workbooks.push(entry.into_path());
        }
    }

    Ok(workbooks)
}

fn workbook_stem(path: &Path) -> Result<&std::ffi::OsStr, Xlsx2CsvError> {
    path.file_stem().ok_or_else(|| {
        Xlsx2CsvError::InvalidInput(format!("'{}' has no file name", path.display()))
    })
}

fn same_path(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
