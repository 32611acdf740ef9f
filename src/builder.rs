//! Builder Module
//!
//! Fluent Builder APIを提供し、`Exporter`インスタンスを段階的に構築する。

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::format::{Item, StrftimeItems};
use tracing::{debug, info, warn};

use crate::api::{DateFormat, FormulaMode, OverwritePolicy, SheetSelector};
use crate::error::Xlsx2CsvError;
use crate::formatter::CellFormatter;
use crate::grid::LogicalGrid;
use crate::job::{ExportJob, WorkbookTarget};
use crate::output::CsvSink;
use crate::parser::WorkbookParser;
use crate::report::{ExportReport, SheetReport, SheetStatus, WorkbookFailure, WorkbookReport};
use crate::security::sanitize_file_stem;

/// 書き出し処理の設定を保持する内部構造体
#[derive(Debug, Clone)]
pub(crate) struct ExportConfig {
    /// シート選択方式
    pub sheet_selector: SheetSelector,

    /// 日付形式
    pub date_format: DateFormat,

    /// 数式出力モード
    pub formula_mode: FormulaMode,

    /// 非表示シートを含めるか
    pub include_hidden: bool,

    /// 空の行・列を取り除くか
    pub trim_empty: bool,

    /// CSVの区切り文字
    pub delimiter: char,

    /// 既存ファイルの扱い
    pub overwrite_policy: OverwritePolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            sheet_selector: SheetSelector::All,
            date_format: DateFormat::Iso8601,
            formula_mode: FormulaMode::CachedValue,
            include_hidden: false,
            trim_empty: false,
            delimiter: ',',
            overwrite_policy: OverwritePolicy::Overwrite,
        }
    }
}

/// Fluent Builder APIを提供する構造体
///
/// すべての設定項目にデフォルト値が設定されており、必要な設定のみをオーバーライドできます。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::{ExporterBuilder, OverwritePolicy, SheetSelector};
///
/// # fn main() -> Result<(), xlsxcsv::Xlsx2CsvError> {
/// let exporter = ExporterBuilder::new()
///     .with_sheet_selector(SheetSelector::Name("Summary".to_string()))
///     .with_overwrite_policy(OverwritePolicy::Skip)
///     .with_delimiter(';')
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ExporterBuilder {
    config: ExportConfig,
}

impl Default for ExporterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExporterBuilder {
    /// デフォルト設定を持つビルダーインスタンスを生成する
    ///
    /// # デフォルト設定
    ///
    /// - シート選択: すべてのシート（非表示シートを除く）
    /// - 日付形式: ISO 8601
    /// - 数式モード: キャッシュ値を出力
    /// - 空の行・列: そのまま残す
    /// - 区切り文字: `,`
    /// - 既存ファイル: 上書き
    pub fn new() -> Self {
        Self {
            config: ExportConfig::default(),
        }
    }

    /// 書き出し対象のシートを選択する
    pub fn with_sheet_selector(mut self, selector: SheetSelector) -> Self {
        self.config.sheet_selector = selector;
        self
    }

    /// 日付の出力形式を指定する
    pub fn with_date_format(mut self, format: DateFormat) -> Self {
        self.config.date_format = format;
        self
    }

    /// 数式セルの出力モードを指定する
    pub fn with_formula_mode(mut self, mode: FormulaMode) -> Self {
        self.config.formula_mode = mode;
        self
    }

    /// 非表示シートを出力に含めるかを指定する
    ///
    /// `SheetSelector::All`の場合にのみ影響します。
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.config.include_hidden = include;
        self
    }

    /// 空の行と列を取り除くかを指定する
    ///
    /// `true`の場合、セルの位置はシート上の位置と一致しなくなります。
    pub fn trim_empty(mut self, trim: bool) -> Self {
        self.config.trim_empty = trim;
        self
    }

    /// CSVの区切り文字を指定する（ASCII文字のみ）
    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.config.delimiter = delimiter;
        self
    }

    /// 出力先のCSVが既に存在する場合の扱いを指定する
    pub fn with_overwrite_policy(mut self, policy: OverwritePolicy) -> Self {
        self.config.overwrite_policy = policy;
        self
    }

    /// 設定を検証し、`Exporter`インスタンスを生成する
    ///
    /// # 発生し得るエラー
    ///
    /// * `Xlsx2CsvError::Config(String)`: 設定の検証に失敗した場合
    ///   * 区切り文字がASCII以外、またはダブルクォート・改行
    ///   * カスタム日付形式が空、または不正な書式文字列
    ///   * シート名・インデックスのリストが空
    pub fn build(self) -> Result<Exporter, Xlsx2CsvError> {
        // 1. 区切り文字の検証
        let delimiter = self.config.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(Xlsx2CsvError::Config(format!(
                "Invalid delimiter: {:?} (must be a single ASCII character other than a quote or line break)",
                delimiter
            )));
        }

        // 2. カスタム日付形式の検証
        if let DateFormat::Custom(ref format_str) = self.config.date_format {
            let invalid = format_str.is_empty()
                || StrftimeItems::new(format_str).any(|item| matches!(item, Item::Error));
            if invalid {
                return Err(Xlsx2CsvError::Config(format!(
                    "Invalid date format string: '{}'",
                    format_str
                )));
            }
        }

        // 3. シート選択の検証
        let empty_selection = match &self.config.sheet_selector {
            SheetSelector::Indices(indices) => indices.is_empty(),
            SheetSelector::Names(names) => names.is_empty(),
            _ => false,
        };
        if empty_selection {
            return Err(Xlsx2CsvError::Config(
                "Sheet selection must not be empty".to_string(),
            ));
        }

        Ok(Exporter::new(self.config))
    }
}

/// 書き出し処理のファサード
///
/// `ExportJob`のワークブックを順に開き、各シートをCSVファイルとして書き出します。
///
/// # 使用例
///
/// ```rust,no_run
/// use xlsxcsv::{ExportJob, ExporterBuilder};
///
/// # fn main() -> Result<(), xlsxcsv::Xlsx2CsvError> {
/// let exporter = ExporterBuilder::new().build()?;
/// let job = ExportJob::resolve("book.xlsx", "Exports")?;
/// let report = exporter.export(&job)?;
/// println!("{} CSV files written", report.written_count());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Exporter {
    config: ExportConfig,
    formatter: CellFormatter,
    sink: CsvSink,
}

impl Exporter {
    pub(crate) fn new(config: ExportConfig) -> Self {
        Self {
            formatter: CellFormatter::new(config.date_format.clone(), config.formula_mode),
            // build()でASCIIであることを検証済み
            sink: CsvSink::new(config.delimiter as u8),
            config,
        }
    }

    /// ジョブを実行する
    ///
    /// `OverwritePolicy::Ask`の既存ファイルは上書きしません。
    /// 確認が必要な場合は`export_with()`を使用してください。
    pub fn export(&self, job: &ExportJob) -> Result<ExportReport, Xlsx2CsvError> {
        self.export_with(job, |_| false)
    }

    /// 上書き確認コールバックを指定してジョブを実行する
    ///
    /// ワークブック単位のエラー（破損ファイル、書き込み失敗など）は
    /// `ExportReport::failures`に記録し、残りのワークブックの処理を続けます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(ExportReport)` - すべてのワークブックを処理した場合（失敗を含む）
    /// * `Err(Xlsx2CsvError::Io)` - 出力ルートを作成できなかった場合
    pub fn export_with<F>(&self, job: &ExportJob, mut confirm: F) -> Result<ExportReport, Xlsx2CsvError>
    where
        F: FnMut(&Path) -> bool,
    {
        fs::create_dir_all(job.output_root())?;

        let mut workbooks = Vec::new();
        let mut failures = Vec::new();

        for target in job.targets() {
            info!(workbook = %target.source.display(), "converting workbook");
            match self.export_target(target, &mut confirm) {
                Ok(report) => workbooks.push(report),
                Err(e) => {
                    warn!(workbook = %target.source.display(), error = %e, "failed to convert workbook");
                    failures.push(WorkbookFailure {
                        source: target.source.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = ExportReport {
            input: job.input().to_path_buf(),
            output_root: job.output_root().to_path_buf(),
            kind: job.kind(),
            workbooks,
            failures,
        };

        info!(
            written = report.written_count(),
            skipped = report.skipped_count(),
            failed = report.failures.len(),
            "finished converting workbooks"
        );

        Ok(report)
    }

    /// 1つのワークブックを指定したディレクトリに書き出す
    ///
    /// `export_dir`は存在しなければ作成されます。
    pub fn export_workbook(
        &self,
        source: &Path,
        export_dir: &Path,
    ) -> Result<WorkbookReport, Xlsx2CsvError> {
        let target = WorkbookTarget {
            source: source.to_path_buf(),
            export_dir: export_dir.to_path_buf(),
        };
        self.export_target(&target, &mut |_: &Path| false)
    }

    /// ワークブックを読み込み、選択されたシートをCSV文字列に変換する
    ///
    /// ファイルを書き出さずに内容を確認したい場合に使用します。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<(String, String)>)` - シート名とCSV文字列のペア（シート順）
    ///
    /// # 使用例
    ///
    /// ```rust,no_run
    /// use std::fs::File;
    /// use xlsxcsv::ExporterBuilder;
    ///
    /// # fn main() -> Result<(), xlsxcsv::Xlsx2CsvError> {
    /// let exporter = ExporterBuilder::new().build()?;
    /// for (sheet, csv) in exporter.convert_to_strings(File::open("book.xlsx")?)? {
    ///     println!("## {}\n{}", sheet, csv);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_to_strings<R: Read>(
        &self,
        input: R,
    ) -> Result<Vec<(String, String)>, Xlsx2CsvError> {
        let mut parser = WorkbookParser::from_reader(input)?;
        let sheet_names =
            parser.select_sheets(&self.config.sheet_selector, self.config.include_hidden)?;

        let mut outputs = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let grid = self.build_grid(&mut parser, &sheet_name)?;
            let mut buffer = Vec::new();
            self.sink.write_grid(&grid, &mut buffer)?;
            let csv = String::from_utf8(buffer).map_err(|e| Xlsx2CsvError::Utf8(e.utf8_error()))?;
            outputs.push((sheet_name, csv));
        }

        Ok(outputs)
    }

    fn export_target(
        &self,
        target: &WorkbookTarget,
        confirm: &mut dyn FnMut(&Path) -> bool,
    ) -> Result<WorkbookReport, Xlsx2CsvError> {
        let mut parser = WorkbookParser::open(&target.source)?;
        let sheet_names =
            parser.select_sheets(&self.config.sheet_selector, self.config.include_hidden)?;
        let csv_paths = plan_csv_paths(&target.export_dir, &sheet_names);

        // 1ファイルも書き出す前に衝突を検出する
        if self.config.overwrite_policy == OverwritePolicy::Error {
            if let Some(existing) = csv_paths.iter().find(|path| path.exists()) {
                return Err(Xlsx2CsvError::AlreadyExists(existing.clone()));
            }
        }

        fs::create_dir_all(&target.export_dir)?;

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for (sheet_name, path) in sheet_names.into_iter().zip(csv_paths) {
            if path.exists() && !self.should_overwrite(&path, confirm)? {
                warn!(sheet = %sheet_name, path = %path.display(), "no data was written for worksheet");
                sheets.push(SheetReport {
                    sheet: sheet_name,
                    path,
                    rows: 0,
                    columns: 0,
                    status: SheetStatus::Skipped,
                });
                continue;
            }

            let grid = self.build_grid(&mut parser, &sheet_name)?;
            self.sink.write_grid_to_path(&grid, &path)?;
            info!(
                sheet = %sheet_name,
                path = %path.display(),
                rows = grid.get_rows(),
                "saved converted data"
            );

            sheets.push(SheetReport {
                sheet: sheet_name,
                path,
                rows: grid.get_rows(),
                columns: grid.get_cols(),
                status: SheetStatus::Written,
            });
        }

        Ok(WorkbookReport {
            source: target.source.clone(),
            export_dir: target.export_dir.clone(),
            sheets,
        })
    }

    fn should_overwrite(
        &self,
        path: &Path,
        confirm: &mut dyn FnMut(&Path) -> bool,
    ) -> Result<bool, Xlsx2CsvError> {
        match self.config.overwrite_policy {
            OverwritePolicy::Overwrite => Ok(true),
            OverwritePolicy::Skip => Ok(false),
            OverwritePolicy::Error => Err(Xlsx2CsvError::AlreadyExists(path.to_path_buf())),
            OverwritePolicy::Ask => Ok(confirm(path)),
        }
    }

    fn build_grid(
        &self,
        parser: &mut WorkbookParser,
        sheet_name: &str,
    ) -> Result<LogicalGrid, Xlsx2CsvError> {
        let sheet = parser.parse_sheet(sheet_name, self.config.formula_mode)?;
        debug!(
            sheet = %sheet.metadata.name,
            index = sheet.metadata.index,
            hidden = sheet.metadata.hidden,
            "formatting worksheet"
        );

        let formatted = sheet
            .cells
            .iter()
            .map(|cell| (cell.coord, self.formatter.format_cell(cell, sheet.metadata.is_1904)))
            .collect();

        let mut grid = LogicalGrid::build(formatted);
        if self.config.trim_empty {
            grid.trim_empty();
        }
        if grid.is_empty() {
            debug!(sheet = sheet_name, "worksheet has no data");
        }
        Ok(grid)
    }
}

/// シートごとのCSVパスを決める
///
/// ファイル名に使えない文字を置き換えた結果が重複する場合（大文字小文字の違いを含む）、
/// 後のシートに` (2)`、` (3)`…を付けます。
fn plan_csv_paths(export_dir: &Path, sheet_names: &[String]) -> Vec<PathBuf> {
    let mut used = HashSet::new();
    sheet_names
        .iter()
        .map(|name| {
            let base = sanitize_file_stem(name);
            let mut stem = base.clone();
            let mut counter = 2;
            while !used.insert(stem.to_lowercase()) {
                stem = format!("{} ({})", base, counter);
                counter += 1;
            }
            export_dir.join(format!("{}.csv", stem))
        })
        .collect()
}
