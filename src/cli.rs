//! CLI Module
//!
//! `xlsxcsv`コマンドの引数定義、ログ設定、上書き確認プロンプト、実行処理。

use std::ffi::OsString;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::{DateFormat, FormulaMode, OverwritePolicy, SheetSelector};
use crate::builder::ExporterBuilder;
use crate::error::Xlsx2CsvError;
use crate::job::{ExportJob, DEFAULT_EXPORT_ROOT};
use crate::report::ExportReport;

const OVERWRITE_PROMPT: &str = "Would you like to overwrite? (y/[n]): ";

/// 1文字のダッシュで書かれた旧形式のフラグと、その正式な名前
const LEGACY_FLAGS: &[(&str, &str)] = &[
    ("-input_path", "--input_path"),
    ("-path", "--input_path"),
    ("-output_path", "--output_path"),
];

#[derive(Debug, Parser)]
#[command(name = "xlsxcsv")]
#[command(about = "Export every worksheet of Excel workbooks to its own CSV file")]
#[command(long_about = "Export every worksheet of Excel workbooks to its own CSV file.

The input may be a single .xlsx workbook or a directory. A single workbook
is written directly into the export root. Directories are searched
recursively and the directory structure is mirrored under the export root:

  <output_path>/<sheet name>.csv                                 (file)
  <output_path>/<relative dirs>/<workbook name>/<sheet name>.csv (directory)

EXAMPLES:
  xlsxcsv --input_path Budget.xlsx
  xlsxcsv --input_path reports --output_path out --on-existing skip
  xlsxcsv -path Budget.xlsx --sheet Summary --json")]
#[command(version)]
pub struct Cli {
    /// Workbook (.xlsx) or directory of workbooks to export
    #[arg(long = "input_path", visible_alias = "input-path", value_name = "PATH")]
    pub input_path: PathBuf,

    /// Root directory that receives the exported CSV files
    #[arg(
        long = "output_path",
        visible_alias = "output-path",
        value_name = "PATH",
        default_value = DEFAULT_EXPORT_ROOT
    )]
    pub output_path: PathBuf,

    /// Export only the named sheet (repeatable)
    #[arg(long = "sheet", value_name = "NAME")]
    pub sheets: Vec<String>,

    /// CSV field delimiter
    #[arg(long, default_value_t = ',')]
    pub delimiter: char,

    /// What to do when a CSV file already exists: overwrite, skip, error or ask
    #[arg(long, value_name = "POLICY", default_value = "overwrite")]
    pub on_existing: OverwritePolicy,

    /// Drop rows and columns that contain no data
    #[arg(long)]
    pub trim_empty: bool,

    /// Write formula text (=SUM(A1:A3)) instead of cached values
    #[arg(long)]
    pub formulas: bool,

    /// Include hidden and very hidden sheets
    #[arg(long)]
    pub include_hidden: bool,

    /// chrono format string for date cells (default: ISO 8601)
    #[arg(long, value_name = "FMT")]
    pub date_format: Option<String>,

    /// Print the export report as JSON to stdout
    #[arg(long)]
    pub json: bool,

    /// Show debug logs
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only show warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// 旧形式のフラグ（`-path`など）を正式な名前に置き換える
///
/// `-path=foo`のような`=`付きの形式にも対応します。それ以外の引数はそのまま返します。
pub fn normalize_legacy_args<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(|arg| {
            let arg = arg.into();
            let Some(text) = arg.to_str() else {
                return arg;
            };
            for (legacy, canonical) in LEGACY_FLAGS {
                if text == *legacy {
                    return OsString::from(*canonical);
                }
                if let Some(value) = text
                    .strip_prefix(legacy)
                    .and_then(|rest| rest.strip_prefix('='))
                {
                    return OsString::from(format!("{}={}", canonical, value));
                }
            }
            arg
        })
        .collect()
}

/// ログ出力を初期化する（標準エラー出力）
///
/// `RUST_LOG`が設定されていればそれを優先します。
pub fn init_logging(verbose: bool, quiet: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("xlsxcsv={}", default_level).into());

    // テストなどで既に初期化済みの場合は無視する
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// 既存ファイルを上書きするかを対話的に確認する
///
/// `y`または`n`が入力されるまで繰り返します。空行は`n`として扱い、
/// 入力が終了した場合も上書きしません。
pub fn prompt_overwrite<R: BufRead, W: Write>(path: &Path, input: &mut R, output: &mut W) -> bool {
    if writeln!(output, "Found \"{}\".", path.display()).is_err() {
        return false;
    }

    loop {
        if write!(output, "{}", OVERWRITE_PROMPT)
            .and_then(|_| output.flush())
            .is_err()
        {
            return false;
        }

        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "y" => return true,
            "n" | "" => return false,
            _ => {
                if writeln!(output, "Please enter either \"y\" or \"n\"").is_err() {
                    return false;
                }
            }
        }
    }
}

impl Cli {
    /// 引数から`ExporterBuilder`を組み立てる
    pub fn exporter_builder(&self) -> ExporterBuilder {
        let mut builder = ExporterBuilder::new()
            .with_delimiter(self.delimiter)
            .with_overwrite_policy(self.on_existing)
            .trim_empty(self.trim_empty)
            .include_hidden(self.include_hidden);

        if !self.sheets.is_empty() {
            builder = builder.with_sheet_selector(SheetSelector::Names(self.sheets.clone()));
        }
        if self.formulas {
            builder = builder.with_formula_mode(FormulaMode::Formula);
        }
        if let Some(ref format) = self.date_format {
            builder = builder.with_date_format(DateFormat::Custom(format.clone()));
        }
        builder
    }
}

/// コマンドを実行する
///
/// # 戻り値
///
/// * `Ok(ExportReport)` - ジョブを実行した場合（ワークブック単位の失敗を含む）
/// * `Err(Xlsx2CsvError)` - 引数や入力パスが不正で、何も書き出さなかった場合
pub fn run(cli: &Cli) -> Result<ExportReport, Xlsx2CsvError> {
    let exporter = cli.exporter_builder().build()?;
    let job = ExportJob::resolve(&cli.input_path, &cli.output_path)?;

    let report = if cli.on_existing == OverwritePolicy::Ask {
        let stdin = io::stdin();
        let mut stdin = stdin.lock();
        let mut stderr = io::stderr();
        exporter.export_with(&job, |path| prompt_overwrite(path, &mut stdin, &mut stderr))?
    } else {
        exporter.export(&job)?
    };

    if cli.json {
        let json = report
            .to_json()
            .map_err(|e| Xlsx2CsvError::Config(format!("Failed to serialize report: {}", e)))?;
        println!("{}", json);
    }

    if report.is_success() {
        info!(output = %report.output_root.display(), "successfully converted all workbooks");
    } else {
        warn!(failed = report.failures.len(), "some workbooks could not be converted");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(normalize_legacy_args(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_normalize_legacy_args() {
        let args = normalize_legacy_args(["xlsxcsv", "-path", "a.xlsx", "-output_path=out", "-v"]);
        assert_eq!(
            args,
            vec![
                OsString::from("xlsxcsv"),
                OsString::from("--input_path"),
                OsString::from("a.xlsx"),
                OsString::from("--output_path=out"),
                OsString::from("-v"),
            ]
        );
    }

    #[test]
    fn test_parse_defaults() {
        let cli = parse(&["xlsxcsv", "--input_path", "book.xlsx"]);
        assert_eq!(cli.input_path, PathBuf::from("book.xlsx"));
        assert_eq!(cli.output_path, PathBuf::from(DEFAULT_EXPORT_ROOT));
        assert_eq!(cli.delimiter, ',');
        assert_eq!(cli.on_existing, OverwritePolicy::Overwrite);
        assert!(cli.sheets.is_empty());
        assert!(!cli.json);
    }

    #[test]
    fn test_parse_legacy_and_options() {
        let cli = parse(&[
            "xlsxcsv",
            "-input_path",
            "in",
            "--output-path",
            "out",
            "--sheet",
            "A",
            "--sheet",
            "B",
            "--on-existing",
            "skip",
            "--delimiter",
            ";",
        ]);
        assert_eq!(cli.input_path, PathBuf::from("in"));
        assert_eq!(cli.output_path, PathBuf::from("out"));
        assert_eq!(cli.sheets, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(cli.on_existing, OverwritePolicy::Skip);
        assert_eq!(cli.delimiter, ';');
    }

    #[test]
    fn test_parse_requires_input() {
        assert!(Cli::try_parse_from(["xlsxcsv"]).is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["xlsxcsv", "--input_path", "a.xlsx", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_prompt_overwrite() {
        let path = Path::new("Exports/book/Sheet1.csv");

        let mut output = Vec::new();
        assert!(prompt_overwrite(path, &mut Cursor::new("y\n"), &mut output));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Found \"Exports/book/Sheet1.csv\"."));
        assert!(text.contains(OVERWRITE_PROMPT));

        let mut output = Vec::new();
        assert!(!prompt_overwrite(path, &mut Cursor::new("N\n"), &mut output));

        // 空行はデフォルトの「n」
        let mut output = Vec::new();
        assert!(!prompt_overwrite(path, &mut Cursor::new("\n"), &mut output));

        // 不正な入力は再入力を促す
        let mut output = Vec::new();
        assert!(prompt_overwrite(path, &mut Cursor::new("maybe\ny\n"), &mut output));
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Please enter either"));

        // 入力が終了したら上書きしない
        let mut output = Vec::new();
        assert!(!prompt_overwrite(path, &mut Cursor::new(""), &mut output));
    }

    #[test]
    fn test_run_rejects_missing_input() {
        let temp = tempfile::TempDir::new().unwrap();
        let cli = parse(&[
            "xlsxcsv",
            "--input_path",
            temp.path().join("missing.xlsx").to_str().unwrap(),
            "--output_path",
            temp.path().join("out").to_str().unwrap(),
        ]);

        let result = run(&cli);
        assert!(matches!(result, Err(Xlsx2CsvError::InvalidInput(_))));
        assert!(!temp.path().join("out").exists());
    }
}
