//! Security Module
//!
//! セキュリティ対策を実装するモジュール。
//! ZIP bomb攻撃、パストラバーサル攻撃への対策と、シート名から安全な
//! ファイル名を生成する処理を提供します。

use std::io::{Read, Seek};
use zip::ZipArchive;

use crate::error::Xlsx2CsvError;

/// セキュリティ設定
///
/// ファイル処理時のセキュリティ制限を定義します。
#[derive(Debug, Clone)]
pub(crate) struct SecurityConfig {
    /// 展開後の最大サイズ（バイト）
    /// デフォルト: 1GB (1_073_741_824 bytes)
    pub max_decompressed_size: u64,
    /// ZIPアーカイブ内の最大ファイル数
    /// デフォルト: 10000
    pub max_file_count: usize,
    /// 単一ファイルの最大サイズ（バイト）
    /// デフォルト: 100MB (104_857_600 bytes)
    pub max_file_size: u64,
    /// 入力ファイルの最大サイズ（バイト）
    /// デフォルト: 2GB (2_147_483_648 bytes)
    pub max_input_file_size: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_decompressed_size: 1_073_741_824, // 1GB
            max_file_count: 10_000,
            max_file_size: 104_857_600,         // 100MB
            max_input_file_size: 2_147_483_648, // 2GB
        }
    }
}

impl SecurityConfig {
    /// 入力ファイルサイズの上限を検証
    pub fn check_input_size(&self, size: u64) -> Result<(), Xlsx2CsvError> {
        if size > self.max_input_file_size {
            return Err(Xlsx2CsvError::SecurityViolation(format!(
                "Input file size exceeds maximum: {} bytes (max: {} bytes)",
                size, self.max_input_file_size
            )));
        }
        Ok(())
    }

    /// ZIPアーカイブのエントリ数、エントリパス、展開後サイズを検証
    ///
    /// calamineに渡す前に呼び出し、ZIP bombやパストラバーサルを含む
    /// アーカイブを拒否します。
    pub fn check_archive<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
    ) -> Result<(), Xlsx2CsvError> {
        if archive.len() > self.max_file_count {
            return Err(Xlsx2CsvError::SecurityViolation(format!(
                "ZIP archive contains too many files: {} (max: {})",
                archive.len(),
                self.max_file_count
            )));
        }

        let mut total_decompressed_size = 0u64;
        for i in 0..archive.len() {
            let file = archive
                .by_index(i)
                .map_err(|e| Xlsx2CsvError::Zip(e.to_string()))?;

            let file_name = file.name();
            validate_zip_path(file_name).map_err(|e| {
                Xlsx2CsvError::SecurityViolation(format!("Invalid ZIP path: {}", e))
            })?;

            let file_size = file.size();
            if file_size > self.max_file_size {
                return Err(Xlsx2CsvError::SecurityViolation(format!(
                    "File '{}' exceeds maximum size: {} bytes (max: {} bytes)",
                    file_name, file_size, self.max_file_size
                )));
            }

            total_decompressed_size = total_decompressed_size
                .checked_add(file_size)
                .ok_or_else(|| {
                    Xlsx2CsvError::SecurityViolation(
                        "Total decompressed size calculation overflow".to_string(),
                    )
                })?;

            if total_decompressed_size > self.max_decompressed_size {
                return Err(Xlsx2CsvError::SecurityViolation(format!(
                    "Total decompressed size exceeds maximum: {} bytes (max: {} bytes)",
                    total_decompressed_size, self.max_decompressed_size
                )));
            }
        }

        Ok(())
    }
}

/// ZIPエントリのパス検証
///
/// # 戻り値
///
/// * `Ok(())` - パスが安全な場合
/// * `Err(String)` - パスが危険な場合（`..`や絶対パスを含む）
pub(crate) fn validate_zip_path(path: &str) -> Result<(), String> {
    if path.is_empty() {
        return Err("Empty path is not allowed".to_string());
    }

    if path.starts_with('/') || path.starts_with('\\') || has_drive_prefix(path) {
        return Err(format!("Absolute path is not allowed: {}", path));
    }

    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("Path traversal detected: {}", path));
    }

    Ok(())
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// シート名をファイル名の語幹として安全な文字列に変換
///
/// パス区切り文字やWindowsで使用できない文字、制御文字を`_`に置き換えます。
/// 空文字列やドットのみの名前（`.`、`..`）には先頭に`_`を付けます。
/// Windowsで無視される末尾の空白とドットも`_`に置き換えます。
pub(crate) fn sanitize_file_stem(name: &str) -> String {
    let mut stem: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.chars().all(|c| c == '.') {
        stem.insert(0, '_');
    }

    if stem.ends_with(' ') || stem.ends_with('.') {
        stem.pop();
        stem.push('_');
    }

    stem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_zip_path_valid() {
        assert!(validate_zip_path("xl/workbook.xml").is_ok());
        assert!(validate_zip_path("xl/worksheets/sheet1.xml").is_ok());
        assert!(validate_zip_path("[Content_Types].xml").is_ok());
        // ドットを含むが親ディレクトリ参照ではないパス
        assert!(validate_zip_path("xl/..hidden/file.xml").is_ok());
    }

    #[test]
    fn test_validate_zip_path_empty() {
        assert!(validate_zip_path("").is_err());
    }

    #[test]
    fn test_validate_zip_path_absolute() {
        assert!(validate_zip_path("/etc/passwd").is_err());
        assert!(validate_zip_path("\\xl\\workbook.xml").is_err());
        assert!(validate_zip_path("C:\\Windows\\system32").is_err());
        assert!(validate_zip_path("d:/xl/workbook.xml").is_err());
    }

    #[test]
    fn test_validate_zip_path_traversal() {
        assert!(validate_zip_path("../etc/passwd").is_err());
        assert!(validate_zip_path("xl/../../etc/passwd").is_err());
        assert!(validate_zip_path("xl\\..\\secret").is_err());
        assert!(validate_zip_path("..").is_err());
    }

    #[test]
    fn test_check_input_size() {
        let config = SecurityConfig {
            max_input_file_size: 10,
            ..Default::default()
        };
        assert!(config.check_input_size(10).is_ok());
        assert!(matches!(
            config.check_input_size(11),
            Err(Xlsx2CsvError::SecurityViolation(_))
        ));
    }

    #[test]
    fn test_sanitize_file_stem() {
        assert_eq!(sanitize_file_stem("Sheet1"), "Sheet1");
        assert_eq!(sanitize_file_stem("Q1 Sales"), "Q1 Sales");
        assert_eq!(sanitize_file_stem("売上"), "売上");
        assert_eq!(sanitize_file_stem("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_file_stem("x<y>z|\"w\""), "x_y_z__w_");
        assert_eq!(sanitize_file_stem("tab\there"), "tab_here");
    }

    #[test]
    fn test_sanitize_file_stem_dots_and_trailing() {
        assert_eq!(sanitize_file_stem(".."), "_._");
        assert_eq!(sanitize_file_stem(""), "_");
        assert_eq!(sanitize_file_stem("name."), "name_");
        assert_eq!(sanitize_file_stem("name "), "name_");
    }
}
