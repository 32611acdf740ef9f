//! Workbook Parser Module
//!
//! calamineを使用したワークブックの読み込みとシート単位のセル抽出。

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::Path;

use calamine::{Reader, Xlsx};
use tracing::debug;
use zip::ZipArchive;

use crate::api::{FormulaMode, SheetSelector};
use crate::error::Xlsx2CsvError;
use crate::parser::WorkbookMetadata;
use crate::security::SecurityConfig;
use crate::types::{CellCoord, CellValue, RawCellData, RawSheet, SheetMetadata};

/// ワークブックパーサー
///
/// calamineのラッパーとして、ワークブックレベルの操作を提供します。
/// ファイル全体をメモリに読み込み、アーカイブの安全性を検証してから解析します。
pub(crate) struct WorkbookParser {
    /// calamineのワークブック（XLSX形式のみサポート）
    workbook: Xlsx<Cursor<Vec<u8>>>,
    /// `xl/workbook.xml`由来のメタデータ
    metadata: WorkbookMetadata,
}

impl WorkbookParser {
    /// パスからワークブックを開く
    pub fn open(path: &Path) -> Result<Self, Xlsx2CsvError> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// リーダーからワークブックを開く
    ///
    /// # 戻り値
    ///
    /// * `Ok(WorkbookParser)` - 読み込みに成功した場合
    /// * `Err(Xlsx2CsvError::SecurityViolation)` - サイズ制限やパス検証に違反した場合
    /// * `Err(Xlsx2CsvError::Zip)` - ZIPアーカイブとして読めない場合
    /// * `Err(Xlsx2CsvError::Parse)` - calamineが解析に失敗した場合
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, Xlsx2CsvError> {
        let security_config = SecurityConfig::default();

        // 上限+1バイトまでしか読まない
        let mut buffer = Vec::new();
        reader
            .take(security_config.max_input_file_size + 1)
            .read_to_end(&mut buffer)?;
        security_config.check_input_size(buffer.len() as u64)?;

        let metadata = {
            let mut archive = ZipArchive::new(Cursor::new(buffer.as_slice()))
                .map_err(|e| Xlsx2CsvError::Zip(e.to_string()))?;
            security_config.check_archive(&mut archive)?;
            WorkbookMetadata::from_archive(&mut archive)?
        };

        let workbook: Xlsx<_> =
            Xlsx::new(Cursor::new(buffer)).map_err(|e| Xlsx2CsvError::Parse(e.into()))?;

        Ok(WorkbookParser { workbook, metadata })
    }

    /// すべてのシート名を取得（ワークブック内の順序）
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names()
    }

    /// シート選択方式に基づいてシートを選択
    ///
    /// `SheetSelector::All`の場合のみ、`include_hidden`が`false`なら非表示シートを除外します。
    /// 名前やインデックスで明示的に指定されたシートは非表示でも選択されます。
    ///
    /// # 戻り値
    ///
    /// * `Ok(Vec<String>)` - 選択されたシート名のリスト
    /// * `Err(Xlsx2CsvError::Config)` - シートが見つからない、またはインデックスが範囲外の場合
    pub fn select_sheets(
        &self,
        selector: &SheetSelector,
        include_hidden: bool,
    ) -> Result<Vec<String>, Xlsx2CsvError> {
        let all_sheet_names = self.sheet_names();

        let by_index = |index: usize| -> Result<String, Xlsx2CsvError> {
            all_sheet_names.get(index).cloned().ok_or_else(|| {
                Xlsx2CsvError::Config(format!(
                    "Sheet index {} is out of range (total: {})",
                    index,
                    all_sheet_names.len()
                ))
            })
        };
        let by_name = |name: &String| -> Result<String, Xlsx2CsvError> {
            if all_sheet_names.contains(name) {
                Ok(name.clone())
            } else {
                Err(Xlsx2CsvError::Config(format!("Sheet '{}' not found", name)))
            }
        };

        match selector {
            SheetSelector::All => Ok(all_sheet_names
                .iter()
                .filter(|name| include_hidden || !self.metadata.is_hidden(name))
                .cloned()
                .collect()),
            SheetSelector::Index(index) => Ok(vec![by_index(*index)?]),
            SheetSelector::Name(name) => Ok(vec![by_name(name)?]),
            SheetSelector::Indices(indices) => indices.iter().map(|&i| by_index(i)).collect(),
            SheetSelector::Names(names) => names.iter().map(by_name).collect(),
        }
    }

    /// シートをパースして、メタデータとセルデータを抽出
    ///
    /// 値を持つセルと、`FormulaMode::Formula`の場合は数式を持つセルを
    /// 行優先順で返します。座標はシート上の絶対位置です。
    pub fn parse_sheet(
        &mut self,
        sheet_name: &str,
        formula_mode: FormulaMode,
    ) -> Result<RawSheet, Xlsx2CsvError> {
        let metadata = self.collect_metadata(sheet_name)?;

        let range = self
            .workbook
            .worksheet_range(sheet_name)
            .map_err(|e| Xlsx2CsvError::Parse(e.into()))?;

        let mut cells: BTreeMap<CellCoord, RawCellData> = BTreeMap::new();

        if let Some((start_row, start_col)) = range.start() {
            for (row, col, data) in range.used_cells() {
                let coord = CellCoord::new(start_row + row as u32, start_col + col as u32);
                let value = CellValue::from(data);
                if value.is_empty() {
                    continue;
                }
                cells.insert(
                    coord,
                    RawCellData {
                        coord,
                        value,
                        formula: None,
                    },
                );
            }
        }

        // 数式は1回だけ取得して全セルで再利用する
        if formula_mode == FormulaMode::Formula {
            let formulas = self
                .workbook
                .worksheet_formula(sheet_name)
                .map_err(|e| Xlsx2CsvError::Parse(e.into()))?;
            if let Some((start_row, start_col)) = formulas.start() {
                for (row, col, formula) in formulas.used_cells() {
                    if formula.is_empty() {
                        continue;
                    }
                    let coord = CellCoord::new(start_row + row as u32, start_col + col as u32);
                    cells
                        .entry(coord)
                        .or_insert_with(|| RawCellData {
                            coord,
                            value: CellValue::Empty,
                            formula: None,
                        })
                        .formula = Some(formula.clone());
                }
            }
        }

        debug!(
            sheet = sheet_name,
            cells = cells.len(),
            last_cell = ?cells.keys().next_back().map(|coord| coord.to_a1_notation()),
            hidden = metadata.hidden,
            "parsed worksheet"
        );

        Ok(RawSheet {
            metadata,
            cells: cells.into_values().collect(),
        })
    }

    /// シートのメタデータを収集
    fn collect_metadata(&self, sheet_name: &str) -> Result<SheetMetadata, Xlsx2CsvError> {
        let index = self
            .workbook
            .sheet_names()
            .iter()
            .position(|name| name == sheet_name)
            .ok_or_else(|| Xlsx2CsvError::Config(format!("Sheet '{}' not found", sheet_name)))?;

        Ok(SheetMetadata {
            name: sheet_name.to_string(),
            index,
            hidden: self.metadata.is_hidden(sheet_name),
            is_1904: self.metadata.is_1904,
        })
    }
}

// 実際のXLSXファイルが必要なテストは統合テスト（tests/）で実装します。
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_reader_rejects_non_zip() {
        let result = WorkbookParser::from_reader(Cursor::new(b"not a workbook".to_vec()));
        assert!(matches!(result, Err(Xlsx2CsvError::Zip(_))));
    }

    #[test]
    fn test_from_reader_rejects_empty_input() {
        let result = WorkbookParser::from_reader(Cursor::new(Vec::new()));
        assert!(result.is_err());
    }
}
