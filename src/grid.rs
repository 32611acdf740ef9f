//! Grid Module
//!
//! スパースなセルデータから論理的なグリッド構造への変換を提供するモジュール。
//! グリッドは常にA1セルを起点とし、すべての行が同じ列数を持ちます。
//!
//! セルはスパースなまま保持し、行は書き出し時に1行ずつ組み立てます。
//! そのため使用範囲がXFD1048576まで広がるシートでもメモリ使用量は
//! データを持つセル数と列数に比例します。

use std::collections::{BTreeMap, BTreeSet};

use crate::types::CellCoord;

/// 論理的なグリッド構造
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalGrid {
    /// 行番号 → 列順に並んだ（列番号, 内容）。データを持つ行のみ
    cells: BTreeMap<u32, Vec<(u32, String)>>,

    /// 行数
    rows: usize,

    /// 列数
    cols: usize,
}

impl LogicalGrid {
    /// スパースなセルデータからグリッド構造を構築
    ///
    /// 最初の使用セルより前の行・列も空セルとして扱うため、セルの位置は
    /// シート上の位置と一致します。内容が空のセルはグリッドサイズに影響しません。
    pub fn build(formatted_cells: Vec<(CellCoord, String)>) -> Self {
        let mut cells: BTreeMap<u32, Vec<(u32, String)>> = BTreeMap::new();
        let mut max_col = None;

        for (coord, content) in formatted_cells {
            if content.is_empty() {
                continue;
            }
            max_col = max_col.max(Some(coord.col));
            cells.entry(coord.row).or_default().push((coord.col, content));
        }
        for row in cells.values_mut() {
            row.sort_by_key(|(col, _)| *col);
        }

        let rows = cells
            .keys()
            .next_back()
            .map_or(0, |&last| last as usize + 1);
        let cols = max_col.map_or(0, |c| c as usize + 1);

        Self { cells, rows, cols }
    }

    /// 空の行と空の列を取り除く
    ///
    /// 残った行・列は元の順序のまま詰めて番号を振り直します。
    pub fn trim_empty(&mut self) {
        let used_cols: BTreeSet<u32> = self
            .cells
            .values()
            .flat_map(|row| row.iter().map(|(col, _)| *col))
            .collect();
        let col_index: BTreeMap<u32, u32> = used_cols
            .iter()
            .enumerate()
            .map(|(index, &col)| (col, index as u32))
            .collect();

        let cells: BTreeMap<u32, Vec<(u32, String)>> = std::mem::take(&mut self.cells)
            .into_values()
            .enumerate()
            .map(|(index, row)| {
                let row = row
                    .into_iter()
                    .filter_map(|(col, content)| col_index.get(&col).map(|&c| (c, content)))
                    .collect();
                (index as u32, row)
            })
            .collect();

        self.rows = cells.len();
        self.cols = used_cols.len();
        self.cells = cells;
    }

    /// 行数
    pub fn get_rows(&self) -> usize {
        self.rows
    }

    /// 列数
    pub fn get_cols(&self) -> usize {
        self.cols
    }

    /// 指定された行を列数分のフィールドとして組み立てる
    pub fn row(&self, row: usize) -> Vec<&str> {
        let mut fields = vec![""; self.cols];
        if let Some(cells) = u32::try_from(row).ok().and_then(|r| self.cells.get(&r)) {
            for (col, content) in cells {
                fields[*col as usize] = content.as_str();
            }
        }
        fields
    }

    /// すべての行を先頭から順に組み立てるイテレータ
    pub fn rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        (0..self.rows).map(move |row| self.row(row))
    }

    /// グリッドが空（データを持つセルが1つもない）かどうか
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}
