//! CSV Sink Implementation
//!
//! `csv`クレートを使用した標準的なクォート・エスケープ処理。
//! 区切り文字、ダブルクォート、CR、LFを含むフィールドはダブルクォートで囲み、
//! 内部のダブルクォートは2つに重ねます。

use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::Xlsx2CsvError;
use crate::grid::LogicalGrid;

/// CSV出力先
#[derive(Debug, Clone, Copy)]
pub(crate) struct CsvSink {
    delimiter: u8,
}

impl CsvSink {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    /// グリッドを任意のライターに書き出す
    pub fn write_grid<W: Write>(&self, grid: &LogicalGrid, writer: W) -> Result<(), Xlsx2CsvError> {
        let mut csv_writer = WriterBuilder::new()
            .delimiter(self.delimiter)
            .quote_style(QuoteStyle::Necessary)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(writer);

        // 行は1行ずつ組み立てて書き出す
        for row in grid.rows() {
            csv_writer.write_record(row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// グリッドをファイルに書き出す（既存ファイルは切り詰める）
    pub fn write_grid_to_path(&self, grid: &LogicalGrid, path: &Path) -> Result<(), Xlsx2CsvError> {
        let file = File::create(path)?;
        self.write_grid(grid, file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellCoord;

    fn render(grid: &LogicalGrid, delimiter: u8) -> String {
        let mut buffer = Vec::new();
        CsvSink::new(delimiter).write_grid(grid, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    fn grid(cells: &[(u32, u32, &str)]) -> LogicalGrid {
        LogicalGrid::build(
            cells
                .iter()
                .map(|(r, c, s)| (CellCoord::new(*r, *c), s.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_plain_rows() {
        let g = grid(&[(0, 0, "Header1"), (0, 1, "Header2"), (1, 0, "Data1"), (1, 1, "Data2")]);
        assert_eq!(render(&g, b','), "Header1,Header2\nData1,Data2\n");
    }

    #[test]
    fn test_escaping() {
        let g = grid(&[
            (0, 0, "a,b"),
            (0, 1, "say \"hi\""),
            (0, 2, "line1\nline2"),
            (0, 3, "cr\rhere"),
        ]);
        assert_eq!(
            render(&g, b','),
            "\"a,b\",\"say \"\"hi\"\"\",\"line1\nline2\",\"cr\rhere\"\n"
        );
    }

    #[test]
    fn test_custom_delimiter() {
        let g = grid(&[(0, 0, "a,b"), (0, 1, "c;d")]);
        assert_eq!(render(&g, b';'), "a,b;\"c;d\"\n");
    }

    #[test]
    fn test_padding_is_preserved() {
        let g = grid(&[(1, 2, "x")]);
        assert_eq!(render(&g, b','), ",,\n,,x\n");
    }

    #[test]
    fn test_distant_cell_streams_padding() {
        let g = grid(&[(0, 0, "top"), (9_999, 4, "bottom")]);
        let output = render(&g, b',');

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 10_000);
        assert_eq!(lines[0], "top,,,,");
        assert_eq!(lines[1], ",,,,");
        assert_eq!(lines[9_999], ",,,,bottom");
    }

    #[test]
    fn test_empty_grid_writes_nothing() {
        let g = grid(&[]);
        assert_eq!(render(&g, b','), "");
    }
}
