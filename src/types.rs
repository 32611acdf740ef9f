//! Types Module
//!
//! クレート全体で使用する共通データ型を定義するモジュール。

use calamine::Data;

/// セルの値を表す列挙型
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    /// 整数
    Int(i64),

    /// 数値（f64）
    Number(f64),

    /// 文字列
    String(String),

    /// 論理値
    Bool(bool),

    /// エラー値（例: #DIV/0!）
    Error(String),

    /// 日時（Excelシリアル値）
    DateTime(f64),

    /// 経過時間（日単位のシリアル値）
    Duration(f64),

    /// ISO 8601形式の日時文字列
    DateTimeIso(String),

    /// ISO 8601形式の経過時間文字列
    DurationIso(String),

    /// 空セル
    Empty,
}

impl CellValue {
    /// 値が空かどうかを判定
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::String(s) => s.is_empty(),
            _ => false,
        }
    }
}

impl From<&Data> for CellValue {
    fn from(data: &Data) -> Self {
        match data {
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) => CellValue::String(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::Error(e) => CellValue::Error(e.to_string()),
            Data::DateTime(dt) if dt.is_duration() => CellValue::Duration(dt.as_f64()),
            Data::DateTime(dt) => CellValue::DateTime(dt.as_f64()),
            Data::DateTimeIso(s) => CellValue::DateTimeIso(s.clone()),
            Data::DurationIso(s) => CellValue::DurationIso(s.clone()),
            Data::Empty => CellValue::Empty,
        }
    }
}

/// セル座標（0始まり、シート上の絶対位置）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct CellCoord {
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// 新しい座標を生成
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// A1形式の文字列に変換（例: (0, 0) -> "A1"）
    pub fn to_a1_notation(self) -> String {
        let mut col = self.col;
        let mut letters = String::new();
        loop {
            letters.insert(0, (b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        format!("{}{}", letters, self.row + 1)
    }
}

/// パーサーから抽出された生のセルデータ
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawCellData {
    /// セル座標
    pub coord: CellCoord,

    /// キャッシュされた値
    pub value: CellValue,

    /// 数式（先頭の`=`なし、calamineの表現のまま）
    pub formula: Option<String>,
}

/// シートのメタデータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetMetadata {
    /// シート名
    pub name: String,

    /// ワークブック内のインデックス（0始まり）
    pub index: usize,

    /// 非表示シートかどうか
    pub hidden: bool,

    /// 1904年エポックを使用するかどうか
    pub is_1904: bool,
}

/// 1シート分の解析結果
#[derive(Debug, Clone)]
pub(crate) struct RawSheet {
    pub metadata: SheetMetadata,

    /// 値または数式を持つセル（行優先順）
    pub cells: Vec<RawCellData>,
}
