//! Parser Module
//!
//! calamineを使用したExcelファイル解析と、calamineで取得できない
//! ワークブックメタデータのXML解析。

mod metadata;
mod workbook;

pub(crate) use metadata::WorkbookMetadata;
pub(crate) use workbook::WorkbookParser;
