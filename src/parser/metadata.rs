//! XML Metadata Parser Module
//!
//! `xl/workbook.xml`から、calamineで取得不可能な情報を抽出するモジュール。
//! シートの表示状態と1904年エポック判定を提供します。

use std::io::{Read, Seek};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use crate::error::Xlsx2CsvError;

/// `<sheet>`要素の情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SheetEntry {
    pub name: String,
    /// `state="hidden"`または`state="veryHidden"`
    pub hidden: bool,
}

/// ワークブックレベルのメタデータ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct WorkbookMetadata {
    /// 宣言順のシート一覧
    pub sheets: Vec<SheetEntry>,
    /// 1904年エポックを使用するかどうか
    pub is_1904: bool,
}

impl WorkbookMetadata {
    /// ZIPアーカイブから`xl/workbook.xml`を読み込んで解析する
    ///
    /// `xl/workbook.xml`が存在しない場合はデフォルト値を返し、
    /// ワークブックとしての妥当性の判定はcalamineに任せます。
    pub fn from_archive<R: Read + Seek>(
        archive: &mut ZipArchive<R>,
    ) -> Result<Self, Xlsx2CsvError> {
        let mut workbook_file = match archive.by_name("xl/workbook.xml") {
            Ok(file) => file,
            Err(_) => return Ok(Self::default()),
        };

        let mut xml_content = Vec::new();
        workbook_file.read_to_end(&mut xml_content)?;

        Self::parse(&xml_content)
    }

    /// `xl/workbook.xml`の内容を解析する
    ///
    /// 対象要素:
    ///
    /// - `<workbookPr date1904="1"/>`
    /// - `<sheet name="..." sheetId="..." state="hidden" r:id="..."/>`
    pub fn parse(xml: &[u8]) -> Result<Self, Xlsx2CsvError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut metadata = WorkbookMetadata::default();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                    b"workbookPr" => {
                        if let Some(value) = attribute_value(&e, b"date1904")? {
                            metadata.is_1904 = value == "1" || value == "true";
                        }
                    }
                    b"sheet" => {
                        let name = attribute_value(&e, b"name")?.ok_or_else(|| {
                            Xlsx2CsvError::Xml("<sheet> element without name".to_string())
                        })?;
                        let hidden = matches!(
                            attribute_value(&e, b"state")?.as_deref(),
                            Some("hidden") | Some("veryHidden")
                        );
                        metadata.sheets.push(SheetEntry { name, hidden });
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Xlsx2CsvError::Xml(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(metadata)
    }

    /// 指定されたシートが非表示かどうか
    pub fn is_hidden(&self, sheet_name: &str) -> bool {
        self.sheets
            .iter()
            .any(|sheet| sheet.hidden && sheet.name == sheet_name)
    }
}

/// 要素の属性値を取得（名前空間プレフィックスは無視）
fn attribute_value(element: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, Xlsx2CsvError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| Xlsx2CsvError::Xml(format!("XML attribute error: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw)
                .map_err(|e| Xlsx2CsvError::Xml(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}
