//! Minimal OOXML spreadsheet writer.
//!
//! Emits the five part kinds a reader needs (content types, package rels,
//! workbook, workbook rels, one worksheet per sheet) into a ZIP container.
//! Text cells are written as inline strings so no shared-string table is
//! required.

use std::io::{Cursor, Write};

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::workbook::{Cell, Sheet, Workbook};

/// Renders a [`Workbook`] into a binary spreadsheet payload.
pub trait WorkbookSink {
    fn render(&self, book: &Workbook) -> Result<Vec<u8>>;
}

pub struct XlsxSink;

impl WorkbookSink for XlsxSink {
    fn render(&self, book: &Workbook) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let opts = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types(book.sheets.len())?),
            ("_rels/.rels".to_string(), root_rels()?),
            ("xl/workbook.xml".to_string(), workbook_xml(book)?),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                workbook_rels(book.sheets.len())?,
            ),
        ];
        for (i, sheet) in book.sheets.iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), sheet_xml(sheet)?));
        }

        for (name, body) in parts {
            zip.start_file(name.as_str(), opts)
                .with_context(|| format!("Failed to start workbook part {}", name))?;
            zip.write_all(&body)?;
        }
        let cursor = zip.finish().context("Failed to finish workbook")?;
        Ok(cursor.into_inner())
    }
}

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_PACKAGE_RELS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_DOC_RELS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const CT_WORKSHEET: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

/// One XML part, written event by event. Attribute values and text are
/// escaped by the writer.
struct Part {
    writer: Writer<Vec<u8>>,
}

impl Part {
    fn new() -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(Self { writer })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.writer.write_event(Event::Start(element(name, attrs)))?;
        Ok(())
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        self.writer.write_event(Event::Empty(element(name, attrs)))?;
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

fn element<'a>(name: &'a str, attrs: &[(&str, &str)]) -> BytesStart<'a> {
    let mut el = BytesStart::new(name);
    for &attr in attrs {
        el.push_attribute(attr);
    }
    el
}

fn root_rels() -> Result<Vec<u8>> {
    let kind = format!("{}/officeDocument", NS_DOC_RELS);
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", NS_PACKAGE_RELS)])?;
    part.empty(
        "Relationship",
        &[
            ("Id", "rId1"),
            ("Type", kind.as_str()),
            ("Target", "xl/workbook.xml"),
        ],
    )?;
    part.close("Relationships")?;
    Ok(part.finish())
}

fn content_types(sheets: usize) -> Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    part.empty(
        "Default",
        &[
            ("Extension", "rels"),
            (
                "ContentType",
                "application/vnd.openxmlformats-package.relationships+xml",
            ),
        ],
    )?;
    part.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    part.empty(
        "Override",
        &[
            ("PartName", "/xl/workbook.xml"),
            (
                "ContentType",
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml",
            ),
        ],
    )?;
    for i in 1..=sheets {
        let name = format!("/xl/worksheets/sheet{}.xml", i);
        part.empty(
            "Override",
            &[("PartName", name.as_str()), ("ContentType", CT_WORKSHEET)],
        )?;
    }
    part.close("Types")?;
    Ok(part.finish())
}

fn workbook_xml(book: &Workbook) -> Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_DOC_RELS)])?;
    part.open("sheets", &[])?;
    for (i, sheet) in book.sheets.iter().enumerate() {
        let name = sheet_name(&sheet.name);
        let id = (i + 1).to_string();
        let rel = format!("rId{}", i + 1);
        part.empty(
            "sheet",
            &[
                ("name", name.as_str()),
                ("sheetId", id.as_str()),
                ("r:id", rel.as_str()),
            ],
        )?;
    }
    part.close("sheets")?;
    part.close("workbook")?;
    Ok(part.finish())
}

fn workbook_rels(sheets: usize) -> Result<Vec<u8>> {
    let kind = format!("{}/worksheet", NS_DOC_RELS);
    let mut part = Part::new()?;
    part.open("Relationships", &[("xmlns", NS_PACKAGE_RELS)])?;
    for i in 1..=sheets {
        let id = format!("rId{}", i);
        let target = format!("worksheets/sheet{}.xml", i);
        part.empty(
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", kind.as_str()),
                ("Target", target.as_str()),
            ],
        )?;
    }
    part.close("Relationships")?;
    Ok(part.finish())
}

fn sheet_xml(sheet: &Sheet) -> Result<Vec<u8>> {
    let mut part = Part::new()?;
    part.open("worksheet", &[("xmlns", NS_MAIN)])?;
    part.open("sheetData", &[])?;
    for (r, row) in sheet.rows.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        let row_num = (r + 1).to_string();
        part.open("row", &[("r", row_num.as_str())])?;
        for (c, cell) in row.iter().enumerate() {
            let reference = format!("{}{}", column_letter(c), row_num);
            match cell {
                Cell::Text(text) => {
                    part.open("c", &[("r", reference.as_str()), ("t", "inlineStr")])?;
                    part.open("is", &[])?;
                    part.open("t", &[("xml:space", "preserve")])?;
                    part.text(&xml_safe(text))?;
                    part.close("t")?;
                    part.close("is")?;
                    part.close("c")?;
                }
                Cell::Number(n) if n.is_finite() => {
                    part.open("c", &[("r", reference.as_str())])?;
                    part.open("v", &[])?;
                    part.text(&n.to_string())?;
                    part.close("v")?;
                    part.close("c")?;
                }
                Cell::Number(_) => {}
            }
        }
        part.close("row")?;
    }
    part.close("sheetData")?;
    part.close("worksheet")?;
    Ok(part.finish())
}

/// Zero-based column index → spreadsheet letters (`0` → `A`, `26` → `AA`).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (index % 26) as u8) as char);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    letters.iter().rev().collect()
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r'))
        .collect()
}

/// Sheet names are limited to 31 characters and may not contain `[]:*?/\`.
fn sheet_name(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(31)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(27), "AB");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn rendered_workbook_reopens_as_zip() {
        let mut sheet = Sheet::new("Summary");
        sheet.push(["Title", "Score <&>"]);
        sheet.rows.push(vec!["Heart\u{1}Attack".into(), Cell::Number(95.0)]);
        let book = Workbook {
            sheets: vec![sheet, Sheet::new("Analytics")],
        };
        let bytes = XlsxSink.render(&book).unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = archive.file_names().map(str::to_string).collect();
        for part in [
            "[Content_Types].xml",
            "_rels/.rels",
            "xl/workbook.xml",
            "xl/_rels/workbook.xml.rels",
            "xl/worksheets/sheet1.xml",
            "xl/worksheets/sheet2.xml",
        ] {
            assert!(names.iter().any(|n| n == part), "missing {}", part);
        }

        let mut workbook = String::new();
        archive
            .by_name("xl/workbook.xml")
            .unwrap()
            .read_to_string(&mut workbook)
            .unwrap();
        assert!(workbook.contains(r#"name="Summary""#));
        assert!(workbook.contains(r#"name="Analytics""#));

        let mut sheet1 = String::new();
        archive
            .by_name("xl/worksheets/sheet1.xml")
            .unwrap()
            .read_to_string(&mut sheet1)
            .unwrap();
        assert!(sheet1.contains("Score &lt;&amp;&gt;"));
        assert!(sheet1.contains("HeartAttack"));
        assert!(sheet1.contains(r#"<c r="B2"><v>95</v></c>"#));
        assert!(sheet1.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
    }

    #[test]
    fn sheet_names_and_attributes_are_escaped() {
        let book = Workbook {
            sheets: vec![Sheet::new("R&D \"Q1\" [draft]")],
        };
        let workbook = String::from_utf8(workbook_xml(&book).unwrap()).unwrap();
        assert!(workbook.contains(r#"name="R&amp;D &quot;Q1&quot; draft""#));
        assert!(workbook.contains(r#"r:id="rId1""#));

        let rels = String::from_utf8(workbook_rels(2).unwrap()).unwrap();
        assert!(rels.contains(r#"Target="worksheets/sheet2.xml""#));
    }
}
