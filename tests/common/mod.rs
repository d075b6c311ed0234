//! In-memory workbook fixtures.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const SHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STRINGS_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";

/// One sheet of a fixture workbook.
pub struct SheetFixture {
    pub name: String,
    pub state: Option<String>,
    pub xml: String,
}

/// Builds minimal but well-formed `.xlsx` archives.
pub struct WorkbookBuilder {
    sheets: Vec<SheetFixture>,
    shared_strings: Option<String>,
    method: CompressionMethod,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self {
            sheets: Vec::new(),
            shared_strings: None,
            method: CompressionMethod::Deflated,
        }
    }

    pub fn stored(mut self) -> Self {
        self.method = CompressionMethod::Stored;
        self
    }

    pub fn sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push(SheetFixture {
            name: name.to_string(),
            state: None,
            xml: sheet_xml(rows),
        });
        self
    }

    /// Add a sheet whose part is exactly `xml`.
    pub fn raw_sheet(mut self, name: &str, xml: impl Into<String>) -> Self {
        self.sheets.push(SheetFixture {
            name: name.to_string(),
            state: None,
            xml: xml.into(),
        });
        self
    }

    pub fn hidden_sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push(SheetFixture {
            name: name.to_string(),
            state: Some("hidden".to_string()),
            xml: sheet_xml(rows),
        });
        self
    }

    pub fn shared_strings(mut self, xml: impl Into<String>) -> Self {
        self.shared_strings = Some(xml.into());
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            let options = SimpleFileOptions::default().compression_method(self.method);
            let mut put = |name: &str, data: &str| {
                zip.start_file(name, options).unwrap();
                zip.write_all(data.as_bytes()).unwrap();
            };

            put("[Content_Types].xml", &self.content_types());
            put(
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
            );
            put("xl/workbook.xml", &self.workbook_xml());
            put("xl/_rels/workbook.xml.rels", &self.workbook_rels());
            for (i, sheet) in self.sheets.iter().enumerate() {
                put(&format!("xl/worksheets/sheet{}.xml", i + 1), &sheet.xml);
            }
            if let Some(strings) = &self.shared_strings {
                put("xl/sharedStrings.xml", strings);
            }
            zip.finish().unwrap();
        }
        buffer
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/>"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let state = sheet
                .state
                .as_deref()
                .map(|s| format!(r#" state="{}""#, s))
                .unwrap_or_default();
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}"{} r:id="rId{}"/>"#,
                sheet.name,
                i + 1,
                state,
                i + 1
            ));
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            xml.push_str(&format!(
                r#"<Relationship Id="rId{i}" Type="{SHEET_REL}" Target="worksheets/sheet{i}.xml"/>"#
            ));
        }
        if self.shared_strings.is_some() {
            xml.push_str(&format!(
                r#"<Relationship Id="rIdStrings" Type="{STRINGS_REL}" Target="sharedStrings.xml"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        xml
    }
}

/// Wrap row markup in a worksheet document.
pub fn sheet_xml(rows: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}"><sheetData>{rows}</sheetData></worksheet>"#
    )
}

/// A shared strings document declaring `strings.len()` unique entries.
pub fn shared_strings_xml(strings: &[&str]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{MAIN_NS}" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    );
    for s in strings {
        xml.push_str("<si><t>");
        xml.push_str(&escape(s));
        xml.push_str("</t></si>");
    }
    xml.push_str("</sst>");
    xml
}

/// Byte offset just past the `n`-th `</si>` of a shared strings document.
pub fn end_of_item(xml: &str, n: usize) -> u64 {
    let mut offset = 0;
    for _ in 0..n {
        offset += xml[offset..].find("</si>").unwrap() + "</si>".len();
    }
    offset as u64
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Strings of the `Advance.suffix` fixture sheet, in table order.
pub const ADVANCE_STRINGS: &[&str] = &[
    "ID",
    "NameOf",
    "AgeOf",
    "Slice",
    "UnmarshalString",
    "Andy",
    "1|2",
    r#"{"Foo":"Andy"}"#,
    "Leo",
    "2|3|4",
    r#"{"Foo":"Leo"}"#,
    "Ben",
    "3|4|5|6",
    r#"{"Foo":"Ben"}"#,
    "Ming",
];

/// Row markup of the `Advance.suffix` sheet: a caption row, the titles, a
/// row of column notes, a blank row and four data rows.
pub const ADVANCE_ROWS: &str = concat!(
    r#"<row r="1"><c r="A1" t="inlineStr"><is><t>Advance sample</t></is></c></row>"#,
    r#"<row r="2"><c r="A2" t="s"><v>0</v></c><c r="B2" t="s"><v>1</v></c><c r="C2" t="s"><v>2</v></c><c r="D2" t="s"><v>3</v></c><c r="E2" t="s"><v>4</v></c></row>"#,
    r#"<row r="3"/>"#,
    r#"<row r="4"><c r="A4" t="inlineStr"><is><t>key</t></is></c><c r="B4" t="inlineStr"><is><t>name</t></is></c></row>"#,
    r#"<row r="5"><c r="A5"><v>1</v></c><c r="B5" t="s"><v>5</v></c><c r="C5"><v>1</v></c><c r="D5" t="s"><v>6</v></c><c r="E5" t="s"><v>7</v></c></row>"#,
    r#"<row r="6"><c r="A6"><v>2</v></c><c r="B6" t="s"><v>8</v></c><c r="C6"><v>2</v></c><c r="D6" t="s"><v>9</v></c><c r="E6" t="s"><v>10</v></c></row>"#,
    r#"<row r="7"><c r="A7"><v>3</v></c><c r="B7" t="s"><v>11</v></c><c r="D7" t="s"><v>12</v></c><c r="E7" t="s"><v>13</v></c></row>"#,
    r#"<row r="8"><c r="A8"><v>4</v></c><c r="B8" t="s"><v>14</v></c><c r="C8"><v>4</v></c><c r="D8"><v>1</v></c></row>"#,
);

/// The fixture workbook: a leading `Standard` sheet, a hidden sheet and
/// `Advance.suffix`.
pub fn advance_workbook() -> Vec<u8> {
    WorkbookBuilder::new()
        .sheet(
            "Standard",
            r#"<row r="1"><c r="A1" t="s"><v>0</v></c></row><row r="2"><c r="A2"><v>7</v></c></row>"#,
        )
        .hidden_sheet("Secret", "")
        .sheet("Advance.suffix", ADVANCE_ROWS)
        .shared_strings(shared_strings_xml(ADVANCE_STRINGS))
        .build()
}
