//! Workbook structure: sheet list and part locations.

use crate::container::OoxmlContainer;
use crate::error::{Error, Result};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::Event;
use std::collections::HashMap;

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const DEFAULT_SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const SHARED_STRINGS_REL_SUFFIX: &str = "/sharedStrings";

/// Sheet entry from workbook.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    /// Display name.
    pub name: String,
    /// Archive part holding the sheet's rows.
    pub path: String,
    /// Visibility state (`visible`, `hidden`, `veryHidden`).
    pub state: String,
}

impl SheetInfo {
    /// Check if the sheet is hidden.
    pub fn is_hidden(&self) -> bool {
        self.state != "visible"
    }
}

/// Sheet list and part locations of one workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookIndex {
    /// Sheets in workbook order, hidden sheets included.
    pub sheets: Vec<SheetInfo>,
    /// Location of the shared strings part, if the workbook has one.
    pub shared_strings: Option<String>,
}

#[derive(Debug)]
struct RelTarget {
    rel_type: String,
    target: String,
}

impl WorkbookIndex {
    /// Read the workbook index from a container.
    pub fn read(container: &OoxmlContainer) -> Result<Self> {
        let rels = parse_workbook_rels(container)?;
        let sheets = parse_workbook(container, &rels)?;

        let shared_strings = rels
            .values()
            .find(|r| r.rel_type.ends_with(SHARED_STRINGS_REL_SUFFIX))
            .map(|r| OoxmlContainer::resolve_path(WORKBOOK_PATH, &r.target))
            .or_else(|| Some(DEFAULT_SHARED_STRINGS_PATH.to_string()))
            .filter(|path| container.exists(path));

        tracing::debug!(
            sheets = sheets.len(),
            shared_strings = shared_strings.as_deref().unwrap_or("<none>"),
            "read workbook index"
        );

        Ok(Self {
            sheets,
            shared_strings,
        })
    }

    /// Sheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Find a sheet by exact name.
    pub fn by_name(&self, name: &str) -> Option<&SheetInfo> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Find a sheet by 1-based position, hidden sheets counted.
    pub fn by_position(&self, position: usize) -> Option<&SheetInfo> {
        position
            .checked_sub(1)
            .and_then(|index| self.sheets.get(index))
    }
}

/// Unescaped attribute text, falling back to the raw bytes.
fn attr_value(attr: &Attribute<'_>) -> String {
    attr.unescape_value()
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned())
}

/// Parse workbook relationships.
fn parse_workbook_rels(container: &OoxmlContainer) -> Result<HashMap<String, RelTarget>> {
    let mut rels = HashMap::new();

    if let Ok(xml) = container.read_xml(WORKBOOK_RELS_PATH) {
        let mut reader = quick_xml::Reader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    if e.local_name().as_ref() == b"Relationship" {
                        let mut id = String::new();
                        let mut rel_type = String::new();
                        let mut target = String::new();

                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"Id" => id = attr_value(&attr),
                                b"Type" => rel_type = attr_value(&attr),
                                b"Target" => target = attr_value(&attr),
                                _ => {}
                            }
                        }

                        if !id.is_empty() && !target.is_empty() {
                            rels.insert(id, RelTarget { rel_type, target });
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    Ok(rels)
}

/// Parse workbook.xml for sheet entries.
fn parse_workbook(
    container: &OoxmlContainer,
    rels: &HashMap<String, RelTarget>,
) -> Result<Vec<SheetInfo>> {
    let xml = container.read_xml(WORKBOOK_PATH)?;
    let mut sheets = Vec::new();

    let mut reader = quick_xml::Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut position = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.local_name().as_ref() == b"sheet" {
                    position += 1;
                    let mut name = String::new();
                    let mut rel_id = String::new();
                    let mut state = "visible".to_string();

                    for attr in e.attributes().flatten() {
                        let value = attr_value(&attr);
                        match attr.key.local_name().as_ref() {
                            b"name" => name = value,
                            b"id" => rel_id = value,
                            b"state" => state = value,
                            _ => {}
                        }
                    }

                    let path = match rels.get(&rel_id) {
                        Some(rel) => OoxmlContainer::resolve_path(WORKBOOK_PATH, &rel.target),
                        // Workbooks without relationships follow the default layout.
                        None => format!("xl/worksheets/sheet{}.xml", position),
                    };

                    if !name.is_empty() {
                        sheets.push(SheetInfo { name, path, state });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheets)
}
