//! Column titles and the title-row cursor.

use super::rows::{Row, RowDecoder};
use super::shared_strings::SharedStrings;
use crate::error::Result;
use std::collections::HashMap;
use std::io::BufRead;

/// Ordered column names with a name-to-position index.
///
/// Matching is case-sensitive. When a name repeats, the first position
/// wins. Empty names keep their position but cannot be looked up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Titles {
    names: Vec<String>,
    positions: HashMap<String, usize>,
}

impl Titles {
    /// Build titles from final column names.
    pub fn new(names: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if !name.is_empty() {
                positions.entry(name.clone()).or_insert(position);
            }
        }
        Self { names, positions }
    }

    /// Build titles from a title row, decorating non-empty names.
    pub fn from_row(row: &Row, prefix: &str, suffix: &str) -> Self {
        let names = row
            .cells
            .iter()
            .map(|cell| match cell.as_deref() {
                Some(text) if !text.is_empty() => format!("{}{}{}", prefix, text, suffix),
                _ => String::new(),
            })
            .collect();
        Self::new(names)
    }

    /// Names in column order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Position of the column called `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Name at `position`; empty for blank headers.
    pub fn name_at(&self, position: usize) -> Option<&str> {
        self.names.get(position).map(String::as_str)
    }

    /// Number of title positions.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no titles.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Where a sheet's titles are and how many rows follow them before data.
#[derive(Debug, Clone, Default)]
pub(crate) struct TitleLayout<'a> {
    pub title_row_index: usize,
    pub skip_rows: usize,
    pub prefix: &'a str,
    pub suffix: &'a str,
}

/// Result of positioning a decoder at its first data row.
#[derive(Debug, Default)]
pub(crate) struct Positioned {
    pub titles: Titles,
    /// A row read past the title position that belongs to the data.
    pub pending: Option<Row>,
}

/// Consume rows up to and including the title row, then skip the
/// configured number of non-blank rows.
///
/// Rows are counted by their sheet index, so rows missing from the stream
/// still count. If the stream skips over the title index the titles are
/// empty and the overshooting row is kept as data.
pub(crate) fn position_at_data<R: BufRead, S: BufRead>(
    decoder: &mut RowDecoder<R>,
    strings: &mut SharedStrings<S>,
    layout: &TitleLayout<'_>,
) -> Result<Positioned> {
    let mut positioned = Positioned::default();

    while let Some(row) = decoder.next_row(strings)? {
        if row.index < layout.title_row_index {
            continue;
        }
        if row.index == layout.title_row_index {
            positioned.titles = Titles::from_row(&row, layout.prefix, layout.suffix);
        } else {
            positioned.pending = Some(row);
        }
        break;
    }

    let mut remaining = layout.skip_rows;
    while remaining > 0 {
        let row = match positioned.pending.take() {
            Some(row) => row,
            None => match decoder.next_row(strings)? {
                Some(row) => row,
                None => break,
            },
        };
        if !row.is_blank() {
            remaining -= 1;
        }
    }

    tracing::debug!(
        titles = positioned.titles.len(),
        offset = decoder.byte_offset(),
        "positioned at first data row"
    );
    Ok(positioned)
}
