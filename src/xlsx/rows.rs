//! Worksheet row stream decoding.

use super::shared_strings::SharedStrings;
use crate::container::{skip_bom, PartStream};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader};

/// One sheet row: raw cell text addressed by zero-based column position.
///
/// A position the stream never declared is absent (`None`), which is
/// distinct from a cell that resolved to empty text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Zero-based row index within the sheet.
    pub index: usize,
    /// Cell values, sized to the highest declared position.
    pub cells: Vec<Option<String>>,
}

impl Row {
    /// Create an empty row.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            cells: Vec::new(),
        }
    }

    /// Get the cell at `position`; positions past the end are absent.
    pub fn get(&self, position: usize) -> Option<&str> {
        self.cells.get(position).and_then(|c| c.as_deref())
    }

    /// Number of declared positions.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row declares no cells at all.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Check if no cell carries any text.
    pub fn is_blank(&self) -> bool {
        self.cells
            .iter()
            .all(|c| c.as_deref().map_or(true, str::is_empty))
    }

    fn set(&mut self, position: usize, value: Option<String>) {
        if self.cells.len() <= position {
            self.cells.resize(position + 1, None);
        }
        self.cells[position] = value;
    }
}

/// How a cell's text is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Shared,
    Inline,
    Value,
}

#[derive(Debug)]
struct PendingCell {
    position: usize,
    kind: CellKind,
    text: Option<String>,
}

/// Forward-only decoder over one worksheet part.
pub struct RowDecoder<R: BufRead = BufReader<PartStream>> {
    reader: Reader<R>,
    total_size: u64,
    /// Bytes consumed before the XML reader took over.
    base: u64,
    offset: u64,
    buf: Vec<u8>,
    row: Option<Row>,
    next_row_index: usize,
    cell: Option<PendingCell>,
    next_position: usize,
    in_value: bool,
    in_inline: bool,
    skip_depth: usize,
    finished: bool,
}

impl RowDecoder {
    /// Create a decoder over a worksheet part.
    pub fn new(part: PartStream) -> Self {
        let size = part.size();
        Self::from_source(BufReader::new(part), size)
    }
}

impl<R: BufRead> RowDecoder<R> {
    /// Create a decoder over any buffered source of `total_size` bytes.
    pub fn from_source(mut source: R, total_size: u64) -> Self {
        let base = skip_bom(&mut source);
        Self {
            reader: Reader::from_reader(source),
            total_size,
            base,
            offset: base,
            buf: Vec::new(),
            row: None,
            next_row_index: 0,
            cell: None,
            next_position: 0,
            in_value: false,
            in_inline: false,
            skip_depth: 0,
            finished: false,
        }
    }

    /// Bytes of the row stream consumed so far.
    pub fn byte_offset(&self) -> u64 {
        self.offset
    }

    /// Declared size of the row stream.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Check if the stream is exhausted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Decode the next row, resolving shared strings through `strings`.
    ///
    /// After the last row the stream is consumed to its end, so
    /// `byte_offset()` equals `total_size()` once this returns `None`.
    pub fn next_row<S: BufRead>(
        &mut self,
        strings: &mut SharedStrings<S>,
    ) -> Result<Option<Row>> {
        if self.finished {
            return Ok(None);
        }

        let mut buf = std::mem::take(&mut self.buf);
        let result = self.decode(strings, &mut buf);
        buf.clear();
        self.buf = buf;

        if result.is_err() {
            self.finished = true;
        }
        result
    }

    fn decode<S: BufRead>(
        &mut self,
        strings: &mut SharedStrings<S>,
        buf: &mut Vec<u8>,
    ) -> Result<Option<Row>> {
        loop {
            buf.clear();
            let event = self.reader.read_event_into(buf);
            self.offset = self.base + self.reader.buffer_position() as u64;

            match event? {
                Event::Start(e) => {
                    if self.skip_depth > 0 {
                        self.skip_depth += 1;
                        continue;
                    }
                    match e.local_name().as_ref() {
                        b"row" => self.open_row(&e)?,
                        b"c" if self.row.is_some() => self.open_cell(&e)?,
                        b"v" if self.cell.is_some() => self.in_value = true,
                        b"is" if self.cell.is_some() => self.in_inline = true,
                        b"t" if self.in_inline => self.in_value = true,
                        b"r" if self.in_inline => {}
                        // Formulas, phonetic runs and extensions are not
                        // cell values.
                        _ if self.cell.is_some() => self.skip_depth = 1,
                        _ => {}
                    }
                }
                Event::Empty(e) => {
                    if self.skip_depth > 0 {
                        continue;
                    }
                    match e.local_name().as_ref() {
                        b"row" => {
                            self.open_row(&e)?;
                            return Ok(self.close_row());
                        }
                        b"c" if self.row.is_some() => {
                            self.open_cell(&e)?;
                            self.close_cell(strings)?;
                        }
                        _ => {}
                    }
                }
                Event::End(e) => {
                    if self.skip_depth > 0 {
                        self.skip_depth -= 1;
                        continue;
                    }
                    match e.local_name().as_ref() {
                        b"row" => return Ok(self.close_row()),
                        b"c" => self.close_cell(strings)?,
                        b"v" | b"t" => self.in_value = false,
                        b"is" => self.in_inline = false,
                        _ => {}
                    }
                }
                Event::Text(e) => {
                    if self.in_value && self.skip_depth == 0 {
                        let text = e.unescape()?;
                        self.push_text(&text);
                    }
                }
                Event::CData(e) => {
                    if self.in_value && self.skip_depth == 0 {
                        self.push_text(&String::from_utf8_lossy(&e));
                    }
                }
                Event::Eof => {
                    if self.row.is_some() {
                        return Err(Error::StreamMalformed(
                            "unexpected end of stream inside <row>".to_string(),
                        ));
                    }
                    self.finished = true;
                    tracing::debug!(
                        offset = self.offset,
                        size = self.total_size,
                        "row stream exhausted"
                    );
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    fn open_row(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.row.is_some() {
            return Err(Error::StreamMalformed("nested <row> element".to_string()));
        }

        let mut index = self.next_row_index;
        if let Some(r) = attr(e, b"r") {
            let number: usize = r.trim().parse().map_err(|_| {
                Error::StreamMalformed(format!("invalid row number {:?}", r))
            })?;
            if number == 0 {
                return Err(Error::StreamMalformed("row number 0".to_string()));
            }
            index = number - 1;
        }

        self.next_row_index = index + 1;
        self.next_position = 0;
        self.row = Some(Row::new(index));
        Ok(())
    }

    fn close_row(&mut self) -> Option<Row> {
        let row = self.row.take();
        if let Some(row) = &row {
            tracing::trace!(row = row.index, cells = row.len(), "decoded row");
        }
        row
    }

    fn open_cell(&mut self, e: &BytesStart<'_>) -> Result<()> {
        if self.cell.is_some() {
            return Err(Error::StreamMalformed("nested <c> element".to_string()));
        }

        let position = match attr(e, b"r") {
            Some(reference) => column_index(&reference).ok_or_else(|| {
                Error::StreamMalformed(format!("invalid cell reference {:?}", reference))
            })?,
            None => self.next_position,
        };
        let kind = match attr(e, b"t").as_deref() {
            Some("s") => CellKind::Shared,
            Some("inlineStr") => CellKind::Inline,
            _ => CellKind::Value,
        };

        self.next_position = position + 1;
        self.cell = Some(PendingCell {
            position,
            kind,
            text: None,
        });
        Ok(())
    }

    fn push_text(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.text.get_or_insert_with(String::new).push_str(text);
        }
    }

    fn close_cell<S: BufRead>(&mut self, strings: &mut SharedStrings<S>) -> Result<()> {
        let Some(cell) = self.cell.take() else {
            return Ok(());
        };
        self.in_value = false;
        self.in_inline = false;

        let value = match (cell.kind, cell.text) {
            (CellKind::Shared, Some(text)) => {
                let index: usize = text.trim().parse().map_err(|_| {
                    Error::StreamMalformed(format!("invalid shared string index {:?}", text))
                })?;
                Some(strings.resolve(index)?)
            }
            (_, text) => text,
        };

        if let Some(row) = self.row.as_mut() {
            row.set(cell.position, value);
        }
        Ok(())
    }
}

impl<R: BufRead> std::fmt::Debug for RowDecoder<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowDecoder")
            .field("offset", &self.offset)
            .field("total_size", &self.total_size)
            .field("finished", &self.finished)
            .finish()
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Zero-based column index of a cell reference such as `"AB12"`.
pub fn column_index(reference: &str) -> Option<usize> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .collect();
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    if !reference[letters.len()..].bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut index = 0usize;
    for b in letters {
        index = index * 26 + (b.to_ascii_uppercase() - b'A') as usize + 1;
    }
    Some(index - 1)
}
