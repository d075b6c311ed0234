//! XLSX shared strings resolution.
//!
//! The table is parsed lazily: a lookup only advances the underlying XML
//! stream as far as needed to fill the requested slot, and never past the
//! configured byte budget. The stream cannot be rewound, so the scan state
//! only ever moves forward.

use crate::container::{skip_bom, PartStream};
use crate::error::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::{BufRead, BufReader};

/// Upper bound on slots reserved from the `<sst>` header up front.
const MAX_RESERVED_SLOTS: usize = 4096;

/// Scan progress over the string table stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// The `<sst>` header has not been seen yet.
    Uninitialized,
    /// Slots are being filled from the stream.
    Scanning,
    /// The byte budget was reached; no further slots will be filled.
    BudgetExhausted,
    /// The stream ended or failed; every slot that will ever exist is filled.
    Drained,
}

/// Shared strings table backed by a forward-only stream.
///
/// Not safe for concurrent use: lookups mutate the scan cursor.
pub struct SharedStrings<R: BufRead = BufReader<PartStream>> {
    source: Option<Reader<R>>,
    has_table: bool,
    state: ScanState,
    budget: Option<u64>,
    /// Bytes consumed before the XML reader took over.
    base: u64,
    consumed: u64,
    /// Filled slots, in order. Slots past the end resolve to "".
    strings: Vec<String>,
    /// Slot count from the `<sst>` header; later items are ignored.
    declared: Option<usize>,
    /// Number of `<si>` items completed so far.
    cursor: usize,
    in_si: bool,
    in_t: bool,
    skip_depth: usize,
    current: String,
    buf: Vec<u8>,
}

impl SharedStrings {
    /// Create a table over an archive part, or an empty one when the
    /// workbook has no shared strings part.
    pub fn new(part: Option<PartStream>, budget: Option<u64>) -> Self {
        Self::from_source(part.map(BufReader::new), budget)
    }
}

impl<R: BufRead> SharedStrings<R> {
    /// Create a table over any buffered source.
    pub fn from_source(source: Option<R>, budget: Option<u64>) -> Self {
        let has_table = source.is_some();
        let mut base = 0;
        let source = source.map(|mut source| {
            base = skip_bom(&mut source);
            Reader::from_reader(source)
        });
        Self {
            source,
            has_table,
            state: ScanState::Uninitialized,
            budget,
            base,
            consumed: base,
            strings: Vec::new(),
            declared: None,
            cursor: 0,
            in_si: false,
            in_t: false,
            skip_depth: 0,
            current: String::new(),
            buf: Vec::new(),
        }
    }

    /// Resolve a string index.
    ///
    /// Slots the budget never reached, and indices beyond the declared
    /// count, resolve to an empty string.
    pub fn resolve(&mut self, index: usize) -> Result<String> {
        if !self.has_table {
            return Err(Error::NoStringTable);
        }

        if index >= self.cursor {
            self.advance_to(index)?;
        }

        Ok(self.strings.get(index).cloned().unwrap_or_default())
    }

    /// Whether the bytes consumed so far have reached the budget.
    pub fn exceeded_budget(&self) -> bool {
        self.has_table && matches!(self.budget, Some(limit) if self.consumed >= limit)
    }

    /// Bytes of the string table stream consumed so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Current scan state.
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Number of slots filled so far.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if no slots are filled.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Release the underlying stream. Resolved slots stay available.
    pub fn close(&mut self) {
        if self.source.take().is_some() && !self.is_final() {
            self.state = ScanState::Drained;
        }
    }

    fn is_final(&self) -> bool {
        matches!(
            self.state,
            ScanState::BudgetExhausted | ScanState::Drained
        )
    }

    fn advance_to(&mut self, index: usize) -> Result<()> {
        let mut buf = std::mem::take(&mut self.buf);
        let result = self.scan(index, &mut buf);
        buf.clear();
        self.buf = buf;

        if self.is_final() {
            self.source = None;
        }
        result
    }

    fn scan(&mut self, index: usize, buf: &mut Vec<u8>) -> Result<()> {
        while self.cursor <= index && !self.is_final() {
            if self.exceeded_budget() {
                tracing::debug!(
                    consumed = self.consumed,
                    resolved = self.cursor,
                    "shared string budget exhausted"
                );
                self.state = ScanState::BudgetExhausted;
                break;
            }

            let Some(reader) = self.source.as_mut() else {
                self.state = ScanState::Drained;
                break;
            };

            buf.clear();
            let event = reader.read_event_into(buf);
            self.consumed = self.base + reader.buffer_position() as u64;

            match event {
                Ok(Event::Start(e)) => self.on_start(&e),
                Ok(Event::Empty(e)) => self.on_empty(&e),
                Ok(Event::End(e)) => self.on_end(e.local_name().as_ref()),
                Ok(Event::Text(e)) => {
                    if self.collecting() {
                        let text = e.unescape()?;
                        self.current.push_str(&text);
                    }
                }
                Ok(Event::CData(e)) => {
                    if self.collecting() {
                        self.current.push_str(&String::from_utf8_lossy(&e));
                    }
                }
                Ok(Event::Eof) => {
                    tracing::debug!(resolved = self.cursor, "shared string table drained");
                    self.state = ScanState::Drained;
                }
                Ok(_) => {}
                Err(e) => {
                    self.state = ScanState::Drained;
                    return Err(Error::XmlParse(e.to_string()));
                }
            }
        }
        Ok(())
    }

    fn collecting(&self) -> bool {
        self.in_si && self.in_t && self.skip_depth == 0
    }

    fn on_start(&mut self, e: &BytesStart<'_>) {
        if self.skip_depth > 0 {
            self.skip_depth += 1;
            return;
        }
        match e.local_name().as_ref() {
            b"sst" => self.allocate(e),
            b"si" => {
                self.in_si = true;
                self.current.clear();
            }
            b"t" if self.in_si => self.in_t = true,
            b"r" if self.in_si => {}
            // Phonetic runs, run properties and extensions carry no
            // display text.
            _ if self.in_si => self.skip_depth = 1,
            _ => {}
        }
    }

    fn on_empty(&mut self, e: &BytesStart<'_>) {
        if self.skip_depth > 0 {
            return;
        }
        match e.local_name().as_ref() {
            b"sst" => {
                self.allocate(e);
                self.state = ScanState::Drained;
            }
            b"si" => {
                self.current.clear();
                self.store();
            }
            _ => {}
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }
        match name {
            b"si" => {
                self.store();
                self.in_si = false;
            }
            b"t" => self.in_t = false,
            _ => {}
        }
    }

    fn allocate(&mut self, e: &BytesStart<'_>) {
        let mut count = 0usize;
        let mut unique = 0usize;
        for attr in e.attributes().flatten() {
            let value = String::from_utf8_lossy(&attr.value);
            match attr.key.local_name().as_ref() {
                b"count" => count = value.trim().parse().unwrap_or(0),
                b"uniqueCount" => unique = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }

        let declared = if unique != 0 { unique } else { count };
        if declared != 0 {
            self.declared = Some(declared);
            self.strings.reserve(declared.min(MAX_RESERVED_SLOTS));
        }
        self.state = ScanState::Scanning;
        tracing::debug!(declared, "shared string table header");
    }

    fn store(&mut self) {
        let text = std::mem::take(&mut self.current);
        match self.declared {
            Some(declared) if self.cursor >= declared => {
                tracing::warn!(
                    index = self.cursor,
                    declared,
                    "shared string beyond declared count ignored"
                );
            }
            _ => self.strings.push(text),
        }
        self.cursor += 1;
    }
}

impl<R: BufRead> std::fmt::Debug for SharedStrings<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStrings")
            .field("state", &self.state)
            .field("resolved", &self.cursor)
            .field("slots", &self.strings.len())
            .field("consumed", &self.consumed)
            .field("budget", &self.budget)
            .finish()
    }
}
