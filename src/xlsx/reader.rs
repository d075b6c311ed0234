//! Sheet reader: the row cursor handed out by a [`Connector`].
//!
//! [`Connector`]: super::Connector

use super::config::ReaderConfig;
use super::rows::{Row, RowDecoder};
use super::shared_strings::SharedStrings;
use super::titles::{position_at_data, TitleLayout, Titles};
use crate::binding::FromRow;
use crate::container::PartStream;
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

/// Reads the data rows of one sheet, in stream order.
///
/// The reader moves through `Open -> Iterating -> Closed`. [`next`] pulls a
/// row; [`read`] binds the current row without advancing. Closing releases
/// the sheet stream and may be repeated.
///
/// [`next`]: SheetReader::next
/// [`read`]: SheetReader::read
pub struct SheetReader {
    sheet: String,
    decoder: Option<RowDecoder>,
    strings: Rc<RefCell<SharedStrings>>,
    titles: Titles,
    pending: Option<Row>,
    current: Option<Row>,
    offset: u64,
    size: u64,
}

impl SheetReader {
    /// Position a reader on the first data row of `part`.
    pub(crate) fn open(
        sheet: String,
        part: PartStream,
        strings: Rc<RefCell<SharedStrings>>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let mut decoder = RowDecoder::new(part);
        let size = decoder.total_size();

        let layout = TitleLayout {
            title_row_index: config.title_row_index,
            skip_rows: config.skip_rows,
            prefix: &config.name_prefix,
            suffix: &config.name_suffix,
        };
        let positioned = {
            let mut table = strings.borrow_mut();
            position_at_data(&mut decoder, &mut *table, &layout)?
        };

        tracing::debug!(
            sheet = %sheet,
            size,
            titles = positioned.titles.len(),
            "opened sheet reader"
        );

        Ok(Self {
            sheet,
            offset: decoder.byte_offset(),
            decoder: Some(decoder),
            strings,
            titles: positioned.titles,
            pending: positioned.pending,
            current: None,
            size,
        })
    }

    /// Name of the sheet being read.
    pub fn sheet_name(&self) -> &str {
        &self.sheet
    }

    /// Resolved column titles, in column order.
    pub fn titles(&self) -> &[String] {
        self.titles.names()
    }

    /// Titles with their name-to-position index.
    pub fn title_map(&self) -> &Titles {
        &self.titles
    }

    /// Advance to the next row.
    ///
    /// Returns `false` at the end of the sheet or after [`close`]. A
    /// malformed stream is reported once; later calls return `false`.
    ///
    /// [`close`]: SheetReader::close
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool> {
        let Some(decoder) = self.decoder.as_mut() else {
            self.current = None;
            return Ok(false);
        };

        if let Some(row) = self.pending.take() {
            self.current = Some(row);
            return Ok(true);
        }

        let pulled = {
            let mut table = self.strings.borrow_mut();
            decoder.next_row(&mut *table)
        };
        self.offset = decoder.byte_offset();

        match pulled {
            Ok(row) => {
                self.current = row;
                Ok(self.current.is_some())
            }
            Err(err) => {
                self.current = None;
                tracing::warn!(sheet = %self.sheet, error = %err, "sheet stream failed");
                Err(err)
            }
        }
    }

    /// The row [`next`](SheetReader::next) moved to, if any.
    pub fn current_row(&self) -> Option<&Row> {
        self.current.as_ref()
    }

    /// Bind the current row into a new `T`.
    pub fn read<T: FromRow>(&self) -> Result<T> {
        let row = self.current.as_ref().ok_or(Error::NoCurrentRow)?;
        T::from_row(row, &self.titles)
    }

    /// Bind the current row into `target`, replacing its contents.
    ///
    /// On error `target` is left untouched.
    pub fn read_into<T: FromRow>(&self, target: &mut T) -> Result<()> {
        *target = self.read()?;
        Ok(())
    }

    /// Read every remaining row into `out`.
    ///
    /// Stops at the first error; rows bound before it stay in `out`.
    pub fn read_all<T: FromRow>(&mut self, out: &mut Vec<T>) -> Result<()> {
        while self.next()? {
            out.push(self.read()?);
        }
        Ok(())
    }

    /// Iterate over the remaining rows, bound as `T`.
    ///
    /// The iterator ends after the first error.
    pub fn rows<T: FromRow>(&mut self) -> Rows<'_, T> {
        Rows {
            reader: self,
            failed: false,
            _marker: PhantomData,
        }
    }

    /// Bytes of the sheet stream consumed so far.
    pub fn byte_offset(&self) -> u64 {
        self.decoder
            .as_ref()
            .map_or(self.offset, RowDecoder::byte_offset)
    }

    /// Declared uncompressed size of the sheet stream.
    pub fn stream_size(&self) -> u64 {
        self.size
    }

    /// Check if the reader has been closed.
    pub fn is_closed(&self) -> bool {
        self.decoder.is_none()
    }

    /// Release the sheet stream. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if let Some(decoder) = self.decoder.take() {
            self.offset = decoder.byte_offset();
            tracing::debug!(sheet = %self.sheet, offset = self.offset, "closed sheet reader");
        }
        self.pending = None;
        self.current = None;
        Ok(())
    }
}

impl std::fmt::Debug for SheetReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReader")
            .field("sheet", &self.sheet)
            .field("titles", &self.titles.names())
            .field("offset", &self.byte_offset())
            .field("size", &self.size)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Iterator over bound rows, from [`SheetReader::rows`].
pub struct Rows<'a, T> {
    reader: &'a mut SheetReader,
    failed: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRow> Iterator for Rows<'_, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = match self.reader.next() {
            Ok(true) => self.reader.read(),
            Ok(false) => return None,
            Err(err) => Err(err),
        };
        self.failed = item.is_err();
        Some(item)
    }
}
