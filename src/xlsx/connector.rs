//! Workbook session: owns the archive and the shared string table.

use super::config::{ConnectorConfig, ReaderConfig, SheetDesignator};
use super::reader::SheetReader;
use super::shared_strings::SharedStrings;
use super::workbook::WorkbookIndex;
use crate::container::OoxmlContainer;
use crate::error::{Error, Result};
use std::cell::RefCell;
use std::io::Read;
use std::path::Path;
use std::rc::Rc;

struct OpenWorkbook {
    container: OoxmlContainer,
    index: WorkbookIndex,
    strings: Rc<RefCell<SharedStrings>>,
}

/// An open workbook and the readers it hands out.
///
/// Every reader created by one connector shares its shared string table,
/// so strings resolved for one sheet are not parsed again for the next.
/// The table is not thread safe, and neither is the connector.
///
/// # Example
///
/// ```no_run
/// use sheetbind::{Connector, ReaderConfig};
///
/// let mut conn = Connector::new();
/// conn.open("simple.xlsx")?;
///
/// let mut reader = conn.new_reader_with_config(
///     &ReaderConfig::new("Advance").with_title_row(1).with_skip_rows(1),
/// )?;
/// let mut rows: Vec<Vec<String>> = Vec::new();
/// reader.read_all(&mut rows)?;
/// # Ok::<(), sheetbind::Error>(())
/// ```
#[derive(Default)]
pub struct Connector {
    config: ConnectorConfig,
    workbook: Option<OpenWorkbook>,
}

impl Connector {
    /// Create a connector with no workbook open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a workbook file with the default configuration.
    pub fn open(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.open_with_config(path, ConnectorConfig::default())
    }

    /// Open a workbook file.
    pub fn open_with_config(
        &mut self,
        path: impl AsRef<Path>,
        config: ConnectorConfig,
    ) -> Result<()> {
        self.close()?;
        let container = OoxmlContainer::open(path)?;
        self.attach(container, config)
    }

    /// Open a workbook held in memory.
    pub fn open_bytes(&mut self, data: Vec<u8>) -> Result<()> {
        self.open_bytes_with_config(data, ConnectorConfig::default())
    }

    /// Open a workbook held in memory.
    pub fn open_bytes_with_config(&mut self, data: Vec<u8>, config: ConnectorConfig) -> Result<()> {
        self.close()?;
        let container = OoxmlContainer::from_bytes(data)?;
        self.attach(container, config)
    }

    /// Open a workbook from any byte source.
    pub fn open_reader<R: Read>(&mut self, reader: R) -> Result<()> {
        self.open_reader_with_config(reader, ConnectorConfig::default())
    }

    /// Open a workbook from any byte source.
    pub fn open_reader_with_config<R: Read>(
        &mut self,
        reader: R,
        config: ConnectorConfig,
    ) -> Result<()> {
        self.close()?;
        let container = OoxmlContainer::from_reader(reader)?;
        self.attach(container, config)
    }

    fn attach(&mut self, container: OoxmlContainer, config: ConnectorConfig) -> Result<()> {
        let index = WorkbookIndex::read(&container)?;
        let part = match &index.shared_strings {
            Some(path) => Some(container.open_part(path)?),
            None => None,
        };
        let strings = SharedStrings::new(part, config.max_shared_string_bytes);

        tracing::debug!(
            sheets = index.sheets.len(),
            budget = ?config.max_shared_string_bytes,
            "opened workbook"
        );

        self.config = config;
        self.workbook = Some(OpenWorkbook {
            container,
            index,
            strings: Rc::new(RefCell::new(strings)),
        });
        Ok(())
    }

    /// Check if a workbook is open.
    pub fn is_open(&self) -> bool {
        self.workbook.is_some()
    }

    /// Configuration of the open workbook.
    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    /// Close the workbook. Safe to call more than once.
    ///
    /// Readers already handed out keep their own sheet streams and the
    /// string table they were created with.
    pub fn close(&mut self) -> Result<()> {
        if self.workbook.take().is_some() {
            tracing::debug!("closed workbook");
        }
        Ok(())
    }

    /// Sheet names in workbook order, hidden sheets included. Empty when
    /// nothing is open.
    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook
            .as_ref()
            .map(|w| w.index.sheet_names().into_iter().map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Names of every part in the archive.
    pub fn part_names(&self) -> Result<Vec<String>> {
        let workbook = self.workbook.as_ref().ok_or(Error::NotOpen)?;
        Ok(workbook.container.list_files())
    }

    /// Open a reader on `sheet` with titles on the first row.
    pub fn new_reader(&self, sheet: impl Into<SheetDesignator>) -> Result<SheetReader> {
        self.new_reader_with_config(&ReaderConfig::new(sheet))
    }

    /// Open a reader as described by `config`.
    pub fn new_reader_with_config(&self, config: &ReaderConfig) -> Result<SheetReader> {
        let workbook = self.workbook.as_ref().ok_or(Error::NotOpen)?;

        let designator = config.resolved_sheet();
        let sheet = match &designator {
            SheetDesignator::Name(name) => workbook.index.by_name(name),
            SheetDesignator::Position(position) => workbook.index.by_position(*position),
        }
        .ok_or_else(|| Error::SheetNotFound(designator.to_string()))?;

        let part = workbook.container.open_part(&sheet.path)?;
        SheetReader::open(sheet.name.clone(), part, Rc::clone(&workbook.strings), config)
    }

    /// Whether shared string resolution has stopped at the byte budget.
    pub fn exceeded_shared_string_budget(&self) -> bool {
        self.workbook
            .as_ref()
            .is_some_and(|w| w.strings.borrow().exceeded_budget())
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("config", &self.config)
            .field("sheets", &self.sheet_names())
            .finish()
    }
}
