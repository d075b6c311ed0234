//! # sheetbind
//!
//! Streaming XLSX row reader that binds rows onto typed records.
//!
//! Sheets are decoded one row at a time straight from the archive, and the
//! shared string table is parsed only as far as the rows need it, within an
//! optional byte budget. Rows bind onto record types declared with
//! [`record!`], whose per-field rules pick columns, treat sentinel values as
//! absent, supply defaults, split cells into sequences and decode nested
//! records.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sheetbind::{Connector, ReaderConfig};
//!
//! sheetbind::record! {
//!     #[derive(Debug, Default)]
//!     pub struct Standard {
//!         pub id: u64 => "column(ID)",
//!         pub name: String => "column(Name);nil(N/A)",
//!         pub tags: Vec<String> => "column(Tags);split(|)",
//!     }
//! }
//!
//! let mut conn = Connector::new();
//! conn.open("simple.xlsx")?;
//!
//! let mut reader = conn.new_reader_with_config(&ReaderConfig::new("Standard"))?;
//! while reader.next()? {
//!     let row: Standard = reader.read()?;
//!     println!("{:?}", row);
//! }
//! reader.close()?;
//! # Ok::<(), sheetbind::Error>(())
//! ```
//!
//! ## One-shot reading
//!
//! ```no_run
//! let rows: Vec<Vec<String>> = sheetbind::read_sheet("simple.xlsx", 1)?;
//! # Ok::<(), sheetbind::Error>(())
//! ```

pub mod binding;
pub mod container;
pub mod error;
pub mod xlsx;

// Re-exports
pub use binding::{FromRow, FromValue, Record, Value};
pub use container::OoxmlContainer;
pub use error::{Error, Result};
pub use xlsx::{
    Connector, ConnectorConfig, NamedSheet, ReaderConfig, Row, SheetDesignator, SheetReader,
    Titles,
};

use std::path::Path;

/// Open a workbook file with the default configuration.
///
/// # Example
///
/// ```no_run
/// let conn = sheetbind::open("simple.xlsx")?;
/// println!("{:?}", conn.sheet_names());
/// # Ok::<(), sheetbind::Error>(())
/// ```
pub fn open(path: impl AsRef<Path>) -> Result<Connector> {
    let mut conn = Connector::new();
    conn.open(path)?;
    Ok(conn)
}

/// Read every data row of one sheet, with titles on the first row.
pub fn read_sheet<T: FromRow>(
    path: impl AsRef<Path>,
    sheet: impl Into<SheetDesignator>,
) -> Result<Vec<T>> {
    read_sheet_with_config(path, &ReaderConfig::new(sheet))
}

/// Read every data row of the sheet `config` describes.
pub fn read_sheet_with_config<T: FromRow>(
    path: impl AsRef<Path>,
    config: &ReaderConfig,
) -> Result<Vec<T>> {
    let conn = open(path)?;
    let mut reader = conn.new_reader_with_config(config)?;
    let mut rows = Vec::new();
    reader.read_all(&mut rows)?;
    reader.close()?;
    Ok(rows)
}
