//! Streaming XLSX reading.
//!
//! A [`Connector`] opens the workbook archive and owns one lazily parsed
//! [`SharedStrings`] table. Each [`SheetReader`] it hands out decodes its
//! sheet's row stream one [`Row`] at a time, resolving shared strings on
//! demand and never loading the whole sheet.
//!
//! # Example
//!
//! ```no_run
//! use sheetbind::xlsx::{Connector, ConnectorConfig};
//!
//! let mut conn = Connector::new();
//! conn.open_with_config(
//!     "large.xlsx",
//!     ConnectorConfig::new().with_max_shared_string_bytes(64 * 1024),
//! )?;
//!
//! let mut reader = conn.new_reader(1)?;
//! println!("titles: {:?}", reader.titles());
//! while reader.next()? {
//!     let cells: Vec<Option<String>> = reader.read()?;
//!     println!("{:?}", cells);
//! }
//! if conn.exceeded_shared_string_budget() {
//!     eprintln!("some strings were not resolved");
//! }
//! # Ok::<(), sheetbind::Error>(())
//! ```

mod config;
mod connector;
mod reader;
mod rows;
mod shared_strings;
mod titles;
mod workbook;

pub use config::{ConnectorConfig, NamedSheet, ReaderConfig, SheetDesignator};
pub use connector::Connector;
pub use reader::{Rows, SheetReader};
pub use rows::{column_index, Row, RowDecoder};
pub use shared_strings::{ScanState, SharedStrings};
pub use titles::Titles;
pub use workbook::{SheetInfo, WorkbookIndex};
