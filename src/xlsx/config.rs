//! Connector and reader configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which sheet a reader opens.
///
/// In JSON a designator is either a number (1-based position, hidden sheets
/// included) or a string (sheet name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SheetDesignator {
    /// 1-based position among all sheets, hidden ones counted.
    Position(usize),
    /// Sheet name, before any configured prefix or suffix is applied.
    Name(String),
}

impl SheetDesignator {
    /// Designate the sheet a type names for itself.
    pub fn of<T: NamedSheet + ?Sized>() -> Self {
        SheetDesignator::Name(T::sheet_name())
    }
}

impl Default for SheetDesignator {
    fn default() -> Self {
        SheetDesignator::Position(1)
    }
}

impl From<&str> for SheetDesignator {
    fn from(name: &str) -> Self {
        SheetDesignator::Name(name.to_string())
    }
}

impl From<String> for SheetDesignator {
    fn from(name: String) -> Self {
        SheetDesignator::Name(name)
    }
}

impl From<&String> for SheetDesignator {
    fn from(name: &String) -> Self {
        SheetDesignator::Name(name.clone())
    }
}

impl From<usize> for SheetDesignator {
    fn from(position: usize) -> Self {
        SheetDesignator::Position(position)
    }
}

impl fmt::Display for SheetDesignator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetDesignator::Position(position) => write!(f, "#{}", position),
            SheetDesignator::Name(name) => f.write_str(name),
        }
    }
}

/// A type that knows which sheet holds its rows.
///
/// The default name is the type's own name, so `struct Advance` reads the
/// sheet called `Advance`.
///
/// ```
/// use sheetbind::NamedSheet;
///
/// struct Standard;
/// impl NamedSheet for Standard {}
///
/// struct Renamed;
/// impl NamedSheet for Renamed {
///     fn sheet_name() -> String {
///         "Stocks".to_string()
///     }
/// }
///
/// assert_eq!(Standard::sheet_name(), "Standard");
/// assert_eq!(Renamed::sheet_name(), "Stocks");
/// ```
pub trait NamedSheet {
    /// Name of the sheet, before prefix and suffix.
    fn sheet_name() -> String {
        crate::binding::short_type_name::<Self>().to_string()
    }
}

/// Options for opening a workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Ceiling on bytes read from the shared strings part (`None` reads
    /// the whole table). Strings past the ceiling resolve to empty text.
    pub max_shared_string_bytes: Option<u64>,
}

impl ConnectorConfig {
    /// Create a configuration with no string budget.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the whole shared strings table.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Limit the bytes read from the shared strings part.
    pub fn with_max_shared_string_bytes(mut self, bytes: u64) -> Self {
        self.max_shared_string_bytes = Some(bytes);
        self
    }
}

/// Options for one sheet reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Sheet to read.
    pub sheet: SheetDesignator,

    /// Zero-based index of the title row; earlier rows are discarded.
    pub title_row_index: usize,

    /// Non-blank rows to skip after the title row.
    pub skip_rows: usize,

    /// Prepended to every non-empty title.
    pub name_prefix: String,

    /// Appended to every non-empty title.
    pub name_suffix: String,

    /// Prepended to a sheet name designator.
    pub sheet_prefix: String,

    /// Appended to a sheet name designator.
    pub sheet_suffix: String,
}

impl ReaderConfig {
    /// Create a configuration for `sheet` with titles on the first row.
    pub fn new(sheet: impl Into<SheetDesignator>) -> Self {
        Self {
            sheet: sheet.into(),
            ..Default::default()
        }
    }

    /// Configuration for the sheet a type names for itself.
    pub fn for_type<T: NamedSheet + ?Sized>() -> Self {
        Self::new(SheetDesignator::of::<T>())
    }

    /// Set the title row index.
    pub fn with_title_row(mut self, index: usize) -> Self {
        self.title_row_index = index;
        self
    }

    /// Set how many non-blank rows follow the titles before data.
    pub fn with_skip_rows(mut self, rows: usize) -> Self {
        self.skip_rows = rows;
        self
    }

    /// Set the title prefix.
    pub fn with_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.name_prefix = prefix.into();
        self
    }

    /// Set the title suffix.
    pub fn with_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.name_suffix = suffix.into();
        self
    }

    /// Set the sheet name prefix.
    pub fn with_sheet_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.sheet_prefix = prefix.into();
        self
    }

    /// Set the sheet name suffix.
    pub fn with_sheet_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.sheet_suffix = suffix.into();
        self
    }

    /// The designator after sheet affixes are applied. Positions are
    /// left alone.
    pub fn resolved_sheet(&self) -> SheetDesignator {
        match &self.sheet {
            SheetDesignator::Name(name) => SheetDesignator::Name(format!(
                "{}{}{}",
                self.sheet_prefix, name, self.sheet_suffix
            )),
            position => position.clone(),
        }
    }
}
