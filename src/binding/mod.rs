//! Declarative binding of sheet rows onto typed records.
//!
//! A record type carries one [`FieldRule`] per field, parsed once into a
//! [`Schema`] and memoized. Binding a row looks every field's column up in
//! the sheet's [`Titles`], applies the rule, and parses the resulting
//! [`Value`] into the field type. Nested records are decoded from JSON text
//! and bound with the nested type's own schema.
//!
//! # Example
//!
//! ```
//! sheetbind::record! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Item {
//!         pub id: i64 => "column(ID);req()",
//!         pub tags: Vec<String> => "split(|)",
//!         pub comment: String => "-",
//!     }
//! }
//!
//! let schema = <Item as sheetbind::Record>::schema()?;
//! assert_eq!(schema.fields().len(), 2);
//! # Ok::<(), sheetbind::binding::RuleError>(())
//! ```

mod macros;
mod rule;
mod schema;
mod value;

pub use rule::{FieldRule, RuleError};
pub use schema::{FieldBinding, FieldSource, Schema, SchemaBuilder};
pub use value::{FromValue, Value};

use crate::error::{Error, Result};
use crate::xlsx::{Row, Titles};

/// A record type with a memoized binding table.
///
/// Usually implemented through [`record!`](crate::record).
pub trait Record: Default + Sized + 'static {
    /// The binding table for this type.
    fn schema() -> std::result::Result<&'static Schema<Self>, RuleError>;
}

/// Types a sheet row can be read into.
pub trait FromRow: Sized {
    /// Build `Self` from a row and the sheet's titles.
    fn from_row(row: &Row, titles: &Titles) -> Result<Self>;
}

/// A row viewed through its sheet's titles.
#[derive(Debug, Clone, Copy)]
pub struct RowSource<'a> {
    row: &'a Row,
    titles: &'a Titles,
}

impl<'a> RowSource<'a> {
    /// Pair a row with its titles.
    pub fn new(row: &'a Row, titles: &'a Titles) -> Self {
        Self { row, titles }
    }
}

impl FieldSource for RowSource<'_> {
    fn has_column(&self, column: &str) -> bool {
        self.titles.position(column).is_some()
    }

    fn value(&self, column: &str) -> Option<Value> {
        let position = self.titles.position(column)?;
        self.row
            .get(position)
            .map(|text| Value::Text(text.to_string()))
    }
}

/// Bind a row onto a fresh record.
pub fn bind_row<T: Record>(row: &Row, titles: &Titles) -> Result<T> {
    bind_source(&RowSource::new(row, titles))
}

/// Bind any field source onto a fresh record.
pub fn bind_source<T: Record>(source: &dyn FieldSource) -> Result<T> {
    let schema = T::schema()?;
    let mut record = T::default();
    schema.bind(source, &mut record)?;
    Ok(record)
}

/// Parse a value into a nested record: decoded objects are bound
/// directly, text is decoded first. Empty text yields the default record.
pub fn bind_value<T: Record>(value: &Value) -> Result<T> {
    match value {
        Value::Record(map) => bind_source(map),
        Value::Text(text) if text.trim().is_empty() => Ok(T::default()),
        Value::Text(text) => match Value::parse_structured(text) {
            Some(Value::Record(map)) => bind_source(&map),
            _ => Err(Error::conversion(text.clone(), short_type_name::<T>())),
        },
        Value::Sequence(_) => Err(Error::conversion(value.raw(), short_type_name::<T>())),
    }
}

/// Last path segment of a type's name.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

impl FromRow for Row {
    fn from_row(row: &Row, _titles: &Titles) -> Result<Self> {
        Ok(row.clone())
    }
}

/// Raw cells, absent ones as `None`, padded to the title width.
impl FromRow for Vec<Option<String>> {
    fn from_row(row: &Row, titles: &Titles) -> Result<Self> {
        let mut cells = row.cells.clone();
        if cells.len() < titles.len() {
            cells.resize(titles.len(), None);
        }
        Ok(cells)
    }
}

/// Cell text, absent cells as empty strings, padded to the title width.
impl FromRow for Vec<String> {
    fn from_row(row: &Row, titles: &Titles) -> Result<Self> {
        let width = row.len().max(titles.len());
        Ok((0..width)
            .map(|i| row.get(i).unwrap_or_default().to_string())
            .collect())
    }
}

/// Cells keyed by title; untitled columns are dropped, absent cells are
/// `null`.
impl FromRow for serde_json::Map<String, serde_json::Value> {
    fn from_row(row: &Row, titles: &Titles) -> Result<Self> {
        let mut map = serde_json::Map::new();
        for (position, name) in titles.names().iter().enumerate() {
            if name.is_empty() || map.contains_key(name) {
                continue;
            }
            let value = row
                .get(position)
                .map(|text| serde_json::Value::String(text.to_string()))
                .unwrap_or(serde_json::Value::Null);
            map.insert(name.clone(), value);
        }
        Ok(map)
    }
}
