//! Error types for the sheetbind library.

use std::io;
use thiserror::Error;

/// Result type alias for sheetbind operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading a workbook or binding its rows.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive container is malformed or unreadable.
    #[error("ZIP archive error: {0}")]
    Archive(String),

    /// Error parsing XML content.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// A required archive part is missing.
    #[error("Missing component: {0}")]
    MissingComponent(String),

    /// The archive uses a feature this crate cannot read.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A shared string was requested but the workbook has no string table.
    #[error("Workbook has no shared string table")]
    NoStringTable,

    /// Row or cell markup violates structural expectations.
    #[error("Malformed sheet stream: {0}")]
    StreamMalformed(String),

    /// No sheet matches the requested designator.
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// A `req()` field's column does not appear among the titles.
    #[error("Required column `{column}` for field `{field}` is missing")]
    RequiredColumnMissing {
        /// Field being bound.
        field: String,
        /// Column the field targets.
        column: String,
    },

    /// Cell or default text could not be parsed into the field's type.
    #[error("Cannot convert {raw:?} into {target} for field `{field}`")]
    TypeConversion {
        /// Field being bound, as a dotted path for nested records.
        field: String,
        /// Offending text.
        raw: String,
        /// Name of the target type.
        target: &'static str,
    },

    /// A field binding rule could not be parsed.
    #[error("Invalid binding rule: {0}")]
    InvalidRule(String),

    /// `read` was called without a successful `next`.
    #[error("No current row; call next() first")]
    NoCurrentRow,

    /// The connector has no open workbook.
    #[error("No workbook is open")]
    NotOpen,
}

impl Error {
    /// Build a conversion error that has not been attributed to a field yet.
    pub(crate) fn conversion(raw: impl Into<String>, target: &'static str) -> Self {
        Error::TypeConversion {
            field: String::new(),
            raw: raw.into(),
            target,
        }
    }

    /// Attribute a binding error to `field`, prefixing nested paths.
    pub(crate) fn within_field(self, field: &str) -> Self {
        match self {
            Error::TypeConversion {
                field: inner,
                raw,
                target,
            } => Error::TypeConversion {
                field: join_path(field, &inner),
                raw,
                target,
            },
            Error::RequiredColumnMissing {
                field: inner,
                column,
            } => Error::RequiredColumnMissing {
                field: join_path(field, &inner),
                column,
            },
            other => other,
        }
    }
}

fn join_path(outer: &str, inner: &str) -> String {
    if inner.is_empty() {
        outer.to_string()
    } else {
        format!("{}.{}", outer, inner)
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::Archive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NoStringTable;
        assert_eq!(err.to_string(), "Workbook has no shared string table");

        let err = Error::SheetNotFound("Advance".to_string());
        assert_eq!(err.to_string(), "Sheet not found: Advance");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_within_field_builds_path() {
        let err = Error::conversion("abc", "i64").within_field("Foo");
        let err = err.within_field("Temp");
        match err {
            Error::TypeConversion { field, raw, target } => {
                assert_eq!(field, "Temp.Foo");
                assert_eq!(raw, "abc");
                assert_eq!(target, "i64");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
