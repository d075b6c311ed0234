//! Per-field binding rules.
//!
//! Rule syntax, directives separated by `;`:
//!
//! | Directive        | Meaning                                              |
//! |------------------|------------------------------------------------------|
//! | `column(<name>)` | read from column `<name>` instead of the field name  |
//! | `nil(<literal>)` | treat a cell equal to `<literal>` as absent          |
//! | `default(<lit>)` | value used when the cell is absent                   |
//! | `split(<delim>)` | split the cell into a sequence on `<delim>`          |
//! | `req()`          | fail when the column is missing from the titles      |
//! | `-`              | ignore the field entirely                            |

use std::str::FromStr;
use thiserror::Error;

/// A binding rule could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} in rule {tag:?}")]
pub struct RuleError {
    /// The rule text.
    pub tag: String,
    /// What went wrong.
    pub message: String,
}

impl RuleError {
    fn new(tag: &str, message: impl Into<String>) -> Self {
        Self {
            tag: tag.to_string(),
            message: message.into(),
        }
    }
}

impl From<RuleError> for crate::Error {
    fn from(err: RuleError) -> Self {
        crate::Error::InvalidRule(err.to_string())
    }
}

/// Parsed binding rule for one record field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldRule {
    /// Source column; `None` means the field's own name.
    pub column: Option<String>,
    /// Literal that marks a cell as absent.
    pub nil: Option<String>,
    /// Literal used when the cell is absent.
    pub default: Option<String>,
    /// Delimiter turning one cell into a sequence.
    pub split: Option<String>,
    /// The column must exist among the titles.
    pub required: bool,
    /// The field is never read or written.
    pub ignore: bool,
}

impl FieldRule {
    /// Parse a rule from its textual form. An empty tag yields the
    /// default rule.
    pub fn parse(tag: &str) -> Result<Self, RuleError> {
        let mut rule = FieldRule::default();
        let trimmed = tag.trim();
        if trimmed == "-" {
            rule.ignore = true;
            return Ok(rule);
        }

        let mut rest = trimmed;
        loop {
            rest = rest.trim_start_matches(|c: char| c == ';' || c.is_whitespace());
            if rest.is_empty() {
                break;
            }

            let open = rest
                .find('(')
                .ok_or_else(|| RuleError::new(tag, format!("expected '(' after {:?}", rest)))?;
            let name = rest[..open].trim();
            let body = &rest[open + 1..];
            let close = closing_paren(body)
                .ok_or_else(|| RuleError::new(tag, format!("unterminated directive {:?}", name)))?;
            let value = &body[..close];
            rest = &body[close + 1..];

            match name {
                "column" => {
                    if value.is_empty() {
                        return Err(RuleError::new(tag, "empty column name"));
                    }
                    rule.column = Some(value.to_string());
                }
                "nil" => rule.nil = Some(value.to_string()),
                "default" => rule.default = Some(value.to_string()),
                "split" => {
                    if value.is_empty() {
                        return Err(RuleError::new(tag, "empty split delimiter"));
                    }
                    rule.split = Some(value.to_string());
                }
                "req" => {
                    if !value.trim().is_empty() {
                        return Err(RuleError::new(tag, "req() takes no argument"));
                    }
                    rule.required = true;
                }
                other => {
                    return Err(RuleError::new(tag, format!("unknown directive {:?}", other)));
                }
            }
        }

        Ok(rule)
    }

    /// Column this rule reads for a field named `field`.
    pub fn column_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.column.as_deref().unwrap_or(field)
    }
}

impl FromStr for FieldRule {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Index of the `)` closing a directive: the first one followed by `;` or
/// the end of the tag, so literals may themselves contain parentheses.
fn closing_paren(body: &str) -> Option<usize> {
    body.char_indices()
        .filter(|&(_, c)| c == ')')
        .map(|(i, _)| i)
        .find(|&i| {
            let after = body[i + 1..].trim_start();
            after.is_empty() || after.starts_with(';')
        })
}
