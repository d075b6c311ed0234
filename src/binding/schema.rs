//! Field binding tables and the binding algorithm.

use super::rule::{FieldRule, RuleError};
use super::value::{FromValue, Value};
use crate::error::{Error, Result};
use std::collections::BTreeMap;

type Setter<T> = Box<dyn Fn(&mut T, &Value) -> Result<()> + Send + Sync>;

/// Where field values come from: a sheet row keyed by titles, or a decoded
/// nested object keyed by member name.
pub trait FieldSource {
    /// Whether `column` exists at all.
    fn has_column(&self, column: &str) -> bool;

    /// The present value of `column`, or `None` when absent.
    fn value(&self, column: &str) -> Option<Value>;
}

impl FieldSource for BTreeMap<String, Value> {
    fn has_column(&self, column: &str) -> bool {
        self.contains_key(column)
    }

    fn value(&self, column: &str) -> Option<Value> {
        self.get(column).cloned()
    }
}

/// One bound field: its name, rule and a typed setter.
pub struct FieldBinding<T> {
    name: &'static str,
    rule: FieldRule,
    setter: Setter<T>,
}

impl<T> FieldBinding<T> {
    /// Declared field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Parsed rule.
    pub fn rule(&self) -> &FieldRule {
        &self.rule
    }

    /// Column this field reads.
    pub fn column(&self) -> &str {
        self.rule.column_for(self.name)
    }

    fn bind(&self, source: &dyn FieldSource, target: &mut T) -> Result<()> {
        let column = self.column();
        if self.rule.required && !source.has_column(column) {
            return Err(Error::RequiredColumnMissing {
                field: self.name.to_string(),
                column: column.to_string(),
            });
        }

        let Some(value) = resolve(&self.rule, source.value(column)) else {
            return Ok(());
        };
        (self.setter)(target, &value).map_err(|e| e.within_field(self.name))
    }
}

impl<T> std::fmt::Debug for FieldBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldBinding")
            .field("name", &self.name)
            .field("rule", &self.rule)
            .finish()
    }
}

/// Apply sentinel, default and split rules to a raw value.
fn resolve(rule: &FieldRule, raw: Option<Value>) -> Option<Value> {
    let mut value = raw;

    if let (Some(nil), Some(Value::Text(text))) = (&rule.nil, &value) {
        if text == nil {
            value = None;
        }
    }

    if value.is_none() {
        value = rule.default.clone().map(Value::Text);
    }

    match (&rule.split, value) {
        (Some(delimiter), Some(Value::Text(text))) => Some(Value::split(&text, delimiter)),
        (_, value) => value,
    }
}

/// Binding table for a record type, built once and reused for every row.
pub struct Schema<T> {
    fields: Vec<FieldBinding<T>>,
}

impl<T: 'static> Schema<T> {
    /// Start building a table.
    pub fn builder() -> SchemaBuilder<T> {
        SchemaBuilder {
            fields: Vec::new(),
            error: None,
        }
    }

    /// Bound fields in declaration order; ignored fields are absent.
    pub fn fields(&self) -> &[FieldBinding<T>] {
        &self.fields
    }

    /// Populate `target` from `source`, field by field.
    pub fn bind(&self, source: &dyn FieldSource, target: &mut T) -> Result<()> {
        for field in &self.fields {
            field.bind(source, target)?;
        }
        Ok(())
    }
}

impl<T> std::fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema").field("fields", &self.fields).finish()
    }
}

/// Builder for [`Schema`]. The first invalid rule is reported by `build`.
pub struct SchemaBuilder<T> {
    fields: Vec<FieldBinding<T>>,
    error: Option<RuleError>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Declare a field with its rule text and accessor.
    pub fn field<F>(mut self, name: &'static str, tag: &str, accessor: fn(&mut T) -> &mut F) -> Self
    where
        F: FromValue + 'static,
    {
        if self.error.is_some() {
            return self;
        }

        match FieldRule::parse(tag) {
            Ok(rule) if rule.ignore => {}
            Ok(rule) => self.fields.push(FieldBinding {
                name,
                rule,
                setter: Box::new(move |target: &mut T, value: &Value| {
                    *accessor(target) = F::from_value(value)?;
                    Ok(())
                }),
            }),
            Err(err) => self.error = Some(err),
        }
        self
    }

    /// Finish the table.
    pub fn build(self) -> std::result::Result<Schema<T>, RuleError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(Schema {
                fields: self.fields,
            }),
        }
    }
}
