//! Enumerated attributes.
//!
//! An enumerated attribute stores one value out of a finite named set. The
//! value type implements [`SqlEnum`] (usually via `#[derive(SqlEnum)]`) and the
//! model lists the attribute in [`Model::enums`](crate::Model::enums) as an
//! [`EnumInfo`].

use crate::error::{Error, Result};
use crate::value::Value;

/// A Rust enum stored as text in an attribute.
pub trait SqlEnum: Sized {
    /// Stored names of all variants, in declaration order.
    const VARIANTS: &'static [&'static str];

    /// snake_case name of the enum type, used in error messages.
    const TYPE_NAME: &'static str;

    /// Stored name of this variant.
    fn to_sql_str(&self) -> &'static str;

    /// Parse a stored name back into a variant.
    fn from_sql_str(s: &str) -> std::result::Result<Self, String>;
}

/// Reflection of one enumerated attribute declared on a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumInfo {
    /// Attribute name (also the reader accessor name)
    pub name: &'static str,
    /// Allowed stored values
    pub variants: &'static [&'static str],
}

impl EnumInfo {
    /// Create enum reflection for an attribute.
    pub const fn new(name: &'static str, variants: &'static [&'static str]) -> Self {
        Self { name, variants }
    }

    /// Create enum reflection from a [`SqlEnum`] type.
    pub const fn of<E: SqlEnum>(name: &'static str) -> Self {
        Self::new(name, E::VARIANTS)
    }

    /// Name of the reader accessor (`kind`).
    pub fn reader_name(&self) -> &'static str {
        self.name
    }

    /// Name of the writer accessor (`kind=`).
    pub fn writer_name(&self) -> String {
        format!("{}=", self.name)
    }

    /// Whether `value` is one of the declared variants.
    pub fn accepts(&self, value: &str) -> bool {
        self.variants.contains(&value)
    }

    /// Check a value about to be written to this attribute.
    ///
    /// NULL is let through; nullability is the model's concern.
    pub fn validate(&self, value: &Value) -> Result<()> {
        match value {
            Value::Null => Ok(()),
            Value::Text(s) if self.accepts(s) => Ok(()),
            Value::Text(s) => Err(Error::type_mismatch(
                "one of the declared enum values",
                format!("'{}' (allowed: {})", s, self.variants.join(", ")),
            )
            .with_attribute(self.name)),
            other => Err(Error::type_mismatch("enum value as TEXT", other.type_name())
                .with_attribute(self.name)),
        }
    }
}
