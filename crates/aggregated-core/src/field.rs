//! Attribute and column definitions.

/// Metadata about a model attribute/column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Attribute name; accessor names are derived from it
    pub name: &'static str,
    /// Database column name (may differ from attribute name)
    pub column_name: &'static str,
    /// Whether this attribute is nullable
    pub nullable: bool,
    /// Whether this is a primary key
    pub primary_key: bool,
    /// Foreign key reference (table.column)
    pub foreign_key: Option<&'static str>,
}

impl FieldInfo {
    /// Create a new field info with minimal required data.
    pub const fn new(name: &'static str, column_name: &'static str) -> Self {
        Self {
            name,
            column_name,
            nullable: false,
            primary_key: false,
            foreign_key: None,
        }
    }

    /// Set the database column name.
    pub const fn column(mut self, name: &'static str) -> Self {
        self.column_name = name;
        self
    }

    /// Set nullable flag.
    pub const fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Set primary key flag.
    pub const fn primary_key(mut self, value: bool) -> Self {
        self.primary_key = value;
        self
    }

    /// Set foreign key reference.
    pub const fn foreign_key(mut self, reference: &'static str) -> Self {
        self.foreign_key = Some(reference);
        self
    }

    /// Set foreign key reference from optional.
    pub const fn foreign_key_opt(mut self, reference: Option<&'static str>) -> Self {
        self.foreign_key = reference;
        self
    }

    /// Name of the reader accessor (`street`).
    pub fn reader_name(&self) -> &'static str {
        self.name
    }

    /// Name of the writer accessor (`street=`).
    pub fn writer_name(&self) -> String {
        format!("{}=", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_info_builders() {
        let field = FieldInfo::new("address_id", "address_id")
            .nullable(true)
            .foreign_key("addresses.id");
        assert!(field.nullable);
        assert!(!field.primary_key);
        assert_eq!(field.foreign_key, Some("addresses.id"));
        assert_eq!(field.reader_name(), "address_id");
        assert_eq!(field.writer_name(), "address_id=");
    }

    #[test]
    fn test_column_override_keeps_attribute_name() {
        let field = FieldInfo::new("street", "street").column("street_line");
        assert_eq!(field.name, "street");
        assert_eq!(field.column_name, "street_line");
    }
}
