//! Model trait for attribute-level access to records.
//!
//! The `Model` trait is the contract between user structs and the
//! aggregated-association machinery: static attribute metadata to derive
//! accessor names from, plus dynamic read/write by attribute name so that
//! delegated accessors can reach the aggregated record. It is typically
//! derived using `#[derive(Model)]` from `aggregated-macros`.

use crate::Result;
use crate::aggregate::AggregationAware;
use crate::enumerated::EnumInfo;
use crate::field::FieldInfo;
use crate::value::Value;

/// Trait for types that map to database records with named attributes.
///
/// # Example
///
/// ```ignore
/// use aggregated::Model;
///
/// #[derive(Model, Default)]
/// #[aggregated(table = "addresses")]
/// struct Address {
///     #[aggregated(primary_key)]
///     id: Option<i64>,
///     street: String,
///     city: String,
///     #[aggregated(enumerated)]
///     kind: Option<Kind>,
/// }
/// ```
pub trait Model: Sized + Send + Sync + 'static {
    /// The name of the database table.
    const TABLE_NAME: &'static str;

    /// The primary key attribute name(s).
    const PRIMARY_KEY: &'static [&'static str];

    /// Accessor names the model answers itself through `read_attribute` /
    /// `write_attribute` besides its generated attribute accessors.
    ///
    /// Writer names carry a trailing `=`. Delegation never installs an
    /// accessor under any of these names.
    const INSTANCE_METHODS: &'static [&'static str] = &[];

    /// Get attribute metadata for all columns.
    fn fields() -> &'static [FieldInfo];

    /// Enumerated attributes declared on this model.
    fn enums() -> &'static [EnumInfo] {
        &[]
    }

    /// Read an attribute (or instance accessor) by name.
    ///
    /// Returns `None` when the model has no such attribute.
    fn read_attribute(&self, name: &str) -> Option<Value>;

    /// Write an attribute (or instance accessor) by name.
    fn write_attribute(&mut self, name: &str, value: Value) -> Result<()>;

    /// Get the value of the primary key attribute(s).
    fn primary_key_value(&self) -> Vec<Value>;

    /// Check if this is a new record (primary key is None/default).
    fn is_new(&self) -> bool {
        self.primary_key_value().iter().all(Value::is_null)
    }

    /// The record's aggregation capability, if it tracks one.
    ///
    /// Targets that can be created or changed by an aggregation-style lookup
    /// return themselves (or an embedded flag) here.
    fn aggregation_aware(&self) -> Option<&dyn AggregationAware> {
        None
    }

    /// Mutable access to the record's aggregation capability.
    fn aggregation_aware_mut(&mut self) -> Option<&mut dyn AggregationAware> {
        None
    }
}

/// Find attribute metadata by name.
pub fn find_field<M: Model>(name: &str) -> Option<&'static FieldInfo> {
    M::fields().iter().find(|f| f.name == name)
}

/// Find enumerated-attribute reflection by name.
pub fn find_enum<M: Model>(name: &str) -> Option<&'static EnumInfo> {
    M::enums().iter().find(|e| e.name == name)
}
