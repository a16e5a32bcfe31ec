//! Aggregated belongs-to associations with attribute delegation.
//!
//! An owner model declares an aggregated association to a target model and
//! then answers the target's attribute accessors as if they were its own:
//! reading `street` on a person reads the street of the person's address, and
//! writing it writes the address (building one when none is resolved yet).
//!
//! - Forwarding accessors are computed from the target's attribute and enum
//!   metadata, minus reserved helper names and names the owner defines.
//! - The forwarding namespace is built once per association and reused.
//! - `Aggregated::updated` tells the save path whether the owner's foreign
//!   key must be persisted, including when an aggregation-style lookup created
//!   or changed the target.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::LazyLock;
//! use aggregated::prelude::*;
//!
//! #[derive(SqlEnum, Debug, Clone, Copy, PartialEq)]
//! enum Kind {
//!     Home,
//!     Work,
//! }
//!
//! #[derive(Model, Debug, Clone, Default)]
//! struct Address {
//!     #[aggregated(primary_key)]
//!     id: Option<i64>,
//!     street: String,
//!     city: String,
//!     #[aggregated(enumerated)]
//!     kind: Option<Kind>,
//!     flag: AggregationFlag,
//! }
//!
//! #[derive(Model, Debug, Default)]
//! struct Person {
//!     #[aggregated(primary_key)]
//!     id: Option<i64>,
//!     name: String,
//!     #[aggregated(foreign_key = "addresses.id")]
//!     address_id: Option<i64>,
//!     address: Aggregated<Address>,
//! }
//!
//! static PERSON_ADDRESS: LazyLock<AggregateReflection<Person, Address>> = LazyLock::new(|| {
//!     AggregateReflection::new("address", "address_id", |p| &p.address, |p| &mut p.address)
//! });
//!
//! fn example() -> Result<()> {
//!     let people = ModelClass::<Person>::define()?.aggregate(&PERSON_ADDRESS)?;
//!     let mut person = Person::default();
//!
//!     assert!(people.respond_to("street"));
//!     people.write(&mut person, "street", Value::from("Main St"))?;
//!     assert_eq!(person.address.target().unwrap().street, "Main St");
//!
//!     assert!(person.address.updated());
//!     Ok(())
//! }
//! ```

// Re-export all public types from sub-crates
pub use aggregated_core::{
    AccessorKind,
    // Association state and tracking
    AggregateReflection,
    Aggregated,
    AggregationAware,
    AggregationFlag,
    AttributeMethod,
    Bound,
    // Configuration
    DelegationConfig,
    // Delegation
    DelegatedMethod,
    DelegationNamespace,
    EnumInfo,
    // Errors
    Error,
    FieldInfo,
    ForeignKeyUpdate,
    GeneratedAttributeMethods,
    // Core traits and types
    Model,
    ModelClass,
    NameRule,
    ReservedNames,
    Result,
    SkipReason,
    SqlEnum,
    Value,
    delegation_candidates,
    extend,
    generate_attribute_methods,
};
pub use aggregated_core::error;
pub use aggregated_core::schema;

pub use aggregated_macros::{Model, SqlEnum};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use aggregated::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AggregateReflection, Aggregated, AggregationAware, AggregationFlag, DelegationConfig,
        Error, Model, ModelClass, ReservedNames, Result, SqlEnum, Value, extend,
    };
}
