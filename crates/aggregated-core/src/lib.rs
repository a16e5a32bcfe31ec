//! Core types and traits for aggregated belongs-to associations.
//!
//! This crate provides the machinery behind an owner record that references
//! an aggregated target record and exposes the target's attributes as its own:
//!
//! - `Model` trait for attribute metadata and by-name access
//! - `schema` inspection of a model's generated accessor names
//! - `Aggregated` association state and `AggregateReflection` descriptors
//! - `extend`, the delegation builder installing forwarding accessors
//! - `ModelClass` for by-name dispatch on an owner
//! - `AggregationAware` for targets changed by an aggregation-style lookup

pub mod aggregate;
pub mod class;
pub mod config;
pub mod delegation;
pub mod enumerated;
pub mod error;
pub mod field;
pub mod model;
pub mod schema;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{AggregateReflection, Aggregated, AggregationAware, AggregationFlag};
pub use class::{Bound, ForeignKeyUpdate, ModelClass};
pub use config::{DelegationConfig, NameRule, ReservedNames};
pub use delegation::{DelegatedMethod, DelegationNamespace, SkipReason, extend};
pub use enumerated::{EnumInfo, SqlEnum};
pub use error::{
    ConfigError, DefinitionError, DefinitionErrorKind, Error, NoMethodError, Result, TypeError,
};
pub use field::FieldInfo;
pub use model::{Model, find_enum, find_field};
pub use schema::{
    AccessorKind, AttributeMethod, GeneratedAttributeMethods, delegation_candidates, enum_methods,
    generate_attribute_methods,
};
pub use value::Value;
