//! Accessor-name inspection for models.
//!
//! A model's accessor surface is computed from its static metadata rather than
//! discovered at runtime: every attribute in [`Model::fields`] yields a fixed
//! family of accessor names (reader, writer, query, dirty-tracking helpers),
//! and every enumerated attribute in [`Model::enums`] yields a reader and a
//! writer. The delegation builder consumes this as data.

use std::collections::HashMap;

use crate::enumerated::EnumInfo;
use crate::error::{DefinitionErrorKind, Error, Result};
use crate::model::Model;

/// The role of one generated accessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    /// `street`
    Reader,
    /// `street=`
    Writer,
    /// `street?`
    Query,
    /// `street_before_type_cast`
    BeforeTypeCast,
    /// `street_was`
    Was,
    /// `street_change`
    Change,
    /// `street_changed?`
    Changed,
    /// `street_will_change!`
    WillChange,
    /// `reset_street!`
    Reset,
    /// Model-wide helpers such as `_read_attribute`
    Internal,
}

impl AccessorKind {
    /// Kinds generated for every attribute, in generation order.
    pub const PER_ATTRIBUTE: &'static [AccessorKind] = &[
        AccessorKind::Reader,
        AccessorKind::Writer,
        AccessorKind::Query,
        AccessorKind::BeforeTypeCast,
        AccessorKind::Was,
        AccessorKind::Change,
        AccessorKind::Changed,
        AccessorKind::WillChange,
        AccessorKind::Reset,
    ];

    /// Accessor name of this kind for `attribute`.
    pub fn method_name(self, attribute: &str) -> String {
        match self {
            AccessorKind::Reader => attribute.to_string(),
            AccessorKind::Writer => format!("{attribute}="),
            AccessorKind::Query => format!("{attribute}?"),
            AccessorKind::BeforeTypeCast => format!("{attribute}_before_type_cast"),
            AccessorKind::Was => format!("{attribute}_was"),
            AccessorKind::Change => format!("{attribute}_change"),
            AccessorKind::Changed => format!("{attribute}_changed?"),
            AccessorKind::WillChange => format!("{attribute}_will_change!"),
            AccessorKind::Reset => format!("reset_{attribute}!"),
            AccessorKind::Internal => attribute.to_string(),
        }
    }

    /// Whether a delegated accessor of this kind can forward to the target.
    ///
    /// Only plain readers, query readers and writers carry data; the rest
    /// introspect the target's own change tracking.
    pub const fn is_forwardable(self) -> bool {
        matches!(
            self,
            AccessorKind::Reader | AccessorKind::Writer | AccessorKind::Query
        )
    }

    /// Whether calling an accessor of this kind mutates the record.
    pub const fn is_writer(self) -> bool {
        matches!(self, AccessorKind::Writer)
    }
}

/// Model-wide internal helpers every model responds to.
const INTERNAL_METHODS: &[&str] = &["_read_attribute", "_write_attribute"];

/// One generated accessor name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeMethod {
    /// Accessor name as called (`street=`)
    pub name: String,
    /// Attribute the accessor operates on (empty for internal helpers)
    pub attribute: &'static str,
    pub kind: AccessorKind,
    /// Enum reflection when the attribute is enumerated
    pub enumerated: Option<EnumInfo>,
}

impl AttributeMethod {
    fn new(attribute: &'static str, kind: AccessorKind) -> Self {
        Self {
            name: kind.method_name(attribute),
            attribute,
            kind,
            enumerated: None,
        }
    }
}

/// The accessor names generated for one model, in generation order.
#[derive(Debug, Clone)]
pub struct GeneratedAttributeMethods {
    model: &'static str,
    methods: Vec<AttributeMethod>,
    index: HashMap<String, usize>,
}

impl GeneratedAttributeMethods {
    fn new(model: &'static str) -> Self {
        Self {
            model,
            methods: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Table name of the model these accessors belong to.
    pub fn model(&self) -> &'static str {
        self.model
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttributeMethod> {
        self.methods.iter()
    }

    /// Accessor names in generation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.iter().map(|m| m.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&AttributeMethod> {
        self.index.get(name).map(|&idx| &self.methods[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Add an accessor; an existing name is kept and `false` returned.
    fn push(&mut self, method: AttributeMethod) -> bool {
        if self.index.contains_key(&method.name) {
            return false;
        }
        self.index.insert(method.name.clone(), self.methods.len());
        self.methods.push(method);
        true
    }

    fn attach_enum(&mut self, name: &str, info: EnumInfo) -> bool {
        match self.index.get(name) {
            Some(&idx) => {
                self.methods[idx].enumerated = Some(info);
                true
            }
            None => false,
        }
    }
}

/// Whether `name` can be used as an attribute accessor name.
fn is_accessor_ident(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_lowercase() || first == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Generate the attribute accessor names of `M`.
///
/// Fails when the metadata is malformed: an empty or non-identifier attribute
/// name, or an attribute declared twice.
#[tracing::instrument(level = "trace", fields(model = M::TABLE_NAME))]
pub fn generate_attribute_methods<M: Model>() -> Result<GeneratedAttributeMethods> {
    let mut methods = GeneratedAttributeMethods::new(M::TABLE_NAME);

    for &name in INTERNAL_METHODS {
        methods.push(AttributeMethod::new(name, AccessorKind::Internal));
    }

    let mut seen: Vec<&str> = Vec::with_capacity(M::fields().len());
    for field in M::fields() {
        if field.name.is_empty() {
            return Err(Error::definition(
                DefinitionErrorKind::EmptyAttributeName,
                M::TABLE_NAME,
                format!("attribute for column '{}' has an empty name", field.column_name),
            ));
        }
        if !is_accessor_ident(field.name) {
            return Err(Error::definition(
                DefinitionErrorKind::InvalidAccessorName,
                M::TABLE_NAME,
                format!("'{}' is not a valid accessor name", field.name),
            ));
        }
        if seen.contains(&field.name) {
            return Err(Error::definition(
                DefinitionErrorKind::DuplicateAttribute,
                M::TABLE_NAME,
                format!("attribute '{}' is declared more than once", field.name),
            ));
        }
        seen.push(field.name);

        for &kind in AccessorKind::PER_ATTRIBUTE {
            methods.push(AttributeMethod::new(field.name, kind));
        }
    }

    tracing::trace!(
        attributes = seen.len(),
        methods = methods.len(),
        "Generated attribute methods"
    );
    Ok(methods)
}

/// Reader and writer accessors for every enumerated attribute of `M`.
pub fn enum_methods<M: Model>() -> Result<Vec<AttributeMethod>> {
    let mut out = Vec::with_capacity(M::enums().len() * 2);
    for info in M::enums() {
        if !M::fields().iter().any(|f| f.name == info.name) {
            return Err(Error::definition(
                DefinitionErrorKind::UnknownEnumAttribute,
                M::TABLE_NAME,
                format!("enum '{}' does not name a declared attribute", info.name),
            ));
        }
        if info.variants.is_empty() {
            return Err(Error::definition(
                DefinitionErrorKind::EmptyEnum,
                M::TABLE_NAME,
                format!("enum '{}' declares no values", info.name),
            ));
        }
        for kind in [AccessorKind::Reader, AccessorKind::Writer] {
            let mut method = AttributeMethod::new(info.name, kind);
            method.enumerated = Some(*info);
            out.push(method);
        }
    }
    Ok(out)
}

/// Every accessor of `M` that delegation may forward to: the generated
/// attribute accessors united with the enum readers and writers.
pub fn delegation_candidates<M: Model>() -> Result<GeneratedAttributeMethods> {
    let mut candidates = generate_attribute_methods::<M>()?;
    for method in enum_methods::<M>()? {
        let Some(info) = method.enumerated else {
            continue;
        };
        let name = method.name.clone();
        if !candidates.attach_enum(&name, info) {
            candidates.push(method);
        }
    }
    Ok(candidates)
}
