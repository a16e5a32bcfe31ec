//! Delegation builder.
//!
//! [`extend`] turns an [`AggregateReflection`] into a [`DelegationNamespace`]:
//! one forwarding accessor for every data accessor of the target model that
//! is neither reserved nor already defined on the owner. Each forwarder routes
//! through the association's effective reader, so `owner.street` reads
//! `owner.effective_address.street` and `owner.street = v` writes it.
//!
//! The namespace is built once per reflection and cached there; extending the
//! same association again (another owner class, a repeated declaration) reuses
//! it and includes it at most once per owner class.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::aggregate::AggregateReflection;
use crate::class::ModelClass;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::schema::{AccessorKind, AttributeMethod, delegation_candidates};
use crate::value::Value;

type ReadFn<O> = Arc<dyn Fn(&O) -> Value + Send + Sync>;
type WriteFn<O> = Arc<dyn Fn(&mut O, Value) -> Result<()> + Send + Sync>;

enum Forward<O> {
    Read(ReadFn<O>),
    Write(WriteFn<O>),
}

/// One forwarding accessor installed on an owner.
pub struct DelegatedMethod<O> {
    name: String,
    attribute: &'static str,
    kind: AccessorKind,
    forward: Forward<O>,
}

impl<O: Model> DelegatedMethod<O> {
    /// Accessor name on the owner (same as on the target).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Target attribute the accessor forwards to.
    pub fn attribute(&self) -> &'static str {
        self.attribute
    }

    pub fn kind(&self) -> AccessorKind {
        self.kind
    }

    pub fn is_writer(&self) -> bool {
        matches!(self.forward, Forward::Write(_))
    }

    /// Call a reader accessor.
    ///
    /// An unresolved target reads as NULL.
    pub fn read(&self, owner: &O) -> Result<Value> {
        match &self.forward {
            Forward::Read(read) => Ok(read(owner)),
            Forward::Write(_) => Err(Error::no_method(O::TABLE_NAME, self.name.clone())),
        }
    }

    /// Call a writer accessor.
    ///
    /// An unresolved target is built first.
    pub fn write(&self, owner: &mut O, value: Value) -> Result<()> {
        match &self.forward {
            Forward::Write(write) => write(owner, value),
            Forward::Read(_) => Err(Error::no_method(O::TABLE_NAME, self.name.clone())),
        }
    }
}

impl<O> fmt::Debug for DelegatedMethod<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegatedMethod")
            .field("name", &self.name)
            .field("attribute", &self.attribute)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Why a candidate accessor was not delegated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Matched a reserved-name rule (rule description)
    Reserved(String),
    /// The owner defines the name itself
    OwnerDefined,
    /// The accessor kind does not carry data to forward
    NotForwardable,
}

/// The forwarding accessors generated for one association.
///
/// Append-only while it is built, immutable once cached on the reflection.
pub struct DelegationNamespace<O> {
    association: &'static str,
    effective_reader: String,
    target: &'static str,
    methods: BTreeMap<String, DelegatedMethod<O>>,
    skipped: Vec<(String, SkipReason)>,
}

impl<O: Model> DelegationNamespace<O> {
    fn new(association: &'static str, effective_reader: &str, target: &'static str) -> Self {
        Self {
            association,
            effective_reader: effective_reader.to_string(),
            target,
            methods: BTreeMap::new(),
            skipped: Vec::new(),
        }
    }

    /// Association name this namespace delegates through.
    pub fn association(&self) -> &'static str {
        self.association
    }

    /// Effective reader every accessor routes through.
    pub fn effective_reader(&self) -> &str {
        &self.effective_reader
    }

    /// Table name of the target model.
    pub fn target(&self) -> &'static str {
        self.target
    }

    pub fn get(&self, name: &str) -> Option<&DelegatedMethod<O>> {
        self.methods.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Delegated accessor names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DelegatedMethod<O>> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Candidates left out, with the reason, in inspection order.
    pub fn skipped(&self) -> &[(String, SkipReason)] {
        &self.skipped
    }

    /// Why `name` was left out, if it was a candidate.
    pub fn skip_reason(&self, name: &str) -> Option<&SkipReason> {
        self.skipped
            .iter()
            .find(|(skipped, _)| skipped == name)
            .map(|(_, reason)| reason)
    }

    /// Add an accessor. Existing accessors are never redefined.
    fn define(&mut self, method: DelegatedMethod<O>) -> bool {
        if self.methods.contains_key(&method.name) {
            return false;
        }
        self.methods.insert(method.name.clone(), method);
        true
    }

    fn skip(&mut self, name: &str, reason: SkipReason) {
        self.skipped.push((name.to_string(), reason));
    }
}

impl<O> fmt::Debug for DelegationNamespace<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegationNamespace")
            .field("association", &self.association)
            .field("effective_reader", &self.effective_reader)
            .field("target", &self.target)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("skipped", &self.skipped.len())
            .finish()
    }
}

/// Install forwarding accessors for `reflection` on `class`.
///
/// Builds the reflection's delegation namespace on first use (failing fast
/// when the target's metadata is malformed) and includes it in `class` unless
/// it is already included. Calling this again for the same reflection is a
/// no-op that returns the same namespace.
#[tracing::instrument(
    level = "debug",
    skip(class, reflection),
    fields(owner = O::TABLE_NAME, association = reflection.name(), target_table = T::TABLE_NAME)
)]
pub fn extend<O, T>(
    class: &mut ModelClass<O>,
    reflection: &AggregateReflection<O, T>,
) -> Result<Arc<DelegationNamespace<O>>>
where
    O: Model,
    T: Model + Default,
{
    let namespace = reflection.namespace_or_try_init(|| build_namespace(class, reflection))?;

    if class.include(Arc::clone(&namespace)) {
        class.register_foreign_key(reflection);
        tracing::debug!(
            delegated = namespace.len(),
            skipped = namespace.skipped().len(),
            "Included delegation namespace"
        );
    } else {
        tracing::trace!("Delegation namespace already included");
    }

    Ok(namespace)
}

fn build_namespace<O, T>(
    class: &ModelClass<O>,
    reflection: &AggregateReflection<O, T>,
) -> Result<DelegationNamespace<O>>
where
    O: Model,
    T: Model + Default,
{
    let reserved = &reflection.config().reserved;
    let candidates = delegation_candidates::<T>()?;
    let mut namespace = DelegationNamespace::new(
        reflection.name(),
        reflection.effective_reader(),
        T::TABLE_NAME,
    );

    for method in candidates.iter() {
        if let Some(rule) = reserved.matching_rule(&method.name) {
            tracing::trace!(method = %method.name, rule = %rule, "Skipping reserved accessor");
            namespace.skip(&method.name, SkipReason::Reserved(rule.to_string()));
            continue;
        }
        if class.defines_method(&method.name) {
            tracing::trace!(method = %method.name, "Owner defines accessor; not delegating");
            namespace.skip(&method.name, SkipReason::OwnerDefined);
            continue;
        }
        if !method.kind.is_forwardable() {
            tracing::debug!(
                method = %method.name,
                kind = ?method.kind,
                "Accessor passed reserved-name rules but carries no data; not delegating"
            );
            namespace.skip(&method.name, SkipReason::NotForwardable);
            continue;
        }
        namespace.define(forwarder(reflection, method));
    }

    tracing::debug!(
        delegated = namespace.len(),
        candidates = candidates.len(),
        "Built delegation namespace"
    );
    Ok(namespace)
}

fn forwarder<O, T>(
    reflection: &AggregateReflection<O, T>,
    method: &AttributeMethod,
) -> DelegatedMethod<O>
where
    O: Model,
    T: Model + Default,
{
    let attribute = method.attribute;
    let reader = reflection.reader_fn();

    let forward = match method.kind {
        AccessorKind::Writer => {
            let writer = reflection.writer_fn();
            let enumerated = method.enumerated;
            Forward::Write(Arc::new(move |owner: &mut O, value: Value| {
                if let Some(info) = &enumerated {
                    info.validate(&value)?;
                }
                writer(owner)
                    .try_edit_effective(|target| target.write_attribute(attribute, value))
                    .map_err(|e| e.with_attribute(attribute))
            }))
        }
        AccessorKind::Query => Forward::Read(Arc::new(move |owner: &O| {
            let present = reader(owner)
                .target()
                .and_then(|target| target.read_attribute(attribute))
                .is_some_and(|value| value.is_present());
            Value::Bool(present)
        })),
        _ => Forward::Read(Arc::new(move |owner: &O| {
            reader(owner)
                .target()
                .and_then(|target| target.read_attribute(attribute))
                .unwrap_or(Value::Null)
        })),
    };

    DelegatedMethod {
        name: method.name.clone(),
        attribute,
        kind: method.kind,
        forward,
    }
}
