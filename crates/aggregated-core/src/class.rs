//! Per-owner accessor table.
//!
//! A [`ModelClass`] is the method surface of one model type: the accessors
//! generated from its own attributes, its declared instance accessors, and
//! the delegation namespaces included by [`extend`](crate::extend). Calls by
//! name are dispatched owner-first, so an included namespace can only add
//! accessors, never shadow the owner's.

use std::fmt;
use std::sync::Arc;

use crate::aggregate::AggregateReflection;
use crate::delegation::{DelegatedMethod, DelegationNamespace, extend};
use crate::error::{Error, Result};
use crate::model::{Model, find_field};
use crate::schema::{AccessorKind, GeneratedAttributeMethods, generate_attribute_methods};
use crate::value::Value;

type PendingFn<O> = Box<dyn Fn(&O) -> Option<Value> + Send + Sync>;
type SyncFn<O> = Box<dyn Fn(&mut O) -> Option<Value> + Send + Sync>;

/// Foreign key bookkeeping for one included association.
struct ForeignKeyHook<O> {
    association: &'static str,
    column: &'static str,
    pending: PendingFn<O>,
    sync: SyncFn<O>,
}

/// A foreign key value the owner must persist.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyUpdate {
    /// Association name (`address`)
    pub association: &'static str,
    /// Owner column (`address_id`)
    pub column: &'static str,
    /// New value; NULL when the association was cleared
    pub value: Value,
}

/// The accessor table of owner model `O`.
pub struct ModelClass<O: Model> {
    attribute_methods: GeneratedAttributeMethods,
    namespaces: Vec<Arc<DelegationNamespace<O>>>,
    foreign_keys: Vec<ForeignKeyHook<O>>,
}

impl<O: Model> ModelClass<O> {
    /// Build the accessor table from `O`'s attribute metadata.
    pub fn define() -> Result<Self> {
        Ok(Self {
            attribute_methods: generate_attribute_methods::<O>()?,
            namespaces: Vec::new(),
            foreign_keys: Vec::new(),
        })
    }

    /// Declare an aggregated association and delegate to its target.
    ///
    /// ```ignore
    /// let people = ModelClass::<Person>::define()?.aggregate(&PERSON_ADDRESS)?;
    /// ```
    pub fn aggregate<T: Model + Default>(
        mut self,
        reflection: &AggregateReflection<O, T>,
    ) -> Result<Self> {
        extend(&mut self, reflection)?;
        Ok(self)
    }

    pub fn model_name(&self) -> &'static str {
        O::TABLE_NAME
    }

    /// Accessors generated from the owner's own attributes.
    pub fn attribute_methods(&self) -> &GeneratedAttributeMethods {
        &self.attribute_methods
    }

    /// Accessor names the owner answers itself (besides generated ones).
    pub fn instance_methods(&self) -> &'static [&'static str] {
        O::INSTANCE_METHODS
    }

    /// Whether the owner itself defines `name`, ignoring delegation.
    pub fn defines_method(&self, name: &str) -> bool {
        self.attribute_methods.contains(name) || O::INSTANCE_METHODS.contains(&name)
    }

    /// Whether an owner instance answers `name`, delegated or not.
    pub fn respond_to(&self, name: &str) -> bool {
        self.defines_method(name) || self.delegated_method(name).is_some()
    }

    /// The delegated accessor answering `name`, if the owner does not
    /// answer it itself.
    pub fn delegated_method(&self, name: &str) -> Option<&DelegatedMethod<O>> {
        if self.defines_method(name) {
            return None;
        }
        self.namespaces.iter().find_map(|ns| ns.get(name))
    }

    /// Every delegated accessor name, in inclusion order.
    pub fn delegated_method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for ns in &self.namespaces {
            for name in ns.names() {
                if !names.contains(&name) && !self.defines_method(name) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Included delegation namespaces, in inclusion order.
    pub fn namespaces(&self) -> &[Arc<DelegationNamespace<O>>] {
        &self.namespaces
    }

    pub fn includes(&self, namespace: &Arc<DelegationNamespace<O>>) -> bool {
        self.namespaces.iter().any(|ns| Arc::ptr_eq(ns, namespace))
    }

    /// Include a namespace unless it is already included.
    pub(crate) fn include(&mut self, namespace: Arc<DelegationNamespace<O>>) -> bool {
        if self.includes(&namespace) {
            return false;
        }
        self.namespaces.push(namespace);
        true
    }

    pub(crate) fn register_foreign_key<T: Model>(&mut self, reflection: &AggregateReflection<O, T>) {
        let reader = reflection.reader_fn();
        let writer = reflection.writer_fn();
        self.foreign_keys.push(ForeignKeyHook {
            association: reflection.name(),
            column: reflection.foreign_key(),
            pending: Box::new(move |owner: &O| reader(owner).pending_foreign_key()),
            sync: Box::new(move |owner: &mut O| writer(owner).sync_foreign_key()),
        });
    }

    /// Call a reader accessor by name.
    ///
    /// Owner readers and query readers answer from the owner; delegated ones
    /// forward to the aggregated target. Change-tracking helpers are known
    /// to [`respond_to`](Self::respond_to) but not dispatched here.
    pub fn read(&self, owner: &O, name: &str) -> Result<Value> {
        if let Some(method) = self.attribute_methods.get(name) {
            return match method.kind {
                AccessorKind::Reader => owner
                    .read_attribute(method.attribute)
                    .ok_or_else(|| Error::no_method(O::TABLE_NAME, name)),
                AccessorKind::Query => Ok(Value::Bool(
                    owner
                        .read_attribute(method.attribute)
                        .is_some_and(|v| v.is_present()),
                )),
                _ => Err(Error::no_method(O::TABLE_NAME, name)),
            };
        }
        if O::INSTANCE_METHODS.contains(&name) {
            return owner
                .read_attribute(name)
                .ok_or_else(|| Error::no_method(O::TABLE_NAME, name));
        }
        match self.delegated_method(name) {
            Some(method) => method.read(owner),
            None => Err(Error::no_method(O::TABLE_NAME, name)),
        }
    }

    /// Call a writer accessor by name (`street` or `street=`).
    pub fn write(&self, owner: &mut O, name: &str, value: Value) -> Result<()> {
        let writer = if name.ends_with('=') {
            name.to_string()
        } else {
            format!("{name}=")
        };
        let attribute = writer.trim_end_matches('=');

        if let Some(method) = self.attribute_methods.get(&writer) {
            return owner
                .write_attribute(method.attribute, value)
                .map_err(|e| e.with_attribute(method.attribute));
        }
        if O::INSTANCE_METHODS.contains(&writer.as_str()) {
            return owner
                .write_attribute(attribute, value)
                .map_err(|e| e.with_attribute(attribute));
        }
        match self.delegated_method(&writer) {
            Some(method) => method.write(owner, value),
            None => Err(Error::no_method(O::TABLE_NAME, writer)),
        }
    }

    /// Bind an owner instance for repeated calls.
    pub fn bind<'a>(&'a self, owner: &'a mut O) -> Bound<'a, O> {
        Bound { class: self, owner }
    }

    /// Foreign key values the owner must persist, without syncing.
    pub fn pending_foreign_keys(&self, owner: &O) -> Vec<ForeignKeyUpdate> {
        self.foreign_keys
            .iter()
            .filter_map(|hook| {
                (hook.pending)(owner).map(|value| ForeignKeyUpdate {
                    association: hook.association,
                    column: hook.column,
                    value,
                })
            })
            .collect()
    }

    /// Copy pending foreign key values into the owner's columns and clear
    /// the associations' update signals.
    ///
    /// Associations whose target has no key yet stay pending. The sync is
    /// all-or-nothing: when a column rejects its value, columns already
    /// written are restored and every association keeps its signals.
    #[tracing::instrument(level = "debug", skip(self, owner), fields(model = O::TABLE_NAME))]
    pub fn sync_foreign_keys(&self, owner: &mut O) -> Result<Vec<ForeignKeyUpdate>> {
        let pending: Vec<_> = self
            .foreign_keys
            .iter()
            .filter_map(|hook| (hook.pending)(owner).map(|value| (hook, value)))
            .collect();

        let mut written: Vec<(&'static str, Value)> = Vec::new();
        for (hook, value) in &pending {
            if find_field::<O>(hook.column).is_none() {
                tracing::warn!(
                    association = hook.association,
                    column = hook.column,
                    "Foreign key column is not an attribute of the owner"
                );
                continue;
            }
            let previous = owner.read_attribute(hook.column).unwrap_or(Value::Null);
            if let Err(e) = owner.write_attribute(hook.column, value.clone()) {
                restore_columns(owner, written);
                return Err(e.with_attribute(hook.column));
            }
            written.push((hook.column, previous));
        }

        let updates: Vec<_> = pending
            .into_iter()
            .map(|(hook, value)| {
                (hook.sync)(owner);
                ForeignKeyUpdate {
                    association: hook.association,
                    column: hook.column,
                    value,
                }
            })
            .collect();
        tracing::debug!(synced = updates.len(), "Synced aggregated foreign keys");
        Ok(updates)
    }
}

/// Write back column values saved before a failed sync, newest first.
fn restore_columns<O: Model>(owner: &mut O, written: Vec<(&'static str, Value)>) {
    for (column, previous) in written.into_iter().rev() {
        if let Err(e) = owner.write_attribute(column, previous) {
            tracing::error!(column, error = %e, "Could not restore foreign key column");
        }
    }
}

impl<O: Model> fmt::Debug for ModelClass<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("model", &O::TABLE_NAME)
            .field("attribute_methods", &self.attribute_methods.len())
            .field("instance_methods", &O::INSTANCE_METHODS)
            .field(
                "namespaces",
                &self
                    .namespaces
                    .iter()
                    .map(|ns| ns.association())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// An owner instance bound to its accessor table.
pub struct Bound<'a, O: Model> {
    class: &'a ModelClass<O>,
    owner: &'a mut O,
}

impl<O: Model> Bound<'_, O> {
    pub fn respond_to(&self, name: &str) -> bool {
        self.class.respond_to(name)
    }

    pub fn read(&self, name: &str) -> Result<Value> {
        self.class.read(&*self.owner, name)
    }

    pub fn write(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.class.write(&mut *self.owner, name, value.into())
    }

    pub fn owner(&self) -> &O {
        &*self.owner
    }
}
