//! Aggregated belongs-to associations.
//!
//! An owner model holds an [`Aggregated<T>`] field for each aggregated record it
//! references, and the association is described once per owner type by an
//! [`AggregateReflection`]. The reflection is what the delegation builder
//! extends; it also caches the resulting delegation namespace for the rest of
//! the process.
//!
//! [`Aggregated::updated`] decides whether the owner's foreign key must be
//! persisted: either the association itself was reassigned, or the resolved
//! target reports through [`AggregationAware`] that an aggregation-style lookup
//! created or changed it.

use std::fmt;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::Result;
use crate::config::DelegationConfig;
use crate::delegation::DelegationNamespace;
use crate::model::Model;
use crate::value::Value;

/// Capability of a target record that can be created or changed as a side
/// effect of an aggregation-style lookup (find-or-create).
pub trait AggregationAware {
    /// Whether the last lookup created or changed this record.
    fn updated_as_aggregated(&self) -> bool;

    /// Forget the lookup signal once the owner's foreign key is synced.
    fn clear_updated_as_aggregated(&mut self) {}
}

/// Embeddable flag implementing [`AggregationAware`].
///
/// A target model keeps one as a non-column field and returns it from
/// [`Model::aggregation_aware`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationFlag {
    updated: bool,
}

impl AggregationFlag {
    pub const fn new() -> Self {
        Self { updated: false }
    }

    /// Record that the lookup created or changed the record.
    pub fn mark(&mut self) {
        self.updated = true;
    }

    pub fn clear(&mut self) {
        self.updated = false;
    }

    pub const fn is_set(&self) -> bool {
        self.updated
    }
}

impl AggregationAware for AggregationFlag {
    fn updated_as_aggregated(&self) -> bool {
        self.updated
    }

    fn clear_updated_as_aggregated(&mut self) {
        self.clear();
    }
}

/// Runtime state of one aggregated association on an owner instance.
///
/// This wrapper can be in one of three states:
/// - **Empty**: no foreign key and nothing resolved
/// - **Unloaded**: has a foreign key value but the target was not resolved yet
/// - **Resolved**: a target record is held (loaded, looked up or built)
pub struct Aggregated<T: Model> {
    fk_value: Option<Value>,
    target: Option<T>,
    updated: bool,
}

impl<T: Model> Aggregated<T> {
    /// Create an empty association (null FK, nothing resolved).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            fk_value: None,
            target: None,
            updated: false,
        }
    }

    /// Create from a foreign key value (not yet resolved).
    #[must_use]
    pub fn from_fk(fk: impl Into<Value>) -> Self {
        let fk = fk.into();
        Self {
            fk_value: (!fk.is_null()).then_some(fk),
            target: None,
            updated: false,
        }
    }

    /// Create with a target loaded from storage.
    ///
    /// Loading is not an update: the owner's foreign key already points here.
    #[must_use]
    pub fn loaded(target: T) -> Self {
        Self {
            fk_value: key_of(&target),
            target: Some(target),
            updated: false,
        }
    }

    /// The resolved target, if any.
    #[must_use]
    pub fn target(&self) -> Option<&T> {
        self.target.as_ref()
    }

    pub fn target_mut(&mut self) -> Option<&mut T> {
        self.target.as_mut()
    }

    /// Check if a target is resolved.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.target.is_some()
    }

    /// Check if the association is empty (no FK and nothing resolved).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fk_value.is_none() && self.target.is_none()
    }

    /// The foreign key value last known to the owner.
    #[must_use]
    pub fn fk(&self) -> Option<&Value> {
        self.fk_value.as_ref()
    }

    /// The association's own updated flag, set on reassignment.
    #[must_use]
    pub fn is_marked_updated(&self) -> bool {
        self.updated
    }

    /// Assign a new target. Marks the association updated.
    pub fn replace(&mut self, target: T) {
        self.fk_value = key_of(&target);
        self.target = Some(target);
        self.updated = true;
    }

    /// Detach the target. The owner's foreign key becomes NULL on sync.
    pub fn clear(&mut self) {
        self.fk_value = None;
        self.target = None;
        self.updated = true;
    }

    /// Hold the result of a lookup for the current foreign key.
    ///
    /// The association's own flag is left alone; whether the lookup created
    /// or changed the record is the target's [`AggregationAware`] signal.
    pub fn resolve(&mut self, target: T) {
        self.target = Some(target);
    }

    /// Drop the resolved target, keeping the foreign key.
    pub fn reset(&mut self) {
        self.target = None;
        self.updated = false;
    }

    /// Whether the owner's foreign key must be persisted with the owner.
    ///
    /// True when the association was reassigned, or when the resolved target
    /// reports it was updated as an aggregate. An unresolved target counts
    /// as not updated.
    #[must_use]
    pub fn updated(&self) -> bool {
        self.updated
            || self
                .target
                .as_ref()
                .and_then(|t| t.aggregation_aware())
                .is_some_and(|aware| aware.updated_as_aggregated())
    }

    /// The foreign key value the owner must persist, without syncing.
    ///
    /// `None` when nothing needs persisting, or when the target is not yet
    /// saved and so has no key to point at.
    #[must_use]
    pub fn pending_foreign_key(&self) -> Option<Value> {
        if !self.updated() {
            return None;
        }
        match &self.target {
            None => Some(Value::Null),
            Some(target) => key_of(target),
        }
    }

    /// Take the foreign key value to persist and clear both update signals.
    ///
    /// Returns `None` (and keeps the signals) when [`pending_foreign_key`]
    /// has nothing to offer.
    ///
    /// [`pending_foreign_key`]: Self::pending_foreign_key
    pub fn sync_foreign_key(&mut self) -> Option<Value> {
        let Some(key) = self.pending_foreign_key() else {
            if self.updated() {
                tracing::debug!(
                    target_table = T::TABLE_NAME,
                    "Aggregated target has no primary key yet; foreign key sync deferred"
                );
            }
            return None;
        };
        self.fk_value = (!key.is_null()).then(|| key.clone());
        self.updated = false;
        if let Some(aware) = self.target.as_mut().and_then(|t| t.aggregation_aware_mut()) {
            aware.clear_updated_as_aggregated();
        }
        Some(key)
    }
}

impl<T: Model + Default> Aggregated<T> {
    /// Assign a freshly built default target and return it.
    pub fn build(&mut self) -> &mut T {
        self.fk_value = None;
        self.updated = true;
        self.target.insert(T::default())
    }

    /// The resolved target, building a default one when none is resolved.
    ///
    /// Unlike `try_edit_effective`, a built target is installed right away.
    pub fn effective_mut(&mut self) -> &mut T {
        if self.target.is_none() {
            tracing::trace!(
                target_table = T::TABLE_NAME,
                "Building aggregated target for write"
            );
            self.fk_value = None;
            self.updated = true;
        }
        self.target.get_or_insert_with(T::default)
    }

    /// Apply a fallible edit to the effective target.
    ///
    /// With no resolved target the edit runs on a fresh default record, which
    /// replaces the association only when the edit succeeds. A failed edit
    /// leaves the foreign key, the target and the updated flag as they were.
    pub fn try_edit_effective<R>(
        &mut self,
        edit: impl FnOnce(&mut T) -> Result<R>,
    ) -> Result<R> {
        if let Some(target) = self.target.as_mut() {
            return edit(target);
        }
        let mut built = T::default();
        let out = edit(&mut built)?;
        tracing::trace!(
            target_table = T::TABLE_NAME,
            "Building aggregated target for write"
        );
        self.fk_value = None;
        self.updated = true;
        self.target = Some(built);
        Ok(out)
    }
}

/// Single-column primary key of a persisted record.
fn key_of<T: Model>(record: &T) -> Option<Value> {
    let mut pk = record.primary_key_value();
    if pk.len() != 1 {
        return None;
    }
    pk.pop().filter(|v| !v.is_null())
}

impl<T: Model> Default for Aggregated<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Model + Clone> Clone for Aggregated<T> {
    fn clone(&self) -> Self {
        Self {
            fk_value: self.fk_value.clone(),
            target: self.target.clone(),
            updated: self.updated,
        }
    }
}

impl<T: Model + fmt::Debug> fmt::Debug for Aggregated<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_loaded() {
            "resolved"
        } else if self.is_empty() {
            "empty"
        } else {
            "unloaded"
        };

        f.debug_struct("Aggregated")
            .field("state", &state)
            .field("fk_value", &self.fk_value)
            .field("target", &self.target)
            .field("updated", &self.updated)
            .finish()
    }
}

impl<T> Serialize for Aggregated<T>
where
    T: Model + Serialize,
{
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.target {
            Some(target) => target.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de, T> Deserialize<'de> for Aggregated<T>
where
    T: Model + Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let opt = Option::<T>::deserialize(deserializer)?;
        Ok(match opt {
            Some(target) => Self::loaded(target),
            None => Self::empty(),
        })
    }
}

/// Descriptor of one aggregated association declared on owner model `O`
/// with target model `T`.
///
/// Built once when the owner type is set up and kept for the process
/// (typically in a `LazyLock` static). Its delegation namespace is created by
/// the first [`extend`](crate::extend) call and reused by every later one.
pub struct AggregateReflection<O: Model, T: Model> {
    name: &'static str,
    foreign_key: &'static str,
    reader: fn(&O) -> &Aggregated<T>,
    writer: fn(&mut O) -> &mut Aggregated<T>,
    config: DelegationConfig,
    effective_reader: String,
    namespace: OnceLock<Arc<DelegationNamespace<O>>>,
}

impl<O: Model, T: Model> AggregateReflection<O, T> {
    /// Describe an association.
    ///
    /// `reader` and `writer` project the owner onto its `Aggregated<T>`
    /// field; `foreign_key` is the owner's column holding the target key.
    pub fn new(
        name: &'static str,
        foreign_key: &'static str,
        reader: fn(&O) -> &Aggregated<T>,
        writer: fn(&mut O) -> &mut Aggregated<T>,
    ) -> Self {
        let config = DelegationConfig::new();
        let effective_reader = config.effective_reader(name);
        Self {
            name,
            foreign_key,
            reader,
            writer,
            config,
            effective_reader,
            namespace: OnceLock::new(),
        }
    }

    /// Use a custom delegation config.
    pub fn with_config(mut self, config: DelegationConfig) -> Self {
        self.effective_reader = config.effective_reader(self.name);
        self.config = config;
        self
    }

    /// Association name (`address`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Owner column holding the target key (`address_id`).
    pub fn foreign_key(&self) -> &'static str {
        self.foreign_key
    }

    /// Name of the effective reader delegated accessors route through.
    pub fn effective_reader(&self) -> &str {
        &self.effective_reader
    }

    pub fn config(&self) -> &DelegationConfig {
        &self.config
    }

    /// Table name of the target model.
    pub fn target_table(&self) -> &'static str {
        T::TABLE_NAME
    }

    /// The owner's association state.
    pub fn association<'a>(&self, owner: &'a O) -> &'a Aggregated<T> {
        (self.reader)(owner)
    }

    pub fn association_mut<'a>(&self, owner: &'a mut O) -> &'a mut Aggregated<T> {
        (self.writer)(owner)
    }

    /// The owner's resolved target, if any.
    pub fn effective<'a>(&self, owner: &'a O) -> Option<&'a T> {
        self.association(owner).target()
    }

    /// Whether the owner's foreign key must be persisted.
    pub fn updated(&self, owner: &O) -> bool {
        self.association(owner).updated()
    }

    /// Take the foreign key value the owner must persist.
    pub fn sync_foreign_key(&self, owner: &mut O) -> Option<Value> {
        let key = self.association_mut(owner).sync_foreign_key();
        if let Some(value) = &key {
            tracing::debug!(
                owner = O::TABLE_NAME,
                association = self.name,
                column = self.foreign_key,
                value = ?value,
                "Synced aggregated foreign key"
            );
        }
        key
    }

    /// The cached delegation namespace, once the association was extended.
    pub fn namespace(&self) -> Option<&Arc<DelegationNamespace<O>>> {
        self.namespace.get()
    }

    pub fn is_extended(&self) -> bool {
        self.namespace.get().is_some()
    }

    pub(crate) fn reader_fn(&self) -> fn(&O) -> &Aggregated<T> {
        self.reader
    }

    pub(crate) fn writer_fn(&self) -> fn(&mut O) -> &mut Aggregated<T> {
        self.writer
    }

    /// Return the cached namespace, building it on first use.
    ///
    /// A build error leaves the cache empty.
    pub(crate) fn namespace_or_try_init(
        &self,
        build: impl FnOnce() -> Result<DelegationNamespace<O>>,
    ) -> Result<Arc<DelegationNamespace<O>>> {
        if let Some(existing) = self.namespace.get() {
            return Ok(Arc::clone(existing));
        }
        let built = Arc::new(build()?);
        Ok(Arc::clone(self.namespace.get_or_init(|| built)))
    }
}

impl<O: Model, T: Model + Default> AggregateReflection<O, T> {
    /// The `effective_<association>` reader: the resolved target, built
    /// when none is resolved.
    pub fn effective_mut<'a>(&self, owner: &'a mut O) -> &'a mut T {
        self.association_mut(owner).effective_mut()
    }
}

impl<O: Model, T: Model> fmt::Debug for AggregateReflection<O, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateReflection")
            .field("owner", &O::TABLE_NAME)
            .field("name", &self.name)
            .field("target", &T::TABLE_NAME)
            .field("foreign_key", &self.foreign_key)
            .field("effective_reader", &self.effective_reader)
            .field("extended", &self.is_extended())
            .finish_non_exhaustive()
    }
}
