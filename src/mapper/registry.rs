use crate::error::{constants, CodecError, Result};
use crate::mapper::adapter::{Adapter, BiAdapter, BiSerializable, SerializableAdapter, TypedAdapter};
use crate::mapper::deserializer::Deserializer;
use crate::mapper::serializer::Serializer;
use crate::types::Value;
use arc_swap::ArcSwap;
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Immutable snapshot of the adapters visible through a [`Mapper`].
///
/// Every adapter is reachable both by its target type and by its type name.
#[derive(Clone, Default)]
pub struct AdapterTable {
    by_type: HashMap<TypeId, Arc<dyn Adapter>>,
    by_name: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterTable {
    pub fn by_type(&self, id: TypeId) -> Option<&Arc<dyn Adapter>> {
        self.by_type.get(&id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn Adapter>> {
        self.by_name.get(name)
    }

    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Registered type names, unordered.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    fn adapters(&self) -> impl Iterator<Item = &Arc<dyn Adapter>> {
        self.by_type.values()
    }

    fn insert(&mut self, adapter: Arc<dyn Adapter>) {
        self.remove(adapter.target_type());
        self.by_name
            .insert(adapter.type_name().to_string(), adapter.clone());
        self.by_type.insert(adapter.target_type(), adapter);
    }

    fn remove(&mut self, id: TypeId) -> Option<Arc<dyn Adapter>> {
        let adapter = self.by_type.remove(&id)?;
        let same_name = self
            .by_name
            .get(adapter.type_name())
            .is_some_and(|named| Arc::ptr_eq(named, &adapter));
        if same_name {
            self.by_name.remove(adapter.type_name());
        }
        Some(adapter)
    }
}

impl fmt::Debug for AdapterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("AdapterTable").field("names", &names).finish()
    }
}

/// Adapters registered directly on a mapper, plus the source types it hides.
#[derive(Clone, Default)]
struct LocalState {
    table: Arc<AdapterTable>,
    excluded: HashSet<TypeId>,
}

/// Cached merge of a derived mapper's source and local state.
struct MergedView {
    revision: u64,
    table: Arc<AdapterTable>,
}

struct Parent {
    source: Arc<Mapper>,
    merged: ArcSwap<MergedView>,
    rebuild_lock: Mutex<()>,
}

/// Name-keyed adapter registry.
///
/// Resolution reads a lock-free snapshot; registration takes a lock, copies
/// the table, and bumps the revision counter. A mapper created with
/// [`Mapper::derive`] sees its source's adapters (minus the excluded types)
/// and rebuilds that view whenever the source's revision has advanced.
pub struct Mapper {
    local: ArcSwap<LocalState>,
    write_lock: Mutex<()>,
    local_revision: AtomicU64,
    parent: Option<Parent>,
}

impl Default for Mapper {
    fn default() -> Self {
        Self::new()
    }
}

impl Mapper {
    pub fn new() -> Self {
        Self {
            local: ArcSwap::from_pointee(LocalState::default()),
            write_lock: Mutex::new(()),
            local_revision: AtomicU64::new(0),
            parent: None,
        }
    }

    /// Root mapper pre-populated with adapters, built without locking.
    pub(crate) fn with_adapters<I>(adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn Adapter>>,
    {
        let mut table = AdapterTable::default();
        for adapter in adapters {
            table.insert(adapter);
        }
        let state = LocalState {
            table: Arc::new(table),
            excluded: HashSet::new(),
        };
        Self {
            local: ArcSwap::from_pointee(state),
            write_lock: Mutex::new(()),
            local_revision: AtomicU64::new(1),
            parent: None,
        }
    }

    /// Layer a mapper over `source`, hiding the adapters for `excluded` types.
    pub fn derive<I>(source: &Arc<Mapper>, excluded: I) -> Self
    where
        I: IntoIterator<Item = TypeId>,
    {
        let local = LocalState {
            table: Arc::default(),
            excluded: excluded.into_iter().collect(),
        };
        let revision = source.revision();
        let table = Arc::new(merge(&source.snapshot(), &local));
        Self {
            local: ArcSwap::from_pointee(local),
            write_lock: Mutex::new(()),
            local_revision: AtomicU64::new(0),
            parent: Some(Parent {
                source: source.clone(),
                merged: ArcSwap::from_pointee(MergedView { revision, table }),
                rebuild_lock: Mutex::new(()),
            }),
        }
    }

    /// Monotonic counter, advanced by every registration here or in a source mapper.
    pub fn revision(&self) -> u64 {
        let own = self.local_revision.load(Ordering::SeqCst);
        match &self.parent {
            Some(parent) => own + parent.source.revision(),
            None => own,
        }
    }

    /// Consistent view of every adapter visible through this mapper.
    pub fn snapshot(&self) -> Arc<AdapterTable> {
        let Some(parent) = &self.parent else {
            return self.local.load().table.clone();
        };

        let revision = self.revision();
        let view = parent.merged.load();
        if view.revision == revision {
            return view.table.clone();
        }

        // A poisoned rebuild lock only means another rebuild panicked; the
        // merged view is replaced atomically, so it is still consistent.
        let _guard = parent
            .rebuild_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let view = parent.merged.load();
        if view.revision == revision {
            return view.table.clone();
        }

        let table = Arc::new(merge(&parent.source.snapshot(), &self.local.load()));
        parent.merged.store(Arc::new(MergedView {
            revision,
            table: table.clone(),
        }));
        debug!(revision, adapters = table.len(), "Derived mapper rebuilt");
        table
    }

    pub fn resolve_type(&self, id: TypeId) -> Option<Arc<dyn Adapter>> {
        self.snapshot().by_type(id).cloned()
    }

    pub fn resolve_name(&self, name: &str) -> Option<Arc<dyn Adapter>> {
        self.snapshot().by_name(name).cloned()
    }

    /// Register a type-erased adapter.
    pub fn register_adapter(&self, adapter: Arc<dyn Adapter>) -> Result<()> {
        if adapter.type_name().is_empty() {
            return Err(CodecError::InvalidValue(format!(
                "adapter for {} has an empty type name",
                adapter.target_type_name()
            )));
        }
        let name = adapter.type_name().to_string();
        self.update(|state| {
            state.excluded.remove(&adapter.target_type());
            Arc::make_mut(&mut state.table).insert(adapter.clone());
        })?;
        debug!(type_name = %name, "Adapter registered");
        Ok(())
    }

    /// Register a typed adapter for `T`.
    pub fn register<T, A>(&self, adapter: A) -> Result<()>
    where
        T: Any + Send + Sync,
        A: BiAdapter<T>,
    {
        self.register_adapter(Arc::new(TypedAdapter::new(adapter)))
    }

    /// Register a type that serializes itself.
    pub fn register_serializable<T: BiSerializable>(&self) -> Result<()> {
        self.register::<T, _>(SerializableAdapter::<T>::new())
    }

    /// Remove the adapter for `T`. Returns whether one was visible.
    pub fn unregister<T: Any>(&self) -> Result<bool> {
        self.unregister_type(TypeId::of::<T>())
    }

    pub fn unregister_type(&self, id: TypeId) -> Result<bool> {
        let visible = self.snapshot().by_type(id).is_some();
        if !visible {
            return Ok(false);
        }
        let derived = self.parent.is_some();
        self.update(|state| {
            Arc::make_mut(&mut state.table).remove(id);
            if derived {
                state.excluded.insert(id);
            }
        })?;
        debug!(type_id = ?id, "Adapter unregistered");
        Ok(true)
    }

    /// Serialize with a fresh session over this mapper.
    pub fn serialize(&self, value: &Value) -> Result<Value> {
        Serializer::new(self).serialize(value)
    }

    /// Deserialize with a fresh session over this mapper.
    pub fn deserialize(&self, value: &Value) -> Result<Value> {
        Deserializer::new(self).deserialize(value)
    }

    pub fn new_serializer(&self) -> Serializer {
        Serializer::new(self)
    }

    pub fn new_deserializer(&self) -> Deserializer {
        Deserializer::new(self)
    }

    fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut LocalState),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CodecError::LockPoisoned(constants::ERR_MAPPER_WRITE_LOCK))?;
        let mut state = LocalState::clone(&self.local.load());
        mutate(&mut state);
        self.local.store(Arc::new(state));
        self.local_revision.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl fmt::Debug for Mapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapper")
            .field("revision", &self.revision())
            .field("derived", &self.parent.is_some())
            .field("adapters", &self.snapshot())
            .finish()
    }
}

fn merge(source: &AdapterTable, local: &LocalState) -> AdapterTable {
    let mut table = source.clone();
    for id in &local.excluded {
        table.remove(*id);
    }
    for adapter in local.table.adapters() {
        table.insert(adapter.clone());
    }
    table
}
