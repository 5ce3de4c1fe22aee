use crate::error::OrmError;
use crate::executor::Executor;
use crate::handle::Handle;
use crate::meta::{self, Described, TypeDescriptor, TypeKey};
use crate::model::{Entity, EntityInfo};
use crate::naming;
use crate::resolver::RelationPlan;
use crate::schema;
use crate::settings::SchemaSettings;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

/// Reverse-map entry: which type owns a table and how it is shaped.
#[derive(Debug, Clone, Copy)]
pub struct Registered {
    pub key: TypeKey,
    pub descriptor: TypeDescriptor,
}

#[derive(Default)]
struct Tables {
    by_type: HashMap<TypeKey, String>,
    by_table: HashMap<String, Registered>,
}

/// Bidirectional entity type ↔ table map, plus the relation plan cache.
///
/// Entries are written once and never removed. Both directions change under a single write lock.
pub struct Registry {
    tables: RwLock<Tables>,
    writer: Mutex<()>,
    plans: RwLock<HashMap<(TypeKey, &'static str), Arc<RelationPlan>>>,
    bootstrap: bool,
}

impl Default for Registry {
    fn default() -> Self {
        Registry::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Registry::with_settings(&SchemaSettings { bootstrap: true })
    }

    pub fn with_settings(settings: &SchemaSettings) -> Self {
        Registry {
            tables: RwLock::new(Tables::default()),
            writer: Mutex::new(()),
            plans: RwLock::new(HashMap::new()),
            bootstrap: settings.bootstrap,
        }
    }

    /// Binds `descriptor`'s type to `table`. The first binding of a type wins and is returned.
    pub fn bind(&self, descriptor: &TypeDescriptor, table: &str) -> Result<String, OrmError> {
        let mut tables = self.tables.write();
        if let Some(bound) = tables.by_type.get(&descriptor.key) {
            return Ok(bound.clone());
        }
        if let Some(owner) = tables.by_table.get(table) {
            warn!(table, bound = owner.key.name(), requested = descriptor.name, "refusing to rebind table");
            return Err(OrmError::TableConflict { table: table.to_string(), bound: owner.descriptor.name, requested: descriptor.name });
        }
        tables.by_type.insert(descriptor.key, table.to_string());
        tables.by_table.insert(table.to_string(), Registered { key: descriptor.key, descriptor: *descriptor });
        Ok(table.to_string())
    }

    pub fn table_name(&self, key: TypeKey) -> Option<String> {
        self.tables.read().by_type.get(&key).cloned()
    }

    pub fn table_of<T: Described>(&self) -> Option<String> {
        self.table_name(TypeKey::of::<T>())
    }

    pub fn entity_by_table(&self, table: &str) -> Option<Registered> {
        self.tables.read().by_table.get(table).copied()
    }

    pub fn is_registered<T: Described>(&self) -> bool {
        self.table_of::<T>().is_some()
    }

    /// First-use registration of `T`: name resolution, metadata validation, schema bootstrap
    /// and binding. Runs at most once per type; later calls return the bound table.
    /// A table already owned by another type is refused before any statement runs.
    pub fn register<T: Entity, X: Executor + ?Sized>(&self, executor: &X) -> Result<String, OrmError> {
        let key = TypeKey::of::<T>();
        if let Some(table) = self.table_name(key) {
            return Ok(table);
        }
        let _guard = self.writer.lock();
        if let Some(table) = self.table_name(key) {
            return Ok(table);
        }
        let descriptor = T::descriptor();
        let table = T::TABLE.map(str::to_string).unwrap_or_else(|| naming::table_name_for(descriptor.name));
        meta::extract(&descriptor, true)?;
        if let Some(owner) = self.entity_by_table(&table) {
            warn!(table = %table, bound = owner.key.name(), requested = descriptor.name, "refusing to bootstrap a bound table");
            return Err(OrmError::TableConflict { table, bound: owner.descriptor.name, requested: descriptor.name });
        }
        if self.bootstrap {
            schema::ensure_table(executor, self, &descriptor, &table)?;
        }
        let bound = self.bind(&descriptor, &table)?;
        info!(entity = descriptor.name, table = %bound, "registered entity");
        Ok(bound)
    }

    /// Registers every entity type deriving `Entity` in this binary.
    pub fn register_all(&self, executor: &dyn Executor) -> Result<Vec<String>, OrmError> {
        let mut infos: Vec<&EntityInfo> = inventory::iter::<EntityInfo>.into_iter().collect();
        infos.sort_by_key(|info| info.name);
        infos.into_iter().map(|info| (info.bootstrap)(self, executor)).collect()
    }

    pub fn handle<'r, T: Entity, X: Executor + ?Sized>(&'r self, executor: &'r X) -> Handle<'r, T, X> {
        Handle::new(self, executor)
    }

    pub(crate) fn cached_plan(&self, key: TypeKey, field: &'static str) -> Option<Arc<RelationPlan>> {
        self.plans.read().get(&(key, field)).cloned()
    }

    pub(crate) fn cache_plan(&self, key: TypeKey, field: &'static str, plan: RelationPlan) -> Arc<RelationPlan> {
        self.plans.write().entry((key, field)).or_insert_with(|| Arc::new(plan)).clone()
    }
}
