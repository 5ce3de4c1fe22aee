use crate::error::{Intent, OrmError};
use crate::executor::Executor;
use crate::model::{decode_all, Entity};
use crate::query::{self, Filter, Pagination, QueryBuilder};
use crate::registry::Registry;
use crate::resolver;
use crate::value::Value;
use std::marker::PhantomData;

/// Typed access to one entity type over an executor.
///
/// Every operation registers the type first, so the first call on a fresh registry may create
/// its table. Typed reads (`find_*`) resolve lazy relations, `get` and `select` do not.
pub struct Handle<'r, T, X: ?Sized> {
    registry: &'r Registry,
    executor: &'r X,
    _entity: PhantomData<fn() -> T>,
}

impl<'r, T: Entity, X: Executor + ?Sized> Handle<'r, T, X> {
    pub fn new(registry: &'r Registry, executor: &'r X) -> Self {
        Handle { registry, executor, _entity: PhantomData }
    }

    fn builder(&self) -> Result<QueryBuilder, OrmError> {
        self.registry.register::<T, X>(self.executor)?;
        QueryBuilder::for_entity::<T>(self.registry)
    }

    pub fn table_name(&self) -> Result<String, OrmError> {
        self.registry.register::<T, X>(self.executor)
    }

    /// First row matching a raw predicate, or the first row at all without one.
    /// `NotFound` when nothing matches.
    pub fn get(&self, predicate: Option<&str>, args: &[Value]) -> Result<T, OrmError> {
        let stmt = self.builder()?.select(predicate, args).with_intent(Intent::SelectOne);
        T::from_row(&query::fetch_one(self.executor, &stmt)?)
    }

    pub fn select(&self, predicate: Option<&str>, args: &[Value]) -> Result<Vec<T>, OrmError> {
        let stmt = self.builder()?.select(predicate, args);
        decode_all(&query::fetch_all(self.executor, &stmt)?)
    }

    pub fn find_by_key(&self, key: i64) -> Result<T, OrmError> {
        let stmt = self.builder()?.find_by_key(key)?;
        let mut entity = T::from_row(&query::fetch_one(self.executor, &stmt)?)?;
        self.resolve(&mut entity)?;
        Ok(entity)
    }

    pub fn find_by(&self, filters: &[Filter], pagination: Pagination) -> Result<Vec<T>, OrmError> {
        let stmt = self.builder()?.find_by_filters(filters, pagination)?;
        let mut entities = decode_all(&query::fetch_all(self.executor, &stmt)?)?;
        self.resolve_all(&mut entities)?;
        Ok(entities)
    }

    pub fn find_one_by(&self, filters: &[Filter], pagination: Pagination) -> Result<T, OrmError> {
        let stmt = self.builder()?.find_by_filters(filters, pagination)?;
        let mut entity = T::from_row(&query::fetch_one(self.executor, &stmt)?)?;
        self.resolve(&mut entity)?;
        Ok(entity)
    }

    pub fn find_all(&self, pagination: Pagination) -> Result<Vec<T>, OrmError> {
        let stmt = self.builder()?.find_all(pagination)?;
        let mut entities = decode_all(&query::fetch_all(self.executor, &stmt)?)?;
        self.resolve_all(&mut entities)?;
        Ok(entities)
    }

    /// Inserts `entity` and returns its generated key.
    pub fn insert(&self, entity: &T) -> Result<i64, OrmError> {
        let stmt = self.builder()?.insert_one(entity)?;
        query::insert_returning(self.executor, &stmt)
    }

    /// Inserts all `entities` and returns the number of rows written.
    pub fn insert_many(&self, entities: &[T]) -> Result<usize, OrmError> {
        let mut written = 0;
        for stmt in self.builder()?.insert_many(entities)? {
            written += query::execute(self.executor, &stmt)?;
        }
        Ok(written)
    }

    pub fn update(&self, entity: &T) -> Result<usize, OrmError> {
        let stmt = self.builder()?.update(entity)?;
        query::execute(self.executor, &stmt)
    }

    pub fn delete(&self, key: i64) -> Result<usize, OrmError> {
        let stmt = self.builder()?.delete_by_key(key)?;
        query::execute(self.executor, &stmt)
    }

    pub fn resolve(&self, entity: &mut T) -> Result<(), OrmError> {
        self.registry.register::<T, X>(self.executor)?;
        resolver::resolve(self.registry, self.executor, entity)
    }

    pub fn resolve_all(&self, entities: &mut [T]) -> Result<(), OrmError> {
        self.registry.register::<T, X>(self.executor)?;
        resolver::resolve_all(self.registry, self.executor, entities)
    }
}
