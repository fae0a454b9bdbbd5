//! Entity cache
//!
//! `PersistenceContext` is an identity map: each entity row is loaded from
//! the data source at most once and then served from memory. Bulk writes go
//! straight to the source, so cached copies go stale until the cache is
//! invalidated. Registering the context with the executor makes that
//! automatic.

mod errors;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::executor::DataSource;
use crate::planner::QueryFactory;
use crate::projection::Tuple;
use crate::schema::Value;

pub use errors::{CacheError, CacheResult};

/// Notified after a bulk write changed rows of an entity
pub trait CacheInvalidation: Send + Sync {
    fn invalidate(&self, entity: &str);
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntityKey {
    entity: String,
    id: String,
}

impl EntityKey {
    fn new(entity: &str, id: &Value) -> Self {
        Self {
            entity: entity.to_string(),
            id: id.to_literal(),
        }
    }
}

/// Identity map of materialized entity rows
pub struct PersistenceContext {
    source: Arc<dyn DataSource>,
    entries: RwLock<HashMap<EntityKey, Tuple>>,
}

impl PersistenceContext {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self {
            source,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the entity with the given id, loading it on first access.
    ///
    /// A cached copy is returned as is, even if the source changed since.
    pub fn find(&self, entity: &str, id: impl Into<Value>) -> CacheResult<Option<Tuple>> {
        let id = id.into();
        let key = EntityKey::new(entity, &id);
        if let Some(cached) = self.read_entries().get(&key) {
            return Ok(Some(cached.clone()));
        }

        let catalog = self.source.schema();
        let id_field = catalog.entity(entity)?.id_field().clone();
        let select = QueryFactory::new(catalog)
            .select_from(entity)
            .filter(id_field.eq(id)?)
            .build()?;

        let mut rows = self.source.fetch(select.plan())?;
        let row = match rows.len() {
            0 => return Ok(None),
            1 => rows.remove(0),
            _ => {
                return Err(CacheError::DuplicateId {
                    entity: entity.to_string(),
                    id: key.id,
                })
            }
        };
        let tuple = select
            .projector()
            .project(select.plan().selection(), row.into_values())?;

        self.write_entries().insert(key, tuple.clone());
        Ok(Some(tuple))
    }

    pub fn contains(&self, entity: &str, id: impl Into<Value>) -> bool {
        self.read_entries()
            .contains_key(&EntityKey::new(entity, &id.into()))
    }

    /// Drops every cached row of one entity
    pub fn evict_entity(&self, entity: &str) {
        self.write_entries().retain(|key, _| key.entity != entity);
    }

    pub fn clear(&self) {
        self.write_entries().clear();
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_entries().is_empty()
    }

    // Entries are plain copies, so a poisoned lock still holds usable data
    fn read_entries(&self) -> std::sync::RwLockReadGuard<'_, HashMap<EntityKey, Tuple>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<EntityKey, Tuple>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl CacheInvalidation for PersistenceContext {
    fn invalidate(&self, entity: &str) {
        self.evict_entity(entity);
    }
}
