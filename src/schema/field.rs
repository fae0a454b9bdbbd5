//! Field references and relations
//!
//! A `FieldRef` is created once when a catalog is defined and then shared by
//! every query touching that column. Cloning is a reference-count bump.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::types::ValueType;

#[derive(Debug)]
struct FieldInner {
    entity: String,
    name: String,
    value_type: ValueType,
}

/// Typed handle to a queryable column
#[derive(Clone)]
pub struct FieldRef {
    inner: Arc<FieldInner>,
}

impl FieldRef {
    /// Creates a new field handle
    pub fn new(entity: impl Into<String>, name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            inner: Arc::new(FieldInner {
                entity: entity.into(),
                name: name.into(),
                value_type,
            }),
        }
    }

    /// Column name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Name of the entity that owns the column
    pub fn entity(&self) -> &str {
        &self.inner.entity
    }

    /// Declared value type
    pub fn value_type(&self) -> ValueType {
        self.inner.value_type
    }

    /// `entity.name`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.inner.entity, self.inner.name)
    }
}

impl PartialEq for FieldRef {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.entity == other.inner.entity && self.inner.name == other.inner.name)
    }
}

impl Eq for FieldRef {}

impl Hash for FieldRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.entity.hash(state);
        self.inner.name.hash(state);
    }
}

impl fmt::Debug for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.qualified_name(), self.inner.value_type)
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.inner.entity, self.inner.name)
    }
}

/// Inner-join path from one entity to another (e.g. `member.team`)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Relation {
    name: String,
    from_entity: String,
    to_entity: String,
    foreign_key: FieldRef,
    target_key: FieldRef,
}

impl Relation {
    pub fn new(name: impl Into<String>, foreign_key: FieldRef, target_key: FieldRef) -> Self {
        Self {
            name: name.into(),
            from_entity: foreign_key.entity().to_string(),
            to_entity: target_key.entity().to_string(),
            foreign_key,
            target_key,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn from_entity(&self) -> &str {
        &self.from_entity
    }

    pub fn to_entity(&self) -> &str {
        &self.to_entity
    }

    /// Column on the owning side holding the reference
    pub fn foreign_key(&self) -> &FieldRef {
        &self.foreign_key
    }

    /// Column on the target side being referenced
    pub fn target_key(&self) -> &FieldRef {
        &self.target_key
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.from_entity, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_field_identity() {
        let a = FieldRef::new("member", "age", ValueType::Int);
        let b = FieldRef::new("member", "age", ValueType::Int);
        let c = FieldRef::new("team", "age", ValueType::Int);

        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<FieldRef> = [a.clone(), b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.qualified_name(), "member.age");
    }

    #[test]
    fn test_clone_shares_handle() {
        let a = FieldRef::new("member", "username", ValueType::String);
        let b = a.clone();
        assert!(Arc::ptr_eq(&a.inner, &b.inner));
    }

    #[test]
    fn test_relation_endpoints() {
        let fk = FieldRef::new("member", "team_id", ValueType::Int);
        let pk = FieldRef::new("team", "id", ValueType::Int);
        let rel = Relation::new("team", fk, pk);

        assert_eq!(rel.from_entity(), "member");
        assert_eq!(rel.to_entity(), "team");
        assert_eq!(rel.to_string(), "member.team");
    }
}
