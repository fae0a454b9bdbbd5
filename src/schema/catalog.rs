//! Schema catalog
//!
//! The catalog is the schema-introspection surface used at plan-build time.
//! It can be defined in code through `EntitySchema` or loaded from a JSON
//! file holding a list of entity definitions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SchemaError, SchemaResult};
use super::field::{FieldRef, Relation};
use super::types::ValueType;

/// Serializable field definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
}

/// Serializable relation definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationDef {
    pub name: String,
    pub target: String,
    pub foreign_key: String,
    pub target_key: String,
}

/// Serializable entity definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub id_field: String,
    pub fields: Vec<FieldDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationDef>,
}

impl EntitySchema {
    pub fn new(name: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: id_field.into(),
            fields: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Adds a field definition
    pub fn field(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            value_type,
        });
        self
    }

    /// Adds a relation definition
    pub fn relation(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        foreign_key: impl Into<String>,
        target_key: impl Into<String>,
    ) -> Self {
        self.relations.push(RelationDef {
            name: name.into(),
            target: target.into(),
            foreign_key: foreign_key.into(),
            target_key: target_key.into(),
        });
        self
    }
}

/// Resolved entity: field handles in declaration order plus relations
#[derive(Debug, Clone)]
pub struct EntityDef {
    name: String,
    id_field: FieldRef,
    fields: Vec<FieldRef>,
    relations: Vec<Relation>,
}

impl EntityDef {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id_field(&self) -> &FieldRef {
        &self.id_field
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[FieldRef] {
        &self.fields
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    pub fn field(&self, name: &str) -> Option<&FieldRef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Column position of a field within a stored row
    pub fn position(&self, field: &FieldRef) -> Option<usize> {
        self.fields.iter().position(|f| f == field)
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name() == name)
    }
}

/// Registry of entities used for plan validation
#[derive(Debug, Clone, Default)]
pub struct SchemaCatalog {
    entities: BTreeMap<String, EntityDef>,
}

impl SchemaCatalog {
    /// Builds a catalog from entity definitions.
    ///
    /// Relations may reference entities declared later in the list.
    pub fn from_definitions(definitions: Vec<EntitySchema>) -> SchemaResult<Self> {
        let mut entities = BTreeMap::new();

        for def in &definitions {
            if entities.contains_key(&def.name) {
                return Err(SchemaError::malformed(
                    &def.name,
                    "entity declared more than once",
                ));
            }

            let mut fields: Vec<FieldRef> = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                if fields.iter().any(|f| f.name() == field.name) {
                    return Err(SchemaError::malformed(
                        &def.name,
                        format!("field '{}' declared more than once", field.name),
                    ));
                }
                fields.push(FieldRef::new(&def.name, &field.name, field.value_type));
            }

            let id_field = fields
                .iter()
                .find(|f| f.name() == def.id_field)
                .cloned()
                .ok_or_else(|| {
                    SchemaError::malformed(
                        &def.name,
                        format!("id field '{}' is not declared", def.id_field),
                    )
                })?;

            entities.insert(
                def.name.clone(),
                EntityDef {
                    name: def.name.clone(),
                    id_field,
                    fields,
                    relations: Vec::new(),
                },
            );
        }

        // Second pass: every entity exists, resolve relations
        for def in &definitions {
            let mut relations = Vec::with_capacity(def.relations.len());
            for rel in &def.relations {
                let owner = &entities[&def.name];
                let foreign_key = owner.field(&rel.foreign_key).cloned().ok_or_else(|| {
                    SchemaError::malformed(
                        &def.name,
                        format!(
                            "relation '{}' uses undeclared key '{}'",
                            rel.name, rel.foreign_key
                        ),
                    )
                })?;
                let target = entities.get(&rel.target).ok_or_else(|| {
                    SchemaError::malformed(
                        &def.name,
                        format!("relation '{}' targets unknown entity '{}'", rel.name, rel.target),
                    )
                })?;
                let target_key = target.field(&rel.target_key).cloned().ok_or_else(|| {
                    SchemaError::malformed(
                        &def.name,
                        format!(
                            "relation '{}' targets undeclared key '{}.{}'",
                            rel.name, rel.target, rel.target_key
                        ),
                    )
                })?;
                if foreign_key.value_type() != target_key.value_type() {
                    return Err(SchemaError::malformed(
                        &def.name,
                        format!("relation '{}' joins keys of different types", rel.name),
                    ));
                }
                relations.push(Relation::new(&rel.name, foreign_key, target_key));
            }
            if let Some(entity) = entities.get_mut(&def.name) {
                entity.relations = relations;
            }
        }

        Ok(Self { entities })
    }

    /// Parses a JSON array of entity definitions
    pub fn from_json_str(origin: &str, json: &str) -> SchemaResult<Self> {
        let definitions: Vec<EntitySchema> = serde_json::from_str(json)
            .map_err(|e| SchemaError::malformed(origin, format!("Invalid JSON: {}", e)))?;
        Self::from_definitions(definitions)
    }

    /// Loads a catalog file from disk
    pub fn load(path: &Path) -> SchemaResult<Self> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path)
            .map_err(|e| SchemaError::malformed(&origin, format!("Failed to read: {}", e)))?;
        Self::from_json_str(&origin, &content)
    }

    pub fn entity(&self, name: &str) -> SchemaResult<&EntityDef> {
        self.entities
            .get(name)
            .ok_or_else(|| SchemaError::UnknownEntity(name.to_string()))
    }

    /// Looks up a field handle by entity and column name
    pub fn field(&self, entity: &str, name: &str) -> SchemaResult<FieldRef> {
        self.entity(entity)?
            .field(name)
            .cloned()
            .ok_or_else(|| SchemaError::unknown_field(entity, name))
    }

    pub fn relation(&self, entity: &str, name: &str) -> SchemaResult<Relation> {
        self.entity(entity)?
            .relation(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownRelation {
                entity: entity.to_string(),
                relation: name.to_string(),
            })
    }

    /// Checks that a field handle exists in this catalog with the same type
    pub fn validate_field(&self, field: &FieldRef) -> SchemaResult<()> {
        let declared = self.field(field.entity(), field.name())?;
        if declared.value_type() != field.value_type() {
            return Err(SchemaError::mismatch(&declared, field.value_type().type_name()));
        }
        Ok(())
    }

    /// Entity names in sorted order
    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}
