//! Member/Team sample schema
//!
//! Used by the CLI scenarios and the integration tests.
//!
//! Seed data:
//!
//! | id | username | age | team  |
//! |----|----------|-----|-------|
//! | 1  | member1  | 10  | teamA |
//! | 2  | member2  | 20  | teamA |
//! | 3  | member3  | 30  | teamB |
//! | 4  | member4  | 40  | teamB |

mod dto;
mod search;

use thiserror::Error;

use crate::executor::{DataSourceError, DataSourceResult};
use crate::memory::MemoryDataSource;
use crate::schema::{EntitySchema, FieldRef, Relation, SchemaCatalog, SchemaError, SchemaResult, Value, ValueType};

pub use dto::{Member, MemberDto, UserDto};
pub use search::{age_eq, search_members, search_members_where, username_eq};

pub const MEMBER: &str = "member";
pub const TEAM: &str = "team";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SampleError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Source(#[from] DataSourceError),
}

impl SampleError {
    pub fn code(&self) -> &'static str {
        match self {
            SampleError::Schema(e) => e.code(),
            SampleError::Source(e) => e.code(),
        }
    }
}

/// The member/team catalog
pub fn catalog() -> SchemaResult<SchemaCatalog> {
    SchemaCatalog::from_definitions(vec![
        EntitySchema::new(MEMBER, "id")
            .field("id", ValueType::Int)
            .field("username", ValueType::String)
            .field("age", ValueType::Int)
            .field("team_id", ValueType::Int)
            .relation("team", TEAM, "team_id", "id"),
        EntitySchema::new(TEAM, "id")
            .field("id", ValueType::Int)
            .field("name", ValueType::String),
    ])
}

/// Inserts the two teams and four members
pub fn seed(source: &MemoryDataSource) -> DataSourceResult<()> {
    source.insert(TEAM, vec![Value::Int(1), Value::from("teamA")])?;
    source.insert(TEAM, vec![Value::Int(2), Value::from("teamB")])?;

    for id in 1..=4i64 {
        let team_id = if id <= 2 { 1 } else { 2 };
        source.insert(
            MEMBER,
            vec![
                Value::Int(id),
                Value::from(format!("member{}", id)),
                Value::Int(id * 10),
                Value::Int(team_id),
            ],
        )?;
    }
    Ok(())
}

/// In-memory source holding the seed data
pub fn seeded_source() -> Result<MemoryDataSource, SampleError> {
    let source = MemoryDataSource::new(catalog()?);
    seed(&source)?;
    Ok(source)
}

/// Field handles of `member`
#[derive(Debug, Clone)]
pub struct QMember {
    pub id: FieldRef,
    pub username: FieldRef,
    pub age: FieldRef,
    pub team_id: FieldRef,
    /// `member.team`
    pub team: Relation,
}

impl QMember {
    pub fn new(catalog: &SchemaCatalog) -> SchemaResult<Self> {
        Ok(Self {
            id: catalog.field(MEMBER, "id")?,
            username: catalog.field(MEMBER, "username")?,
            age: catalog.field(MEMBER, "age")?,
            team_id: catalog.field(MEMBER, "team_id")?,
            team: catalog.relation(MEMBER, "team")?,
        })
    }
}

/// Field handles of `team`
#[derive(Debug, Clone)]
pub struct QTeam {
    pub id: FieldRef,
    pub name: FieldRef,
}

impl QTeam {
    pub fn new(catalog: &SchemaCatalog) -> SchemaResult<Self> {
        Ok(Self {
            id: catalog.field(TEAM, "id")?,
            name: catalog.field(TEAM, "name")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_source() {
        let source = seeded_source().unwrap();
        assert_eq!(source.row_count(MEMBER).unwrap(), 4);
        assert_eq!(source.row_count(TEAM).unwrap(), 2);
    }

    #[test]
    fn test_handles() {
        let catalog = catalog().unwrap();
        let member = QMember::new(&catalog).unwrap();
        let team = QTeam::new(&catalog).unwrap();
        assert_eq!(member.team.to_entity(), TEAM);
        assert_eq!(member.team.target_key(), &team.id);
        assert_eq!(member.age.value_type(), ValueType::Int);
    }
}
