//! Projection targets of the sample schema

use serde::{Deserialize, Serialize};

use crate::projection::{
    convert, Args, BeanTarget, ConstructorTarget, FieldTarget, ProjectionError, ProjectionResult,
    TypedConstructor,
};
use crate::schema::{Value, ValueType};

/// A whole `member` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: i64,
    pub username: String,
    pub age: i64,
    pub team_id: Option<i64>,
}

impl FieldTarget for Member {
    const TYPE_NAME: &'static str = "Member";
    const FIELDS: &'static [&'static str] = &["id", "username", "age", "team_id"];
}

/// Username and age, mappable by every projection strategy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberDto {
    pub username: String,
    pub age: i64,
}

impl MemberDto {
    pub fn new(username: impl Into<String>, age: i64) -> Self {
        Self {
            username: username.into(),
            age,
        }
    }
}

impl BeanTarget for MemberDto {
    const TYPE_NAME: &'static str = "MemberDto";

    fn set_property(&mut self, name: &str, value: Value) -> ProjectionResult<()> {
        match name {
            "username" => self.username = convert("MemberDto", name, value)?,
            "age" => self.age = convert("MemberDto", name, value)?,
            other => return Err(ProjectionError::unmatched("MemberDto", other)),
        }
        Ok(())
    }
}

impl FieldTarget for MemberDto {
    const TYPE_NAME: &'static str = "MemberDto";
    const FIELDS: &'static [&'static str] = &["username", "age"];
}

impl ConstructorTarget for MemberDto {
    const TYPE_NAME: &'static str = "MemberDto";

    fn construct(args: Vec<Value>) -> ProjectionResult<Self> {
        let mut args = Args::new("MemberDto", args, 2)?;
        Ok(MemberDto {
            username: args.next("username")?,
            age: args.next("age")?,
        })
    }
}

impl TypedConstructor for MemberDto {
    const PARAMS: &'static [(&'static str, ValueType)] =
        &[("username", ValueType::String), ("age", ValueType::Int)];
}

/// Same data as `MemberDto` under different property names; columns must be
/// aliased to `name` and `age`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDto {
    pub name: String,
    pub age: i64,
}

impl FieldTarget for UserDto {
    const TYPE_NAME: &'static str = "UserDto";
    const FIELDS: &'static [&'static str] = &["name", "age"];
}
