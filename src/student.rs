use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Identifier assigned by the durable store. `0` means "not persisted".
pub type StudentId = i64;

/// Struct that describe a persisted student
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub email: String,
    pub age: u32,
}

/// Body accepted when creating or updating a student
#[derive(Clone, Debug, Serialize, Deserialize, Validate)]
pub struct StudentInput {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(range(min = 1))]
    pub age: u32,
}

impl StudentInput {
    /// Attach an identity to the payload
    pub fn with_id(self, id: StudentId) -> Student {
        Student {
            id,
            name: self.name,
            email: self.email,
            age: self.age,
        }
    }
}

impl Student {
    /// Hash fields mirrored in the per-student cache entry
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("id", self.id.to_string()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("age", self.age.to_string()),
        ]
    }

    /// Rebuild a student from a cached hash.
    ///
    /// Returns `None` unless every field is present and parses, and the id is
    /// non-zero. An empty map (absent key) is therefore also `None`.
    pub fn from_fields(fields: &HashMap<String, String>) -> Option<Self> {
        let id = fields.get("id")?.parse::<StudentId>().ok()?;
        if id == 0 {
            return None;
        }

        Some(Self {
            id,
            name: fields.get("name")?.clone(),
            email: fields.get("email")?.clone(),
            age: fields.get("age")?.parse().ok()?,
        })
    }
}
