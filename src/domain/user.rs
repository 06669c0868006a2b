use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a registered user in the system.
///
/// Identity is `id`, assigned by the store on creation and never reused;
/// every other field is mutable through [`UpdateUser`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub age: u32,
    pub hobbies: Vec<String>,
}

/// Payload for creating a new user. All fields are required.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateUser {
    pub username: String,
    pub age: u32,
    pub hobbies: Vec<String>,
}

/// Payload for updating an existing user.
///
/// Fields left absent are preserved; fields present overwrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub username: Option<String>,
    pub age: Option<u32>,
    pub hobbies: Option<Vec<String>>,
}

impl User {
    /// Builds the stored record from a freshly assigned id and the creation payload.
    pub fn from_create(id: Uuid, params: CreateUser) -> Self {
        Self {
            id,
            username: params.username,
            age: params.age,
            hobbies: params.hobbies,
        }
    }

    /// Merges an update into the record.
    pub fn apply(&mut self, update: UpdateUser) {
        if let Some(username) = update.username {
            self.username = username;
        }
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(hobbies) = update.hobbies {
            self.hobbies = hobbies;
        }
    }
}
