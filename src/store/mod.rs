//! The canonical user store and its clients.
//!
//! The store itself is an actor task ([`StoreActor`]): it owns the user map
//! and processes one request at a time, so no lock ever guards the data.
//! Callers go through the [`UserStore`] trait: the in-process
//! [`StoreClient`] in single mode and on the primary, or the cluster
//! channel client inside worker processes.

pub mod actor;
pub mod client;
pub mod error;

pub use actor::{StoreActor, StoreRequest};
pub use client::StoreClient;
pub use error::StoreError;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser, User};

/// Uniform access to the canonical store.
///
/// Not-found never surfaces as an error: `get` and `update` return `None`
/// and `delete` reports whether a record was removed. An `Err` means the
/// store could not be reached at all.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All records, in no particular order.
    async fn list(&self) -> Result<Vec<User>, StoreError>;

    /// The record with the given id, if any.
    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Inserts a new record under a freshly assigned id and returns it.
    async fn create(&self, user: CreateUser) -> Result<User, StoreError>;

    /// Merges `user` into the existing record and returns the result,
    /// or `None` if the id is unknown.
    async fn update(&self, id: Uuid, user: UpdateUser) -> Result<Option<User>, StoreError>;

    /// Removes the record if present; returns whether anything was removed.
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;
}
