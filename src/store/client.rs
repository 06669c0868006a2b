//! In-process client for the store actor.

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser, User};

use super::actor::StoreRequest;
use super::error::StoreError;
use super::UserStore;

/// Sends requests to the [`StoreActor`](super::StoreActor) and awaits the
/// paired oneshot reply.
///
/// Holds only a sender, so cloning is cheap; every clone talks to the same
/// actor and therefore to the same canonical data.
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl UserStore for StoreClient {
    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::List { respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }

    async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Get { id, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }

    async fn create(&self, user: CreateUser) -> Result<User, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Create { user, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }

    async fn update(&self, id: Uuid, user: UpdateUser) -> Result<Option<User>, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Update {
                id,
                user,
                respond_to,
            })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(StoreRequest::Delete { id, respond_to })
            .await
            .map_err(|_| StoreError::ActorClosed)?;
        response.await.map_err(|_| StoreError::ActorDropped)
    }
}
