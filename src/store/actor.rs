//! The store actor: sole owner of the canonical user map.
//!
//! # Concurrency Model
//! Every request, whether it originates from an HTTP handler in the same
//! process or from a worker process on the other end of a stdio channel,
//! funnels through this task's mpsc queue and is processed to completion
//! before the next one starts. That single queue is the linearization
//! point for the whole system: no `Mutex` or `RwLock` protects the map,
//! exclusive ownership within the task does.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CreateUser, UpdateUser, User};

use super::client::StoreClient;

/// Reply channel for a single store request.
pub type Reply<T> = oneshot::Sender<T>;

/// Messages accepted by the store actor.
///
/// A closed set: every operation the wire protocol can carry has exactly
/// one variant here, so dispatch is exhaustive at compile time.
#[derive(Debug)]
pub enum StoreRequest {
    List {
        respond_to: Reply<Vec<User>>,
    },
    Get {
        id: Uuid,
        respond_to: Reply<Option<User>>,
    },
    Create {
        user: CreateUser,
        respond_to: Reply<User>,
    },
    Update {
        id: Uuid,
        user: UpdateUser,
        respond_to: Reply<Option<User>>,
    },
    Delete {
        id: Uuid,
        respond_to: Reply<bool>,
    },
}

/// Owns the user map and processes requests strictly one at a time.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    users: HashMap<Uuid, User>,
}

impl StoreActor {
    /// Creates a new `StoreActor` and its associated [`StoreClient`].
    ///
    /// # Arguments
    ///
    /// * `buffer` - Capacity of the mpsc queue. Senders wait when it fills,
    ///   which backpressures workers instead of growing memory.
    pub fn new(buffer: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer);
        let actor = Self {
            receiver,
            users: HashMap::new(),
        };
        (actor, StoreClient::new(sender))
    }

    /// Runs the event loop until every client has been dropped.
    pub async fn run(mut self) {
        info!("store started");
        while let Some(msg) = self.receiver.recv().await {
            self.handle(msg);
        }
        info!(size = self.users.len(), "store shut down");
    }

    fn handle(&mut self, msg: StoreRequest) {
        match msg {
            StoreRequest::List { respond_to } => {
                debug!(size = self.users.len(), "list");
                let _ = respond_to.send(self.users.values().cloned().collect());
            }
            StoreRequest::Get { id, respond_to } => {
                let user = self.users.get(&id).cloned();
                debug!(%id, found = user.is_some(), "get");
                let _ = respond_to.send(user);
            }
            StoreRequest::Create { user, respond_to } => {
                let user = self.insert(user);
                info!(id = %user.id, size = self.users.len(), "created");
                let _ = respond_to.send(user);
            }
            StoreRequest::Update {
                id,
                user,
                respond_to,
            } => {
                let updated = self.users.get_mut(&id).map(|existing| {
                    existing.apply(user);
                    existing.clone()
                });
                debug!(%id, found = updated.is_some(), "update");
                let _ = respond_to.send(updated);
            }
            StoreRequest::Delete { id, respond_to } => {
                let removed = self.users.remove(&id).is_some();
                debug!(%id, removed, "delete");
                let _ = respond_to.send(removed);
            }
        }
    }

    /// Assigns a fresh id and inserts the record.
    ///
    /// v4 collisions are not practically reachable, but re-rolling keeps
    /// the invariant that an insert can never overwrite an existing record.
    fn insert(&mut self, params: CreateUser) -> User {
        let mut id = Uuid::new_v4();
        while self.users.contains_key(&id) {
            id = Uuid::new_v4();
        }
        let user = User::from_create(id, params);
        self.users.insert(id, user.clone());
        user
    }
}
