//! Error types for store access.

use thiserror::Error;

use crate::protocol::ChannelError;

/// Errors surfaced by [`UserStore`](super::UserStore) implementations.
///
/// Unknown ids are not errors (see the trait docs); these variants only
/// cover the transport to the store failing.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store task is no longer accepting requests.
    #[error("store closed")]
    ActorClosed,

    /// The store task dropped the reply channel without answering.
    #[error("store dropped the reply")]
    ActorDropped,

    /// The channel to the primary failed before a reply arrived.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),
}
