//! # user-cluster
//!
//! A REST CRUD service over a single in-memory resource (users) that runs
//! either as one process or as a primary coordinating a pool of worker
//! processes behind a round-robin dispatcher.
//!
//! ## How cluster mode fits together
//!
//! - The canonical store is an actor task owned by the primary
//!   ([`store::StoreActor`]). It is the only place user records live; no
//!   other process holds state worth preserving.
//! - Each worker process serves the public API on its own port ([`http`])
//!   and reaches the store by sending [`protocol::Command`]s over its
//!   private stdio channel ([`cluster::channel`]).
//! - The primary answers every command with exactly one reply on the
//!   channel it arrived on ([`cluster::primary`]) and round-robins inbound
//!   traffic across the workers ([`dispatch`]).
//!
//! Because every mutation funnels through the store actor's single queue,
//! workers observe consistent data without any cross-process locking;
//! message passing replaces shared memory entirely.
//!
//! ## Running
//!
//! ```bash
//! # Single process
//! RUST_LOG=info cargo run
//!
//! # Primary + workers, dispatcher on port 4000, workers on 4001..
//! RUST_LOG=info cargo run -- --multi --port 4000
//! ```

pub mod cli;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod domain;
pub mod http;
pub mod protocol;
pub mod store;
pub mod telemetry;
