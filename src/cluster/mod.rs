//! Multi-process coordination: worker spawning, stdio channels, and the
//! primary's message router.
//!
//! The shape mirrors the in-process actor pattern, stretched across a
//! process boundary: the primary owns the store, each worker owns a private
//! ordered channel to it, and every command gets exactly one reply on the
//! channel it came in on.

pub mod channel;
pub mod primary;
pub mod worker;
