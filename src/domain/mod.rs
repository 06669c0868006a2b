//! Pure data structures (DTOs) for the user resource.

pub mod user;

pub use user::*;
