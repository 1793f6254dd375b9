//! Server-side domain models.
//!
//! Wire shapes shared with clients live in `bazaar_core`; the types here
//! carry fields that never leave the server.

pub mod user;

pub use user::User;
