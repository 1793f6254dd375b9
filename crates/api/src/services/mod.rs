//! Business logic services for the API.
//!
//! - `auth` - Registration, password login and profile updates
//! - `token` - Bearer token issuing and verification

pub mod auth;
pub mod token;
