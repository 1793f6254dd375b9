//! Bazaar Core - Shared domain types and wire contracts.
//!
//! This crate provides the types used across all Bazaar components:
//! - `api` - REST API server (products, users, orders)
//! - `client` - HTTP client and client-side state store
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure domain logic - no I/O, no
//! database access, no HTTP clients. The request and response bodies of every
//! route live here so the server and the client agree on one contract.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, emails, prices, and pagination
//! - [`product`] - Products, embedded reviews, and the rating invariant
//! - [`order`] - Orders and their one-way pay/deliver transitions
//! - [`user`] - User profiles and authentication payloads
//! - [`message`] - Generic message and error bodies

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod message;
pub mod order;
pub mod product;
pub mod types;
pub mod user;

pub use types::*;
