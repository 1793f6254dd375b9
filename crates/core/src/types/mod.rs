//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod pagination;
pub mod price;

pub use email::{Email, EmailError};
pub use id::*;
pub use pagination::{PAGE_SIZE, PageRequest, page_count};
pub use price::PriceSummary;
