//! Bazaar Client - typed HTTP client and client-side state store.
//!
//! # Modules
//!
//! - [`api`] - [`ApiClient`], one method per REST route
//! - [`store`] - [`Store`], a watch-channel snapshot of every remote
//!   operation's state
//! - [`cart`] - The cart reducer and checkout price summary
//! - [`storage`] - JSON-file persistence for the cart and the signed-in user
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{ApiClient, Store};
//!
//! let store = Store::new(ApiClient::new("http://localhost:5000"));
//! let mut updates = store.subscribe();
//!
//! store.list_products(None, 1).await?;
//! updates.changed().await?;
//! println!("{:?}", updates.borrow().product_list);
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod error;
pub mod storage;
pub mod store;

pub use api::ApiClient;
pub use cart::{Cart, CartAction, CartItem};
pub use error::ClientError;
pub use storage::{LocalStorage, Persisted};
pub use store::{ClientState, Remote, Store};
