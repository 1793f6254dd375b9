//! JSON-file persistence for state that survives restarts.
//!
//! Holds the cart, checkout details, and the signed-in user in one file,
//! written whole on every change. File access goes through `tokio::fs` so a
//! save never stalls the runtime.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use bazaar_core::user::UserInfo;

use crate::cart::Cart;
use crate::error::ClientError;

/// Everything that is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persisted {
    #[serde(flatten)]
    pub cart: Cart,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_info: Option<UserInfo>,
}

/// A JSON file used as local storage.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    path: PathBuf,
}

impl LocalStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state. A missing file is an empty state.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the file cannot be read and
    /// `ClientError::Json` if it does not hold valid state.
    pub async fn load(&self) -> Result<Persisted, ClientError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Persisted::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the stored state.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the file cannot be written.
    pub async fn save(&self, state: &Persisted) -> Result<(), ClientError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let json = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::order::ShippingAddress;

    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("state.json"));
        assert_eq!(storage.load().await.unwrap(), Persisted::default());
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested/state.json"));

        let mut state = Persisted::default();
        state.cart.payment_method = Some("PayPal".to_string());
        state.cart.shipping_address = Some(ShippingAddress {
            address: "1 Main St".to_string(),
            city: "Boston".to_string(),
            postal_code: "02101".to_string(),
            country: "USA".to_string(),
        });

        storage.save(&state).await.unwrap();
        assert_eq!(storage.load().await.unwrap(), state);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = LocalStorage::new(path).load().await.unwrap_err();
        assert!(matches!(err, ClientError::Json(_)));
    }
}
