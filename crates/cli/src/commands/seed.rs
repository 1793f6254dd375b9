//! Sample data import and wipe.
//!
//! `import` wipes orders, products and users, creates the seed users, and
//! creates every seed product owned by the first user (who must be an
//! admin). Orders are never seeded. `destroy` only wipes.
//!
//! The seed file is YAML:
//!
//! ```yaml
//! users:
//!   - { name: Admin User, email: admin@example.com, password: "123456", is_admin: true }
//! products:
//!   - name: Airpods
//!     image: /images/airpods.jpg
//!     description: Wireless headphones
//!     brand: Apple
//!     category: Electronics
//!     price: "89.99"
//!     count_in_stock: 10
//! ```

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use bazaar_api::db::{ProductRepository, UserRepository};
use bazaar_api::services::auth::hash_password;
use bazaar_core::product::NewProduct;
use bazaar_core::user::{RegisterRequest, UserInputError};

/// The bundled sample catalog.
const BUNDLED_SEED: &str = include_str!("../../data/seed.yaml");

/// Problems with a seed file.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file has no users")]
    NoUsers,

    #[error("the first seed user must be an admin")]
    FirstUserNotAdmin,

    #[error("seed user {index}: {source}")]
    InvalidUser {
        index: usize,
        #[source]
        source: UserInputError,
    },

    #[error("seed product {0:?} has a negative price or stock")]
    InvalidProduct(String),
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    pub image: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: Decimal,
    pub count_in_stock: i32,
}

impl From<SeedProduct> for NewProduct {
    fn from(p: SeedProduct) -> Self {
        Self {
            name: p.name,
            price: p.price,
            image: p.image,
            brand: p.brand,
            category: p.category,
            count_in_stock: p.count_in_stock,
            description: p.description,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    #[serde(default)]
    pub products: Vec<SeedProduct>,
}

impl SeedData {
    /// Check everything that would otherwise fail halfway through an import.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), SeedError> {
        let first = self.users.first().ok_or(SeedError::NoUsers)?;
        if !first.is_admin {
            return Err(SeedError::FirstUserNotAdmin);
        }

        for (index, user) in self.users.iter().enumerate() {
            user_request(user)
                .validate()
                .map_err(|source| SeedError::InvalidUser { index, source })?;
        }

        if let Some(bad) = self
            .products
            .iter()
            .find(|p| p.price.is_sign_negative() || p.count_in_stock < 0)
        {
            return Err(SeedError::InvalidProduct(bad.name.clone()));
        }

        Ok(())
    }
}

fn user_request(user: &SeedUser) -> RegisterRequest {
    RegisterRequest {
        name: user.name.clone(),
        email: user.email.clone(),
        password: user.password.clone(),
    }
}

/// Parse and validate seed YAML.
///
/// # Errors
///
/// Returns an error if the YAML is malformed or fails validation.
pub fn parse(content: &str) -> Result<SeedData, Box<dyn std::error::Error>> {
    let data: SeedData = serde_yaml::from_str(content)?;
    data.validate()?;
    Ok(data)
}

/// Replace all data with the seed file's users and products.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is invalid, or a database
/// operation fails.
pub async fn import(file: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let content = match file {
        Some(path) => {
            info!(path = %path.display(), "Loading seed data from file");
            tokio::fs::read_to_string(path).await?
        }
        None => BUNDLED_SEED.to_owned(),
    };

    // Validate before touching the database
    let data = parse(&content)?;
    info!(
        users = data.users.len(),
        products = data.products.len(),
        "Seed data validated"
    );

    let pool = super::connect().await?;
    wipe(&pool).await?;

    let users = UserRepository::new(&pool);
    let mut admin = None;
    for user in &data.users {
        let request = user_request(user);
        let registration = request.validate()?;
        let password_hash = hash_password(registration.password)?;
        let created = users
            .create(
                registration.name,
                &registration.email,
                &password_hash,
                user.is_admin,
            )
            .await?;
        admin.get_or_insert(created.id);
    }
    let admin = admin.ok_or(SeedError::NoUsers)?;

    let products = ProductRepository::new(&pool);
    for product in data.products {
        products.create(admin, &product.into()).await?;
    }

    info!("Data imported!");
    Ok(())
}

/// Delete all orders, products and users.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a delete fails.
pub async fn destroy() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;
    wipe(&pool).await?;
    info!("Data destroyed!");
    Ok(())
}

async fn wipe(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for table in ["orders", "products", "users"] {
        let deleted = sqlx::query(&format!("DELETE FROM {table}"))
            .execute(&mut *tx)
            .await?
            .rows_affected();
        info!(table, deleted, "Cleared table");
    }
    tx.commit().await
}
