//! Product repository for database operations.
//!
//! Reviews live in the `reviews` JSONB column. Appending one is a
//! read-modify-write of the whole product and runs under a row lock.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use bazaar_core::product::{
    NewProduct, NewReview, Product, ProductUpdate, Review, ReviewAuthor, ReviewError,
};
use bazaar_core::{PageRequest, ProductId, UserId};

use super::RepositoryError;

const PRODUCT_COLUMNS: &str = "id, user_id, name, image, brand, category, description, \
     reviews, rating, num_reviews, price, count_in_stock, created_at, updated_at";

/// Case-insensitive substring match on the name; `$1` NULL matches all.
const KEYWORD_FILTER: &str = "($1::text IS NULL OR position(lower($1) in lower(name)) > 0)";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    user_id: i32,
    name: String,
    image: String,
    brand: String,
    category: String,
    description: String,
    reviews: Json<Vec<Review>>,
    rating: f64,
    num_reviews: i32,
    price: Decimal,
    count_in_stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            user: UserId::new(row.user_id),
            name: row.name,
            image: row.image,
            brand: row.brand,
            category: row.category,
            description: row.description,
            reviews: row.reviews.0,
            rating: row.rating,
            num_reviews: row.num_reviews,
            price: row.price,
            count_in_stock: row.count_in_stock,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Errors from [`ProductRepository::add_review`].
#[derive(Debug, Error)]
pub enum AddReviewError {
    /// The review was rejected by the product.
    #[error(transparent)]
    Rejected(#[from] ReviewError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for AddReviewError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// One page of products matching `keyword`, ordered by id, plus the
    /// total number of matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(
        &self,
        keyword: Option<&str>,
        page: PageRequest,
    ) -> Result<(Vec<Product>, u64), RepositoryError> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM products WHERE {KEYWORD_FILTER}"
        ))
        .bind(keyword)
        .fetch_one(self.pool)
        .await?;

        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM products
            WHERE {KEYWORD_FILTER}
            ORDER BY id
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(keyword)
        .bind(PageRequest::limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        let total = u64::try_from(count).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative product count: {count}"))
        })?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    /// The `limit` highest-rated products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_rated(&self, limit: i64) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY rating DESC, id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Get a product by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Insert a product owned by `user`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(
        &self,
        user: UserId,
        product: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO products
                (user_id, name, image, brand, category, description, price, count_in_stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(user)
        .bind(&product.name)
        .bind(&product.image)
        .bind(&product.brand)
        .bind(&product.category)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.count_in_stock)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Overwrite the editable fields of a product.
    ///
    /// Returns `None` if the product does not exist. Concurrent updates are
    /// last-write-wins.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            UPDATE products SET
                name = $2,
                price = $3,
                description = $4,
                image = $5,
                brand = $6,
                category = $7,
                count_in_stock = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(&update.name)
        .bind(update.price)
        .bind(&update.description)
        .bind(&update.image)
        .bind(&update.brand)
        .bind(&update.category)
        .bind(update.count_in_stock)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Append a review to a product and store the refreshed rating.
    ///
    /// The product row is locked for the duration so that two submissions
    /// by the same author cannot both pass the duplicate check.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `AddReviewError::Rejected` if the product refuses the review.
    pub async fn add_review(
        &self,
        id: ProductId,
        author: ReviewAuthor<'_>,
        review: NewReview,
    ) -> Result<Review, AddReviewError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut product = Product::from(row);
        let added = product.add_review(author, review, Utc::now())?;

        sqlx::query(
            r"
            UPDATE products
            SET reviews = $2, rating = $3, num_reviews = $4, updated_at = $5
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(Json(&product.reviews))
        .bind(product.rating)
        .bind(product.num_reviews)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(added)
    }
}
