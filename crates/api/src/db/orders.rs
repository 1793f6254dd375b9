//! Order repository for database operations.
//!
//! Every read joins the purchaser's current name and email. The purchaser
//! may have been deleted since, in which case only the id is returned.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;
use thiserror::Error;

use bazaar_core::order::{
    NewOrder, Order, OrderError, OrderItem, OrderUser, PaymentResult, ShippingAddress,
};
use bazaar_core::{OrderId, UserId};

use super::RepositoryError;

const ORDER_SELECT: &str = r"
    SELECT o.id, o.user_id, o.order_items, o.shipping_address, o.payment_method,
           o.payment_result, o.items_price, o.tax_price, o.shipping_price,
           o.total_price, o.is_paid, o.paid_at, o.is_delivered, o.delivered_at,
           o.created_at, o.updated_at,
           u.name AS user_name, u.email AS user_email
    FROM orders o
    LEFT JOIN users u ON u.id = o.user_id
";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` order queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    order_items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_result: Option<Json<PaymentResult>>,
    items_price: Decimal,
    tax_price: Decimal,
    shipping_price: Decimal,
    total_price: Decimal,
    is_paid: bool,
    paid_at: Option<DateTime<Utc>>,
    is_delivered: bool,
    delivered_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Self {
            id: OrderId::new(row.id),
            user: OrderUser {
                id: UserId::new(row.user_id),
                name: row.user_name,
                email: row.user_email,
            },
            order_items: row.order_items.0,
            shipping_address: row.shipping_address.0,
            payment_method: row.payment_method,
            payment_result: row.payment_result.map(|j| j.0),
            items_price: row.items_price,
            tax_price: row.tax_price,
            shipping_price: row.shipping_price,
            total_price: row.total_price,
            is_paid: row.is_paid,
            paid_at: row.paid_at,
            is_delivered: row.is_delivered,
            delivered_at: row.delivered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Errors from the pay and deliver transitions.
#[derive(Debug, Error)]
pub enum OrderTransitionError {
    /// The order refused the transition.
    #[error(transparent)]
    Rejected(#[from] OrderError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for OrderTransitionError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order for `user` with the submitted prices.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn create(&self, user: UserId, order: &NewOrder) -> Result<Order, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(
            r"
            WITH o AS (
                INSERT INTO orders
                    (user_id, order_items, shipping_address, payment_method,
                     items_price, tax_price, shipping_price, total_price)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING *
            )
            SELECT o.id, o.user_id, o.order_items, o.shipping_address, o.payment_method,
                   o.payment_result, o.items_price, o.tax_price, o.shipping_price,
                   o.total_price, o.is_paid, o.paid_at, o.is_delivered, o.delivered_at,
                   o.created_at, o.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM o
            LEFT JOIN users u ON u.id = o.user_id
            ",
        )
        .bind(user)
        .bind(Json(&order.order_items))
        .bind(Json(&order.shipping_address))
        .bind(&order.payment_method)
        .bind(order.items_price)
        .bind(order.tax_price)
        .bind(order.shipping_price)
        .bind(order.total_price)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Get an order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(Into::into))
    }

    /// Orders placed by `user`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.user_id = $1 ORDER BY o.id"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Every order, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!("{ORDER_SELECT} ORDER BY o.id"))
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Mark an order as paid with the provider's confirmation.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `OrderError::AlreadyPaid` if it was paid before.
    pub async fn mark_paid(
        &self,
        id: OrderId,
        result: PaymentResult,
    ) -> Result<Order, OrderTransitionError> {
        self.transition(id, |order, now| order.mark_paid(result, now))
            .await
    }

    /// Mark an order as delivered.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `OrderError::AlreadyDelivered` if it was delivered before.
    pub async fn mark_delivered(&self, id: OrderId) -> Result<Order, OrderTransitionError> {
        self.transition(id, Order::mark_delivered).await
    }

    /// Lock an order, apply `apply`, and write back the lifecycle fields.
    async fn transition<F>(&self, id: OrderId, apply: F) -> Result<Order, OrderTransitionError>
    where
        F: FnOnce(&mut Order, DateTime<Utc>) -> Result<(), OrderError> + Send,
    {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(&format!(
            "{ORDER_SELECT} WHERE o.id = $1 FOR UPDATE OF o"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        let mut order = Order::from(row);
        apply(&mut order, Utc::now())?;

        sqlx::query(
            r"
            UPDATE orders SET
                is_paid = $2,
                paid_at = $3,
                payment_result = $4,
                is_delivered = $5,
                delivered_at = $6,
                updated_at = $7
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(order.is_paid)
        .bind(order.paid_at)
        .bind(order.payment_result.as_ref().map(Json))
        .bind(order.is_delivered)
        .bind(order.delivered_at)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(order)
    }
}
