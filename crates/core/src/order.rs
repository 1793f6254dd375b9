//! Orders and their payment/delivery lifecycle.
//!
//! An order is created once with client-computed prices and is afterwards
//! mutated only by the pay and deliver transitions. Both transitions are
//! one-way: a paid order is never unpaid and a delivered order is never
//! undelivered.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{OrderId, PriceSummary, ProductId, UserId};

/// Payment method recorded when the client does not choose one.
pub const DEFAULT_PAYMENT_METHOD: &str = "PayPal";

/// Errors raised by order validation and lifecycle transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("No order items")]
    NoItems,
    #[error("Order already paid")]
    AlreadyPaid,
    #[error("Order already delivered")]
    AlreadyDelivered,
}

/// A snapshot of one cart line at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub qty: u32,
    pub image: String,
    pub price: Decimal,
    pub product: ProductId,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub address: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

/// Payment provider confirmation stored on a paid order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub email_address: String,
}

/// `PUT /api/orders/{id}/pay` body, as posted by the payment provider's
/// checkout button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub id: String,
    pub status: String,
    pub update_time: String,
    pub payer: Payer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payer {
    pub email_address: String,
}

impl From<PaymentUpdate> for PaymentResult {
    fn from(update: PaymentUpdate) -> Self {
        Self {
            id: update.id,
            status: update.status,
            update_time: update.update_time,
            email_address: update.payer.email_address,
        }
    }
}

/// The purchaser as embedded in order responses.
///
/// Name and email are absent when the purchaser account no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderUser {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl OrderUser {
    #[must_use]
    pub const fn id_only(id: UserId) -> Self {
        Self {
            id,
            name: None,
            email: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub user: OrderUser,
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_result: Option<PaymentResult>,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
    pub is_paid: bool,
    pub paid_at: Option<DateTime<Utc>>,
    pub is_delivered: bool,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Record a successful payment.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::AlreadyPaid`] without touching the order if it
    /// was paid before.
    pub fn mark_paid(&mut self, result: PaymentResult, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.is_paid {
            return Err(OrderError::AlreadyPaid);
        }
        self.is_paid = true;
        self.paid_at = Some(now);
        self.payment_result = Some(result);
        self.updated_at = now;
        Ok(())
    }

    /// Record delivery.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::AlreadyDelivered`] without touching the order if
    /// it was delivered before.
    pub fn mark_delivered(&mut self, now: DateTime<Utc>) -> Result<(), OrderError> {
        if self.is_delivered {
            return Err(OrderError::AlreadyDelivered);
        }
        self.is_delivered = true;
        self.delivered_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// `POST /api/orders` body.
///
/// Prices are taken as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub order_items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub items_price: Decimal,
    pub tax_price: Decimal,
    pub shipping_price: Decimal,
    pub total_price: Decimal,
}

fn default_payment_method() -> String {
    DEFAULT_PAYMENT_METHOD.to_owned()
}

impl NewOrder {
    /// Build an order body from cart lines, computing the price summary.
    #[must_use]
    pub fn from_cart(
        order_items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
        payment_method: String,
    ) -> Self {
        let prices = PriceSummary::for_lines(order_items.iter().map(|i| (i.price, i.qty)));
        Self {
            order_items,
            shipping_address,
            payment_method,
            items_price: prices.items_price,
            tax_price: prices.tax_price,
            shipping_price: prices.shipping_price,
            total_price: prices.total_price,
        }
    }

    /// # Errors
    ///
    /// Returns [`OrderError::NoItems`] for an empty order.
    pub fn validate(&self) -> Result<(), OrderError> {
        if self.order_items.is_empty() {
            return Err(OrderError::NoItems);
        }
        Ok(())
    }
}
