//! Shopping cart reducer.
//!
//! The cart lives entirely on the client. Adding a product that is already
//! in the cart replaces its line (so the quantity is set, not summed).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::order::{DEFAULT_PAYMENT_METHOD, NewOrder, OrderItem, ShippingAddress};
use bazaar_core::product::Product;
use bazaar_core::{PriceSummary, ProductId};

/// One cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product: ProductId,
    pub name: String,
    pub image: String,
    pub price: Decimal,
    pub count_in_stock: i32,
    pub qty: u32,
}

impl CartItem {
    /// A line for `qty` units of `product` at its current price.
    #[must_use]
    pub fn from_product(product: &Product, qty: u32) -> Self {
        Self {
            product: product.id,
            name: product.name.clone(),
            image: product.image.clone(),
            price: product.price,
            count_in_stock: product.count_in_stock,
            qty,
        }
    }

    #[must_use]
    pub fn to_order_item(&self) -> OrderItem {
        OrderItem {
            name: self.name.clone(),
            qty: self.qty,
            image: self.image.clone(),
            price: self.price,
            product: self.product,
        }
    }
}

/// Cart mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    AddItem(CartItem),
    RemoveItem(ProductId),
    SaveShippingAddress(ShippingAddress),
    SavePaymentMethod(String),
    /// Empty the line items, keeping address and payment method.
    ClearItems,
}

/// Cart contents plus the checkout details collected so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Cart {
    pub cart_items: Vec<CartItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<ShippingAddress>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
}

impl Cart {
    pub fn apply(&mut self, action: CartAction) {
        match action {
            CartAction::AddItem(item) => {
                match self
                    .cart_items
                    .iter_mut()
                    .find(|line| line.product == item.product)
                {
                    Some(line) => *line = item,
                    None => self.cart_items.push(item),
                }
            }
            CartAction::RemoveItem(product) => {
                self.cart_items.retain(|line| line.product != product);
            }
            CartAction::SaveShippingAddress(address) => self.shipping_address = Some(address),
            CartAction::SavePaymentMethod(method) => self.payment_method = Some(method),
            CartAction::ClearItems => self.cart_items.clear(),
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.cart_items.iter().map(|line| line.qty).sum()
    }

    /// Checkout prices for the current lines.
    #[must_use]
    pub fn summary(&self) -> PriceSummary {
        PriceSummary::for_lines(self.cart_items.iter().map(|line| (line.price, line.qty)))
    }

    /// The order to submit, once a shipping address has been saved.
    #[must_use]
    pub fn to_order(&self) -> Option<NewOrder> {
        let address = self.shipping_address.clone()?;
        let method = self
            .payment_method
            .clone()
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

        Some(NewOrder::from_cart(
            self.cart_items.iter().map(CartItem::to_order_item).collect(),
            address,
            method,
        ))
    }
}
