//! Client-side state store.
//!
//! [`ClientState`] is one snapshot partitioned into slices, one per remote
//! operation. Every operation runs through [`Store::track`]:
//!
//! 1. start: the slice becomes [`Remote::Loading`] (any previous error or
//!    payload is dropped)
//! 2. success: the slice becomes [`Remote::Ready`] with the payload
//! 3. failure: the slice becomes [`Remote::Failed`] with the API's message,
//!    or the transport error text
//!
//! Each step publishes a new snapshot on a `tokio::sync::watch` channel.
//! Calls are not cancelled, deduplicated or retried; a late completion
//! still publishes.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::warn;

use bazaar_core::message::MessageResponse;
use bazaar_core::order::{NewOrder, Order, PaymentUpdate, ShippingAddress};
use bazaar_core::product::{NewReview, Product, ProductPage, ProductUpdate};
use bazaar_core::user::{
    AdminUserUpdate, LoginRequest, ProfileUpdate, RegisterRequest, UserInfo, UserProfile,
};
use bazaar_core::{OrderId, ProductId, UserId};

use crate::api::ApiClient;
use crate::cart::{Cart, CartAction, CartItem};
use crate::error::ClientError;
use crate::storage::{LocalStorage, Persisted};

/// State of one remote operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Remote<T> {
    Idle,
    Loading,
    Ready(T),
    Failed(String),
}

impl<T> Default for Remote<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> Remote<T> {
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn value(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// The whole client snapshot.
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub product_list: Remote<ProductPage>,
    pub product_details: Remote<Product>,
    pub product_delete: Remote<MessageResponse>,
    pub product_create: Remote<Product>,
    pub product_update: Remote<Product>,
    pub product_review_create: Remote<MessageResponse>,
    pub product_top: Remote<Vec<Product>>,

    pub user_login: Remote<UserInfo>,
    pub user_register: Remote<UserInfo>,
    pub user_details: Remote<UserProfile>,
    pub user_update_profile: Remote<UserInfo>,
    pub user_list: Remote<Vec<UserProfile>>,
    pub user_delete: Remote<MessageResponse>,
    pub user_update: Remote<UserProfile>,

    pub order_create: Remote<Order>,
    pub order_details: Remote<Order>,
    pub order_pay: Remote<Order>,
    pub order_deliver: Remote<Order>,
    pub order_list_my: Remote<Vec<Order>>,
    pub order_list: Remote<Vec<Order>>,

    pub cart: Cart,

    /// The signed-in user and their token. Set by login, register and
    /// profile update; cleared by logout. Persisted.
    pub session: Option<UserInfo>,
}

/// Selects one slice of the snapshot.
pub type Slice<T> = fn(&mut ClientState) -> &mut Remote<T>;

/// The store: an API client plus the published snapshot.
#[derive(Clone)]
pub struct Store {
    api: ApiClient,
    state: Arc<watch::Sender<ClientState>>,
    storage: Option<LocalStorage>,
    /// Held across snapshot and write so the file always ends on the latest state
    persisting: Arc<Mutex<()>>,
}

impl Store {
    /// A store with empty state and no persistence.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self::from_parts(api, ClientState::default(), None)
    }

    /// A store that restores the cart and session from `storage` and writes
    /// them back on every change.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the stored state cannot be read.
    pub async fn with_storage(api: ApiClient, storage: LocalStorage) -> Result<Self, ClientError> {
        let Persisted { cart, user_info } = storage.load().await?;
        let state = ClientState {
            cart,
            session: user_info,
            ..ClientState::default()
        };
        Ok(Self::from_parts(api, state, Some(storage)))
    }

    fn from_parts(api: ApiClient, state: ClientState, storage: Option<LocalStorage>) -> Self {
        let (tx, _rx) = watch::channel(state);
        Self {
            api,
            state: Arc::new(tx),
            storage,
            persisting: Arc::new(Mutex::new(())),
        }
    }

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Receive every new snapshot.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ClientState> {
        self.state.subscribe()
    }

    /// A copy of the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> ClientState {
        self.state.borrow().clone()
    }

    fn token(&self) -> Option<String> {
        self.state
            .borrow()
            .session
            .as_ref()
            .map(|user| user.token.clone())
    }

    /// Run `request` through the start/success/failure phases of `slice`.
    ///
    /// # Errors
    ///
    /// Returns the request's error after recording its message in the slice.
    pub async fn track<T, F>(&self, slice: Slice<T>, request: F) -> Result<T, ClientError>
    where
        T: Clone,
        F: Future<Output = Result<T, ClientError>>,
    {
        self.state.send_modify(|s| *slice(s) = Remote::Loading);

        let result = request.await;

        self.state.send_modify(|s| {
            *slice(s) = match &result {
                Ok(value) => Remote::Ready(value.clone()),
                Err(e) => Remote::Failed(e.message()),
            };
        });
        result
    }

    /// Put `slice` back to [`Remote::Idle`].
    pub fn reset<T>(&self, slice: Slice<T>) {
        self.state.send_modify(|s| *slice(s) = Remote::Idle);
    }

    async fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let _guard = self.persisting.lock().await;
        let persisted = {
            let state = self.state.borrow();
            Persisted {
                cart: state.cart.clone(),
                user_info: state.session.clone(),
            }
        };

        if let Err(e) = storage.save(&persisted).await {
            warn!(path = %storage.path().display(), error = %e, "Failed to persist client state");
        }
    }

    async fn set_session(&self, user: &UserInfo) {
        self.state.send_modify(|s| s.session = Some(user.clone()));
        self.persist().await;
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn list_products(
        &self,
        keyword: Option<&str>,
        page: u32,
    ) -> Result<ProductPage, ClientError> {
        self.track(|s| &mut s.product_list, self.api.list_products(keyword, page))
            .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn product_details(&self, id: ProductId) -> Result<Product, ClientError> {
        self.track(|s| &mut s.product_details, self.api.product(id))
            .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn top_products(&self) -> Result<Vec<Product>, ClientError> {
        self.track(|s| &mut s.product_top, self.api.top_products())
            .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn delete_product(&self, id: ProductId) -> Result<MessageResponse, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.product_delete,
            self.api.delete_product(token.as_deref(), id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn create_product(&self) -> Result<Product, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.product_create,
            self.api.create_product(token.as_deref()),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn update_product(
        &self,
        id: ProductId,
        update: &ProductUpdate,
    ) -> Result<Product, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.product_update,
            self.api.update_product(token.as_deref(), id, update),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn create_review(
        &self,
        id: ProductId,
        review: &NewReview,
    ) -> Result<MessageResponse, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.product_review_create,
            self.api.create_review(token.as_deref(), id, review),
        )
        .await
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Sign in and remember the session.
    ///
    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserInfo, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let user = self
            .track(|s| &mut s.user_login, self.api.login(&request))
            .await?;
        self.set_session(&user).await;
        Ok(user)
    }

    /// Create an account and sign in as it.
    ///
    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserInfo, ClientError> {
        let request = RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let user = self
            .track(|s| &mut s.user_register, self.api.register(&request))
            .await?;
        self.set_session(&user).await;
        Ok(user)
    }

    /// Forget the session and everything fetched on its behalf.
    pub async fn logout(&self) {
        self.state.send_modify(|s| {
            s.session = None;
            s.user_login = Remote::Idle;
            s.user_details = Remote::Idle;
            s.order_list_my = Remote::Idle;
            s.user_list = Remote::Idle;
        });
        self.persist().await;
    }

    /// Fetch a user: the signed-in user's own profile for `None`, any user
    /// (admin) for `Some(id)`.
    ///
    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn user_details(&self, id: Option<UserId>) -> Result<UserProfile, ClientError> {
        let token = self.token();
        let token = token.as_deref();
        self.track(|s| &mut s.user_details, async {
            match id {
                Some(id) => self.api.user(token, id).await,
                None => self.api.profile(token).await,
            }
        })
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserInfo, ClientError> {
        let token = self.token();
        let user = self
            .track(
                |s| &mut s.user_update_profile,
                self.api.update_profile(token.as_deref(), update),
            )
            .await?;
        self.set_session(&user).await;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn list_users(&self) -> Result<Vec<UserProfile>, ClientError> {
        let token = self.token();
        self.track(|s| &mut s.user_list, self.api.list_users(token.as_deref()))
            .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn delete_user(&self, id: UserId) -> Result<MessageResponse, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.user_delete,
            self.api.delete_user(token.as_deref(), id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn update_user(
        &self,
        id: UserId,
        update: &AdminUserUpdate,
    ) -> Result<UserProfile, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.user_update,
            self.api.update_user(token.as_deref(), id, update),
        )
        .await
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn create_order(&self, order: &NewOrder) -> Result<Order, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_create,
            self.api.create_order(token.as_deref(), order),
        )
        .await
    }

    /// Submit the cart as an order and empty it on success.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Checkout` without calling the API when no
    /// shipping address has been saved.
    pub async fn place_order(&self) -> Result<Order, ClientError> {
        let token = self.token();
        let order = self.state.borrow().cart.to_order();

        let placed = self
            .track(|s| &mut s.order_create, async {
                let order = order.ok_or(ClientError::Checkout("Shipping address is required"))?;
                self.api.create_order(token.as_deref(), &order).await
            })
            .await?;

        self.dispatch_cart(CartAction::ClearItems).await;
        Ok(placed)
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn order_details(&self, id: OrderId) -> Result<Order, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_details,
            self.api.order(token.as_deref(), id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn pay_order(
        &self,
        id: OrderId,
        payment: &PaymentUpdate,
    ) -> Result<Order, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_pay,
            self.api.pay_order(token.as_deref(), id, payment),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn deliver_order(&self, id: OrderId) -> Result<Order, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_deliver,
            self.api.deliver_order(token.as_deref(), id),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn list_my_orders(&self) -> Result<Vec<Order>, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_list_my,
            self.api.my_orders(token.as_deref()),
        )
        .await
    }

    /// # Errors
    ///
    /// Returns the failed request's `ClientError`.
    pub async fn list_orders(&self) -> Result<Vec<Order>, ClientError> {
        let token = self.token();
        self.track(
            |s| &mut s.order_list,
            self.api.list_orders(token.as_deref()),
        )
        .await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Apply a cart mutation and persist the cart.
    pub async fn dispatch_cart(&self, action: CartAction) {
        self.state.send_modify(|s| s.cart.apply(action));
        self.persist().await;
    }

    /// Look up a product and put `qty` of it in the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError` if the product cannot be fetched.
    pub async fn add_to_cart(&self, id: ProductId, qty: u32) -> Result<(), ClientError> {
        let product = self.api.product(id).await?;
        self.dispatch_cart(CartAction::AddItem(CartItem::from_product(&product, qty)))
            .await;
        Ok(())
    }

    pub async fn remove_from_cart(&self, id: ProductId) {
        self.dispatch_cart(CartAction::RemoveItem(id)).await;
    }

    pub async fn save_shipping_address(&self, address: ShippingAddress) {
        self.dispatch_cart(CartAction::SaveShippingAddress(address))
            .await;
    }

    pub async fn save_payment_method(&self, method: impl Into<String>) {
        self.dispatch_cart(CartAction::SavePaymentMethod(method.into()))
            .await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::Email;
    use tokio::sync::oneshot;

    use super::*;

    /// A store whose API is unreachable.
    fn offline_store() -> Store {
        Store::new(ApiClient::new("http://127.0.0.1:1"))
    }

    fn user_info() -> UserInfo {
        UserInfo {
            id: UserId::new(1),
            name: "Admin User".to_string(),
            email: Email::parse("admin@example.com").unwrap(),
            is_admin: true,
            token: "header.claims.signature".to_string(),
        }
    }

    fn cart_item(id: i32) -> CartItem {
        CartItem {
            product: ProductId::new(id),
            name: "Airpods".to_string(),
            image: "/images/airpods.jpg".to_string(),
            price: "89.99".parse().unwrap(),
            count_in_stock: 10,
            qty: 2,
        }
    }

    #[tokio::test]
    async fn test_track_publishes_loading_then_ready() {
        let store = offline_store();
        let mut updates = store.subscribe();
        let (tx, rx) = oneshot::channel::<Vec<Product>>();

        let observe = async {
            updates.changed().await.unwrap();
            let loading = updates.borrow_and_update().product_top.is_loading();
            tx.send(Vec::new()).unwrap();
            loading
        };
        let request = store.track(|s| &mut s.product_top, async { Ok(rx.await.unwrap()) });

        let (result, was_loading) = tokio::join!(request, observe);

        assert!(was_loading);
        assert_eq!(result.unwrap(), Vec::new());
        assert_eq!(store.snapshot().product_top, Remote::Ready(Vec::new()));
    }

    #[tokio::test]
    async fn test_track_failure_stores_api_message() {
        let store = offline_store();

        let result = store
            .track(|s| &mut s.product_details, async {
                Err::<Product, _>(ClientError::Api {
                    status: 404,
                    message: "Product not found".to_string(),
                })
            })
            .await;

        assert!(result.is_err());
        assert_eq!(
            store.snapshot().product_details.error(),
            Some("Product not found")
        );
    }

    #[tokio::test]
    async fn test_retry_clears_previous_error() {
        let store = offline_store();
        let _ = store
            .track(|s| &mut s.product_delete, async {
                Err::<MessageResponse, _>(ClientError::Checkout("boom"))
            })
            .await;
        assert_eq!(
            store.snapshot().product_delete,
            Remote::Failed("boom".to_string())
        );

        store
            .track(|s| &mut s.product_delete, async {
                Ok(MessageResponse::new("Product removed"))
            })
            .await
            .unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.product_delete.error(), None);
        assert_eq!(
            snapshot.product_delete.value(),
            Some(&MessageResponse::new("Product removed"))
        );
        assert_eq!(snapshot.order_pay, Remote::Idle);
    }

    #[tokio::test]
    async fn test_transport_error_is_recorded() {
        let store = offline_store();
        let result = store.product_details(ProductId::new(1)).await;

        assert!(matches!(result, Err(ClientError::Http(_))));
        let snapshot = store.snapshot();
        assert!(!snapshot.product_details.error().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_place_order_without_address_fails_locally() {
        let store = offline_store();
        store.dispatch_cart(CartAction::AddItem(cart_item(1))).await;

        let result = store.place_order().await;

        assert!(matches!(result, Err(ClientError::Checkout(_))));
        let snapshot = store.snapshot();
        assert_eq!(
            snapshot.order_create.error(),
            Some("Shipping address is required")
        );
        assert_eq!(snapshot.cart.cart_items.len(), 1);
    }

    #[tokio::test]
    async fn test_logout_resets_session_slices() {
        let store = offline_store();
        store.state.send_modify(|s| {
            s.session = Some(user_info());
            s.user_login = Remote::Ready(user_info());
            s.user_list = Remote::Ready(vec![user_info().profile()]);
            s.order_list_my = Remote::Ready(Vec::new());
            s.product_top = Remote::Ready(Vec::new());
        });

        store.logout().await;

        let snapshot = store.snapshot();
        assert_eq!(snapshot.session, None);
        assert_eq!(snapshot.user_login, Remote::Idle);
        assert_eq!(snapshot.user_list, Remote::Idle);
        assert_eq!(snapshot.order_list_my, Remote::Idle);
        assert_eq!(snapshot.product_top, Remote::Ready(Vec::new()));
    }

    #[test]
    fn test_reset_returns_slice_to_idle() {
        let store = offline_store();
        store.state.send_modify(|s| s.order_deliver = Remote::Loading);
        store.reset(|s| &mut s.order_deliver);
        assert_eq!(store.snapshot().order_deliver, Remote::Idle);
    }

    #[tokio::test]
    async fn test_cart_and_session_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bazaar.json");
        let api = ApiClient::new("http://127.0.0.1:1");

        let store = Store::with_storage(api.clone(), LocalStorage::new(&path))
            .await
            .unwrap();
        store.dispatch_cart(CartAction::AddItem(cart_item(3))).await;
        store.save_payment_method("PayPal").await;
        store.set_session(&user_info()).await;

        let restored = Store::with_storage(api, LocalStorage::new(&path))
            .await
            .unwrap();
        let snapshot = restored.snapshot();
        assert_eq!(snapshot.cart.cart_items, vec![cart_item(3)]);
        assert_eq!(snapshot.cart.payment_method.as_deref(), Some("PayPal"));
        assert_eq!(snapshot.session, Some(user_info()));
        assert_eq!(restored.token().as_deref(), Some("header.claims.signature"));
        assert_eq!(snapshot.product_list, Remote::Idle);
    }

    #[tokio::test]
    async fn test_concurrent_cart_changes_leave_latest_state_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bazaar.json");
        let store = Store::with_storage(
            ApiClient::new("http://127.0.0.1:1"),
            LocalStorage::new(&path),
        )
        .await
        .unwrap();

        tokio::join!(
            store.dispatch_cart(CartAction::AddItem(cart_item(1))),
            store.dispatch_cart(CartAction::AddItem(cart_item(2))),
            store.save_payment_method("PayPal"),
            store.remove_from_cart(ProductId::new(1)),
        );

        let on_disk = LocalStorage::new(&path).load().await.unwrap();
        assert_eq!(on_disk.cart, store.snapshot().cart);
    }
}
