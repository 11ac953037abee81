//! Cart operations.
//!
//! The cart belongs to the signed-in user, so every call requires an access
//! token and fails with [`ApiError::Unauthorized`] before any I/O without one.
//! The backend has no per-line read or update endpoint: [`CartApi::item`] reads
//! the whole cart, and quantity changes go through [`CartApi::add`].

use chinchin_core::{Cart, CartItem, EntityId};
use serde::Serialize;
use serde_json::Value;
use tracing::{instrument, warn};

use super::ChinChinClient;
use crate::error::ApiError;
use crate::executor::ApiRequest;
use crate::signals::Notification;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddToCart<'a> {
    product_id: &'a EntityId,
    quantity: u32,
}

/// Cart of the signed-in user.
pub struct CartApi<'a> {
    client: &'a ChinChinClient,
}

impl<'a> CartApi<'a> {
    pub(super) const fn new(client: &'a ChinChinClient) -> Self {
        Self { client }
    }

    /// Current cart. Missing or unexpected fields read as an empty cart.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session, or the request's
    /// `ApiError`.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Cart, ApiError> {
        let url = self.client.endpoints().cart();
        let payload = self
            .client
            .executor()
            .execute(&ApiRequest::get(url).require_auth())
            .await?;
        Ok(decode_cart(payload))
    }

    /// The cart line for `product_id`, if it is in the cart.
    ///
    /// # Errors
    ///
    /// Same as [`get`](Self::get).
    pub async fn item(&self, product_id: &EntityId) -> Result<Option<CartItem>, ApiError> {
        Ok(self.get().await?.item(product_id).cloned())
    }

    /// Add `quantity` units of a product.
    ///
    /// Returns the updated cart: the one in the response when the backend
    /// sends it, otherwise a fresh read. `None` means the add was applied but
    /// the cart could not be read back; the add is not retried.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for a zero quantity,
    /// `ApiError::Unauthorized` without a session, or the add request's
    /// `ApiError`.
    #[instrument(skip(self), fields(%product_id))]
    pub async fn add(&self, product_id: &EntityId, quantity: u32) -> Result<Option<Cart>, ApiError> {
        if quantity == 0 {
            return Err(ApiError::InvalidInput(
                "quantity must be at least 1".to_string(),
            ));
        }

        let url = self.client.endpoints().cart_add();
        let body = serde_json::to_value(AddToCart {
            product_id,
            quantity,
        })?;
        let response = self
            .client
            .executor()
            .execute(&ApiRequest::post(url, body).require_auth())
            .await?;

        self.client
            .signals()
            .notify(Notification::success("Added to cart!"));
        Ok(self.updated(response).await)
    }

    /// Remove a product's line.
    ///
    /// Returns the updated cart the same way [`add`](Self::add) does.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` without a session, or the remove
    /// request's `ApiError`.
    #[instrument(skip(self), fields(%product_id))]
    pub async fn remove(&self, product_id: &EntityId) -> Result<Option<Cart>, ApiError> {
        let url = self.client.endpoints().cart_remove(product_id);
        let response = self
            .client
            .executor()
            .execute(&ApiRequest::delete(url).require_auth())
            .await?;

        self.client
            .signals()
            .notify(Notification::info("Removed from cart"));
        Ok(self.updated(response).await)
    }

    /// The cart after a mutation. A failed read-back is logged, not raised.
    async fn updated(&self, response: Value) -> Option<Cart> {
        if carries_cart(&response) {
            return Some(decode_cart(response));
        }

        let url = self.client.endpoints().cart();
        let request = ApiRequest::get(url).require_auth().quiet();
        match self.client.executor().execute(&request).await {
            Ok(payload) => Some(decode_cart(payload)),
            Err(e) => {
                warn!(error = %e, "cart changed but could not be read back");
                None
            }
        }
    }
}

/// Whether a mutation response is itself the updated cart.
fn carries_cart(payload: &Value) -> bool {
    payload.get("items").is_some_and(Value::is_array)
}

fn decode_cart(payload: Value) -> Cart {
    if !payload.is_object() {
        return Cart::default();
    }
    serde_json::from_value(payload).unwrap_or_else(|e| {
        warn!(error = %e, "cart payload is malformed");
        Cart::default()
    })
}
