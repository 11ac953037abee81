//! Shopping cart records.

use serde::{Deserialize, Serialize};

use super::{EntityId, Price};

/// One line in the signed-in user's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: EntityId,
    #[serde(default)]
    pub product_name: String,
    pub price: Price,
    pub quantity: u32,
    #[serde(default)]
    pub image_url: String,
}

impl CartItem {
    /// Price × quantity.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.price.times(self.quantity)
    }
}

/// The signed-in user's cart as returned by the backend.
///
/// Every field is optional on the wire; an empty body is an empty cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Cart {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<EntityId>,
    pub items: Vec<CartItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_price: Option<Price>,
}

impl Cart {
    /// Sum of line subtotals, recomputed client-side.
    #[must_use]
    pub fn total(&self) -> Price {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Number of units across all lines.
    #[must_use]
    pub fn unit_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// The line for `product_id`, if present.
    #[must_use]
    pub fn item(&self, product_id: &EntityId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id == *product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Cart {
        serde_json::from_value(json!({
            "userId": "u-1",
            "items": [
                {"productId": 1, "productName": "Roses", "price": 200000, "quantity": 2, "imageUrl": ""},
                {"productId": "7", "productName": "Lilies", "price": 150000, "quantity": 1}
            ],
            "totalPrice": 550000
        }))
        .unwrap()
    }

    #[test]
    fn test_empty_body_is_empty_cart() {
        let cart: Cart = serde_json::from_value(json!({})).unwrap();
        assert!(cart.items.is_empty());
        assert_eq!(cart.total(), Price::ZERO);
    }

    #[test]
    fn test_total_and_units() {
        let cart = sample();
        assert_eq!(cart.total(), Price::from_dong(550_000));
        assert_eq!(cart.unit_count(), 3);
    }

    #[test]
    fn test_item_lookup_tolerates_id_types() {
        let cart = sample();
        assert_eq!(
            cart.item(&EntityId::from(7)).map(|i| i.product_name.as_str()),
            Some("Lilies")
        );
        assert!(cart.item(&EntityId::from(99)).is_none());
    }
}
