//! Product catalog records.

use serde::{Deserialize, Serialize};

use super::{EntityId, Price};

/// A product in the shop catalog (bouquet, basket, fruit box, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: EntityId,
    pub name: String,
    /// Category display name.
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<EntityId>,
    pub price: Price,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Short marketing badge ("New", "Best seller").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_minimal_payload() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "name": "Pastel roses",
            "price": 450000
        }))
        .unwrap();
        assert_eq!(product.id, EntityId::from(1));
        assert_eq!(product.price, Price::from_dong(450_000));
        assert!(product.category.is_empty());
        assert!(product.badge.is_none());
    }

    #[test]
    fn test_product_camel_case_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": "p-2",
            "name": "Sunflower box",
            "category": "Boxes",
            "categoryId": 4,
            "price": "320000",
            "image": "https://cdn.example/sunflower.jpg"
        }))
        .unwrap();
        assert_eq!(product.category_id, Some(EntityId::from("4")));
    }

    #[test]
    fn test_category_skips_absent_fields() {
        let category = Category {
            id: EntityId::from(3),
            name: "Orchids".to_string(),
            description: None,
            image: None,
        };
        assert_eq!(
            serde_json::to_value(&category).unwrap(),
            json!({"id": 3, "name": "Orchids"})
        );
    }
}
