//! Cart line items and their product inputs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Product data the caller hands to the cart when adding a line.
///
/// Product fetching itself is owned by the page components; the cart only
/// needs enough to render and price a line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Backend product identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Unit price. Must be non-negative.
    pub price: Decimal,
    /// Product image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Pass-through product attributes (size, color, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One line of the cart.
///
/// A cart holds at most one line per `product_id`; adding the same product
/// again merges into the existing line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product identifier, the line's unique key.
    pub product_id: String,
    /// Display name at the time the line was added.
    pub product_name: String,
    /// Unit price. Must be non-negative.
    pub unit_price: Decimal,
    /// Units of the product. Expected to be >= 1.
    pub quantity: u32,
    /// Product image URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Pass-through product attributes carried from the [`Product`].
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CartItem {
    /// Build a line from a product and a quantity.
    #[must_use]
    pub fn from_product(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity,
            image_url: product.image_url.clone(),
            extra: product.extra.clone(),
        }
    }

    /// Price of this line: unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: &str, price: Decimal) -> Product {
        Product {
            id: id.to_owned(),
            name: format!("Product {id}"),
            price,
            image_url: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_from_product_copies_attributes() {
        let mut p = product("p1", d("19.99"));
        p.extra
            .insert("color".to_owned(), Value::String("green".to_owned()));

        let item = CartItem::from_product(&p, 2);
        assert_eq!(item.product_id, "p1");
        assert_eq!(item.quantity, 2);
        assert_eq!(item.extra["color"], "green");
    }

    #[test]
    fn test_line_total() {
        let item = CartItem::from_product(&product("p1", d("19.99")), 3);
        assert_eq!(item.line_total(), d("59.97"));
    }

    #[test]
    fn test_serde_wire_names() {
        let item = CartItem::from_product(&product("p1", d("5")), 1);
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("productId").is_some());
        assert!(json.get("productName").is_some());
        assert!(json.get("unitPrice").is_some());
    }
}
