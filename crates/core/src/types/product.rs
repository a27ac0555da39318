//! Catalog product.

use serde::{Deserialize, Serialize};

use super::{Price, ProductId};

/// A product as served by the backend catalog.
///
/// Products are immutable once fetched; a re-fetch or search replaces the
/// whole list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    pub image: String,
    pub cost: Price,
    #[serde(default)]
    pub rating: u8,
}

impl Product {
    /// Highest rating a product can carry.
    pub const MAX_RATING: u8 = 5;

    /// Rating clamped to the 0-5 star range.
    #[must_use]
    pub fn stars(&self) -> u8 {
        self.rating.min(Self::MAX_RATING)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_backend_product() {
        let json = r#"{
            "name": "Tan Leatherette Weekender Duffle",
            "category": "Fashion",
            "cost": 150,
            "rating": 4,
            "image": "https://example.com/duffle.png",
            "_id": "PmInA797xJhMIPti"
        }"#;

        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id.as_str(), "PmInA797xJhMIPti");
        assert_eq!(product.cost, Price::new(150));
        assert_eq!(product.category.as_deref(), Some("Fashion"));
        assert_eq!(product.stars(), 4);
    }

    #[test]
    fn test_stars_clamped() {
        let product = Product {
            id: ProductId::new("p"),
            name: "Overrated".to_string(),
            category: None,
            image: String::new(),
            cost: Price::new(1),
            rating: 9,
        };
        assert_eq!(product.stars(), 5);
    }
}
