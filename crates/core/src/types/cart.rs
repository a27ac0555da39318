//! Cart entries, line items, and cart reconciliation.
//!
//! The backend stores a cart as bare `(productId, qty)` pairs. Rendering a
//! cart means merging those entries with the catalog snapshot the page was
//! built from; that merge is [`reconcile`].

use serde::{Deserialize, Serialize};

use super::{Price, Product, ProductId};

/// A server-held cart entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: ProductId,
    pub qty: u32,
}

/// A cart entry merged with its catalog product.
///
/// Line items exist only while a page is rendered; they are rebuilt from the
/// latest cart and catalog on every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub product_id: ProductId,
    pub qty: u32,
    pub name: String,
    pub category: Option<String>,
    pub image: String,
    pub cost: Price,
}

impl LineItem {
    fn merge(entry: &CartEntry, product: &Product) -> Self {
        Self {
            product_id: entry.product_id.clone(),
            qty: entry.qty,
            name: product.name.clone(),
            category: product.category.clone(),
            image: product.image.clone(),
            cost: product.cost,
        }
    }

    /// Cost of this line (unit cost times quantity).
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.cost.times(self.qty)
    }
}

fn find_product<'a>(catalog: &'a [Product], id: &ProductId) -> Option<&'a Product> {
    catalog.iter().find(|product| &product.id == id)
}

/// Merge cart entries with the catalog they were fetched alongside.
///
/// `None` entries mean no cart has been loaded (signed out, or the cart
/// fetch failed) and yield `None`; an empty cart yields `Some(vec![])`.
/// Output order follows `entries`. Entries whose product is not in
/// `catalog` are dropped; use [`missing_products`] to report them.
#[must_use]
pub fn reconcile(entries: Option<&[CartEntry]>, catalog: &[Product]) -> Option<Vec<LineItem>> {
    let entries = entries?;

    Some(
        entries
            .iter()
            .filter_map(|entry| {
                find_product(catalog, &entry.product_id)
                    .map(|product| LineItem::merge(entry, product))
            })
            .collect(),
    )
}

/// Product IDs referenced by `entries` that `catalog` does not contain.
#[must_use]
pub fn missing_products(entries: &[CartEntry], catalog: &[Product]) -> Vec<ProductId> {
    entries
        .iter()
        .filter(|entry| find_product(catalog, &entry.product_id).is_none())
        .map(|entry| entry.product_id.clone())
        .collect()
}

/// Total value of the cart: sum of cost times quantity.
#[must_use]
pub fn total_value(items: &[LineItem]) -> Price {
    items.iter().map(LineItem::subtotal).sum()
}

/// Total number of units in the cart.
#[must_use]
pub fn total_count(items: &[LineItem]) -> u32 {
    items
        .iter()
        .fold(0u32, |acc, item| acc.saturating_add(item.qty))
}
