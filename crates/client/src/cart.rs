//! Cart aggregation with write-through persistence.

use std::sync::{Arc, PoisonError, RwLock};

use rust_decimal::Decimal;
use tracing::warn;

use prickly_pear_core::{CartItem, Product};

use crate::storage::{Storage, keys};

/// Process-wide cart.
///
/// Lines are keyed by product id - at most one line per product - and kept
/// in insertion order (first added first). Mutations are synchronous and
/// persist the full line set immediately; persistence failures are logged
/// and swallowed, the in-memory state stays authoritative.
///
/// The cart never talks to the network. Checkout submission is owned by an
/// external collaborator that reads a snapshot via [`items`](Self::items)
/// and calls [`clear`](Self::clear) on success.
#[derive(Clone)]
pub struct CartAggregator {
    inner: Arc<CartInner>,
}

struct CartInner {
    lines: RwLock<Vec<CartItem>>,
    storage: Arc<dyn Storage>,
}

impl CartAggregator {
    /// Open the cart, restoring any persisted lines.
    ///
    /// Corrupt persisted data is discarded with a warning, never fatal.
    #[must_use]
    pub fn open(storage: Arc<dyn Storage>) -> Self {
        let lines = match storage.get(keys::CART) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(error = %err, "discarding corrupt persisted cart");
                Vec::new()
            }),
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!(error = %err, "failed to read persisted cart");
                Vec::new()
            }
        };

        Self {
            inner: Arc::new(CartInner {
                lines: RwLock::new(lines),
                storage,
            }),
        }
    }

    /// Add `quantity` units of a product. An existing line for the same
    /// product id is incremented; otherwise a new line is appended.
    pub fn add_item(&self, product: &Product, quantity: u32) {
        let snapshot = {
            let mut lines = self.write_lines();
            if let Some(line) = lines.iter_mut().find(|l| l.product_id == product.id) {
                line.quantity += quantity;
            } else {
                lines.push(CartItem::from_product(product, quantity));
            }
            lines.clone()
        };
        self.persist(&snapshot);
    }

    /// Set the quantity of an existing line. No-op when the line is absent.
    ///
    /// The quantity is expected to be >= 1; callers clamp before calling,
    /// the aggregator does not reject.
    pub fn update_quantity(&self, product_id: &str, quantity: u32) {
        let snapshot = {
            let mut lines = self.write_lines();
            let Some(line) = lines.iter_mut().find(|l| l.product_id == product_id) else {
                return;
            };
            line.quantity = quantity;
            lines.clone()
        };
        self.persist(&snapshot);
    }

    /// Remove a line. No-op when the line is absent.
    pub fn remove_item(&self, product_id: &str) {
        let snapshot = {
            let mut lines = self.write_lines();
            let before = lines.len();
            lines.retain(|l| l.product_id != product_id);
            if lines.len() == before {
                return;
            }
            lines.clone()
        };
        self.persist(&snapshot);
    }

    /// Empty the cart and persist the empty state. Used after a successful
    /// checkout.
    pub fn clear(&self) {
        {
            let mut lines = self.write_lines();
            lines.clear();
        }
        self.persist(&[]);
    }

    /// Snapshot of the lines in insertion order.
    #[must_use]
    pub fn items(&self) -> Vec<CartItem> {
        self.read_lines().clone()
    }

    /// Sum of `unit_price * quantity` over all lines.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.read_lines()
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_total())
    }

    /// Number of lines (not units).
    #[must_use]
    pub fn len(&self) -> usize {
        self.read_lines().len()
    }

    /// `true` when the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read_lines().is_empty()
    }

    fn persist(&self, lines: &[CartItem]) {
        match serde_json::to_string(lines) {
            Ok(raw) => {
                if let Err(err) = self.inner.storage.set(keys::CART, &raw) {
                    warn!(error = %err, "failed to persist cart");
                }
            }
            Err(err) => warn!(error = %err, "failed to encode cart"),
        }
    }

    fn read_lines(&self) -> std::sync::RwLockReadGuard<'_, Vec<CartItem>> {
        self.inner
            .lines
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_lines(&self) -> std::sync::RwLockWriteGuard<'_, Vec<CartItem>> {
        self.inner
            .lines
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::Map;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn product(id: &str, price: &str) -> Product {
        Product {
            id: id.to_owned(),
            name: format!("Product {id}"),
            price: d(price),
            image_url: None,
            extra: Map::new(),
        }
    }

    fn cart() -> (Arc<MemoryStore>, CartAggregator) {
        let storage = Arc::new(MemoryStore::new());
        let cart = CartAggregator::open(Arc::clone(&storage) as Arc<dyn Storage>);
        (storage, cart)
    }

    #[test]
    fn test_repeated_add_merges_into_one_line() {
        let (_, cart) = cart();
        let p = product("p1", "10.00");

        cart.add_item(&p, 1);
        cart.add_item(&p, 2);
        cart.add_item(&p, 3);

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 6);
    }

    #[test]
    fn test_remove_then_add_leaves_single_line() {
        let (_, cart) = cart();
        let p = product("p1", "10.00");

        cart.add_item(&p, 2);
        cart.remove_item("p1");
        cart.add_item(&p, 1);

        let items = cart.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items.first().unwrap().quantity, 1);
    }

    #[test]
    fn test_insertion_order_is_stable() {
        let (_, cart) = cart();
        cart.add_item(&product("p1", "1"), 1);
        cart.add_item(&product("p2", "1"), 1);
        cart.add_item(&product("p3", "1"), 1);
        // Merging must not reorder.
        cart.add_item(&product("p1", "1"), 1);

        let ids: Vec<String> = cart.items().into_iter().map(|l| l.product_id).collect();
        assert_eq!(ids, vec!["p1", "p2", "p3"]);
    }

    #[test]
    fn test_update_quantity() {
        let (_, cart) = cart();
        cart.add_item(&product("p1", "5.00"), 1);

        cart.update_quantity("p1", 4);
        assert_eq!(cart.items().first().unwrap().quantity, 4);

        // Absent line is a no-op.
        cart.update_quantity("ghost", 2);
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let (_, cart) = cart();
        cart.add_item(&product("p1", "5.00"), 1);
        cart.remove_item("ghost");
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_total() {
        let (_, cart) = cart();
        cart.add_item(&product("p1", "19.99"), 2);
        cart.add_item(&product("p2", "0.01"), 3);

        assert_eq!(cart.total(), d("40.01"));
    }

    #[test]
    fn test_total_of_empty_cart_is_zero() {
        let (_, cart) = cart();
        assert_eq!(cart.total(), Decimal::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_persist_restore_roundtrip() {
        let (storage, cart) = cart();
        cart.add_item(&product("p1", "19.99"), 2);
        cart.add_item(&product("p2", "5.00"), 1);

        let restored = CartAggregator::open(storage as Arc<dyn Storage>);
        let mut original = cart.items();
        let mut reloaded = restored.items();
        original.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        reloaded.sort_by(|a, b| a.product_id.cmp(&b.product_id));
        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_clear_persists_empty_state() {
        let (storage, cart) = cart();
        cart.add_item(&product("p1", "19.99"), 2);
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(storage.get(keys::CART).unwrap(), Some("[]".to_owned()));
    }

    #[test]
    fn test_corrupt_persisted_cart_opens_empty() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(keys::CART, "definitely not json").unwrap();

        let cart = CartAggregator::open(storage as Arc<dyn Storage>);
        assert!(cart.is_empty());
    }
}
