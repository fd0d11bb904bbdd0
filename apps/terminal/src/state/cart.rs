//! # Cart State
//!
//! Sale and purchase carts for every signed-in user.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart State Operations                                │
//! │                                                                         │
//! │  Command                    Cart State Change                           │
//! │  ───────                    ─────────────────                           │
//! │                                                                         │
//! │  add_sale_line() ─────────► sales[user].add_line(product, stock, qty)  │
//! │  remove_sale_line() ──────► sales[user].remove_line(product)           │
//! │  complete_sale() ─────────► snapshot → commit → sales.remove(user)     │
//! │                                                                         │
//! │  add_purchase_line() ─────► purchases[user].add_line(...)              │
//! │  complete_purchase() ─────► snapshot → commit → purchases.remove(user) │
//! │                                                                         │
//! │  NOTE: The lock is released before any database call. A commit works  │
//! │        on a snapshot and the cart is only dropped once it succeeded.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use duka_core::{PurchaseCart, SaleCart};

#[derive(Debug, Default)]
struct Carts {
    sales: HashMap<String, SaleCart>,
    purchases: HashMap<String, PurchaseCart>,
}

/// Carts keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    carts: Arc<Mutex<Carts>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock leaves plain data behind; keep using it.
    fn lock(&self) -> MutexGuard<'_, Carts> {
        self.carts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the user's sale cart for `branch_id`, creating it if needed.
    ///
    /// A cart left over from another branch is replaced.
    pub fn with_sale_cart<F, R>(&self, user_id: &str, branch_id: &str, f: F) -> R
    where
        F: FnOnce(&mut SaleCart) -> R,
    {
        let mut carts = self.lock();
        let cart = carts
            .sales
            .entry(user_id.to_string())
            .or_insert_with(|| SaleCart::new(branch_id));
        if cart.branch_id != branch_id {
            *cart = SaleCart::new(branch_id);
        }
        f(cart)
    }

    /// A copy of the user's sale cart, if any.
    pub fn sale_cart(&self, user_id: &str) -> Option<SaleCart> {
        self.lock().sales.get(user_id).cloned()
    }

    pub fn clear_sale_cart(&self, user_id: &str) {
        self.lock().sales.remove(user_id);
    }

    /// Runs `f` on the user's purchase cart, creating one for `branch_id`
    /// if the user has none or only an empty one.
    ///
    /// A non-empty cart for another branch is passed through unchanged; the
    /// caller decides what to do with it.
    pub fn with_purchase_cart<F, R>(&self, user_id: &str, branch_id: &str, f: F) -> R
    where
        F: FnOnce(&mut PurchaseCart) -> R,
    {
        let mut carts = self.lock();
        let cart = carts
            .purchases
            .entry(user_id.to_string())
            .or_insert_with(|| PurchaseCart::new(branch_id));
        if cart.is_empty() && cart.branch_id != branch_id {
            *cart = PurchaseCart::new(branch_id);
        }
        f(cart)
    }

    /// Runs `f` on the user's existing purchase cart.
    pub fn with_existing_purchase_cart<F, R>(&self, user_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut PurchaseCart) -> R,
    {
        self.lock().purchases.get_mut(user_id).map(f)
    }

    /// Runs `f` on the user's existing sale cart.
    pub fn with_existing_sale_cart<F, R>(&self, user_id: &str, f: F) -> Option<R>
    where
        F: FnOnce(&mut SaleCart) -> R,
    {
        self.lock().sales.get_mut(user_id).map(f)
    }

    pub fn purchase_cart(&self, user_id: &str) -> Option<PurchaseCart> {
        self.lock().purchases.get(user_id).cloned()
    }

    pub fn clear_purchase_cart(&self, user_id: &str) {
        self.lock().purchases.remove(user_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_carts_are_per_user() {
        let state = CartState::new();
        state.with_sale_cart("amina", "main", |cart| assert!(cart.is_empty()));
        state.with_sale_cart("baraka", "main", |_| ());

        assert!(state.sale_cart("amina").is_some());
        assert!(state.sale_cart("baraka").is_some());
        assert!(state.sale_cart("wanjiru").is_none());

        state.clear_sale_cart("amina");
        assert!(state.sale_cart("amina").is_none());
        assert!(state.sale_cart("baraka").is_some());
    }

    #[test]
    fn test_sale_cart_follows_branch() {
        let state = CartState::new();
        state.with_sale_cart("amina", "main", |_| ());
        let branch = state.with_sale_cart("amina", "westlands", |cart| cart.branch_id.clone());
        assert_eq!(branch, "westlands");
    }

    #[test]
    fn test_empty_purchase_cart_switches_branch() {
        let state = CartState::new();
        state.with_purchase_cart("amina", "main", |_| ());
        let branch = state.with_purchase_cart("amina", "westlands", |cart| cart.branch_id.clone());
        assert_eq!(branch, "westlands");
        assert!(state.purchase_cart("amina").is_some());

        state.clear_purchase_cart("amina");
        assert!(state.purchase_cart("amina").is_none());
        assert!(state.with_existing_purchase_cart("amina", |_| ()).is_none());
    }
}
