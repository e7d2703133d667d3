//! Dual cart model.
//!
//! Guests keep their cart in the local store; signed-in users keep it on the
//! server and this module only mirrors the latest snapshot. Both sides are
//! projected into the same [`CartEntry`] view so the UI never cares which
//! one is active. On login the guest cart is pushed to the server and the
//! local copy is dropped.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use tracing::{debug, info, warn};

use zaika_net::{ApiClient, CartSnapshot};
use zaika_shared::constants::CART_QUANTITY_CAP;
use zaika_shared::{AppliedDeal, CartEntryId, MenuItemSnapshot};
use zaika_store::{Database, StoredCartEntry};

use crate::error::Result;

/// One cart line, independent of where the cart lives.
#[derive(Debug, Clone, PartialEq)]
pub struct CartEntry {
    pub id: CartEntryId,
    pub item: MenuItemSnapshot,
    pub quantity: u32,
    /// Unit price captured when the item entered the cart. Catalog price
    /// edits never touch existing lines.
    pub price_at_add: u32,
}

impl CartEntry {
    pub fn line_total(&self) -> u32 {
        self.price_at_add * self.quantity
    }
}

/// What the UI renders: lines plus the derived money figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub entries: Vec<CartEntry>,
    pub deal: Option<AppliedDeal>,
    pub subtotal: u32,
    /// Subtotal after the deal, floored at zero.
    pub total: u32,
}

impl CartView {
    fn compute(entries: Vec<CartEntry>, deal: Option<AppliedDeal>) -> Self {
        let subtotal: u32 = entries.iter().map(CartEntry::line_total).sum();
        let savings = deal.as_ref().map(|d| d.savings).unwrap_or(0);
        Self {
            entries,
            deal,
            subtotal,
            total: subtotal.saturating_sub(savings),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.entries.iter().map(|e| e.quantity).sum()
    }
}

/// Outcome of an add attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The line was created or merged; carries the resulting quantity.
    Added { quantity: u32 },
    /// The item is marked unavailable; the cart was left untouched.
    Unavailable,
}

// ---------------------------------------------------------------------------
// Guest cart
// ---------------------------------------------------------------------------

/// Locally persisted cart for sessions without an account.
pub struct GuestCart {
    db: Arc<Mutex<Database>>,
}

impl GuestCart {
    pub fn new(db: Arc<Mutex<Database>>) -> Self {
        Self { db }
    }

    /// Add an item. A second add of the same item merges into the existing
    /// line; quantities clamp at the per-line cap.
    pub fn add(&self, item: &MenuItemSnapshot, quantity: u32) -> Result<AddOutcome> {
        if !item.is_available {
            debug!(item = %item.name, "item unavailable, not added");
            return Ok(AddOutcome::Unavailable);
        }

        let db = self.lock_db();
        match db.get_cart_entry_for_item(&item.id) {
            Ok(existing) => {
                let merged = existing
                    .quantity
                    .saturating_add(quantity)
                    .min(CART_QUANTITY_CAP);
                db.set_cart_quantity(&existing.id, merged)?;
                Ok(AddOutcome::Added { quantity: merged })
            }
            Err(zaika_store::StoreError::NotFound) => {
                let quantity = quantity.min(CART_QUANTITY_CAP).max(1);
                db.insert_cart_entry(&StoredCartEntry {
                    id: CartEntryId::generate(),
                    item: item.clone(),
                    quantity,
                    price_at_add: item.price,
                    added_at: Utc::now(),
                })?;
                Ok(AddOutcome::Added { quantity })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Set a line's quantity. Zero removes the line; anything above the cap
    /// clamps to it. The captured price never changes.
    pub fn set_quantity(&self, id: &CartEntryId, quantity: u32) -> Result<()> {
        let db = self.lock_db();
        if quantity == 0 {
            db.delete_cart_entry(id)?;
        } else {
            db.set_cart_quantity(id, quantity.min(CART_QUANTITY_CAP))?;
        }
        Ok(())
    }

    pub fn remove(&self, id: &CartEntryId) -> Result<()> {
        self.lock_db().delete_cart_entry(id)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.lock_db().clear_guest_cart()?;
        Ok(())
    }

    pub fn apply_deal(&self, deal: &AppliedDeal) -> Result<()> {
        self.lock_db().save_deal(deal)?;
        Ok(())
    }

    pub fn remove_deal(&self) -> Result<()> {
        self.lock_db().clear_deal()?;
        Ok(())
    }

    pub fn view(&self) -> Result<CartView> {
        let db = self.lock_db();
        let entries = db
            .get_cart_entries()?
            .into_iter()
            .map(|stored| CartEntry {
                id: stored.id,
                item: stored.item,
                quantity: stored.quantity,
                price_at_add: stored.price_at_add,
            })
            .collect();
        let deal = db.get_deal()?;
        Ok(CartView::compute(entries, deal))
    }

    /// Drain the guest cart into the server cart after a login. Lines the
    /// server rejects (e.g. items gone from the catalog) are skipped rather
    /// than aborting the migration.
    pub async fn migrate_to(&self, server: &ServerCart) -> Result<()> {
        let entries = self.view()?.entries;
        if entries.is_empty() {
            return Ok(());
        }

        info!(lines = entries.len(), "migrating guest cart to server");
        for entry in &entries {
            if let Err(e) = server.add(&entry.item, entry.quantity).await {
                warn!(item = %entry.item.name, error = %e, "line skipped during migration");
            }
        }
        self.clear()
    }

    fn lock_db(&self) -> std::sync::MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Server cart
// ---------------------------------------------------------------------------

/// Mirror of the signed-in user's server-side cart.
///
/// Every mutation goes through the API and the returned snapshot replaces
/// the mirror whole; there is no local merging.
pub struct ServerCart {
    api: Arc<ApiClient>,
    snapshot: Mutex<Option<CartSnapshot>>,
}

impl ServerCart {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            snapshot: Mutex::new(None),
        }
    }

    pub async fn refresh(&self) -> Result<CartView> {
        let snapshot = self.api.get_cart().await?;
        Ok(self.store(snapshot))
    }

    pub async fn add(&self, item: &MenuItemSnapshot, quantity: u32) -> Result<AddOutcome> {
        if !item.is_available {
            return Ok(AddOutcome::Unavailable);
        }
        let quantity = quantity.min(CART_QUANTITY_CAP).max(1);
        let snapshot = self.api.add_cart_item(&item.id, quantity).await?;
        let added = snapshot
            .items
            .iter()
            .find(|e| e.menu_item.id == item.id)
            .map(|e| e.quantity)
            .unwrap_or(quantity);
        self.store(snapshot);
        Ok(AddOutcome::Added { quantity: added })
    }

    pub async fn set_quantity(&self, id: &CartEntryId, quantity: u32) -> Result<CartView> {
        let snapshot = if quantity == 0 {
            self.api.remove_cart_item(id).await?
        } else {
            self.api
                .set_cart_item_quantity(id, quantity.min(CART_QUANTITY_CAP))
                .await?
        };
        Ok(self.store(snapshot))
    }

    pub async fn remove(&self, id: &CartEntryId) -> Result<CartView> {
        let snapshot = self.api.remove_cart_item(id).await?;
        Ok(self.store(snapshot))
    }

    pub async fn clear(&self) -> Result<CartView> {
        let snapshot = self.api.clear_cart().await?;
        Ok(self.store(snapshot))
    }

    /// The last snapshot fetched, if any. Stale until the next mutation or
    /// [`refresh`](Self::refresh).
    pub fn cached(&self) -> Option<CartView> {
        self.lock_snapshot().as_ref().map(view_of)
    }

    /// Drop the mirror so the next read has to refetch.
    pub fn invalidate(&self) {
        *self.lock_snapshot() = None;
    }

    fn store(&self, snapshot: CartSnapshot) -> CartView {
        let view = view_of(&snapshot);
        *self.lock_snapshot() = Some(snapshot);
        view
    }

    fn lock_snapshot(&self) -> std::sync::MutexGuard<'_, Option<CartSnapshot>> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ---------------------------------------------------------------------------
// Unified interface
// ---------------------------------------------------------------------------

/// Whichever cart is active for the current auth state.
///
/// Guest operations only touch the local store but share the async
/// signatures, so callers are oblivious to where the cart lives.
pub enum ActiveCart<'a> {
    Guest(&'a GuestCart),
    Server(&'a ServerCart),
}

impl ActiveCart<'_> {
    pub async fn add(&self, item: &MenuItemSnapshot, quantity: u32) -> Result<AddOutcome> {
        match self {
            ActiveCart::Guest(cart) => cart.add(item, quantity),
            ActiveCart::Server(cart) => cart.add(item, quantity).await,
        }
    }

    pub async fn set_quantity(&self, id: &CartEntryId, quantity: u32) -> Result<()> {
        match self {
            ActiveCart::Guest(cart) => cart.set_quantity(id, quantity),
            ActiveCart::Server(cart) => {
                cart.set_quantity(id, quantity).await?;
                Ok(())
            }
        }
    }

    pub async fn remove(&self, id: &CartEntryId) -> Result<()> {
        match self {
            ActiveCart::Guest(cart) => cart.remove(id),
            ActiveCart::Server(cart) => {
                cart.remove(id).await?;
                Ok(())
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        match self {
            ActiveCart::Guest(cart) => cart.clear(),
            ActiveCart::Server(cart) => {
                cart.clear().await?;
                Ok(())
            }
        }
    }

    pub async fn view(&self) -> Result<CartView> {
        match self {
            ActiveCart::Guest(cart) => cart.view(),
            ActiveCart::Server(cart) => match cart.cached() {
                Some(view) => Ok(view),
                None => cart.refresh().await,
            },
        }
    }
}

fn view_of(snapshot: &CartSnapshot) -> CartView {
    let entries = snapshot
        .items
        .iter()
        .map(|entry| CartEntry {
            id: entry.id.clone(),
            item: entry.menu_item.clone(),
            quantity: entry.quantity,
            price_at_add: entry.price_at_add,
        })
        .collect();
    // The server already applied any promotion; its total is authoritative.
    let mut view = CartView::compute(entries, None);
    view.total = snapshot.total;
    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use zaika_shared::MenuItemId;

    fn cart() -> GuestCart {
        let db = Database::open_in_memory().unwrap();
        GuestCart::new(Arc::new(Mutex::new(db)))
    }

    fn item(id: &str, price: u32) -> MenuItemSnapshot {
        MenuItemSnapshot {
            id: MenuItemId(id.to_string()),
            name: format!("Item {id}"),
            price,
            image: None,
            is_available: true,
        }
    }

    #[test]
    fn adding_same_item_twice_merges_one_line() {
        let cart = cart();
        let biryani = item("m1", 350);

        cart.add(&biryani, 1).unwrap();
        cart.add(&biryani, 2).unwrap();

        let view = cart.view().unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.entries[0].quantity, 3);
        assert_eq!(view.subtotal, 1050);
    }

    #[test]
    fn quantity_clamps_at_cap() {
        let cart = cart();
        let entry_item = item("m1", 100);

        assert_eq!(
            cart.add(&entry_item, 49).unwrap(),
            AddOutcome::Added { quantity: 49 }
        );
        assert_eq!(
            cart.add(&entry_item, 10).unwrap(),
            AddOutcome::Added {
                quantity: CART_QUANTITY_CAP
            }
        );

        let id = cart.view().unwrap().entries[0].id.clone();
        cart.set_quantity(&id, 200).unwrap();
        assert_eq!(cart.view().unwrap().entries[0].quantity, CART_QUANTITY_CAP);
    }

    #[test]
    fn unavailable_item_is_a_no_op() {
        let cart = cart();
        let mut sold_out = item("m1", 100);
        sold_out.is_available = false;

        assert_eq!(cart.add(&sold_out, 1).unwrap(), AddOutcome::Unavailable);
        assert!(cart.view().unwrap().is_empty());
    }

    #[test]
    fn zero_quantity_removes_the_line() {
        let cart = cart();
        cart.add(&item("m1", 100), 2).unwrap();

        let id = cart.view().unwrap().entries[0].id.clone();
        cart.set_quantity(&id, 0).unwrap();
        assert!(cart.view().unwrap().is_empty());
    }

    #[test]
    fn price_at_add_survives_quantity_changes() {
        let cart = cart();
        cart.add(&item("m1", 350), 1).unwrap();

        let id = cart.view().unwrap().entries[0].id.clone();
        cart.set_quantity(&id, 5).unwrap();

        let view = cart.view().unwrap();
        assert_eq!(view.entries[0].price_at_add, 350);
        assert_eq!(view.subtotal, 1750);
    }

    #[test]
    fn deal_savings_floor_at_zero() {
        let cart = cart();
        cart.add(&item("m1", 100), 1).unwrap();
        cart.apply_deal(&AppliedDeal {
            code: "BIGSAVE".into(),
            title: "Big save".into(),
            savings: 500,
        })
        .unwrap();

        let view = cart.view().unwrap();
        assert_eq!(view.subtotal, 100);
        assert_eq!(view.total, 0);

        cart.remove_deal().unwrap();
        assert_eq!(cart.view().unwrap().total, 100);
    }

    #[test]
    fn clear_drops_lines_and_deal() {
        let cart = cart();
        cart.add(&item("m1", 100), 1).unwrap();
        cart.apply_deal(&AppliedDeal {
            code: "X".into(),
            title: "X".into(),
            savings: 10,
        })
        .unwrap();

        cart.clear().unwrap();
        let view = cart.view().unwrap();
        assert!(view.is_empty());
        assert!(view.deal.is_none());
    }
}
