//! CRUD operations for the guest cart and its applied deal.
//!
//! These are plain persistence helpers; cart business rules (quantity cap,
//! same-item merge, availability gating) live in the client core.

use chrono::{DateTime, Utc};
use rusqlite::params;

use zaika_shared::{AppliedDeal, CartEntryId, MenuItemId, MenuItemSnapshot};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredCartEntry;

impl Database {
    // ------------------------------------------------------------------
    // Entries
    // ------------------------------------------------------------------

    /// Insert a new cart entry.
    pub fn insert_cart_entry(&self, entry: &StoredCartEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO guest_cart
                 (id, menu_item_id, name, price, image, is_available,
                  quantity, price_at_add, added_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                entry.id.as_str(),
                entry.item.id.as_str(),
                entry.item.name,
                entry.item.price,
                entry.item.image,
                entry.item.is_available,
                entry.quantity,
                entry.price_at_add,
                entry.added_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// List all cart entries in insertion order.
    pub fn get_cart_entries(&self) -> Result<Vec<StoredCartEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, menu_item_id, name, price, image, is_available,
                    quantity, price_at_add, added_at
             FROM guest_cart
             ORDER BY added_at ASC",
        )?;

        let rows = stmt.query_map([], row_to_cart_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Fetch the entry for a given menu item, if one exists.
    pub fn get_cart_entry_for_item(&self, item_id: &MenuItemId) -> Result<StoredCartEntry> {
        self.conn()
            .query_row(
                "SELECT id, menu_item_id, name, price, image, is_available,
                        quantity, price_at_add, added_at
                 FROM guest_cart
                 WHERE menu_item_id = ?1",
                params![item_id.as_str()],
                row_to_cart_entry,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Replace the quantity of an entry. Returns `true` if a row changed.
    /// `price_at_add` is deliberately not touched.
    pub fn set_cart_quantity(&self, id: &CartEntryId, quantity: u32) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE guest_cart SET quantity = ?2 WHERE id = ?1",
            params![id.as_str(), quantity],
        )?;
        Ok(affected > 0)
    }

    /// Delete a single entry. Returns `true` if a row was deleted.
    pub fn delete_cart_entry(&self, id: &CartEntryId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM guest_cart WHERE id = ?1", params![id.as_str()])?;
        Ok(affected > 0)
    }

    /// Remove every entry and any applied deal.
    pub fn clear_guest_cart(&self) -> Result<()> {
        self.conn().execute("DELETE FROM guest_cart", [])?;
        self.conn().execute("DELETE FROM guest_deal", [])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Applied deal
    // ------------------------------------------------------------------

    /// Persist the applied promotional deal (replacing any previous one).
    pub fn save_deal(&self, deal: &AppliedDeal) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO guest_deal (id, code, title, savings)
             VALUES (1, ?1, ?2, ?3)",
            params![deal.code, deal.title, deal.savings],
        )?;
        Ok(())
    }

    /// Fetch the applied deal, if any.
    pub fn get_deal(&self) -> Result<Option<AppliedDeal>> {
        let result = self.conn().query_row(
            "SELECT code, title, savings FROM guest_deal WHERE id = 1",
            [],
            |row| {
                Ok(AppliedDeal {
                    code: row.get(0)?,
                    title: row.get(1)?,
                    savings: row.get(2)?,
                })
            },
        );

        match result {
            Ok(deal) => Ok(Some(deal)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Drop the applied deal.
    pub fn clear_deal(&self) -> Result<()> {
        self.conn().execute("DELETE FROM guest_deal", [])?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`StoredCartEntry`].
fn row_to_cart_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredCartEntry> {
    let id: String = row.get(0)?;
    let menu_item_id: String = row.get(1)?;
    let name: String = row.get(2)?;
    let price: u32 = row.get(3)?;
    let image: Option<String> = row.get(4)?;
    let is_available: bool = row.get(5)?;
    let quantity: u32 = row.get(6)?;
    let price_at_add: u32 = row.get(7)?;
    let added_str: String = row.get(8)?;

    let added_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&added_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(StoredCartEntry {
        id: CartEntryId(id),
        item: MenuItemSnapshot {
            id: MenuItemId(menu_item_id),
            name,
            price,
            image,
            is_available,
        },
        quantity,
        price_at_add,
        added_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    fn entry(item_id: &str, price: u32, quantity: u32) -> StoredCartEntry {
        StoredCartEntry {
            id: CartEntryId::generate(),
            item: MenuItemSnapshot {
                id: MenuItemId(item_id.to_string()),
                name: format!("Item {item_id}"),
                price,
                image: None,
                is_available: true,
            },
            quantity,
            price_at_add: price,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn cart_entry_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let e = entry("m1", 500, 2);

        db.insert_cart_entry(&e).unwrap();

        let entries = db.get_cart_entries().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0], e);

        let by_item = db.get_cart_entry_for_item(&e.item.id).unwrap();
        assert_eq!(by_item.id, e.id);
    }

    #[test]
    fn one_entry_per_menu_item() {
        let db = Database::open_in_memory().unwrap();
        db.insert_cart_entry(&entry("m1", 500, 1)).unwrap();

        // Unique index rejects a second row for the same item.
        assert!(db.insert_cart_entry(&entry("m1", 500, 1)).is_err());
    }

    #[test]
    fn quantity_update_leaves_price_at_add_alone() {
        let db = Database::open_in_memory().unwrap();
        let e = entry("m1", 500, 1);
        db.insert_cart_entry(&e).unwrap();

        assert!(db.set_cart_quantity(&e.id, 7).unwrap());

        let stored = db.get_cart_entry_for_item(&e.item.id).unwrap();
        assert_eq!(stored.quantity, 7);
        assert_eq!(stored.price_at_add, 500);
    }

    #[test]
    fn delete_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let a = entry("m1", 500, 1);
        let b = entry("m2", 300, 1);
        db.insert_cart_entry(&a).unwrap();
        db.insert_cart_entry(&b).unwrap();

        assert!(db.delete_cart_entry(&a.id).unwrap());
        assert!(!db.delete_cart_entry(&a.id).unwrap());

        db.clear_guest_cart().unwrap();
        assert!(db.get_cart_entries().unwrap().is_empty());
    }

    #[test]
    fn deal_round_trip() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_deal().unwrap().is_none());

        let deal = AppliedDeal {
            code: "WELCOME50".into(),
            title: "Welcome offer".into(),
            savings: 50,
        };
        db.save_deal(&deal).unwrap();
        assert_eq!(db.get_deal().unwrap(), Some(deal));

        db.clear_deal().unwrap();
        assert!(db.get_deal().unwrap().is_none());
    }
}
