//! Persistence for the confirmed delivery area.
//!
//! A single row holds the area the session committed to; re-hydrating it on
//! startup is what makes a confirmed area sticky across reloads.

use chrono::{DateTime, Utc};
use rusqlite::params;

use zaika_shared::{AreaId, LatLng, SelectedArea};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredArea;

impl Database {
    /// Persist the confirmed area, replacing any previous one.
    pub fn save_area(&self, stored: &StoredArea) -> Result<()> {
        self.conn().execute(
            "INSERT OR REPLACE INTO area_session
                 (id, area_id, name, city, full_address, center_lat, center_lng,
                  delivery_fee, min_order_amount, estimated_time,
                  user_lat, user_lng, checked_at)
             VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                stored.area.id.0,
                stored.area.name,
                stored.area.city,
                stored.area.full_address,
                stored.area.center.map(|c| c.lat),
                stored.area.center.map(|c| c.lng),
                stored.area.delivery_fee,
                stored.area.min_order_amount,
                stored.area.estimated_time,
                stored.user_location.map(|l| l.lat),
                stored.user_location.map(|l| l.lng),
                stored.checked_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load the confirmed area, if one was persisted.
    pub fn load_area(&self) -> Result<Option<StoredArea>> {
        let result = self.conn().query_row(
            "SELECT area_id, name, city, full_address, center_lat, center_lng,
                    delivery_fee, min_order_amount, estimated_time,
                    user_lat, user_lng, checked_at
             FROM area_session WHERE id = 1",
            [],
            row_to_stored_area,
        );

        match result {
            Ok(area) => Ok(Some(area)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }

    /// Forget the confirmed area.
    pub fn clear_area(&self) -> Result<()> {
        self.conn().execute("DELETE FROM area_session", [])?;
        Ok(())
    }
}

fn row_to_stored_area(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredArea> {
    let area_id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let city: String = row.get(2)?;
    let full_address: String = row.get(3)?;
    let center_lat: Option<f64> = row.get(4)?;
    let center_lng: Option<f64> = row.get(5)?;
    let delivery_fee: u32 = row.get(6)?;
    let min_order_amount: u32 = row.get(7)?;
    let estimated_time: String = row.get(8)?;
    let user_lat: Option<f64> = row.get(9)?;
    let user_lng: Option<f64> = row.get(10)?;
    let checked_str: String = row.get(11)?;

    let checked_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&checked_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let center = match (center_lat, center_lng) {
        (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
        _ => None,
    };
    let user_location = match (user_lat, user_lng) {
        (Some(lat), Some(lng)) => Some(LatLng { lat, lng }),
        _ => None,
    };

    Ok(StoredArea {
        area: SelectedArea {
            id: AreaId(area_id),
            name,
            city,
            full_address,
            center,
            delivery_fee,
            min_order_amount,
            estimated_time,
        },
        user_location,
        checked_at,
    })
}
