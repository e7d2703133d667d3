//! Domain model structs persisted in the local database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to a UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zaika_shared::{CartEntryId, LatLng, MenuItemSnapshot, SelectedArea, UserProfile};

// ---------------------------------------------------------------------------
// Guest cart
// ---------------------------------------------------------------------------

/// One guest cart line. Keyed by a locally generated UUID; the unit price is
/// frozen at add time and never tracks later catalog changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredCartEntry {
    pub id: CartEntryId,
    pub item: MenuItemSnapshot,
    pub quantity: u32,
    pub price_at_add: u32,
    pub added_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Area session
// ---------------------------------------------------------------------------

/// The confirmed delivery area plus the raw location it was checked against.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredArea {
    pub area: SelectedArea,
    pub user_location: Option<LatLng>,
    pub checked_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Auth session
// ---------------------------------------------------------------------------

/// Bearer token and minimal profile of the signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub user: UserProfile,
    pub saved_at: DateTime<Utc>,
}
