use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Server-issued identifiers are opaque strings (the backend keys everything
// by document id). Newtypes keep them from being mixed up at call sites.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short human-facing form shown in tracking headers (`#A1B2C3`).
    pub fn short(&self) -> String {
        let tail = if self.0.len() > 6 {
            &self.0[self.0.len() - 6..]
        } else {
            &self.0
        };
        tail.to_uppercase()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for OrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct MenuItemId(pub String);

impl MenuItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MenuItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct RiderId(pub String);

impl std::fmt::Display for RiderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct AreaId(pub String);

impl std::fmt::Display for AreaId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a single cart entry. Guest entries use a locally generated
/// UUID; server-backed entries carry the server-issued subdocument id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CartEntryId(pub String);

impl CartEntryId {
    /// Generate a fresh local id for a guest cart entry.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CartEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named subscription channel on the realtime transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Per-user room carrying all of that user's order updates.
    User(UserId),
    /// Per-order room carrying live tracking events for one order.
    Order(OrderId),
}

impl std::fmt::Display for RoomKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomKey::User(id) => write!(f, "user:{}", id.0),
            RoomKey::Order(id) => write!(f, "order:{}", id.0),
        }
    }
}

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Lifecycle of an order as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PendingPayment,
    Confirmed,
    Preparing,
    OutForDelivery,
    Delivered,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Terminal statuses never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::PendingPayment => "Awaiting Payment",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::OutForDelivery => "Out for Delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Rejected => "Rejected",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Easypaisa,
    Jazzcash,
    Bank,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Canceled,
    Refunded,
}

/// Snapshot of a menu item as it was when it entered a cart. Decoupled from
/// later catalog edits; only availability gates adding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemSnapshot {
    #[serde(rename = "_id")]
    pub id: MenuItemId,
    pub name: String,
    /// Unit price in whole rupees at snapshot time.
    pub price: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default = "default_available")]
    pub is_available: bool,
}

fn default_available() -> bool {
    true
}

/// Delivery terms attached to a confirmed service area.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryTerms {
    pub fee: u32,
    pub min_order: u32,
    pub estimated_time: String,
}

/// The delivery area a session has committed to. At most one is active per
/// session; it gates which menu the user sees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SelectedArea {
    pub id: AreaId,
    pub name: String,
    pub city: String,
    #[serde(default)]
    pub full_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<LatLng>,
    pub delivery_fee: u32,
    pub min_order_amount: u32,
    pub estimated_time: String,
}

/// Minimal user profile persisted alongside the auth token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A promotional deal applied to a cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDeal {
    pub code: String,
    pub title: String,
    /// Flat discount in rupees, subtracted from the cart subtotal.
    pub savings: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_wire_format_is_snake_case() {
        let json = serde_json::to_string(&OrderStatus::OutForDelivery).unwrap();
        assert_eq!(json, "\"out_for_delivery\"");

        let parsed: OrderStatus = serde_json::from_str("\"pending_payment\"").unwrap();
        assert_eq!(parsed, OrderStatus::PendingPayment);
    }

    #[test]
    fn terminal_statuses() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Rejected.is_terminal());
        assert!(!OrderStatus::OutForDelivery.is_terminal());
    }

    #[test]
    fn room_keys_render_with_prefix() {
        let user = RoomKey::User(UserId("u123".into()));
        assert_eq!(user.to_string(), "user:u123");

        let order = RoomKey::Order(OrderId("o456".into()));
        assert_eq!(order.to_string(), "order:o456");
    }

    #[test]
    fn order_id_short_form() {
        let id = OrderId("65f2a91c84a1b2c3d4e5f6ab".into());
        assert_eq!(id.short(), "E5F6AB");
    }
}
