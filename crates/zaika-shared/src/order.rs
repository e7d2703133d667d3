//! Order records as returned by the backend.
//!
//! Orders are created server-side on checkout and are immutable on the
//! client apart from whole-record cache overwrites driven by refetches or
//! realtime `orderUpdate` events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    AreaId, MenuItemId, OrderId, OrderStatus, PaymentMethod, PaymentStatus, RiderId,
};

/// A full order record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    /// Sum of item price-at-order times quantity.
    pub total_amount: u32,
    pub delivery_fee: u32,
    #[serde(default)]
    pub discount_applied: u32,
    /// `total_amount + delivery_fee - discount_applied`, computed server-side.
    pub final_amount: u32,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub placed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider: Option<RiderRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<AreaRef>,
    /// Reference code the customer quotes when paying by bank transfer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_transfer_reference: Option<String>,
}

/// One line of an order, with the unit price frozen at order time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub menu_item: OrderItemRef,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price_at_order: u32,
    pub quantity: u32,
}

/// Reduced menu-item reference embedded in an order line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRef {
    #[serde(rename = "_id")]
    pub id: MenuItemId,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Rider assigned to an order, if any.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiderRef {
    #[serde(rename = "_id")]
    pub id: RiderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// Area an order is delivered to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AreaRef {
    #[serde(rename = "_id")]
    pub id: AreaId,
    #[serde(default)]
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_round_trips_backend_json() {
        let json = r#"{
            "_id": "65f2a91c84a1b2c3d4e5f6ab",
            "status": "out_for_delivery",
            "items": [{
                "menuItem": { "_id": "m1", "name": "Chicken Karahi" },
                "name": "Chicken Karahi",
                "priceAtOrder": 850,
                "quantity": 2
            }],
            "totalAmount": 1700,
            "deliveryFee": 199,
            "discountApplied": 100,
            "finalAmount": 1799,
            "paymentMethod": "cash",
            "paymentStatus": "pending",
            "placedAt": "2024-03-14T12:30:00Z",
            "rider": { "_id": "r9", "name": "Bilal" }
        }"#;

        let order: Order = serde_json::from_str(json).unwrap();
        assert_eq!(order.status, OrderStatus::OutForDelivery);
        assert_eq!(order.items[0].price_at_order, 850);
        assert_eq!(order.final_amount, 1799);
        assert_eq!(order.rider.as_ref().unwrap().name.as_deref(), Some("Bilal"));
        assert!(order.bank_transfer_reference.is_none());
    }
}
