//! Wire protocol of the realtime order channel.
//!
//! Frames travel as JSON text messages with an `{"event": ..., "data": ...}`
//! envelope. The server pushes [`ServerEvent`]s scoped to the rooms a client
//! has joined; the client emits [`ClientFrame`]s to manage room membership.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::order::Order;
use crate::types::{LatLng, OrderId, OrderStatus, RiderId};

/// Events pushed by the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Full order record; overwrites the cached entry for that id.
    OrderUpdate(Order),
    /// Minimal seed sent when a tracking client joins before the first full
    /// record is available.
    OrderInit(OrderInit),
    /// Live rider position. Ephemeral, never cached.
    RiderLocation(RiderLocationSample),
    /// Same payload as `riderLocation`, emitted on the per-order room.
    RiderLiveUpdate(RiderLocationSample),
    /// A rider came online. Informational only.
    RiderOnline(RiderPresence),
    /// A rider went offline. Informational only.
    RiderOffline(RiderPresence),
    /// Server-side error surfaced to the user; the connection stays up.
    Error(ServerError),
}

impl ServerEvent {
    /// Decode a single inbound text frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Payload of `orderInit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderInit {
    pub order_id: OrderId,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rider_location: Option<LatLng>,
}

/// Latest known position of a rider. Each sample supersedes the previous
/// one; samples live only as long as a tracking view is listening.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiderLocationSample {
    pub rider_location: LatLng,
    pub rider_id: RiderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<OrderId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiderPresence {
    pub rider_id: RiderId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerError {
    pub message: String,
}

/// Frames sent by the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Join a named room (`user:<id>` or `order:<id>`).
    Join { room: String },
    /// Leave a named room.
    Leave { room: String },
    /// Start live tracking for one order; the server responds with
    /// `orderInit` and adds the client to the per-order room.
    TrackOrder {
        #[serde(rename = "orderId")]
        order_id: OrderId,
    },
}

impl ClientFrame {
    pub fn to_json(&self) -> String {
        // The enum carries only strings; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_order_init() {
        let text = r#"{
            "event": "orderInit",
            "data": {
                "orderId": "o1",
                "status": "confirmed",
                "riderLocation": { "lat": 24.86, "lng": 67.01 }
            }
        }"#;

        match ServerEvent::from_json(text).unwrap() {
            ServerEvent::OrderInit(init) => {
                assert_eq!(init.order_id.as_str(), "o1");
                assert_eq!(init.status, OrderStatus::Confirmed);
                assert!(init.rider_location.is_some());
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn decodes_rider_live_update() {
        let text = r#"{
            "event": "riderLiveUpdate",
            "data": {
                "riderLocation": { "lat": 24.9, "lng": 67.1 },
                "riderId": "r1",
                "orderId": "o1",
                "status": "out_for_delivery"
            }
        }"#;

        match ServerEvent::from_json(text).unwrap() {
            ServerEvent::RiderLiveUpdate(sample) => {
                assert_eq!(sample.rider_id.0, "r1");
                assert_eq!(sample.order_id.as_ref().unwrap().as_str(), "o1");
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_event_kind() {
        let text = r#"{ "event": "somethingElse", "data": {} }"#;
        assert!(ServerEvent::from_json(text).is_err());
    }

    #[test]
    fn join_frame_envelope() {
        let frame = ClientFrame::Join {
            room: "order:o1".to_string(),
        };
        let json: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(json["event"], "join");
        assert_eq!(json["data"]["room"], "order:o1");
    }

    #[test]
    fn track_order_frame_envelope() {
        let frame = ClientFrame::TrackOrder {
            order_id: OrderId("o77".into()),
        };
        let json: serde_json::Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(json["event"], "trackOrder");
        assert_eq!(json["data"]["orderId"], "o77");
    }
}
