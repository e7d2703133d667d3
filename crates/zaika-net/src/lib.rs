//! # zaika-net
//!
//! Network layer of the storefront client: a typed REST client for the
//! backend API and the realtime order socket, exposed as a background task
//! with command and notification channels.

pub mod error;
pub mod rest;
pub mod socket;

pub use error::NetError;
pub use rest::{
    ApiClient, AreaSummary, AreaWithZone, AuthResponse, BankDetails, CartSnapshot,
    CheckAreaResponse, CreateOrderPayload, DeliveryZone, OrderLinePayload, OrderResponse,
    ServerCartEntry,
};
pub use socket::{spawn_socket, SocketCommand, SocketConfig, SocketNotification};
