//! # zaika-shared
//!
//! Domain types shared between the storefront client core, the local store
//! and the network layer: order/cart/area models, the realtime wire protocol
//! and the constants both sides of the socket agree on.

pub mod constants;
pub mod error;
pub mod order;
pub mod protocol;
pub mod types;

pub use error::ProtocolError;
pub use order::{AreaRef, Order, OrderItem, OrderItemRef, RiderRef};
pub use protocol::{
    ClientFrame, OrderInit, RiderLocationSample, RiderPresence, ServerError, ServerEvent,
};
pub use types::*;
