//! Protocol and business constants shared across crates.

use std::time::Duration;

/// Maximum quantity of a single menu item in a cart.
pub const CART_QUANTITY_CAP: u32 = 50;

/// How long an unpaid `pending_payment` order is held before the backend
/// auto-cancels it. The client renders a countdown against this window but
/// never enforces it itself.
pub const PAYMENT_TIMEOUT_MINUTES: i64 = 15;

/// Maximum consecutive reconnection attempts before the socket task gives up.
pub const SOCKET_RECONNECT_ATTEMPTS: u32 = 5;

/// Fixed backoff between reconnection attempts.
pub const SOCKET_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Delivery fee quoted when a location has no delivery zone of its own.
pub const FALLBACK_DELIVERY_FEE: u32 = 149;

/// Estimated delivery time quoted when no zone-specific estimate exists.
pub const FALLBACK_ESTIMATED_TIME: &str = "35-50 min";
