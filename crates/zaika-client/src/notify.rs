//! User-facing notifications emitted by the client core.
//!
//! The core never renders anything itself; it publishes [`Notice`]s on a
//! broadcast channel and whatever UI is mounted decides how to show them.
//! Dropping a receiver is the unsubscribe: events arriving afterwards are
//! simply never seen by that subscriber.

use tokio::sync::broadcast;

use zaika_shared::OrderId;

/// How a notice should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Info,
    Error,
}

/// A single user-facing notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    OrderConfirmed { order_id: OrderId },
    OrderPreparing { order_id: OrderId },
    RiderOnTheWay { order_id: OrderId },
    OrderDelivered { order_id: OrderId },
    /// One-time celebratory effect fired alongside the first delivered
    /// notice for an order.
    OrderCelebration { order_id: OrderId },
    OrderCancelled { order_id: OrderId },
    OrderRejected { order_id: OrderId },
    RiderOnline { name: String },
    RiderOffline,
    ConnectionError { message: String },
    ConnectionLost,
}

impl Notice {
    pub fn severity(&self) -> Severity {
        match self {
            Notice::OrderConfirmed { .. }
            | Notice::RiderOnTheWay { .. }
            | Notice::OrderDelivered { .. }
            | Notice::OrderCelebration { .. }
            | Notice::RiderOnline { .. } => Severity::Success,
            Notice::OrderPreparing { .. } | Notice::RiderOffline => Severity::Info,
            Notice::OrderCancelled { .. }
            | Notice::OrderRejected { .. }
            | Notice::ConnectionError { .. }
            | Notice::ConnectionLost => Severity::Error,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Notice::OrderConfirmed { .. } => {
                "Order confirmed! We're preparing your food".to_string()
            }
            Notice::OrderPreparing { .. } => "Your order is being prepared".to_string(),
            Notice::RiderOnTheWay { .. } => "Rider is on the way!".to_string(),
            Notice::OrderDelivered { .. } => "Order delivered! Enjoy your meal".to_string(),
            Notice::OrderCelebration { .. } => "Enjoy your meal!".to_string(),
            Notice::OrderCancelled { .. } => "Order cancelled".to_string(),
            Notice::OrderRejected { .. } => "Order rejected".to_string(),
            Notice::RiderOnline { name } => format!("{name} is now online"),
            Notice::RiderOffline => "Rider went offline".to_string(),
            Notice::ConnectionError { message } => message.clone(),
            Notice::ConnectionLost => "Connection lost".to_string(),
        }
    }
}

/// Broadcast hub the bridge publishes notices through.
#[derive(Debug, Clone)]
pub struct NoticeHub {
    tx: broadcast::Sender<Notice>,
}

impl NoticeHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(64);
        Self { tx }
    }

    /// Subscribe to all future notices. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. A send with no live subscribers is not an error;
    /// the notice is dropped.
    pub fn publish(&self, notice: Notice) {
        let _ = self.tx.send(notice);
    }
}

impl Default for NoticeHub {
    fn default() -> Self {
        Self::new()
    }
}
