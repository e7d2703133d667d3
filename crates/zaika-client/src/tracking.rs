//! Order tracking view state.
//!
//! A [`TrackingView`] is the client core's side of one mounted tracking
//! screen: it holds the per-order room for as long as it lives, reads order
//! state out of the shared cache, and consumes the ephemeral rider position
//! channel. All the display logic (progress steps, payment countdown,
//! cancel/receipt gating) is pure functions over the cached status.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::watch;

use zaika_shared::constants::PAYMENT_TIMEOUT_MINUTES;
use zaika_shared::{LatLng, Order, OrderId, OrderStatus, RiderLocationSample};

use crate::cache::OrderCache;
use crate::rooms::RoomGuard;

/// The visual progress steps, in order. Cancelled and rejected orders fall
/// off the ladder entirely.
pub const TRACKING_STEPS: [OrderStatus; 5] = [
    OrderStatus::Pending,
    OrderStatus::Confirmed,
    OrderStatus::Preparing,
    OrderStatus::OutForDelivery,
    OrderStatus::Delivered,
];

/// Index into [`TRACKING_STEPS`] for a status, or `None` when the order is
/// off the ladder. `pending_payment` renders as the first step.
pub fn progress_step(status: OrderStatus) -> Option<usize> {
    match status {
        OrderStatus::Pending | OrderStatus::PendingPayment => Some(0),
        OrderStatus::Confirmed => Some(1),
        OrderStatus::Preparing => Some(2),
        OrderStatus::OutForDelivery => Some(3),
        OrderStatus::Delivered => Some(4),
        OrderStatus::Cancelled | OrderStatus::Rejected => None,
    }
}

/// Whether the user may still cancel from the tracking screen.
pub fn can_cancel(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::Confirmed)
}

/// Receipts exist once the kitchen has the order.
pub fn can_download_receipt(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Confirmed
            | OrderStatus::Preparing
            | OrderStatus::OutForDelivery
            | OrderStatus::Delivered
    )
}

/// When an unpaid order expires.
pub fn payment_deadline(placed_at: DateTime<Utc>) -> DateTime<Utc> {
    placed_at + Duration::minutes(PAYMENT_TIMEOUT_MINUTES)
}

/// Whole seconds left on the payment window, clamped at zero.
pub fn payment_seconds_remaining(placed_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (payment_deadline(placed_at) - now).num_seconds().max(0)
}

/// `MM:SS` rendering of a countdown.
pub fn format_countdown(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// One mounted tracking screen.
///
/// Holds the per-order room guard, so dropping the view leaves the room.
pub struct TrackingView {
    order_id: OrderId,
    cache: Arc<Mutex<OrderCache>>,
    rider_rx: watch::Receiver<Option<RiderLocationSample>>,
    _room: RoomGuard,
}

impl TrackingView {
    pub(crate) fn new(
        order_id: OrderId,
        cache: Arc<Mutex<OrderCache>>,
        rider_rx: watch::Receiver<Option<RiderLocationSample>>,
        room: RoomGuard,
    ) -> Self {
        Self {
            order_id,
            cache,
            rider_rx,
            _room: room,
        }
    }

    pub fn order_id(&self) -> &OrderId {
        &self.order_id
    }

    /// Header shown above the progress ladder, e.g. `Order #A1B2C3`.
    pub fn title(&self) -> String {
        format!("Order #{}", self.order_id.short())
    }

    pub fn status(&self) -> Option<OrderStatus> {
        self.lock_cache().status_of(&self.order_id)
    }

    /// Full order record, if a full snapshot has reached the cache yet.
    pub fn order(&self) -> Option<Order> {
        self.lock_cache()
            .get(&self.order_id)
            .and_then(|cached| cached.as_full().cloned())
    }

    pub fn progress(&self) -> Option<usize> {
        self.status().and_then(progress_step)
    }

    /// Seconds left to pay, when the order is awaiting payment.
    pub fn payment_remaining(&self, now: DateTime<Utc>) -> Option<i64> {
        let order = self.order()?;
        if order.status != OrderStatus::PendingPayment {
            return None;
        }
        Some(payment_seconds_remaining(order.placed_at, now))
    }

    /// The rider marker to draw, if any.
    ///
    /// Gated twice: the order must be out for delivery, and a sample tagged
    /// with an order id must be tagged with *this* order.
    pub fn rider_position(&self) -> Option<LatLng> {
        if self.status() != Some(OrderStatus::OutForDelivery) {
            return None;
        }
        let sample = self.rider_rx.borrow().clone()?;
        match &sample.order_id {
            Some(id) if id != &self.order_id => None,
            _ => Some(sample.rider_location),
        }
    }

    /// Watch handle for awaiting the next rider sample.
    pub fn rider_updates(&self) -> watch::Receiver<Option<RiderLocationSample>> {
        self.rider_rx.clone()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, OrderCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use zaika_shared::{PaymentMethod, PaymentStatus, RiderId, RoomKey};

    use crate::rooms::{CommandOutlet, RoomRegistry};

    fn order(id: &str, status: OrderStatus) -> Order {
        Order {
            id: OrderId(id.to_string()),
            short_id: None,
            status,
            items: Vec::new(),
            total_amount: 500,
            delivery_fee: 149,
            discount_applied: 0,
            final_amount: 649,
            payment_method: PaymentMethod::Bank,
            payment_status: PaymentStatus::Pending,
            placed_at: Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap(),
            delivered_at: None,
            estimated_delivery: None,
            rider: None,
            area: None,
            bank_transfer_reference: None,
        }
    }

    fn view(
        order_id: &str,
        cache: Arc<Mutex<OrderCache>>,
        rider_rx: watch::Receiver<Option<RiderLocationSample>>,
    ) -> TrackingView {
        let id = OrderId(order_id.to_string());
        let room = RoomGuard::new(
            Arc::new(RoomRegistry::new()),
            CommandOutlet::new(),
            RoomKey::Order(id.clone()),
        );
        TrackingView::new(id, cache, rider_rx, room)
    }

    #[test]
    fn progress_climbs_the_ladder_in_order() {
        let steps: Vec<Option<usize>> = [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
        ]
        .into_iter()
        .map(progress_step)
        .collect();

        assert_eq!(steps, vec![Some(0), Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(progress_step(OrderStatus::Cancelled), None);
        assert_eq!(progress_step(OrderStatus::Rejected), None);
        assert_eq!(progress_step(OrderStatus::PendingPayment), Some(0));
    }

    #[test]
    fn countdown_clamps_and_formats() {
        let placed = Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap();

        let just_after = placed + Duration::seconds(30);
        assert_eq!(payment_seconds_remaining(placed, just_after), 14 * 60 + 30);

        let long_after = placed + Duration::hours(2);
        assert_eq!(payment_seconds_remaining(placed, long_after), 0);

        assert_eq!(format_countdown(14 * 60 + 30), "14:30");
        assert_eq!(format_countdown(0), "00:00");
        assert_eq!(format_countdown(-5), "00:00");
    }

    #[test]
    fn cancel_and_receipt_gating() {
        assert!(can_cancel(OrderStatus::Pending));
        assert!(can_cancel(OrderStatus::Confirmed));
        assert!(!can_cancel(OrderStatus::OutForDelivery));
        assert!(!can_cancel(OrderStatus::Delivered));

        assert!(!can_download_receipt(OrderStatus::Pending));
        assert!(can_download_receipt(OrderStatus::Preparing));
        assert!(can_download_receipt(OrderStatus::Delivered));
    }

    #[test]
    fn rider_marker_requires_out_for_delivery() {
        let cache = Arc::new(Mutex::new(OrderCache::new()));
        let sample = RiderLocationSample {
            rider_location: LatLng {
                lat: 24.86,
                lng: 67.01,
            },
            rider_id: RiderId("r1".into()),
            order_id: Some(OrderId("o1".into())),
            status: None,
        };
        let (rider_tx, rider_rx) = watch::channel(Some(sample));
        let view = view("o1", cache.clone(), rider_rx);

        // Sample present, but the order isn't out for delivery yet.
        cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::Preparing));
        assert!(view.rider_position().is_none());

        cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::OutForDelivery));
        assert_eq!(
            view.rider_position(),
            Some(LatLng {
                lat: 24.86,
                lng: 67.01
            })
        );

        // A sample tagged with some other order is not this rider.
        rider_tx.send_replace(Some(RiderLocationSample {
            rider_location: LatLng { lat: 25.0, lng: 67.2 },
            rider_id: RiderId("r2".into()),
            order_id: Some(OrderId("other".into())),
            status: None,
        }));
        assert!(view.rider_position().is_none());
    }

    #[test]
    fn payment_countdown_only_while_awaiting_payment() {
        let cache = Arc::new(Mutex::new(OrderCache::new()));
        let (_rider_tx, rider_rx) = watch::channel(None);
        let view = view("o1", cache.clone(), rider_rx);

        cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::PendingPayment));
        let now = Utc.with_ymd_and_hms(2024, 3, 14, 12, 5, 0).unwrap();
        assert_eq!(view.payment_remaining(now), Some(10 * 60));

        cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::Confirmed));
        assert_eq!(view.payment_remaining(now), None);
    }

    #[test]
    fn title_uses_short_id() {
        let cache = Arc::new(Mutex::new(OrderCache::new()));
        let (_tx, rider_rx) = watch::channel(None);
        let view = view("65f1c2d3e4a5b6c7d8e9f0a1", cache, rider_rx);
        assert_eq!(view.title(), "Order #E9F0A1");
    }
}
