//! Order query cache.
//!
//! Orders are keyed by id and overwritten whole: both the REST fetch path
//! and the realtime event path use the same keyed-overwrite semantics, so
//! the last writer wins. There is no merge logic and no conflict detection.

use std::collections::HashMap;

use zaika_shared::{LatLng, Order, OrderId, OrderInit, OrderStatus};

/// A cached order record.
///
/// `orderInit` events seed a partial entry (id + status and, when present,
/// the rider's last known position) so a tracking view mounted before the
/// first full `orderUpdate` still has something to render.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedOrder {
    Partial {
        id: OrderId,
        status: OrderStatus,
        rider_location: Option<LatLng>,
    },
    Full(Order),
}

impl CachedOrder {
    pub fn id(&self) -> &OrderId {
        match self {
            CachedOrder::Partial { id, .. } => id,
            CachedOrder::Full(order) => &order.id,
        }
    }

    pub fn status(&self) -> OrderStatus {
        match self {
            CachedOrder::Partial { status, .. } => *status,
            CachedOrder::Full(order) => order.status,
        }
    }

    pub fn as_full(&self) -> Option<&Order> {
        match self {
            CachedOrder::Full(order) => Some(order),
            CachedOrder::Partial { .. } => None,
        }
    }
}

/// Keyed cache of order records plus the list-of-orders view.
#[derive(Debug, Default)]
pub struct OrderCache {
    orders: HashMap<OrderId, CachedOrder>,
    /// Ids of the "my orders" listing, newest first. `None` means the list
    /// has been invalidated (or never fetched) and needs a refetch.
    list: Option<Vec<OrderId>>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the entry for this order. Last writer wins.
    pub fn insert(&mut self, order: Order) {
        self.orders.insert(order.id.clone(), CachedOrder::Full(order));
    }

    /// Seed a partial entry from an `orderInit` payload. This is the same
    /// keyed overwrite as [`insert`]: a seed arriving after a full record
    /// replaces it, by design of the last-writer-wins contract.
    ///
    /// [`insert`]: OrderCache::insert
    pub fn seed(&mut self, init: &OrderInit) {
        self.orders.insert(
            init.order_id.clone(),
            CachedOrder::Partial {
                id: init.order_id.clone(),
                status: init.status,
                rider_location: init.rider_location,
            },
        );
    }

    pub fn get(&self, id: &OrderId) -> Option<&CachedOrder> {
        self.orders.get(id)
    }

    pub fn status_of(&self, id: &OrderId) -> Option<OrderStatus> {
        self.orders.get(id).map(CachedOrder::status)
    }

    /// Replace the list view and cache every record in it.
    pub fn set_list(&mut self, orders: Vec<Order>) {
        let ids: Vec<OrderId> = orders.iter().map(|o| o.id.clone()).collect();
        for order in orders {
            self.insert(order);
        }
        self.list = Some(ids);
    }

    /// Drop the list view so the next read refetches it. Individual order
    /// entries stay cached.
    pub fn invalidate_list(&mut self) {
        self.list = None;
    }

    /// The cached list, if it is still valid. Entries that were overwritten
    /// by partial seeds since the list was fetched are skipped.
    pub fn list(&self) -> Option<Vec<&Order>> {
        let ids = self.list.as_ref()?;
        Some(
            ids.iter()
                .filter_map(|id| self.orders.get(id).and_then(CachedOrder::as_full))
                .collect(),
        )
    }

    pub fn is_list_valid(&self) -> bool {
        self.list.is_some()
    }
}
