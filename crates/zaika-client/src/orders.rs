//! Order operations over the REST client, kept coherent with the cache.
//!
//! Every fetch and every mutation writes its result back into the
//! [`OrderCache`] with the same keyed overwrite the realtime bridge uses,
//! so REST responses and pushed events never need merging.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::info;

use zaika_net::{ApiClient, CreateOrderPayload, OrderResponse};
use zaika_shared::{Order, OrderId};

use crate::cache::{CachedOrder, OrderCache};
use crate::error::Result;

pub struct OrderOps {
    api: Arc<ApiClient>,
    cache: Arc<Mutex<OrderCache>>,
}

impl OrderOps {
    pub fn new(api: Arc<ApiClient>, cache: Arc<Mutex<OrderCache>>) -> Self {
        Self { api, cache }
    }

    /// Submit a checkout. The created order lands in the cache and the list
    /// view is invalidated so the next listing includes it.
    pub async fn place(&self, payload: &CreateOrderPayload) -> Result<OrderResponse> {
        let response = self.api.create_order(payload).await?;
        info!(order_id = %response.order.id, "order placed");
        let mut cache = self.lock_cache();
        cache.insert(response.order.clone());
        cache.invalidate_list();
        Ok(response)
    }

    pub async fn fetch(&self, id: &OrderId) -> Result<Order> {
        let order = self.api.get_order(id).await?;
        self.lock_cache().insert(order.clone());
        Ok(order)
    }

    pub fn cached(&self, id: &OrderId) -> Option<CachedOrder> {
        self.lock_cache().get(id).cloned()
    }

    /// The signed-in user's orders. Serves the cached list while it is
    /// valid; anything that invalidated it forces a refetch here.
    pub async fn my_orders(&self) -> Result<Vec<Order>> {
        if let Some(cached) = self.cached_list() {
            return Ok(cached);
        }
        let orders = self.api.my_orders().await?;
        self.lock_cache().set_list(orders.clone());
        Ok(orders)
    }

    pub fn cached_list(&self) -> Option<Vec<Order>> {
        let cache = self.lock_cache();
        cache
            .list()
            .map(|orders| orders.into_iter().cloned().collect())
    }

    pub async fn cancel(&self, id: &OrderId) -> Result<Order> {
        let order = self.api.cancel_order(id).await?;
        info!(order_id = %id, "order cancelled");
        let mut cache = self.lock_cache();
        cache.insert(order.clone());
        cache.invalidate_list();
        Ok(order)
    }

    pub async fn confirm_bank_transfer(&self, id: &OrderId, reference: &str) -> Result<Order> {
        let order = self.api.confirm_bank_transfer(id, reference).await?;
        let mut cache = self.lock_cache();
        cache.insert(order.clone());
        cache.invalidate_list();
        Ok(order)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, OrderCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use zaika_shared::{OrderStatus, PaymentMethod, PaymentStatus};

    fn ops() -> (OrderOps, Arc<Mutex<OrderCache>>) {
        let cache = Arc::new(Mutex::new(OrderCache::new()));
        let api = Arc::new(ApiClient::new("http://localhost:5000/api"));
        (OrderOps::new(api, cache.clone()), cache)
    }

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
            payment_method: PaymentMethod::Cash,
            payment_status: PaymentStatus::Pending,
            placed_at: Utc.with_ymd_and_hms(2024, 3, 14, 12, 0, 0).unwrap(),
            delivered_at: None,
            estimated_delivery: None,
            rider: None,
            area: None,
            bank_transfer_reference: None,
        }
    }

    #[test]
    fn cached_list_tracks_invalidation() {
        let (ops, cache) = ops();

        cache
            .lock()
            .unwrap()
            .set_list(vec![order("o1", OrderStatus::Pending)]);
        assert_eq!(ops.cached_list().unwrap().len(), 1);

        cache.lock().unwrap().invalidate_list();
        assert!(ops.cached_list().is_none());
    }

    #[test]
    fn cached_returns_partial_and_full_entries() {
        let (ops, cache) = ops();
        cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::Confirmed));

        let cached = ops.cached(&OrderId("o1".into())).unwrap();
        assert_eq!(cached.status(), OrderStatus::Confirmed);
        assert!(ops.cached(&OrderId("missing".into())).is_none());
    }
}
