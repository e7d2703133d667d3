//! Bridge between the realtime socket and the application core.
//!
//! A single task consumes socket notifications and turns them into cache
//! mutations, user-facing notices and rider position updates. Order events
//! flow into the [`OrderCache`]; rider positions go into a `watch` channel
//! where each sample replaces the previous one and nothing is ever stored.
//!
//! On every `Ready` the bridge replays the registered rooms, so membership
//! survives reconnects without the socket task knowing about rooms at all.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use zaika_net::{SocketCommand, SocketNotification};
use zaika_shared::{OrderId, OrderStatus, RiderLocationSample, RoomKey, ServerEvent};

use crate::cache::OrderCache;
use crate::notify::{Notice, NoticeHub};
use crate::rooms::{CommandOutlet, RoomRegistry};

/// Per-connection-lifetime state the bridge keeps for itself.
#[derive(Debug, Default)]
pub(crate) struct BridgeState {
    /// Orders that already fired their one-time delivered celebration.
    celebrated: HashSet<OrderId>,
}

/// Handles shared by the bridge task. Cheap to clone.
#[derive(Clone)]
pub(crate) struct BridgeHandles {
    pub cache: Arc<Mutex<OrderCache>>,
    pub notices: NoticeHub,
    pub rider_tx: watch::Sender<Option<RiderLocationSample>>,
    pub rooms: Arc<RoomRegistry>,
    /// Unbound when this bridge's socket gives up for good.
    pub outlet: CommandOutlet,
    pub cmd_tx: mpsc::Sender<SocketCommand>,
}

/// Spawn the bridge over a socket notification stream.
///
/// The task runs until the socket reports `Closed` or the notification
/// channel ends.
pub(crate) fn spawn_bridge(
    handles: BridgeHandles,
    mut notif_rx: mpsc::Receiver<SocketNotification>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut state = BridgeState::default();

        while let Some(notif) = notif_rx.recv().await {
            match notif {
                SocketNotification::Ready => {
                    let rooms = handles.rooms.snapshot();
                    info!(count = rooms.len(), "socket ready, re-joining rooms");
                    for room in rooms {
                        let track = match &room {
                            RoomKey::Order(order_id) => Some(order_id.clone()),
                            RoomKey::User(_) => None,
                        };
                        if handles
                            .cmd_tx
                            .send(SocketCommand::Join(room))
                            .await
                            .is_err()
                        {
                            return;
                        }
                        // Mounted tracking views also need the server to
                        // restart streaming for their order.
                        if let Some(order_id) = track {
                            if handles
                                .cmd_tx
                                .send(SocketCommand::TrackOrder(order_id))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                }
                SocketNotification::Event(event) => {
                    handle_event(&handles, &mut state, event);
                }
                SocketNotification::Closed { reason } => {
                    warn!(%reason, "socket closed for good");
                    handles.outlet.unbind();
                    handles.notices.publish(Notice::ConnectionLost);
                    return;
                }
            }
        }

        debug!("notification channel ended, bridge stopping");
    })
}

/// Apply one server event to the cache, notices and rider channel.
fn handle_event(handles: &BridgeHandles, state: &mut BridgeState, event: ServerEvent) {
    match event {
        ServerEvent::OrderUpdate(order) => {
            let order_id = order.id.clone();
            let status = order.status;
            {
                let mut cache = lock_cache(&handles.cache);
                cache.insert(order);
                cache.invalidate_list();
            }
            if let Some(notice) = status_notice(&order_id, status) {
                handles.notices.publish(notice);
            }
            if status == OrderStatus::Delivered && state.celebrated.insert(order_id.clone()) {
                handles.notices.publish(Notice::OrderCelebration { order_id });
            }
        }
        ServerEvent::OrderInit(init) => {
            lock_cache(&handles.cache).seed(&init);
        }
        ServerEvent::RiderLocation(sample) | ServerEvent::RiderLiveUpdate(sample) => {
            // Ephemeral: latest sample replaces the previous one, nothing
            // is written to the cache.
            handles.rider_tx.send_replace(Some(sample));
        }
        ServerEvent::RiderOnline(presence) => {
            let name = presence
                .name
                .unwrap_or_else(|| "Your rider".to_string());
            handles.notices.publish(Notice::RiderOnline { name });
        }
        ServerEvent::RiderOffline(_) => {
            handles.notices.publish(Notice::RiderOffline);
        }
        ServerEvent::Error(err) => {
            handles.notices.publish(Notice::ConnectionError {
                message: err.message,
            });
        }
    }
}

/// The notice a status transition surfaces, if any. `pending` and
/// `pending_payment` stay silent.
fn status_notice(order_id: &OrderId, status: OrderStatus) -> Option<Notice> {
    let order_id = order_id.clone();
    match status {
        OrderStatus::Confirmed => Some(Notice::OrderConfirmed { order_id }),
        OrderStatus::Preparing => Some(Notice::OrderPreparing { order_id }),
        OrderStatus::OutForDelivery => Some(Notice::RiderOnTheWay { order_id }),
        OrderStatus::Delivered => Some(Notice::OrderDelivered { order_id }),
        OrderStatus::Cancelled => Some(Notice::OrderCancelled { order_id }),
        OrderStatus::Rejected => Some(Notice::OrderRejected { order_id }),
        OrderStatus::Pending | OrderStatus::PendingPayment => None,
    }
}

fn lock_cache(cache: &Mutex<OrderCache>) -> std::sync::MutexGuard<'_, OrderCache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}
