//! The application core wiring everything together.
//!
//! One [`App`] owns the local store, the REST client, the order cache, the
//! notice hub and the realtime plumbing. UIs hold an `Arc<App>` and talk to
//! the subsystems through it.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, watch};
use tracing::{info, warn};

use zaika_net::{ApiClient, CreateOrderPayload, OrderResponse, SocketCommand, SocketConfig};
use zaika_shared::{OrderId, RiderLocationSample, RoomKey, UserId, UserProfile};
use zaika_store::Database;

use crate::area::AreaSession;
use crate::bridge::{spawn_bridge, BridgeHandles};
use crate::cache::OrderCache;
use crate::cart::{ActiveCart, GuestCart, ServerCart};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::notify::{Notice, NoticeHub};
use crate::orders::OrderOps;
use crate::rooms::{CommandOutlet, RoomGuard, RoomRegistry};
use crate::state::AppState;
use crate::tracking::TrackingView;

pub struct App {
    pub(crate) config: ClientConfig,
    pub(crate) db: Arc<Mutex<Database>>,
    pub(crate) api: Arc<ApiClient>,
    pub(crate) state: Arc<Mutex<AppState>>,
    pub(crate) cache: Arc<Mutex<OrderCache>>,
    pub(crate) notices: NoticeHub,
    pub(crate) rooms: Arc<RoomRegistry>,
    pub(crate) outlet: CommandOutlet,
    pub(crate) rider_tx: watch::Sender<Option<RiderLocationSample>>,
    pub(crate) guest_cart: GuestCart,
    pub(crate) server_cart: ServerCart,
    area: AreaSession,
}

impl App {
    /// Open (or create) the on-disk store and bring the core up.
    pub fn init(config: ClientConfig) -> Result<Self> {
        let db = Database::new()?;
        Self::init_with_database(config, db)
    }

    /// Bring the core up over an already opened store. Restores the auth
    /// session and the confirmed delivery area, if either was persisted.
    pub fn init_with_database(config: ClientConfig, db: Database) -> Result<Self> {
        let db = Arc::new(Mutex::new(db));
        let api = Arc::new(ApiClient::new(config.api_base_url.clone()));
        let (rider_tx, _) = watch::channel(None);

        let mut state = AppState::default();
        if let Some(session) = lock(&db).load_auth_session()? {
            info!(user = %session.user.name, "restored auth session");
            api.set_token(&session.token);
            state.auth = Some(session);
        }

        let area = AreaSession::new(db.clone(), api.clone());
        area.hydrate()?;

        let app = Self {
            config,
            guest_cart: GuestCart::new(db.clone()),
            server_cart: ServerCart::new(api.clone()),
            db,
            api,
            state: Arc::new(Mutex::new(state)),
            cache: Arc::new(Mutex::new(OrderCache::new())),
            notices: NoticeHub::new(),
            rooms: Arc::new(RoomRegistry::new()),
            outlet: CommandOutlet::new(),
            rider_tx,
            area,
        };
        Ok(app)
    }

    // ------------------------------------------------------------------
    // Realtime lifecycle
    // ------------------------------------------------------------------

    /// Start the socket and its bridge. Idempotent: a second call while
    /// connected does nothing. The signed-in user's room is registered
    /// before connecting so the first `Ready` joins it.
    pub fn connect(&self) {
        if self.outlet.is_bound() {
            return;
        }

        let auth_token = {
            let state = self.lock_state();
            if let Some(session) = &state.auth {
                self.rooms
                    .register(RoomKey::User(session.user.id.clone()));
            }
            state.auth.as_ref().map(|s| s.token.clone())
        };

        let socket_config = SocketConfig {
            url: self.config.socket_url.clone(),
            auth_token,
            ..SocketConfig::default()
        };

        let (cmd_tx, notif_rx) = zaika_net::spawn_socket(socket_config);
        spawn_bridge(
            BridgeHandles {
                cache: self.cache.clone(),
                notices: self.notices.clone(),
                rider_tx: self.rider_tx.clone(),
                rooms: self.rooms.clone(),
                outlet: self.outlet.clone(),
                cmd_tx: cmd_tx.clone(),
            },
            notif_rx,
        );
        self.outlet.bind(cmd_tx);
    }

    /// Tear the socket down, if one is running.
    pub fn disconnect(&self) {
        if let Some(cmd_tx) = self.outlet.unbind() {
            let _ = cmd_tx.try_send(SocketCommand::Shutdown);
        }
    }

    /// Drop the current socket and start a fresh one. Used when the auth
    /// token changes, since it travels with the upgrade request.
    pub(crate) fn reconnect(&self) {
        self.disconnect();
        self.connect();
    }

    pub fn is_connected(&self) -> bool {
        self.outlet.is_bound()
    }

    /// Graceful shutdown of everything the core spawned.
    pub fn shutdown(&self) {
        self.disconnect();
    }

    // ------------------------------------------------------------------
    // Subsystem access
    // ------------------------------------------------------------------

    pub fn area(&self) -> &AreaSession {
        &self.area
    }

    /// The cart for the current auth state: local for guests, the server
    /// mirror for signed-in users.
    pub fn cart(&self) -> ActiveCart<'_> {
        if self.is_authenticated() {
            ActiveCart::Server(&self.server_cart)
        } else {
            ActiveCart::Guest(&self.guest_cart)
        }
    }

    pub fn orders(&self) -> OrderOps {
        OrderOps::new(self.api.clone(), self.cache.clone())
    }

    /// Subscribe to user-facing notices.
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Watch handle over the ephemeral rider position stream.
    pub fn rider_locations(&self) -> watch::Receiver<Option<RiderLocationSample>> {
        self.rider_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock_state().is_authenticated()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.lock_state().auth.as_ref().map(|s| s.user.clone())
    }

    // ------------------------------------------------------------------
    // Orders
    // ------------------------------------------------------------------

    /// Submit a checkout for the signed-in user. The server empties the
    /// cart as part of order creation, so the local mirror is dropped.
    pub async fn place_order(&self, payload: &CreateOrderPayload) -> Result<OrderResponse> {
        if !self.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }
        let response = self.orders().place(payload).await?;
        self.server_cart.invalidate();
        Ok(response)
    }

    /// Open a tracking view for one order.
    ///
    /// The view renders from the cache, so it mounts with or without a
    /// running socket. The per-order room is registered either way; its
    /// join and the `trackOrder` request are best-effort sends that the
    /// reconnect replay covers when no socket is up yet. Dropping the
    /// returned view leaves the room again.
    pub fn track_order(&self, order_id: OrderId) -> TrackingView {
        let room = RoomGuard::new(
            self.rooms.clone(),
            self.outlet.clone(),
            RoomKey::Order(order_id.clone()),
        );
        if !self
            .outlet
            .try_send(SocketCommand::TrackOrder(order_id.clone()))
        {
            warn!(order_id = %order_id, "trackOrder not sent, no socket running");
        }

        TrackingView::new(
            order_id,
            self.cache.clone(),
            self.rider_tx.subscribe(),
            room,
        )
    }

    // ------------------------------------------------------------------
    // Internals shared with auth
    // ------------------------------------------------------------------

    pub(crate) fn join_user_room(&self, user_id: UserId) {
        let room = RoomKey::User(user_id);
        if self.rooms.register(room.clone()) {
            self.outlet.try_send(SocketCommand::Join(room));
        }
    }

    pub(crate) fn leave_user_room(&self, user_id: &UserId) {
        let room = RoomKey::User(user_id.clone());
        if self.rooms.deregister(&room) {
            self.outlet.try_send(SocketCommand::Leave(room));
        }
    }

    pub(crate) fn lock_state(&self) -> std::sync::MutexGuard<'_, AppState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lock_db(&self) -> std::sync::MutexGuard<'_, Database> {
        lock(&self.db)
    }
}

fn lock(db: &Mutex<Database>) -> std::sync::MutexGuard<'_, Database> {
    db.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use zaika_shared::{Order, OrderStatus, PaymentMethod, PaymentStatus};
    use zaika_store::AuthSession;

    fn app() -> App {
        let db = Database::open_in_memory().unwrap();
        App::init_with_database(ClientConfig::default(), db).unwrap()
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

    fn session(user_id: &str) -> AuthSession {
        AuthSession {
            token: "tok".into(),
            user: UserProfile {
                id: UserId(user_id.into()),
                name: "Ayesha".into(),
                phone: None,
                email: Some("a@example.com".into()),
            },
            saved_at: Utc::now(),
        }
    }

    #[test]
    fn guest_gets_the_local_cart() {
        let app = app();
        assert!(!app.is_authenticated());
        assert!(matches!(app.cart(), ActiveCart::Guest(_)));
    }

    #[test]
    fn signed_in_user_gets_the_server_cart() {
        let app = app();
        app.lock_state().auth = Some(session("u1"));
        assert!(matches!(app.cart(), ActiveCart::Server(_)));
        assert_eq!(app.current_user().unwrap().name, "Ayesha");
    }

    #[test]
    fn restores_persisted_auth_session() {
        let db = Database::open_in_memory().unwrap();
        db.save_auth_session(&session("u1")).unwrap();

        let app = App::init_with_database(ClientConfig::default(), db).unwrap();
        assert!(app.is_authenticated());
    }

    #[test]
    fn tracking_view_mounts_while_disconnected() {
        let app = app();
        assert!(!app.is_connected());

        // A REST-fetched order is already in the cache.
        app.cache
            .lock()
            .unwrap()
            .insert(order("o1", OrderStatus::Preparing));

        let view = app.track_order(OrderId("o1".into()));
        assert_eq!(view.status(), Some(OrderStatus::Preparing));
        assert_eq!(view.progress(), Some(2));

        // The room is registered so the first `Ready` after a connect
        // joins it; dropping the view takes it back out.
        assert_eq!(
            app.rooms.snapshot(),
            vec![RoomKey::Order(OrderId("o1".into()))]
        );
        drop(view);
        assert!(app.rooms.snapshot().is_empty());
    }

    #[tokio::test]
    async fn connect_is_idempotent_and_registers_user_room() {
        let app = app();
        app.lock_state().auth = Some(session("u1"));

        app.connect();
        assert!(app.is_connected());
        app.connect();

        assert_eq!(
            app.rooms.snapshot(),
            vec![RoomKey::User(UserId("u1".into()))]
        );

        app.shutdown();
        assert!(!app.is_connected());
    }
}
