//! # zaika-client
//!
//! Storefront client core for the Zaika delivery service: delivery-area
//! session state, the dual guest/server cart, the order query cache, the
//! realtime event bridge and order tracking views.
//!
//! The crate is headless. A UI embeds [`App`], subscribes to the notice
//! and rider-location channels, and renders whatever state the core holds.

pub mod app;
pub mod area;
pub mod cache;
pub mod cart;
pub mod config;
pub mod error;
pub mod notify;
pub mod orders;
pub mod rooms;
pub mod tracking;

mod auth;
mod bridge;
mod state;

pub use app::App;
pub use area::{AreaSession, AreaState, LocationFailure};
pub use cache::{CachedOrder, OrderCache};
pub use cart::{ActiveCart, AddOutcome, CartEntry, CartView, GuestCart, ServerCart};
pub use config::ClientConfig;
pub use error::ClientError;
pub use notify::{Notice, NoticeHub, Severity};
pub use orders::OrderOps;
pub use tracking::{TrackingView, TRACKING_STEPS};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the default filter. Safe to call once per process;
/// later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("zaika_client=debug,zaika_net=debug,zaika_store=info,warn")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
