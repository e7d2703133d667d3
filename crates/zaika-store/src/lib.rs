//! # zaika-store
//!
//! Durable local client storage for the storefront: the guest cart, the
//! confirmed delivery area and the auth session survive restarts here.
//! Backed by SQLite; each concern lives in its own table so a format change
//! in one never corrupts the others. The crate exposes a synchronous
//! `Database` handle wrapping a `rusqlite::Connection` with typed CRUD
//! helpers per domain model.

pub mod area;
pub mod cart;
pub mod database;
pub mod migrations;
pub mod models;
pub mod session;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
