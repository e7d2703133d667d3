use thiserror::Error;

/// Errors surfaced by the client core.
///
/// Components catch and translate at their boundary; nothing here is meant
/// to escape to a page level unhandled.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Store error: {0}")]
    Store(#[from] zaika_store::StoreError),

    #[error("Network error: {0}")]
    Net(#[from] zaika_net::NetError),

    #[error("Not signed in")]
    NotAuthenticated,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ClientError>;
