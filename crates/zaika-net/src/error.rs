use thiserror::Error;

/// Errors produced by the network layer.
#[derive(Error, Debug)]
pub enum NetError {
    /// Transport-level HTTP failure (timeout, DNS, connection refused).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failure.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The configured auth token cannot be sent as a header value.
    #[error("Auth token is not a valid header value")]
    BadAuthToken,

    /// The backend answered with a non-success status and a domain message
    /// (area not in service, minimum order not met, invalid OTP, ...).
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Realtime frame decode failure.
    #[error("Protocol error: {0}")]
    Protocol(#[from] zaika_shared::ProtocolError),

    /// JSON body decode failure.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, NetError>;
