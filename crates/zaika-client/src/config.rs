//! Client configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the client can run with zero
//! configuration against a local backend.

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the REST API.
    /// Env: `ZAIKA_API_URL`
    /// Default: `http://localhost:5000/api`
    pub api_base_url: String,

    /// WebSocket endpoint of the realtime order channel.
    /// Env: `ZAIKA_SOCKET_URL`
    /// Default: `ws://localhost:5000/ws`
    pub socket_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            socket_url: "ws://localhost:5000/ws".to_string(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("ZAIKA_API_URL") {
            config.api_base_url = url;
        }

        if let Ok(url) = std::env::var("ZAIKA_SOCKET_URL") {
            config.socket_url = url;
        }

        config
    }
}
