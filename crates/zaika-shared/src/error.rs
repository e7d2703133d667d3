use thiserror::Error;

/// Errors produced while encoding or decoding realtime frames.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Malformed event payload: {0}")]
    Decode(#[from] serde_json::Error),
}
