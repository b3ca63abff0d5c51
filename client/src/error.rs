//! Client error types.

use tokio_tungstenite::tungstenite;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("websocket error: {0}")]
    Transport(Box<tungstenite::Error>),
    #[error("session closed")]
    Closed,
    #[error("frame codec failed: {0}")]
    Codec(#[from] frames::CodecError),
    #[error("join rejected ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("gave up reconnecting")]
    Offline,
    #[error("timed out waiting for the hub")]
    Timeout,
    #[error("invalid {var}: {value}")]
    InvalidConfig { var: &'static str, value: String },
}

impl From<tungstenite::Error> for ClientError {
    fn from(error: tungstenite::Error) -> Self {
        Self::Transport(Box::new(error))
    }
}
