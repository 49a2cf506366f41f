/// `Auth` is the only kind that surfaces to the human (via the service
/// bot); the rest are logged and the triggering event or command is
/// dropped/failed without tearing down the session.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("transport error: {0}")]
    Transport(#[from] chat_client::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("malformed event: {0}")]
    Malformed(String),
    #[error("internal invariant violation: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
