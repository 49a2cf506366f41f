#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat api rejected request ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("event stream error: {0}")]
    Stream(String),
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
