use std::path::PathBuf;

use crate::host::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum WrapError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("api error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("ephemeral token is not a valid header value")]
    InvalidToken,

    #[error(transparent)]
    Spawn(#[from] CommandError),
}

pub type WrapResult<T> = Result<T, WrapError>;
