//! Client side of FocusLab: REST access, the optimistic board and
//! background sync.

pub mod api;
pub mod board;
pub mod session;
pub mod token;

use std::path::PathBuf;

use thiserror::Error;

pub use api::ApiClient;
pub use board::{Board, BoardError, SyncOp};
pub use session::Session;
pub use token::TokenStore;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid backend URL {0}")]
    BaseUrl(String),
    #[error("HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Login failed. Check credentials.")]
    LoginFailed,
    #[error("{0}")]
    SignupFailed(String),
    #[error("server returned {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
    },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{}: {source}", path.display())]
    TokenFile {
        path: PathBuf,
        source: std::io::Error,
    },
}
