//! Client error types.

use spfe_crypto::SealError;
use spfe_proto::{ProtocolError, RequestError};
use thiserror::Error;

/// Errors returned by the SPFE client.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad certificate or key material, or TLS setup failure.
    ///
    /// Fatal to building a usable client. Fix the credentials and rebuild.
    #[error("configuration error: {0}")]
    Config(String),

    /// Network failure, timeout, TLS handshake or validation failure, or a
    /// non-success HTTP status.
    ///
    /// May be transient. The client never retries; the caller decides.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected the command, or its reply could not be decoded.
    ///
    /// See [`ProtocolError::server_message`] for the server's own text.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Caller misuse detected before any network I/O (unsupported method,
    /// command and parameters that do not form a URL).
    #[error(transparent)]
    InvalidArgument(#[from] RequestError),

    /// Sealing the `get` message failed.
    #[error("message sealing failed: {0}")]
    Crypto(#[from] SealError),
}

impl Error {
    /// True for failures that may succeed on a later attempt.
    ///
    /// Only transport failures qualify: a rejected command or a bad
    /// configuration fails the same way every time.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Server's own error text, if the server rejected the command.
    ///
    /// Texts are documented server semantics ("Already locked", "Not locked",
    /// "ID does not exist", ...) and are passed through unmodified.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Protocol(err) => err.server_message(),
            _ => None,
        }
    }
}
