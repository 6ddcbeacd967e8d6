//! Error types for the SPFE wire format.
//!
//! Two families, split by who is at fault:
//!
//! - [`RequestError`]: the caller asked for something that cannot be encoded
//!   (unsupported method, command/parameter combination that does not form a
//!   URL). Always raised before any network I/O.
//! - [`ProtocolError`]: the server answered, and the answer is either a
//!   reported failure or something we cannot parse.

use thiserror::Error;

/// Result alias for reply decoding.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while turning a command into a request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// HTTP method other than GET or POST
    #[error("Method {0} not supported")]
    UnsupportedMethod(String),

    /// Host, command and parameters do not form a valid URL
    #[error("Command-parameters combination is invalid: {0}")]
    InvalidUrl(String),
}

/// Errors carried by (or caused by) an SPFE reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The server reported failure (`<result>false</result>`).
    ///
    /// Holds the server's error text verbatim, e.g. "Already locked" or
    /// "Invalid ticket format". The text is the only error vocabulary the
    /// protocol has; callers match on it as documented server semantics.
    #[error("SPFE returned error: {0}")]
    Rejected(String),

    /// The reply is not well-formed XML, lacks a mandatory element, or carries
    /// a field that cannot be decoded (bad base64, non-integer ttl).
    #[error("Malformed SPFE reply: {0}")]
    Malformed(String),

    /// A ticket that should be `<sp name>:<token>` has no colon.
    #[error("SPFE returned ticket without a colon")]
    TicketWithoutColon,
}

impl ProtocolError {
    pub(crate) fn malformed(reason: impl std::fmt::Display) -> Self {
        Self::Malformed(reason.to_string())
    }

    /// Server's own error text, if this error was reported by the server.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected(message) => Some(message),
            Self::Malformed(_) | Self::TicketWithoutColon => None,
        }
    }
}
