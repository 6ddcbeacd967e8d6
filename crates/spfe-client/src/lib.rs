//! SPFE Client
//!
//! Blocking client for the SPFE (Service Provider Front End) protocol: a
//! Service Provider authenticates with its TLS client certificate, then
//! exchanges tickets and manages small data containers on the WWPass
//! service.
//!
//! # Architecture
//!
//! ```text
//! Identity + TrustAnchor ──▶ ConnectionContext ──▶ HttpsTransport
//!                                                      │
//! Client::get_ticket / read_data / ... ──▶ Command ──▶ Transport::send ──▶ Reply
//! ```
//!
//! Encoding and decoding live in [`spfe_proto`] and message sealing in
//! [`spfe_crypto`]; this crate adds credentials, TLS and the network.
//!
//! # Components
//!
//! - [`Identity`]: Service Provider certificate and private key
//! - [`TrustAnchor`]: the one root CA SPFE servers must chain to
//! - [`ConnectionContext`]: TLS config, host and timeout, built once
//! - [`Transport`] / [`HttpsTransport`]: one round trip per request
//! - [`Client`]: the command surface
//!
//! # Errors
//!
//! Every failure surfaces to the caller as an [`Error`]. Nothing is retried.
//! Server-reported failures keep the server's text verbatim; match on
//! [`Error::server_message`].
//!
//! # Example
//!
//! ```no_run
//! use spfe_client::{Client, ConnectionConfig, ContainerOptions, GetTicketOptions};
//!
//! # fn main() -> Result<(), spfe_client::Error> {
//! let client = Client::from_files("sp.crt", "sp.key", ConnectionConfig::default())?;
//! let grant = client.get_ticket(&GetTicketOptions::default().ttl(300))?;
//! let data = client.read_data(&grant.ticket, &ContainerOptions::default())?;
//! # let _ = data;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod context;
mod error;
mod identity;
mod options;
mod transport;
mod trust;

pub use client::Client;
pub use context::{ConnectionConfig, ConnectionContext, DEFAULT_HOST, DEFAULT_TIMEOUT};
pub use error::Error;
pub use identity::Identity;
pub use options::{ContainerOptions, GetTicketOptions, LockOptions, PutTicketOptions, TicketGrant};
pub use spfe_crypto::{MessageKey, SealedMessage, open_message};
pub use spfe_proto::{
    Method, ParamValue, Params, Payload, Pfid, ProtocolError, Reply, Request, RequestError,
};
pub use transport::{HttpsTransport, Transport};
pub use trust::TrustAnchor;
