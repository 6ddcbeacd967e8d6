//! SPFE Wire Format
//!
//! Sans-IO encoding and decoding for the SPFE (Service Provider Front End)
//! protocol. No sockets, no TLS, no clock: the functions here turn commands
//! into request parts and reply bytes into typed replies or errors.
//!
//! # Exchange
//!
//! ```text
//! Command ──into_request──▶ Request ──url/body──▶ transport
//!                                                    │
//!                                                    ▼
//!            Reply / ProtocolError ◀──decode── reply XML
//! ```
//!
//! # Components
//!
//! - [`Command`]: every protocol operation with its parameters
//! - [`Request`]: method, command path and [`Params`], rendered to URL and body
//! - [`Reply`]: decoded reply envelope (payload, optional ttl and reissued
//!   ticket)
//! - [`ProtocolError`] / [`RequestError`]: what went wrong and whose fault it is

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod command;
pub mod errors;
pub mod params;
pub mod reply;
pub mod request;
pub mod ticket;

pub use command::{Command, Pfid};
pub use errors::{ProtocolError, RequestError, Result};
pub use params::{ParamValue, Params};
pub use reply::{Encoding, Payload, Reply};
pub use request::{Method, Request};
pub use ticket::service_provider_name;
