//! Transport seam and the HTTPS implementation.
//!
//! The command surface never touches sockets directly: it hands a rendered
//! [`Request`] to a [`Transport`] and gets the raw reply body back.
//! [`HttpsTransport`] is the production implementation; simulated servers
//! implement the same trait.
//!
//! # Connection model
//!
//! One HTTPS round trip per request, one connection per round trip (no idle
//! connections are kept). No proxies, no redirects, HTTP/1.1 only. The
//! configured timeout bounds the whole round trip. Nothing is retried.

use std::error::Error as _;

use reqwest::{blocking, header::CONTENT_TYPE, redirect};
use spfe_proto::{Method, Request};
use tracing::debug;

use crate::{context::ConnectionContext, error::Error};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Carries one SPFE request to the server and returns the reply body.
pub trait Transport {
    /// Send `request` and return the raw reply body.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: the request does not render to a valid URL;
    ///   raised before any I/O
    /// - `Transport`: network, TLS or HTTP-level failure
    fn send(&self, request: &Request) -> Result<Vec<u8>, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &Request) -> Result<Vec<u8>, Error> {
        (**self).send(request)
    }
}

/// Blocking HTTPS transport over a [`ConnectionContext`].
///
/// Must not be created or used from within an async runtime; the blocking
/// HTTP client runs its own.
#[derive(Debug, Clone)]
pub struct HttpsTransport {
    http: blocking::Client,
    host: String,
}

impl HttpsTransport {
    /// Transport presenting the context's identity to the context's host.
    ///
    /// # Errors
    ///
    /// - `Config`: the HTTP client cannot be built from the TLS config
    pub fn new(context: &ConnectionContext) -> Result<Self, Error> {
        let tls = context.tls_config().as_ref().clone();

        let http = blocking::Client::builder()
            .use_preconfigured_tls(tls)
            .timeout(context.timeout())
            .no_proxy()
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .http1_only()
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTPS client: {e}")))?;

        Ok(Self { http, host: context.host().to_string() })
    }
}

impl Transport for HttpsTransport {
    fn send(&self, request: &Request) -> Result<Vec<u8>, Error> {
        let url = request.url(&self.host)?;

        let builder = match request.method() {
            Method::Get => self.http.get(url),
            Method::Post => self
                .http
                .post(url)
                .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
                .body(request.body().unwrap_or_default()),
        };

        let response = builder.send().map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, command = request.path(), "SPFE answered with HTTP error");
            return Err(Error::Transport(format!("SPFE answered HTTP {status}")));
        }

        let body = response.bytes().map_err(transport_error)?;
        Ok(body.to_vec())
    }
}

/// Flatten a reqwest error and its causes. The URL is dropped: its query
/// carries tickets.
fn transport_error(err: reqwest::Error) -> Error {
    let err = err.without_url();
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    Error::Transport(message)
}
