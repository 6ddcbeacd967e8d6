//! Request encoding.
//!
//! A [`Request`] is a method, a command path and a parameter set. Rendering it
//! against a host yields the URL (`https://{host}/{path}.xml`, with the
//! parameters as the query string for GET) and, for POST, the form body.
//! Nothing here touches the network; the caller hands the rendered parts to
//! a transport.

use std::{fmt, str::FromStr};

use url::Url;

use crate::{errors::RequestError, params::Params};

/// HTTP method of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Parameters travel in the query string
    Get,
    /// Parameters travel as a form-encoded body
    Post,
}

impl Method {
    /// Canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = RequestError;

    /// Case-insensitive. Anything other than GET or POST is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("GET") {
            Ok(Self::Get)
        } else if s.eq_ignore_ascii_case("POST") {
            Ok(Self::Post)
        } else {
            Err(RequestError::UnsupportedMethod(s.to_string()))
        }
    }
}

/// One SPFE command, ready to be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: Method,
    path: String,
    params: Params,
}

impl Request {
    /// Request for `path` with no parameters.
    ///
    /// `path` is the command name without the `.xml` suffix, e.g. `"read"` or
    /// `"sp/create"`.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), params: Params::new() }
    }

    /// Replace the parameter set.
    #[must_use]
    pub fn with_params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    /// HTTP method.
    pub fn method(&self) -> Method {
        self.method
    }

    /// Command path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Full URL of this request against `host`.
    ///
    /// For GET the encoded parameters form the query string. For POST the URL
    /// has no query; see [`Request::body`].
    ///
    /// # Errors
    ///
    /// - `InvalidUrl`: `host` and `path` do not form an `https` URL
    pub fn url(&self, host: &str) -> Result<Url, RequestError> {
        if host.is_empty() {
            return Err(RequestError::InvalidUrl("empty host".to_string()));
        }

        let raw = format!("https://{host}/{}.xml", self.path);
        let mut url = Url::parse(&raw).map_err(|e| RequestError::InvalidUrl(e.to_string()))?;

        if self.method == Method::Get {
            url.set_query(Some(&self.params.encode()));
        }

        Ok(url)
    }

    /// Form-encoded body. `None` for GET.
    pub fn body(&self) -> Option<String> {
        match self.method {
            Method::Get => None,
            Method::Post => Some(self.params.encode()),
        }
    }
}
