//! Server side of the wire format.
//!
//! The simulated server never looks at a [`Request`]'s fields directly: it
//! renders the request exactly as the HTTPS transport would (URL, query, form
//! body) and parses that back, so every simulated round trip also exercises
//! the client's encoder.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use percent_encoding::percent_decode_str;
use quick_xml::escape::escape;
use spfe_client::{Error, Method, Request};
use spfe_proto::Encoding;

/// Host the simulated server renders requests against.
pub const SIM_HOST: &str = "spfe.sim";

/// A request as it arrives at the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    /// HTTP method
    pub method: Method,
    /// Command path without the leading `/` and the `.xml` suffix
    pub command: String,
    /// Form-decoded parameters, as raw bytes
    pub params: HashMap<String, Vec<u8>>,
}

impl WireRequest {
    /// Render `request` and parse it back.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: the request does not render to a URL
    /// - `Transport`: the path is not a `.xml` command (HTTP 404)
    pub fn parse(request: &Request) -> Result<Self, Error> {
        let url = request.url(SIM_HOST)?;

        let command = url
            .path()
            .strip_prefix('/')
            .and_then(|path| path.strip_suffix(".xml"))
            .ok_or_else(|| Error::Transport("SPFE answered HTTP 404 Not Found".to_string()))?
            .to_string();

        let encoded = match request.method() {
            Method::Get => url.query().unwrap_or_default().to_string(),
            Method::Post => request.body().unwrap_or_default(),
        };

        Ok(Self { method: request.method(), command, params: decode_form(&encoded) })
    }

    /// Raw value of `name`; empty values count as absent.
    pub fn param(&self, name: &str) -> Option<&[u8]> {
        self.params.get(name).map(Vec::as_slice).filter(|value| !value.is_empty())
    }

    /// Value of `name` as text.
    pub fn text(&self, name: &str) -> Option<String> {
        self.param(name).map(|value| String::from_utf8_lossy(value).into_owned())
    }

    /// Value of `name` as a number of seconds.
    pub fn seconds(&self, name: &str) -> Option<u64> {
        self.text(name).and_then(|value| value.trim().parse().ok())
    }

    /// True when `name` is `1`.
    pub fn flag(&self, name: &str) -> bool {
        self.param(name) == Some(b"1".as_slice())
    }
}

/// Decode `application/x-www-form-urlencoded` into raw bytes.
///
/// Malformed escapes are kept literally.
fn decode_form(encoded: &str) -> HashMap<String, Vec<u8>> {
    encoded
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (String::from_utf8_lossy(&percent_decode(key)).into_owned(), percent_decode(value))
        })
        .collect()
}

/// One form component: `+` is a space, then `%XX` escapes.
fn percent_decode(input: &str) -> Vec<u8> {
    percent_decode_str(&input.replace('+', " ")).collect()
}

/// Body of one reply document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyBody {
    /// Value of `<result>`
    pub result: bool,
    /// Payload on success, error text on failure
    pub data: Vec<u8>,
    /// Ticket lifetime, for ticket-issuing commands
    pub ttl: Option<u64>,
    /// Ticket a reissued ticket replaces
    pub original_ticket: Option<String>,
}

impl ReplyBody {
    /// Successful reply carrying `data`.
    pub fn ok(data: impl Into<Vec<u8>>) -> Self {
        Self { result: true, data: data.into(), ..Self::default() }
    }

    /// Failed reply carrying the server's error text.
    pub fn failed(message: &str) -> Self {
        Self { result: false, data: message.as_bytes().to_vec(), ..Self::default() }
    }

    /// Render as an XML document.
    ///
    /// With [`Encoding::Plain`], text fields go out as escaped text and only
    /// non-UTF-8 payloads fall back to base64. With [`Encoding::Base64`],
    /// every field is base64.
    pub fn render(&self, encoding: Encoding) -> Vec<u8> {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?><response>");
        let result = if self.result { "true" } else { "false" };
        xml.push_str(&format!("<result>{result}</result>"));
        push_element(&mut xml, "data", &self.data, encoding);
        if let Some(ttl) = self.ttl {
            push_element(&mut xml, "ttl", ttl.to_string().as_bytes(), encoding);
        }
        if let Some(ticket) = &self.original_ticket {
            push_element(&mut xml, "originalTicket", ticket.as_bytes(), encoding);
        }
        xml.push_str("</response>");
        xml.into_bytes()
    }
}

fn push_element(xml: &mut String, name: &str, value: &[u8], encoding: Encoding) {
    let (encoding, content) = match std::str::from_utf8(value) {
        Ok(text) if encoding == Encoding::Plain => (Encoding::Plain, escape(text).into_owned()),
        _ => (Encoding::Base64, STANDARD.encode(value)),
    };
    xml.push_str(&format!("<{name} encoding=\"{}\">{content}</{name}>", encoding.as_str()));
}

#[cfg(test)]
mod tests {
    use spfe_proto::{Params, ProtocolError, Reply};

    use super::*;

    #[test]
    fn get_parameters_come_from_the_query() {
        let request = Request::new(Method::Get, "sp/read")
            .with_params(Params::new().with("pfid", vec![0x00_u8, 0xFF, b' ']).with("lock", "1"));

        let wire = WireRequest::parse(&request).unwrap();

        assert_eq!(wire.command, "sp/read");
        assert_eq!(wire.param("pfid"), Some([0x00_u8, 0xFF, b' '].as_slice()));
        assert!(wire.flag("lock"));
    }

    #[test]
    fn post_parameters_come_from_the_body() {
        let request = Request::new(Method::Post, "write")
            .with_params(Params::new().with("ticket", "SP:t").with("data", "a+b&c=d"));

        let wire = WireRequest::parse(&request).unwrap();

        assert_eq!(wire.method, Method::Post);
        assert_eq!(wire.text("ticket").as_deref(), Some("SP:t"));
        assert_eq!(wire.text("data").as_deref(), Some("a+b&c=d"));
    }

    #[test]
    fn empty_parameter_counts_as_absent() {
        let wire = WireRequest {
            method: Method::Get,
            command: "read".to_string(),
            params: decode_form("container=&to=5"),
        };

        assert_eq!(wire.param("container"), None);
        assert_eq!(wire.seconds("to"), Some(5));
    }

    #[test]
    fn broken_escape_is_kept_literally() {
        assert_eq!(percent_decode("100%"), b"100%");
        assert_eq!(percent_decode("%zz%41"), b"%zzA");
    }

    #[test]
    fn plus_is_space_but_escaped_plus_is_not() {
        assert_eq!(percent_decode("a+b%2Bc"), b"a b+c");
        assert_eq!(percent_decode("%FF%00"), [0xFF, 0x00]);
    }

    #[test]
    fn rendered_reply_decodes_in_both_encodings() {
        let body = ReplyBody {
            ttl: Some(300),
            original_ticket: Some("SP:old".to_string()),
            ..ReplyBody::ok("<a & b>")
        };

        for encoding in [Encoding::Plain, Encoding::Base64] {
            let reply = Reply::decode(&body.render(encoding)).unwrap();
            assert_eq!(reply.payload().as_bytes(), b"<a & b>");
            assert_eq!(reply.ttl(), Some(300));
            assert_eq!(reply.original_ticket(), Some("SP:old"));
        }
    }

    #[test]
    fn binary_payload_falls_back_to_base64() {
        let xml = ReplyBody::ok(vec![0xFF_u8, 0x00]).render(Encoding::Plain);

        assert!(String::from_utf8_lossy(&xml).contains("encoding=\"base64\""));
        assert_eq!(Reply::decode(&xml).unwrap().payload().as_bytes(), [0xFF, 0x00]);
    }

    #[test]
    fn failure_renders_as_rejection() {
        let xml = ReplyBody::failed("Not locked").render(Encoding::Plain);

        assert_eq!(Reply::decode(&xml), Err(ProtocolError::Rejected("Not locked".to_string())));
    }
}
