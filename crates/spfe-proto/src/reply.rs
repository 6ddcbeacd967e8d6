//! Reply decoding.
//!
//! Every SPFE reply is a small XML document:
//!
//! ```text
//! <response>
//!   <result>true|false</result>
//!   <data encoding="plain|base64">...</data>
//!   <ttl encoding="plain|base64">...</ttl>                    (optional)
//!   <originalTicket encoding="plain|base64">...</originalTicket> (optional)
//! </response>
//! ```
//!
//! Only the named children are consulted; the root element's name is not.
//! The first occurrence of each name wins, at any depth below the root.
//!
//! # Security
//!
//! Documents carrying a DOCTYPE are rejected outright. No entity other than
//! the five predefined ones and character references is ever expanded, and
//! nothing is fetched.

use base64::{Engine, engine::general_purpose::STANDARD};
use quick_xml::{
    Reader,
    events::{BytesStart, Event},
};

use crate::errors::{ProtocolError, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// How an element's text content is encoded on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Text content is the value
    Plain,
    /// Text content is standard base64 of the value
    Base64,
}

impl Encoding {
    /// Anything other than `base64` (case-insensitive) reads as plain.
    pub fn from_attribute(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("base64") { Self::Base64 } else { Self::Plain }
    }

    /// Attribute value as written by SPFE.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Base64 => "base64",
        }
    }
}

/// Decoded `<data>` content of a successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload(Vec<u8>);

impl Payload {
    /// Raw payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Take the payload bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Payload as UTF-8 text.
    ///
    /// # Errors
    ///
    /// - `Malformed`: the payload is not valid UTF-8
    pub fn into_text(self) -> Result<String> {
        String::from_utf8(self.0).map_err(|_| ProtocolError::malformed("data is not valid UTF-8"))
    }
}

/// A successful SPFE reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    payload: Payload,
    ttl: Option<i32>,
    original_ticket: Option<String>,
}

impl Reply {
    /// Decode a reply document.
    ///
    /// # Errors
    ///
    /// - `Rejected`: `<result>` is not `true`; carries the decoded `<data>`
    /// - `Malformed`: not well-formed XML, a DOCTYPE is present, `<result>` or
    ///   `<data>` is missing, base64 does not decode, or `<ttl>` is not a
    ///   signed 32-bit integer
    pub fn decode(xml: &[u8]) -> Result<Self> {
        let fields = scan(xml)?;

        let status = fields.result.ok_or_else(|| ProtocolError::malformed("missing <result>"))?;
        let data = fields.data.ok_or_else(|| ProtocolError::malformed("missing <data>"))?.decode()?;

        let succeeded = String::from_utf8_lossy(&status.raw).trim().eq_ignore_ascii_case("true");
        if !succeeded {
            return Err(ProtocolError::Rejected(String::from_utf8_lossy(&data).into_owned()));
        }

        let ttl = fields.ttl.map(parse_ttl).transpose()?;
        let original_ticket = fields
            .original_ticket
            .map(|element| element.decode().and_then(|bytes| Payload(bytes).into_text()))
            .transpose()?;

        Ok(Self { payload: Payload(data), ttl, original_ticket })
    }

    /// Decoded `<data>`.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Take the decoded `<data>`.
    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// `<ttl>` in seconds, if the server sent one. Signed 32-bit, as SPFE
    /// writes it.
    pub fn ttl(&self) -> Option<i32> {
        self.ttl
    }

    /// `<originalTicket>`, if the server reissued a ticket.
    pub fn original_ticket(&self) -> Option<&str> {
        self.original_ticket.as_deref()
    }

    /// Split into payload, ttl and original ticket.
    pub fn into_parts(self) -> (Payload, Option<i32>, Option<String>) {
        (self.payload, self.ttl, self.original_ticket)
    }
}

fn parse_ttl(element: Element) -> Result<i32> {
    let bytes = element.decode()?;
    std::str::from_utf8(&bytes)
        .ok()
        .and_then(|text| text.trim().parse().ok())
        .ok_or_else(|| ProtocolError::malformed("unable to convert ttl to int"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Result,
    Data,
    Ttl,
    OriginalTicket,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"result" => Some(Self::Result),
            b"data" => Some(Self::Data),
            b"ttl" => Some(Self::Ttl),
            b"originalTicket" => Some(Self::OriginalTicket),
            _ => None,
        }
    }
}

/// Undecoded text content of one element.
#[derive(Debug)]
struct Element {
    encoding: Encoding,
    raw: Vec<u8>,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let attribute = start.try_get_attribute("encoding").map_err(ProtocolError::malformed)?;
        let encoding = match attribute {
            Some(attr) => {
                Encoding::from_attribute(&attr.unescape_value().map_err(ProtocolError::malformed)?)
            },
            None => Encoding::Plain,
        };
        Ok(Self { encoding, raw: Vec::new() })
    }

    fn decode(self) -> Result<Vec<u8>> {
        match self.encoding {
            Encoding::Plain => Ok(self.raw),
            Encoding::Base64 => {
                let compact: Vec<u8> =
                    self.raw.into_iter().filter(|b| !b.is_ascii_whitespace()).collect();
                STANDARD
                    .decode(compact)
                    .map_err(|e| ProtocolError::malformed(format!("invalid base64: {e}")))
            },
        }
    }
}

#[derive(Debug, Default)]
struct Fields {
    result: Option<Element>,
    data: Option<Element>,
    ttl: Option<Element>,
    original_ticket: Option<Element>,
}

impl Fields {
    fn slot(&mut self, field: Field) -> &mut Option<Element> {
        match field {
            Field::Result => &mut self.result,
            Field::Data => &mut self.data,
            Field::Ttl => &mut self.ttl,
            Field::OriginalTicket => &mut self.original_ticket,
        }
    }

    /// Field to start capturing for `start`, unless it was already seen.
    fn wanted(&mut self, start: &BytesStart<'_>) -> Option<Field> {
        Field::from_name(start.name().as_ref()).filter(|field| self.slot(*field).is_none())
    }
}

struct Capture {
    field: Field,
    depth: usize,
    element: Element,
}

fn scan(xml: &[u8]) -> Result<Fields> {
    let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
    let mut reader = Reader::from_reader(xml);
    let mut fields = Fields::default();
    let mut capture: Option<Capture> = None;
    let mut depth = 0usize;
    let mut root = Root::Pending;

    loop {
        match reader.read_event().map_err(ProtocolError::malformed)? {
            Event::DocType(_) => return Err(ProtocolError::malformed("DOCTYPE is not allowed")),
            Event::Start(start) => {
                root.open(depth)?;
                check_attributes(&start)?;
                depth += 1;
                if capture.is_none()
                    && depth > 1
                    && let Some(field) = fields.wanted(&start)
                {
                    capture = Some(Capture { field, depth, element: Element::open(&start)? });
                }
            },
            Event::Empty(start) => {
                root.open(depth)?;
                check_attributes(&start)?;
                if depth == 0 {
                    root = Root::Closed;
                } else if capture.is_none()
                    && let Some(field) = fields.wanted(&start)
                {
                    *fields.slot(field) = Some(Element::open(&start)?);
                }
            },
            Event::End(_) => {
                if let Some(done) = capture.take_if(|open| open.depth == depth) {
                    *fields.slot(done.field) = Some(done.element);
                }
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    root = Root::Closed;
                }
            },
            Event::Text(text) => {
                if depth == 0 {
                    if !text.iter().all(u8::is_ascii_whitespace) {
                        return Err(ProtocolError::malformed("text outside the root element"));
                    }
                } else if let Some(open) = capture.as_mut() {
                    let text = text.unescape().map_err(ProtocolError::malformed)?;
                    open.element.raw.extend_from_slice(text.as_bytes());
                }
            },
            Event::CData(cdata) => {
                if depth == 0 {
                    return Err(ProtocolError::malformed("CDATA outside the root element"));
                }
                if let Some(open) = capture.as_mut() {
                    open.element.raw.extend_from_slice(&cdata);
                }
            },
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) => {},
        }
    }

    match root {
        Root::Pending => Err(ProtocolError::malformed("no root element")),
        Root::Open => Err(ProtocolError::malformed("unexpected end of document")),
        Root::Closed => Ok(fields),
    }
}

/// Where the reader is relative to the single root element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Root {
    Pending,
    Open,
    Closed,
}

impl Root {
    /// An element starts at `depth`.
    fn open(&mut self, depth: usize) -> Result<()> {
        match self {
            Self::Closed => Err(ProtocolError::malformed("content after the root element")),
            Self::Pending | Self::Open => {
                if depth == 0 {
                    *self = Self::Open;
                }
                Ok(())
            },
        }
    }
}

/// Attribute syntax and uniqueness, for every element whether captured or not.
fn check_attributes(start: &BytesStart<'_>) -> Result<()> {
    for attribute in start.attributes() {
        attribute.map_err(ProtocolError::malformed)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(result: &str, data: &str, encoding: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><response><result>{result}</result>\
             <data encoding=\"{encoding}\">{data}</data></response>"
        )
    }

    #[test]
    fn plain_success() {
        let decoded = Reply::decode(reply("true", "SP:token", "plain").as_bytes()).unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"SP:token");
        assert_eq!(decoded.ttl(), None);
        assert_eq!(decoded.original_ticket(), None);
    }

    #[test]
    fn base64_success() {
        let encoded = STANDARD.encode("Данные");
        let decoded = Reply::decode(reply("true", &encoded, "base64").as_bytes()).unwrap();

        assert_eq!(decoded.into_payload().into_text().unwrap(), "Данные");
    }

    #[test]
    fn result_is_case_insensitive() {
        assert!(Reply::decode(reply("TRUE", "x", "plain").as_bytes()).is_ok());
        assert!(Reply::decode(reply(" True ", "x", "plain").as_bytes()).is_ok());
    }

    #[test]
    fn false_result_carries_server_text() {
        let err = Reply::decode(reply("false", "Already locked", "plain").as_bytes()).unwrap_err();

        assert_eq!(err, ProtocolError::Rejected("Already locked".to_string()));
    }

    #[test]
    fn false_result_with_base64_text() {
        let encoded = STANDARD.encode("Not locked");
        let err = Reply::decode(reply("false", &encoded, "base64").as_bytes()).unwrap_err();

        assert_eq!(err.server_message(), Some("Not locked"));
    }

    #[test]
    fn unknown_encoding_reads_as_plain() {
        let decoded = Reply::decode(reply("true", "abc", "hex").as_bytes()).unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"abc");
    }

    #[test]
    fn missing_encoding_reads_as_plain() {
        let xml = "<r><result>true</result><data>abc</data></r>";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().payload().as_bytes(), b"abc");
    }

    #[test]
    fn escaped_text_is_unescaped() {
        let decoded = Reply::decode(reply("true", "a &amp; b &lt;c&gt; &#x41;", "plain").as_bytes())
            .unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"a & b <c> A");
    }

    #[test]
    fn whitespace_in_plain_data_is_kept() {
        let decoded = Reply::decode(reply("true", "  padded  ", "plain").as_bytes()).unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"  padded  ");
    }

    #[test]
    fn empty_data_element() {
        let xml = "<r><result>true</result><data encoding=\"plain\"/></r>";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().payload().as_bytes(), b"");
    }

    #[test]
    fn cdata_is_taken_verbatim() {
        let decoded = Reply::decode(reply("true", "<![CDATA[<x>&]]>", "plain").as_bytes()).unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"<x>&");
    }

    #[test]
    fn base64_may_be_line_wrapped() {
        let decoded = Reply::decode(reply("true", "aGVs\nbG8=", "base64").as_bytes()).unwrap();

        assert_eq!(decoded.payload().as_bytes(), b"hello");
    }

    #[test]
    fn ttl_and_original_ticket() {
        let xml = format!(
            "<r><result>true</result><data encoding=\"plain\">SP:new</data>\
             <ttl encoding=\"plain\">600</ttl>\
             <originalTicket encoding=\"base64\">{}</originalTicket></r>",
            STANDARD.encode("SP:old")
        );

        let decoded = Reply::decode(xml.as_bytes()).unwrap();

        assert_eq!(decoded.ttl(), Some(600));
        assert_eq!(decoded.original_ticket(), Some("SP:old"));
    }

    #[test]
    fn non_integer_ttl_is_malformed() {
        let xml = "<r><result>true</result><data encoding=\"plain\">x</data>\
                   <ttl encoding=\"plain\">soon</ttl></r>";

        let err = Reply::decode(xml.as_bytes()).unwrap_err();

        assert_eq!(err, ProtocolError::Malformed("unable to convert ttl to int".to_string()));
    }

    #[test]
    fn failure_ignores_bad_ttl() {
        let xml = "<r><result>false</result><data encoding=\"plain\">Invalid ticket format</data>\
                   <ttl encoding=\"plain\">soon</ttl></r>";

        let err = Reply::decode(xml.as_bytes()).unwrap_err();

        assert_eq!(err.server_message(), Some("Invalid ticket format"));
    }

    #[test]
    fn first_occurrence_wins() {
        let xml = "<r><result>true</result><data encoding=\"plain\">one</data>\
                   <data encoding=\"plain\">two</data></r>";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().payload().as_bytes(), b"one");
    }

    #[test]
    fn nested_fields_are_found() {
        let xml = "<r><body><result>true</result><data encoding=\"plain\">deep</data></body></r>";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().payload().as_bytes(), b"deep");
    }

    #[test]
    fn doctype_is_rejected() {
        let xml = "<?xml version=\"1.0\"?>\
                   <!DOCTYPE r [<!ENTITY x SYSTEM \"file:///etc/passwd\">]>\
                   <r><result>true</result><data encoding=\"plain\">&x;</data></r>";

        let err = Reply::decode(xml.as_bytes()).unwrap_err();

        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn missing_result_is_malformed() {
        let xml = "<r><data encoding=\"plain\">x</data></r>";

        assert_eq!(
            Reply::decode(xml.as_bytes()).unwrap_err(),
            ProtocolError::Malformed("missing <result>".to_string())
        );
    }

    #[test]
    fn missing_data_is_malformed() {
        let xml = "<r><result>true</result></r>";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn truncated_document_is_malformed() {
        let xml = "<r><result>true</result><data encoding=\"plain\">x";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let xml = "<r><result>true</data></r>";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn empty_body_is_malformed() {
        assert!(matches!(Reply::decode(b""), Err(ProtocolError::Malformed(_))));
        assert!(matches!(Reply::decode(b"not xml"), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn second_root_element_is_malformed() {
        let xml = "<r><result>true</result><data>x</data></r><second/>";

        let err = Reply::decode(xml.as_bytes()).unwrap_err();

        assert_eq!(err, ProtocolError::Malformed("content after the root element".to_string()));
    }

    #[test]
    fn text_after_root_is_malformed() {
        let xml = "<r><result>true</result><data>x</data></r>trailing junk";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn text_before_root_is_malformed() {
        let xml = "leading junk<r><result>true</result><data>x</data></r>";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn whitespace_and_comments_around_root_are_fine() {
        let xml = "\u{feff}<?xml version=\"1.0\"?>\n<!-- reply -->\n\
                   <r><result>true</result><data>x</data></r>\n\n";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().payload().as_bytes(), b"x");
    }

    #[test]
    fn duplicate_attribute_is_malformed() {
        let xml = "<r><result>true</result><data a=\"1\" a=\"2\">x</data></r>";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn duplicate_attribute_on_ignored_element_is_malformed() {
        let xml = "<r id=\"1\" id=\"1\"><result>true</result><data>x</data></r>";

        assert!(matches!(Reply::decode(xml.as_bytes()), Err(ProtocolError::Malformed(_))));
    }

    #[test]
    fn negative_ttl_is_accepted() {
        let xml = "<r><result>true</result><data>SP:t</data><ttl>-5</ttl></r>";

        assert_eq!(Reply::decode(xml.as_bytes()).unwrap().ttl(), Some(-5));
    }

    #[test]
    fn ttl_beyond_signed_32_bits_is_malformed() {
        let xml = "<r><result>true</result><data>SP:t</data><ttl>4000000000</ttl></r>";

        let err = Reply::decode(xml.as_bytes()).unwrap_err();

        assert_eq!(err, ProtocolError::Malformed("unable to convert ttl to int".to_string()));
    }

    #[test]
    fn bad_base64_is_malformed() {
        let err = Reply::decode(reply("true", "@@@", "base64").as_bytes()).unwrap_err();

        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn display_of_malformed() {
        let err = Reply::decode(b"<r/>").unwrap_err();

        assert_eq!(err.to_string(), "Malformed SPFE reply: missing <result>");
    }
}
