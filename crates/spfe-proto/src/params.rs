//! Command parameters and their form encoding.
//!
//! Every SPFE command takes a flat set of `name=value` pairs. Values are either
//! text or raw bytes (PFIDs, binary container payloads, binary lock ids). Both
//! are form-encoded byte for byte: text as its UTF-8 bytes, binary as-is, so a
//! binary value is never reinterpreted as text on the way out.

use std::collections::{BTreeMap, btree_map};

use url::form_urlencoded;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// UTF-8 text
    Text(String),
    /// Raw bytes
    Binary(Vec<u8>),
}

impl ParamValue {
    /// Bytes that go on the wire before form encoding.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Binary(bytes) => bytes,
        }
    }

    /// True for `""` and for an empty byte string.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Form-encoded value.
    pub fn encode(&self) -> String {
        form_urlencoded::byte_serialize(self.as_bytes()).collect()
    }
}

impl From<&str> for ParamValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&[u8]> for ParamValue {
    fn from(bytes: &[u8]) -> Self {
        Self::Binary(bytes.to_vec())
    }
}

impl From<Vec<u8>> for ParamValue {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Binary(bytes)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Text(value.to_string())
    }
}

/// Parameter set for one request.
///
/// # Invariants
///
/// - Keys are unique. Inserting an existing key replaces its value.
/// - Iteration and encoding order is the lexicographic key order, so the same
///   parameters always encode to the same string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    entries: BTreeMap<String, ParamValue>,
}

impl Params {
    /// Empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter, returning the value it replaced.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<ParamValue>,
    ) -> Option<ParamValue> {
        self.entries.insert(key.into(), value.into())
    }

    /// Insert a parameter only if it carries a value.
    ///
    /// `None` and empty values are both treated as "absent": the server then
    /// applies its own default.
    pub fn insert_present<V: Into<ParamValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(value) = value.map(Into::into).filter(|v| !v.is_empty()) {
            self.entries.insert(key.to_string(), value);
        }
    }

    /// Builder form of [`Params::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Value for `key`.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries.get(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no parameters are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate parameters in encoding order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, ParamValue> {
        self.entries.iter()
    }

    /// Encode as `k1=v1&k2=v2` (`application/x-www-form-urlencoded`).
    pub fn encode(&self) -> String {
        self.entries
            .iter()
            .map(|(key, value)| {
                let key: String = form_urlencoded::byte_serialize(key.as_bytes()).collect();
                format!("{key}={}", value.encode())
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl<'a> IntoIterator for &'a Params {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = btree_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_params_encode_to_empty_string() {
        assert_eq!(Params::new().encode(), "");
    }

    #[test]
    fn pairs_are_joined_in_key_order() {
        let params = Params::new().with("ticket", "SP:abc").with("auth_type", "p");

        assert_eq!(params.encode(), "auth_type=p&ticket=SP%3Aabc");
    }

    #[test]
    fn text_is_percent_encoded_as_utf8() {
        let params = Params::new().with("data", "Дан");

        assert_eq!(params.encode(), "data=%D0%94%D0%B0%D0%BD");
    }

    #[test]
    fn space_becomes_plus_and_unreserved_chars_pass_through() {
        let params = Params::new().with("data", "a b*-._~");

        assert_eq!(params.encode(), "data=a+b*-._%7E");
    }

    #[test]
    fn binary_is_encoded_byte_for_byte() {
        let params = Params::new().with("pfid", vec![0x00_u8, 0x41, 0xFF, 0x20]);

        assert_eq!(params.encode(), "pfid=%00A%FF+");
    }

    #[test]
    fn insert_replaces_existing_key() {
        let mut params = Params::new();
        params.insert("to", 10u32);
        let previous = params.insert("to", 20u32);

        assert_eq!(previous, Some(ParamValue::Text("10".to_string())));
        assert_eq!(params.len(), 1);
        assert_eq!(params.encode(), "to=20");
    }

    #[test]
    fn insert_present_skips_absent_and_empty_values() {
        let mut params = Params::new();
        params.insert_present("auth_type", None::<&str>);
        params.insert_present("container", Some(""));
        params.insert_present("lockid", Some("lock-1"));

        assert_eq!(params.len(), 1);
        assert_eq!(params.get("lockid"), Some(&ParamValue::Text("lock-1".to_string())));
    }
}
