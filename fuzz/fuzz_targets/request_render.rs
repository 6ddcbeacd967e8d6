//! Fuzz target for request rendering
//!
//! Arbitrary hosts, paths and parameters. Rendering must never panic; a
//! rendered GET query and POST body must decode back to the same pairs.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spfe_proto::{Method, ParamValue, Params, Request};

#[derive(Debug, Arbitrary)]
struct Input {
    post: bool,
    host: String,
    path: String,
    params: Vec<(String, Vec<u8>, bool)>,
}

fuzz_target!(|input: Input| {
    let method = if input.post { Method::Post } else { Method::Get };
    let mut params = Params::new();
    for (key, value, binary) in input.params {
        let value = if binary {
            ParamValue::Binary(value)
        } else {
            ParamValue::Text(String::from_utf8_lossy(&value).into_owned())
        };
        params.insert(key, value);
    }

    let request = Request::new(method, input.path).with_params(params.clone());
    let _ = request.url(&input.host);

    let encoded = params.encode();
    let decoded: Vec<_> = url::form_urlencoded::parse(encoded.as_bytes()).collect();
    assert_eq!(decoded.len(), params.len());
    if input.post {
        assert_eq!(request.body().as_deref(), Some(encoded.as_str()));
    }
});
