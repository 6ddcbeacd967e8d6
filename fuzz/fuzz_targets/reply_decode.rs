//! Fuzz target for Reply::decode
//!
//! Arbitrary bytes as an SPFE reply document. Decoding must never panic:
//! anything that is not a well-formed reply is a `ProtocolError`.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spfe_proto::Reply;

fuzz_target!(|data: &[u8]| {
    let _ = Reply::decode(data);
});
