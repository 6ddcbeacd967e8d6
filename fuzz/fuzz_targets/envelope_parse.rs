//! Fuzz target for SealedMessage::from_json
//!
//! Arbitrary text as a message envelope. Parsing must never panic, and an
//! envelope that parses must open or fail cleanly under any key.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spfe_crypto::{MessageKey, SealedMessage, open_message};

fuzz_target!(|input: (String, [u8; 16])| {
    let (json, key) = input;
    if let Ok(sealed) = SealedMessage::from_json(&json) {
        let _ = open_message(&sealed, &MessageKey::from_bytes(key));
    }
});
