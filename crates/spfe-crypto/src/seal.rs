//! Message sealing using AES-128-GCM
//!
//! All functions are pure: the key is generated by the caller (see
//! [`MessageKey::generate`]) so tests can pin it.
//!
//! # Nonce
//!
//! Every message is sealed under the same 16-byte nonce, [`MESSAGE_NONCE`].
//! This is a property of the wire protocol, not an accident: the receiving
//! side expects exactly this value. It is only sound because every message
//! is sealed under its own freshly generated key, so no (key, nonce) pair is
//! ever used twice. Never seal two messages with one [`MessageKey`].

use aes_gcm::{
    AesGcm,
    aead::{AeadInPlace, KeyInit, consts::U16, generic_array::GenericArray},
    aes::Aes128,
};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::{error::SealError, key::MessageKey};

/// Fixed GCM nonce shared by every sealed message.
pub const MESSAGE_NONCE: [u8; 16] = [
    0x7c, 0x0b, 0xb4, 0xd6, 0x0d, 0x8b, 0xc2, 0xc9, 0x0d, 0x90, 0xd9, 0x57, 0xbd, 0x2d, 0x21, 0xfd,
];

/// GCM authentication tag size (16 bytes)
pub const TAG_SIZE: usize = 16;

/// AES-128-GCM with a 128-bit nonce and a 128-bit tag
type Aes128Gcm16 = AesGcm<Aes128, U16>;

/// A sealed message, as carried in the `message` parameter of `get`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedMessage {
    /// Ciphertext without the tag
    pub ciphertext: Vec<u8>,
    /// GCM authentication tag
    pub tag: [u8; TAG_SIZE],
    /// GCM nonce; always [`MESSAGE_NONCE`] when produced by [`seal_message`]
    pub nonce: [u8; 16],
}

/// JSON shape of the envelope: every field is standard base64.
#[derive(Serialize, Deserialize)]
struct Envelope {
    ciphertext: String,
    tag: String,
    nonce: String,
}

impl SealedMessage {
    /// Serialize as `{"ciphertext":"…","tag":"…","nonce":"…"}`.
    ///
    /// # Errors
    ///
    /// - `Envelope`: the JSON serializer failed
    pub fn to_json(&self) -> Result<String, SealError> {
        let envelope = Envelope {
            ciphertext: STANDARD.encode(&self.ciphertext),
            tag: STANDARD.encode(self.tag),
            nonce: STANDARD.encode(self.nonce),
        };
        serde_json::to_string(&envelope).map_err(envelope_error)
    }

    /// Parse an envelope produced by [`SealedMessage::to_json`].
    ///
    /// # Errors
    ///
    /// - `Envelope`: not JSON of the expected shape, bad base64, or a tag or
    ///   nonce that is not 16 bytes
    pub fn from_json(json: &str) -> Result<Self, SealError> {
        let envelope: Envelope = serde_json::from_str(json).map_err(envelope_error)?;

        Ok(Self {
            ciphertext: STANDARD.decode(envelope.ciphertext).map_err(envelope_error)?,
            tag: decode_fixed(&envelope.tag, "tag")?,
            nonce: decode_fixed(&envelope.nonce, "nonce")?,
        })
    }
}

fn envelope_error(e: impl std::fmt::Display) -> SealError {
    SealError::Envelope { reason: e.to_string() }
}

fn decode_fixed(field: &str, name: &str) -> Result<[u8; 16], SealError> {
    let bytes = STANDARD.decode(field).map_err(envelope_error)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| SealError::Envelope {
        reason: format!("{name} must be 16 bytes, got {}", bytes.len()),
    })
}

/// Seal `plaintext` under `key` and [`MESSAGE_NONCE`].
///
/// # Errors
///
/// - `Encryption`: plaintext exceeds the AES-GCM length limit
pub fn seal_message(plaintext: &[u8], key: &MessageKey) -> Result<SealedMessage, SealError> {
    let cipher = Aes128Gcm16::new(key.as_bytes().into());
    let mut buffer = plaintext.to_vec();

    let tag = cipher
        .encrypt_in_place_detached(GenericArray::from_slice(&MESSAGE_NONCE), b"", &mut buffer)
        .map_err(|_| SealError::Encryption)?;

    let mut tag_bytes = [0u8; TAG_SIZE];
    tag_bytes.copy_from_slice(&tag);

    Ok(SealedMessage { ciphertext: buffer, tag: tag_bytes, nonce: MESSAGE_NONCE })
}

/// Open a sealed message with the key returned at issuance.
///
/// # Errors
///
/// - `Decryption`: wrong key, or the envelope was tampered with
pub fn open_message(sealed: &SealedMessage, key: &MessageKey) -> Result<Vec<u8>, SealError> {
    let cipher = Aes128Gcm16::new(key.as_bytes().into());
    let mut buffer = sealed.ciphertext.clone();

    cipher
        .decrypt_in_place_detached(
            GenericArray::from_slice(&sealed.nonce),
            b"",
            &mut buffer,
            GenericArray::from_slice(&sealed.tag),
        )
        .map_err(|_| SealError::Decryption)?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::MESSAGE_KEY_SIZE;

    fn counting_key() -> MessageKey {
        let mut key = [0u8; MESSAGE_KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        MessageKey::from_bytes(key)
    }

    #[test]
    fn known_answer() {
        let sealed = seal_message(b"hello", &counting_key()).unwrap();

        assert_eq!(sealed.ciphertext, [0x80, 0x27, 0x4b, 0xca, 0xd2]);
        assert_eq!(
            sealed.tag,
            [
                0x95, 0xf5, 0x95, 0x4e, 0x51, 0xb0, 0x30, 0x93, 0x65, 0xad, 0x02, 0xaf, 0x1d, 0x43,
                0xa8, 0x20
            ]
        );
    }

    #[test]
    fn known_answer_json() {
        let sealed = seal_message(b"hello", &counting_key()).unwrap();

        assert_eq!(
            sealed.to_json().unwrap(),
            r#"{"ciphertext":"gCdLytI=","tag":"lfWVTlGwMJNlrQKvHUOoIA==","nonce":"fAu01g2LwskNkNlXvS0h/Q=="}"#
        );
    }

    #[test]
    fn seal_open_roundtrip() {
        let key = counting_key();
        let sealed = seal_message("Привет, мир".as_bytes(), &key).unwrap();

        assert_eq!(open_message(&sealed, &key).unwrap(), "Привет, мир".as_bytes());
    }

    #[test]
    fn empty_message() {
        let key = counting_key();
        let sealed = seal_message(b"", &key).unwrap();

        assert!(sealed.ciphertext.is_empty());
        assert_eq!(open_message(&sealed, &key).unwrap(), b"");
    }

    #[test]
    fn ciphertext_is_as_long_as_plaintext() {
        let sealed = seal_message(b"twelve bytes", &counting_key()).unwrap();

        assert_eq!(sealed.ciphertext.len(), 12);
    }

    #[test]
    fn nonce_is_always_the_protocol_constant() {
        let a = seal_message(b"one", &MessageKey::generate().unwrap()).unwrap();
        let b = seal_message(b"two", &MessageKey::generate().unwrap()).unwrap();

        assert_eq!(a.nonce, MESSAGE_NONCE);
        assert_eq!(b.nonce, MESSAGE_NONCE);
    }

    #[test]
    fn fresh_keys_give_distinct_ciphertexts_under_fixed_nonce() {
        let a = seal_message(b"same message", &MessageKey::generate().unwrap()).unwrap();
        let b = seal_message(b"same message", &MessageKey::generate().unwrap()).unwrap();

        assert_ne!(a.ciphertext, b.ciphertext);
        assert_ne!(a.tag, b.tag);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal_message(b"secret", &counting_key()).unwrap();
        let wrong = MessageKey::from_bytes([0xFF; MESSAGE_KEY_SIZE]);

        assert_eq!(open_message(&sealed, &wrong), Err(SealError::Decryption));
    }

    #[test]
    fn tampered_tag_fails() {
        let key = counting_key();
        let mut sealed = seal_message(b"secret", &key).unwrap();
        sealed.tag[0] ^= 0x01;

        assert_eq!(open_message(&sealed, &key), Err(SealError::Decryption));
    }

    #[test]
    fn json_roundtrip_then_open() {
        let key = counting_key();
        let json = seal_message(b"through json", &key).unwrap().to_json().unwrap();

        let parsed = SealedMessage::from_json(&json).unwrap();

        assert_eq!(open_message(&parsed, &key).unwrap(), b"through json");
    }

    #[test]
    fn from_json_rejects_short_tag() {
        let json = r#"{"ciphertext":"","tag":"AAAA","nonce":"fAu01g2LwskNkNlXvS0h/Q=="}"#;

        let err = SealedMessage::from_json(json).unwrap_err();

        assert_eq!(err, SealError::Envelope { reason: "tag must be 16 bytes, got 3".to_string() });
    }

    #[test]
    fn from_json_rejects_missing_field() {
        let err = SealedMessage::from_json(r#"{"ciphertext":""}"#).unwrap_err();

        assert!(matches!(err, SealError::Envelope { .. }));
    }
}
