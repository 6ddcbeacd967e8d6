//! SPFE Message Sealing
//!
//! Ticket issuance can carry a short message for whoever later holds the
//! ticket. The message is sealed client-side; SPFE stores only the sealed
//! envelope and the key never leaves the caller.
//!
//! ```text
//! message ──┐
//!           ├──▶ AES-128-GCM (MESSAGE_NONCE) ──▶ {ciphertext, tag, nonce} ──▶ `message`
//! fresh key ┘
//!     │
//!     └──────────────────────────────────────────────────────────────────▶ caller
//! ```
//!
//! # Security
//!
//! - Keys are 128-bit, drawn from the OS random source, one per message
//! - The nonce is a fixed protocol constant; uniqueness of (key, nonce) rests
//!   entirely on key freshness
//! - Keys are zeroized on drop and never printed

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod key;
mod seal;

pub use error::SealError;
pub use key::{MESSAGE_KEY_SIZE, MessageKey};
pub use seal::{MESSAGE_NONCE, SealedMessage, TAG_SIZE, open_message, seal_message};
