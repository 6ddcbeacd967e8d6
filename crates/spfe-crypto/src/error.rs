//! Error types for message sealing

use thiserror::Error;

/// Errors from sealing or opening a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SealError {
    /// The OS random source failed while generating a key
    #[error("random source failed: {reason}")]
    Random {
        /// Reason reported by the random source
        reason: String,
    },

    /// AEAD encryption failed (plaintext too long for AES-GCM)
    #[error("message encryption failed")]
    Encryption,

    /// Authentication tag did not verify (wrong key or tampered envelope)
    #[error("message decryption failed: authentication failed")]
    Decryption,

    /// Envelope is not valid JSON or a field is not valid base64 of the
    /// expected length
    #[error("invalid message envelope: {reason}")]
    Envelope {
        /// What was wrong with the envelope
        reason: String,
    },
}
