//! Message keys

use std::fmt;

use zeroize::Zeroize;

use crate::error::SealError;

/// Size of a message key (AES-128)
pub const MESSAGE_KEY_SIZE: usize = 16;

/// One-time AES-128 key protecting one sealed message.
///
/// Never sent to SPFE. The holder passes it to whoever should read the
/// message, out of band. Zeroized on drop; `Debug` does not print it.
pub struct MessageKey {
    key: [u8; MESSAGE_KEY_SIZE],
}

impl MessageKey {
    /// Wrap existing key bytes.
    pub fn from_bytes(key: [u8; MESSAGE_KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Fresh key from the OS random source.
    ///
    /// # Errors
    ///
    /// - `Random`: the OS random source is unavailable
    pub fn generate() -> Result<Self, SealError> {
        let mut key = [0u8; MESSAGE_KEY_SIZE];
        getrandom::fill(&mut key).map_err(|e| SealError::Random { reason: e.to_string() })?;
        Ok(Self { key })
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; MESSAGE_KEY_SIZE] {
        &self.key
    }
}

impl Drop for MessageKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl fmt::Debug for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageKey").field(&"[REDACTED]").finish()
    }
}
