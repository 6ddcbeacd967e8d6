//! Optional command parameters.
//!
//! Every field defaults to "absent": the parameter is left out and the server
//! applies its own default. Empty strings count as absent too.

use spfe_crypto::MessageKey;

/// Options for ticket issuance (`get`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GetTicketOptions {
    /// Required authentication factors, e.g. `"p"` or `"pc"`
    pub auth_type: Option<String>,
    /// Ticket lifetime in seconds; 0 means the server default
    pub ttl: u32,
    /// Message sealed client-side and stored with the ticket
    pub message: Option<String>,
    /// QAS URI, passed through verbatim
    pub qas_uri: Option<String>,
}

impl GetTicketOptions {
    /// Require these authentication factors.
    #[must_use]
    pub fn auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self
    }

    /// Request this lifetime in seconds.
    #[must_use]
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Attach a message. It is sealed under a fresh key, which is returned
    /// in [`TicketGrant::message_key`].
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Pass a QAS URI.
    #[must_use]
    pub fn qas_uri(mut self, qas_uri: impl Into<String>) -> Self {
        self.qas_uri = Some(qas_uri.into());
        self
    }
}

/// Options for ticket validation (`put`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutTicketOptions {
    /// Required authentication factors
    pub auth_type: Option<String>,
    /// New lifetime in seconds; 0 means the server default
    pub ttl: u32,
}

impl PutTicketOptions {
    /// Require these authentication factors.
    #[must_use]
    pub fn auth_type(mut self, auth_type: impl Into<String>) -> Self {
        self.auth_type = Some(auth_type.into());
        self
    }

    /// Request this lifetime in seconds.
    #[must_use]
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Which user container to address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerOptions {
    /// Container name; over-long names are rejected ("Container ID too long")
    pub container: Option<String>,
}

impl ContainerOptions {
    /// Address the named container.
    pub fn named(container: impl Into<String>) -> Self {
        Self { container: Some(container.into()) }
    }
}

/// Scope of a user container lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockOptions {
    /// Lock identifier, scoped to the ticket
    pub lock_id: Option<String>,
}

impl LockOptions {
    /// Lock scoped to `lock_id`.
    pub fn id(lock_id: impl Into<String>) -> Self {
        Self { lock_id: Some(lock_id.into()) }
    }
}

/// A ticket issued or reissued by SPFE.
#[derive(Debug)]
pub struct TicketGrant {
    /// The ticket
    pub ticket: String,
    /// Lifetime in seconds, if the server reported one
    pub ttl: Option<i32>,
    /// Ticket this one replaces, if the server reissued it
    pub original_ticket: Option<String>,
    /// Key sealing the attached message; `None` when no message was sent
    pub message_key: Option<MessageKey>,
}
