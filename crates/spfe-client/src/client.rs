//! Command surface.
//!
//! Every method is one request/response round trip. Nothing is cached and
//! nothing is retried; state between calls is whatever the caller threads
//! through (tickets, PFIDs, lock ids).

use std::path::Path;

use spfe_crypto::{MessageKey, seal_message};
use spfe_proto::{
    Command, ParamValue, Payload, Pfid, ProtocolError, Reply, Request, service_provider_name,
};
use tracing::debug;

use crate::{
    context::{ConnectionConfig, ConnectionContext},
    error::Error,
    identity::Identity,
    options::{ContainerOptions, GetTicketOptions, LockOptions, PutTicketOptions, TicketGrant},
    transport::{HttpsTransport, Transport},
    trust::TrustAnchor,
};

/// SPFE client for one Service Provider.
///
/// Generic over the [`Transport`] so the same command surface runs against
/// the real service or a simulated one.
#[derive(Debug, Clone)]
pub struct Client<T = HttpsTransport> {
    transport: T,
}

impl Client<HttpsTransport> {
    /// Client over HTTPS using `context`.
    ///
    /// # Errors
    ///
    /// - `Config`: the HTTPS client cannot be built
    pub fn new(context: &ConnectionContext) -> Result<Self, Error> {
        Ok(Self { transport: HttpsTransport::new(context)? })
    }

    /// Client over HTTPS from certificate and key files.
    ///
    /// # Errors
    ///
    /// - `Config`: see [`Identity::from_files`] and [`ConnectionContext::new`]
    pub fn from_files(
        certificate_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
        config: ConnectionConfig,
    ) -> Result<Self, Error> {
        let identity = Identity::from_files(certificate_path, key_path)?;
        let context = ConnectionContext::new(identity, TrustAnchor::wwpass()?, config)?;
        Self::new(&context)
    }
}

impl<T: Transport> Client<T> {
    /// Client over an arbitrary transport.
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    /// Send a raw request and decode the reply.
    ///
    /// # Errors
    ///
    /// - `InvalidArgument`: the request does not render
    /// - `Transport`: the round trip failed
    /// - `Protocol`: the server rejected the request or the reply is malformed
    pub fn execute(&self, request: &Request) -> Result<Reply, Error> {
        debug!(method = %request.method(), command = request.path(), "SPFE request");

        let body = self.transport.send(request)?;

        Reply::decode(&body).map_err(|err| {
            match &err {
                ProtocolError::Rejected(message) => {
                    debug!(command = request.path(), %message, "SPFE rejected command");
                },
                ProtocolError::Malformed(reason) => {
                    debug!(command = request.path(), %reason, "malformed SPFE reply");
                },
                ProtocolError::TicketWithoutColon => {},
            }
            Error::Protocol(err)
        })
    }

    fn call(&self, command: Command) -> Result<Payload, Error> {
        Ok(self.execute(&command.into_request())?.into_payload())
    }

    /// PUID of the user behind `ticket`.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Invalid or timed-out ticket"
    pub fn get_puid(&self, ticket: &str, auth_type: Option<&str>) -> Result<String, Error> {
        let command = Command::GetPuid {
            ticket: ticket.to_string(),
            auth_type: auth_type.map(str::to_string),
        };
        Ok(self.call(command)?.into_text()?)
    }

    /// Issue a new ticket.
    ///
    /// With a non-empty [`GetTicketOptions::message`] the message is sealed
    /// under a fresh key before sending, and the key is returned in
    /// [`TicketGrant::message_key`]. The key is never sent.
    ///
    /// # Errors
    ///
    /// - `Crypto`: the message could not be sealed
    /// - `Protocol`: the server refused to issue a ticket
    pub fn get_ticket(&self, options: &GetTicketOptions) -> Result<TicketGrant, Error> {
        let (message, message_key) = match options.message.as_deref() {
            Some(message) if !message.is_empty() => {
                let key = MessageKey::generate()?;
                let sealed = seal_message(message.as_bytes(), &key)?;
                (Some(sealed.to_json()?), Some(key))
            },
            _ => (None, None),
        };

        let command = Command::GetTicket {
            auth_type: options.auth_type.clone(),
            ttl: options.ttl,
            message,
            qas_uri: options.qas_uri.clone(),
        };

        let (payload, ttl, original_ticket) = self.execute(&command.into_request())?.into_parts();
        Ok(TicketGrant { ticket: payload.into_text()?, ttl, original_ticket, message_key })
    }

    /// Name of this Service Provider, as embedded in a fresh ticket.
    ///
    /// Returned exactly as the server spells it (e.g. `SDK%20Test`).
    ///
    /// # Errors
    ///
    /// - `Protocol`: the fresh ticket has no colon
    pub fn get_name(&self) -> Result<String, Error> {
        let grant = self.get_ticket(&GetTicketOptions::default())?;
        Ok(service_provider_name(&grant.ticket)?.to_string())
    }

    /// Validate `ticket`, possibly getting it reissued.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Invalid or timed-out ticket",
    ///   "Ticket was authorized with less factors than requested"
    pub fn put_ticket(
        &self,
        ticket: &str,
        options: &PutTicketOptions,
    ) -> Result<TicketGrant, Error> {
        let command = Command::PutTicket {
            ticket: ticket.to_string(),
            auth_type: options.auth_type.clone(),
            ttl: options.ttl,
        };

        let (payload, ttl, original_ticket) = self.execute(&command.into_request())?.into_parts();
        Ok(TicketGrant { ticket: payload.into_text()?, ttl, original_ticket, message_key: None })
    }

    /// Read a user container.
    ///
    /// A container that was never written reads as the server's "absent"
    /// sentinel, not as an error.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Invalid or timed-out ticket", "Container ID too long"
    pub fn read_data(&self, ticket: &str, options: &ContainerOptions) -> Result<Payload, Error> {
        self.call(Command::Read {
            ticket: ticket.to_string(),
            container: options.container.clone(),
            lock: None,
        })
    }

    /// Read a user container and lock it for `lock_timeout` seconds.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Already locked"
    pub fn read_data_and_lock(
        &self,
        ticket: &str,
        options: &ContainerOptions,
        lock_timeout: u32,
    ) -> Result<Payload, Error> {
        self.call(Command::Read {
            ticket: ticket.to_string(),
            container: options.container.clone(),
            lock: Some(lock_timeout),
        })
    }

    /// Write a user container.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Invalid or timed-out ticket"
    pub fn write_data(
        &self,
        ticket: &str,
        data: impl Into<ParamValue>,
        options: &ContainerOptions,
    ) -> Result<Payload, Error> {
        self.call(Command::Write {
            ticket: ticket.to_string(),
            data: data.into(),
            container: options.container.clone(),
            unlock: false,
        })
    }

    /// Write a user container and release its lock.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Invalid or timed-out ticket"
    pub fn write_data_and_unlock(
        &self,
        ticket: &str,
        data: impl Into<ParamValue>,
        options: &ContainerOptions,
    ) -> Result<Payload, Error> {
        self.call(Command::Write {
            ticket: ticket.to_string(),
            data: data.into(),
            container: options.container.clone(),
            unlock: true,
        })
    }

    /// Take the lock of `ticket` for `lock_timeout` seconds.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "Already locked" while another lock is live
    pub fn lock(
        &self,
        ticket: &str,
        lock_timeout: u32,
        options: &LockOptions,
    ) -> Result<Payload, Error> {
        self.call(Command::Lock {
            ticket: ticket.to_string(),
            timeout: lock_timeout,
            lock_id: options.lock_id.clone(),
        })
    }

    /// Release the lock of `ticket`.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "Not locked" when no lock is live
    pub fn unlock(&self, ticket: &str, options: &LockOptions) -> Result<Payload, Error> {
        self.call(Command::Unlock { ticket: ticket.to_string(), lock_id: options.lock_id.clone() })
    }

    /// Allocate an empty SP-scoped container.
    ///
    /// # Errors
    ///
    /// - `Protocol`: the server refused the allocation
    pub fn create_pfid(&self) -> Result<Pfid, Error> {
        Ok(Pfid::new(self.call(Command::CreatePfid { data: None })?.into_bytes()))
    }

    /// Allocate an SP-scoped container holding `data`.
    ///
    /// # Errors
    ///
    /// - `Protocol`: the server refused the allocation
    pub fn create_pfid_with_data(&self, data: impl Into<ParamValue>) -> Result<Pfid, Error> {
        let command = Command::CreatePfid { data: Some(data.into()) };
        Ok(Pfid::new(self.call(command)?.into_bytes()))
    }

    /// Delete an SP-scoped container.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "ID does not exist", "Invalid or absent PFID"
    pub fn remove_pfid(&self, pfid: &Pfid) -> Result<Payload, Error> {
        self.call(Command::RemovePfid { pfid: pfid.clone() })
    }

    /// Read an SP-scoped container.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "ID does not exist", "Invalid or absent PFID"
    pub fn read_data_sp(&self, pfid: &Pfid) -> Result<Payload, Error> {
        self.call(Command::ReadSp { pfid: pfid.clone(), lock: None })
    }

    /// Read an SP-scoped container and lock it for `lock_timeout` seconds.
    ///
    /// # Errors
    ///
    /// - `Protocol`: e.g. "Already locked"
    pub fn read_data_sp_and_lock(&self, pfid: &Pfid, lock_timeout: u32) -> Result<Payload, Error> {
        self.call(Command::ReadSp { pfid: pfid.clone(), lock: Some(lock_timeout) })
    }

    /// Write an SP-scoped container.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "ID does not exist", "Invalid or absent PFID"
    pub fn write_data_sp(
        &self,
        pfid: &Pfid,
        data: impl Into<ParamValue>,
    ) -> Result<Payload, Error> {
        self.call(Command::WriteSp { pfid: pfid.clone(), data: data.into(), unlock: false })
    }

    /// Write an SP-scoped container and release its lock.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "ID does not exist", "Invalid or absent PFID"
    pub fn write_data_sp_and_unlock(
        &self,
        pfid: &Pfid,
        data: impl Into<ParamValue>,
    ) -> Result<Payload, Error> {
        self.call(Command::WriteSp { pfid: pfid.clone(), data: data.into(), unlock: true })
    }

    /// Take an SP-scoped lock for `lock_timeout` seconds.
    ///
    /// `lock_id` may be text or bytes.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "Already locked" while the lock is live
    pub fn lock_sp(
        &self,
        lock_id: impl Into<ParamValue>,
        lock_timeout: u32,
    ) -> Result<Payload, Error> {
        self.call(Command::LockSp { lock_id: lock_id.into(), timeout: lock_timeout })
    }

    /// Release an SP-scoped lock.
    ///
    /// # Errors
    ///
    /// - `Protocol`: "Not locked" when the lock is not live
    pub fn unlock_sp(&self, lock_id: impl Into<ParamValue>) -> Result<Payload, Error> {
        self.call(Command::UnlockSp { lock_id: lock_id.into() })
    }
}
