//! The SPFE command set.
//!
//! Each [`Command`] variant is one protocol operation with its parameters
//! already resolved. [`Command::into_request`] fixes the method, the path and
//! the wire names of the parameters; optional values that are absent or empty
//! are left out so the server applies its own default.
//!
//! | Command          | Method | Path        |
//! |------------------|--------|-------------|
//! | `GetPuid`        | GET    | `puid`      |
//! | `GetTicket`      | GET    | `get`       |
//! | `PutTicket`      | GET    | `put`       |
//! | `Read`           | GET    | `read`      |
//! | `Write`          | POST   | `write`     |
//! | `Lock`           | GET    | `lock`      |
//! | `Unlock`         | GET    | `unlock`    |
//! | `CreatePfid`     | POST   | `sp/create` |
//! | `RemovePfid`     | GET    | `sp/remove` |
//! | `ReadSp`         | GET    | `sp/read`   |
//! | `WriteSp`        | POST   | `sp/write`  |
//! | `LockSp`         | GET    | `sp/lock`   |
//! | `UnlockSp`       | GET    | `sp/unlock` |

use std::fmt;

use crate::{
    params::{ParamValue, Params},
    request::{Method, Request},
};

/// Service-Provider-scoped container identifier, allocated by `sp/create`.
///
/// Opaque bytes; always sent as a binary parameter.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Pfid(Vec<u8>);

impl Pfid {
    /// Wrap identifier bytes returned by the server.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Identifier bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Pfid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pfid(")?;
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

impl From<Vec<u8>> for Pfid {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&Pfid> for ParamValue {
    fn from(pfid: &Pfid) -> Self {
        ParamValue::Binary(pfid.0.clone())
    }
}

/// One protocol operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Fetch the PUID bound to a ticket
    GetPuid {
        /// Authenticated ticket
        ticket: String,
        /// Required authentication factors
        auth_type: Option<String>,
    },

    /// Issue a new ticket
    GetTicket {
        /// Required authentication factors
        auth_type: Option<String>,
        /// Ticket lifetime in seconds; 0 means the server default
        ttl: u32,
        /// Sealed message envelope, already serialized
        message: Option<String>,
        /// QAS URI, passed through verbatim
        qas_uri: Option<String>,
    },

    /// Validate a ticket and possibly reissue it
    PutTicket {
        /// Ticket to validate
        ticket: String,
        /// Required authentication factors
        auth_type: Option<String>,
        /// New lifetime in seconds; 0 means the server default
        ttl: u32,
    },

    /// Read a user container
    Read {
        /// Ticket identifying the user
        ticket: String,
        /// Container name
        container: Option<String>,
        /// Lock timeout in seconds; `Some` also takes the lock
        lock: Option<u32>,
    },

    /// Write a user container
    Write {
        /// Ticket identifying the user
        ticket: String,
        /// New content
        data: ParamValue,
        /// Container name
        container: Option<String>,
        /// Release the container lock after writing
        unlock: bool,
    },

    /// Lock a user container
    Lock {
        /// Ticket identifying the user
        ticket: String,
        /// Lock timeout in seconds
        timeout: u32,
        /// Lock scope
        lock_id: Option<String>,
    },

    /// Release a user container lock
    Unlock {
        /// Ticket identifying the user
        ticket: String,
        /// Lock scope
        lock_id: Option<String>,
    },

    /// Allocate an SP-scoped container
    CreatePfid {
        /// Initial content
        data: Option<ParamValue>,
    },

    /// Delete an SP-scoped container
    RemovePfid {
        /// Container to delete
        pfid: Pfid,
    },

    /// Read an SP-scoped container
    ReadSp {
        /// Container to read
        pfid: Pfid,
        /// Lock timeout in seconds; `Some` also takes the lock
        lock: Option<u32>,
    },

    /// Write an SP-scoped container
    WriteSp {
        /// Container to write
        pfid: Pfid,
        /// New content
        data: ParamValue,
        /// Release the container lock after writing
        unlock: bool,
    },

    /// Take an SP-scoped lock
    LockSp {
        /// Lock identifier, text or binary
        lock_id: ParamValue,
        /// Lock timeout in seconds
        timeout: u32,
    },

    /// Release an SP-scoped lock
    UnlockSp {
        /// Lock identifier, text or binary
        lock_id: ParamValue,
    },
}

impl Command {
    /// HTTP method used on the wire.
    pub fn method(&self) -> Method {
        match self {
            Self::Write { .. } | Self::CreatePfid { .. } | Self::WriteSp { .. } => Method::Post,
            _ => Method::Get,
        }
    }

    /// Command path, without the `.xml` suffix.
    pub fn path(&self) -> &'static str {
        match self {
            Self::GetPuid { .. } => "puid",
            Self::GetTicket { .. } => "get",
            Self::PutTicket { .. } => "put",
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Lock { .. } => "lock",
            Self::Unlock { .. } => "unlock",
            Self::CreatePfid { .. } => "sp/create",
            Self::RemovePfid { .. } => "sp/remove",
            Self::ReadSp { .. } => "sp/read",
            Self::WriteSp { .. } => "sp/write",
            Self::LockSp { .. } => "sp/lock",
            Self::UnlockSp { .. } => "sp/unlock",
        }
    }

    /// Resolve into a wire request.
    pub fn into_request(self) -> Request {
        let method = self.method();
        let path = self.path();
        let mut params = Params::new();

        match self {
            Self::GetPuid { ticket, auth_type } => {
                params.insert("ticket", ticket);
                params.insert_present("auth_type", auth_type);
            },
            Self::GetTicket { auth_type, ttl, message, qas_uri } => {
                params.insert_present("auth_type", auth_type);
                insert_ttl(&mut params, ttl);
                params.insert_present("message", message);
                params.insert_present("qasUri", qas_uri);
            },
            Self::PutTicket { ticket, auth_type, ttl } => {
                params.insert("ticket", ticket);
                params.insert_present("auth_type", auth_type);
                insert_ttl(&mut params, ttl);
            },
            Self::Read { ticket, container, lock } => {
                params.insert("ticket", ticket);
                params.insert_present("container", container);
                insert_read_lock(&mut params, lock);
            },
            Self::Write { ticket, data, container, unlock } => {
                params.insert("ticket", ticket);
                params.insert("data", data);
                params.insert_present("container", container);
                insert_unlock(&mut params, unlock);
            },
            Self::Lock { ticket, timeout, lock_id } => {
                params.insert("ticket", ticket);
                params.insert("to", timeout);
                params.insert_present("lockid", lock_id);
            },
            Self::Unlock { ticket, lock_id } => {
                params.insert("ticket", ticket);
                params.insert_present("lockid", lock_id);
            },
            Self::CreatePfid { data } => {
                params.insert_present("data", data);
            },
            Self::RemovePfid { pfid } => {
                params.insert("pfid", &pfid);
            },
            Self::ReadSp { pfid, lock } => {
                params.insert("pfid", &pfid);
                insert_read_lock(&mut params, lock);
            },
            Self::WriteSp { pfid, data, unlock } => {
                params.insert("pfid", &pfid);
                params.insert("data", data);
                insert_unlock(&mut params, unlock);
            },
            Self::LockSp { lock_id, timeout } => {
                params.insert("lockid", lock_id);
                params.insert("to", timeout);
            },
            Self::UnlockSp { lock_id } => {
                params.insert("lockid", lock_id);
            },
        }

        Request::new(method, path).with_params(params)
    }
}

fn insert_ttl(params: &mut Params, ttl: u32) {
    if ttl != 0 {
        params.insert("ttl", ttl);
    }
}

fn insert_read_lock(params: &mut Params, lock: Option<u32>) {
    if let Some(timeout) = lock {
        params.insert("to", timeout);
        params.insert("lock", "1");
    }
}

fn insert_unlock(params: &mut Params, unlock: bool) {
    if unlock {
        params.insert("unlock", "1");
    }
}
