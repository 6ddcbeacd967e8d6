//! In-memory SPFE server.
//!
//! `SimSpfe` implements the client's [`Transport`] seam and answers every
//! command the way the live service does: tickets with lifetimes, user and
//! SP-scoped containers, advisory locks with timeouts, and the service's own
//! error texts. Time is virtual; it only moves when the test calls
//! [`SimSpfe::advance`].

#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

use spfe_client::{Client, Error, Method, Request, Transport};
use spfe_proto::Encoding;
use tracing::{debug, trace};

use crate::wire::{ReplyBody, WireRequest};

/// Payload of a container that was never written.
pub const ABSENT: &str = "None";

/// Lifetime of a ticket issued without an explicit ttl, in seconds.
pub const DEFAULT_TICKET_TTL: u64 = 600;

/// Longest container name and lock id the server accepts, in bytes.
const MAX_ID_LEN: usize = 16;

const INVALID_TICKET_FORMAT: &str = "Invalid ticket format";
const TIMED_OUT_TICKET: &str = "Invalid or timed-out ticket";
const LESS_FACTORS: &str = "Ticket was authorized with less factors than requested";
const CONTAINER_TOO_LONG: &str = "Container ID too long";
const INVALID_LOCK_ID: &str = "Invalid lock ID";
const ALREADY_LOCKED: &str = "Already locked";
const NOT_LOCKED: &str = "Not locked";
const INVALID_PFID: &str = "Invalid or absent PFID";
const UNKNOWN_PFID: &str = "ID does not exist";

/// Server-reported failure text.
type Outcome = Result<ReplyBody, &'static str>;

/// Simulated server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Service Provider name embedded in issued tickets, as the server
    /// spells it
    pub sp_name: String,
    /// How reply fields are encoded on the wire
    pub encoding: Encoding,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { sp_name: "SDK%20Test".to_string(), encoding: Encoding::Plain }
    }
}

/// Deterministic in-memory SPFE server.
#[derive(Debug, Default)]
pub struct SimSpfe {
    config: SimConfig,
    state: Mutex<SimState>,
}

#[derive(Debug, Default)]
struct SimState {
    /// Virtual time in seconds
    clock: u64,
    next_id: u64,
    tickets: HashMap<String, TicketRecord>,
    containers: HashMap<(String, String), Vec<u8>>,
    sp_containers: HashMap<Vec<u8>, Vec<u8>>,
    /// Lock deadlines; a lock is live while its deadline is ahead of the clock
    locks: HashMap<LockKey, u64>,
    /// Raw bodies returned instead of handling the next requests
    scripted: VecDeque<Vec<u8>>,
    received: Vec<WireRequest>,
}

#[derive(Debug, Clone)]
struct TicketRecord {
    puid: String,
    factors: String,
    expires_at: u64,
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LockKey {
    Ticket { puid: String, lock_id: String },
    Container { puid: String, container: String },
    Sp(Vec<u8>),
    SpContainer(Vec<u8>),
}

impl LockKey {
    fn container(puid: &str, container: &str) -> Self {
        Self::Container { puid: puid.to_string(), container: container.to_string() }
    }
}

impl SimSpfe {
    /// Server with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Server with `config`.
    pub fn with_config(config: SimConfig) -> Self {
        Self { config, state: Mutex::default() }
    }

    /// Client talking to this server.
    pub fn client(&self) -> Client<&Self> {
        Client::with_transport(self)
    }

    /// Move virtual time forward.
    pub fn advance(&self, seconds: u64) {
        let mut state = self.state();
        state.clock += seconds;
        trace!(clock = state.clock, "advanced simulated clock");
    }

    /// Current virtual time in seconds.
    pub fn now(&self) -> u64 {
        self.state().clock
    }

    /// Answer the next request with `body` verbatim, without handling it.
    pub fn script_reply(&self, body: impl Into<Vec<u8>>) {
        self.state().scripted.push_back(body.into());
    }

    /// Sealed message envelope stored with `ticket`, if one was sent.
    pub fn sealed_message(&self, ticket: &str) -> Option<String> {
        self.state().tickets.get(ticket).and_then(|record| record.message.clone())
    }

    /// Every request received so far, in order.
    pub fn received(&self) -> Vec<WireRequest> {
        self.state().received.clone()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for SimSpfe {
    fn send(&self, request: &Request) -> Result<Vec<u8>, Error> {
        let wire = WireRequest::parse(request)?;

        match expected_method(&wire.command) {
            None => return Err(Error::Transport("SPFE answered HTTP 404 Not Found".to_string())),
            Some(method) if method != wire.method => {
                let status = "SPFE answered HTTP 405 Method Not Allowed";
                return Err(Error::Transport(status.to_string()));
            },
            Some(_) => {},
        }

        let mut state = self.state();
        state.received.push(wire.clone());

        if let Some(body) = state.scripted.pop_front() {
            debug!(command = %wire.command, "answering with scripted reply");
            return Ok(body);
        }

        let body = state.handle(&self.config.sp_name, &wire).unwrap_or_else(|message| {
            debug!(command = %wire.command, reason = message, "simulated SPFE rejected command");
            ReplyBody::failed(message)
        });

        Ok(body.render(self.config.encoding))
    }
}

fn expected_method(command: &str) -> Option<Method> {
    match command {
        "write" | "sp/create" | "sp/write" => Some(Method::Post),
        "get" | "put" | "puid" | "read" | "lock" | "unlock" | "sp/remove" | "sp/read"
        | "sp/lock" | "sp/unlock" => Some(Method::Get),
        _ => None,
    }
}

impl SimState {
    fn handle(&mut self, sp_name: &str, request: &WireRequest) -> Outcome {
        match request.command.as_str() {
            "get" => Ok(self.issue_ticket(sp_name, request, None)),
            "put" => self.reissue_ticket(sp_name, request),
            "puid" => self.puid(request),
            "read" => self.read(request),
            "write" => self.write(request),
            "lock" => self.lock(request),
            "unlock" => self.unlock(request),
            "sp/create" => Ok(self.create_pfid(request)),
            "sp/remove" => self.remove_pfid(request),
            "sp/read" => self.read_sp(request),
            "sp/write" => self.write_sp(request),
            "sp/lock" => self.lock_sp(request),
            "sp/unlock" => self.unlock_sp(request),
            _ => Err(INVALID_TICKET_FORMAT),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_ticket(
        &mut self,
        sp_name: &str,
        request: &WireRequest,
        lineage: Option<(String, String)>,
    ) -> ReplyBody {
        let id = self.next_id();
        let (puid, factors) = lineage.unwrap_or_else(|| {
            (format!("puid-{id:08}"), request.text("auth_type").unwrap_or_else(|| "p".to_string()))
        });
        let ttl = request.seconds("ttl").unwrap_or(DEFAULT_TICKET_TTL);
        let ticket = format!("{sp_name}:{id:032x}");

        let record = TicketRecord {
            puid,
            factors,
            expires_at: self.clock + ttl,
            message: request.text("message"),
        };
        self.tickets.insert(ticket.clone(), record);

        ReplyBody { ttl: Some(ttl), ..ReplyBody::ok(ticket) }
    }

    fn reissue_ticket(&mut self, sp_name: &str, request: &WireRequest) -> Outcome {
        let (original, record) = self.ticket(request)?;
        let reply = self.issue_ticket(sp_name, request, Some((record.puid, record.factors)));
        Ok(ReplyBody { original_ticket: Some(original), ..reply })
    }

    /// Validated ticket and its record.
    ///
    /// Also enforces a requested `auth_type` against the factors the ticket
    /// was authorized with.
    fn ticket(&self, request: &WireRequest) -> Result<(String, TicketRecord), &'static str> {
        let ticket = request.text("ticket").ok_or(INVALID_TICKET_FORMAT)?;
        if !ticket.contains(':') {
            return Err(INVALID_TICKET_FORMAT);
        }

        let record = self
            .tickets
            .get(&ticket)
            .filter(|record| record.expires_at > self.clock)
            .ok_or(TIMED_OUT_TICKET)?;

        if let Some(requested) = request.text("auth_type")
            && !requested.chars().all(|factor| record.factors.contains(factor))
        {
            return Err(LESS_FACTORS);
        }

        Ok((ticket, record.clone()))
    }

    fn puid(&self, request: &WireRequest) -> Outcome {
        let (_, record) = self.ticket(request)?;
        Ok(ReplyBody::ok(record.puid))
    }

    fn read(&mut self, request: &WireRequest) -> Outcome {
        let (_, record) = self.ticket(request)?;
        let container = container_name(request)?;

        if request.flag("lock") {
            let key = LockKey::container(&record.puid, &container);
            self.acquire(key, request.seconds("to").unwrap_or(0))?;
        }

        let data = self
            .containers
            .get(&(record.puid, container))
            .cloned()
            .unwrap_or_else(|| ABSENT.as_bytes().to_vec());
        Ok(ReplyBody::ok(data))
    }

    fn write(&mut self, request: &WireRequest) -> Outcome {
        let (_, record) = self.ticket(request)?;
        let container = container_name(request)?;
        let data = request.param("data").unwrap_or_default().to_vec();

        if request.flag("unlock") {
            self.locks.remove(&LockKey::container(&record.puid, &container));
        }

        self.containers.insert((record.puid, container), data);
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn lock(&mut self, request: &WireRequest) -> Outcome {
        let key = self.ticket_lock(request)?;
        self.acquire(key, request.seconds("to").unwrap_or(0))?;
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn unlock(&mut self, request: &WireRequest) -> Outcome {
        let key = self.ticket_lock(request)?;
        self.release(&key)?;
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn ticket_lock(&self, request: &WireRequest) -> Result<LockKey, &'static str> {
        let (_, record) = self.ticket(request)?;
        let lock_id = request.text("lockid").unwrap_or_default();
        if lock_id.len() > MAX_ID_LEN {
            return Err(INVALID_LOCK_ID);
        }
        Ok(LockKey::Ticket { puid: record.puid, lock_id })
    }

    fn create_pfid(&mut self, request: &WireRequest) -> ReplyBody {
        let id = self.next_id();
        // Leading 0xFF keeps PFIDs out of UTF-8, like the live service's binary ids.
        let mut pfid = vec![0xFF, 0x00];
        pfid.extend_from_slice(&id.to_be_bytes());

        let data = request.param("data").unwrap_or_default().to_vec();
        self.sp_containers.insert(pfid.clone(), data);
        ReplyBody::ok(pfid)
    }

    fn pfid(&self, request: &WireRequest) -> Result<Vec<u8>, &'static str> {
        let pfid = request.param("pfid").ok_or(INVALID_PFID)?;
        if !self.sp_containers.contains_key(pfid) {
            return Err(UNKNOWN_PFID);
        }
        Ok(pfid.to_vec())
    }

    fn remove_pfid(&mut self, request: &WireRequest) -> Outcome {
        let pfid = self.pfid(request)?;
        self.locks.remove(&LockKey::SpContainer(pfid.clone()));
        self.sp_containers.remove(&pfid);
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn read_sp(&mut self, request: &WireRequest) -> Outcome {
        let pfid = self.pfid(request)?;
        if request.flag("lock") {
            self.acquire(LockKey::SpContainer(pfid.clone()), request.seconds("to").unwrap_or(0))?;
        }
        Ok(ReplyBody::ok(self.sp_containers.get(&pfid).cloned().unwrap_or_default()))
    }

    fn write_sp(&mut self, request: &WireRequest) -> Outcome {
        let pfid = self.pfid(request)?;
        if request.flag("unlock") {
            self.locks.remove(&LockKey::SpContainer(pfid.clone()));
        }
        let data = request.param("data").unwrap_or_default().to_vec();
        self.sp_containers.insert(pfid, data);
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn lock_sp(&mut self, request: &WireRequest) -> Outcome {
        let lock_id = request.param("lockid").ok_or(INVALID_LOCK_ID)?.to_vec();
        self.acquire(LockKey::Sp(lock_id), request.seconds("to").unwrap_or(0))?;
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn unlock_sp(&mut self, request: &WireRequest) -> Outcome {
        let lock_id = request.param("lockid").ok_or(INVALID_LOCK_ID)?.to_vec();
        self.release(&LockKey::Sp(lock_id))?;
        Ok(ReplyBody::ok(Vec::new()))
    }

    fn is_live(&self, key: &LockKey) -> bool {
        self.locks.get(key).is_some_and(|deadline| *deadline > self.clock)
    }

    fn acquire(&mut self, key: LockKey, timeout: u64) -> Result<(), &'static str> {
        if self.is_live(&key) {
            return Err(ALREADY_LOCKED);
        }
        self.locks.insert(key, self.clock + timeout);
        Ok(())
    }

    fn release(&mut self, key: &LockKey) -> Result<(), &'static str> {
        let live = self.is_live(key);
        self.locks.remove(key);
        if live { Ok(()) } else { Err(NOT_LOCKED) }
    }
}

fn container_name(request: &WireRequest) -> Result<String, &'static str> {
    let container = request.text("container").unwrap_or_default();
    if container.len() > MAX_ID_LEN {
        return Err(CONTAINER_TOO_LONG);
    }
    Ok(container)
}
