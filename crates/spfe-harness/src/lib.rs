//! Simulation harness for SPFE client testing.
//!
//! [`SimSpfe`] is an in-memory SPFE server behind the client's `Transport`
//! seam. Tests drive the real [`spfe_client::Client`] against it with no
//! network, no certificates and no wall clock: lock and ticket timeouts only
//! elapse when the test calls [`SimSpfe::advance`].
//!
//! ```
//! use spfe_client::{ContainerOptions, GetTicketOptions};
//! use spfe_harness::SimSpfe;
//!
//! let sim = SimSpfe::new();
//! let client = sim.client();
//! let grant = client.get_ticket(&GetTicketOptions::default()).unwrap();
//! client.write_data(&grant.ticket, "hello", &ContainerOptions::default()).unwrap();
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sim_server;
pub mod wire;

pub use sim_server::{ABSENT, DEFAULT_TICKET_TTL, SimConfig, SimSpfe};
pub use wire::{ReplyBody, SIM_HOST, WireRequest};
