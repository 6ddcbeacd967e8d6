//! Ticket helpers.
//!
//! A ticket is opaque except for its prefix: everything before the first `:`
//! is the Service Provider name the ticket was issued to.

use crate::errors::{ProtocolError, Result};

/// Service Provider name carried in `ticket`.
///
/// The name is returned exactly as it appears on the wire (it may be
/// percent-encoded, e.g. `SDK%20Test`).
///
/// # Errors
///
/// - `TicketWithoutColon`: `ticket` has no `:`
pub fn service_provider_name(ticket: &str) -> Result<&str> {
    ticket.split_once(':').map(|(name, _)| name).ok_or(ProtocolError::TicketWithoutColon)
}
