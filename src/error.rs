//! Error taxonomy for the board core.
//!
//! ERROR HANDLING
//! ==============
//! Nothing here is surfaced to an end user. Drag resolution failures abort
//! the single operation with no partial mutation; remote-patch failures are
//! logged and skipped in favor of availability; a missing transport defers
//! connection until one is available.

use uuid::Uuid;

/// Errors produced by the board core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Referenced item id is absent from the expected collection.
    #[error("item not found: {0}")]
    NotFound(Uuid),
    /// A drag event arrived in a state that cannot accept it.
    #[error("invalid drag transition: {event} while {from}")]
    InvalidTransition {
        /// State the session was in when the event arrived.
        from: &'static str,
        /// The offending event.
        event: &'static str,
    },
    /// A connection was attempted with no transport available.
    #[error("channel unavailable")]
    ChannelUnavailable,
    /// An operation needed the board aggregate before any snapshot arrived.
    #[error("no board loaded")]
    NoBoard,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;
