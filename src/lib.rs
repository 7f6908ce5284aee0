//! boardsync — ordered-collection reconciliation for a realtime kanban board.
//!
//! SYSTEM CONTEXT
//! ==============
//! A board is lists of cards, ordered by fractional float positions, edited
//! concurrently by several users over a realtime channel. This crate owns
//! the data structure and the algorithm that keep that order consistent: it
//! turns local drag-and-drop gestures into minimal reorders plus position
//! reallocations, emits the matching persistence intents, and patches the
//! same structures from inbound channel events. Transport, auth, and
//! rendering live outside, behind the [`sync::ChannelTransport`] seam and
//! the wire model in the `events` crate.

pub mod collection;
pub mod drag;
pub mod error;
pub mod model;
pub mod position;
pub mod sync;

pub use collection::{OrderedCollection, Positioned};
pub use drag::{
    CardSlot, DragItem, DragSession, DragState, Intent, handle_card_drop,
    handle_card_drop_on_empty_list, handle_list_drop,
};
pub use error::{Error, Result};
pub use model::{Board, BoardUser, Card, List};
pub use sync::{BoardSyncController, ChannelTransport};
