//! Drag session state machine and drop reconciliation.
//!
//! DESIGN
//! ======
//! A drag is a tiny state machine: Idle -> Dragging -> Idle, and only a
//! completed drop produces an effect. Reconciliation translates a
//! "source moved next to target" drop into a structural reorder of the
//! affected collections plus a fresh fractional position for the moved
//! item, and returns the persistence intent for the channel. Resolution is
//! fail-closed: every id is resolved before the first mutation, so a drop
//! racing a concurrent remote delete aborts with the board untouched.

#[cfg(test)]
#[path = "drag_test.rs"]
mod drag_test;

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use events::EventName;

use crate::collection::Positioned;
use crate::error::{Error, Result};
use crate::model::Board;
use crate::position;

/// The draggable variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DragItem {
    /// A whole list, reordered against the board.
    List { id: Uuid },
    /// A card, reordered within or across lists.
    Card { id: Uuid, list_id: Uuid },
}

impl DragItem {
    /// Whether this item may be dropped onto `target`. Cards drop onto
    /// cards or onto (empty) lists; lists only drop onto lists.
    #[must_use]
    pub fn can_drop_on(&self, target: &DragItem) -> bool {
        match (self, target) {
            (Self::Card { .. }, _) | (Self::List { .. }, Self::List { .. }) => true,
            (Self::List { .. }, Self::Card { .. }) => false,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::List { .. } => "list",
            Self::Card { .. } => "card",
        }
    }
}

/// Drag lifecycle state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragItem),
}

/// Explicit drag session handed to the rendering layer.
///
/// Drop and cancel outside of a drag, or starting a second drag, are
/// rejected as [`Error::InvalidTransition`] instead of silently producing
/// a bogus reorder.
#[derive(Debug, Default)]
pub struct DragSession {
    state: DragState,
}

impl DragSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self) -> DragState {
        self.state
    }

    /// Start dragging `item`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if a drag is already active.
    pub fn begin_drag(&mut self, item: DragItem) -> Result<()> {
        match self.state {
            DragState::Idle => {
                self.state = DragState::Dragging(item);
                Ok(())
            }
            DragState::Dragging(active) => Err(Error::InvalidTransition {
                from: active.kind(),
                event: "begin_drag",
            }),
        }
    }

    /// Finish the drag with a drop, yielding the dragged item.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if no drag is active.
    pub fn complete_drop(&mut self) -> Result<DragItem> {
        match std::mem::take(&mut self.state) {
            DragState::Dragging(item) => Ok(item),
            DragState::Idle => Err(Error::InvalidTransition { from: "idle", event: "drop" }),
        }
    }

    /// Abandon the drag with no effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if no drag is active.
    pub fn cancel(&mut self) -> Result<()> {
        match self.state {
            DragState::Dragging(_) => {
                self.state = DragState::Idle;
                Ok(())
            }
            DragState::Idle => Err(Error::InvalidTransition { from: "idle", event: "cancel" }),
        }
    }
}

/// A card identified together with its containing list, as delivered by
/// drag gesture events.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardSlot {
    pub card_id: Uuid,
    pub list_id: Uuid,
}

/// A desired persisted change, delivered to the store by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Intent {
    /// Card repositioned, possibly into another list.
    CardMove { id: Uuid, list_id: Uuid, position: f64 },
    /// List repositioned on its board.
    ListMove { id: Uuid, position: f64 },
}

impl Intent {
    /// Channel event name this intent is sent under.
    #[must_use]
    pub fn event_name(&self) -> EventName {
        match self {
            Self::CardMove { .. } => EventName::CardMove,
            Self::ListMove { .. } => EventName::ListMove,
        }
    }

    /// Wire payload for this intent.
    #[must_use]
    pub fn payload(&self) -> Value {
        // Serializing two uuids and a float cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Reconcile a card dropped next to another card.
///
/// The source card is removed from its list and re-inserted at the target
/// card's pre-removal index (same-list moves interpret that index against
/// the list after removal, which lands the card after the target when
/// dragging forward and before it when dragging backward). The card then
/// gets a position allocated strictly between its new neighbors.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if any referenced list or card is absent;
/// the board is left untouched.
pub fn handle_card_drop(board: &mut Board, source: CardSlot, target: CardSlot) -> Result<Intent> {
    let source_list_index = board.lists.index_of(source.list_id)?;
    let target_list_index = board.lists.index_of(target.list_id)?;

    let source_list = board.lists.get(source_list_index).ok_or(Error::NotFound(source.list_id))?;
    source_list.cards.index_of(source.card_id)?;
    let target_list = board.lists.get(target_list_index).ok_or(Error::NotFound(target.list_id))?;
    let target_card_index = target_list.cards.index_of(target.card_id)?;

    let new_index = if source_list_index == target_list_index {
        let list = board
            .lists
            .get_mut(source_list_index)
            .ok_or(Error::NotFound(source.list_id))?;
        list.cards.move_to(source.card_id, target_card_index)?
    } else {
        let (source_list, target_list) = board
            .lists
            .get_pair_mut(source_list_index, target_list_index)
            .ok_or(Error::NotFound(target.list_id))?;
        let index =
            source_list.cards.transfer_to(source.card_id, &mut target_list.cards, target_card_index)?;
        if let Some(card) = target_list.cards.find_mut(source.card_id) {
            card.list_id = target_list.id;
        }
        index
    };

    let list = board
        .lists
        .get_mut(target_list_index)
        .ok_or(Error::NotFound(target.list_id))?;
    let (before, after) = list.cards.neighbors(new_index);
    let new_position =
        position::allocate(before.map(Positioned::position), after.map(Positioned::position));
    if let Some(card) = list.cards.find_mut(source.card_id) {
        card.position = new_position;
    }

    Ok(Intent::CardMove { id: source.card_id, list_id: target.list_id, position: new_position })
}

/// Reconcile a card dropped onto a list with no cards.
///
/// No index resolution and no reallocation: a single-item list is ordered
/// under any position, so the card keeps the one it already carries and the
/// intent echoes it. If the "empty" target raced non-empty, a tail position
/// is allocated instead so ordering never breaks.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if any referenced list or card is absent;
/// the board is left untouched.
pub fn handle_card_drop_on_empty_list(
    board: &mut Board,
    source: CardSlot,
    target_list_id: Uuid,
) -> Result<Intent> {
    let source_list_index = board.lists.index_of(source.list_id)?;
    let target_list_index = board.lists.index_of(target_list_id)?;
    let source_list = board.lists.get(source_list_index).ok_or(Error::NotFound(source.list_id))?;
    let position = source_list
        .cards
        .find(source.card_id)
        .map(Positioned::position)
        .ok_or(Error::NotFound(source.card_id))?;

    if source_list_index == target_list_index {
        // Dropping into the list the card already occupies; nothing moves.
        return Ok(Intent::CardMove { id: source.card_id, list_id: target_list_id, position });
    }

    let (source_list, target_list) = board
        .lists
        .get_pair_mut(source_list_index, target_list_index)
        .ok_or(Error::NotFound(target_list_id))?;
    let mut card = source_list.cards.remove(source.card_id)?;
    card.list_id = target_list_id;
    if !target_list.cards.is_empty() {
        let tail = target_list.cards.get(target_list.cards.len() - 1).map(Positioned::position);
        card.position = position::allocate(tail, None);
    }
    let position = card.position;
    target_list.cards.insert_sorted(card);

    Ok(Intent::CardMove { id: source.card_id, list_id: target_list_id, position })
}

/// Reconcile a list dropped next to another list.
///
/// Mirrors the card flow over the board's list collection, except the
/// target index is resolved against the collection after the source is
/// removed (single collection, no cross-collection move).
///
/// # Errors
///
/// Returns [`Error::NotFound`] if either list is absent; the board is left
/// untouched.
pub fn handle_list_drop(board: &mut Board, source_id: Uuid, target_id: Uuid) -> Result<Intent> {
    let source_index = board.lists.index_of(source_id)?;
    let target_index_before = board.lists.index_of(target_id)?;
    let target_index = if source_index < target_index_before {
        target_index_before - 1
    } else {
        target_index_before
    };

    let new_index = board.lists.move_to(source_id, target_index)?;
    let (before, after) = board.lists.neighbors(new_index);
    let new_position =
        position::allocate(before.map(Positioned::position), after.map(Positioned::position));
    if let Some(list) = board.lists.find_mut(source_id) {
        list.position = new_position;
    }

    Ok(Intent::ListMove { id: source_id, position: new_position })
}
