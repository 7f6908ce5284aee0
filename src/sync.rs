//! Board sync controller: optimistic local moves plus remote patching.
//!
//! SYSTEM CONTEXT
//! ==============
//! The controller exclusively owns the live board aggregate. Local drags
//! and inbound channel events are the only two mutation paths, and both run
//! synchronously through `&mut self`, so their ordering is simply event
//! arrival order and no locking exists.
//!
//! ERROR HANDLING
//! ==============
//! Remote patches referencing unknown items are logged and skipped; the
//! next full snapshot reconciles. Local drag failures abort before any
//! mutation. Outbound sends are fire-and-forget.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;
use uuid::Uuid;

use events::{Event, EventName};

use crate::drag::{self, CardSlot, DragItem, DragSession, Intent};
use crate::error::{Error, Result};
use crate::model::{Board, Card, List};

/// Channel transport contract, implemented by the realtime glue layer.
///
/// Delivery ordering is guaranteed per handle only. `send` is
/// fire-and-forget; delivery failures stay inside the transport.
pub trait ChannelTransport {
    /// Opaque subscription handle for one board channel.
    type Handle;

    /// Open a channel scoped to `board_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelUnavailable`] when no transport is ready;
    /// the caller retries on a later lifecycle tick.
    fn connect(&mut self, board_id: Uuid) -> Result<Self::Handle>;

    /// Release a subscription.
    fn leave(&mut self, handle: Self::Handle);

    /// Send one event over an open channel.
    fn send(&mut self, handle: &Self::Handle, event: &Event);
}

/// Owns the board aggregate and funnels every mutation through it.
pub struct BoardSyncController<C: ChannelTransport> {
    channel: C,
    handle: Option<C::Handle>,
    board_id: Uuid,
    /// True while the initial snapshot request is in flight.
    fetching: bool,
    board: Option<Board>,
    drag: DragSession,
}

impl<C: ChannelTransport> BoardSyncController<C> {
    #[must_use]
    pub fn new(channel: C, board_id: Uuid) -> Self {
        Self {
            channel,
            handle: None,
            board_id,
            fetching: false,
            board: None,
            drag: DragSession::new(),
        }
    }

    /// Read-only view of the board, once a snapshot has arrived.
    #[must_use]
    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    #[must_use]
    pub fn fetching(&self) -> bool {
        self.fetching
    }

    #[must_use]
    pub fn connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Open the board channel and request the initial snapshot.
    ///
    /// Idempotent: a second call while connected is a no-op, which covers
    /// lifecycle re-checks when the transport was not ready at first render.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelUnavailable`] if the transport has no
    /// channel yet; the controller stays disconnected and a later call
    /// retries.
    pub fn connect(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = self.channel.connect(self.board_id)?;
        self.handle = Some(handle);
        self.fetching = true;
        self.send_event(EventName::BoardFetch, Value::Object(serde_json::Map::new()));
        Ok(())
    }

    /// Release the channel subscription. Safe to call twice: the second
    /// call finds no handle and does nothing.
    pub fn disconnect(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.channel.leave(handle);
        }
    }

    // =========================================================
    // Local drags
    // =========================================================

    /// Start dragging a list or card.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if a drag is already active.
    pub fn begin_drag(&mut self, item: DragItem) -> Result<()> {
        self.drag.begin_drag(item)
    }

    /// Abandon the active drag with no effect.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if no drag is active.
    pub fn cancel_drag(&mut self) -> Result<()> {
        self.drag.cancel()
    }

    /// Drop the dragged card next to `target`, mutating local state
    /// optimistically and sending the resulting intents outbound. Returns
    /// the intents for the store dispatch sink; when the drop lands in an
    /// exhausted position gap the whole list is renumbered and one intent
    /// per renumbered card is emitted instead of a single move.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if no card drag is active,
    /// [`Error::NoBoard`] before the first snapshot, and
    /// [`Error::NotFound`] if the drop references vanished items; local
    /// state is untouched on every error.
    pub fn drop_card(&mut self, target: CardSlot) -> Result<Vec<Intent>> {
        let source = self.dropped_card()?;
        let board = self.board.as_mut().ok_or(Error::NoBoard)?;
        let intent = drag::handle_card_drop(board, source, target)?;
        let intents = rebalanced_card_intents(board, target.list_id, intent);
        self.send_intents(&intents);
        Ok(intents)
    }

    /// Drop the dragged card onto a list with no cards. The card keeps its
    /// current position (any position orders a single-item list).
    ///
    /// # Errors
    ///
    /// Same contract as [`Self::drop_card`].
    pub fn drop_card_on_empty_list(&mut self, target_list_id: Uuid) -> Result<Vec<Intent>> {
        let source = self.dropped_card()?;
        let board = self.board.as_mut().ok_or(Error::NoBoard)?;
        let intent = drag::handle_card_drop_on_empty_list(board, source, target_list_id)?;
        let intents = vec![intent];
        self.send_intents(&intents);
        Ok(intents)
    }

    /// Drop the dragged list next to `target_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTransition`] if no list drag is active,
    /// otherwise same contract as [`Self::drop_card`].
    pub fn drop_list(&mut self, target_id: Uuid) -> Result<Vec<Intent>> {
        let item = self.drag.complete_drop()?;
        let DragItem::List { id: source_id } = item else {
            return Err(Error::InvalidTransition { from: "card", event: "drop_list" });
        };
        let board = self.board.as_mut().ok_or(Error::NoBoard)?;
        let intent = drag::handle_list_drop(board, source_id, target_id)?;
        let intents = if board.lists.is_strictly_increasing() {
            vec![intent]
        } else {
            board
                .lists
                .rebalance()
                .into_iter()
                .map(|(id, position)| Intent::ListMove { id, position })
                .collect()
        };
        self.send_intents(&intents);
        Ok(intents)
    }

    fn dropped_card(&mut self) -> Result<CardSlot> {
        let item = self.drag.complete_drop()?;
        match item {
            DragItem::Card { id, list_id } => Ok(CardSlot { card_id: id, list_id }),
            DragItem::List { .. } => {
                Err(Error::InvalidTransition { from: "list", event: "drop_card" })
            }
        }
    }

    // =========================================================
    // Remote updates
    // =========================================================

    /// Patch local state from an inbound channel event.
    ///
    /// Never fails: an update referencing an item not currently present is
    /// logged and skipped, favoring availability over strict consistency.
    pub fn apply_remote_update(&mut self, event: &Event) {
        match event.name {
            EventName::BoardState => self.apply_snapshot(&event.payload),
            EventName::ListCreated => self.apply_list_created(&event.payload),
            EventName::ListUpdated => self.apply_list_updated(&event.payload),
            EventName::ListDeleted => self.apply_list_deleted(&event.payload),
            EventName::CardCreated => self.apply_card_created(&event.payload),
            EventName::CardUpdated => self.apply_card_updated(&event.payload),
            EventName::CardDeleted => self.apply_card_deleted(&event.payload),
            EventName::PresenceChanged => self.apply_presence(&event.payload),
            // Client-to-server requests; the server echoes state as
            // *:created / *:updated.
            EventName::BoardFetch | EventName::CardMove | EventName::ListMove => {
                log::debug!("ignoring request event {}", event.name.as_str());
            }
        }
    }

    // =========================================================
    // UI-only state
    // =========================================================

    /// Toggle the "add new list" form. No ordering impact.
    pub fn show_form(&mut self, visible: bool) {
        if let Some(board) = self.board.as_mut() {
            board.show_form = visible;
        }
    }

    /// Mark a list as inline-editing, or clear with `None`.
    pub fn edit_list(&mut self, list_id: Option<Uuid>) {
        if let Some(board) = self.board.as_mut() {
            board.editing_list_id = list_id;
        }
    }

    // =========================================================
    // Internals
    // =========================================================

    fn apply_snapshot(&mut self, payload: &Value) {
        match serde_json::from_value::<Board>(payload.clone()) {
            Ok(board) => {
                self.board = Some(board);
                self.fetching = false;
            }
            Err(err) => log::warn!("discarding malformed board snapshot: {err}"),
        }
    }

    fn apply_list_created(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            log::warn!("list created before any snapshot; skipped");
            return;
        };
        match serde_json::from_value::<List>(payload.clone()) {
            Ok(list) if board.lists.contains(list.id) => {
                log::warn!("list {} already present; create skipped", list.id);
            }
            Ok(list) => {
                board.lists.insert_sorted(list);
            }
            Err(err) => log::warn!("discarding malformed list payload: {err}"),
        }
    }

    fn apply_list_updated(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(id) = payload_id(payload) else {
            log::warn!("list update without id; skipped");
            return;
        };
        if !board.lists.contains(id) {
            log::warn!("list update for unknown list {id}; skipped");
            return;
        }

        if let Some(name) = payload.get("name").and_then(Value::as_str) {
            if let Some(list) = board.find_list_mut(id) {
                list.name = name.to_owned();
            }
        }
        if let Some(position) = payload.get("position").and_then(Value::as_f64) {
            // Re-sort; the remote position is authoritative.
            let _ = board.lists.upsert_position(id, position);
        }
    }

    fn apply_list_deleted(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(id) = payload_id(payload) else {
            return;
        };
        if board.lists.remove(id).is_err() {
            log::warn!("delete for unknown list {id}; skipped");
        }
        if board.editing_list_id == Some(id) {
            board.editing_list_id = None;
        }
    }

    fn apply_card_created(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        match serde_json::from_value::<Card>(payload.clone()) {
            Ok(card) => {
                if board.find_card(card.id).is_some() {
                    log::warn!("card {} already present; create skipped", card.id);
                    return;
                }
                match board.find_list_mut(card.list_id) {
                    Some(list) => {
                        list.cards.insert_sorted(card);
                    }
                    None => log::warn!("card created for unknown list {}; skipped", card.list_id),
                }
            }
            Err(err) => log::warn!("discarding malformed card payload: {err}"),
        }
    }

    fn apply_card_updated(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(id) = payload_id(payload) else {
            log::warn!("card update without id; skipped");
            return;
        };
        let Some(current_list_id) = board.list_of_card(id) else {
            log::warn!("card update for unknown card {id}; skipped");
            return;
        };

        let next_list_id = payload
            .get("list_id")
            .and_then(Value::as_str)
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .unwrap_or(current_list_id);
        let position = payload.get("position").and_then(Value::as_f64);

        if next_list_id == current_list_id {
            let Some(list) = board.find_list_mut(current_list_id) else {
                return;
            };
            if let Some(title) = payload.get("title").and_then(Value::as_str) {
                if let Some(card) = list.cards.find_mut(id) {
                    card.title = title.to_owned();
                }
            }
            if let Some(position) = position {
                let _ = list.cards.upsert_position(id, position);
            }
            return;
        }

        // Cross-list move: remove from the current list, patch, re-insert
        // sorted into the new list. Atomic from the caller's view; the
        // card is never in two lists or in none.
        if !board.lists.contains(next_list_id) {
            log::warn!("card {id} moved to unknown list {next_list_id}; skipped");
            return;
        }
        let Some(source) = board.find_list_mut(current_list_id) else {
            return;
        };
        let Ok(mut card) = source.cards.remove(id) else {
            return;
        };
        card.list_id = next_list_id;
        if let Some(position) = position {
            card.position = position;
        }
        if let Some(title) = payload.get("title").and_then(Value::as_str) {
            card.title = title.to_owned();
        }
        if let Some(target) = board.find_list_mut(next_list_id) {
            target.cards.insert_sorted(card);
        }
    }

    fn apply_card_deleted(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(id) = payload_id(payload) else {
            return;
        };
        let Some(list_id) = board.list_of_card(id) else {
            log::warn!("delete for unknown card {id}; skipped");
            return;
        };
        if let Some(list) = board.find_list_mut(list_id) {
            let _ = list.cards.remove(id);
        }
    }

    fn apply_presence(&mut self, payload: &Value) {
        let Some(board) = self.board.as_mut() else {
            return;
        };
        let Some(users) = payload.get("connected_users").and_then(Value::as_array) else {
            log::warn!("presence event without connected_users; skipped");
            return;
        };
        board.connected_users = users
            .iter()
            .filter_map(Value::as_str)
            .filter_map(|raw| Uuid::parse_str(raw).ok())
            .collect();
    }

    fn send_intents(&mut self, intents: &[Intent]) {
        for intent in intents {
            self.send_event(intent.event_name(), intent.payload());
        }
    }

    fn send_event(&mut self, name: EventName, payload: Value) {
        let Some(handle) = self.handle.as_ref() else {
            log::warn!("{} dropped: channel not connected", name.as_str());
            return;
        };
        let event = Event {
            id: Uuid::new_v4().to_string(),
            ts: now_ms(),
            board_id: Some(self.board_id.to_string()),
            from: None,
            name,
            payload,
        };
        self.channel.send(handle, &event);
    }
}

/// Renumber the target list when a card move lands in an exhausted gap,
/// turning the single move intent into one intent per renumbered card.
fn rebalanced_card_intents(board: &mut Board, list_id: Uuid, intent: Intent) -> Vec<Intent> {
    let Some(list) = board.find_list_mut(list_id) else {
        return vec![intent];
    };
    if list.cards.is_strictly_increasing() {
        return vec![intent];
    }
    list.cards
        .rebalance()
        .into_iter()
        .map(|(id, position)| Intent::CardMove { id, list_id, position })
        .collect()
}

fn payload_id(payload: &Value) -> Option<Uuid> {
    payload
        .get("id")
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

#[allow(clippy::cast_possible_truncation)]
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
