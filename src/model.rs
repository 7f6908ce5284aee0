//! Board aggregate: lists, cards, and users.
//!
//! SYSTEM CONTEXT
//! ==============
//! These types are the local projection of one joined board. They are
//! created from server payloads (snapshot or channel events), mutated in
//! place by drag reconciliation and remote patches, and discarded when the
//! view unmounts. Order among lists, and among cards within a list, is
//! defined solely by ascending `position`.

#[cfg(test)]
#[path = "model_test.rs"]
mod model_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collection::{OrderedCollection, Positioned};

/// A card inside a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: Uuid,
    /// Owning list. A card belongs to exactly one list at a time.
    pub list_id: Uuid,
    pub position: f64,
    pub title: String,
}

impl Positioned for Card {
    fn id(&self) -> Uuid {
        self.id
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }
}

/// A list of cards on a board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct List {
    pub id: Uuid,
    /// Back-reference to the owning board.
    pub board_id: Uuid,
    pub position: f64,
    pub name: String,
    #[serde(default)]
    pub cards: OrderedCollection<Card>,
}

impl Positioned for List {
    fn id(&self) -> Uuid {
        self.id
    }

    fn position(&self) -> f64 {
        self.position
    }

    fn set_position(&mut self, position: f64) {
        self.position = position;
    }
}

/// A user invited to a board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardUser {
    pub id: Uuid,
    pub name: String,
}

/// The board aggregate plus transient UI flags.
///
/// Serde skips the UI flags: they never come from or go to the server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub lists: OrderedCollection<List>,
    /// Users invited to this board.
    #[serde(default)]
    pub invited_users: Vec<BoardUser>,
    /// Ids of users currently connected, from presence events.
    #[serde(default)]
    pub connected_users: HashSet<Uuid>,
    /// Whether the "add new list" form is visible.
    #[serde(skip)]
    pub show_form: bool,
    /// List currently in inline-edit mode, if any.
    #[serde(skip)]
    pub editing_list_id: Option<Uuid>,
    /// Last tolerated inconsistency, for UI display.
    #[serde(skip)]
    pub error: Option<String>,
}

impl Board {
    #[must_use]
    pub fn find_list(&self, id: Uuid) -> Option<&List> {
        self.lists.find(id)
    }

    #[must_use]
    pub fn find_list_mut(&mut self, id: Uuid) -> Option<&mut List> {
        self.lists.find_mut(id)
    }

    /// Id of the list currently containing `card_id`, if any.
    #[must_use]
    pub fn list_of_card(&self, card_id: Uuid) -> Option<Uuid> {
        self.lists
            .iter()
            .find(|list| list.cards.contains(card_id))
            .map(|list| list.id)
    }

    /// The card with `card_id`, wherever it currently lives.
    #[must_use]
    pub fn find_card(&self, card_id: Uuid) -> Option<&Card> {
        self.lists.iter().find_map(|list| list.cards.find(card_id))
    }
}
