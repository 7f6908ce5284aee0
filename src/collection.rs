//! Position-ordered collections.
//!
//! DESIGN
//! ======
//! An `OrderedCollection` keeps its items sorted by ascending `position` and
//! is the only structure drag reconciliation and remote patches mutate.
//! Same-instance moves go through [`OrderedCollection::move_to`] so the
//! remove and the insert happen against one borrow; computing the insertion
//! index against a collection that still contains the moved item is exactly
//! the index-drift bug this seam prevents.

#[cfg(test)]
#[path = "collection_test.rs"]
mod collection_test;

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::position::BASE_GAP;

/// An item that participates in positional ordering.
pub trait Positioned {
    /// Stable identifier of the item.
    fn id(&self) -> Uuid;
    /// Current fractional position.
    fn position(&self) -> f64;
    /// Overwrite the fractional position.
    fn set_position(&mut self, position: f64);
}

/// A sequence of items kept sorted by ascending `position`.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderedCollection<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedCollection<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Positioned> OrderedCollection<T> {
    /// Empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from items in arbitrary order; server order is
    /// not trusted, items are re-sorted by position.
    #[must_use]
    pub fn from_unsorted(mut items: Vec<T>) -> Self {
        items.sort_by(|a, b| a.position().total_cmp(&b.position()));
        Self { items }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    #[must_use]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Item with the given id, if present.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Mutable item with the given id, if present.
    #[must_use]
    pub fn find_mut(&mut self, id: Uuid) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|item| item.id() == id)
    }

    /// Display index of the item with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn index_of(&self, id: Uuid) -> Result<usize> {
        self.items
            .iter()
            .position(|item| item.id() == id)
            .ok_or(Error::NotFound(id))
    }

    /// Remove and return the item with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn remove(&mut self, id: Uuid) -> Result<T> {
        let index = self.index_of(id)?;
        Ok(self.items.remove(index))
    }

    /// Insert `item` at `index` without touching any other item. Indices
    /// past the end clamp to a tail insert.
    pub fn insert_at(&mut self, index: usize, item: T) -> usize {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
        index
    }

    /// Insert `item` at the index its position sorts to.
    pub fn insert_sorted(&mut self, item: T) -> usize {
        let index = self
            .items
            .partition_point(|existing| existing.position() <= item.position());
        self.items.insert(index, item);
        index
    }

    /// Mutable access to two distinct items at once, for moving a child
    /// between two containers held in the same collection.
    #[must_use]
    pub fn get_pair_mut(&mut self, first: usize, second: usize) -> Option<(&mut T, &mut T)> {
        if first == second || first >= self.items.len() || second >= self.items.len() {
            return None;
        }
        if first < second {
            let (left, right) = self.items.split_at_mut(second);
            Some((&mut left[first], &mut right[0]))
        } else {
            let (left, right) = self.items.split_at_mut(first);
            Some((&mut right[0], &mut left[second]))
        }
    }

    /// The items immediately before and after `index`, or `None` at either
    /// boundary.
    #[must_use]
    pub fn neighbors(&self, index: usize) -> (Option<&T>, Option<&T>) {
        let before = index.checked_sub(1).and_then(|i| self.items.get(i));
        let after = self.items.get(index + 1);
        (before, after)
    }

    /// Move the item with `id` to `target_index` within this collection.
    /// The target index is interpreted against the collection *after* the
    /// item is removed. Returns the final index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent; the collection is
    /// left untouched.
    pub fn move_to(&mut self, id: Uuid, target_index: usize) -> Result<usize> {
        let item = self.remove(id)?;
        Ok(self.insert_at(target_index, item))
    }

    /// Move the item with `id` out of this collection and into `target` at
    /// `target_index`. Returns the final index in `target`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent; neither collection
    /// is touched.
    pub fn transfer_to(&mut self, id: Uuid, target: &mut Self, target_index: usize) -> Result<usize> {
        let item = self.remove(id)?;
        Ok(target.insert_at(target_index, item))
    }

    /// Reposition the item with `id` and re-sort it into place. Used by
    /// remote patches, where the new position is authoritative.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the id is absent.
    pub fn upsert_position(&mut self, id: Uuid, position: f64) -> Result<usize> {
        let mut item = self.remove(id)?;
        item.set_position(position);
        Ok(self.insert_sorted(item))
    }

    /// True when positions are strictly increasing in display order, the
    /// ordering invariant every mutation must uphold.
    #[must_use]
    pub fn is_strictly_increasing(&self) -> bool {
        self.items
            .windows(2)
            .all(|pair| pair[0].position() < pair[1].position())
    }

    /// Renumber every item to consecutive multiples of the base gap,
    /// restoring headroom after fractional positions converge. Returns the
    /// new `(id, position)` pairs so callers can persist them.
    pub fn rebalance(&mut self) -> Vec<(Uuid, f64)> {
        self.items
            .iter_mut()
            .enumerate()
            .map(|(index, item)| {
                #[allow(clippy::cast_precision_loss)]
                let position = (index as f64 + 1.0) * BASE_GAP;
                item.set_position(position);
                (item.id(), position)
            })
            .collect()
    }
}

impl<'a, T> IntoIterator for &'a OrderedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: Serialize> Serialize for OrderedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de> + Positioned> Deserialize<'de> for OrderedCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Self::from_unsorted)
    }
}
