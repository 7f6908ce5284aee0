//! Fractional position allocation.
//!
//! Items carry a float `position`; display order is ascending position.
//! Inserting between two neighbors takes their midpoint, so a move never
//! renumbers siblings. Repeated splits shrink the gap geometrically until
//! no float strictly between the neighbors exists; [`gap_exhausted`]
//! detects that point so callers can renumber the whole collection (see
//! `OrderedCollection::rebalance`).

#[cfg(test)]
#[path = "position_test.rs"]
mod position_test;

/// Default spacing between consecutive positions.
pub const BASE_GAP: f64 = 1024.0;

/// Compute a position for an item inserted between two neighbors.
///
/// `None` marks a missing neighbor: both absent means the collection was
/// empty, a missing preceding neighbor is a head insert, a missing
/// following neighbor is a tail insert.
#[must_use]
pub fn allocate(preceding: Option<f64>, following: Option<f64>) -> f64 {
    match (preceding, following) {
        (None, None) => BASE_GAP,
        (None, Some(next)) => next / 2.0,
        (Some(prev), None) => prev + BASE_GAP,
        (Some(prev), Some(next)) => (prev + next) / 2.0,
    }
}

/// True when [`allocate`] can no longer produce a position strictly inside
/// the slot described by the two neighbors.
#[must_use]
pub fn gap_exhausted(preceding: Option<f64>, following: Option<f64>) -> bool {
    match (preceding, following) {
        (None, None) => false,
        (None, Some(next)) => {
            let head = next / 2.0;
            !(head < next)
        }
        (Some(prev), None) => {
            let tail = prev + BASE_GAP;
            !(tail > prev)
        }
        (Some(prev), Some(next)) => {
            let mid = (prev + next) / 2.0;
            !(mid > prev && mid < next)
        }
    }
}
