use super::*;

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Item {
    id: Uuid,
    position: f64,
}

impl Positioned for Item {
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

fn item(position: f64) -> Item {
    Item { id: Uuid::new_v4(), position }
}

fn collection(positions: &[f64]) -> OrderedCollection<Item> {
    OrderedCollection::from_unsorted(positions.iter().map(|p| item(*p)).collect())
}

fn positions(collection: &OrderedCollection<Item>) -> Vec<f64> {
    collection.iter().map(Positioned::position).collect()
}

// =============================================================
// Construction and lookup
// =============================================================

#[test]
fn from_unsorted_sorts_by_position() {
    let c = collection(&[3072.0, 1024.0, 2048.0]);
    assert_eq!(positions(&c), vec![1024.0, 2048.0, 3072.0]);
    assert!(c.is_strictly_increasing());
}

#[test]
fn index_of_returns_display_index() {
    let c = collection(&[1024.0, 2048.0]);
    let second = c.get(1).expect("item").id();
    assert_eq!(c.index_of(second).expect("index"), 1);
}

#[test]
fn index_of_fails_for_unknown_id() {
    let c = collection(&[1024.0]);
    let missing = Uuid::new_v4();
    let err = c.index_of(missing).expect_err("id should be unknown");
    assert!(matches!(err, Error::NotFound(id) if id == missing));
}

#[test]
fn remove_returns_the_item_and_shrinks_the_collection() {
    let mut c = collection(&[1024.0, 2048.0]);
    let first = c.get(0).expect("item").id();
    let removed = c.remove(first).expect("remove");
    assert_eq!(removed.id, first);
    assert_eq!(c.len(), 1);
    assert!(!c.contains(first));
}

#[test]
fn remove_fails_for_unknown_id_without_mutation() {
    let mut c = collection(&[1024.0, 2048.0]);
    let before = positions(&c);
    assert!(c.remove(Uuid::new_v4()).is_err());
    assert_eq!(positions(&c), before);
}

#[test]
fn neighbors_at_boundaries_are_none() {
    let c = collection(&[1024.0, 2048.0, 3072.0]);
    let (before, after) = c.neighbors(0);
    assert!(before.is_none());
    assert_eq!(after.map(Positioned::position), Some(2048.0));

    let (before, after) = c.neighbors(2);
    assert_eq!(before.map(Positioned::position), Some(2048.0));
    assert!(after.is_none());
}

#[test]
fn neighbors_in_the_middle_are_both_present() {
    let c = collection(&[1024.0, 2048.0, 3072.0]);
    let (before, after) = c.neighbors(1);
    assert_eq!(before.map(Positioned::position), Some(1024.0));
    assert_eq!(after.map(Positioned::position), Some(3072.0));
}

// =============================================================
// Moves
// =============================================================

#[test]
fn move_to_lands_at_the_requested_index() {
    // P3: moving X to index i, then index_of(X), returns i.
    let mut c = collection(&[1024.0, 2048.0, 3072.0, 4096.0]);
    let last = c.get(3).expect("item").id();
    for target in 0..3 {
        let landed = c.move_to(last, target).expect("move");
        assert_eq!(landed, target);
        assert_eq!(c.index_of(last).expect("index"), target);
    }
}

#[test]
fn move_to_does_not_touch_sibling_positions() {
    // P2: a move changes the position of at most the moved item, and a
    // bare structural move changes none at all.
    let mut c = collection(&[1024.0, 2048.0, 3072.0]);
    let ids: Vec<Uuid> = c.iter().map(Positioned::id).collect();
    c.move_to(ids[2], 0).expect("move");
    for (id, expected) in ids.iter().zip([1024.0, 2048.0, 3072.0]) {
        assert!((c.find(*id).expect("item").position - expected).abs() < f64::EPSILON);
    }
}

#[test]
fn transfer_to_moves_exactly_one_copy_across() {
    // P4: after the transfer the item is in the target exactly once and
    // gone from the source.
    let mut source = collection(&[1024.0, 2048.0]);
    let mut target = collection(&[512.0]);
    let moved = source.get(0).expect("item").id();

    let landed = source.transfer_to(moved, &mut target, 1).expect("transfer");
    assert_eq!(landed, 1);
    assert!(!source.contains(moved));
    assert_eq!(target.iter().filter(|i| i.id == moved).count(), 1);
    assert_eq!(source.len(), 1);
    assert_eq!(target.len(), 2);
}

#[test]
fn transfer_to_fails_closed_for_unknown_id() {
    let mut source = collection(&[1024.0]);
    let mut target = collection(&[512.0]);
    assert!(source.transfer_to(Uuid::new_v4(), &mut target, 0).is_err());
    assert_eq!(source.len(), 1);
    assert_eq!(target.len(), 1);
}

#[test]
fn insert_at_clamps_past_the_end() {
    let mut c = collection(&[1024.0]);
    let index = c.insert_at(99, item(2048.0));
    assert_eq!(index, 1);
    assert_eq!(c.len(), 2);
}

// =============================================================
// Sorted insertion and remote repositioning
// =============================================================

#[test]
fn insert_sorted_lands_by_position() {
    let mut c = collection(&[1024.0, 3072.0]);
    let index = c.insert_sorted(item(2048.0));
    assert_eq!(index, 1);
    assert_eq!(positions(&c), vec![1024.0, 2048.0, 3072.0]);
}

#[test]
fn upsert_position_resorts_the_item() {
    let mut c = collection(&[1024.0, 2048.0, 3072.0]);
    let first = c.get(0).expect("item").id();
    let index = c.upsert_position(first, 2560.0).expect("upsert");
    assert_eq!(index, 1);
    assert_eq!(positions(&c), vec![2048.0, 2560.0, 3072.0]);
    assert!(c.is_strictly_increasing());
}

#[test]
fn random_walk_of_moves_preserves_strict_ordering() {
    // P1: after every reposition the collection is strictly increasing.
    let mut c = collection(&[1024.0, 2048.0, 3072.0, 4096.0, 5120.0]);
    let ids: Vec<Uuid> = c.iter().map(Positioned::id).collect();
    let walk = [(0usize, 4usize), (3, 0), (2, 2), (1, 3), (4, 1), (0, 2)];

    for (source, target) in walk {
        let index = c.move_to(ids[source], target).expect("move");
        let (before, after) = c.neighbors(index);
        let position = crate::position::allocate(
            before.map(Positioned::position),
            after.map(Positioned::position),
        );
        c.find_mut(ids[source]).expect("item").set_position(position);
        assert!(c.is_strictly_increasing(), "violated after {source}->{target}");
    }
}

// =============================================================
// Rebalance
// =============================================================

#[test]
fn rebalance_renumbers_to_base_gap_multiples() {
    let mut c = collection(&[0.25, 0.5, 0.75]);
    let pairs = c.rebalance();
    assert_eq!(positions(&c), vec![1024.0, 2048.0, 3072.0]);
    assert_eq!(pairs.len(), 3);
    for (pair, item) in pairs.iter().zip(c.iter()) {
        assert_eq!(pair.0, item.id);
        assert!((pair.1 - item.position).abs() < f64::EPSILON);
    }
}

#[test]
fn rebalance_preserves_display_order() {
    let mut c = collection(&[1.0, 1.0 + f64::EPSILON, 2.0]);
    let order: Vec<Uuid> = c.iter().map(Positioned::id).collect();
    c.rebalance();
    let after: Vec<Uuid> = c.iter().map(Positioned::id).collect();
    assert_eq!(order, after);
    assert!(c.is_strictly_increasing());
}

// =============================================================
// Serde
// =============================================================

#[test]
fn deserializing_an_array_resorts_by_position() {
    let json = serde_json::json!([
        {"id": Uuid::new_v4(), "position": 3072.0},
        {"id": Uuid::new_v4(), "position": 1024.0},
    ]);
    let c: OrderedCollection<Item> = serde_json::from_value(json).expect("deserialize");
    assert_eq!(positions(&c), vec![1024.0, 3072.0]);
}

#[test]
fn serializes_as_a_plain_array() {
    let c = collection(&[1024.0]);
    let value = serde_json::to_value(&c).expect("serialize");
    assert!(value.is_array());
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}
