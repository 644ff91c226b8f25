//! Property tests for the entity index
//!
//! Drives random edit sequences against an `EntityCollection` and checks
//! that the structural invariants hold after every operation: static
//! entities precede dynamic entities on every layer, order values are the
//! dense range `0..len`, and cached indices agree with positions.

use proptest::prelude::*;
use quest_map_core::{EntityCollection, EntityIndex, EntityKind, MapEntity};

#[derive(Debug, Clone)]
enum Op {
    Add { layer: i32, dynamic: bool },
    Remove { pick: usize },
    Reorder { pick: usize, slot_pick: usize },
    SetLayer { pick: usize, layer: i32 },
    BringToFront { pick: usize },
    BringToBack { pick: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..3i32, any::<bool>()).prop_map(|(layer, dynamic)| Op::Add { layer, dynamic }),
        (0..64usize).prop_map(|pick| Op::Remove { pick }),
        (0..64usize, 0..64usize)
            .prop_map(|(pick, slot_pick)| Op::Reorder { pick, slot_pick }),
        (0..64usize, 0..3i32).prop_map(|(pick, layer)| Op::SetLayer { pick, layer }),
        (0..64usize).prop_map(|pick| Op::BringToFront { pick }),
        (0..64usize).prop_map(|pick| Op::BringToBack { pick }),
    ]
}

/// Index of the pick-th attached entity, wrapping around
fn nth_index(map: &EntityCollection, pick: usize) -> Option<EntityIndex> {
    let len = map.len();
    if len == 0 {
        return None;
    }
    map.iter().nth(pick % len).and_then(|entity| entity.index())
}

fn apply(map: &mut EntityCollection, op: &Op) {
    match op {
        Op::Add { layer, dynamic } => {
            let kind = if *dynamic {
                EntityKind::Npc
            } else {
                EntityKind::Tile
            };
            let entity = MapEntity::new(kind, *layer, 0, 0);
            let order = if *dynamic {
                map.num_entities(*layer)
            } else {
                map.num_static_entities(*layer)
            };
            map.add_entities(vec![(entity, EntityIndex::new(*layer, order))]);
        }
        Op::Remove { pick } => {
            if let Some(index) = nth_index(map, *pick) {
                map.remove_entities(vec![index]);
            }
        }
        Op::Reorder { pick, slot_pick } => {
            if let Some(index) = nth_index(map, *pick) {
                let dynamic = map.get_entity(index).unwrap().is_dynamic();
                let num_static = map.num_static_entities(index.layer);
                let num_entities = map.num_entities(index.layer);
                // The picked entity guarantees its own sub-range is non-empty
                let new_order = if dynamic {
                    num_static + slot_pick % (num_entities - num_static)
                } else {
                    slot_pick % num_static
                };
                map.set_entity_order(index, new_order);
            }
        }
        Op::SetLayer { pick, layer } => {
            if let Some(index) = nth_index(map, *pick) {
                map.set_entity_layer(index, *layer);
            }
        }
        Op::BringToFront { pick } => {
            if let Some(index) = nth_index(map, *pick) {
                map.bring_to_front(index);
            }
        }
        Op::BringToBack { pick } => {
            if let Some(index) = nth_index(map, *pick) {
                map.bring_to_back(index);
            }
        }
    }
}

fn assert_invariants(map: &EntityCollection) {
    for layer in map.min_layer()..=map.max_layer() {
        let num_entities = map.num_entities(layer);
        let num_static = map.num_static_entities(layer);
        for order in 0..num_entities {
            let index = EntityIndex::new(layer, order);
            let entity = map.get_entity(index).expect("orders are dense");
            // Cached index agrees with the actual position
            assert_eq!(entity.index(), Some(index));
            assert_eq!(entity.layer, layer);
            // Static prefix, dynamic suffix
            assert_eq!(entity.is_dynamic(), order >= num_static);
        }
        assert!(map.get_entity(EntityIndex::new(layer, num_entities)).is_none());
    }
}

proptest! {
    #[test]
    fn invariants_hold_after_random_edits(
        ops in proptest::collection::vec(op_strategy(), 0..60),
    ) {
        let mut map = EntityCollection::new(0, 2);
        for op in &ops {
            apply(&mut map, op);
            assert_invariants(&map);
        }
    }

    #[test]
    fn remove_then_replay_restores_the_collection(
        ops in proptest::collection::vec(op_strategy(), 0..40),
        picks in proptest::collection::vec(0..64usize, 1..8),
    ) {
        let mut map = EntityCollection::new(0, 2);
        for op in &ops {
            apply(&mut map, op);
        }

        let before: Vec<MapEntity> = map.iter().cloned().collect();
        let mut indexes: Vec<EntityIndex> =
            picks.iter().filter_map(|pick| nth_index(&map, *pick)).collect();
        indexes.sort_unstable();
        indexes.dedup();
        if !indexes.is_empty() {
            let removed = map.remove_entities(indexes);
            map.add_entities(removed);
            let after: Vec<MapEntity> = map.iter().cloned().collect();
            prop_assert_eq!(before, after);
        }
    }
}
