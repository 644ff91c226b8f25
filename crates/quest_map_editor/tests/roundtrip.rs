//! Round-trip properties of the command set
//!
//! Every command must restore the collection exactly on undo: same
//! entities, same names, same properties, same cached indices.

use proptest::prelude::*;
use quest_map_core::{EntityCollection, EntityIndex, EntityKind, MapEntity};
use quest_map_editor::{CommandHistory, EditCommand};
use uuid::Uuid;

fn snapshot(map: &EntityCollection) -> Vec<MapEntity> {
    map.iter().cloned().collect()
}

fn place(map: &mut EntityCollection, history: &mut CommandHistory, entity: MapEntity) -> Uuid {
    let id = entity.id;
    let command = EditCommand::add_entities_at_back(map, vec![entity]).unwrap();
    history.execute(command, map);
    id
}

/// Execute, undo, redo, undo; the collection must round-trip exactly
fn assert_round_trip(
    map: &mut EntityCollection,
    history: &mut CommandHistory,
    command: EditCommand,
) {
    let before = snapshot(map);
    history.execute(command, map);
    let after = snapshot(map);
    assert_ne!(before, after, "command should change the collection");

    history.undo(map);
    assert_eq!(snapshot(map), before, "undo must restore the exact state");
    history.redo(map);
    assert_eq!(snapshot(map), after, "redo must reproduce the exact state");
    history.undo(map);
    assert_eq!(snapshot(map), before);
}

struct Fixture {
    map: EntityCollection,
    history: CommandHistory,
    tile_a: Uuid,
    tile_b: Uuid,
    guard: Uuid,
    sentry: Uuid,
    chest: Uuid,
    start: Uuid,
    cave: Uuid,
}

fn fixture() -> Fixture {
    let mut map = EntityCollection::new(0, 2);
    let mut history = CommandHistory::new();
    let tile_a = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Tile, 0, 0, 0).with_name("ground"),
    );
    let tile_b = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Tile, 0, 8, 0),
    );
    let guard = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Npc, 0, 32, 32).with_name("guard"),
    );
    let sentry = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Npc, 0, 64, 32).with_name("sentry"),
    );
    let chest = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Chest, 1, 96, 96).with_name("chest"),
    );
    let start = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Destination, 0, 16, 16)
            .with_name("start")
            .with_property("default", true),
    );
    let cave = place(
        &mut map,
        &mut history,
        MapEntity::new(EntityKind::Destination, 1, 48, 48).with_name("cave"),
    );
    Fixture {
        map,
        history,
        tile_a,
        tile_b,
        guard,
        sentry,
        chest,
        start,
        cave,
    }
}

#[test]
fn test_add_round_trips_including_dedup() {
    let mut f = fixture();
    // Colliding name: the engine assigns guard_2 on attach
    let entity = MapEntity::new(EntityKind::Npc, 0, 0, 0).with_name("guard");
    let command = EditCommand::add_entities_at_back(&f.map, vec![entity]).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
    assert!(f.map.find_by_name("guard_2").is_none());
}

#[test]
fn test_remove_round_trips() {
    let mut f = fixture();
    let indexes = vec![
        f.map.find_entity(f.tile_a).unwrap(),
        f.map.find_entity(f.guard).unwrap(),
    ];
    let command = EditCommand::remove_entities(&f.map, indexes).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_move_round_trips() {
    let mut f = fixture();
    let command =
        EditCommand::move_entities(&f.map, vec![f.guard, f.sentry], 8, -16, false).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_resize_round_trips() {
    let mut f = fixture();
    let command =
        EditCommand::resize_entities(&f.map, vec![(f.tile_a, (0, 0, 16, 24))], false).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_reorder_round_trips() {
    let mut f = fixture();
    let command = EditCommand::bring_to_front(&f.map, vec![f.tile_a]).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);

    let command = EditCommand::bring_to_back(&f.map, vec![f.sentry]).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);

    let order = f.map.find_entity(f.sentry).unwrap().order;
    let command = EditCommand::set_entity_order(&f.map, f.guard, order).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_layer_change_round_trips() {
    let mut f = fixture();
    let command = EditCommand::set_entity_layer(&f.map, f.guard, 2).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);

    let command =
        EditCommand::increment_entities_layer(&f.map, vec![f.tile_a, f.guard, f.chest]).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);

    let command = EditCommand::decrement_entities_layer(&f.map, vec![f.chest, f.cave]).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_convert_round_trips_and_keeps_original_objects() {
    let mut f = fixture();
    let before = snapshot(&f.map);
    let command = EditCommand::convert_tiles(&f.map, vec![f.tile_a, f.tile_b], true).unwrap();
    f.history.execute(command, &mut f.map);

    // Originals are gone, replacements are dynamic tiles
    assert!(f.map.find_entity(f.tile_a).is_none());
    let ground = f.map.find_by_name("ground").unwrap();
    assert_eq!(
        f.map.get_entity(ground).unwrap().kind,
        EntityKind::DynamicTile
    );

    // Undo restores the original objects verbatim, ids included
    f.history.undo(&mut f.map);
    assert_eq!(snapshot(&f.map), before);
    assert!(f.map.find_entity(f.tile_a).is_some());

    let after_redo = {
        f.history.redo(&mut f.map);
        snapshot(&f.map)
    };
    f.history.undo(&mut f.map);
    assert_eq!(snapshot(&f.map), before);
    f.history.redo(&mut f.map);
    // Redo cycles reinsert the same replacement objects
    assert_eq!(snapshot(&f.map), after_redo);
}

#[test]
fn test_rename_round_trips() {
    let mut f = fixture();
    let command =
        EditCommand::rename_entity(&f.map, f.chest, Some("treasure".to_string())).unwrap();
    assert_round_trip(&mut f.map, &mut f.history, command);
}

#[test]
fn test_merged_moves_undo_to_before_the_first() {
    let mut f = fixture();
    let x0 = f.map.get_entity(f.map.find_entity(f.guard).unwrap()).unwrap().x;

    let command = EditCommand::move_entities(&f.map, vec![f.guard], 3, 0, false).unwrap();
    f.history.execute(command, &mut f.map);
    let command = EditCommand::move_entities(&f.map, vec![f.guard], 2, 0, true).unwrap();
    f.history.execute(command, &mut f.map);

    let index = f.map.find_entity(f.guard).unwrap();
    assert_eq!(f.map.get_entity(index).unwrap().x, x0 + 5);

    // One undo steps over both merged moves
    f.history.undo(&mut f.map);
    let index = f.map.find_entity(f.guard).unwrap();
    assert_eq!(f.map.get_entity(index).unwrap().x, x0);

    f.history.redo(&mut f.map);
    let index = f.map.find_entity(f.guard).unwrap();
    assert_eq!(f.map.get_entity(index).unwrap().x, x0 + 5);
}

#[test]
fn test_name_dedup_assigns_first_free_suffix() {
    let mut map = EntityCollection::new(0, 2);
    let mut history = CommandHistory::new();

    place(&mut map, &mut history, MapEntity::new(EntityKind::Door, 0, 0, 0).with_name("door"));
    place(&mut map, &mut history, MapEntity::new(EntityKind::Door, 0, 16, 0).with_name("door"));
    place(&mut map, &mut history, MapEntity::new(EntityKind::Door, 0, 32, 0).with_name("door"));
    assert!(map.find_by_name("door_2").is_some());
    assert!(map.find_by_name("door_3").is_some());

    let door_2 = map.find_by_name("door_2").unwrap();
    let command = EditCommand::remove_entities(&map, vec![door_2]).unwrap();
    history.execute(command, &mut map);

    // The freed suffix is the first candidate again
    place(&mut map, &mut history, MapEntity::new(EntityKind::Door, 0, 48, 0).with_name("door"));
    assert!(map.find_by_name("door_2").is_some());
}

#[test]
fn test_cross_layer_move_restores_sibling_order() {
    let mut map = EntityCollection::new(0, 2);
    let mut history = CommandHistory::new();
    for name in ["a", "b", "c"] {
        place(&mut map, &mut history, MapEntity::new(EntityKind::Tile, 0, 0, 0).with_name(name));
    }
    let names = |map: &EntityCollection| -> Vec<String> {
        map.iter().map(|e| e.name.clone().unwrap()).collect()
    };
    let b_index = map.find_by_name("b").unwrap();
    assert_eq!(b_index, EntityIndex::new(0, 1));
    let b = map.get_entity(b_index).unwrap().id;

    let command = EditCommand::set_entity_layer(&map, b, 1).unwrap();
    history.execute(command, &mut map);
    let command = EditCommand::set_entity_layer(&map, b, 0).unwrap();
    history.execute(command, &mut map);
    // Coming back appends to the end of the static prefix
    assert_eq!(names(&map), vec!["a", "c", "b"]);

    history.undo(&mut map);
    history.undo(&mut map);
    assert_eq!(names(&map), vec!["a", "b", "c"]);
}

#[test]
fn test_default_destination_round_trip() {
    let mut f = fixture();
    let start_index = f.map.find_entity(f.start).unwrap();
    assert_eq!(f.map.default_destination(), Some(start_index));

    // Attaching another flagged destination demotes the newcomer
    let rival = MapEntity::new(EntityKind::Destination, 2, 0, 0)
        .with_name("rival")
        .with_property("default", true);
    let rival_id = rival.id;
    place(&mut f.map, &mut f.history, rival);
    let rival_index = f.map.find_entity(rival_id).unwrap();
    assert!(!f.map.get_entity(rival_index).unwrap().is_default_destination());
    assert_eq!(f.map.default_destination(), Some(f.map.find_entity(f.start).unwrap()));

    // Moving the flag by command, then undoing, restores the prior holder
    let command = EditCommand::set_default_destination(&f.map, f.cave).unwrap();
    f.history.execute(command, &mut f.map);
    assert_eq!(f.map.default_destination(), Some(f.map.find_entity(f.cave).unwrap()));

    f.history.undo(&mut f.map);
    assert_eq!(f.map.default_destination(), Some(f.map.find_entity(f.start).unwrap()));
    let cave_index = f.map.find_entity(f.cave).unwrap();
    assert!(!f.map.get_entity(cave_index).unwrap().is_default_destination());
}

#[derive(Debug, Clone)]
enum EditOp {
    Place { layer: i32, dynamic: bool, name_pick: usize },
    Delete { pick: usize },
    Move { pick: usize, dx: i32, dy: i32 },
    Front { pick: usize },
    Back { pick: usize },
    Layer { pick: usize, layer: i32 },
}

fn edit_op_strategy() -> impl Strategy<Value = EditOp> {
    prop_oneof![
        (0..3i32, any::<bool>(), 0..4usize).prop_map(|(layer, dynamic, name_pick)| {
            EditOp::Place { layer, dynamic, name_pick }
        }),
        (0..64usize).prop_map(|pick| EditOp::Delete { pick }),
        (0..64usize, -32..32i32, -32..32i32)
            .prop_map(|(pick, dx, dy)| EditOp::Move { pick, dx, dy }),
        (0..64usize).prop_map(|pick| EditOp::Front { pick }),
        (0..64usize).prop_map(|pick| EditOp::Back { pick }),
        (0..64usize, 0..3i32).prop_map(|(pick, layer)| EditOp::Layer { pick, layer }),
    ]
}

fn nth_id(map: &EntityCollection, pick: usize) -> Option<Uuid> {
    let len = map.len();
    if len == 0 {
        return None;
    }
    map.iter().nth(pick % len).map(|entity| entity.id)
}

fn build_command(map: &EntityCollection, op: &EditOp) -> Option<EditCommand> {
    match op {
        EditOp::Place { layer, dynamic, name_pick } => {
            let kind = if *dynamic { EntityKind::Npc } else { EntityKind::Tile };
            let names = ["door", "chest", "rock", ""];
            let entity = MapEntity::new(kind, *layer, 0, 0).with_name(names[*name_pick % 4]);
            EditCommand::add_entities_at_back(map, vec![entity]).ok()
        }
        EditOp::Delete { pick } => {
            let index = map.find_entity(nth_id(map, *pick)?)?;
            EditCommand::remove_entities(map, vec![index]).ok()
        }
        EditOp::Move { pick, dx, dy } => {
            let id = nth_id(map, *pick)?;
            EditCommand::move_entities(map, vec![id], *dx, *dy, false).ok()
        }
        EditOp::Front { pick } => EditCommand::bring_to_front(map, vec![nth_id(map, *pick)?]).ok(),
        EditOp::Back { pick } => EditCommand::bring_to_back(map, vec![nth_id(map, *pick)?]).ok(),
        EditOp::Layer { pick, layer } => {
            let id = nth_id(map, *pick)?;
            EditCommand::set_entity_layer(map, id, *layer).ok()
        }
    }
}

proptest! {
    #[test]
    fn undoing_every_command_restores_the_initial_state(
        ops in proptest::collection::vec(edit_op_strategy(), 1..40),
    ) {
        let mut map = EntityCollection::new(0, 2);
        let mut history = CommandHistory::new();
        let initial = snapshot(&map);

        for op in &ops {
            if let Some(command) = build_command(&map, op) {
                history.execute(command, &mut map);
            }
        }
        let final_state = snapshot(&map);

        while history.undo(&mut map).is_some() {}
        prop_assert_eq!(snapshot(&map), initial);

        while history.redo(&mut map).is_some() {}
        prop_assert_eq!(snapshot(&map), final_state);
    }
}
