//! Reversible editing commands
//!
//! Every user-visible edit is a value of [`EditCommand`]. Construction
//! captures "before" state from the collection's read accessors and
//! validates user-facing preconditions, rejecting with a [`CommandError`]
//! before any mutation; once `redo` begins it completes. Commands track
//! entities by id and re-derive indices from current collection state
//! immediately before use, never across mutations.

mod history;

pub use history::{CommandHistory, DEFAULT_HISTORY_LIMIT};

use quest_map_core::{EntityCollection, EntityIndex, EntityKind, MapEntity};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// A rejection raised while constructing a command, before any mutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("the edit affects no entities")]
    EmptyBatch,
    #[error("entity no longer exists")]
    UnknownEntity,
    #[error("size {width}x{height} is not valid for a {kind}")]
    InvalidSize {
        width: u32,
        height: u32,
        kind: EntityKind,
    },
    #[error("name '{0}' is already in use")]
    NameTaken(String),
    #[error("layer {0} is out of range")]
    LayerOutOfRange(i32),
    #[error("order {0} is out of range")]
    OrderOutOfRange(usize),
    #[error("expected a {0} entity")]
    WrongKind(EntityKind),
    #[error("the edit would change nothing")]
    NothingToDo,
}

/// Identifies mergeable operation kinds, so rapid repeated micro-edits
/// (a drag gesture) collapse into one undo step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeId {
    Move,
    Resize,
}

fn resolve(map: &EntityCollection, id: Uuid) -> Result<EntityIndex, CommandError> {
    map.find_entity(id).ok_or(CommandError::UnknownEntity)
}

/// Canonical id batch: sorted, deduplicated, verified attached
fn resolve_batch(map: &EntityCollection, mut ids: Vec<Uuid>) -> Result<Vec<Uuid>, CommandError> {
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(CommandError::EmptyBatch);
    }
    for id in &ids {
        resolve(map, *id)?;
    }
    Ok(ids)
}

/// Compute ascending back-of-partition slots for a batch of detached
/// entities, accounting for the batch's own insertions
fn back_slots(map: &EntityCollection, mut entities: Vec<MapEntity>) -> Vec<(MapEntity, EntityIndex)> {
    // Stable sort keeps the given relative order within each sub-partition
    entities.sort_by_key(|entity| (entity.layer, entity.is_dynamic()));
    let mut num_static: BTreeMap<i32, usize> = BTreeMap::new();
    let mut num_total: BTreeMap<i32, usize> = BTreeMap::new();
    let mut batch = Vec::with_capacity(entities.len());
    for entity in entities {
        let layer = entity.layer;
        let statics = num_static
            .entry(layer)
            .or_insert_with(|| map.num_static_entities(layer));
        let total = num_total.entry(layer).or_insert_with(|| map.num_entities(layer));
        let order = if entity.is_dynamic() { *total } else { *statics };
        if !entity.is_dynamic() {
            *statics += 1;
        }
        *total += 1;
        batch.push((entity, EntityIndex::new(layer, order)));
    }
    batch
}

/// Insert a batch of detached entities (place, paste, load)
#[derive(Debug)]
pub struct AddEntities {
    /// Target slots, ascending
    indices: Vec<EntityIndex>,
    ids: Vec<Uuid>,
    /// The entities while not applied; they live in the collection otherwise
    detached: Option<Vec<MapEntity>>,
}

impl AddEntities {
    fn redo(&mut self, map: &mut EntityCollection) {
        let entities = self.detached.take().expect("command already applied");
        map.add_entities(entities.into_iter().zip(self.indices.iter().copied()).collect());
    }

    fn undo(&mut self, map: &mut EntityCollection) {
        let removed = map.remove_entities(self.indices.clone());
        self.detached = Some(removed.into_iter().map(|(entity, _)| entity).collect());
    }
}

/// Detach a batch of entities
#[derive(Debug)]
pub struct RemoveEntities {
    /// Pre-removal slots, ascending
    indices: Vec<EntityIndex>,
    ids: Vec<Uuid>,
    /// The entities while applied (detached from the collection)
    removed: Option<Vec<MapEntity>>,
}

impl RemoveEntities {
    fn redo(&mut self, map: &mut EntityCollection) {
        let removed = map.remove_entities(self.indices.clone());
        self.removed = Some(removed.into_iter().map(|(entity, _)| entity).collect());
    }

    fn undo(&mut self, map: &mut EntityCollection) {
        let entities = self.removed.take().expect("command not applied");
        map.add_entities(entities.into_iter().zip(self.indices.iter().copied()).collect());
    }
}

/// Translate a batch of entities by one delta
#[derive(Debug)]
pub struct MoveEntities {
    ids: Vec<Uuid>,
    dx: i32,
    dy: i32,
    merge_allowed: bool,
}

impl MoveEntities {
    fn translate(&self, map: &mut EntityCollection, dx: i32, dy: i32) {
        for id in &self.ids {
            let index = map.find_entity(*id).expect("stale entity id");
            map.translate_entity(index, dx, dy);
        }
    }
}

#[derive(Debug)]
struct ResizeTarget {
    id: Uuid,
    old_box: (i32, i32, u32, u32),
    new_box: (i32, i32, u32, u32),
}

/// Change bounding boxes of a batch of entities
#[derive(Debug)]
pub struct ResizeEntities {
    /// Sorted by id
    targets: Vec<ResizeTarget>,
    merge_allowed: bool,
}

impl ResizeEntities {
    fn same_targets(&self, other: &ResizeEntities) -> bool {
        self.targets.len() == other.targets.len()
            && self
                .targets
                .iter()
                .zip(&other.targets)
                .all(|(a, b)| a.id == b.id)
    }

    fn apply(&self, map: &mut EntityCollection, forward: bool) {
        for target in &self.targets {
            let index = map.find_entity(target.id).expect("stale entity id");
            let (x, y, width, height) = if forward { target.new_box } else { target.old_box };
            let applied = map.set_entity_bounding_box(index, x, y, width, height);
            debug_assert!(applied, "size was validated at construction");
        }
    }
}

/// How a reorder positions its entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReorderKind {
    BringToFront,
    BringToBack,
    SetOrder(usize),
}

/// Move entities within their layers
#[derive(Debug)]
pub struct ReorderEntities {
    /// Application order: ascending current index for front, descending
    /// for back
    ids: Vec<Uuid>,
    kind: ReorderKind,
    /// `(id, order just before each forward move)`, filled by `redo` and
    /// replayed in reverse by `undo`
    recorded: Vec<(Uuid, usize)>,
}

impl ReorderEntities {
    fn redo(&mut self, map: &mut EntityCollection) {
        self.recorded.clear();
        for id in &self.ids {
            let index = map.find_entity(*id).expect("stale entity id");
            self.recorded.push((*id, index.order));
            match self.kind {
                ReorderKind::BringToFront => {
                    map.bring_to_front(index);
                }
                ReorderKind::BringToBack => {
                    map.bring_to_back(index);
                }
                ReorderKind::SetOrder(order) => map.set_entity_order(index, order),
            }
        }
    }

    fn undo(&mut self, map: &mut EntityCollection) {
        for (id, old_order) in self.recorded.iter().rev() {
            let index = map.find_entity(*id).expect("stale entity id");
            map.set_entity_order(index, *old_order);
        }
    }
}

/// Move entities to other layers
#[derive(Debug)]
pub struct SetEntitiesLayer {
    /// Ascending by original index within each source layer
    ids: Vec<Uuid>,
    new_layers: Vec<i32>,
    /// Prior slots captured per forward step, replayed in reverse by `undo`
    recorded: Vec<(Uuid, EntityIndex)>,
}

impl SetEntitiesLayer {
    fn redo(&mut self, map: &mut EntityCollection) {
        self.recorded.clear();
        for (id, new_layer) in self.ids.iter().zip(&self.new_layers) {
            let index = map.find_entity(*id).expect("stale entity id");
            self.recorded.push((*id, index));
            map.set_entity_layer(index, *new_layer);
        }
    }

    fn undo(&mut self, map: &mut EntityCollection) {
        // Restoring layer membership alone is not enough: the prior order
        // within the layer must come back too
        for (id, prior) in self.recorded.iter().rev() {
            let index = map.find_entity(*id).expect("stale entity id");
            let restored = map.set_entity_layer(index, prior.layer);
            map.set_entity_order(restored, prior.order);
        }
    }
}

/// Replace tiles by dynamic tiles or vice versa
///
/// The original objects are kept alive across the round trip: undo puts
/// them back verbatim at their recorded slots.
#[derive(Debug)]
pub struct ConvertTiles {
    to_dynamic: bool,
    /// Original entity ids, ascending by index at construction
    ids: Vec<Uuid>,
    converted_ids: Vec<Uuid>,
    /// Originals with their slots, held while the command is applied
    originals: Option<Vec<(MapEntity, EntityIndex)>>,
    /// Converted entities while the command is not applied
    converted: Option<Vec<MapEntity>>,
    /// Slots the converted batch landed on, captured by `redo`
    converted_indices: Vec<EntityIndex>,
}

impl ConvertTiles {
    fn redo(&mut self, map: &mut EntityCollection) {
        let indices = self
            .ids
            .iter()
            .map(|id| map.find_entity(*id).expect("stale entity id"))
            .collect();
        self.originals = Some(map.remove_entities(indices));
        let converted = self.converted.take().expect("command already applied");
        let batch = back_slots(map, converted);
        self.converted_indices = batch.iter().map(|(_, index)| *index).collect();
        map.add_entities(batch);
    }

    fn undo(&mut self, map: &mut EntityCollection) {
        let removed = map.remove_entities(self.converted_indices.clone());
        self.converted = Some(removed.into_iter().map(|(entity, _)| entity).collect());
        let originals = self.originals.take().expect("command not applied");
        map.add_entities(originals);
    }
}

/// Rename one entity
#[derive(Debug)]
pub struct RenameEntity {
    id: Uuid,
    new_name: Option<String>,
    old_name: Option<String>,
}

/// Move the default-destination flag to one destination
#[derive(Debug)]
pub struct SetDefaultDestination {
    id: Uuid,
    /// The previous holder, captured by `redo`
    displaced: Option<Uuid>,
}

/// A reversible unit of editing work
#[derive(Debug)]
pub enum EditCommand {
    Add(AddEntities),
    Remove(RemoveEntities),
    Move(MoveEntities),
    Resize(ResizeEntities),
    Reorder(ReorderEntities),
    SetLayer(SetEntitiesLayer),
    Convert(ConvertTiles),
    Rename(RenameEntity),
    SetDefault(SetDefaultDestination),
}

impl EditCommand {
    /// Insert detached entities at explicit target slots
    ///
    /// Target orders must be consistent with the static/dynamic
    /// partitioning of their layers after insertion; the batch is sorted
    /// ascending internally.
    pub fn add_entities(
        map: &EntityCollection,
        mut batch: Vec<(MapEntity, EntityIndex)>,
    ) -> Result<Self, CommandError> {
        if batch.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        batch.sort_by_key(|(_, index)| *index);
        for (entity, index) in &batch {
            if !map.layer_in_range(index.layer) {
                return Err(CommandError::LayerOutOfRange(index.layer));
            }
            if !entity.is_size_valid(entity.width, entity.height) {
                return Err(CommandError::InvalidSize {
                    width: entity.width,
                    height: entity.height,
                    kind: entity.kind,
                });
            }
        }
        let indices = batch.iter().map(|(_, index)| *index).collect();
        let ids = batch.iter().map(|(entity, _)| entity.id).collect();
        let detached = batch.into_iter().map(|(entity, _)| entity).collect();
        Ok(EditCommand::Add(AddEntities {
            indices,
            ids,
            detached: Some(detached),
        }))
    }

    /// Insert detached entities at the back of their sub-partitions
    pub fn add_entities_at_back(
        map: &EntityCollection,
        entities: Vec<MapEntity>,
    ) -> Result<Self, CommandError> {
        if entities.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        for entity in &entities {
            if !map.layer_in_range(entity.layer) {
                return Err(CommandError::LayerOutOfRange(entity.layer));
            }
        }
        Self::add_entities(map, back_slots(map, entities))
    }

    /// Detach the entities at the given indexes
    pub fn remove_entities(
        map: &EntityCollection,
        mut indexes: Vec<EntityIndex>,
    ) -> Result<Self, CommandError> {
        indexes.sort_unstable();
        indexes.dedup();
        if indexes.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        let mut ids = Vec::with_capacity(indexes.len());
        for index in &indexes {
            let entity = map.get_entity(*index).ok_or(CommandError::UnknownEntity)?;
            ids.push(entity.id);
        }
        Ok(EditCommand::Remove(RemoveEntities {
            indices: indexes,
            ids,
            removed: None,
        }))
    }

    /// Translate entities by a delta
    ///
    /// `allow_merge` folds this move into an immediately preceding one on
    /// the same entities (set it while a drag gesture continues).
    pub fn move_entities(
        map: &EntityCollection,
        ids: Vec<Uuid>,
        dx: i32,
        dy: i32,
        allow_merge: bool,
    ) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        if dx == 0 && dy == 0 {
            return Err(CommandError::NothingToDo);
        }
        Ok(EditCommand::Move(MoveEntities {
            ids,
            dx,
            dy,
            merge_allowed: allow_merge,
        }))
    }

    /// Set entity bounding boxes, validating sizes up front
    pub fn resize_entities(
        map: &EntityCollection,
        mut boxes: Vec<(Uuid, (i32, i32, u32, u32))>,
        allow_merge: bool,
    ) -> Result<Self, CommandError> {
        boxes.sort_by_key(|(id, _)| *id);
        boxes.dedup_by_key(|(id, _)| *id);
        if boxes.is_empty() {
            return Err(CommandError::EmptyBatch);
        }
        let mut targets = Vec::with_capacity(boxes.len());
        for (id, new_box) in boxes {
            let index = resolve(map, id)?;
            let entity = map.get_entity(index).ok_or(CommandError::UnknownEntity)?;
            let (_, _, width, height) = new_box;
            if !entity.is_size_valid(width, height) {
                return Err(CommandError::InvalidSize {
                    width,
                    height,
                    kind: entity.kind,
                });
            }
            targets.push(ResizeTarget {
                id,
                old_box: entity.bounding_box(),
                new_box,
            });
        }
        if targets.iter().all(|target| target.old_box == target.new_box) {
            return Err(CommandError::NothingToDo);
        }
        Ok(EditCommand::Resize(ResizeEntities {
            targets,
            merge_allowed: allow_merge,
        }))
    }

    /// Bring entities to the front of their sub-partitions (drawn last)
    pub fn bring_to_front(map: &EntityCollection, ids: Vec<Uuid>) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        let mut ordered: Vec<(EntityIndex, Uuid)> = ids
            .into_iter()
            .map(|id| Ok((resolve(map, id)?, id)))
            .collect::<Result<_, CommandError>>()?;
        ordered.sort_unstable();
        Ok(EditCommand::Reorder(ReorderEntities {
            ids: ordered.into_iter().map(|(_, id)| id).collect(),
            kind: ReorderKind::BringToFront,
            recorded: Vec::new(),
        }))
    }

    /// Bring entities to the back of their sub-partitions (drawn first)
    pub fn bring_to_back(map: &EntityCollection, ids: Vec<Uuid>) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        let mut ordered: Vec<(EntityIndex, Uuid)> = ids
            .into_iter()
            .map(|id| Ok((resolve(map, id)?, id)))
            .collect::<Result<_, CommandError>>()?;
        // Back-to-front application keeps the batch's relative order
        ordered.sort_unstable();
        ordered.reverse();
        Ok(EditCommand::Reorder(ReorderEntities {
            ids: ordered.into_iter().map(|(_, id)| id).collect(),
            kind: ReorderKind::BringToBack,
            recorded: Vec::new(),
        }))
    }

    /// Move one entity to an explicit order within its layer
    pub fn set_entity_order(
        map: &EntityCollection,
        id: Uuid,
        new_order: usize,
    ) -> Result<Self, CommandError> {
        let index = resolve(map, id)?;
        let entity = map.get_entity(index).ok_or(CommandError::UnknownEntity)?;
        let num_static = map.num_static_entities(index.layer);
        let num_entities = map.num_entities(index.layer);
        let legal = if entity.is_dynamic() {
            new_order >= num_static && new_order < num_entities
        } else {
            new_order < num_static
        };
        if !legal {
            return Err(CommandError::OrderOutOfRange(new_order));
        }
        if new_order == index.order {
            return Err(CommandError::NothingToDo);
        }
        Ok(EditCommand::Reorder(ReorderEntities {
            ids: vec![id],
            kind: ReorderKind::SetOrder(new_order),
            recorded: Vec::new(),
        }))
    }

    /// Move entities to explicit layers
    pub fn set_entities_layer(
        map: &EntityCollection,
        targets: Vec<(Uuid, i32)>,
    ) -> Result<Self, CommandError> {
        let mut resolved = Vec::with_capacity(targets.len());
        for (id, new_layer) in targets {
            if !map.layer_in_range(new_layer) {
                return Err(CommandError::LayerOutOfRange(new_layer));
            }
            let index = resolve(map, id)?;
            if index.layer != new_layer {
                resolved.push((index, id, new_layer));
            }
        }
        if resolved.is_empty() {
            return Err(CommandError::NothingToDo);
        }
        // Ascending by original index within each source layer; required
        // for a result the inverse can reproduce exactly
        resolved.sort_unstable_by_key(|(index, _, _)| *index);
        Ok(EditCommand::SetLayer(SetEntitiesLayer {
            ids: resolved.iter().map(|(_, id, _)| *id).collect(),
            new_layers: resolved.iter().map(|(_, _, layer)| *layer).collect(),
            recorded: Vec::new(),
        }))
    }

    /// Move one entity to another layer
    pub fn set_entity_layer(
        map: &EntityCollection,
        id: Uuid,
        new_layer: i32,
    ) -> Result<Self, CommandError> {
        Self::set_entities_layer(map, vec![(id, new_layer)])
    }

    /// Move entities one layer up; entities already at the top stay put
    pub fn increment_entities_layer(
        map: &EntityCollection,
        ids: Vec<Uuid>,
    ) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        let targets = ids
            .into_iter()
            .filter_map(|id| {
                let index = map.find_entity(id)?;
                (index.layer < map.max_layer()).then(|| (id, index.layer + 1))
            })
            .collect();
        Self::set_entities_layer(map, targets)
    }

    /// Move entities one layer down; entities already at the bottom stay put
    pub fn decrement_entities_layer(
        map: &EntityCollection,
        ids: Vec<Uuid>,
    ) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        let targets = ids
            .into_iter()
            .filter_map(|id| {
                let index = map.find_entity(id)?;
                (index.layer > map.min_layer()).then(|| (id, index.layer - 1))
            })
            .collect();
        Self::set_entities_layer(map, targets)
    }

    /// Replace static tiles by dynamic tiles, or back
    pub fn convert_tiles(
        map: &EntityCollection,
        ids: Vec<Uuid>,
        to_dynamic: bool,
    ) -> Result<Self, CommandError> {
        let ids = resolve_batch(map, ids)?;
        let expected = if to_dynamic {
            EntityKind::Tile
        } else {
            EntityKind::DynamicTile
        };
        let new_kind = if to_dynamic {
            EntityKind::DynamicTile
        } else {
            EntityKind::Tile
        };
        let mut ordered: Vec<(EntityIndex, Uuid)> = Vec::with_capacity(ids.len());
        for id in ids {
            let index = resolve(map, id)?;
            let entity = map.get_entity(index).ok_or(CommandError::UnknownEntity)?;
            if entity.kind != expected {
                return Err(CommandError::WrongKind(expected));
            }
            ordered.push((index, id));
        }
        ordered.sort_unstable();

        // Built once so redo cycles reinsert the same replacement objects
        let mut converted = Vec::with_capacity(ordered.len());
        for (index, _) in &ordered {
            let original = map.get_entity(*index).expect("index just derived");
            let mut replacement = MapEntity::new(new_kind, original.layer, original.x, original.y)
                .with_size(original.width, original.height);
            replacement.name = original.name.clone();
            replacement.properties = original.properties.clone();
            converted.push(replacement);
        }
        Ok(EditCommand::Convert(ConvertTiles {
            to_dynamic,
            ids: ordered.iter().map(|(_, id)| *id).collect(),
            converted_ids: converted.iter().map(|entity| entity.id).collect(),
            originals: None,
            converted: Some(converted),
            converted_indices: Vec::new(),
        }))
    }

    /// Rename one entity, rejecting collisions up front
    pub fn rename_entity(
        map: &EntityCollection,
        id: Uuid,
        name: Option<String>,
    ) -> Result<Self, CommandError> {
        let index = resolve(map, id)?;
        let entity = map.get_entity(index).ok_or(CommandError::UnknownEntity)?;
        let name = name.filter(|name| !name.is_empty());
        if name == entity.name {
            return Err(CommandError::NothingToDo);
        }
        if let Some(new_name) = &name {
            if map.contains_name(new_name) {
                return Err(CommandError::NameTaken(new_name.clone()));
            }
        }
        Ok(EditCommand::Rename(RenameEntity {
            id,
            new_name: name,
            old_name: entity.name.clone(),
        }))
    }

    /// Make one destination the default, demoting the current holder
    pub fn set_default_destination(
        map: &EntityCollection,
        id: Uuid,
    ) -> Result<Self, CommandError> {
        let index = resolve(map, id)?;
        let entity = map.get_entity(index).ok_or(CommandError::UnknownEntity)?;
        if entity.kind != EntityKind::Destination {
            return Err(CommandError::WrongKind(EntityKind::Destination));
        }
        if entity.is_default_destination() {
            return Err(CommandError::NothingToDo);
        }
        Ok(EditCommand::SetDefault(SetDefaultDestination {
            id,
            displaced: None,
        }))
    }

    /// Description for menu surfaces
    pub fn text(&self) -> &'static str {
        match self {
            EditCommand::Add(_) => "Add Entities",
            EditCommand::Remove(_) => "Delete Entities",
            EditCommand::Move(_) => "Move Entities",
            EditCommand::Resize(_) => "Resize Entities",
            EditCommand::Reorder(reorder) => match reorder.kind {
                ReorderKind::BringToFront => "Bring to Front",
                ReorderKind::BringToBack => "Bring to Back",
                ReorderKind::SetOrder(_) => "Change Order",
            },
            EditCommand::SetLayer(_) => "Change Layer",
            EditCommand::Convert(convert) => {
                if convert.to_dynamic {
                    "Convert to Dynamic Tiles"
                } else {
                    "Convert to Static Tiles"
                }
            }
            EditCommand::Rename(_) => "Rename Entity",
            EditCommand::SetDefault(_) => "Set Default Destination",
        }
    }

    /// Ids of the entities this command touches, for re-selection
    pub fn affected_ids(&self) -> Vec<Uuid> {
        match self {
            EditCommand::Add(add) => add.ids.clone(),
            EditCommand::Remove(remove) => remove.ids.clone(),
            EditCommand::Move(move_cmd) => move_cmd.ids.clone(),
            EditCommand::Resize(resize) => resize.targets.iter().map(|t| t.id).collect(),
            EditCommand::Reorder(reorder) => reorder.ids.clone(),
            EditCommand::SetLayer(set_layer) => set_layer.ids.clone(),
            EditCommand::Convert(convert) => {
                if convert.originals.is_some() {
                    convert.converted_ids.clone()
                } else {
                    convert.ids.clone()
                }
            }
            EditCommand::Rename(rename) => vec![rename.id],
            EditCommand::SetDefault(set_default) => vec![set_default.id],
        }
    }

    pub(crate) fn redo(&mut self, map: &mut EntityCollection) {
        match self {
            EditCommand::Add(add) => add.redo(map),
            EditCommand::Remove(remove) => remove.redo(map),
            EditCommand::Move(move_cmd) => move_cmd.translate(map, move_cmd.dx, move_cmd.dy),
            EditCommand::Resize(resize) => resize.apply(map, true),
            EditCommand::Reorder(reorder) => reorder.redo(map),
            EditCommand::SetLayer(set_layer) => set_layer.redo(map),
            EditCommand::Convert(convert) => convert.redo(map),
            EditCommand::Rename(rename) => {
                let index = map.find_entity(rename.id).expect("stale entity id");
                let applied = map.set_entity_name(index, rename.new_name.clone());
                debug_assert!(applied, "name was validated at construction");
            }
            EditCommand::SetDefault(set_default) => {
                let index = map.find_entity(set_default.id).expect("stale entity id");
                let displaced = map.set_entity_default_flag(index, true);
                set_default.displaced = displaced
                    .map(|index| map.get_entity(index).expect("displaced index is fresh").id);
            }
        }
    }

    pub(crate) fn undo(&mut self, map: &mut EntityCollection) {
        match self {
            EditCommand::Add(add) => add.undo(map),
            EditCommand::Remove(remove) => remove.undo(map),
            EditCommand::Move(move_cmd) => move_cmd.translate(map, -move_cmd.dx, -move_cmd.dy),
            EditCommand::Resize(resize) => resize.apply(map, false),
            EditCommand::Reorder(reorder) => reorder.undo(map),
            EditCommand::SetLayer(set_layer) => set_layer.undo(map),
            EditCommand::Convert(convert) => convert.undo(map),
            EditCommand::Rename(rename) => {
                let index = map.find_entity(rename.id).expect("stale entity id");
                let applied = map.set_entity_name(index, rename.old_name.clone());
                debug_assert!(applied, "old name cannot collide");
            }
            EditCommand::SetDefault(set_default) => {
                let index = map.find_entity(set_default.id).expect("stale entity id");
                map.set_entity_default_flag(index, false);
                if let Some(previous) = set_default.displaced {
                    let index = map.find_entity(previous).expect("stale entity id");
                    map.set_entity_default_flag(index, true);
                }
            }
        }
    }

    pub(crate) fn merge_id(&self) -> Option<MergeId> {
        match self {
            EditCommand::Move(_) => Some(MergeId::Move),
            EditCommand::Resize(_) => Some(MergeId::Resize),
            _ => None,
        }
    }

    pub(crate) fn allows_merge(&self) -> bool {
        match self {
            EditCommand::Move(move_cmd) => move_cmd.merge_allowed,
            EditCommand::Resize(resize) => resize.merge_allowed,
            _ => false,
        }
    }

    /// Fold `newer` into this command without re-executing anything
    ///
    /// The older command's "before" snapshot remains the inversion target
    /// of the merged step; only forward parameters combine. Returns the
    /// newer command unchanged when the two are incompatible.
    pub(crate) fn merge_from(&mut self, newer: EditCommand) -> Result<(), EditCommand> {
        match (self, newer) {
            (EditCommand::Move(older), EditCommand::Move(newer)) if older.ids == newer.ids => {
                older.dx += newer.dx;
                older.dy += newer.dy;
                Ok(())
            }
            (EditCommand::Resize(older), EditCommand::Resize(newer))
                if older.same_targets(&newer) =>
            {
                for (older_target, newer_target) in older.targets.iter_mut().zip(newer.targets) {
                    older_target.new_box = newer_target.new_box;
                }
                Ok(())
            }
            (_, newer) => Err(newer),
        }
    }
}
