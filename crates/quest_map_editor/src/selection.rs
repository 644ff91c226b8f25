//! Entity selection tracking across structural edits

use quest_map_core::{EntityCollection, EntityIndex, MapEvent, MapObserver};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use uuid::Uuid;

/// The set of currently selected entity slots
///
/// Subscribed as a [`MapObserver`], the selection follows index shifts so
/// the same logical entities stay selected across adds, removes, reorders
/// and cross-layer moves.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntitySelection {
    indices: BTreeSet<EntityIndex>,
}

impl EntitySelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&mut self, index: EntityIndex) {
        self.indices.insert(index);
    }

    pub fn deselect(&mut self, index: EntityIndex) {
        self.indices.remove(&index);
    }

    pub fn toggle(&mut self, index: EntityIndex) {
        if !self.indices.remove(&index) {
            self.indices.insert(index);
        }
    }

    pub fn clear(&mut self) {
        self.indices.clear();
    }

    pub fn contains(&self, index: EntityIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Selected slots, ascending
    pub fn iter(&self) -> impl Iterator<Item = EntityIndex> + '_ {
        self.indices.iter().copied()
    }

    /// Ids of the selected entities, resolved against the collection
    pub fn ids(&self, map: &EntityCollection) -> Vec<Uuid> {
        self.indices
            .iter()
            .filter_map(|index| map.get_entity(*index))
            .map(|entity| entity.id)
            .collect()
    }

    /// Replace the selection with the current slots of the given entities
    pub fn select_ids(&mut self, map: &EntityCollection, ids: &[Uuid]) {
        self.indices = ids.iter().filter_map(|id| map.find_entity(*id)).collect();
    }

    /// Shift selected slots for an insertion at `added` (post-mutation slot)
    fn entity_added(&mut self, added: EntityIndex) {
        self.indices = self
            .indices
            .iter()
            .map(|&selected| {
                if selected.layer == added.layer && selected.order >= added.order {
                    EntityIndex::new(selected.layer, selected.order + 1)
                } else {
                    selected
                }
            })
            .collect();
    }

    /// Drop `removed` and shift selected slots behind it (pre-mutation slot)
    fn entity_removed(&mut self, removed: EntityIndex) {
        self.indices = self
            .indices
            .iter()
            .filter_map(|&selected| {
                if selected.layer != removed.layer {
                    return Some(selected);
                }
                match selected.order.cmp(&removed.order) {
                    Ordering::Less => Some(selected),
                    Ordering::Equal => None,
                    Ordering::Greater => {
                        Some(EntityIndex::new(selected.layer, selected.order - 1))
                    }
                }
            })
            .collect();
    }

    /// Follow a within-layer move from `old_order` to `new_order`
    fn entity_reordered(&mut self, layer: i32, old_order: usize, new_order: usize) {
        self.indices = self
            .indices
            .iter()
            .map(|&selected| {
                if selected.layer != layer {
                    return selected;
                }
                let order = selected.order;
                let shifted = if order == old_order {
                    new_order
                } else if old_order < new_order && order > old_order && order <= new_order {
                    order - 1
                } else if new_order < old_order && order >= new_order && order < old_order {
                    order + 1
                } else {
                    order
                };
                EntityIndex::new(layer, shifted)
            })
            .collect();
    }
}

impl MapObserver for EntitySelection {
    fn on_map_event(&mut self, event: &MapEvent) {
        match event {
            MapEvent::EntitiesAdded { indices } => {
                for index in indices {
                    self.entity_added(*index);
                }
            }
            // Pre-mutation indices are only valid inside this bracket
            MapEvent::AboutToRemoveEntities { indices } => {
                for index in indices.iter().rev() {
                    self.entity_removed(*index);
                }
            }
            MapEvent::EntityOrderChanged {
                layer,
                old_order,
                new_order,
            } => self.entity_reordered(*layer, *old_order, *new_order),
            MapEvent::EntityLayerChanged {
                old_index,
                new_index,
                ..
            } => {
                let was_selected = self.contains(*old_index);
                self.entity_removed(*old_index);
                self.entity_added(*new_index);
                if was_selected {
                    self.indices.insert(*new_index);
                }
            }
            _ => {}
        }
    }
}
