//! Per-layer entity ordering

use crate::MapEntity;
use std::ops::RangeInclusive;

/// The ordered sequence of entities on one layer
///
/// Static entities occupy the prefix of the sequence and dynamic entities
/// the suffix; order values are the dense range `0..len`.
#[derive(Debug, Default)]
pub(crate) struct LayerPartition {
    entities: Vec<MapEntity>,
}

impl LayerPartition {
    pub(crate) fn len(&self) -> usize {
        self.entities.len()
    }

    /// Number of static entities; also the first dynamic slot
    pub(crate) fn num_static(&self) -> usize {
        self.entities.partition_point(|e| !e.is_dynamic())
    }

    pub(crate) fn get(&self, order: usize) -> Option<&MapEntity> {
        self.entities.get(order)
    }

    pub(crate) fn get_mut(&mut self, order: usize) -> Option<&mut MapEntity> {
        self.entities.get_mut(order)
    }

    /// Insert at `order`; panics if `order > len` (contract violation)
    pub(crate) fn insert(&mut self, order: usize, entity: MapEntity) {
        self.entities.insert(order, entity);
    }

    /// Remove the entity at `order`; panics if out of range (contract violation)
    pub(crate) fn remove(&mut self, order: usize) -> MapEntity {
        self.entities.remove(order)
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, MapEntity> {
        self.entities.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> std::slice::IterMut<'_, MapEntity> {
        self.entities.iter_mut()
    }

    /// Legal insertion orders for an entity of the given dynamism
    pub(crate) fn insertion_range(&self, dynamic: bool) -> RangeInclusive<usize> {
        if dynamic {
            self.num_static()..=self.len()
        } else {
            0..=self.num_static()
        }
    }

    /// Legal target orders for reordering the member at `order`
    ///
    /// A static entity must stay within the static prefix, a dynamic entity
    /// within the dynamic suffix.
    pub(crate) fn reorder_range(&self, order: usize) -> RangeInclusive<usize> {
        let num_static = self.num_static();
        if order < num_static {
            0..=num_static - 1
        } else {
            num_static..=self.len() - 1
        }
    }

    /// Whether all static entities precede all dynamic entities
    pub(crate) fn is_partitioned(&self) -> bool {
        let first_dynamic = self.num_static();
        self.entities[first_dynamic..].iter().all(MapEntity::is_dynamic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityKind;

    fn tile() -> MapEntity {
        MapEntity::new(EntityKind::Tile, 0, 0, 0)
    }

    fn npc() -> MapEntity {
        MapEntity::new(EntityKind::Npc, 0, 0, 0)
    }

    #[test]
    fn test_num_static() {
        let mut partition = LayerPartition::default();
        partition.insert(0, tile());
        partition.insert(1, tile());
        partition.insert(2, npc());
        assert_eq!(partition.num_static(), 2);
        assert_eq!(partition.len(), 3);
        assert!(partition.is_partitioned());
    }

    #[test]
    fn test_insertion_ranges() {
        let mut partition = LayerPartition::default();
        partition.insert(0, tile());
        partition.insert(1, npc());
        partition.insert(2, npc());

        assert_eq!(partition.insertion_range(false), 0..=1);
        assert_eq!(partition.insertion_range(true), 1..=3);
    }

    #[test]
    fn test_reorder_ranges() {
        let mut partition = LayerPartition::default();
        partition.insert(0, tile());
        partition.insert(1, tile());
        partition.insert(2, npc());
        partition.insert(3, npc());

        assert_eq!(partition.reorder_range(0), 0..=1);
        assert_eq!(partition.reorder_range(3), 2..=3);
    }
}
