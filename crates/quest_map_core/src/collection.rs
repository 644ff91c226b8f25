//! The layer-partitioned entity index
//!
//! [`EntityCollection`] is the sole authority for entity placement. After
//! every public call returns, each layer keeps its static entities before
//! its dynamic entities, order values are the dense range `0..len`, entity
//! names are unique, and at most one destination carries the default flag.

use crate::layer::LayerPartition;
use crate::{ChangeNotifier, EntityIndex, MapEntity, MapEvent, MapObserver};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;
use uuid::Uuid;

/// All entities of one map, partitioned by layer
///
/// Structural misuse (stale indices, out-of-range layers or orders) is a
/// programming error, not a recoverable condition: it trips an assertion.
/// Callers re-derive indices from current collection state immediately
/// before use.
#[derive(Debug)]
pub struct EntityCollection {
    min_layer: i32,
    max_layer: i32,
    layers: BTreeMap<i32, LayerPartition>,
    /// Derived lookup used only to enforce name uniqueness; ordering truth
    /// lives in the partitions
    names: HashSet<String>,
    notifier: ChangeNotifier,
}

impl EntityCollection {
    /// Create an empty collection owning one partition per layer in
    /// `min_layer..=max_layer`
    pub fn new(min_layer: i32, max_layer: i32) -> Self {
        assert!(min_layer <= max_layer, "empty layer range");
        let layers = (min_layer..=max_layer)
            .map(|layer| (layer, LayerPartition::default()))
            .collect();
        Self {
            min_layer,
            max_layer,
            layers,
            names: HashSet::new(),
            notifier: ChangeNotifier::default(),
        }
    }

    pub fn min_layer(&self) -> i32 {
        self.min_layer
    }

    pub fn max_layer(&self) -> i32 {
        self.max_layer
    }

    /// Whether `layer` is within this map's layer range
    pub fn layer_in_range(&self, layer: i32) -> bool {
        (self.min_layer..=self.max_layer).contains(&layer)
    }

    /// Total number of attached entities
    pub fn len(&self) -> usize {
        self.layers.values().map(LayerPartition::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.values().all(|partition| partition.len() == 0)
    }

    /// Number of entities on a layer (0 for an out-of-range layer)
    pub fn num_entities(&self, layer: i32) -> usize {
        self.layers.get(&layer).map_or(0, LayerPartition::len)
    }

    /// Number of static entities on a layer; also the first dynamic slot
    pub fn num_static_entities(&self, layer: i32) -> usize {
        self.layers.get(&layer).map_or(0, LayerPartition::num_static)
    }

    /// Whether an entity currently occupies `index`
    pub fn entity_exists(&self, index: EntityIndex) -> bool {
        self.get_entity(index).is_some()
    }

    /// Get the entity at `index`
    pub fn get_entity(&self, index: EntityIndex) -> Option<&MapEntity> {
        self.layers
            .get(&index.layer)
            .and_then(|partition| partition.get(index.order))
    }

    /// All entities in natural order: layers ascending, then order
    pub fn iter(&self) -> impl Iterator<Item = &MapEntity> + '_ {
        self.layers.values().flat_map(|partition| partition.iter())
    }

    /// Current index of the entity with the given id
    pub fn find_entity(&self, id: Uuid) -> Option<EntityIndex> {
        self.iter().find(|entity| entity.id == id).and_then(MapEntity::index)
    }

    /// Current index of the entity with the given name
    pub fn find_by_name(&self, name: &str) -> Option<EntityIndex> {
        self.iter()
            .find(|entity| entity.name.as_deref() == Some(name))
            .and_then(MapEntity::index)
    }

    /// Whether a named entity already uses `name`
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Index of the destination carrying the default flag, if any
    pub fn default_destination(&self) -> Option<EntityIndex> {
        self.iter()
            .find(|entity| entity.is_default_destination())
            .and_then(MapEntity::index)
    }

    /// Register an observer of structural changes
    pub fn subscribe<O: MapObserver + 'static>(&mut self, observer: &Rc<RefCell<O>>) {
        self.notifier.subscribe(observer);
    }

    /// Insert a batch of detached entities at their target slots
    ///
    /// The batch must be sorted ascending by index so that insertion at
    /// index `i` never invalidates a not-yet-processed index `j > i`;
    /// callers compute target orders from current partition sizes. Names
    /// are deduplicated and the default-destination singleton enforced on
    /// the way in.
    pub fn add_entities(&mut self, batch: Vec<(MapEntity, EntityIndex)>) {
        if batch.is_empty() {
            return;
        }
        debug_assert!(
            batch.windows(2).all(|pair| pair[0].1 < pair[1].1),
            "add batch must be sorted ascending by index"
        );
        let indices: Vec<EntityIndex> = batch.iter().map(|(_, index)| *index).collect();
        self.notifier
            .notify(&MapEvent::AboutToAddEntities { indices: indices.clone() });

        let mut touched = BTreeSet::new();
        for (mut entity, index) in batch {
            assert!(
                self.layer_in_range(index.layer),
                "layer {} out of range",
                index.layer
            );
            self.dedup_name(&mut entity);
            self.enforce_single_default(&mut entity);
            entity.layer = index.layer;
            let partition = self
                .layers
                .get_mut(&index.layer)
                .expect("partition exists for in-range layer");
            debug_assert!(
                partition
                    .insertion_range(entity.is_dynamic())
                    .contains(&index.order),
                "order {} violates the static/dynamic partitioning of layer {}",
                index.order,
                index.layer
            );
            partition.insert(index.order, entity);
            touched.insert(index.layer);
        }
        for layer in touched {
            self.rebuild_layer(layer);
        }
        self.notifier.notify(&MapEvent::EntitiesAdded { indices });
    }

    /// Detach the entities at the given indexes
    ///
    /// The batch is sorted internally and removed back-to-front, so the
    /// result does not depend on the input order. Returns the detached
    /// entities paired with their pre-removal indexes, ascending: the
    /// exact batch that [`Self::add_entities`] accepts to invert the call.
    pub fn remove_entities(&mut self, mut indexes: Vec<EntityIndex>) -> Vec<(MapEntity, EntityIndex)> {
        if indexes.is_empty() {
            return Vec::new();
        }
        indexes.sort_unstable();
        indexes.dedup();
        debug_assert!(
            indexes.iter().all(|index| self.entity_exists(*index)),
            "stale index in remove batch"
        );
        self.notifier
            .notify(&MapEvent::AboutToRemoveEntities { indices: indexes.clone() });

        let mut removed = Vec::with_capacity(indexes.len());
        let mut touched = BTreeSet::new();
        // Back-to-front so earlier removals never shift a pending index
        for &index in indexes.iter().rev() {
            let partition = self
                .layers
                .get_mut(&index.layer)
                .expect("partition exists for in-range layer");
            let mut entity = partition.remove(index.order);
            if let Some(name) = &entity.name {
                self.names.remove(name);
            }
            entity.clear_index();
            removed.push((entity, index));
            touched.insert(index.layer);
        }
        removed.reverse();
        for layer in touched {
            self.rebuild_layer(layer);
        }
        self.notifier.notify(&MapEvent::EntitiesRemoved { indices: indexes });
        removed
    }

    /// Move an entity to another slot within its own layer
    ///
    /// `new_order` must stay inside the entity's own sub-range: a static
    /// entity cannot cross the static/dynamic boundary.
    pub fn set_entity_order(&mut self, index: EntityIndex, new_order: usize) {
        let partition = self.partition(index.layer);
        assert!(index.order < partition.len(), "stale index {}", index);
        debug_assert!(
            partition.reorder_range(index.order).contains(&new_order),
            "order {} crosses the static/dynamic boundary of layer {}",
            new_order,
            index.layer
        );
        if new_order == index.order {
            return;
        }
        self.notifier.notify(&MapEvent::AboutToChangeEntityOrder {
            layer: index.layer,
            old_order: index.order,
            new_order,
        });
        let partition = self
            .layers
            .get_mut(&index.layer)
            .expect("partition exists for in-range layer");
        let entity = partition.remove(index.order);
        partition.insert(new_order, entity);
        self.rebuild_layer(index.layer);
        self.notifier.notify(&MapEvent::EntityOrderChanged {
            layer: index.layer,
            old_order: index.order,
            new_order,
        });
    }

    /// Move an entity to the front of its sub-partition (drawn last)
    pub fn bring_to_front(&mut self, index: EntityIndex) -> EntityIndex {
        let partition = self.partition(index.layer);
        let entity = partition.get(index.order).expect("stale entity index");
        let new_order = if entity.is_dynamic() {
            partition.len() - 1
        } else {
            partition.num_static() - 1
        };
        self.set_entity_order(index, new_order);
        EntityIndex::new(index.layer, new_order)
    }

    /// Move an entity to the back of its sub-partition (drawn first)
    pub fn bring_to_back(&mut self, index: EntityIndex) -> EntityIndex {
        let partition = self.partition(index.layer);
        let entity = partition.get(index.order).expect("stale entity index");
        let new_order = if entity.is_dynamic() {
            partition.num_static()
        } else {
            0
        };
        self.set_entity_order(index, new_order);
        EntityIndex::new(index.layer, new_order)
    }

    /// Move an entity to another layer
    ///
    /// The entity is appended at the end of the matching sub-partition of
    /// `new_layer`. Returns its new index.
    pub fn set_entity_layer(&mut self, index: EntityIndex, new_layer: i32) -> EntityIndex {
        assert!(self.layer_in_range(new_layer), "layer {} out of range", new_layer);
        assert!(self.entity_exists(index), "stale index {}", index);
        if new_layer == index.layer {
            return index;
        }
        self.notifier.notify(&MapEvent::AboutToChangeEntityLayer {
            old_index: index,
            new_layer,
        });
        let source = self
            .layers
            .get_mut(&index.layer)
            .expect("partition exists for in-range layer");
        let mut entity = source.remove(index.order);
        let id = entity.id;
        entity.layer = new_layer;
        let target = self
            .layers
            .get_mut(&new_layer)
            .expect("partition exists for in-range layer");
        let new_order = if entity.is_dynamic() {
            target.len()
        } else {
            target.num_static()
        };
        target.insert(new_order, entity);
        self.rebuild_layer(index.layer);
        self.rebuild_layer(new_layer);
        let new_index = EntityIndex::new(new_layer, new_order);
        self.notifier.notify(&MapEvent::EntityLayerChanged {
            id,
            old_index: index,
            new_index,
        });
        new_index
    }

    /// Batched cross-layer move, driven by entity identity
    ///
    /// Each application can shift the indices of entities processed later
    /// on the same layer, so the batch is keyed by id; callers pass ids
    /// ascending by original index within each source layer for a
    /// deterministic result an inverse operation can reproduce exactly.
    pub fn set_entities_layer(&mut self, ids: &[Uuid], new_layers: &[i32]) -> Vec<EntityIndex> {
        debug_assert_eq!(ids.len(), new_layers.len());
        ids.iter()
            .zip(new_layers)
            .map(|(id, &new_layer)| {
                let index = self.find_entity(*id).expect("entity not attached");
                self.set_entity_layer(index, new_layer)
            })
            .collect()
    }

    /// Set an entity's position
    pub fn set_entity_position(&mut self, index: EntityIndex, x: i32, y: i32) {
        let entity = self.entity_mut(index);
        entity.x = x;
        entity.y = y;
    }

    /// Translate an entity's position by a delta
    pub fn translate_entity(&mut self, index: EntityIndex, dx: i32, dy: i32) {
        let entity = self.entity_mut(index);
        entity.x += dx;
        entity.y += dy;
    }

    /// Set an entity's size; returns false if the size is illegal for its kind
    pub fn set_entity_size(&mut self, index: EntityIndex, width: u32, height: u32) -> bool {
        let entity = self.entity_mut(index);
        if !entity.is_size_valid(width, height) {
            return false;
        }
        entity.width = width;
        entity.height = height;
        true
    }

    /// Set an entity's full bounding box; returns false if the size is illegal
    pub fn set_entity_bounding_box(
        &mut self,
        index: EntityIndex,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> bool {
        let entity = self.entity_mut(index);
        if !entity.is_size_valid(width, height) {
            return false;
        }
        entity.x = x;
        entity.y = y;
        entity.width = width;
        entity.height = height;
        true
    }

    /// Rename an entity; returns false if another entity already uses the name
    pub fn set_entity_name(&mut self, index: EntityIndex, name: Option<String>) -> bool {
        let name = name.filter(|name| !name.is_empty());
        if let Some(new_name) = &name {
            let own = self
                .get_entity(index)
                .expect("stale entity index")
                .name
                .as_deref();
            if own != Some(new_name.as_str()) && self.names.contains(new_name) {
                return false;
            }
        }
        let old_name = {
            let entity = self.entity_mut(index);
            std::mem::replace(&mut entity.name, name.clone())
        };
        if let Some(old_name) = old_name {
            self.names.remove(&old_name);
        }
        if let Some(new_name) = name {
            self.names.insert(new_name);
        }
        true
    }

    /// Set or clear the default-destination flag
    ///
    /// Setting the flag clears it on the previous holder; the displaced
    /// holder's index is returned so callers can capture it for inversion.
    pub fn set_entity_default_flag(&mut self, index: EntityIndex, flag: bool) -> Option<EntityIndex> {
        if flag {
            let displaced = self.default_destination().filter(|previous| *previous != index);
            if let Some(previous) = displaced {
                self.entity_mut(previous).set_default_flag(false);
            }
            self.entity_mut(index).set_default_flag(true);
            displaced
        } else {
            self.entity_mut(index).set_default_flag(false);
            None
        }
    }

    fn partition(&self, layer: i32) -> &LayerPartition {
        assert!(self.layer_in_range(layer), "layer {} out of range", layer);
        self.layers.get(&layer).expect("partition exists for in-range layer")
    }

    fn entity_mut(&mut self, index: EntityIndex) -> &mut MapEntity {
        self.layers
            .get_mut(&index.layer)
            .and_then(|partition| partition.get_mut(index.order))
            .expect("stale entity index")
    }

    /// Re-derive and cache order values after a structural change
    ///
    /// The only writer of cached indices; every read path goes through
    /// [`MapEntity::index`].
    fn rebuild_layer(&mut self, layer: i32) {
        let partition = self
            .layers
            .get_mut(&layer)
            .expect("partition exists for in-range layer");
        for (order, entity) in partition.iter_mut().enumerate() {
            entity.set_index(EntityIndex::new(layer, order));
        }
        debug_assert!(
            partition.is_partitioned(),
            "layer {} lost its static prefix",
            layer
        );
    }

    /// Assign a free name by suffix deduplication
    ///
    /// Splits on `_`: a trailing integer token is incremented, anything
    /// else gets `_2` appended; suffixes are probed upward until free.
    fn dedup_name(&mut self, entity: &mut MapEntity) {
        let Some(name) = entity.name.clone() else {
            return;
        };
        if name.is_empty() {
            entity.name = None;
            return;
        }
        if self.names.insert(name.clone()) {
            return;
        }
        let (stem, start) = match name.rsplit_once('_') {
            Some((stem, suffix)) => match suffix.parse::<u64>() {
                Ok(number) => (stem.to_string(), number + 1),
                Err(_) => (name.clone(), 2),
            },
            None => (name.clone(), 2),
        };
        let mut counter = start;
        let mut candidate = format!("{}_{}", stem, counter);
        while !self.names.insert(candidate.clone()) {
            counter += 1;
            candidate = format!("{}_{}", stem, counter);
        }
        entity.name = Some(candidate);
    }

    /// Clear the default flag on an incoming destination if the map
    /// already has a holder
    fn enforce_single_default(&mut self, entity: &mut MapEntity) {
        if entity.is_default_destination() && self.default_destination().is_some() {
            entity.set_default_flag(false);
        }
    }
}
