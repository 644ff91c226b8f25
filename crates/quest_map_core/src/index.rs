//! Structural entity positions

use serde::{Deserialize, Serialize};

/// A structural position `(layer, order)` identifying an entity's current slot
///
/// Not a stable handle: any structural mutation on a layer may shift the
/// orders of entities on that layer. Re-derive indices from the collection
/// (or from entity ids) after every mutation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct EntityIndex {
    /// The layer the entity lives on
    pub layer: i32,
    /// The entity's position within its layer, in `0..num_entities(layer)`
    pub order: usize,
}

impl EntityIndex {
    /// Create an index from a layer and an order
    pub fn new(layer: i32, order: usize) -> Self {
        Self { layer, order }
    }
}

impl std::fmt::Display for EntityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.layer, self.order)
    }
}
