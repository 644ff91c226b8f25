//! Placed map entities and their kind capabilities

use crate::{EntityIndex, Value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Property key holding the default-destination flag
pub const DEFAULT_FLAG: &str = "default";

/// The kind of a placed entity
///
/// Tiles are static; every other kind is dynamic. Within a layer, static
/// entities always sort before dynamic entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tile,
    DynamicTile,
    Destination,
    Teletransporter,
    Npc,
    Chest,
    Door,
    Enemy,
    Sensor,
    Wall,
    Crystal,
    Block,
}

impl EntityKind {
    /// Get display name for UI
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Tile => "Tile",
            EntityKind::DynamicTile => "Dynamic tile",
            EntityKind::Destination => "Destination",
            EntityKind::Teletransporter => "Teletransporter",
            EntityKind::Npc => "NPC",
            EntityKind::Chest => "Chest",
            EntityKind::Door => "Door",
            EntityKind::Enemy => "Enemy",
            EntityKind::Sensor => "Sensor",
            EntityKind::Wall => "Wall",
            EntityKind::Crystal => "Crystal",
            EntityKind::Block => "Block",
        }
    }

    /// Returns all kind variants for UI enumeration
    pub fn all() -> &'static [EntityKind] {
        &[
            EntityKind::Tile,
            EntityKind::DynamicTile,
            EntityKind::Destination,
            EntityKind::Teletransporter,
            EntityKind::Npc,
            EntityKind::Chest,
            EntityKind::Door,
            EntityKind::Enemy,
            EntityKind::Sensor,
            EntityKind::Wall,
            EntityKind::Crystal,
            EntityKind::Block,
        ]
    }

    /// Whether entities of this kind sort after all static entities in a layer
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, EntityKind::Tile)
    }

    /// Whether entities of this kind can be resized
    pub fn is_resizable(&self) -> bool {
        matches!(
            self,
            EntityKind::Tile
                | EntityKind::DynamicTile
                | EntityKind::Teletransporter
                | EntityKind::Sensor
                | EntityKind::Wall
        )
    }

    /// The base size in pixels; resizable kinds grow in multiples of it
    pub fn base_size(&self) -> (u32, u32) {
        match self {
            EntityKind::Tile | EntityKind::DynamicTile => (8, 8),
            _ => (16, 16),
        }
    }

    /// Whether the given size is legal for this kind
    pub fn is_size_valid(&self, width: u32, height: u32) -> bool {
        let (base_width, base_height) = self.base_size();
        if self.is_resizable() {
            width > 0 && height > 0 && width % base_width == 0 && height % base_height == 0
        } else {
            width == base_width && height == base_height
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One placed object on the map
///
/// Created detached (no index), attached to an [`crate::EntityCollection`]
/// via `add_entities`, detached via `remove_entities`. The same object may
/// be detached and re-attached repeatedly; undo/redo reinserts the exact
/// same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapEntity {
    pub id: Uuid,
    pub kind: EntityKind,
    /// Unique among named entities while attached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub layer: i32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub properties: HashMap<String, Value>,
    /// Cached structural position, written only by the collection's rebuild step
    #[serde(skip)]
    index: Option<EntityIndex>,
}

impl MapEntity {
    /// Create a detached entity of the given kind at a position, with its base size
    pub fn new(kind: EntityKind, layer: i32, x: i32, y: i32) -> Self {
        let (width, height) = kind.base_size();
        Self {
            id: Uuid::new_v4(),
            kind,
            name: None,
            layer,
            x,
            y,
            width,
            height,
            properties: HashMap::new(),
            index: None,
        }
    }

    /// Set the name (builder style); an empty name means unnamed
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.name = if name.is_empty() { None } else { Some(name) };
        self
    }

    /// Set the size (builder style)
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set a property (builder style)
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Whether this entity sorts after all static entities in its layer
    pub fn is_dynamic(&self) -> bool {
        self.kind.is_dynamic()
    }

    /// Whether the given size is legal for this entity
    pub fn is_size_valid(&self, width: u32, height: u32) -> bool {
        self.kind.is_size_valid(width, height)
    }

    /// The bounding box as `(x, y, width, height)`
    pub fn bounding_box(&self) -> (i32, i32, u32, u32) {
        (self.x, self.y, self.width, self.height)
    }

    /// The cached structural position, `None` while detached
    ///
    /// Valid only until the next structural mutation of this entity's layer.
    pub fn index(&self) -> Option<EntityIndex> {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: EntityIndex) {
        self.index = Some(index);
    }

    pub(crate) fn clear_index(&mut self) {
        self.index = None;
    }

    /// Whether this is a destination carrying the default-destination flag
    pub fn is_default_destination(&self) -> bool {
        self.kind == EntityKind::Destination
            && self
                .properties
                .get(DEFAULT_FLAG)
                .and_then(Value::as_bool)
                .unwrap_or(false)
    }

    pub(crate) fn set_default_flag(&mut self, flag: bool) {
        if flag {
            self.properties.insert(DEFAULT_FLAG.to_string(), Value::Bool(true));
        } else {
            self.properties.remove(DEFAULT_FLAG);
        }
    }
}
