//! Map file save/load operations

use super::MapData;
use std::path::Path;
use thiserror::Error;

/// Errors from map file operations
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("No file path set")]
    NoPath,
}

impl MapData {
    /// Load a map from a file
    pub fn load(path: &Path) -> Result<Self, DocumentError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| DocumentError::Io(e.to_string()))?;
        let data: MapData =
            serde_json::from_str(&content).map_err(|e| DocumentError::Parse(e.to_string()))?;
        Ok(data)
    }

    /// Save the map to a file
    pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| DocumentError::Serialize(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| DocumentError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quest_map_core::{EntityKind, MapEntity};

    #[test]
    fn test_map_data_json_round_trip() {
        let mut data = MapData::new("cave".to_string(), 320, 240);
        data.entities.push(
            MapEntity::new(EntityKind::Tile, 0, 8, 8)
                .with_size(16, 16)
                .with_property("pattern", "wall.1"),
        );
        data.entities
            .push(MapEntity::new(EntityKind::Chest, 1, 64, 64).with_name("treasure"));

        let json = serde_json::to_string_pretty(&data).unwrap();
        let restored: MapData = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.name, "cave");
        assert_eq!(restored.entities.len(), 2);
        assert_eq!(restored.entities, data.entities);
    }

    #[test]
    fn test_build_collection_partitions_layers() {
        let mut data = MapData::new("cave".to_string(), 320, 240);
        // Out-of-order input: the dynamic entity comes first in the list
        data.entities
            .push(MapEntity::new(EntityKind::Npc, 0, 0, 0).with_name("sage"));
        data.entities.push(MapEntity::new(EntityKind::Tile, 0, 0, 0));
        data.entities.push(MapEntity::new(EntityKind::Tile, 2, 0, 0));

        let collection = data.build_collection();
        assert_eq!(collection.len(), 3);
        assert_eq!(collection.num_entities(0), 2);
        assert_eq!(collection.num_static_entities(0), 1);
        // The tile sorted in front of the NPC
        let first = collection
            .get_entity(quest_map_core::EntityIndex::new(0, 0))
            .unwrap();
        assert_eq!(first.kind, EntityKind::Tile);
    }
}
