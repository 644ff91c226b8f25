//! Map documents
//!
//! This module handles the map file model, save/load, and the editing
//! session that wires the entity index, undo history and selection.

mod file;

pub use file::DocumentError;

use crate::commands::{CommandHistory, EditCommand};
use crate::selection::EntitySelection;
use quest_map_core::{EntityCollection, EntityIndex, MapEntity};
use serde::{Deserialize, Serialize};
use std::cell::{Ref, RefCell};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use uuid::Uuid;

/// Current map file format version
pub const FORMAT_VERSION: u32 = 1;

fn default_tile_size() -> u32 {
    16
}

fn default_max_layer() -> i32 {
    2
}

/// Serde model of a map file
///
/// Entities are stored in natural order: layers ascending, then order,
/// statics before dynamics within each layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapData {
    pub version: u32,
    pub name: String,
    /// Map width in pixels
    pub width: u32,
    /// Map height in pixels
    pub height: u32,
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    #[serde(default)]
    pub min_layer: i32,
    #[serde(default = "default_max_layer")]
    pub max_layer: i32,
    #[serde(default)]
    pub entities: Vec<MapEntity>,
}

impl MapData {
    /// Create an empty map with the default layer range
    pub fn new(name: String, width: u32, height: u32) -> Self {
        Self {
            version: FORMAT_VERSION,
            name,
            width,
            height,
            tile_size: default_tile_size(),
            min_layer: 0,
            max_layer: default_max_layer(),
            entities: Vec::new(),
        }
    }

    /// Build the entity index by replaying the list in ascending index order
    pub fn build_collection(&self) -> EntityCollection {
        let mut collection = EntityCollection::new(self.min_layer, self.max_layer);
        for entity in &self.entities {
            let layer = entity.layer;
            let order = if entity.is_dynamic() {
                collection.num_entities(layer)
            } else {
                collection.num_static_entities(layer)
            };
            collection.add_entities(vec![(entity.clone(), EntityIndex::new(layer, order))]);
        }
        collection
    }
}

/// An open map being edited
///
/// Owns the entity index, the undo history and the selection. All
/// mutation is routed through [`EditCommand`]s so the history stays
/// authoritative; views read the collection and the selection.
#[derive(Debug)]
pub struct MapDocument {
    name: String,
    width: u32,
    height: u32,
    tile_size: u32,
    path: Option<PathBuf>,
    map: EntityCollection,
    history: CommandHistory,
    selection: Rc<RefCell<EntitySelection>>,
    dirty: bool,
}

impl MapDocument {
    /// Create a new empty document
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::from_data(MapData::new(name.into(), width, height), None)
    }

    /// Load a document from a map file
    pub fn open(path: &Path) -> Result<Self, DocumentError> {
        let data = MapData::load(path)?;
        log::info!(
            "Opened map '{}' with {} entities",
            data.name,
            data.entities.len()
        );
        Ok(Self::from_data(data, Some(path.to_path_buf())))
    }

    fn from_data(data: MapData, path: Option<PathBuf>) -> Self {
        let mut map = data.build_collection();
        let selection = Rc::new(RefCell::new(EntitySelection::new()));
        map.subscribe(&selection);
        Self {
            name: data.name,
            width: data.width,
            height: data.height,
            tile_size: data.tile_size,
            path,
            map,
            history: CommandHistory::new(),
            selection,
            dirty: false,
        }
    }

    /// Save to the document's current path
    pub fn save(&mut self) -> Result<(), DocumentError> {
        let path = self.path.clone().ok_or(DocumentError::NoPath)?;
        self.save_as(&path)
    }

    /// Save to a new path, which becomes the document's path
    pub fn save_as(&mut self, path: &Path) -> Result<(), DocumentError> {
        self.to_data().save(path)?;
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        log::info!("Saved map '{}' to {}", self.name, path.display());
        Ok(())
    }

    fn to_data(&self) -> MapData {
        MapData {
            version: FORMAT_VERSION,
            name: self.name.clone(),
            width: self.width,
            height: self.height,
            tile_size: self.tile_size,
            min_layer: self.map.min_layer(),
            max_layer: self.map.max_layer(),
            entities: self.map.iter().cloned().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether there are unsaved changes
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The entity index; read-only, mutation goes through commands
    pub fn map(&self) -> &EntityCollection {
        &self.map
    }

    pub fn selection(&self) -> Ref<'_, EntitySelection> {
        self.selection.borrow()
    }

    pub fn select(&mut self, index: EntityIndex) {
        self.selection.borrow_mut().select(index);
    }

    pub fn toggle_selection(&mut self, index: EntityIndex) {
        self.selection.borrow_mut().toggle(index);
    }

    pub fn clear_selection(&mut self) {
        self.selection.borrow_mut().clear();
    }

    /// Ids of the currently selected entities
    pub fn selected_ids(&self) -> Vec<Uuid> {
        self.selection.borrow().ids(&self.map)
    }

    /// Apply a command
    ///
    /// The affected entities end up selected at their new slots; their
    /// indices are returned so views can follow them.
    pub fn execute(&mut self, command: EditCommand) -> Vec<EntityIndex> {
        log::debug!("Executing: {}", command.text());
        let affected = self.history.execute(command, &mut self.map);
        self.dirty = true;
        self.reselect(&affected)
    }

    /// Revert the most recent command
    pub fn undo(&mut self) -> bool {
        let text = self.history.undo_text();
        match self.history.undo(&mut self.map) {
            Some(affected) => {
                log::debug!("Undid: {}", text.unwrap_or(""));
                self.dirty = true;
                self.reselect(&affected);
                true
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone command
    pub fn redo(&mut self) -> bool {
        let text = self.history.redo_text();
        match self.history.redo(&mut self.map) {
            Some(affected) => {
                log::debug!("Redid: {}", text.unwrap_or(""));
                self.dirty = true;
                self.reselect(&affected);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_text(&self) -> Option<&'static str> {
        self.history.undo_text()
    }

    pub fn redo_text(&self) -> Option<&'static str> {
        self.history.redo_text()
    }

    fn reselect(&mut self, ids: &[Uuid]) -> Vec<EntityIndex> {
        let mut selection = self.selection.borrow_mut();
        selection.select_ids(&self.map, ids);
        selection.iter().collect()
    }
}
