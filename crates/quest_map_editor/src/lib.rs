//! Editing engine for quest maps
//!
//! Builds on `quest_map_core`'s entity index to make every user-visible
//! edit reversible:
//! - `EditCommand` - reversible, optionally mergeable editing commands
//! - `CommandHistory` - bounded linear undo/redo log
//! - `EntitySelection` - selection tracking across structural edits
//! - `MapDocument` - an open map wiring index, history and selection
//! - `MapData` - the map file model (save/load)

pub mod commands;
pub mod document;
pub mod selection;

pub use commands::{CommandError, CommandHistory, EditCommand, DEFAULT_HISTORY_LIMIT};
pub use document::{DocumentError, MapData, MapDocument, FORMAT_VERSION};
pub use selection::EntitySelection;
