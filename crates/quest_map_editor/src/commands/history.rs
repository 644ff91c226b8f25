//! Undo/redo history

use super::EditCommand;
use quest_map_core::EntityCollection;
use uuid::Uuid;

/// Default maximum number of undoable steps
pub const DEFAULT_HISTORY_LIMIT: usize = 64;

/// A bounded, linear undo/redo log
///
/// Executed commands sit in a single vector with a cursor: entries below
/// the cursor are undoable, entries at and above it are redoable.
/// Executing a new command truncates the redo tail (no branching).
#[derive(Debug)]
pub struct CommandHistory {
    commands: Vec<EditCommand>,
    cursor: usize,
    limit: usize,
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }

    /// Create a history keeping at most `limit` undoable steps
    pub fn with_limit(limit: usize) -> Self {
        assert!(limit > 0, "history limit must be positive");
        Self {
            commands: Vec::new(),
            cursor: 0,
            limit,
        }
    }

    /// Apply a command and record it for undo; returns the affected ids
    ///
    /// When the command carries the same merge id as its predecessor and
    /// allows merging (a continuing drag gesture), the two fold into one
    /// undo step: parameters combine, nothing re-executes, and a single
    /// undo restores the state from before the first of the merged edits.
    pub fn execute(&mut self, mut command: EditCommand, map: &mut EntityCollection) -> Vec<Uuid> {
        command.redo(map);
        let affected = command.affected_ids();
        self.commands.truncate(self.cursor);

        let unmerged = match self.commands.last_mut() {
            Some(previous)
                if command.allows_merge()
                    && previous.merge_id().is_some()
                    && previous.merge_id() == command.merge_id() =>
            {
                previous.merge_from(command).err()
            }
            _ => Some(command),
        };

        if let Some(command) = unmerged {
            if self.commands.len() == self.limit {
                // Oldest step falls off; undo depth stays bounded
                self.commands.remove(0);
            }
            self.commands.push(command);
        }
        self.cursor = self.commands.len();
        affected
    }

    /// Revert the most recent command; returns the affected ids
    pub fn undo(&mut self, map: &mut EntityCollection) -> Option<Vec<Uuid>> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        let command = &mut self.commands[self.cursor];
        command.undo(map);
        Some(command.affected_ids())
    }

    /// Re-apply the most recently undone command; returns the affected ids
    pub fn redo(&mut self, map: &mut EntityCollection) -> Option<Vec<Uuid>> {
        if self.cursor == self.commands.len() {
            return None;
        }
        let command = &mut self.commands[self.cursor];
        command.redo(map);
        self.cursor += 1;
        Some(command.affected_ids())
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    /// Description of the next undo step, for menu surfaces
    pub fn undo_text(&self) -> Option<&'static str> {
        self.cursor
            .checked_sub(1)
            .map(|position| self.commands[position].text())
    }

    /// Description of the next redo step, for menu surfaces
    pub fn redo_text(&self) -> Option<&'static str> {
        self.commands.get(self.cursor).map(EditCommand::text)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Forget all recorded steps
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
    }
}
