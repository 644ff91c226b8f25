//! Change notification protocol
//!
//! Every structural mutation of an [`crate::EntityCollection`] emits an
//! `AboutTo*` event strictly before the mutation and the matching post
//! event strictly after, synchronously within the same call stack.
//! Indices inside an `AboutTo*` event refer to pre-mutation state; indices
//! inside a post event refer to post-mutation state (removal post events
//! report the slots the entities formerly occupied). Observers may resolve
//! stale indices only within this window.

use crate::EntityIndex;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use uuid::Uuid;

/// A structural change notification
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// A sorted batch of entities is about to be inserted at `indices`
    AboutToAddEntities { indices: Vec<EntityIndex> },
    /// The batch was inserted; `indices` are now valid slots
    EntitiesAdded { indices: Vec<EntityIndex> },
    /// The entities at `indices` (sorted ascending, pre-mutation) are about
    /// to be detached
    AboutToRemoveEntities { indices: Vec<EntityIndex> },
    /// The batch was detached; `indices` are the slots they occupied
    EntitiesRemoved { indices: Vec<EntityIndex> },
    /// An entity is about to move within its layer
    AboutToChangeEntityOrder {
        layer: i32,
        old_order: usize,
        new_order: usize,
    },
    /// The within-layer move completed
    EntityOrderChanged {
        layer: i32,
        old_order: usize,
        new_order: usize,
    },
    /// An entity is about to move to another layer
    AboutToChangeEntityLayer {
        old_index: EntityIndex,
        new_layer: i32,
    },
    /// The cross-layer move completed
    EntityLayerChanged {
        id: Uuid,
        old_index: EntityIndex,
        new_index: EntityIndex,
    },
}

/// An observer of structural changes (selections, views)
///
/// Handlers run inside the mutating call; they must not re-enter a
/// mutating call on the same collection (the brackets are not nestable).
pub trait MapObserver {
    fn on_map_event(&mut self, event: &MapEvent);
}

/// Registry of observers notified synchronously, in subscription order
///
/// Observers are held weakly; dropped observers are pruned on the next
/// dispatch.
#[derive(Default)]
pub struct ChangeNotifier {
    observers: Vec<Weak<RefCell<dyn MapObserver>>>,
}

impl ChangeNotifier {
    /// Register an observer
    pub fn subscribe<O: MapObserver + 'static>(&mut self, observer: &Rc<RefCell<O>>) {
        let observer: Rc<RefCell<dyn MapObserver>> = observer.clone();
        self.observers.push(Rc::downgrade(&observer));
    }

    /// Dispatch an event to every live observer
    pub fn notify(&mut self, event: &MapEvent) {
        self.observers.retain(|observer| match observer.upgrade() {
            Some(observer) => {
                observer.borrow_mut().on_map_event(event);
                true
            }
            None => false,
        });
    }

    /// Number of live observers
    pub fn num_observers(&self) -> usize {
        self.observers
            .iter()
            .filter(|observer| observer.strong_count() > 0)
            .count()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("observers", &self.observers.len())
            .finish()
    }
}
