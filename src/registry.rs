//! Process-wide registry of live plotters.
//!
//! One mutex guards the table. It exists so that [`flush_all`] can reach
//! every open output stream, and so that instance ids are recycled.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use crate::log::debug;

/// An output stream shared between a plotter and the registry.
pub type SharedSink = Arc<Mutex<Box<dyn Write + Send>>>;

pub fn shared_sink(w: impl Write + Send + 'static) -> SharedSink {
    Arc::new(Mutex::new(Box::new(w)))
}

enum Slot {
    Free,
    Live(Option<Weak<Mutex<Box<dyn Write + Send>>>>),
}

struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    /// Fill the lowest free slot, or grow the table.
    fn insert(&mut self, slot: Slot) -> usize {
        match self.slots.iter().position(|s| matches!(s, Slot::Free)) {
            Some(id) => {
                self.slots[id] = slot;
                id
            }
            None => {
                self.slots.push(slot);
                self.slots.len() - 1
            }
        }
    }

    fn remove(&mut self, id: usize) {
        if let Some(slot) = self.slots.get_mut(id) {
            *slot = Slot::Free;
        }
        while matches!(self.slots.last(), Some(Slot::Free)) {
            self.slots.pop();
        }
    }
}

static REGISTRY: Mutex<Registry> = Mutex::new(Registry { slots: Vec::new() });

fn registry() -> MutexGuard<'static, Registry> {
    REGISTRY.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Take the lowest free id for a new instance.
pub fn register(sink: Option<&SharedSink>) -> usize {
    let id = registry().insert(Slot::Live(sink.map(Arc::downgrade)));
    debug!(id, "plotter registered");
    id
}

pub fn unregister(id: usize) {
    registry().remove(id);
    debug!(id, "plotter unregistered");
}

/// Number of registered instances.
pub fn live_count() -> usize {
    registry().slots.iter().filter(|s| matches!(s, Slot::Live(_))).count()
}

/// Flush the output stream of every live plotter. All streams are tried;
/// the first error is returned.
pub fn flush_all() -> io::Result<()> {
    let sinks: Vec<SharedSink> = registry()
        .slots
        .iter()
        .filter_map(|s| match s {
            Slot::Live(Some(w)) => w.upgrade(),
            _ => None,
        })
        .collect();
    let mut first_err = None;
    for sink in sinks {
        let mut guard = sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = guard.flush() {
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}
