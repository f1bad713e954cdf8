//! Backend registry
//!
//! Owns execution backends and names them by generational [`BackendId`].
//! Modules keep only the id, so a module never owns or keeps alive the
//! backend it was bound against. Unregistering a backend bumps its slot's
//! generation; every id issued for the old backend is stale from then on.

use std::fmt;

use log::debug;
use parking_lot::RwLock;

use crate::backend::ExecutionBackend;

/// Handle naming one registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BackendId {
    index: u32,
    generation: u32,
}

impl BackendId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index, self.generation)
    }
}

struct Slot {
    generation: u32,
    backend: Option<Box<dyn ExecutionBackend>>,
}

#[derive(Default)]
struct Slots {
    entries: Vec<Slot>,
    free: Vec<u32>,
}

impl Slots {
    fn live(&self, id: BackendId) -> Option<&dyn ExecutionBackend> {
        let slot = self.entries.get(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.backend.as_deref()
    }
}

/// Thread-safe owner of execution backends.
#[derive(Default)]
pub struct BackendRegistry {
    slots: RwLock<Slots>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a backend and return its handle.
    pub fn register(&self, backend: Box<dyn ExecutionBackend>) -> BackendId {
        let mut slots = self.slots.write();

        if let Some(index) = slots.free.pop() {
            let slot = &mut slots.entries[index as usize];
            slot.backend = Some(backend);
            return BackendId {
                index,
                generation: slot.generation,
            };
        }

        let index = slots.entries.len() as u32;
        slots.entries.push(Slot {
            generation: 0,
            backend: Some(backend),
        });
        BackendId {
            index,
            generation: 0,
        }
    }

    /// Remove a backend, returning it to the caller for teardown.
    ///
    /// Does not check for modules still bound against it; their ids simply
    /// go stale. A slot whose generation is exhausted is retired rather than
    /// reused, so no stale id can ever name a live backend again.
    pub fn unregister(&self, id: BackendId) -> Option<Box<dyn ExecutionBackend>> {
        let mut slots = self.slots.write();
        let slot = slots.entries.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let backend = slot.backend.take()?;
        match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                slots.free.push(id.index);
            }
            None => debug!("backend slot {} retired", id.index),
        }
        Some(backend)
    }

    pub fn contains(&self, id: BackendId) -> bool {
        self.slots.read().live(id).is_some()
    }

    /// Run `f` against a live backend.
    ///
    /// The registry stays read-locked for the duration of `f`, so the backend
    /// cannot be unregistered underneath it. Returns `None` for a stale id.
    pub fn with_backend<R>(
        &self,
        id: BackendId,
        f: impl FnOnce(&dyn ExecutionBackend) -> R,
    ) -> Option<R> {
        let slots = self.slots.read();
        slots.live(id).map(f)
    }

    pub fn backend_name(&self, id: BackendId) -> Option<String> {
        self.with_backend(id, |backend| backend.name().to_string())
    }

    /// Number of live backends.
    pub fn len(&self) -> usize {
        self.slots
            .read()
            .entries
            .iter()
            .filter(|slot| slot.backend.is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("live", &self.len())
            .finish()
    }
}
