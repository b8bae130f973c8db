//! Generational arena backing the body store.
//!
//! Removed entries are recycled through a free list. Every reuse bumps the
//! entry's generation, so a [`BodyHandle`] issued before the removal no
//! longer resolves.

use sim_types::BodyHandle;

#[derive(Debug, Clone)]
struct Entry<T> {
    generation: u32,
    value: Option<T>,
}

/// Generation-checked storage addressed by [`BodyHandle`].
#[derive(Debug, Clone)]
pub struct Arena<T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    /// Create an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no live values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, reusing a free entry when one exists.
    pub fn insert(&mut self, value: T) -> BodyHandle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let entry = &mut self.entries[index as usize];
            entry.generation = entry.generation.wrapping_add(1);
            entry.value = Some(value);
            return BodyHandle::new(index, entry.generation);
        }

        // Arena sizes are bounded far below u32::MAX in practice
        #[allow(clippy::cast_possible_truncation)]
        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 0,
            value: Some(value),
        });
        BodyHandle::new(index, 0)
    }

    /// Remove the value behind `handle`, if it is still live.
    pub fn remove(&mut self, handle: BodyHandle) -> Option<T> {
        let entry = self.entries.get_mut(handle.index())?;
        if entry.generation != handle.generation() {
            return None;
        }
        let value = entry.value.take()?;
        #[allow(clippy::cast_possible_truncation)]
        self.free.push(handle.index() as u32);
        self.len -= 1;
        Some(value)
    }

    /// Whether `handle` refers to a live value.
    #[must_use]
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Get the value behind `handle`.
    #[must_use]
    pub fn get(&self, handle: BodyHandle) -> Option<&T> {
        self.entries
            .get(handle.index())
            .filter(|e| e.generation == handle.generation())
            .and_then(|e| e.value.as_ref())
    }

    /// Get the value behind `handle` mutably.
    #[must_use]
    pub fn get_mut(&mut self, handle: BodyHandle) -> Option<&mut T> {
        self.entries
            .get_mut(handle.index())
            .filter(|e| e.generation == handle.generation())
            .and_then(|e| e.value.as_mut())
    }

    /// Iterate over live values in index order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyHandle, &T)> {
        self.entries.iter().enumerate().filter_map(|(i, e)| {
            #[allow(clippy::cast_possible_truncation)]
            let handle = BodyHandle::new(i as u32, e.generation);
            e.value.as_ref().map(|v| (handle, v))
        })
    }

    /// Iterate over live values mutably in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyHandle, &mut T)> {
        self.entries.iter_mut().enumerate().filter_map(|(i, e)| {
            #[allow(clippy::cast_possible_truncation)]
            let handle = BodyHandle::new(i as u32, e.generation);
            e.value.as_mut().map(|v| (handle, v))
        })
    }
}
