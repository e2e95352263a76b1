//! Chunked arena that owns the nodes of the cyclic NFA and symbol graphs.
//!
//! Both graphs contain cycles, so nodes cannot own each other. Instead an
//! [`Arena`] owns every node and hands out typed [`Id`]s; edges are ids and
//! the whole graph is freed when the arena drops. Chunks have a fixed
//! capacity and are never reallocated, so a reference obtained through an
//! id stays at the same address for the arena's lifetime.
use std::fmt::Debug;
use std::marker::PhantomData;

use nonmax::NonMaxU32;

/// Number of slots per chunk. A full chunk is sealed and never grows.
const CHUNK_LEN: usize = 1024;

/// A typed handle into an [`Arena`].
///
/// The phantom type prevents ids of one graph from indexing another.
/// `Option<Id<T>>` is the size of `Id<T>` itself.
pub struct Id<T> {
    index: NonMaxU32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    fn from_index(index: usize) -> Self {
        let index = match u32::try_from(index).ok().and_then(NonMaxU32::new) {
            Some(index) => index,
            None => panic!("arena capacity exceeded"),
        };
        Id {
            index,
            _marker: PhantomData,
        }
    }

    #[inline]
    fn index(&self) -> usize {
        self.index.get() as usize
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for Id<T> {}
impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<T> Eq for Id<T> {}
impl<T> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}
impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.index.get())
    }
}
impl<T> Default for Id<T> {
    fn default() -> Self {
        Id {
            index: NonMaxU32::ZERO,
            _marker: PhantomData,
        }
    }
}

/// A growable region of `T`s with stable addresses and O(chunks) teardown.
///
/// There is no per-object free; every node lives exactly as long as the
/// arena. New chunks are linked in on exhaustion and existing chunks are
/// left untouched, which is what makes the addresses stable.
pub struct Arena<T> {
    chunks: Vec<Vec<T>>,
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Arena { chunks: Vec::new() }
    }

    /// Moves `value` into the arena and returns its id.
    pub fn alloc(&mut self, value: T) -> Id<T> {
        if self.chunks.last().map_or(true, |c| c.len() == CHUNK_LEN) {
            self.chunks.push(Vec::with_capacity(CHUNK_LEN));
        }
        let chunk_index = self.chunks.len() - 1;
        let chunk = &mut self.chunks[chunk_index];
        let id = Id::from_index(chunk_index * CHUNK_LEN + chunk.len());
        chunk.push(value);
        id
    }

    /// Number of values allocated so far.
    pub fn len(&self) -> usize {
        match self.chunks.last() {
            Some(last) => (self.chunks.len() - 1) * CHUNK_LEN + last.len(),
            None => 0,
        }
    }

    /// Whether the arena holds no values.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Returns a reference to the value behind `id`, if it is in bounds.
    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.chunks
            .get(id.index() / CHUNK_LEN)
            .and_then(|c| c.get(id.index() % CHUNK_LEN))
    }

    /// Mutably iterates every allocated value in allocation order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.chunks.iter_mut().flatten()
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::ops::Index<Id<T>> for Arena<T> {
    type Output = T;

    #[inline]
    fn index(&self, id: Id<T>) -> &T {
        &self.chunks[id.index() / CHUNK_LEN][id.index() % CHUNK_LEN]
    }
}

impl<T> std::ops::IndexMut<Id<T>> for Arena<T> {
    #[inline]
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.chunks[id.index() / CHUNK_LEN][id.index() % CHUNK_LEN]
    }
}

impl<T: Debug> Debug for Arena<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.chunks.iter().flatten()).finish()
    }
}
