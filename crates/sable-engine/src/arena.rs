//! Generational arenas and the handles that index them.
//!
//! Every subsystem owns its objects in an [`Arena`]: Graphics owns sprites,
//! Physics owns bodies, the script engine owns scripts and the engine owns
//! actors. Other parts of the engine hold only the small `Copy` handles
//! minted by [`arena_key!`].
//!
//! A handle packs a *generation* counter in the high 32 bits and a slot
//! *index* in the low 32 bits. The generation is bumped every time a slot is
//! vacated, so a handle kept across a [`clear`](Arena::clear) resolves to
//! `None` instead of to whatever object reuses the slot.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

// ---------------------------------------------------------------------------
// ArenaKey
// ---------------------------------------------------------------------------

/// A generational handle type usable as an [`Arena`] key.
///
/// Implemented by the types declared with [`arena_key!`].
pub trait ArenaKey: Copy + Eq + Hash + fmt::Debug {
    /// Construct a handle from an index and generation.
    fn new(index: u32, generation: u32) -> Self;

    /// The index portion (low 32 bits).
    fn index(self) -> u32;

    /// The generation portion (high 32 bits).
    fn generation(self) -> u32;
}

/// Declare a generational handle type.
///
/// Layout: `[generation: u32 | index: u32]`. The type prints as
/// `Name(3v0)` with `{:?}` and `3v0` with `{}`.
#[macro_export]
macro_rules! arena_key {
    ($(#[$meta:meta])* $vis:vis struct $name:ident;) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name(u64);

        impl $name {
            /// Raw `u64` representation.
            #[inline]
            pub fn to_raw(self) -> u64 {
                self.0
            }

            /// Reconstruct from a raw `u64`.
            #[inline]
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl $crate::arena::ArenaKey for $name {
            #[inline]
            fn new(index: u32, generation: u32) -> Self {
                Self((generation as u64) << 32 | index as u64)
            }

            #[inline]
            fn index(self) -> u32 {
                self.0 as u32
            }

            #[inline]
            fn generation(self) -> u32 {
                (self.0 >> 32) as u32
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                use $crate::arena::ArenaKey;
                write!(
                    f,
                    "{}({}v{})",
                    stringify!($name),
                    self.index(),
                    self.generation()
                )
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                use $crate::arena::ArenaKey;
                write!(f, "{}v{}", self.index(), self.generation())
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Owning storage addressed by generational handles.
///
/// Vacated indices are reused lowest first. Iteration visits live values in
/// index order, so once the arena is cleared it stays in insertion order as
/// long as removals only undo the most recent inserts.
#[derive(Debug)]
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free_indices: BinaryHeap<Reverse<u32>>,
    len: usize,
    _key: PhantomData<fn() -> K>,
}

impl<K: ArenaKey, T> Arena<K, T> {
    /// Create a new, empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_indices: BinaryHeap::new(),
            len: 0,
            _key: PhantomData,
        }
    }

    /// Store `value` and return its handle.
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(Reverse(index)) = self.free_indices.pop() {
            // Generation was already bumped when the slot was vacated.
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            K::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            K::new(index, 0)
        }
    }

    /// Remove and return the value behind `key`.
    ///
    /// Returns `None` if the handle is stale or was never issued.
    pub fn remove(&mut self, key: K) -> Option<T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(Reverse(key.index()));
        self.len -= 1;
        Some(value)
    }

    /// Borrow the value behind `key`.
    pub fn get(&self, key: K) -> Option<&T> {
        let slot = self.slots.get(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_ref()
    }

    /// Mutably borrow the value behind `key`.
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let slot = self.slots.get_mut(key.index() as usize)?;
        if slot.generation != key.generation() {
            return None;
        }
        slot.value.as_mut()
    }

    /// Returns `true` if `key` refers to a live value.
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Drop every value and invalidate every outstanding handle.
    ///
    /// Slots are kept for reuse, so the next inserts take indices
    /// `0, 1, 2, ...`.
    pub fn clear(&mut self) {
        self.free_indices.clear();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            self.free_indices.push(Reverse(index as u32));
        }
        self.len = 0;
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the arena holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live `(handle, value)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (K::new(index as u32, slot.generation), value))
        })
    }

    /// Iterate live `(handle, value)` pairs mutably in index order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (K::new(index as u32, generation), value))
        })
    }

    /// Iterate live values in index order.
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().filter_map(|slot| slot.value.as_ref())
    }

    /// Iterate live values mutably in index order.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.slots.iter_mut().filter_map(|slot| slot.value.as_mut())
    }
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
