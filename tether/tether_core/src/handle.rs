//! Generational handles for objects that cross the C ABI.
//!
//! Generated code can only carry fixed-width integers, so runtime objects
//! are stored in a [`HandleTable`] and referred to by a [`Handle`]: a slot
//! index plus the generation the slot had when the handle was issued. Every
//! removal bumps the slot's generation, so a handle that outlived its object
//! is rejected instead of aliasing whatever reuses the slot. A slot that
//! reaches the last generation is retired rather than wrapped.
//!
//! # Examples
//!
//! ```
//! use tether_core::handle::{Handle, HandleTable};
//!
//! let table = HandleTable::new();
//! let handle = table.insert("worker").unwrap();
//!
//! // Handles round-trip through a plain integer.
//! let raw = handle.into_raw();
//! let decoded = Handle::<&str>::from_raw(raw).unwrap();
//! assert_eq!(table.remove(decoded).unwrap(), "worker");
//!
//! // The slot's generation moved on, so the old value is now stale.
//! assert!(table.remove(decoded).is_err());
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::num::NonZeroU32;

use parking_lot::Mutex;

use crate::error::HandleError;

/// A typed, generation-checked reference into a [`HandleTable`].
///
/// The raw encoding packs the generation into the high 32 bits and the slot
/// index into the low 32 bits. Generations are never zero, so the raw value
/// is never zero and `0` stays free as the "no handle" sentinel. Any raw
/// value whose high word is zero is rejected by [`Handle::from_raw`].
pub struct Handle<T> {
    index: u32,
    generation: NonZeroU32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    fn new(index: u32, generation: NonZeroU32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Decode a raw integer produced by [`Handle::into_raw`].
    pub fn from_raw(raw: u64) -> Result<Self, HandleError> {
        let generation = NonZeroU32::new((raw >> 32) as u32).ok_or(HandleError::Invalid(raw))?;
        Ok(Self::new(raw as u32, generation))
    }

    /// Encode this handle as a non-zero integer.
    pub fn into_raw(self) -> u64 {
        (u64::from(self.generation.get()) << 32) | u64::from(self.index)
    }

    /// The slot index this handle points at.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// The generation this handle was issued with.
    pub fn generation(&self) -> u32 {
        self.generation.get()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("index", &self.index)
            .field("generation", &self.generation)
            .finish()
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.into_raw())
    }
}

struct Slot<T> {
    generation: NonZeroU32,
    value: Option<T>,
}

struct Slots<T> {
    entries: Vec<Slot<T>>,
    free: Vec<u32>,
    occupied: usize,
}

impl<T> Slots<T> {
    fn slot(&self, handle: Handle<T>) -> Result<&Slot<T>, HandleError> {
        match self.entries.get(handle.index as usize) {
            Some(slot) if slot.generation == handle.generation && slot.value.is_some() => Ok(slot),
            Some(_) => Err(HandleError::Stale(handle.into_raw())),
            None => Err(HandleError::Invalid(handle.into_raw())),
        }
    }
}

/// A mutex-guarded table of owned values addressed by [`Handle`]s.
///
/// The lock is only held for the table operation itself; callers that need
/// to block on a stored object clone it out (or remove it) first.
pub struct HandleTable<T> {
    slots: Mutex<Slots<T>>,
}

impl<T> HandleTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: Vec::new(),
                free: Vec::new(),
                occupied: 0,
            }),
        }
    }

    /// Store a value and return the handle that now owns it.
    ///
    /// Fails with [`HandleError::Exhausted`] only when every addressable slot
    /// is occupied.
    pub fn insert(&self, value: T) -> Result<Handle<T>, HandleError> {
        let mut slots = self.slots.lock();

        let index = match slots.free.pop() {
            Some(index) => index,
            None => {
                let index =
                    u32::try_from(slots.entries.len()).map_err(|_| HandleError::Exhausted)?;
                slots.entries.push(Slot {
                    generation: NonZeroU32::MIN,
                    value: None,
                });
                index
            }
        };

        let slot = &mut slots.entries[index as usize];
        slot.value = Some(value);
        let handle = Handle::new(index, slot.generation);
        slots.occupied += 1;

        Ok(handle)
    }

    /// Remove the value a handle owns, invalidating every copy of the handle.
    pub fn remove(&self, handle: Handle<T>) -> Result<T, HandleError> {
        let mut slots = self.slots.lock();
        slots.slot(handle)?;

        let slot = &mut slots.entries[handle.index as usize];
        let value = slot.value.take().ok_or(HandleError::Stale(handle.into_raw()))?;

        // A slot whose generations are used up is never reissued, so no old
        // handle can come back to life.
        let reusable = match slot.generation.checked_add(1) {
            Some(next) => {
                slot.generation = next;
                true
            }
            None => false,
        };

        if reusable {
            slots.free.push(handle.index);
        }
        slots.occupied -= 1;

        Ok(value)
    }

    /// Decode `raw` and remove the value it owns.
    pub fn remove_raw(&self, raw: u64) -> Result<T, HandleError> {
        self.remove(Handle::from_raw(raw)?)
    }

    /// Run `f` against the value a handle refers to, under the table lock.
    pub fn with<R>(&self, handle: Handle<T>, f: impl FnOnce(&T) -> R) -> Result<R, HandleError> {
        let slots = self.slots.lock();
        let slot = slots.slot(handle)?;
        match &slot.value {
            Some(value) => Ok(f(value)),
            None => Err(HandleError::Stale(handle.into_raw())),
        }
    }

    /// Number of live values in the table.
    pub fn len(&self) -> usize {
        self.slots.lock().occupied
    }

    /// Whether the table holds no live values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Clone> HandleTable<T> {
    /// Clone the value a raw handle refers to out of the table.
    pub fn get_cloned_raw(&self, raw: u64) -> Result<T, HandleError> {
        self.with(Handle::from_raw(raw)?, T::clone)
    }
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for HandleTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.lock();
        f.debug_struct("HandleTable")
            .field("capacity", &slots.entries.len())
            .field("occupied", &slots.occupied)
            .finish()
    }
}
