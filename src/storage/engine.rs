//! Fixed-Capacity Slot Store
//!
//! This module implements the only shared state of the server: a fixed
//! number of fixed-length text slots, addressed by index.
//!
//! ## Design Decisions
//!
//! 1. **Fixed Layout**: `SLOT_COUNT` slots of `SLOT_CAPACITY` bytes each,
//!    allocated once. The store never grows or shrinks.
//! 2. **Checked Access**: every index and every value length is validated
//!    before a slot is touched.
//! 3. **Per-Slot RwLock**: each slot has its own lock, so connections working
//!    on different slots never contend, and a reader always sees a whole value.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        SlotStore                            │
//! │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌───────┐  │
//! │  │ Slot 0  │ │ Slot 1  │ │ Slot 2  │ │ Slot 3  │ │Slot 4 │  │
//! │  │ RwLock  │ │ RwLock  │ │ RwLock  │ │ RwLock  │ │RwLock │  │
//! │  │ [u8;20] │ │ [u8;20] │ │ [u8;20] │ │ [u8;20] │ │[u8;20]│  │
//! │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └───────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

/// Number of slots in the store.
pub const SLOT_COUNT: usize = 5;

/// Size of one slot in bytes, terminator included.
///
/// A stored value may therefore be at most `SLOT_CAPACITY - 1` bytes long.
pub const SLOT_CAPACITY: usize = 20;

/// Values every slot holds when the process starts.
pub const SEED_VALUES: [&str; SLOT_COUNT] = [
    "Yarara",
    "Tejon",
    "Pibe Play",
    "Dinosaurio",
    "Zapato",
];

/// Errors returned by store operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The index does not address a slot
    #[error("index {index} out of range (store has {len} slots)")]
    OutOfRange { index: usize, len: usize },

    /// The value does not fit in a slot
    #[error("value of {len} bytes does not fit in a slot (max: {max})")]
    ValueTooLong { len: usize, max: usize },

    /// The value contains a NUL byte
    #[error("value contains a NUL byte")]
    EmbeddedNul,

    /// Seeding was given the wrong number of values
    #[error("expected {expected} seed values, got {actual}")]
    SlotCountMismatch { expected: usize, actual: usize },
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// One fixed-length storage location.
#[derive(Debug, Clone, Copy)]
struct Slot {
    buf: [u8; SLOT_CAPACITY],
    len: usize,
}

impl Slot {
    /// Builds a slot from an already validated value.
    fn from_validated(value: &[u8]) -> Self {
        let mut buf = [0u8; SLOT_CAPACITY];
        buf[..value.len()].copy_from_slice(value);
        Self {
            buf,
            len: value.len(),
        }
    }

    #[inline]
    fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }
}

/// Checks a value against the slot invariant: shorter than the capacity and NUL-free.
pub fn validate_value(value: &[u8]) -> StoreResult<()> {
    if value.len() >= SLOT_CAPACITY {
        return Err(StoreError::ValueTooLong {
            len: value.len(),
            max: SLOT_CAPACITY - 1,
        });
    }
    if value.contains(&0) {
        return Err(StoreError::EmbeddedNul);
    }
    Ok(())
}

/// Counters describing store usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Successful and failed `get` calls
    pub gets: u64,
    /// Successful `set` calls
    pub sets: u64,
    /// Calls rejected with an error
    pub rejected: u64,
}

/// The process-wide slot store.
///
/// Wrap it in an `Arc` and hand a clone to every connection; all operations
/// take `&self`.
///
/// # Example
///
/// ```
/// use slotkv::storage::SlotStore;
/// use bytes::Bytes;
///
/// let store = SlotStore::new();
/// assert_eq!(store.get(0).unwrap(), Bytes::from("Yarara"));
///
/// store.set(2, "Gato").unwrap();
/// assert_eq!(store.get(2).unwrap(), Bytes::from("Gato"));
///
/// assert!(store.get(99).is_err());
/// ```
pub struct SlotStore {
    slots: [RwLock<Slot>; SLOT_COUNT],

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: total successful SET operations
    set_count: AtomicU64,

    /// Statistics: operations rejected by validation
    rejected_count: AtomicU64,
}

impl std::fmt::Debug for SlotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotStore")
            .field("slots", &SLOT_COUNT)
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl Default for SlotStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotStore {
    /// Creates a store seeded with [`SEED_VALUES`].
    pub fn new() -> Self {
        Self::with_slots(SEED_VALUES.map(|v| Slot::from_validated(v.as_bytes())))
    }

    /// Creates a store seeded with the given values, in index order.
    ///
    /// Exactly `SLOT_COUNT` values are required, each satisfying the slot invariant.
    pub fn from_values<I, V>(values: I) -> StoreResult<Self>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[u8]>,
    {
        let mut slots = [Slot::from_validated(b""); SLOT_COUNT];
        let mut count = 0;

        for value in values {
            let value = value.as_ref();
            validate_value(value)?;
            if count < SLOT_COUNT {
                slots[count] = Slot::from_validated(value);
            }
            count += 1;
        }

        if count != SLOT_COUNT {
            return Err(StoreError::SlotCountMismatch {
                expected: SLOT_COUNT,
                actual: count,
            });
        }

        Ok(Self::with_slots(slots))
    }

    fn with_slots(slots: [Slot; SLOT_COUNT]) -> Self {
        Self {
            slots: slots.map(RwLock::new),
            get_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        SLOT_COUNT
    }

    /// A store always has slots; provided for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Looks up the lock for `index`, or reports it out of range.
    fn slot(&self, index: usize) -> StoreResult<&RwLock<Slot>> {
        self.slots.get(index).ok_or_else(|| {
            self.rejected_count.fetch_add(1, Ordering::Relaxed);
            StoreError::OutOfRange {
                index,
                len: SLOT_COUNT,
            }
        })
    }

    // A panicking writer can only ever leave a complete slot behind (the
    // write is a single struct assignment), so poisoned locks are safe to reuse.
    fn read_slot(lock: &RwLock<Slot>) -> RwLockReadGuard<'_, Slot> {
        lock.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slot(lock: &RwLock<Slot>) -> RwLockWriteGuard<'_, Slot> {
        lock.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the current value of slot `index`.
    pub fn get(&self, index: usize) -> StoreResult<Bytes> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let lock = self.slot(index)?;
        let slot = Self::read_slot(lock);
        Ok(Bytes::copy_from_slice(slot.as_bytes()))
    }

    /// Overwrites slot `index` with `value`.
    ///
    /// On error the slot is left untouched.
    pub fn set(&self, index: usize, value: impl AsRef<[u8]>) -> StoreResult<()> {
        let value = value.as_ref();
        let lock = self.slot(index)?;

        if let Err(e) = validate_value(value) {
            self.rejected_count.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        let replacement = Slot::from_validated(value);
        *Self::write_slot(lock) = replacement;

        self.set_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns every slot's value in index order.
    ///
    /// Each value is read atomically; the snapshot as a whole is not.
    pub fn snapshot(&self) -> Vec<Bytes> {
        self.slots
            .iter()
            .map(|lock| Bytes::copy_from_slice(Self::read_slot(lock).as_bytes()))
            .collect()
    }

    /// Returns usage counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            gets: self.get_count.load(Ordering::Relaxed),
            sets: self.set_count.load(Ordering::Relaxed),
            rejected: self.rejected_count.load(Ordering::Relaxed),
        }
    }
}
