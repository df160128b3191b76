//! Change notification and persistence.
//!
//! Stores do not write to storage themselves. After each mutation the
//! editor emits a [`StoreChange`] to its observers; [`Persister`] is the
//! observer that serializes the changed store, once the hydration gate is
//! open.

use std::fmt;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use super::hydration::HydrationGate;
use super::rune::RuneStore;
use super::slot::SlotStore;
use super::storage::{KeyValueStore, StorageError, StorageKeys};

/// Which store changed, with its new value.
#[derive(Debug, Clone, Copy)]
pub enum StoreChange<'a> {
    Slots(&'a SlotStore),
    Runes(&'a RuneStore),
}

/// Receives a notification after every store mutation.
pub trait StoreObserver {
    fn on_change(&mut self, change: StoreChange<'_>, gate: &HydrationGate);
}

/// Result of handling one change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOutcome {
    Written,
    /// Gate still closed
    Gated,
    /// Slot sequence empty, treated as not yet initialized
    SkippedEmpty,
}

/// Persistence errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    Storage(StorageError),
    Encode(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "{}", e),
            Self::Encode(msg) => write!(f, "Failed to encode state: {}", msg),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            Self::Encode(_) => None,
        }
    }
}

impl From<StorageError> for PersistError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e.to_string())
    }
}

/// Writes changed stores to a [`KeyValueStore`].
///
/// Each key is written only by its own store's path: slot changes touch
/// the slot and enabled-indices keys, rune changes touch the rune key.
#[derive(Debug)]
pub struct Persister<S> {
    storage: S,
    keys: StorageKeys,
    slot_writes: u64,
    rune_writes: u64,
    last_write_at: Option<DateTime<Utc>>,
}

impl<S: KeyValueStore> Persister<S> {
    pub fn new(storage: S, keys: StorageKeys) -> Self {
        Self {
            storage,
            keys,
            slot_writes: 0,
            rune_writes: 0,
            last_write_at: None,
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    pub fn keys(&self) -> &StorageKeys {
        &self.keys
    }

    /// Successful slot writes so far.
    pub fn slot_writes(&self) -> u64 {
        self.slot_writes
    }

    /// Successful rune writes so far.
    pub fn rune_writes(&self) -> u64 {
        self.rune_writes
    }

    pub fn last_write_at(&self) -> Option<DateTime<Utc>> {
        self.last_write_at
    }

    /// Persist one change, honoring the gate and the empty-slots rule.
    pub fn persist(
        &mut self,
        change: StoreChange<'_>,
        gate: &HydrationGate,
    ) -> Result<PersistOutcome, PersistError> {
        if !gate.is_open() {
            return Ok(PersistOutcome::Gated);
        }

        match change {
            StoreChange::Slots(slots) if slots.is_empty() => Ok(PersistOutcome::SkippedEmpty),
            StoreChange::Slots(slots) => {
                self.write_slots(slots)?;
                self.slot_writes += 1;
                self.last_write_at = Some(Utc::now());
                Ok(PersistOutcome::Written)
            }
            StoreChange::Runes(runes) => {
                self.write_runes(runes)?;
                self.rune_writes += 1;
                self.last_write_at = Some(Utc::now());
                Ok(PersistOutcome::Written)
            }
        }
    }

    fn write_slots(&mut self, slots: &SlotStore) -> Result<(), PersistError> {
        let json = serde_json::to_string(slots)?;
        let enabled = serde_json::to_string(&slots.enabled_indices())?;
        self.storage.set(&self.keys.slots, &json)?;
        if let Err(e) = self.storage.set(&self.keys.enabled, &enabled) {
            warn!(
                "Stored {} but not {}; enabled indices are stale until the next slot write",
                self.keys.slots, self.keys.enabled
            );
            return Err(e.into());
        }
        Ok(())
    }

    fn write_runes(&mut self, runes: &RuneStore) -> Result<(), PersistError> {
        let json = serde_json::to_string(runes)?;
        self.storage.set(&self.keys.runes, &json)?;
        Ok(())
    }
}

impl<S: KeyValueStore> StoreObserver for Persister<S> {
    fn on_change(&mut self, change: StoreChange<'_>, gate: &HydrationGate) {
        match self.persist(change, gate) {
            Ok(PersistOutcome::Written) => {}
            Ok(outcome) => debug!("Skipped persisting change: {:?}", outcome),
            Err(e) => warn!("Failed to persist editor state: {}", e),
        }
    }
}
