//! State management module for the loadout editor.
//!
//! This module provides the core state types:
//!
//! - `slot` - Equipment slots and their affix rows
//! - `rune` - Rune selections grouped by tier
//! - `catalog` - Read-only stat and rune reference data
//! - `hydration` - One-time load of persisted state
//! - `persist` - Change notification and storage writes
//! - `storage` - Key-value backends
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                      EquipmentState                           │
//! │                                                               │
//! │  ┌───────────────┐   ┌───────────────┐   ┌────────────────┐   │
//! │  │   SlotStore   │   │   RuneStore   │   │ HydrationGate  │   │
//! │  │ [Slot; n]     │   │ tier → [Rune] │   │ closed → open  │   │
//! │  └───────┬───────┘   └───────┬───────┘   └───────┬────────┘   │
//! │          │ StoreChange       │                   │ gates      │
//! │          ▼                   ▼                   ▼            │
//! │  ┌─────────────────────────────────────────────────────────┐  │
//! │  │ Persister<S: KeyValueStore>     + extra StoreObservers  │  │
//! │  │  EquipmentSlots / EnabledEquipment / SelectedRunes      │  │
//! │  └─────────────────────────────────────────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```

pub mod catalog;
pub mod hydration;
pub mod persist;
pub mod rune;
pub mod slot;
pub mod storage;

// Re-export commonly used types
pub use catalog::{RuneCatalog, RuneInfo, StatCatalog};
pub use hydration::{hydrate, restore_runes, restore_slots, Hydrated, HydrationGate};
pub use persist::{PersistError, PersistOutcome, Persister, StoreChange, StoreObserver};
pub use rune::{RuneSelection, RuneStore, RuneTier, RuneUpdate, DEFAULT_RUNE_COUNT};
pub use slot::{
    Affix, AffixField, FieldPathError, FieldValue, Slot, SlotField, SlotStore, SlotUpdate,
    DEFAULT_AFFIX_ROWS, DEFAULT_SLOT_COUNT, SLOT_TYPES,
};
#[cfg(target_arch = "wasm32")]
pub use storage::LocalStorage;
pub use storage::{KeyValueStore, MemoryStore, StorageError, StorageKeys};

use log::info;

/// Combined editor state.
///
/// Owns both stores, the hydration gate and the persistence subscriber.
/// Mutations run to completion, including the storage write, before they
/// return.
pub struct EquipmentState<S: KeyValueStore> {
    slots: SlotStore,
    runes: RuneStore,
    gate: HydrationGate,
    persister: Persister<S>,
    observers: Vec<Box<dyn StoreObserver>>,
}

impl<S: KeyValueStore> EquipmentState<S> {
    /// Create an editor with a closed gate and empty stores.
    pub fn new(storage: S) -> Self {
        Self::with_keys(storage, StorageKeys::default())
    }

    pub fn with_keys(storage: S, keys: StorageKeys) -> Self {
        Self {
            slots: SlotStore::new(),
            runes: RuneStore::new(),
            gate: HydrationGate::new(),
            persister: Persister::new(storage, keys),
            observers: Vec::new(),
        }
    }

    /// Create and hydrate in one step.
    pub fn load(storage: S) -> Self {
        let mut state = Self::new(storage);
        state.hydrate();
        state
    }

    /// Load both stores from storage and open the gate.
    ///
    /// The hydrated state is written back immediately, so defaults and
    /// repaired tiers reach storage. Returns `false` if already hydrated.
    pub fn hydrate(&mut self) -> bool {
        if self.gate.is_open() {
            return false;
        }

        let Hydrated { slots, runes } = hydrate(self.persister.storage(), self.persister.keys());
        self.slots = slots;
        self.runes = runes;
        self.gate.open();
        info!("Equipment editor ready");

        self.notify_slots();
        self.notify_runes();
        true
    }

    /// Whether the initial load has completed.
    pub fn is_hydrated(&self) -> bool {
        self.gate.is_open()
    }

    pub fn gate(&self) -> &HydrationGate {
        &self.gate
    }

    pub fn slots(&self) -> &SlotStore {
        &self.slots
    }

    pub fn runes(&self) -> &RuneStore {
        &self.runes
    }

    pub fn persister(&self) -> &Persister<S> {
        &self.persister
    }

    pub fn storage(&self) -> &S {
        self.persister.storage()
    }

    pub fn storage_mut(&mut self) -> &mut S {
        self.persister.storage_mut()
    }

    pub fn into_storage(self) -> S {
        self.persister.into_storage()
    }

    /// Register an observer notified after every mutation.
    pub fn subscribe(&mut self, observer: Box<dyn StoreObserver>) {
        self.observers.push(observer);
    }

    /// Positions of enabled slots.
    pub fn enabled_indices(&self) -> Vec<usize> {
        self.slots.enabled_indices()
    }

    pub fn enabled_slots(&self) -> impl Iterator<Item = &Slot> {
        self.slots.enabled_slots()
    }

    // Slot mutations

    pub fn add_slot(&mut self) {
        self.slots.add_slot();
        self.notify_slots();
    }

    pub fn toggle_slot(&mut self, index: usize) -> bool {
        let changed = self.slots.toggle_slot(index);
        if changed {
            self.notify_slots();
        }
        changed
    }

    pub fn update_slot(&mut self, index: usize, update: SlotUpdate) -> bool {
        let changed = self.slots.update_slot(index, update);
        if changed {
            self.notify_slots();
        }
        changed
    }

    pub fn update_slot_path(&mut self, index: usize, path: &str, value: FieldValue) -> bool {
        let changed = self.slots.update_slot_path(index, path, value);
        if changed {
            self.notify_slots();
        }
        changed
    }

    pub fn add_affix_row(&mut self, index: usize) -> bool {
        let changed = self.slots.add_affix_row(index);
        if changed {
            self.notify_slots();
        }
        changed
    }

    // Rune mutations

    pub fn add_rune_row(&mut self, tier: RuneTier) {
        self.runes.add_rune_row(tier);
        self.notify_runes();
    }

    pub fn remove_rune_row(&mut self, tier: RuneTier, index: usize) -> bool {
        let changed = self.runes.remove_rune_row(tier, index);
        if changed {
            self.notify_runes();
        }
        changed
    }

    pub fn update_rune_selection(
        &mut self,
        tier: RuneTier,
        index: usize,
        update: RuneUpdate,
    ) -> bool {
        let changed = self.runes.update_rune_selection(tier, index, update);
        if changed {
            self.notify_runes();
        }
        changed
    }

    /// Description shown next to a selection; empty when unselected or unknown.
    pub fn rune_description<'c>(
        &self,
        catalog: &'c RuneCatalog,
        tier: RuneTier,
        index: usize,
    ) -> &'c str {
        self.runes
            .get(tier, index)
            .filter(|selection| !selection.rune.is_empty())
            .and_then(|selection| catalog.description(&selection.rune))
            .unwrap_or("")
    }

    fn notify_slots(&mut self) {
        let change = StoreChange::Slots(&self.slots);
        self.persister.on_change(change, &self.gate);
        for observer in &mut self.observers {
            observer.on_change(change, &self.gate);
        }
    }

    fn notify_runes(&mut self) {
        let change = StoreChange::Runes(&self.runes);
        self.persister.on_change(change, &self.gate);
        for observer in &mut self.observers {
            observer.on_change(change, &self.gate);
        }
    }
}
