//! Initial load of persisted state.
//!
//! Hydration runs once per session. Missing or corrupt blobs never fail:
//! slots fall back to [`DEFAULT_SLOT_COUNT`] blank slots, and runes are
//! restored row by row, dropping only the rows that cannot be read.

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

use super::rune::{RuneSelection, RuneStore, RuneTier};
use super::slot::{Slot, SlotStore, DEFAULT_SLOT_COUNT};
use super::storage::{KeyValueStore, StorageKeys};

/// One-shot flag separating the loading phase from the editing phase.
///
/// Nothing is written to storage while the gate is closed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HydrationGate {
    opened_at: Option<DateTime<Utc>>,
}

impl HydrationGate {
    /// Create a closed gate.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.opened_at.is_some()
    }

    /// When the gate opened, if it has.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Open the gate. Returns `false` if it was already open.
    pub fn open(&mut self) -> bool {
        if self.is_open() {
            return false;
        }
        self.opened_at = Some(Utc::now());
        true
    }
}

/// Stores produced by hydration.
#[derive(Debug, Clone, PartialEq)]
pub struct Hydrated {
    pub slots: SlotStore,
    pub runes: RuneStore,
}

/// Read both blobs from `storage` and rebuild the stores.
pub fn hydrate<S: KeyValueStore>(storage: &S, keys: &StorageKeys) -> Hydrated {
    let slots = restore_slots(read_blob(storage, &keys.slots).as_deref());
    let runes = restore_runes(read_blob(storage, &keys.runes).as_deref());
    info!(
        "Hydrated {} slots and {} rune rows",
        slots.len(),
        runes.row_count()
    );
    Hydrated { slots, runes }
}

/// Read a raw blob, treating backend errors as absence.
fn read_blob<S: KeyValueStore>(storage: &S, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(raw) => raw,
        Err(e) => {
            warn!("{}; using defaults", e);
            None
        }
    }
}

/// Rebuild the slot sequence from a stored blob.
///
/// Absent or unparseable data yields [`DEFAULT_SLOT_COUNT`] blank slots. A
/// stored empty list is kept empty.
pub fn restore_slots(raw: Option<&str>) -> SlotStore {
    let Some(raw) = raw else {
        info!("No stored slots, creating {} defaults", DEFAULT_SLOT_COUNT);
        return SlotStore::with_defaults(DEFAULT_SLOT_COUNT);
    };

    match serde_json::from_str::<Vec<Slot>>(raw) {
        Ok(slots) => SlotStore::from_slots(slots),
        Err(e) => {
            warn!("Discarding corrupt slot data: {}", e);
            SlotStore::with_defaults(DEFAULT_SLOT_COUNT)
        }
    }
}

/// Rebuild the rune mapping from a stored blob.
///
/// Each tier is restored independently; a tier that is missing or not a
/// list becomes empty without affecting the others. Inside a list, rows
/// that are not selections are dropped and the rest kept in order.
pub fn restore_runes(raw: Option<&str>) -> RuneStore {
    let mut store = RuneStore::new();
    let Some(raw) = raw else {
        return store;
    };

    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            warn!("Stored runes are not a tier mapping; starting empty");
            return store;
        }
        Err(e) => {
            warn!("Discarding corrupt rune data: {}", e);
            return store;
        }
    };

    for tier in RuneTier::ALL {
        let Some(value) = parsed.get(tier.as_str()) else {
            continue;
        };
        let Value::Array(rows) = value else {
            warn!("Discarding {} rune tier: not a list", tier);
            continue;
        };
        store.set_tier(tier, restore_rune_rows(tier, rows));
    }
    store
}

fn restore_rune_rows(tier: RuneTier, rows: &[Value]) -> Vec<RuneSelection> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| match RuneSelection::deserialize(row) {
            Ok(selection) => Some(selection),
            Err(e) => {
                warn!("Discarding corrupt {} rune row {}: {}", tier, i, e);
                None
            }
        })
        .collect()
}
