//! Loadout State Library
//!
//! This crate provides the state core for the equipment and rune loadout
//! editor.
//!
//! # Overview
//!
//! The state module provides:
//!
//! - **Slot Store** - Ordered equipment slots with type, main stat and a
//!   growing list of affix rows. Slots are toggled, never deleted.
//!
//! - **Rune Store** - Rune selections for each of the five fixed tiers.
//!
//! - **Hydration Gate** - Loads both stores once, falling back to defaults
//!   for missing or corrupt data, and holds back writes until it opens.
//!
//! - **Persistence** - After every mutation the changed store is written to
//!   a key-value backend (`localStorage` in the browser).
//!
//! # Design Principles
//!
//! 1. **Nothing is fatal** - Bad indices, unknown fields and corrupt blobs
//!    degrade to no-ops or defaults.
//!
//! 2. **Copy-on-write** - Every mutation yields a new top-level sequence so
//!    renderers can detect change by pointer.
//!
//! 3. **No rendering** - This crate is pure state; the page draws it.
//!
//! # Example
//!
//! ```rust
//! use loadout_state::{EquipmentState, MemoryStore, RuneTier, RuneUpdate, SlotUpdate};
//!
//! let mut editor = EquipmentState::load(MemoryStore::new());
//! assert_eq!(editor.slots().len(), 8);
//!
//! editor.toggle_slot(0);
//! editor.update_slot(0, SlotUpdate::affix_stat(2, "Crit Rate"));
//! editor.add_rune_row(RuneTier::High);
//! editor.update_rune_selection(RuneTier::High, 0, RuneUpdate::Count(3.0));
//!
//! assert_eq!(editor.enabled_indices(), vec![0]);
//! assert_eq!(editor.storage().get_raw("EnabledEquipment"), Some("[0]"));
//! ```

pub mod state;

// Re-export everything from state module at crate root
pub use state::*;
