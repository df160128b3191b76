//! Equipment slot state.
//!
//! A slot is one equipment item's configuration: type, main stat and a
//! growing list of affix rows. Slots are appended and toggled, never removed.
//!
//! # Copy-on-write
//!
//! The store keeps `Arc<Vec<Arc<Slot>>>`. Every mutation builds a new
//! top-level vector; only the touched slot gets a fresh `Arc`, the rest are
//! shared with the previous snapshot. Holders of an older [`SlotStore::snapshot`]
//! can detect change with `Arc::ptr_eq`.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of slots created on first run.
pub const DEFAULT_SLOT_COUNT: usize = 8;

/// Number of blank affix rows on a new slot.
pub const DEFAULT_AFFIX_ROWS: usize = 8;

/// Selectable slot types.
pub const SLOT_TYPES: [&str; 7] = [
    "Helm",
    "Armor",
    "Amulet",
    "Ring",
    "Weapon",
    "Runeshard",
    "Tarot",
];

/// Read a stored number, taking `null` as zero.
///
/// JSON has no NaN or infinity; browsers write them as `null`.
fn number_or_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_default())
}

/// One secondary stat modifier on a slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Affix {
    /// Stat name, empty while unselected
    #[serde(default)]
    pub stat: String,

    #[serde(default, deserialize_with = "number_or_zero")]
    pub value: f64,
}

impl Affix {
    pub fn new(stat: impl Into<String>, value: f64) -> Self {
        Self {
            stat: stat.into(),
            value,
        }
    }
}

/// One equipment slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slot {
    /// Free-form item name
    pub name: String,

    /// Slot type, one of [`SLOT_TYPES`] or empty
    #[serde(rename = "type")]
    pub slot_type: String,

    /// Main stat name
    pub mainstat: String,

    /// Main stat value
    #[serde(deserialize_with = "number_or_zero")]
    pub mainstat_value: f64,

    /// Affix rows in display order (append-only)
    pub affixes: Vec<Affix>,

    /// Whether the slot counts toward the active loadout
    pub enabled: bool,
}

impl Default for Slot {
    fn default() -> Self {
        Self {
            name: String::new(),
            slot_type: String::new(),
            mainstat: String::new(),
            mainstat_value: 0.0,
            affixes: vec![Affix::default(); DEFAULT_AFFIX_ROWS],
            enabled: false,
        }
    }
}

impl Slot {
    /// Create a blank, disabled slot with [`DEFAULT_AFFIX_ROWS`] empty affixes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an update addresses something that exists on this slot and
    /// carries a storable value.
    fn accepts(&self, update: &SlotUpdate) -> bool {
        match update {
            SlotUpdate::Direct(SlotField::MainstatValue(value)) => value.is_finite(),
            SlotUpdate::Direct(_) => true,
            SlotUpdate::Affix { row, field } => {
                let storable = match field {
                    AffixField::Value(value) => value.is_finite(),
                    AffixField::Stat(_) => true,
                };
                storable && *row < self.affixes.len()
            }
        }
    }

    fn apply(&mut self, update: SlotUpdate) {
        match update {
            SlotUpdate::Direct(SlotField::Name(name)) => self.name = name,
            SlotUpdate::Direct(SlotField::Type(slot_type)) => self.slot_type = slot_type,
            SlotUpdate::Direct(SlotField::Mainstat(stat)) => self.mainstat = stat,
            SlotUpdate::Direct(SlotField::MainstatValue(value)) => self.mainstat_value = value,
            SlotUpdate::Affix { row, field } => {
                if let Some(affix) = self.affixes.get_mut(row) {
                    match field {
                        AffixField::Stat(stat) => affix.stat = stat,
                        AffixField::Value(value) => affix.value = value,
                    }
                }
            }
        }
    }
}

/// A directly editable slot attribute with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotField {
    Name(String),
    Type(String),
    Mainstat(String),
    MainstatValue(f64),
}

/// An editable affix attribute with its new value.
#[derive(Debug, Clone, PartialEq)]
pub enum AffixField {
    Stat(String),
    Value(f64),
}

/// Edit applied to a single slot.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotUpdate {
    /// Replace one slot attribute
    Direct(SlotField),

    /// Replace one attribute of the affix at `row`
    Affix { row: usize, field: AffixField },
}

impl SlotUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self::Direct(SlotField::Name(name.into()))
    }

    pub fn slot_type(slot_type: impl Into<String>) -> Self {
        Self::Direct(SlotField::Type(slot_type.into()))
    }

    pub fn mainstat(stat: impl Into<String>) -> Self {
        Self::Direct(SlotField::Mainstat(stat.into()))
    }

    pub fn mainstat_value(value: f64) -> Self {
        Self::Direct(SlotField::MainstatValue(value))
    }

    pub fn affix_stat(row: usize, stat: impl Into<String>) -> Self {
        Self::Affix {
            row,
            field: AffixField::Stat(stat.into()),
        }
    }

    pub fn affix_value(row: usize, value: f64) -> Self {
        Self::Affix {
            row,
            field: AffixField::Value(value),
        }
    }

    /// Parse a string field path as produced by form bindings.
    ///
    /// Accepted paths are `name`, `type`, `mainstat`, `mainstat_value` and
    /// `affix_<row>_stat` / `affix_<row>_value`. Text fields take
    /// [`FieldValue::Text`], numeric fields take [`FieldValue::Number`].
    pub fn from_path(path: &str, value: FieldValue) -> Result<Self, FieldPathError> {
        if let Some(rest) = path.strip_prefix("affix_") {
            let (row, sub) = rest
                .split_once('_')
                .ok_or_else(|| FieldPathError::UnknownField(path.to_string()))?;
            let row: usize = row
                .parse()
                .map_err(|_| FieldPathError::BadAffixRow(row.to_string()))?;
            let field = match (sub, value) {
                ("stat", FieldValue::Text(stat)) => AffixField::Stat(stat),
                ("value", FieldValue::Number(value)) => AffixField::Value(value),
                ("stat" | "value", _) => return Err(FieldPathError::ValueKind(path.to_string())),
                _ => return Err(FieldPathError::UnknownField(path.to_string())),
            };
            return Ok(Self::Affix { row, field });
        }

        let field = match (path, value) {
            ("name", FieldValue::Text(v)) => SlotField::Name(v),
            ("type", FieldValue::Text(v)) => SlotField::Type(v),
            ("mainstat", FieldValue::Text(v)) => SlotField::Mainstat(v),
            ("mainstat_value", FieldValue::Number(v)) => SlotField::MainstatValue(v),
            ("name" | "type" | "mainstat" | "mainstat_value", _) => {
                return Err(FieldPathError::ValueKind(path.to_string()))
            }
            _ => return Err(FieldPathError::UnknownField(path.to_string())),
        };
        Ok(Self::Direct(field))
    }
}

/// Raw value coming from a form input.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Number(f64),
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Error parsing a string field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldPathError {
    /// Path names no known attribute
    UnknownField(String),
    /// Affix row is not a non-negative integer
    BadAffixRow(String),
    /// Value is text where a number is expected, or the reverse
    ValueKind(String),
}

impl fmt::Display for FieldPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownField(path) => write!(f, "Unknown slot field: {}", path),
            Self::BadAffixRow(row) => write!(f, "Invalid affix row: {}", row),
            Self::ValueKind(path) => write!(f, "Wrong value kind for field: {}", path),
        }
    }
}

impl std::error::Error for FieldPathError {}

/// Ordered sequence of equipment slots.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotStore {
    slots: Arc<Vec<Arc<Slot>>>,
}

impl SlotStore {
    /// Create an empty store (the "not yet initialized" state).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `count` blank slots.
    pub fn with_defaults(count: usize) -> Self {
        Self::from_slots((0..count).map(|_| Slot::new()))
    }

    pub fn from_slots(slots: impl IntoIterator<Item = Slot>) -> Self {
        Self {
            slots: Arc::new(slots.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index).map(Arc::as_ref)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Slot> {
        self.slots.iter().map(Arc::as_ref)
    }

    /// Shared handle to the current sequence.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Slot>>> {
        Arc::clone(&self.slots)
    }

    /// Positions of enabled slots, ascending.
    pub fn enabled_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.enabled)
            .map(|(i, _)| i)
            .collect()
    }

    /// Enabled slots in order.
    pub fn enabled_slots(&self) -> impl Iterator<Item = &Slot> {
        self.iter().filter(|slot| slot.enabled)
    }

    /// Append a blank slot.
    pub fn add_slot(&mut self) {
        let mut next = Vec::clone(&self.slots);
        next.push(Arc::new(Slot::new()));
        self.slots = Arc::new(next);
    }

    /// Flip `enabled` on the slot at `index`.
    ///
    /// Returns `false` (and changes nothing) if `index` is out of range.
    pub fn toggle_slot(&mut self, index: usize) -> bool {
        self.modify(index, |slot| slot.enabled = !slot.enabled)
    }

    /// Apply `update` to the slot at `index`.
    ///
    /// Out-of-range slot or affix indices are ignored and return `false`, as
    /// are NaN and infinite values, which cannot be stored as JSON numbers.
    pub fn update_slot(&mut self, index: usize, update: SlotUpdate) -> bool {
        let accepted = match self.slots.get(index) {
            Some(slot) => slot.accepts(&update),
            None => {
                debug!("Ignoring update for missing slot {}", index);
                return false;
            }
        };
        if !accepted {
            debug!("Ignoring update {:?} on slot {}", update, index);
            return false;
        }

        self.modify(index, |slot| slot.apply(update))
    }

    /// Apply an update given as a string field path.
    ///
    /// Unknown or malformed paths are ignored and return `false`.
    pub fn update_slot_path(&mut self, index: usize, path: &str, value: FieldValue) -> bool {
        match SlotUpdate::from_path(path, value) {
            Ok(update) => self.update_slot(index, update),
            Err(e) => {
                debug!("Ignoring slot update: {}", e);
                false
            }
        }
    }

    /// Append a blank affix row to the slot at `index`.
    pub fn add_affix_row(&mut self, index: usize) -> bool {
        self.modify(index, |slot| slot.affixes.push(Affix::default()))
    }

    /// Replace the slot at `index` with an edited copy.
    fn modify(&mut self, index: usize, edit: impl FnOnce(&mut Slot)) -> bool {
        let Some(current) = self.slots.get(index) else {
            debug!("Ignoring mutation for missing slot {}", index);
            return false;
        };

        let mut slot = Slot::clone(current);
        edit(&mut slot);

        let mut next = Vec::clone(&self.slots);
        next[index] = Arc::new(slot);
        self.slots = Arc::new(next);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_new_slot_shape() {
        let slot = Slot::new();
        assert_eq!(slot.name, "");
        assert_eq!(slot.slot_type, "");
        assert_eq!(slot.mainstat, "");
        assert_eq!(slot.mainstat_value, 0.0);
        assert_eq!(slot.affixes.len(), DEFAULT_AFFIX_ROWS);
        assert!(slot.affixes.iter().all(|a| *a == Affix::default()));
        assert!(!slot.enabled);
    }

    #[test]
    fn test_add_slot() {
        let mut store = SlotStore::with_defaults(DEFAULT_SLOT_COUNT);
        store.add_slot();

        assert_eq!(store.len(), 9);
        assert_eq!(store.get(8), Some(&Slot::new()));
        assert_eq!(store.get(8), store.get(0));
    }

    #[test]
    fn test_toggle_slot() {
        let mut store = SlotStore::with_defaults(3);

        assert!(store.toggle_slot(1));
        assert!(store.get(1).unwrap().enabled);
        assert!(!store.get(0).unwrap().enabled);
        assert_eq!(store.enabled_indices(), vec![1]);

        assert!(store.toggle_slot(1));
        assert!(!store.get(1).unwrap().enabled);
        assert!(store.enabled_indices().is_empty());
    }

    #[test]
    fn test_toggle_out_of_range() {
        let mut store = SlotStore::with_defaults(2);
        let before = store.snapshot();

        assert!(!store.toggle_slot(2));
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }

    #[test]
    fn test_update_affix_stat() {
        let mut store = SlotStore::with_defaults(DEFAULT_SLOT_COUNT);
        let before = store.clone();

        assert!(store.update_slot(0, SlotUpdate::affix_stat(2, "Crit Rate")));

        let slot = store.get(0).unwrap();
        assert_eq!(slot.affixes[2].stat, "Crit Rate");
        assert_eq!(slot.affixes[2].value, 0.0);
        for i in (0..DEFAULT_AFFIX_ROWS).filter(|i| *i != 2) {
            assert_eq!(slot.affixes[i], Affix::default());
        }
        for i in 1..DEFAULT_SLOT_COUNT {
            assert_eq!(store.get(i), before.get(i));
        }
    }

    #[test]
    fn test_update_direct_fields() {
        let mut store = SlotStore::with_defaults(1);

        store.update_slot(0, SlotUpdate::name("Crown of Ash"));
        store.update_slot(0, SlotUpdate::slot_type("Helm"));
        store.update_slot(0, SlotUpdate::mainstat("Attack"));
        store.update_slot(0, SlotUpdate::mainstat_value(125.5));
        store.update_slot(0, SlotUpdate::affix_value(7, 3.0));

        let slot = store.get(0).unwrap();
        assert_eq!(slot.name, "Crown of Ash");
        assert_eq!(slot.slot_type, "Helm");
        assert_eq!(slot.mainstat, "Attack");
        assert_eq!(slot.mainstat_value, 125.5);
        assert_eq!(slot.affixes[7].value, 3.0);
        assert!(!slot.enabled);
    }

    #[test]
    fn test_update_missing_affix_row() {
        let mut store = SlotStore::with_defaults(1);
        let before = store.clone();

        assert!(!store.update_slot(0, SlotUpdate::affix_stat(DEFAULT_AFFIX_ROWS, "Haste")));
        assert!(!store.update_slot(4, SlotUpdate::name("nope")));
        assert_eq!(store, before);
    }

    #[test]
    fn test_update_rejects_non_finite_values() {
        let mut store = SlotStore::with_defaults(1);
        store.update_slot(0, SlotUpdate::mainstat_value(40.0));
        store.update_slot(0, SlotUpdate::affix_value(1, 2.5));
        let before = store.snapshot();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(!store.update_slot(0, SlotUpdate::mainstat_value(value)));
            assert!(!store.update_slot(0, SlotUpdate::affix_value(1, value)));
            assert!(!store.update_slot_path(0, "affix_1_value", value.into()));
        }

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert_eq!(store.get(0).unwrap().mainstat_value, 40.0);
        assert_eq!(store.get(0).unwrap().affixes[1].value, 2.5);
    }

    #[test]
    fn test_update_shares_untouched_slots() {
        let mut store = SlotStore::with_defaults(3);
        let before = store.snapshot();

        store.update_slot(1, SlotUpdate::name("Ring of Dusk"));
        let after = store.snapshot();

        assert!(!Arc::ptr_eq(&before, &after));
        assert!(Arc::ptr_eq(&before[0], &after[0]));
        assert!(!Arc::ptr_eq(&before[1], &after[1]));
        assert!(Arc::ptr_eq(&before[2], &after[2]));
        assert_eq!(before[1].name, "");
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            SlotUpdate::from_path("affix_2_stat", "Crit Rate".into()),
            Ok(SlotUpdate::affix_stat(2, "Crit Rate"))
        );
        assert_eq!(
            SlotUpdate::from_path("affix_11_value", 4.5.into()),
            Ok(SlotUpdate::affix_value(11, 4.5))
        );
        assert_eq!(
            SlotUpdate::from_path("type", "Ring".into()),
            Ok(SlotUpdate::slot_type("Ring"))
        );
        assert_eq!(
            SlotUpdate::from_path("mainstat_value", 10.0.into()),
            Ok(SlotUpdate::mainstat_value(10.0))
        );
    }

    #[test]
    fn test_from_path_errors() {
        assert_eq!(
            SlotUpdate::from_path("rarity", "Epic".into()),
            Err(FieldPathError::UnknownField("rarity".to_string()))
        );
        assert_eq!(
            SlotUpdate::from_path("enabled", 1.0.into()),
            Err(FieldPathError::UnknownField("enabled".to_string()))
        );
        assert_eq!(
            SlotUpdate::from_path("affix_x_stat", "Haste".into()),
            Err(FieldPathError::BadAffixRow("x".to_string()))
        );
        assert_eq!(
            SlotUpdate::from_path("affix_3", "Haste".into()),
            Err(FieldPathError::UnknownField("affix_3".to_string()))
        );
        assert_eq!(
            SlotUpdate::from_path("affix_3_tier", "Haste".into()),
            Err(FieldPathError::UnknownField("affix_3_tier".to_string()))
        );
        assert_eq!(
            SlotUpdate::from_path("mainstat_value", "12".into()),
            Err(FieldPathError::ValueKind("mainstat_value".to_string()))
        );
    }

    #[test]
    fn test_update_slot_path_ignores_unknown() {
        let mut store = SlotStore::with_defaults(2);
        let before = store.clone();

        assert!(!store.update_slot_path(0, "rarity", "Epic".into()));
        assert_eq!(store, before);

        assert!(store.update_slot_path(0, "affix_2_stat", "Crit Rate".into()));
        assert_eq!(store.get(0).unwrap().affixes[2].stat, "Crit Rate");
    }

    #[test]
    fn test_add_affix_row() {
        let mut store = SlotStore::with_defaults(2);
        store.update_slot(1, SlotUpdate::affix_stat(0, "Haste"));

        assert!(store.add_affix_row(1));

        let slot = store.get(1).unwrap();
        assert_eq!(slot.affixes.len(), DEFAULT_AFFIX_ROWS + 1);
        assert_eq!(slot.affixes[0].stat, "Haste");
        assert_eq!(slot.affixes[DEFAULT_AFFIX_ROWS], Affix::default());
        assert_eq!(store.get(0).unwrap().affixes.len(), DEFAULT_AFFIX_ROWS);

        assert!(!store.add_affix_row(2));
    }

    #[test]
    fn test_slot_json_shape() {
        let mut slot = Slot::new();
        slot.slot_type = "Ring".to_string();
        slot.affixes.truncate(1);

        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "",
                "type": "Ring",
                "mainstat": "",
                "mainstat_value": 0.0,
                "affixes": [{ "stat": "", "value": 0.0 }],
                "enabled": false
            })
        );
    }

    #[test]
    fn test_slot_missing_fields_default() {
        let slot: Slot = serde_json::from_str(r#"{"name":"Old","enabled":true}"#).unwrap();
        assert_eq!(slot.name, "Old");
        assert!(slot.enabled);
        assert_eq!(slot.affixes.len(), DEFAULT_AFFIX_ROWS);
    }

    #[test]
    fn test_null_numbers_read_as_zero() {
        let raw = r#"{"name":"Crown","mainstat_value":null,
                      "affixes":[{"stat":"Haste","value":null},{"stat":"Guard"}]}"#;
        let slot: Slot = serde_json::from_str(raw).unwrap();

        assert_eq!(slot.name, "Crown");
        assert_eq!(slot.mainstat_value, 0.0);
        assert_eq!(slot.affixes, vec![Affix::new("Haste", 0.0), Affix::new("Guard", 0.0)]);
    }

    fn arb_value() -> impl Strategy<Value = f64> {
        prop_oneof![
            4 => (-1000i32..1000).prop_map(|v| v as f64),
            1 => prop::sample::select(vec![f64::NAN, f64::INFINITY, f64::NEG_INFINITY]),
        ]
    }

    fn arb_update() -> impl Strategy<Value = SlotUpdate> {
        prop_oneof![
            "[a-z ]{0,8}".prop_map(|s| SlotUpdate::name(s)),
            "[A-Z][a-z]{0,6}".prop_map(|s| SlotUpdate::slot_type(s)),
            "[A-Z][a-z]{0,6}".prop_map(|s| SlotUpdate::mainstat(s)),
            arb_value().prop_map(SlotUpdate::mainstat_value),
            (0usize..12, "[A-Z][a-z]{0,6}").prop_map(|(row, s)| SlotUpdate::affix_stat(row, s)),
            (0usize..12, arb_value()).prop_map(|(row, v)| SlotUpdate::affix_value(row, v)),
        ]
    }

    proptest! {
        #[test]
        fn prop_toggle_parity(index in 0usize..8, times in 0usize..10) {
            let mut store = SlotStore::with_defaults(DEFAULT_SLOT_COUNT);
            let before = store.clone();

            for _ in 0..times {
                store.toggle_slot(index);
            }

            prop_assert_eq!(store.get(index).unwrap().enabled, times % 2 == 1);
            for i in (0..DEFAULT_SLOT_COUNT).filter(|i| *i != index) {
                prop_assert_eq!(store.get(i), before.get(i));
            }
        }

        #[test]
        fn prop_add_affix_row_keeps_rows(
            updates in prop::collection::vec(arb_update(), 0..12),
        ) {
            let mut store = SlotStore::with_defaults(1);
            for update in updates {
                store.update_slot(0, update);
            }
            let before = store.get(0).unwrap().affixes.clone();
            prop_assert!(before.iter().all(|a| a.value.is_finite()));

            store.add_affix_row(0);

            let after = &store.get(0).unwrap().affixes;
            prop_assert_eq!(after.len(), before.len() + 1);
            prop_assert_eq!(&after[..before.len()], &before[..]);
        }
    }
}
