//! Rune inventory state.
//!
//! Runes are grouped into five fixed tiers. The store always holds a
//! sequence for every tier; only the sequences change.

use std::fmt;
use std::sync::Arc;

use log::debug;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Count given to a newly added rune row.
pub const DEFAULT_RUNE_COUNT: f64 = 1.0;

/// Rune rarity tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RuneTier {
    Low,
    Middle,
    High,
    Legacy,
    Divine,
}

impl RuneTier {
    /// Number of tiers.
    pub const COUNT: usize = 5;

    /// All tiers in display order.
    pub const ALL: [RuneTier; 5] = [
        Self::Low,
        Self::Middle,
        Self::High,
        Self::Legacy,
        Self::Divine,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Middle => "Middle",
            Self::High => "High",
            Self::Legacy => "Legacy",
            Self::Divine => "Divine",
        }
    }

    /// Parse a tier label (case-sensitive, as stored).
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.as_str() == label)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for RuneTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_rune_count() -> f64 {
    DEFAULT_RUNE_COUNT
}

/// Read a stored count, taking `null` (a NaN written by the page) as the
/// default count.
fn count_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(DEFAULT_RUNE_COUNT))
}

/// A chosen rune and how many are owned.
///
/// `count` is kept as entered, without clamping or rounding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuneSelection {
    /// Rune name, empty while unselected
    #[serde(default)]
    pub rune: String,

    #[serde(default = "default_rune_count", deserialize_with = "count_or_default")]
    pub count: f64,
}

impl Default for RuneSelection {
    fn default() -> Self {
        Self {
            rune: String::new(),
            count: DEFAULT_RUNE_COUNT,
        }
    }
}

impl RuneSelection {
    pub fn new(rune: impl Into<String>, count: f64) -> Self {
        Self {
            rune: rune.into(),
            count,
        }
    }
}

/// Edit applied to a single rune selection.
#[derive(Debug, Clone, PartialEq)]
pub enum RuneUpdate {
    Rune(String),
    Count(f64),
}

/// Total mapping from [`RuneTier`] to rune selections.
///
/// Each tier's sequence sits behind its own `Arc`; a mutation replaces only
/// the touched tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuneStore {
    tiers: [Arc<Vec<RuneSelection>>; RuneTier::COUNT],
}

impl RuneStore {
    /// Create a store with every tier empty.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selections for `tier`.
    pub fn tier(&self, tier: RuneTier) -> &[RuneSelection] {
        &self.tiers[tier.index()]
    }

    /// Shared handle to a tier's current sequence.
    pub fn tier_snapshot(&self, tier: RuneTier) -> Arc<Vec<RuneSelection>> {
        Arc::clone(&self.tiers[tier.index()])
    }

    pub fn get(&self, tier: RuneTier, index: usize) -> Option<&RuneSelection> {
        self.tier(tier).get(index)
    }

    /// Iterate tiers in display order.
    pub fn iter(&self) -> impl Iterator<Item = (RuneTier, &[RuneSelection])> {
        RuneTier::ALL
            .into_iter()
            .map(move |tier| (tier, self.tier(tier)))
    }

    /// Whether every tier is empty.
    pub fn is_empty(&self) -> bool {
        self.tiers.iter().all(|t| t.is_empty())
    }

    /// Total number of selection rows across tiers.
    pub fn row_count(&self) -> usize {
        self.tiers.iter().map(|t| t.len()).sum()
    }

    /// Replace a tier's whole sequence.
    pub fn set_tier(&mut self, tier: RuneTier, selections: Vec<RuneSelection>) {
        self.tiers[tier.index()] = Arc::new(selections);
    }

    /// Append a blank selection to `tier`.
    pub fn add_rune_row(&mut self, tier: RuneTier) {
        self.edit_tier(tier, |list| list.push(RuneSelection::default()));
    }

    /// Remove the selection at `index` from `tier`, keeping order.
    ///
    /// Returns `false` if `index` is out of range.
    pub fn remove_rune_row(&mut self, tier: RuneTier, index: usize) -> bool {
        if index >= self.tier(tier).len() {
            debug!("Ignoring removal of missing {} rune row {}", tier, index);
            return false;
        }
        self.edit_tier(tier, |list| {
            list.remove(index);
        });
        true
    }

    /// Replace one field of the selection at `index` in `tier`.
    ///
    /// The rune name and the count's range are not validated. NaN and
    /// infinite counts cannot be stored as JSON numbers and are refused.
    pub fn update_rune_selection(
        &mut self,
        tier: RuneTier,
        index: usize,
        update: RuneUpdate,
    ) -> bool {
        if index >= self.tier(tier).len() {
            debug!("Ignoring update of missing {} rune row {}", tier, index);
            return false;
        }
        if let RuneUpdate::Count(count) = &update {
            if !count.is_finite() {
                debug!("Ignoring non-finite count for {} rune row {}", tier, index);
                return false;
            }
        }
        self.edit_tier(tier, |list| {
            let selection = &mut list[index];
            match update {
                RuneUpdate::Rune(rune) => selection.rune = rune,
                RuneUpdate::Count(count) => selection.count = count,
            }
        });
        true
    }

    fn edit_tier(&mut self, tier: RuneTier, edit: impl FnOnce(&mut Vec<RuneSelection>)) {
        let mut next = Vec::clone(&self.tiers[tier.index()]);
        edit(&mut next);
        self.tiers[tier.index()] = Arc::new(next);
    }
}

impl Serialize for RuneStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(RuneTier::COUNT))?;
        for (tier, selections) in self.iter() {
            map.serialize_entry(tier.as_str(), selections)?;
        }
        map.end()
    }
}
