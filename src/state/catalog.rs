//! Read-only reference data.
//!
//! Stat names and rune definitions are owned by the host application and
//! only consulted here to populate choices. Nothing in the stores validates
//! against them.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use super::rune::RuneTier;

/// Valid stat names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatCatalog {
    /// Names allowed as a slot's main stat
    #[serde(alias = "Mainstats")]
    pub mainstats: Vec<String>,

    /// Names allowed on affix rows
    #[serde(alias = "allStatNames")]
    pub all_stats: Vec<String>,
}

impl StatCatalog {
    pub fn new(mainstats: Vec<String>, all_stats: Vec<String>) -> Self {
        Self {
            mainstats,
            all_stats,
        }
    }

    pub fn is_mainstat(&self, name: &str) -> bool {
        self.mainstats.iter().any(|s| s == name)
    }

    pub fn is_stat(&self, name: &str) -> bool {
        self.all_stats.iter().any(|s| s == name)
    }
}

/// Reference entry for one rune.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuneInfo {
    /// Tier label; may name a tier outside [`RuneTier`]
    pub tier: String,

    #[serde(default)]
    pub description: String,
}

impl RuneInfo {
    pub fn new(tier: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            description: description.into(),
        }
    }
}

/// Rune definitions keyed by name, in definition order.
///
/// Deserializes from a JSON object `{ "<name>": { "tier": .., "description": .. } }`
/// without reordering the keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuneCatalog {
    entries: Vec<(String, RuneInfo)>,
}

impl RuneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a rune. A replaced rune keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, info: RuneInfo) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = info,
            None => self.entries.push((name, info)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RuneInfo> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, info)| info)
    }

    /// Description for `name`, if the rune is known.
    pub fn description(&self, name: &str) -> Option<&str> {
        self.get(name).map(|info| info.description.as_str())
    }

    /// Names of all runes whose tier label matches `tier`, in definition order.
    pub fn runes_by_tier(&self, tier: RuneTier) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, info)| info.tier == tier.as_str())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuneInfo)> {
        self.entries.iter().map(|(name, info)| (name.as_str(), info))
    }
}

impl<N: Into<String>> FromIterator<(N, RuneInfo)> for RuneCatalog {
    fn from_iter<I: IntoIterator<Item = (N, RuneInfo)>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for (name, info) in iter {
            catalog.insert(name, info);
        }
        catalog
    }
}

impl<'de> Deserialize<'de> for RuneCatalog {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = RuneCatalog;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of rune name to rune info")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RuneCatalog, A::Error> {
                let mut catalog = RuneCatalog::new();
                while let Some((name, info)) = access.next_entry::<String, RuneInfo>()? {
                    catalog.insert(name, info);
                }
                Ok(catalog)
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}
