//! Bird reference data
//!
//! Birds are an external dimension table: read-only lookup data keyed by a
//! stable string id, never authored or synced by this core.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Stable identifier for a bird species in the reference catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BirdId(String);

impl BirdId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BirdId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BirdId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Rarity tag carried by reference data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
}

impl Rarity {
    /// Sort key: rare before common
    #[must_use]
    pub const fn sort_rank(self) -> u8 {
        match self {
            Self::Rare => 0,
            Self::Uncommon => 1,
            Self::Common => 2,
        }
    }
}

/// One identifiable plumage area (e.g. "crown" with variant "striped" in
/// black and white)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMark {
    pub area: String,
    pub variant: Option<String>,
    pub colors: Vec<String>,
}

/// A species record from the reference catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bird {
    pub id: BirdId,
    pub common_name: String,
    pub scientific_name: String,
    /// Reference to the species image, resolved by the presentation layer
    pub image: Option<String>,
    pub rarity: Rarity,
    pub shape: String,
    /// Relative size class, 1 (tiny) to 5 (very large)
    pub size: u8,
    pub field_marks: Vec<FieldMark>,
    pub valid_locations: Vec<String>,
    /// Months (1-12) the species is expected
    pub valid_months: Vec<u8>,
}

/// In-memory catalog of reference birds
#[derive(Debug, Clone, Default)]
pub struct BirdCatalog {
    birds: HashMap<BirdId, Bird>,
}

impl BirdCatalog {
    #[must_use]
    pub fn new(birds: impl IntoIterator<Item = Bird>) -> Self {
        Self {
            birds: birds
                .into_iter()
                .map(|bird| (bird.id.clone(), bird))
                .collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: &BirdId) -> Option<&Bird> {
        self.birds.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bird> {
        self.birds.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.birds.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.birds.is_empty()
    }
}
