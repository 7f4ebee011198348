//! Query/filter engine
//!
//! Read-only views over the entity store and the bird reference catalog.
//! Nothing here mutates stored state, and soft-deleted rows are invisible by
//! construction (the store's read path excludes them).

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::db::EntityStore;
use crate::error::Result;
use crate::models::{
    Bird, BirdCatalog, ObservationStatus, Rarity, UserId, Watchlist, WatchlistEntry, WatchlistId,
    WatchlistShare,
};

/// Optional criteria combined with logical AND
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// Case-insensitive substring of the common or scientific name
    pub name: Option<String>,
    pub shape: Option<String>,
    pub size: Option<u8>,
    /// Matches against the bird's valid locations
    pub location: Option<String>,
    /// Every selected group must be satisfied
    pub field_marks: Vec<FieldMarkSelection>,
}

/// One selected field-mark group. An unset variant or empty color set acts
/// as a wildcard.
#[derive(Debug, Clone)]
pub struct FieldMarkSelection {
    pub area: String,
    pub variant: Option<String>,
    pub colors: Vec<String>,
}

/// Sort orders for entry lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Case-insensitive by bird name, A first
    NameAsc,
    /// Case-insensitive by bird name, Z first
    NameDesc,
    /// Most recent observation first; undated entries sort last
    DateDesc,
    /// Rare before common; stable otherwise
    RarityFirst,
}

/// Read-only aggregate and filter queries
pub struct QueryEngine<'a> {
    store: &'a EntityStore,
    catalog: &'a BirdCatalog,
}

impl<'a> QueryEngine<'a> {
    #[must_use]
    pub const fn new(store: &'a EntityStore, catalog: &'a BirdCatalog) -> Self {
        Self { store, catalog }
    }

    /// Watchlists owned by or shared with `user`; guest sessions see their
    /// guest-owned lists.
    pub fn visible_watchlists(&self, user: Option<&UserId>) -> Result<Vec<Watchlist>> {
        let shared_ids: HashSet<WatchlistId> = match user {
            Some(user) => self
                .store
                .query(|share: &WatchlistShare| share.user_id == *user)?
                .into_iter()
                .map(|share| share.watchlist_id)
                .collect(),
            None => HashSet::new(),
        };

        self.store.query(|list: &Watchlist| match user {
            Some(user) => list.owner_id.as_ref() == Some(user) || shared_ids.contains(&list.id),
            None => list.owner_id.is_none(),
        })
    }

    fn visible_entries(&self, user: Option<&UserId>) -> Result<Vec<WatchlistEntry>> {
        let list_ids: HashSet<WatchlistId> = self
            .visible_watchlists(user)?
            .into_iter()
            .map(|list| list.id)
            .collect();
        self.store
            .query(|entry: &WatchlistEntry| list_ids.contains(&entry.watchlist_id))
    }

    /// Observed plus to-observe entries across all visible watchlists
    pub fn total_species_count(&self, user: Option<&UserId>) -> Result<usize> {
        Ok(self.visible_entries(user)?.len())
    }

    /// Entries already observed
    pub fn total_observed_count(&self, user: Option<&UserId>) -> Result<usize> {
        Ok(self
            .visible_entries(user)?
            .iter()
            .filter(|entry| entry.status == ObservationStatus::Observed)
            .count())
    }

    /// Entries whose referenced bird carries the `rare` tag
    pub fn total_rare_count(&self, user: Option<&UserId>) -> Result<usize> {
        Ok(self
            .visible_entries(user)?
            .iter()
            .filter(|entry| {
                self.catalog
                    .get(&entry.bird_id)
                    .is_some_and(|bird| bird.rarity == Rarity::Rare)
            })
            .count())
    }

    /// Filter the reference catalog. Criteria AND together; an absent
    /// criterion is a wildcard.
    #[must_use]
    pub fn filter_birds(&self, criteria: &FilterCriteria) -> Vec<&'a Bird> {
        self.catalog
            .iter()
            .filter(|bird| bird_matches(bird, criteria))
            .collect()
    }

    /// Sort entries in place. Name and rarity orders consult the catalog;
    /// entries referencing unknown birds keep their relative position at the
    /// end of the name orders.
    pub fn sort_entries(&self, entries: &mut [WatchlistEntry], order: SortOrder) {
        match order {
            SortOrder::NameAsc => {
                entries.sort_by(|a, b| self.name_key(a).cmp(&self.name_key(b)));
            }
            SortOrder::NameDesc => {
                entries.sort_by(|a, b| self.name_key(b).cmp(&self.name_key(a)));
            }
            SortOrder::DateDesc => entries.sort_by(|a, b| {
                match (a.effective_date(), b.effective_date()) {
                    (Some(da), Some(db)) => db.cmp(&da),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }),
            SortOrder::RarityFirst => entries.sort_by_key(|entry| {
                self.catalog
                    .get(&entry.bird_id)
                    .map_or(u8::MAX, |bird| bird.rarity.sort_rank())
            }),
        }
    }

    fn name_key(&self, entry: &WatchlistEntry) -> Option<String> {
        self.catalog
            .get(&entry.bird_id)
            .map(|bird| bird.common_name.to_lowercase())
    }
}

fn bird_matches(bird: &Bird, criteria: &FilterCriteria) -> bool {
    if let Some(name) = &criteria.name {
        let needle = name.to_lowercase();
        if !bird.common_name.to_lowercase().contains(&needle)
            && !bird.scientific_name.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(shape) = &criteria.shape {
        if !bird.shape.eq_ignore_ascii_case(shape) {
            return false;
        }
    }
    if let Some(size) = criteria.size {
        if bird.size != size {
            return false;
        }
    }
    if let Some(location) = &criteria.location {
        let needle = location.to_lowercase();
        if !bird
            .valid_locations
            .iter()
            .any(|loc| loc.to_lowercase().contains(&needle))
        {
            return false;
        }
    }
    criteria
        .field_marks
        .iter()
        .all(|group| mark_group_matches(bird, group))
}

/// A group is satisfied by any one of the bird's marks: same area, same
/// variant (or no variant selected), and intersecting colors (or no color
/// selected).
fn mark_group_matches(bird: &Bird, group: &FieldMarkSelection) -> bool {
    bird.field_marks.iter().any(|mark| {
        if !mark.area.eq_ignore_ascii_case(&group.area) {
            return false;
        }
        if let Some(variant) = &group.variant {
            let variant_matches = mark
                .variant
                .as_deref()
                .is_some_and(|mv| mv.eq_ignore_ascii_case(variant));
            if !variant_matches {
                return false;
            }
        }
        group.colors.is_empty()
            || mark
                .colors
                .iter()
                .any(|color| group.colors.iter().any(|gc| gc.eq_ignore_ascii_case(color)))
    })
}
