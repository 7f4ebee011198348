//! Typed entity identifiers, UUID v7 (time-sortable)

/// Defines a UUID-v7 id newtype with the conversions the store needs.
macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Create a new unique id using UUID v7
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::now_v7())
            }

            /// Get the string representation of this id
            #[must_use]
            pub fn as_str(&self) -> String {
                self.0.to_string()
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(uuid::Uuid::parse_str(s)?))
            }
        }
    };
}

entity_id!(
    /// Unique identifier for a user
    UserId
);
entity_id!(
    /// Unique identifier for a watchlist
    WatchlistId
);
entity_id!(
    /// Unique identifier for a watchlist entry
    EntryId
);
entity_id!(
    /// Unique identifier for a watchlist rule
    RuleId
);
entity_id!(
    /// Unique identifier for a share grant
    ShareId
);
entity_id!(
    /// Unique identifier for an observed-bird photo
    PhotoId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        assert_ne!(WatchlistId::new(), WatchlistId::new());
    }

    #[test]
    fn ids_parse_back_from_string() {
        let id = EntryId::new();
        let parsed: EntryId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
