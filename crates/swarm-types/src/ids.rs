//! Branded/newtype ID types for type safety.
//!
//! Each ID wraps a `Box<str>` for cheap cloning and small struct size.
//! In the future, these may become interned indices for zero-allocation lookups.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Box<str>);

        impl $name {
            pub fn new(s: impl Into<Box<str>>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.into())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s.into_boxed_str())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Catalog key for a piece type, e.g. `"zombie"` or `"spectre"`.
    ///
    /// Used wherever the data model names a piece by string: `baseStatsName`,
    /// `Terrain::Spawner`, `AttackEffect::TransformInto`, `deathSpawn`.
    PieceName
);

define_id!(
    /// Catalog key for a spell definition.
    SpellId
);

define_id!(
    /// Key into a piece's `abilities` map.
    AbilityId
);

define_id!(
    /// Joined-session identity (the `username` query parameter).
    Username
);

define_id!(
    /// Opaque game identity (the optional `gameHash` query parameter).
    GameId
);

define_id!(
    /// Client-generated action identifier (`clientId + counter`).
    ///
    /// Doubles as the idempotency key for duplicate-submission detection and
    /// as the undo target for `LocalPieceUndo` / `SpellUndo` / `BuyReinforcementUndo`.
    ActionId
);

define_id!(
    /// A live connection's identity within one game's session registry.
    SessionId
);
