//! Static piece, spell, and tech-line catalog data.
//!
//! Everything here is immutable data read once at startup; the rules
//! engine references entries only by their catalog key, never by index.

pub mod pieces;
pub mod spells;
pub mod techline;

pub use pieces::{all_piece_stats, piece_stats};
pub use spells::{all_spell_defs, spell_def, SpellDef};
pub use techline::default_tech_line;
