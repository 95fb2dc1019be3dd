//! The piece-stat catalog, loaded once from an embedded TOML table.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Deserialize;
use swarm_types::{PieceName, PieceStats};

#[derive(Deserialize)]
struct PieceCatalogFile {
    piece: Vec<PieceStats>,
}

static CATALOG: Lazy<BTreeMap<PieceName, PieceStats>> = Lazy::new(|| {
    let file: PieceCatalogFile =
        toml::from_str(include_str!("pieces.toml")).expect("pieces.toml is well-formed");
    file.piece.into_iter().map(|p| (p.name.clone(), p)).collect()
});

/// Look up a piece's immutable stats by catalog name.
pub fn piece_stats(name: &PieceName) -> Option<&'static PieceStats> {
    CATALOG.get(name)
}

/// Every catalog entry, in file order is not preserved (`BTreeMap` sorts by name).
pub fn all_piece_stats() -> impl Iterator<Item = &'static PieceStats> {
    CATALOG.values()
}
