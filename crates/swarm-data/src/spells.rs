//! The spell catalog, loaded once from an embedded TOML table.
//!
//! A spell's effect and target constraint reuse the same types a piece
//! ability uses, so the applier resolves a played spell and an activated
//! ability through one shared code path.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use swarm_types::{AttackEffect, SpellId, TargetConstraint};

/// One spell's catalog-defined behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellDef {
    pub id: SpellId,
    pub display_name: String,
    /// Costs 1 sorcery-power to cast.
    pub is_sorcery: bool,
    /// Discarding (rather than casting) this spell produces sorcery-power.
    pub is_cantrip: bool,
    /// A discarded cantrip of this kind produces 2 sorcery-power instead of 1.
    pub is_double_cantrip: bool,
    pub constraint: TargetConstraint,
    pub effect: AttackEffect,
}

#[derive(Deserialize)]
struct SpellCatalogFile {
    spell: Vec<SpellDef>,
}

static CATALOG: Lazy<BTreeMap<SpellId, SpellDef>> = Lazy::new(|| {
    let file: SpellCatalogFile =
        toml::from_str(include_str!("spells.toml")).expect("spells.toml is well-formed");
    file.spell.into_iter().map(|s| (s.id.clone(), s)).collect()
});

pub fn spell_def(id: &SpellId) -> Option<&'static SpellDef> {
    CATALOG.get(id)
}

pub fn all_spell_defs() -> impl Iterator<Item = &'static SpellDef> {
    CATALOG.values()
}
