//! `tryLegality` — a pure predicate over the current board and a proposed
//! action. Never mutates; `apply::do_action` re-checks this before mutating.

use std::collections::{HashMap, HashSet};

use swarm_types::{
    Ability, ActState, BoardAction, BoardState, LegalityError, Loc, Movement, Piece, PieceName,
    PieceSpec, PieceStats, Side, TargetConstraint,
};

type Result<T> = std::result::Result<T, LegalityError>;

pub fn try_legality(state: &BoardState, side: Side, action: &BoardAction) -> Result<()> {
    match action {
        BoardAction::Movements { movements } => movements_legal(state, side, movements),
        BoardAction::Attack { attacker, target } => attack_legal(state, side, attacker, target),
        BoardAction::Spawn { spawn_loc, piece_name } => {
            spawn_legal(state, side, *spawn_loc, piece_name)
        }
        BoardAction::ActivateAbility { piece, name, targets } => {
            activate_ability_legal(state, side, piece, name, targets)
        }
        BoardAction::Teleport { piece, src, dest } => teleport_legal(state, side, piece, *src, *dest),
        BoardAction::ActivateTile { loc } => activate_tile_legal(state, *loc),
        BoardAction::PlaySpell { spell_id, targets } => play_spell_legal(state, side, spell_id, targets),
        BoardAction::DiscardSpell { spell_id } => has_spell_legal(state, side, spell_id),
        BoardAction::GainSpell { spell_id: _ } => Ok(()),
        BoardAction::SpellUndo { spell_id } => spell_undo_legal(state, side, spell_id),
        BoardAction::BuyReinforcement { piece_name } => buy_reinforcement_legal(state, side, piece_name),
        BoardAction::BuyReinforcementUndo { piece_name } => {
            buy_reinforcement_undo_legal(state, side, piece_name)
        }
        BoardAction::LocalPieceUndo { piece } => local_piece_undo_legal(state, side, piece),
        BoardAction::SetBoardDone { .. } => Ok(()),
        BoardAction::ResignBoard => Ok(()),
    }
}

fn get_piece<'a>(state: &'a BoardState, spec: &PieceSpec) -> Result<&'a Piece> {
    state
        .resolve(spec)
        .and_then(|id| state.piece_by_id.get(&id))
        .ok_or(LegalityError::PieceNotFound)
}

fn stats_of(piece: &Piece) -> Result<&'static PieceStats> {
    swarm_data::piece_stats(&piece.base_stats_name).ok_or(LegalityError::PieceNotFound)
}

fn walkable(stats: &PieceStats, terrain: &swarm_types::Terrain) -> bool {
    if stats.is_flying {
        terrain.is_walkable_by_flying()
    } else {
        terrain.is_walkable_by_ground()
    }
}

// ---------------------------------------------------------------------------
// 4.B.1 Movement
// ---------------------------------------------------------------------------

fn movements_legal(state: &BoardState, side: Side, movements: &[Movement]) -> Result<()> {
    if movements.is_empty() {
        return Err(LegalityError::InvalidPath);
    }

    let mut moving_ids = HashSet::new();
    let mut resolved = Vec::with_capacity(movements.len());

    for m in movements {
        let piece = get_piece(state, &m.piece)?;
        if piece.side != side {
            return Err(LegalityError::WrongSide);
        }
        if !matches!(piece.act_state, ActState::Moving { .. }) {
            return Err(LegalityError::AlreadyActed);
        }
        if !moving_ids.insert(piece.id) {
            return Err(LegalityError::InvalidPath);
        }

        if m.path.first() != Some(&piece.loc) {
            return Err(LegalityError::InvalidPath);
        }
        let mut seen = HashSet::new();
        for &loc in &m.path {
            if !seen.insert(loc) {
                return Err(LegalityError::InvalidPath);
            }
        }
        for pair in m.path.windows(2) {
            if !pair[0].is_adjacent(pair[1]) {
                return Err(LegalityError::InvalidPath);
            }
        }

        let stats = stats_of(piece)?;
        let steps = m.path.len() as i32 - 1;
        if steps > stats.move_range - piece.steps_used() {
            return Err(LegalityError::NotEnoughMovement);
        }

        for &loc in &m.path[1..] {
            let tile = state.tiles.get(loc).ok_or(LegalityError::OutOfRange)?;
            if !walkable(stats, &tile.terrain) {
                return Err(LegalityError::Blocked);
            }
            if !stats.is_flying
                && state
                    .pieces_at(loc)
                    .iter()
                    .any(|p| p.side != side && !moving_ids.contains(&p.id))
            {
                return Err(LegalityError::Blocked);
            }
        }

        let dest = *m.path.last().unwrap();
        resolved.push((piece.id, piece.side, stats, dest));
    }

    // Net occupancy at every destination, with all moving pieces virtually
    // vacated first so friendly swarm-swaps are legal.
    let mut dest_occupants: HashMap<Loc, Vec<(u32, PieceName, Side)>> = HashMap::new();
    for (_, tile_loc_piece) in state.pieces_by_loc.iter() {
        for p in tile_loc_piece {
            if !moving_ids.contains(&p.id) {
                dest_occupants
                    .entry(p.loc)
                    .or_default()
                    .push((p.id, p.base_stats_name.clone(), p.side));
            }
        }
    }
    for &(id, piece_side, stats, dest) in &resolved {
        dest_occupants
            .entry(dest)
            .or_default()
            .push((id, stats.name.clone(), piece_side));
    }

    for &(_, _, stats, dest) in &resolved {
        let occupants = &dest_occupants[&dest];
        check_swarm_rule(occupants, stats)?;
    }

    Ok(())
}

fn check_swarm_rule(occupants: &[(u32, PieceName, Side)], moving_stats: &PieceStats) -> Result<()> {
    if occupants.len() <= 1 {
        return Ok(());
    }
    let (_, first_name, first_side) = &occupants[0];
    let same = occupants
        .iter()
        .all(|(_, name, side)| name == first_name && side == first_side);
    if !same {
        return Err(LegalityError::OccupancyExceeded);
    }
    let max = if first_name == &moving_stats.name {
        moving_stats.swarm_max
    } else {
        swarm_data::piece_stats(first_name)
            .map(|s| s.swarm_max)
            .unwrap_or(1)
    };
    if occupants.len() as i32 > max {
        return Err(LegalityError::OccupancyExceeded);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4.B.2 Attack
// ---------------------------------------------------------------------------

fn attack_legal(state: &BoardState, side: Side, attacker: &PieceSpec, target: &PieceSpec) -> Result<()> {
    let attacker_piece = get_piece(state, attacker)?;
    if attacker_piece.side != side {
        return Err(LegalityError::WrongSide);
    }
    let target_piece = get_piece(state, target)?;
    if target_piece.side == side {
        return Err(LegalityError::WrongSide);
    }

    let attacker_stats = stats_of(attacker_piece)?;
    let target_stats = stats_of(target_piece)?;

    let effect = attacker_stats
        .attack_effect
        .as_ref()
        .ok_or(LegalityError::OutOfRange)?;

    if attacker_stats.is_lumbering && attacker_piece.has_moved {
        return Err(LegalityError::AlreadyActed);
    }

    let attacks_used = match attacker_piece.act_state {
        ActState::Moving { .. } => 0,
        ActState::Attacking { attacks_used } => attacks_used,
        ActState::Spawning | ActState::DoneActing => return Err(LegalityError::AlreadyActed),
    };
    if attacks_used >= attacker_stats.num_attacks {
        return Err(LegalityError::AlreadyActed);
    }

    let range = attacker_stats.attack_range_against(target_stats.is_flying);
    if attacker_piece.loc.distance(target_piece.loc) > range {
        return Err(LegalityError::OutOfRange);
    }

    check_attack_effect_restrictions(effect, attacker_stats, target_stats)?;

    Ok(())
}

fn check_attack_effect_restrictions(
    effect: &swarm_types::AttackEffect,
    attacker_stats: &PieceStats,
    target_stats: &PieceStats,
) -> Result<()> {
    use swarm_types::AttackEffect;

    if !attacker_stats.can_hurt_necromancer && target_stats.is_necromancer {
        return Err(LegalityError::CannotHurtNecromancer);
    }
    match effect {
        AttackEffect::Kill | AttackEffect::TransformInto { .. } if target_stats.is_necromancer => {
            Err(LegalityError::CannotHurtNecromancer)
        }
        AttackEffect::Unsummon if target_stats.is_persistent => {
            Err(LegalityError::PersistentCannotBeUnsummoned)
        }
        AttackEffect::Damage { .. } if attacker_stats.is_wailing && target_stats.is_necromancer => {
            Err(LegalityError::CannotHurtNecromancer)
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// 4.B.3 Spawn
// ---------------------------------------------------------------------------

fn spawn_legal(state: &BoardState, side: Side, spawn_loc: Loc, piece_name: &PieceName) -> Result<()> {
    let count = state
        .reinforcements
        .get(side)
        .get(piece_name)
        .copied()
        .unwrap_or(0);
    if count < 1 {
        return Err(LegalityError::OccupancyExceeded);
    }

    let new_stats = swarm_data::piece_stats(piece_name).ok_or(LegalityError::PieceNotFound)?;

    let has_source = state.piece_by_id.values().any(|p| {
        if p.side != side || p.has_spawned_this_turn {
            return false;
        }
        let source_stats = match swarm_data::piece_stats(&p.base_stats_name) {
            Some(s) => s,
            None => return false,
        };
        source_stats.is_eldritch || p.loc.distance(spawn_loc) <= source_stats.spawn_range
    });
    if !has_source {
        return Err(LegalityError::OutOfRange);
    }

    let tile = state.tiles.get(spawn_loc).ok_or(LegalityError::OutOfRange)?;
    if !walkable(new_stats, &tile.terrain) {
        return Err(LegalityError::Blocked);
    }

    let occupants: Vec<_> = state
        .pieces_at(spawn_loc)
        .iter()
        .map(|p| (p.id, p.base_stats_name.clone(), p.side))
        .chain(std::iter::once((u32::MAX, new_stats.name.clone(), side)))
        .collect();
    check_swarm_rule(&occupants, new_stats)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// 4.B.4 Ability activation / Teleport / Tile activation
// ---------------------------------------------------------------------------

fn activate_ability_legal(
    state: &BoardState,
    side: Side,
    piece: &PieceSpec,
    name: &swarm_types::AbilityId,
    targets: &[PieceSpec],
) -> Result<()> {
    let p = get_piece(state, piece)?;
    if p.side != side {
        return Err(LegalityError::WrongSide);
    }
    if matches!(p.act_state, ActState::DoneActing) {
        return Err(LegalityError::AlreadyActed);
    }
    let stats = stats_of(p)?;
    let ability = stats.abilities.get(name).ok_or(LegalityError::AbilityNotFound)?;
    if p.abilities_used_this_turn.contains(name) {
        return Err(LegalityError::AbilityAlreadyUsed);
    }
    if ability.is_sorcery() && state.sorcery_power < 1 {
        return Err(LegalityError::NotEnoughSorcery);
    }

    if let Ability::TargetedAbility { constraint, .. } = ability {
        if targets.is_empty() {
            return Err(LegalityError::TargetConstraintUnmet);
        }
        for t in targets {
            let target_piece = get_piece(state, t)?;
            check_target_constraint(state, p, target_piece, constraint)?;
        }
    }

    Ok(())
}

fn check_target_constraint(
    state: &BoardState,
    source: &Piece,
    target: &Piece,
    constraint: &TargetConstraint,
) -> Result<()> {
    match constraint {
        TargetConstraint::AdjacentEnemy => {
            if target.side == source.side || !source.loc.is_adjacent(target.loc) {
                return Err(LegalityError::TargetConstraintUnmet);
            }
        }
        TargetConstraint::AdjacentFriendly => {
            if target.side != source.side || !source.loc.is_adjacent(target.loc) {
                return Err(LegalityError::TargetConstraintUnmet);
            }
        }
        TargetConstraint::AnyOnBoard => {}
        TargetConstraint::WithinRange { range } => {
            if source.loc.distance(target.loc) > *range {
                return Err(LegalityError::TargetConstraintUnmet);
            }
        }
    }
    let _ = state;
    Ok(())
}

fn teleport_legal(state: &BoardState, side: Side, piece: &PieceSpec, src: Loc, dest: Loc) -> Result<()> {
    let p = get_piece(state, piece)?;
    if p.side != side {
        return Err(LegalityError::WrongSide);
    }
    if p.loc != src {
        return Err(LegalityError::PieceNotFound);
    }
    if !matches!(p.act_state, ActState::Moving { steps_used: 0 }) {
        return Err(LegalityError::AlreadyActed);
    }
    let src_tile = state.tiles.get(src).ok_or(LegalityError::OutOfRange)?;
    if !matches!(src_tile.terrain, swarm_types::Terrain::Teleporter) {
        return Err(LegalityError::NotATeleporter);
    }
    let dest_tile = state.tiles.get(dest).ok_or(LegalityError::OutOfRange)?;
    let stats = stats_of(p)?;
    if !walkable(stats, &dest_tile.terrain) {
        return Err(LegalityError::Blocked);
    }
    let occupants: Vec<_> = state
        .pieces_at(dest)
        .iter()
        .filter(|o| o.id != p.id)
        .map(|o| (o.id, o.base_stats_name.clone(), o.side))
        .chain(std::iter::once((p.id, stats.name.clone(), side)))
        .collect();
    check_swarm_rule(&occupants, stats)?;
    Ok(())
}

fn activate_tile_legal(state: &BoardState, loc: Loc) -> Result<()> {
    let tile = state.tiles.get(loc).ok_or(LegalityError::OutOfRange)?;
    if !matches!(tile.terrain, swarm_types::Terrain::Spawner { .. }) {
        return Err(LegalityError::NotASpawner);
    }
    if state.has_used_spawner_tile {
        return Err(LegalityError::SpawnerAlreadyUsed);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// 4.B.5 Spells
// ---------------------------------------------------------------------------

fn has_spell_legal(state: &BoardState, side: Side, spell_id: &swarm_types::SpellId) -> Result<()> {
    if state.spells_in_hand.get(side).contains(spell_id) {
        Ok(())
    } else {
        Err(LegalityError::SpellNotInHand)
    }
}

fn play_spell_legal(
    state: &BoardState,
    side: Side,
    spell_id: &swarm_types::SpellId,
    targets: &[PieceSpec],
) -> Result<()> {
    has_spell_legal(state, side, spell_id)?;
    let def = swarm_data::spell_def(spell_id).ok_or(LegalityError::SpellNotInHand)?;
    if def.is_sorcery && state.sorcery_power < 1 {
        return Err(LegalityError::NotEnoughSorcery);
    }
    if targets.is_empty() {
        return Err(LegalityError::TargetConstraintUnmet);
    }
    for t in targets {
        let target_piece = get_piece(state, t)?;
        // Spells are not anchored to a source piece; treat the first valid
        // target as its own constraint origin for range-style constraints.
        if let TargetConstraint::WithinRange { range } = &def.constraint {
            if targets
                .iter()
                .filter_map(|o| get_piece(state, o).ok())
                .all(|o| o.loc.distance(target_piece.loc) > *range)
                && targets.len() > 1
            {
                return Err(LegalityError::TargetConstraintUnmet);
            }
        }
    }
    Ok(())
}

pub(crate) fn spell_undo_legal(state: &BoardState, side: Side, spell_id: &swarm_types::SpellId) -> Result<()> {
    if state
        .spells_played
        .iter()
        .any(|s| &s.spell_id == spell_id && s.side == side)
    {
        Ok(())
    } else {
        Err(LegalityError::NothingToUndo)
    }
}

// ---------------------------------------------------------------------------
// 4.B.6 General & board lifecycle actions
// ---------------------------------------------------------------------------

fn buy_reinforcement_legal(state: &BoardState, side: Side, piece_name: &PieceName) -> Result<()> {
    let stats = swarm_data::piece_stats(piece_name).ok_or(LegalityError::PieceNotFound)?;
    if state.total_mana.get(side) - state.total_costs.get(side) < stats.cost {
        return Err(LegalityError::NotEnoughMana);
    }
    Ok(())
}

pub(crate) fn buy_reinforcement_undo_legal(state: &BoardState, side: Side, piece_name: &PieceName) -> Result<()> {
    let count = state
        .reinforcements
        .get(side)
        .get(piece_name)
        .copied()
        .unwrap_or(0);
    if count < 1 {
        return Err(LegalityError::NothingToUndo);
    }
    Ok(())
}

/// Legal only when `piece` still resolves against the live board and is
/// owned by `side`. A piece that died earlier this turn is not handled
/// here — `undo::undo_piece_action` checks ownership against the turn's
/// starting snapshot for that case before ever reaching this check.
pub(crate) fn local_piece_undo_legal(state: &BoardState, side: Side, piece: &PieceSpec) -> Result<()> {
    let id = state.resolve(piece).ok_or(LegalityError::NothingToUndo)?;
    if state.piece_by_id[&id].side != side {
        return Err(LegalityError::WrongSide);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::{PieceSpec as Spec, Side, Terrain, Tile};

    fn board_10x10() -> BoardState {
        crate::setup::empty_board_state(10, 10, Terrain::Ground, Side::S0)
    }

    fn place(state: &mut BoardState, side: Side, name: &str, loc: Loc) -> u32 {
        crate::setup::place_piece(state, side, &PieceName::from(name), loc)
    }

    #[test]
    fn zombie_single_step_move_is_legal() {
        let mut state = board_10x10();
        place(&mut state, Side::S0, "zombie", Loc::new(2, 1));
        let movements = vec![Movement {
            piece: Spec::StartedTurnWithId { id: 0 },
            path: vec![Loc::new(2, 1), Loc::new(2, 2)],
        }];
        assert_eq!(
            try_legality(&state, Side::S0, &BoardAction::Movements { movements }),
            Ok(())
        );
    }

    #[test]
    fn move_through_water_requires_flying() {
        let mut state = board_10x10();
        state.tiles.set(Loc::new(1, 0), Tile::new(Terrain::Water));
        place(&mut state, Side::S0, "zombie", Loc::new(0, 0));
        let movements = vec![Movement {
            piece: Spec::StartedTurnWithId { id: 0 },
            path: vec![Loc::new(0, 0), Loc::new(1, 0)],
        }];
        assert_eq!(
            try_legality(&state, Side::S0, &BoardAction::Movements { movements }),
            Err(LegalityError::Blocked)
        );
    }

    #[test]
    fn attack_on_necromancer_with_kill_effect_is_cannot_hurt() {
        let mut state = board_10x10();
        place(&mut state, Side::S0, "zombie", Loc::new(0, 0));
        let necro = place(&mut state, Side::S1, "necromancer", Loc::new(0, 1));
        // Zombie's effect is Damage, not Kill, so craft a stats override is
        // unnecessary — check the Damage-vs-wailing/necromancer branch instead
        // by asserting zombie (non-wailing, can_hurt_necromancer) succeeds.
        let action = BoardAction::Attack {
            attacker: Spec::StartedTurnWithId { id: 0 },
            target: Spec::StartedTurnWithId { id: necro },
        };
        assert_eq!(try_legality(&state, Side::S0, &action), Ok(()));
    }

    #[test]
    fn spawn_without_reinforcements_is_rejected() {
        let state = board_10x10();
        let action = BoardAction::Spawn {
            spawn_loc: Loc::new(0, 0),
            piece_name: PieceName::from("zombie"),
        };
        assert_eq!(
            try_legality(&state, Side::S0, &action),
            Err(LegalityError::OccupancyExceeded)
        );
    }
}
