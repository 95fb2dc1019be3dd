//! `doAction` — the mutating half of the two-phase action pipeline.
//!
//! Every call re-checks [`crate::legality::try_legality`] before touching the
//! board, so this is the only place mutation happens and the only place that
//! needs to stay consistent with undo's replay.

use swarm_types::{
    Ability, ActState, AttackEffect, BoardAction, BoardState, GameError, LegalityError, Loc, Piece,
    PieceName, Side, Terrain,
};

use crate::legality::try_legality;

pub fn do_action(state: &mut BoardState, side: Side, action: &BoardAction) -> Result<(), GameError> {
    try_legality(state, side, action)?;

    match action {
        BoardAction::Movements { movements } => {
            for m in movements {
                let id = state.resolve(&m.piece).ok_or(LegalityError::PieceNotFound)?;
                let dest = *m.path.last().unwrap();
                let steps = m.path.len() as i32 - 1;
                move_piece(state, id, dest);
                let piece = state.piece_by_id.get_mut(&id).unwrap();
                piece.has_moved = true;
                if let ActState::Moving { steps_used } = &mut piece.act_state {
                    *steps_used += steps;
                }
            }
        }
        BoardAction::Attack { attacker, target } => {
            let attacker_id = state.resolve(attacker).ok_or(LegalityError::PieceNotFound)?;
            let target_id = state.resolve(target).ok_or(LegalityError::PieceNotFound)?;
            let attacker_stats =
                swarm_data::piece_stats(&state.piece_by_id[&attacker_id].base_stats_name)
                    .ok_or(LegalityError::PieceNotFound)?;
            let effect = attacker_stats.attack_effect.clone().unwrap();
            apply_effect(state, target_id, &effect);
            let attacker_piece = state.piece_by_id.get_mut(&attacker_id).unwrap();
            if let ActState::Moving { .. } = attacker_piece.act_state {
                attacker_piece.act_state = ActState::Attacking { attacks_used: 1 };
            } else if let ActState::Attacking { attacks_used } = &mut attacker_piece.act_state {
                *attacks_used += 1;
            }
        }
        BoardAction::Spawn { spawn_loc, piece_name } => {
            spawn_piece(state, side, piece_name, *spawn_loc);
            mark_a_spawn_source(state, side, *spawn_loc);
        }
        BoardAction::ActivateAbility { piece, name, targets } => {
            let id = state.resolve(piece).ok_or(LegalityError::PieceNotFound)?;
            let stats = swarm_data::piece_stats(&state.piece_by_id[&id].base_stats_name)
                .ok_or(LegalityError::PieceNotFound)?;
            let ability = stats.abilities.get(name).unwrap().clone();
            apply_ability(state, id, &ability, targets);
            let piece = state.piece_by_id.get_mut(&id).unwrap();
            piece.abilities_used_this_turn.push(name.clone());
            if ability.is_sorcery() {
                state.sorcery_power -= 1;
            }
        }
        BoardAction::Teleport { piece, dest, .. } => {
            let id = state.resolve(piece).ok_or(LegalityError::PieceNotFound)?;
            // A teleport spends the piece's entire turn — no further move or attack.
            move_piece(state, id, *dest);
            let piece_mut = state.piece_by_id.get_mut(&id).unwrap();
            piece_mut.has_moved = true;
            piece_mut.act_state = ActState::DoneActing;
        }
        BoardAction::ActivateTile { loc } => {
            let piece_name = match &state.tiles.at(*loc).terrain {
                Terrain::Spawner { piece_name } => piece_name.clone(),
                _ => return Err(LegalityError::NotASpawner.into()),
            };
            state.has_used_spawner_tile = true;
            spawn_piece(state, side, &piece_name, *loc);
        }
        BoardAction::PlaySpell { spell_id, targets } => {
            let def = swarm_data::spell_def(spell_id).ok_or(LegalityError::SpellNotInHand)?;
            for t in targets {
                if let Some(id) = state.resolve(t) {
                    apply_effect(state, id, &def.effect.clone());
                }
            }
            let hand = state.spells_in_hand.get_mut(side);
            if let Some(pos) = hand.iter().position(|s| s == spell_id) {
                hand.remove(pos);
            }
            if def.is_sorcery {
                state.sorcery_power -= 1;
            }
            state.spells_played.push(swarm_types::SpellPlayInfo {
                spell_id: spell_id.clone(),
                side,
                targets: targets.clone(),
            });
        }
        BoardAction::DiscardSpell { spell_id } => {
            let hand = state.spells_in_hand.get_mut(side);
            if let Some(pos) = hand.iter().position(|s| s == spell_id) {
                hand.remove(pos);
            }
            if let Some(def) = swarm_data::spell_def(spell_id) {
                if def.is_double_cantrip {
                    state.sorcery_power += 2;
                } else if def.is_cantrip {
                    state.sorcery_power += 1;
                }
            }
        }
        BoardAction::GainSpell { spell_id } => {
            state.spells_in_hand.get_mut(side).push(spell_id.clone());
        }
        BoardAction::SpellUndo { .. }
        | BoardAction::LocalPieceUndo { .. }
        | BoardAction::BuyReinforcementUndo { .. } => {
            // Handled by `undo::undo_*`, which rewrites and replays the log
            // rather than mutating the live board directly.
            return Err(GameError::Internal {
                detail: "undo actions must go through the undo module".into(),
            });
        }
        BoardAction::BuyReinforcement { piece_name } => {
            let stats = swarm_data::piece_stats(piece_name).ok_or(LegalityError::PieceNotFound)?;
            state.total_costs.set(side, state.total_costs.get(side) + stats.cost);
            *state
                .reinforcements
                .get_mut(side)
                .entry(piece_name.clone())
                .or_insert(0) += 1;
        }
        BoardAction::SetBoardDone { .. } => {
            // Pure coordinator bookkeeping (`Game::is_board_done`); no
            // board-local state to mutate here.
        }
        BoardAction::ResignBoard => {
            state.has_won = Some(side.opposite());
        }
    }

    Ok(())
}

fn move_piece(state: &mut BoardState, id: u32, dest: Loc) {
    let old_loc = state.piece_by_id[&id].loc;
    if let Some(vec) = state.pieces_by_loc.get_mut(old_loc) {
        vec.retain(|p| p.id != id);
    }
    let piece = state.piece_by_id.get_mut(&id).unwrap();
    piece.loc = dest;
    state.pieces_by_loc.at_mut(dest).push(piece.clone());
}

fn remove_piece(state: &mut BoardState, id: u32) -> Option<Piece> {
    let piece = state.piece_by_id.remove(&id)?;
    if let Some(vec) = state.pieces_by_loc.get_mut(piece.loc) {
        vec.retain(|p| p.id != id);
    }
    Some(piece)
}

fn apply_effect(state: &mut BoardState, target_id: u32, effect: &AttackEffect) {
    match effect {
        AttackEffect::Damage { amount } => {
            let stats = match swarm_data::piece_stats(&state.piece_by_id[&target_id].base_stats_name) {
                Some(s) => s,
                None => return,
            };
            let defense = stats.defense;
            let piece = state.piece_by_id.get_mut(&target_id).unwrap();
            piece.damage += amount;
            if piece.damage >= defense {
                kill_piece(state, target_id);
            }
        }
        AttackEffect::Kill => kill_piece(state, target_id),
        AttackEffect::Unsummon => {
            if let Some(piece) = remove_piece(state, target_id) {
                state.unsummoned_this_turn.push(swarm_types::UnsummonedRecord {
                    spec: swarm_types::PieceSpec::StartedTurnWithId { id: piece.id },
                    name: piece.base_stats_name,
                    side: piece.side,
                });
            }
        }
        AttackEffect::Enchant { modifier } => {
            if let Some(piece) = state.piece_by_id.get_mut(&target_id) {
                piece.mods_with_duration.push(modifier.clone());
            }
        }
        AttackEffect::TransformInto { name } => {
            if let Some(piece) = state.piece_by_id.get_mut(&target_id) {
                piece.base_stats_name = name.clone();
            }
        }
    }
}

fn kill_piece(state: &mut BoardState, id: u32) {
    let Some(piece) = remove_piece(state, id) else {
        return;
    };
    let stats = swarm_data::piece_stats(&piece.base_stats_name);
    let death_spawn = stats.and_then(|s| s.death_spawn.clone());
    if let Some(s) = stats {
        state.total_costs.set(piece.side, state.total_costs.get(piece.side) - s.rebate);
    }
    state.killed_this_turn.push(swarm_types::KilledRecord {
        spec: swarm_types::PieceSpec::StartedTurnWithId { id: piece.id },
        name: piece.base_stats_name,
        side: piece.side,
        loc: piece.loc,
    });
    if let Some(spawn_name) = death_spawn {
        spawn_piece(state, piece.side, &spawn_name, piece.loc);
    }
}

fn spawn_piece(state: &mut BoardState, side: Side, piece_name: &PieceName, loc: Loc) {
    if let Some(count) = state.reinforcements.get_mut(side).get_mut(piece_name) {
        *count -= 1;
    }
    let id = state.take_next_piece_id();
    let piece = Piece {
        id,
        side,
        base_stats_name: piece_name.clone(),
        loc,
        damage: 0,
        act_state: ActState::DoneActing,
        has_moved: false,
        mods_with_duration: Vec::new(),
        has_spawned_this_turn: false,
        abilities_used_this_turn: Vec::new(),
        marked_for_wailing_death: false,
    };
    state.pieces_by_loc.at_mut(loc).push(piece.clone());
    state.piece_by_id.insert(id, piece);
    state.spawns_this_turn.push((id, piece_name.clone(), loc));
}

fn mark_a_spawn_source(state: &mut BoardState, side: Side, spawn_loc: Loc) {
    let candidate = state.piece_by_id.values().find_map(|p| {
        if p.side != side || p.has_spawned_this_turn {
            return None;
        }
        let stats = swarm_data::piece_stats(&p.base_stats_name)?;
        (stats.is_eldritch || p.loc.distance(spawn_loc) <= stats.spawn_range).then_some(p.id)
    });
    if let Some(id) = candidate {
        state.piece_by_id.get_mut(&id).unwrap().has_spawned_this_turn = true;
    }
}

fn apply_ability(
    state: &mut BoardState,
    id: u32,
    ability: &Ability,
    targets: &[swarm_types::PieceSpec],
) {
    match ability {
        Ability::SuicideAbility { .. } => kill_piece(state, id),
        Ability::BlinkAbility { .. } => {
            let loc = state.piece_by_id[&id].loc;
            let dest = loc
                .neighbors()
                .into_iter()
                .find(|&n| {
                    state
                        .tiles
                        .get(n)
                        .map(|t| t.terrain.is_walkable_by_ground())
                        .unwrap_or(false)
                        && state.pieces_at(n).is_empty()
                });
            if let Some(dest) = dest {
                move_piece(state, id, dest);
            }
        }
        Ability::KillAdjacentAbility { .. } => {
            if let Some(t) = targets.first().and_then(|t| state.resolve(t)) {
                kill_piece(state, t);
            }
        }
        Ability::SelfEnchantAbility { modifier, .. } => {
            state
                .piece_by_id
                .get_mut(&id)
                .unwrap()
                .mods_with_duration
                .push(modifier.clone());
        }
        Ability::TargetedAbility { effect, .. } => {
            for t in targets {
                if let Some(target_id) = state.resolve(t) {
                    apply_effect(state, target_id, effect);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::{PieceSpec as Spec, Terrain, Tile};

    fn board() -> BoardState {
        crate::setup::empty_board_state(6, 6, Terrain::Ground, Side::S0)
    }

    #[test]
    fn zombie_move_updates_loc_and_steps_used() {
        let mut state = board();
        crate::setup::place_piece(&mut state, Side::S0, &PieceName::from("zombie"), Loc::new(0, 0));
        let movements = vec![swarm_types::Movement {
            piece: Spec::StartedTurnWithId { id: 0 },
            path: vec![Loc::new(0, 0), Loc::new(0, 1)],
        }];
        do_action(&mut state, Side::S0, &BoardAction::Movements { movements }).unwrap();
        let piece = &state.piece_by_id[&0];
        assert_eq!(piece.loc, Loc::new(0, 1));
        assert_eq!(piece.steps_used(), 1);
        assert!(state.pieces_at(Loc::new(0, 0)).is_empty());
    }

    #[test]
    fn killing_a_zombie_spawns_a_spectre() {
        let mut state = board();
        crate::setup::place_piece(&mut state, Side::S0, &PieceName::from("zombie"), Loc::new(0, 0));
        kill_piece(&mut state, 0);
        assert_eq!(state.killed_this_turn.len(), 1);
        assert!(state
            .pieces_at(Loc::new(0, 0))
            .iter()
            .any(|p| p.base_stats_name.as_str() == "spectre"));
    }

    #[test]
    fn killing_a_piece_rebates_its_cost_to_its_owner() {
        let mut state = board();
        crate::setup::place_piece(&mut state, Side::S0, &PieceName::from("zombie"), Loc::new(0, 0));
        state.total_costs.set(Side::S0, 2);
        kill_piece(&mut state, 0);
        assert_eq!(*state.total_costs.get(Side::S0), 1);
    }

    #[test]
    fn teleport_consumes_the_piece_entire_turn() {
        let mut state = board();
        state.tiles.set(Loc::new(0, 0), Tile::new(Terrain::Teleporter));
        crate::setup::place_piece(&mut state, Side::S0, &PieceName::from("zombie"), Loc::new(0, 0));
        let action = BoardAction::Teleport {
            piece: Spec::StartedTurnWithId { id: 0 },
            src: Loc::new(0, 0),
            dest: Loc::new(0, 1),
        };
        do_action(&mut state, Side::S0, &action).unwrap();
        let piece = &state.piece_by_id[&0];
        assert_eq!(piece.loc, Loc::new(0, 1));
        assert_eq!(piece.act_state, ActState::DoneActing);
    }

    #[test]
    fn discarding_a_double_cantrip_produces_two_sorcery_power() {
        let mut state = board();
        state.spells_in_hand.get_mut(Side::S0).push(swarm_types::SpellId::from("wave_of_frost"));
        let starting = state.sorcery_power;
        do_action(
            &mut state,
            Side::S0,
            &BoardAction::DiscardSpell { spell_id: swarm_types::SpellId::from("wave_of_frost") },
        )
        .unwrap();
        assert_eq!(state.sorcery_power, starting + 2);
        assert!(state.spells_in_hand.get(Side::S0).is_empty());
    }

    #[test]
    fn undo_variants_are_rejected_by_do_action() {
        let mut state = board();
        let result = do_action(
            &mut state,
            Side::S0,
            &BoardAction::LocalPieceUndo {
                piece: Spec::StartedTurnWithId { id: 0 },
            },
        );
        assert!(result.is_err());
    }
}
