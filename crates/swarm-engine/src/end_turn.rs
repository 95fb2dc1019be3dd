//! End-of-turn resolution: the ordered sequence of board bookkeeping that
//! runs every time a side finishes its turn on one board.
//!
//! Order matters — wailing deaths must resolve before graveyard income is
//! counted (a piece that just died no longer controls its tile), and mod
//! durations tick down only after that.

use swarm_types::{ActState, Board, BoardAction, BoardState, Game, Side, Terrain};

/// Mana gained per controlled `Graveyard` tile, added to both the board's
/// local wallet (reinforcement purchases) and the shared game pool (tech).
const MANA_PER_GRAVEYARD: i32 = 1;
/// Sorcery power gained per controlled `SorceryNode` tile, added to the
/// board's own pool.
const SORCERY_PER_NODE: i32 = 1;

pub fn end_turn(board: &mut Board<BoardAction>, game: &mut Game, board_idx: usize) {
    let ending_side = board.state.side;

    resolve_wailing_deaths(&mut board.state);

    let graveyard_income =
        count_controlled_tiles(&board.state, ending_side, &Terrain::Graveyard) * MANA_PER_GRAVEYARD;
    let total_mana_gain = graveyard_income + *game.extra_mana_per_turn.get(ending_side);
    *board.state.total_mana.get_mut(ending_side) += total_mana_gain;
    board.state.mana_this_round.set(ending_side, total_mana_gain);
    *game.mana.get_mut(ending_side) += graveyard_income;

    let sorcery_income = count_controlled_tiles(&board.state, ending_side, &Terrain::SorceryNode)
        * SORCERY_PER_NODE;
    board.state.sorcery_power += sorcery_income;

    decrement_mod_durations(&mut board.state);

    check_graveyard_victory(&mut board.state);

    let next_side = ending_side.opposite();
    reset_per_turn_flags(&mut board.state, next_side);

    board.state.side = next_side;
    board.state.turn_number += 1;
    board.state.has_used_spawner_tile = false;

    board.initial_state_this_turn = board.state.clone();
    board.actions_this_turn.clear();

    if board.state.has_won.is_some() && !game.is_board_done[board_idx] {
        game.is_board_done[board_idx] = true;
    }
}

fn count_controlled_tiles(state: &BoardState, side: Side, terrain: &Terrain) -> i32 {
    state
        .tiles
        .iter()
        .filter(|(_, tile)| tile.terrain == *terrain)
        .filter(|(loc, _)| state.pieces_at(*loc).iter().any(|p| p.side == side))
        .count() as i32
}

fn resolve_wailing_deaths(state: &mut BoardState) {
    let dying: Vec<u32> = state
        .piece_by_id
        .values()
        .filter(|p| p.marked_for_wailing_death)
        .map(|p| p.id)
        .collect();
    for id in dying {
        if let Some(piece) = state.piece_by_id.remove(&id) {
            if let Some(vec) = state.pieces_by_loc.get_mut(piece.loc) {
                vec.retain(|p| p.id != id);
            }
            state.killed_this_turn.push(swarm_types::KilledRecord {
                spec: swarm_types::PieceSpec::StartedTurnWithId { id: piece.id },
                name: piece.base_stats_name,
                side: piece.side,
                loc: piece.loc,
            });
        }
    }
}

fn decrement_mod_durations(state: &mut BoardState) {
    for piece in state.piece_by_id.values_mut() {
        piece.mods_with_duration.retain_mut(|m| {
            m.duration -= 1;
            m.duration > 0
        });
    }
    state.tiles.transform(|_, tile| {
        tile.mods_with_duration.retain_mut(|m| {
            m.duration -= 1;
            m.duration > 0
        });
    });
}

/// A side wins a board outright once it occupies this many graveyard tiles
/// with friendly pieces, regardless of how many graveyards the map has.
const GRAVEYARD_VICTORY_THRESHOLD: i32 = 8;

fn check_graveyard_victory(state: &mut BoardState) {
    if state.has_won.is_some() {
        return;
    }
    let graveyards: Vec<_> = state
        .tiles
        .iter()
        .filter(|(_, t)| t.terrain == Terrain::Graveyard)
        .map(|(loc, _)| loc)
        .collect();
    for side in [Side::S0, Side::S1] {
        let controlled = graveyards
            .iter()
            .filter(|&&loc| state.pieces_at(loc).iter().any(|p| p.side == side))
            .count() as i32;
        if controlled >= GRAVEYARD_VICTORY_THRESHOLD {
            state.has_won = Some(side);
            return;
        }
    }
}

fn reset_per_turn_flags(state: &mut BoardState, side: Side) {
    for piece in state.piece_by_id.values_mut() {
        if piece.side != side {
            continue;
        }
        piece.has_moved = false;
        piece.act_state = ActState::moving_start();
        piece.has_spawned_this_turn = false;
        piece.abilities_used_this_turn.clear();
        piece.marked_for_wailing_death = false;
    }
    state.killed_this_turn.clear();
    state.unsummoned_this_turn.clear();
    state.spawns_this_turn.clear();
}
