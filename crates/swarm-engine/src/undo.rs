//! Targeted undo: remove one past action from the current turn's log and
//! replay everything else from the turn's starting snapshot.
//!
//! This deliberately does not attempt to hand-reverse an action's effects —
//! killed pieces, spawned reinforcements, and damage can cascade in ways that
//! are hard to invert correctly. Replay sidesteps that: it can never drift
//! from what `apply::do_action` would produce, because it *is*
//! `apply::do_action`, run again.

use swarm_types::{Board, BoardAction, GameError, PieceName, PieceSpec, Side, SpellId};

use crate::apply::do_action;
use crate::legality::{buy_reinforcement_undo_legal, local_piece_undo_legal, spell_undo_legal};

/// Remove the action that most recently moved, attacked, spawned with, or
/// activated an ability on `piece`, then replay. Fails (leaving the board
/// untouched) if no such action exists, the piece belongs to the other
/// side, or replay without it is illegal.
pub fn undo_piece_action(board: &mut Board<BoardAction>, side: Side, piece: &PieceSpec) -> Result<(), GameError> {
    let target_id = match board.state.resolve(piece) {
        Some(id) => {
            local_piece_undo_legal(&board.state, side, piece)?;
            id
        }
        None => {
            let id = board
                .initial_state_this_turn
                .resolve(piece)
                .ok_or(swarm_types::LegalityError::NothingToUndo)?;
            if board.initial_state_this_turn.piece_by_id[&id].side != side {
                return Err(swarm_types::LegalityError::WrongSide.into());
            }
            id
        }
    };

    let index = board.actions_this_turn.iter().rposition(|logged| {
        logged.side == side && action_touches_piece(&logged.action, target_id, board)
    });
    let Some(index) = index else {
        return Err(swarm_types::LegalityError::NothingToUndo.into());
    };

    replay_without(board, index)
}

/// Remove the most recent `PlaySpell` of `spell_id` cast by `side`, then replay.
pub fn undo_spell(board: &mut Board<BoardAction>, side: Side, spell_id: &SpellId) -> Result<(), GameError> {
    spell_undo_legal(&board.state, side, spell_id)?;
    let index = board.actions_this_turn.iter().rposition(|logged| {
        logged.side == side
            && matches!(&logged.action, BoardAction::PlaySpell { spell_id: s, .. } if s == spell_id)
    });
    let Some(index) = index else {
        return Err(swarm_types::LegalityError::NothingToUndo.into());
    };
    replay_without(board, index)
}

/// Remove the most recent `BuyReinforcement` of `piece_name` bought by
/// `side`, then replay.
pub fn undo_reinforcement(board: &mut Board<BoardAction>, side: Side, piece_name: &PieceName) -> Result<(), GameError> {
    buy_reinforcement_undo_legal(&board.state, side, piece_name)?;
    let index = board.actions_this_turn.iter().rposition(|logged| {
        logged.side == side
            && matches!(&logged.action, BoardAction::BuyReinforcement { piece_name: n } if n == piece_name)
    });
    let Some(index) = index else {
        return Err(swarm_types::LegalityError::NothingToUndo.into());
    };
    replay_without(board, index)
}

/// Whether `action`, if re-applied against the board's starting state, would
/// touch the piece currently identified by `target_id`.
fn action_touches_piece(action: &BoardAction, target_id: u32, board: &Board<BoardAction>) -> bool {
    let resolves_to_target = |spec: &PieceSpec| -> bool {
        board.state.resolve(spec) == Some(target_id)
            || board.initial_state_this_turn.resolve(spec) == Some(target_id)
    };
    match action {
        BoardAction::Movements { movements } => movements.iter().any(|m| resolves_to_target(&m.piece)),
        BoardAction::Attack { attacker, target } => {
            resolves_to_target(attacker) || resolves_to_target(target)
        }
        BoardAction::ActivateAbility { piece, targets, .. } => {
            resolves_to_target(piece) || targets.iter().any(resolves_to_target)
        }
        BoardAction::Teleport { piece, .. } => resolves_to_target(piece),
        BoardAction::LocalPieceUndo { piece } => resolves_to_target(piece),
        _ => false,
    }
}

/// Drop the log entry at `skip_index`, replay everything else from
/// `initial_state_this_turn`, and commit only if every replayed action is
/// still legal. On failure the board is left exactly as it was.
fn replay_without(board: &mut Board<BoardAction>, skip_index: usize) -> Result<(), GameError> {
    let mut candidate_state = board.initial_state_this_turn.clone();
    let mut candidate_log = board.actions_this_turn.clone();
    candidate_log.remove(skip_index);

    for logged in &candidate_log {
        do_action(&mut candidate_state, logged.side, &logged.action)?;
    }

    board.state = candidate_state;
    board.actions_this_turn = candidate_log;
    Ok(())
}

/// Log a newly-applied action and bump the board's sequence counter. Callers
/// must have already run it through `apply::do_action` successfully.
pub fn record(board: &mut Board<BoardAction>, logged: swarm_types::LoggedAction<BoardAction>) {
    board.actions_this_turn.push(logged);
    board.last_sequence += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use swarm_types::{ActionId, Loc, LoggedAction, Movement, PieceSpec as Spec, Side};

    proptest! {
        #[test]
        fn record_advances_sequence_and_log_by_exactly_one_per_call(n in 0u32..20) {
            let mut board = crate::setup::new_board("t");
            let start_seq = board.last_sequence;
            for i in 0..n {
                record(
                    &mut board,
                    LoggedAction {
                        action_id: ActionId::from(format!("p{i}")),
                        side: Side::S0,
                        action: BoardAction::ResignBoard,
                    },
                );
            }
            prop_assert_eq!(board.last_sequence, start_seq + n as u64);
            prop_assert_eq!(board.actions_this_turn.len(), n as usize);
        }
    }

    fn push_and_apply(board: &mut Board<BoardAction>, side: Side, action: BoardAction, id: &str) {
        do_action(&mut board.state, side, &action).unwrap();
        record(
            board,
            LoggedAction {
                action_id: ActionId::from(id),
                side,
                action,
            },
        );
    }

    #[test]
    fn undoing_a_move_restores_original_location() {
        let mut board = crate::setup::new_board("t");
        let necro_id = board
            .state
            .piece_by_id
            .values()
            .find(|p| p.side == Side::S0)
            .unwrap()
            .id;
        let start_loc = board.state.piece_by_id[&necro_id].loc;
        let dest = Loc::new(start_loc.x, start_loc.y + 1);

        push_and_apply(
            &mut board,
            Side::S0,
            BoardAction::Movements {
                movements: vec![Movement {
                    piece: Spec::StartedTurnWithId { id: necro_id },
                    path: vec![start_loc, dest],
                }],
            },
            "a1",
        );
        assert_eq!(board.state.piece_by_id[&necro_id].loc, dest);

        undo_piece_action(&mut board, Side::S0, &Spec::StartedTurnWithId { id: necro_id }).unwrap();
        assert_eq!(board.state.piece_by_id[&necro_id].loc, start_loc);
        assert!(board.actions_this_turn.is_empty());
    }

    #[test]
    fn undo_with_nothing_logged_fails() {
        let mut board = crate::setup::new_board("t");
        let result = undo_spell(&mut board, Side::S0, &SpellId::from("fireball"));
        assert!(result.is_err());
    }

    #[test]
    fn a_side_cannot_undo_the_other_sides_move() {
        let mut board = crate::setup::new_board("t");
        let necro_id = board
            .state
            .piece_by_id
            .values()
            .find(|p| p.side == Side::S0)
            .unwrap()
            .id;
        let start_loc = board.state.piece_by_id[&necro_id].loc;
        let dest = Loc::new(start_loc.x, start_loc.y + 1);

        push_and_apply(
            &mut board,
            Side::S0,
            BoardAction::Movements {
                movements: vec![Movement {
                    piece: Spec::StartedTurnWithId { id: necro_id },
                    path: vec![start_loc, dest],
                }],
            },
            "a1",
        );

        let result = undo_piece_action(&mut board, Side::S1, &Spec::StartedTurnWithId { id: necro_id });
        assert!(result.is_err());
        assert_eq!(board.state.piece_by_id[&necro_id].loc, dest);
    }

    #[test]
    fn a_side_cannot_undo_the_other_sides_reinforcement_purchase() {
        let mut board = crate::setup::new_board("t");
        push_and_apply(
            &mut board,
            Side::S0,
            BoardAction::BuyReinforcement { piece_name: PieceName::from("zombie") },
            "a1",
        );

        let result = undo_reinforcement(&mut board, Side::S1, &PieceName::from("zombie"));
        assert!(result.is_err());
    }
}
