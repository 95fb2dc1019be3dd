//! Interactive terminal client for manual play and smoke-testing.
//!
//! Drives a local, in-process match — no networking. Each turn, the active
//! side picks an action category, fills in the specifics at a handful of
//! text prompts, and the engine applies it the same way the server would.

use clap::Parser;
use dialoguer::{theme::ColorfulTheme, Input, Select};

use swarm_engine::{apply, end_turn, legality, setup, tech, undo};
use swarm_types::{ActionId, Board, BoardAction, Game, Loc, PieceName, PieceSpec, Side};

#[derive(Debug, Parser)]
#[command(name = "swarm-cli", about = "Interactive client for the swarm game")]
struct Cli {
    /// Number of boards to start the match with.
    #[arg(long, default_value_t = 1)]
    boards: usize,
    /// Wins required on one side to end the match.
    #[arg(long, default_value_t = 3)]
    target_wins: i32,
}

const MENU: [&str; 9] = [
    "Move piece(s)",
    "Attack",
    "Spawn reinforcement",
    "Buy reinforcement",
    "Activate ability",
    "Resign this board",
    "Undo last piece action",
    "End turn",
    "Quit",
];

fn main() {
    println!("\n  =========================");
    println!("    S W A R M   B O A R D");
    println!("  =========================\n");

    let cli = Cli::parse();
    let (mut game, mut boards) = setup::new_match(cli.boards, cli.target_wins);
    let mut action_counter: u64 = 0;

    'outer: loop {
        for board_idx in 0..boards.len() {
            if game.is_board_done[board_idx] {
                continue;
            }
            let board = &mut boards[board_idx];
            let side = board.state.side;

            display_board(board, &game, board_idx);

            let choice = Select::with_theme(&ColorfulTheme::default())
                .with_prompt(format!("board {board_idx} — {side}'s turn"))
                .items(&MENU)
                .default(0)
                .interact()
                .unwrap();

            match choice {
                0 => prompt_movements(board, side, &mut action_counter),
                1 => prompt_attack(board, side, &mut action_counter),
                2 => prompt_spawn(board, side, &mut action_counter),
                3 => prompt_buy_reinforcement(board, side, &mut action_counter),
                4 => println!("  (activate-ability prompts are not implemented in this client)"),
                5 => {
                    if submit(board, side, BoardAction::ResignBoard, &mut action_counter).is_ok() {
                        game.is_board_done[board_idx] = true;
                    }
                }
                6 => prompt_undo(board, side),
                7 => {
                    end_turn::end_turn(board, &mut game, board_idx);
                    tech::snapshot_starting_levels(&mut game);
                }
                _ => break 'outer,
            }
        }

        if game.is_board_done.iter().all(|&d| d) {
            println!("\n  Every board has finished.");
            break;
        }
    }

    display_final_score(&game);
}

fn submit(
    board: &mut Board<BoardAction>,
    side: Side,
    action: BoardAction,
    counter: &mut u64,
) -> Result<(), ()> {
    match action {
        BoardAction::LocalPieceUndo { ref piece } => match undo::undo_piece_action(board, side, piece) {
            Ok(()) => Ok(()),
            Err(e) => {
                println!("  rejected: {e}");
                Err(())
            }
        },
        _ => match apply::do_action(&mut board.state, side, &action) {
            Ok(()) => {
                *counter += 1;
                undo::record(
                    board,
                    swarm_types::LoggedAction {
                        action_id: ActionId::from(format!("cli-{counter}")),
                        side,
                        action,
                    },
                );
                Ok(())
            }
            Err(e) => {
                println!("  rejected: {e}");
                Err(())
            }
        },
    }
}

fn prompt_loc(label: &str) -> Option<Loc> {
    let text: String = Input::new().with_prompt(label).allow_empty(true).interact_text().unwrap();
    let (x, y) = text.split_once(',')?;
    Some(Loc::new(x.trim().parse().ok()?, y.trim().parse().ok()?))
}

fn prompt_piece_id(label: &str) -> Option<u32> {
    let text: String = Input::new().with_prompt(label).allow_empty(true).interact_text().unwrap();
    text.trim().parse().ok()
}

fn prompt_movements(board: &mut Board<BoardAction>, side: Side, counter: &mut u64) {
    let Some(id) = prompt_piece_id("piece id to move") else { return };
    let Some(start) = board.state.piece_by_id.get(&id).map(|p| p.loc) else {
        println!("  no such piece");
        return;
    };
    let mut path = vec![start];
    loop {
        let Some(next) = prompt_loc("next hex (x,y), blank to stop") else { break };
        path.push(next);
    }
    if path.len() < 2 {
        println!("  need at least one destination hex");
        return;
    }
    let movement = swarm_types::Movement { piece: PieceSpec::StartedTurnWithId { id }, path };
    let action = BoardAction::Movements { movements: vec![movement] };
    if let Err(e) = legality::try_legality(&board.state, side, &action) {
        println!("  illegal: {e:?}");
        return;
    }
    let _ = submit(board, side, action, counter);
}

fn prompt_attack(board: &mut Board<BoardAction>, side: Side, counter: &mut u64) {
    let (Some(attacker), Some(target)) =
        (prompt_piece_id("attacker piece id"), prompt_piece_id("target piece id"))
    else {
        return;
    };
    let action = BoardAction::Attack {
        attacker: PieceSpec::StartedTurnWithId { id: attacker },
        target: PieceSpec::StartedTurnWithId { id: target },
    };
    let _ = submit(board, side, action, counter);
}

fn prompt_spawn(board: &mut Board<BoardAction>, side: Side, counter: &mut u64) {
    let names: Vec<String> =
        board.state.reinforcements.get(side).keys().map(|n| n.to_string()).collect();
    if names.is_empty() {
        println!("  no reinforcements in hand");
        return;
    }
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("which reinforcement")
        .items(&names)
        .interact()
        .unwrap();
    let Some(loc) = prompt_loc("spawn at (x,y)") else { return };
    let action = BoardAction::Spawn { spawn_loc: loc, piece_name: PieceName::from(names[idx].as_str()) };
    let _ = submit(board, side, action, counter);
}

fn prompt_buy_reinforcement(board: &mut Board<BoardAction>, side: Side, counter: &mut u64) {
    let names: Vec<&'static str> =
        swarm_data::all_piece_stats().map(|p| p.name.as_str()).collect();
    let idx = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("buy which piece")
        .items(&names)
        .interact()
        .unwrap();
    let action = BoardAction::BuyReinforcement { piece_name: PieceName::from(names[idx]) };
    let _ = submit(board, side, action, counter);
}

fn prompt_undo(board: &mut Board<BoardAction>, side: Side) {
    let Some(id) = prompt_piece_id("piece id whose last action to undo") else { return };
    match undo::undo_piece_action(board, side, &PieceSpec::StartedTurnWithId { id }) {
        Ok(()) => println!("  undone"),
        Err(e) => println!("  nothing to undo: {e}"),
    }
}

fn display_board(board: &Board<BoardAction>, game: &Game, board_idx: usize) {
    println!("  ───────────────────────────────────────────");
    println!(
        "  board {board_idx} \"{}\" | turn {} | mana S0:{} S1:{} | sorcery:{}",
        board.name,
        board.state.turn_number,
        game.mana.get(Side::S0),
        game.mana.get(Side::S1),
        board.state.sorcery_power,
    );
    for piece in board.state.piece_by_id.values() {
        println!(
            "    #{} {} ({:?}) at {} dmg:{} {:?}",
            piece.id, piece.base_stats_name, piece.side, piece.loc, piece.damage, piece.act_state
        );
    }
    println!();
}

fn display_final_score(game: &Game) {
    println!("\n  === MATCH OVER ===");
    println!("  wins — S0: {}, S1: {}", game.wins.get(Side::S0), game.wins.get(Side::S1));
    if let Some(winner) = game.winner {
        println!("  winner: {winner}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_logs_successful_actions_for_undo() {
        let (_, mut boards) = setup::new_match(1, 3);
        let board = &mut boards[0];
        let mut counter = 0u64;

        submit(board, Side::S0, BoardAction::ResignBoard, &mut counter).unwrap();

        assert_eq!(counter, 1);
        assert_eq!(board.actions_this_turn.len(), 1);
    }

    #[test]
    fn submit_routes_local_piece_undo_through_the_undo_path_without_logging() {
        let (_, mut boards) = setup::new_match(1, 3);
        let board = &mut boards[0];
        let mut counter = 0u64;

        let result = submit(
            board,
            Side::S0,
            BoardAction::LocalPieceUndo { piece: PieceSpec::StartedTurnWithId { id: 0 } },
            &mut counter,
        );

        assert!(result.is_err());
        assert_eq!(counter, 0);
    }
}
