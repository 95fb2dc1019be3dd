//! The single logical owner of one game's authoritative state.
//!
//! A `Coordinator` runs as its own Tokio task, draining an `mpsc` channel of
//! [`Envelope`]s one at a time — a game session owned by its own task,
//! addressed by a channel, rather than by one connection's task. Every
//! mutation it applies is fanned out on a `broadcast` channel so every
//! connected session — not just the one that submitted the action — sees
//! the update.

use std::collections::HashMap;
use std::time::Duration;

use swarm_types::{
    Board, BoardAction, BoardSnapshot, Game, GameSnapshot, LoggedAction, Query, Response, Side,
    SideArray,
};
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::protocol_error::to_report_error;

/// One connection's registered identity, tracked only for seat bookkeeping —
/// the coordinator trusts the `side` an `Envelope` carries rather than
/// re-resolving it itself.
pub type SessionId = swarm_types::SessionId;

pub struct Envelope {
    pub side: Option<Side>,
    pub query: Query,
    /// A direct reply meant for only the submitting session (errors,
    /// heartbeat echoes) — anything broadcast-worthy goes out on
    /// [`CoordinatorHandle::outbound`] instead.
    pub reply: oneshot::Sender<Option<Response>>,
}

pub struct CoordinatorHandle {
    pub inbound: mpsc::Sender<Envelope>,
    pub outbound: broadcast::Sender<Response>,
}

struct Coordinator {
    game: Game,
    boards: Vec<Board<BoardAction>>,
    inbound: mpsc::Receiver<Envelope>,
    outbound: broadcast::Sender<Response>,
    /// Real-time turn allotment per side; a board's acting side's clock runs
    /// down every tick and auto-completes the turn when it hits zero.
    turn_seconds_per_side: SideArray<u64>,
    /// Seconds left on each board's current turn, indexed by board.
    seconds_remaining: Vec<i64>,
}

impl CoordinatorHandle {
    pub fn spawn(game: Game, boards: Vec<Board<BoardAction>>, turn_seconds_per_side: SideArray<u64>) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(256);
        let (outbound_tx, _) = broadcast::channel(256);
        let seconds_remaining =
            boards.iter().map(|b| *turn_seconds_per_side.get(b.state.side) as i64).collect();
        let mut coordinator = Coordinator {
            game,
            boards,
            inbound: inbound_rx,
            outbound: outbound_tx.clone(),
            turn_seconds_per_side,
            seconds_remaining,
        };
        tokio::spawn(async move { coordinator.run().await });
        Self { inbound: inbound_tx, outbound: outbound_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Response> {
        self.outbound.subscribe()
    }

    pub async fn submit(&self, side: Option<Side>, query: Query) -> Option<Response> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.inbound.send(Envelope { side, query, reply: reply_tx }).await.is_err() {
            return Some(Response::ReportError { text: "coordinator task is gone".into() });
        }
        reply_rx.await.ok().flatten()
    }
}

impl Coordinator {
    async fn run(&mut self) {
        let mut clock = tokio::time::interval(Duration::from_secs(1));
        loop {
            tokio::select! {
                envelope = self.inbound.recv() => {
                    let Some(envelope) = envelope else { break };
                    let direct = self.handle(envelope.side, envelope.query);
                    let _ = envelope.reply.send(direct);
                }
                _ = clock.tick() => {
                    self.tick_turn_clocks();
                }
            }
        }
    }

    /// Run every board's turn clock down by one second, auto-completing any
    /// turn whose side has run out of time.
    fn tick_turn_clocks(&mut self) {
        for board_idx in 0..self.boards.len() {
            if self.game.is_board_done[board_idx] {
                continue;
            }
            self.seconds_remaining[board_idx] -= 1;
            if self.seconds_remaining[board_idx] > 0 {
                continue;
            }

            let expired_side = self.boards[board_idx].state.side;
            swarm_engine::end_turn::end_turn(&mut self.boards[board_idx], &mut self.game, board_idx);
            swarm_engine::tech::snapshot_starting_levels(&mut self.game);
            self.seconds_remaining[board_idx] =
                *self.turn_seconds_per_side.get(self.boards[board_idx].state.side) as i64;

            tracing::info!(board_idx, ?expired_side, "turn clock expired; turn auto-completed");
            let _ = self.outbound.send(Response::ReportBoardState {
                board_idx,
                board_state: self.boards[board_idx].state.clone(),
                sequence: self.boards[board_idx].last_sequence,
            });
        }
    }

    /// Process one query, broadcasting any fan-out frames as a side effect
    /// and returning a frame owed only to the submitter (if any).
    fn handle(&mut self, side: Option<Side>, query: Query) -> Option<Response> {
        match query {
            Query::Heartbeat { idx } => Some(Response::OkHeartbeat { idx }),

            Query::RequestGeneralState => Some(Response::Initialize { snapshot: self.full_snapshot() }),

            Query::RequestBoardHistory { board_idx, from_seq: _ } => {
                self.boards.get(board_idx).map(|board| Response::ReportBoardState {
                    board_idx,
                    board_state: board.state.clone(),
                    sequence: board.last_sequence,
                })
            }

            Query::DoBoardAction { board_idx, action, action_id } => {
                let Some(side) = side else {
                    return Some(to_report_error("spectators cannot act"));
                };
                match self.apply_board_action(board_idx, side, action, action_id) {
                    Ok(response) => {
                        let _ = self.outbound.send(response);
                        None
                    }
                    Err(e) => Some(to_report_error(&e.to_string())),
                }
            }

            Query::DoGameAction { action, action_id: _ } => {
                let Some(side) = side else {
                    return Some(to_report_error("spectators cannot act"));
                };
                match swarm_engine::tech::do_action(&mut self.game, side, &action) {
                    Ok(()) => {
                        let _ = self.outbound.send(Response::ReportGameAction {
                            action,
                            new_game_state: self.game.clone(),
                        });
                        None
                    }
                    Err(e) => Some(to_report_error(&e.to_string())),
                }
            }

            Query::Resign { side: resigning_side } => {
                for board in self.boards.iter_mut() {
                    if board.state.has_won.is_none() {
                        board.state.has_won = Some(resigning_side.opposite());
                    }
                }
                let _ = self.outbound.send(Response::ReportResign { side: resigning_side });
                None
            }

            Query::Chat { text } => {
                tracing::info!(%text, "chat message (not yet modeled on the wire)");
                None
            }

            Query::ReportTimeLeft { seconds } => {
                if let Some(side) = side {
                    let _ = self.outbound.send(Response::ReportTimeLeft { side, seconds });
                }
                None
            }
        }
    }

    fn apply_board_action(
        &mut self,
        board_idx: usize,
        side: Side,
        action: BoardAction,
        action_id: swarm_types::ActionId,
    ) -> Result<Response, swarm_types::GameError> {
        let board = self
            .boards
            .get_mut(board_idx)
            .ok_or(swarm_types::GameError::Internal { detail: "unknown board index".into() })?;

        if side != board.state.side {
            return Err(swarm_types::GameError::PermissionDenied);
        }

        if let Some((applied_action, sequence)) = board.applied_action_ids.get(&action_id) {
            if *applied_action == action {
                return Ok(Response::ReportBoardAction { board_idx, action, sequence: *sequence });
            }
            return Err(swarm_types::LegalityError::IdReused.into());
        }

        match &action {
            BoardAction::LocalPieceUndo { piece } => {
                swarm_engine::undo::undo_piece_action(board, side, piece)?;
            }
            BoardAction::SpellUndo { spell_id } => {
                swarm_engine::undo::undo_spell(board, side, spell_id)?;
            }
            BoardAction::BuyReinforcementUndo { piece_name } => {
                swarm_engine::undo::undo_reinforcement(board, side, piece_name)?;
            }
            _ => {
                swarm_engine::apply::do_action(&mut board.state, side, &action)?;
                swarm_engine::undo::record(board, LoggedAction { action_id: action_id.clone(), side, action: action.clone() });
            }
        }

        if board.state.has_won.is_some() && !self.game.is_board_done[board_idx] {
            self.game.is_board_done[board_idx] = true;
        }

        board.applied_action_ids.insert(action_id, (action.clone(), board.last_sequence));

        metrics::counter!("board_actions_applied_total").increment(1);
        Ok(Response::ReportBoardAction { board_idx, action, sequence: board.last_sequence })
    }

    fn full_snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            game: self.game.clone(),
            boards: self
                .boards
                .iter()
                .map(|b| BoardSnapshot { name: b.name.clone(), state: b.state.clone(), sequence: b.last_sequence })
                .collect(),
        }
    }
}

/// Tracks which side each connected session occupies, guarded by a plain
/// mutex rather than a lock-free map — the registry is touched only on
/// connect/disconnect, never on the hot action path.
pub struct SeatRegistry {
    seats: SideArray<Option<SessionId>>,
    spectators: HashMap<SessionId, ()>,
}

impl SeatRegistry {
    pub fn new() -> Self {
        Self { seats: SideArray::new(None, None), spectators: HashMap::new() }
    }

    /// Claim the first open seat for `session_id`, or register as a spectator
    /// if both are taken.
    pub fn join(&mut self, session_id: SessionId) -> Option<Side> {
        for side in [Side::S0, Side::S1] {
            if self.seats.get(side).is_none() {
                self.seats.set(side, Some(session_id.clone()));
                return Some(side);
            }
        }
        self.spectators.insert(session_id, ());
        None
    }

    pub fn leave(&mut self, session_id: &SessionId) {
        for side in [Side::S0, Side::S1] {
            if self.seats.get(side).as_ref() == Some(session_id) {
                self.seats.set(side, None);
            }
        }
        self.spectators.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seat_registry_fills_s0_then_s1_then_spectates() {
        let mut seats = SeatRegistry::new();
        assert_eq!(seats.join(SessionId::from("a")), Some(Side::S0));
        assert_eq!(seats.join(SessionId::from("b")), Some(Side::S1));
        assert_eq!(seats.join(SessionId::from("c")), None);
    }

    #[test]
    fn leaving_a_seat_frees_it_for_the_next_join() {
        let mut seats = SeatRegistry::new();
        let a = SessionId::from("a");
        assert_eq!(seats.join(a.clone()), Some(Side::S0));
        seats.leave(&a);
        assert_eq!(seats.join(SessionId::from("b")), Some(Side::S0));
    }

    #[tokio::test]
    async fn heartbeat_round_trips_through_the_coordinator() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(300, 300));
        let reply = handle.submit(None, Query::Heartbeat { idx: 7 }).await;
        assert!(matches!(reply, Some(Response::OkHeartbeat { idx: 7 })));
    }

    #[tokio::test]
    async fn spectator_board_action_is_rejected() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(300, 300));
        let reply = handle
            .submit(
                None,
                Query::DoBoardAction {
                    board_idx: 0,
                    action: BoardAction::ResignBoard,
                    action_id: swarm_types::ActionId::from("t1"),
                },
            )
            .await;
        assert!(matches!(reply, Some(Response::ReportError { .. })));
    }

    #[tokio::test]
    async fn acting_out_of_turn_is_rejected() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(300, 300));
        // board 0 starts on S0's turn; S1 tries to act on it.
        let reply = handle
            .submit(
                Some(Side::S1),
                Query::DoBoardAction {
                    board_idx: 0,
                    action: BoardAction::ResignBoard,
                    action_id: swarm_types::ActionId::from("t1"),
                },
            )
            .await;
        assert!(matches!(reply, Some(Response::ReportError { .. })));
    }

    #[tokio::test]
    async fn retrying_the_same_action_id_replays_the_cached_result_without_reapplying() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(300, 300));
        let mut outbound = handle.subscribe();

        let action = BoardAction::ResignBoard;
        let action_id = swarm_types::ActionId::from("dup-1");
        let reply = handle
            .submit(
                Some(Side::S0),
                Query::DoBoardAction { board_idx: 0, action: action.clone(), action_id: action_id.clone() },
            )
            .await;
        assert!(reply.is_none());
        let first = outbound.recv().await.unwrap();
        let Response::ReportBoardAction { sequence: first_seq, .. } = first else { panic!("wrong frame") };

        let retry = handle
            .submit(
                Some(Side::S0),
                Query::DoBoardAction { board_idx: 0, action, action_id },
            )
            .await;
        assert!(retry.is_none());
        let second = outbound.recv().await.unwrap();
        let Response::ReportBoardAction { sequence: second_seq, .. } = second else { panic!("wrong frame") };
        assert_eq!(second_seq, first_seq);
    }

    #[tokio::test]
    async fn retrying_an_action_id_with_a_different_payload_is_rejected() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(300, 300));
        let mut outbound = handle.subscribe();

        let action_id = swarm_types::ActionId::from("dup-2");
        let reply = handle
            .submit(
                Some(Side::S0),
                Query::DoBoardAction {
                    board_idx: 0,
                    action: BoardAction::ResignBoard,
                    action_id: action_id.clone(),
                },
            )
            .await;
        assert!(reply.is_none());
        outbound.recv().await.unwrap();

        let retry = handle
            .submit(
                Some(Side::S0),
                Query::DoBoardAction {
                    board_idx: 0,
                    action: BoardAction::SetBoardDone { done: true },
                    action_id,
                },
            )
            .await;
        assert!(matches!(retry, Some(Response::ReportError { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn an_expired_turn_clock_auto_completes_the_turn() {
        let (game, boards) = swarm_engine::setup::new_match(1, 3);
        let handle = CoordinatorHandle::spawn(game, boards, SideArray::new(1, 1));

        tokio::time::advance(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;

        let snapshot = handle.submit(None, Query::RequestGeneralState).await;
        let Some(Response::Initialize { snapshot }) = snapshot else { panic!("wrong frame") };
        assert_eq!(snapshot.boards[0].state.side, Side::S1);
    }
}
