//! The wire protocol: a self-describing JSON envelope exchanged over one
//! full-duplex connection per session.
//!
//! Every frame is tagged by `type`; `Query` flows client -> server and
//! `Response` flows server -> client (server responses are also broadcast
//! to every other session watching the same game).

use serde::{Deserialize, Serialize};

use crate::action::{BoardAction, GameAction};
use crate::enums::Side;
use crate::ids::ActionId;
use crate::state::{BoardState, Game};

/// A full snapshot of one board, sent on `Initialize` and in response to
/// `RequestBoardHistory` catch-up gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub name: String,
    pub state: BoardState,
    pub sequence: u64,
}

/// A full snapshot of the game, sent to a newly joined or reconnecting session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game: Game,
    pub boards: Vec<BoardSnapshot>,
}

/// Client -> server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Query {
    Heartbeat { idx: u64 },
    RequestGeneralState,
    DoBoardAction {
        board_idx: usize,
        action: BoardAction,
        action_id: ActionId,
    },
    DoGameAction {
        action: GameAction,
        action_id: ActionId,
    },
    RequestBoardHistory { board_idx: usize, from_seq: u64 },
    /// Concedes every board still open for the session's side.
    Resign { side: Side },
    Chat { text: String },
    /// Periodic echo of the client's own clock, used only to detect drift.
    ReportTimeLeft { seconds: i64 },
}

/// Server -> client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Version { version: String },
    ClientNumbers {
        your_side: Option<Side>,
        num_boards: usize,
        board_names: Vec<String>,
    },
    Initialize { snapshot: GameSnapshot },
    ReportBoardAction {
        board_idx: usize,
        action: BoardAction,
        sequence: u64,
    },
    ReportGameAction {
        action: GameAction,
        new_game_state: Game,
    },
    ReportBoardState {
        board_idx: usize,
        board_state: BoardState,
        sequence: u64,
    },
    ReportTimeLeft { side: Side, seconds: i64 },
    ReportResign { side: Side },
    ReportError { text: String },
    OkHeartbeat { idx: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_round_trips_through_json() {
        let q = Query::Heartbeat { idx: 7 };
        let json = serde_json::to_string(&q).unwrap();
        assert!(json.contains("\"type\":\"heartbeat\""));
        let back: Query = serde_json::from_str(&json).unwrap();
        match back {
            Query::Heartbeat { idx } => assert_eq!(idx, 7),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn report_error_carries_plain_text() {
        let r = Response::ReportError { text: "bad frame".into() };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["text"], "bad frame");
    }
}
