//! Player-submitted action types.
//!
//! Every action is a tagged union matched exhaustively by the legality
//! checker and the applier — no duck-typed variant records.

use serde::{Deserialize, Serialize};

use crate::hex::Loc;
use crate::ids::{AbilityId, PieceName, SpellId};
use crate::state::PieceSpec;

/// One piece's move within a `Movements` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub piece: PieceSpec,
    pub path: Vec<Loc>,
}

/// Everything a client can submit against a single board, via
/// `DoBoardAction(boardIdx, action, actionId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BoardAction {
    /// One or more simultaneous piece moves (supports swarm-swaps).
    Movements { movements: Vec<Movement> },
    Attack {
        attacker: PieceSpec,
        target: PieceSpec,
    },
    Spawn {
        spawn_loc: Loc,
        piece_name: PieceName,
    },
    ActivateAbility {
        piece: PieceSpec,
        name: AbilityId,
        targets: Vec<PieceSpec>,
    },
    Teleport {
        piece: PieceSpec,
        src: Loc,
        dest: Loc,
    },
    ActivateTile { loc: Loc },

    PlaySpell {
        spell_id: SpellId,
        targets: Vec<PieceSpec>,
    },
    DiscardSpell { spell_id: SpellId },
    GainSpell { spell_id: SpellId },
    SpellUndo { spell_id: SpellId },

    BuyReinforcement { piece_name: PieceName },
    BuyReinforcementUndo { piece_name: PieceName },

    LocalPieceUndo { piece: PieceSpec },

    SetBoardDone { done: bool },
    ResignBoard,
}

impl BoardAction {
    /// A short discriminant name, used for logging.
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::Movements { .. } => "movements",
            Self::Attack { .. } => "attack",
            Self::Spawn { .. } => "spawn",
            Self::ActivateAbility { .. } => "activate_ability",
            Self::Teleport { .. } => "teleport",
            Self::ActivateTile { .. } => "activate_tile",
            Self::PlaySpell { .. } => "play_spell",
            Self::DiscardSpell { .. } => "discard_spell",
            Self::GainSpell { .. } => "gain_spell",
            Self::SpellUndo { .. } => "spell_undo",
            Self::BuyReinforcement { .. } => "buy_reinforcement",
            Self::BuyReinforcementUndo { .. } => "buy_reinforcement_undo",
            Self::LocalPieceUndo { .. } => "local_piece_undo",
            Self::SetBoardDone { .. } => "set_board_done",
            Self::ResignBoard => "resign_board",
        }
    }
}

/// Everything a client can submit at the game-meta level, via
/// `DoGameAction(action, actionId)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameAction {
    PerformTech { tech_index: usize },
    UndoTech { tech_index: usize },
    BuyExtraTechAndSpell,
    UndoBuyExtraTechAndSpell,
}

impl GameAction {
    pub fn action_type(&self) -> &'static str {
        match self {
            Self::PerformTech { .. } => "perform_tech",
            Self::UndoTech { .. } => "undo_tech",
            Self::BuyExtraTechAndSpell => "buy_extra_tech_and_spell",
            Self::UndoBuyExtraTechAndSpell => "undo_buy_extra_tech_and_spell",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_action_serializes_with_tag() {
        let action = BoardAction::ActivateTile { loc: Loc::new(1, 1) };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "activate_tile");
    }

    #[test]
    fn action_type_matches_tag() {
        let action = BoardAction::ResignBoard;
        assert_eq!(action.action_type(), "resign_board");
    }
}
