//! Error taxonomy shared by the legality checker, the applier, and the
//! coordinator's client-visible `ReportError` frames.

use serde::{Deserialize, Serialize};

/// Why `tryLegality` rejected a proposed action. Purely descriptive — the
/// board is left untouched whenever this is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegalityError {
    WrongSide,
    PieceNotFound,
    OutOfRange,
    Blocked,
    NotEnoughMovement,
    AlreadyActed,
    OccupancyExceeded,
    CannotHurtNecromancer,
    PersistentCannotBeUnsummoned,
    NotEnoughMana,
    NotEnoughSorcery,
    TechLocked,
    SpellNotInHand,
    IdReused,
    InvalidPath,
    NotATeleporter,
    NotASpawner,
    SpawnerAlreadyUsed,
    AbilityNotFound,
    AbilityAlreadyUsed,
    TargetConstraintUnmet,
    NothingToUndo,
    TechAlreadyAtMax,
    ExtraTechAlreadyBought,
}

/// The top-level, client-visible error taxonomy (`ReportError`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameError {
    /// Legality check failed; state unchanged, session continues.
    IllegalAction { reason: LegalityError },
    /// Malformed frame or unrecoverable sequence gap; session closed after sending.
    ProtocolError { detail: String },
    /// Action submitted by the wrong side or by a spectator.
    PermissionDenied,
    /// Action submitted after `Game::winner` is set.
    GameOver,
    /// Replay or invariant failure; logged server-side, action rolled back.
    Internal { detail: String },
}

impl std::fmt::Display for GameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IllegalAction { reason } => write!(f, "illegal action: {reason:?}"),
            Self::ProtocolError { detail } => write!(f, "protocol error: {detail}"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::GameOver => write!(f, "game over"),
            Self::Internal { detail } => write!(f, "internal error: {detail}"),
        }
    }
}

impl std::error::Error for GameError {}

impl From<LegalityError> for GameError {
    fn from(reason: LegalityError) -> Self {
        Self::IllegalAction { reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legality_error_converts_to_game_error() {
        let err: GameError = LegalityError::Blocked.into();
        assert_eq!(err, GameError::IllegalAction { reason: LegalityError::Blocked });
    }

    #[test]
    fn game_error_display_is_human_readable() {
        let err = GameError::PermissionDenied;
        assert_eq!(err.to_string(), "permission denied");
    }
}
