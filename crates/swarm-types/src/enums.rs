//! Small closed-set types shared across the board rules and game meta-layer.

use serde::{Deserialize, Serialize};

use crate::ids::PieceName;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    S0,
    S1,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::S0 => Self::S1,
            Self::S1 => Self::S0,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Self::S0 => 0,
            Self::S1 => 1,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::S0 => write!(f, "S0"),
            Self::S1 => write!(f, "S1"),
        }
    }
}

/// A length-2 array indexed by `Side` rather than `usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideArray<T> {
    values: [T; 2],
}

impl<T> SideArray<T> {
    pub fn new(s0: T, s1: T) -> Self {
        Self { values: [s0, s1] }
    }

    pub fn get(&self, side: Side) -> &T {
        &self.values[side.index()]
    }

    pub fn get_mut(&mut self, side: Side) -> &mut T {
        &mut self.values[side.index()]
    }

    pub fn set(&mut self, side: Side, value: T) {
        self.values[side.index()] = value;
    }

    pub fn iter(&self) -> impl Iterator<Item = (Side, &T)> {
        [Side::S0, Side::S1].into_iter().zip(self.values.iter())
    }
}

impl<T: Default> Default for SideArray<T> {
    fn default() -> Self {
        Self {
            values: [T::default(), T::default()],
        }
    }
}

/// Board terrain, the closed set from which every tile is drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Terrain {
    Wall,
    Ground,
    StartHex { side: Side },
    Water,
    Graveyard,
    SorceryNode,
    Teleporter,
    Spawner { piece_name: PieceName },
}

impl Terrain {
    /// `StartHex` is functionally plain `Ground` for passability purposes.
    pub fn is_walkable_by_ground(&self) -> bool {
        !matches!(self, Self::Wall | Self::Water)
    }

    pub fn is_walkable_by_flying(&self) -> bool {
        !matches!(self, Self::Wall)
    }
}

/// Progress of a side's unlock of one tech-line entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechLevel {
    Locked,
    Unlocked,
    Acquired,
}

impl TechLevel {
    /// The next level reachable by a single `PerformTech`, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Locked => Some(Self::Unlocked),
            Self::Unlocked => Some(Self::Acquired),
            Self::Acquired => None,
        }
    }
}

/// A piece's progress through its turn. Monotonically nondecreasing; `DoneActing`
/// is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActState {
    Moving { steps_used: i32 },
    Attacking { attacks_used: i32 },
    Spawning,
    DoneActing,
}

impl ActState {
    pub fn moving_start() -> Self {
        Self::Moving { steps_used: 0 }
    }

    /// An index used only to assert monotonicity: strictly increases as the
    /// piece advances through `Moving -> Attacking -> Spawning -> DoneActing`.
    pub fn phase_rank(self) -> i32 {
        match self {
            Self::Moving { .. } => 0,
            Self::Attacking { .. } => 1,
            Self::Spawning => 2,
            Self::DoneActing => 3,
        }
    }
}

/// What an attack does to its target on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttackEffect {
    Damage { amount: i32 },
    Unsummon,
    Kill,
    Enchant { modifier: PieceMod },
    TransformInto { name: PieceName },
}

/// A timed modifier attached to a piece or a tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceMod {
    pub name: String,
    pub duration: i32,
}

/// A target-selection constraint for a targeted ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConstraint {
    AdjacentEnemy,
    AdjacentFriendly,
    AnyOnBoard,
    WithinRange { range: i32 },
}

/// One of a piece's named, catalog-defined special actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Ability {
    /// Kills the activating piece.
    SuicideAbility { is_sorcery: bool },
    /// Teleports the activating piece to any empty, walkable tile.
    BlinkAbility { is_sorcery: bool },
    /// Kills one adjacent enemy piece meeting `constraint`.
    KillAdjacentAbility {
        is_sorcery: bool,
        constraint: TargetConstraint,
    },
    /// Applies a modifier to the activating piece itself.
    SelfEnchantAbility {
        is_sorcery: bool,
        modifier: PieceMod,
    },
    /// Applies an effect to one or more selected targets.
    TargetedAbility {
        is_sorcery: bool,
        constraint: TargetConstraint,
        effect: AttackEffect,
    },
}

impl Ability {
    pub fn is_sorcery(&self) -> bool {
        match self {
            Self::SuicideAbility { is_sorcery }
            | Self::BlinkAbility { is_sorcery }
            | Self::KillAdjacentAbility { is_sorcery, .. }
            | Self::SelfEnchantAbility { is_sorcery, .. }
            | Self::TargetedAbility { is_sorcery, .. } => *is_sorcery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn side_opposite_is_involutive() {
        assert_eq!(Side::S0.opposite().opposite(), Side::S0);
    }

    #[test]
    fn side_array_indexing() {
        let mut a = SideArray::new(1, 2);
        assert_eq!(*a.get(Side::S0), 1);
        a.set(Side::S1, 9);
        assert_eq!(*a.get(Side::S1), 9);
    }

    #[test]
    fn act_state_phase_rank_increases() {
        assert!(ActState::moving_start().phase_rank() < ActState::Attacking { attacks_used: 0 }.phase_rank());
        assert!(ActState::Attacking { attacks_used: 0 }.phase_rank() < ActState::Spawning.phase_rank());
        assert!(ActState::Spawning.phase_rank() < ActState::DoneActing.phase_rank());
    }

    #[test]
    fn tech_level_progression() {
        assert_eq!(TechLevel::Locked.next(), Some(TechLevel::Unlocked));
        assert_eq!(TechLevel::Unlocked.next(), Some(TechLevel::Acquired));
        assert_eq!(TechLevel::Acquired.next(), None);
    }
}
