//! Board and game state structures.
//!
//! `Piece` holds only an `id` and a `loc`; every lookup goes through
//! `BoardState::piece_by_id` or `BoardState::pieces_by_loc`, so there is no
//! cyclic reference between a piece and its board.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::hex::{Loc, Plane};
use crate::ids::*;

/// An immutable catalog entry describing one piece type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PieceStats {
    pub name: PieceName,
    pub display_name: String,

    pub cost: i32,
    pub rebate: i32,
    pub defense: i32,
    pub move_range: i32,
    pub attack_range: i32,
    pub attack_range_vs_flying: i32,
    pub num_attacks: i32,
    pub swarm_max: i32,
    pub spawn_range: i32,
    pub extra_mana: i32,
    pub extra_sorcery_power: i32,

    #[serde(default)]
    pub attack_effect: Option<AttackEffect>,

    pub is_necromancer: bool,
    pub is_flying: bool,
    pub is_lumbering: bool,
    pub is_persistent: bool,
    pub is_eldritch: bool,
    pub is_wailing: bool,
    pub can_hurt_necromancer: bool,

    #[serde(default)]
    pub death_spawn: Option<PieceName>,

    #[serde(default)]
    pub abilities: BTreeMap<AbilityId, Ability>,
}

impl PieceStats {
    /// The attack range to use against a target, which depends on whether
    /// the target is flying.
    pub fn attack_range_against(&self, target_is_flying: bool) -> i32 {
        if target_is_flying {
            self.attack_range_vs_flying
        } else {
            self.attack_range
        }
    }
}

/// A mutable on-board piece instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Piece {
    /// Stable across undo; never reused within a board's lifetime.
    pub id: u32,
    pub side: Side,
    pub base_stats_name: PieceName,
    pub loc: Loc,
    pub damage: i32,
    pub act_state: ActState,
    pub has_moved: bool,
    pub mods_with_duration: Vec<PieceMod>,
    /// Whether this piece has already been the source of a `Spawn` this turn.
    pub has_spawned_this_turn: bool,
    /// Whether this piece has already used a given named ability this turn
    /// (abilities with per-turn limits are tracked by the applier via this set).
    pub abilities_used_this_turn: Vec<AbilityId>,
    /// Set once a wailing piece has attacked; resolved at end-of-turn.
    pub marked_for_wailing_death: bool,
}

impl Piece {
    pub fn attacks_used(&self) -> i32 {
        match self.act_state {
            ActState::Attacking { attacks_used } => attacks_used,
            ActState::Spawning | ActState::DoneActing => i32::MAX,
            ActState::Moving { .. } => 0,
        }
    }

    pub fn steps_used(&self) -> i32 {
        match self.act_state {
            ActState::Moving { steps_used } => steps_used,
            _ => i32::MAX,
        }
    }
}

/// How a client action addresses a piece — stable across undo-and-redo
/// within the same turn even for pieces created mid-turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PieceSpec {
    StartedTurnWithId { id: u32 },
    SpawnedThisTurn {
        name: PieceName,
        loc: Loc,
        nth_spawned_there: i32,
    },
}

/// A single board tile: its terrain plus any timed modifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tile {
    pub terrain: Terrain,
    pub mods_with_duration: Vec<PieceMod>,
}

impl Tile {
    pub fn new(terrain: Terrain) -> Self {
        Self {
            terrain,
            mods_with_duration: Vec::new(),
        }
    }
}

/// A record of a piece killed during the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KilledRecord {
    pub spec: PieceSpec,
    pub name: PieceName,
    pub side: Side,
    pub loc: Loc,
}

/// A record of a piece unsummoned during the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsummonedRecord {
    pub spec: PieceSpec,
    pub name: PieceName,
    pub side: Side,
}

/// A record of a spell played during the current turn (used by `SpellUndo`
/// and by the client to render the spell log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellPlayInfo {
    pub spell_id: SpellId,
    pub side: Side,
    pub targets: Vec<PieceSpec>,
}

/// The full mutable state of one board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardState {
    pub tiles: Plane<Tile>,
    pub pieces_by_loc: Plane<Vec<Piece>>,
    pub piece_by_id: BTreeMap<u32, Piece>,
    pub next_piece_id: u32,

    pub reinforcements: SideArray<BTreeMap<PieceName, i32>>,
    pub spells_in_hand: SideArray<Vec<SpellId>>,
    pub spells_played: Vec<SpellPlayInfo>,
    pub killed_this_turn: Vec<KilledRecord>,
    pub unsummoned_this_turn: Vec<UnsummonedRecord>,
    /// `(id, name, loc)` for every piece spawned this turn, in spawn order.
    /// Resolves `PieceSpec::SpawnedThisTurn` even after the piece has moved
    /// away from where it was spawned.
    pub spawns_this_turn: Vec<(u32, PieceName, Loc)>,

    pub mana_this_round: SideArray<i32>,
    pub total_mana: SideArray<i32>,
    pub total_costs: SideArray<i32>,
    pub sorcery_power: i32,

    pub turn_number: i32,
    pub side: Side,

    pub has_used_spawner_tile: bool,
    pub has_won: Option<Side>,
}

impl BoardState {
    /// Every piece on the board at `loc`, iterated as a read-only slice.
    pub fn pieces_at(&self, loc: Loc) -> &[Piece] {
        self.pieces_by_loc.get(loc).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn take_next_piece_id(&mut self) -> u32 {
        let id = self.next_piece_id;
        self.next_piece_id += 1;
        id
    }

    /// Resolve a client-submitted `PieceSpec` to the id of a piece still on
    /// the board, if any. `SpawnedThisTurn` is resolved against the spawn
    /// log rather than current position, so it stays valid even after the
    /// piece has moved away from where it was created.
    pub fn resolve(&self, spec: &PieceSpec) -> Option<u32> {
        let id = match spec {
            PieceSpec::StartedTurnWithId { id } => *id,
            PieceSpec::SpawnedThisTurn {
                name,
                loc,
                nth_spawned_there,
            } => {
                let (id, _, _) = self
                    .spawns_this_turn
                    .iter()
                    .filter(|(_, n, l)| n == name && l == loc)
                    .nth(*nth_spawned_there as usize)?;
                *id
            }
        };
        self.piece_by_id.contains_key(&id).then_some(id)
    }
}

/// One entry in a board's per-turn action log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedAction<A> {
    pub action_id: ActionId,
    pub side: Side,
    pub action: A,
}

/// A single board instance: its live state, the snapshot taken at the start
/// of the current turn, and the log replayed against that snapshot for undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board<A> {
    pub name: String,
    pub state: BoardState,
    pub initial_state_this_turn: BoardState,
    pub actions_this_turn: Vec<LoggedAction<A>>,
    /// Strictly increasing, gap-free sequence number of the last applied action.
    pub last_sequence: u64,
    /// Every `action_id` this board has ever applied, with the action it was
    /// applied with and the sequence it was assigned. Survives `end_turn` —
    /// a client's action-id counter does not reset at a turn boundary, so a
    /// stale retry can still arrive after the turn it targeted has ended.
    pub applied_action_ids: BTreeMap<ActionId, (A, u64)>,
}

/// One tech-line catalog entry and each side's progress unlocking it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechState {
    pub tech_piece: PieceName,
    pub level: SideArray<TechLevel>,
    /// `level` at the start of the current turn, restored by `UndoTech`.
    pub starting_level_this_turn: SideArray<TechLevel>,
}

/// The global meta-state shared by all boards: tech line, mana pool, wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub mana: SideArray<i32>,
    pub wins: SideArray<i32>,
    pub target_num_wins: i32,
    pub tech_line: Vec<TechState>,
    pub extra_mana_per_turn: SideArray<i32>,
    pub extra_tech_cost_per_board: i32,
    /// Extra tech-line purchases `BuyExtraTechAndSpell` has unlocked for each
    /// side, beyond whatever base allowance the client enforces.
    pub extra_tech_purchases: SideArray<i32>,
    /// Extra spell grants `BuyExtraTechAndSpell` has unlocked for each side.
    pub extra_spell_grants: SideArray<i32>,
    /// How many times each side has bought the extra tech-and-spell slot
    /// since the start of its current turn — the baseline `UndoBuyExtraTechAndSpell`
    /// checks against, reset in `snapshot_starting_levels`.
    pub extra_tech_and_spell_bought_this_turn: SideArray<i32>,
    pub is_board_done: Vec<bool>,
    pub winner: Option<Side>,
}

impl Game {
    pub fn all_boards_done_for(&self, done: &[bool]) -> bool {
        done.iter().all(|&d| d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tile() -> Tile {
        Tile::new(Terrain::Ground)
    }

    #[test]
    fn tile_starts_with_no_mods() {
        let t = sample_tile();
        assert!(t.mods_with_duration.is_empty());
    }

    #[test]
    fn board_state_next_piece_id_increments() {
        let mut bs = BoardState {
            tiles: Plane::new(2, 2, sample_tile()),
            pieces_by_loc: Plane::new(2, 2, Vec::new()),
            piece_by_id: BTreeMap::new(),
            next_piece_id: 0,
            reinforcements: SideArray::new(BTreeMap::new(), BTreeMap::new()),
            spells_in_hand: SideArray::new(Vec::new(), Vec::new()),
            spells_played: Vec::new(),
            killed_this_turn: Vec::new(),
            unsummoned_this_turn: Vec::new(),
            spawns_this_turn: Vec::new(),
            mana_this_round: SideArray::new(0, 0),
            total_mana: SideArray::new(0, 0),
            total_costs: SideArray::new(0, 0),
            sorcery_power: 0,
            turn_number: 1,
            side: Side::S0,
            has_used_spawner_tile: false,
            has_won: None,
        };
        assert_eq!(bs.take_next_piece_id(), 0);
        assert_eq!(bs.take_next_piece_id(), 1);
        assert_eq!(bs.next_piece_id, 2);
    }

    #[test]
    fn piece_spec_round_trips_through_json() {
        let spec = PieceSpec::SpawnedThisTurn {
            name: PieceName::from("zombie"),
            loc: Loc::new(2, 3),
            nth_spawned_there: 0,
        };
        let json = serde_json::to_string(&spec).unwrap();
        let back: PieceSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(spec, back);
    }
}
