//! Game setup — initial state construction for a new multi-board game.

use std::collections::BTreeMap;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use swarm_types::{
    ActState, Board, BoardState, Game, Loc, Piece, PieceName, Plane, Side, SideArray, TechLevel,
    TechState, Terrain, Tile,
};

/// The default board footprint: large enough for a handful of reinforcement
/// lanes either side of a shared mid-board no-man's-land.
pub const DEFAULT_BOARD_WIDTH: i32 = 13;
pub const DEFAULT_BOARD_HEIGHT: i32 = 9;

/// Starting sorcery power granted to a freshly created board.
const STARTING_SORCERY_POWER: i32 = 1;

/// Starting mana pool granted to each side at game start.
const STARTING_MANA: i32 = 5;

/// Build an empty board of the given size, every tile set to `fill`, with
/// both `StartHex` rows carved at the near and far edges.
pub fn empty_board_state(x_size: i32, y_size: i32, fill: Terrain, _acting_side: Side) -> BoardState {
    let mut tiles = Plane::new(x_size, y_size, Tile::new(fill));
    for x in 0..x_size {
        tiles.set(Loc::new(x, 0), Tile::new(Terrain::StartHex { side: Side::S0 }));
        tiles.set(
            Loc::new(x, y_size - 1),
            Tile::new(Terrain::StartHex { side: Side::S1 }),
        );
    }

    BoardState {
        tiles,
        pieces_by_loc: Plane::new(x_size, y_size, Vec::new()),
        piece_by_id: BTreeMap::new(),
        next_piece_id: 0,
        reinforcements: SideArray::new(BTreeMap::new(), BTreeMap::new()),
        spells_in_hand: SideArray::new(Vec::new(), Vec::new()),
        spells_played: Vec::new(),
        killed_this_turn: Vec::new(),
        unsummoned_this_turn: Vec::new(),
        spawns_this_turn: Vec::new(),
        mana_this_round: SideArray::new(0, 0),
        total_mana: SideArray::new(STARTING_MANA, STARTING_MANA),
        total_costs: SideArray::new(0, 0),
        sorcery_power: STARTING_SORCERY_POWER,
        turn_number: 1,
        side: Side::S0,
        has_used_spawner_tile: false,
        has_won: None,
    }
}

/// Place a piece directly onto a board, bypassing legality — for test setup
/// and for constructing a board's initial necromancer.
pub fn place_piece(state: &mut BoardState, side: Side, name: &PieceName, loc: Loc) -> u32 {
    let id = state.take_next_piece_id();
    let piece = Piece {
        id,
        side,
        base_stats_name: name.clone(),
        loc,
        damage: 0,
        act_state: ActState::moving_start(),
        has_moved: false,
        mods_with_duration: Vec::new(),
        has_spawned_this_turn: false,
        abilities_used_this_turn: Vec::new(),
        marked_for_wailing_death: false,
    };
    state.pieces_by_loc.at_mut(loc).push(piece.clone());
    state.piece_by_id.insert(id, piece);
    id
}

/// Build a single fresh board: a necromancer for each side at their start
/// hex, plus each side's opening reinforcement pool.
pub fn new_board(name: impl Into<String>) -> Board<swarm_types::BoardAction> {
    let mut state = empty_board_state(
        DEFAULT_BOARD_WIDTH,
        DEFAULT_BOARD_HEIGHT,
        Terrain::Ground,
        Side::S0,
    );

    let necromancer = PieceName::from("necromancer");
    place_piece(&mut state, Side::S0, &necromancer, Loc::new(DEFAULT_BOARD_WIDTH / 2, 0));
    place_piece(
        &mut state,
        Side::S1,
        &necromancer,
        Loc::new(DEFAULT_BOARD_WIDTH / 2, DEFAULT_BOARD_HEIGHT - 1),
    );

    for side in [Side::S0, Side::S1] {
        state
            .reinforcements
            .get_mut(side)
            .insert(PieceName::from("zombie"), 3);
    }

    let initial_state_this_turn = state.clone();
    Board {
        name: name.into(),
        state,
        initial_state_this_turn,
        actions_this_turn: Vec::new(),
        last_sequence: 0,
        applied_action_ids: BTreeMap::new(),
    }
}

/// Build the shared tech line from the catalog default order, both sides
/// starting `Locked`.
pub fn new_tech_line() -> Vec<TechState> {
    new_tech_line_with_options(false, 0, 0)
}

/// Build the shared tech line, optionally shuffling every entry past the
/// first `num_fixed` using a seeded RNG — the leading entries stay in
/// catalog order so early-game tech choices remain predictable.
pub fn new_tech_line_with_options(randomize: bool, num_fixed: usize, rand_seed: u64) -> Vec<TechState> {
    let mut order: Vec<PieceName> = swarm_data::default_tech_line().to_vec();
    if randomize {
        let fixed = num_fixed.min(order.len());
        let mut rng = StdRng::seed_from_u64(rand_seed);
        order[fixed..].shuffle(&mut rng);
    }
    order
        .into_iter()
        .map(|piece| TechState {
            tech_piece: piece,
            level: SideArray::new(TechLevel::Locked, TechLevel::Locked),
            starting_level_this_turn: SideArray::new(TechLevel::Locked, TechLevel::Locked),
        })
        .collect()
}

/// Build the shared game meta-state for a new match.
pub fn new_game(num_boards: usize, target_num_wins: i32) -> Game {
    new_game_with_options(&MatchOptions { num_boards, target_num_wins, ..MatchOptions::default() })
}

/// Build a complete new match: the shared `Game` plus `num_boards` fresh
/// boards, named `board-0`, `board-1`, ...
pub fn new_match(
    num_boards: usize,
    target_num_wins: i32,
) -> (Game, Vec<Board<swarm_types::BoardAction>>) {
    new_match_with_options(&MatchOptions { num_boards, target_num_wins, ..MatchOptions::default() })
}

/// Knobs a coordinator pulls from server config when starting a fresh match,
/// layered over sensible defaults for the offline client and tests.
pub struct MatchOptions {
    pub num_boards: usize,
    pub target_num_wins: i32,
    pub starting_souls: SideArray<i32>,
    pub extra_souls_per_turn: SideArray<i32>,
    pub randomize_tech_line: bool,
    pub num_fixed_techs: usize,
    pub rand_seed: u64,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            num_boards: 1,
            target_num_wins: 3,
            starting_souls: SideArray::new(0, 0),
            extra_souls_per_turn: SideArray::new(0, 0),
            randomize_tech_line: false,
            num_fixed_techs: 0,
            rand_seed: 0,
        }
    }
}

pub fn new_game_with_options(opts: &MatchOptions) -> Game {
    Game {
        mana: opts.starting_souls.clone(),
        wins: SideArray::new(0, 0),
        target_num_wins: opts.target_num_wins,
        tech_line: new_tech_line_with_options(opts.randomize_tech_line, opts.num_fixed_techs, opts.rand_seed),
        extra_mana_per_turn: opts.extra_souls_per_turn.clone(),
        extra_tech_cost_per_board: 0,
        extra_tech_purchases: SideArray::new(0, 0),
        extra_spell_grants: SideArray::new(0, 0),
        extra_tech_and_spell_bought_this_turn: SideArray::new(0, 0),
        is_board_done: vec![false; opts.num_boards],
        winner: None,
    }
}

pub fn new_match_with_options(opts: &MatchOptions) -> (Game, Vec<Board<swarm_types::BoardAction>>) {
    let game = new_game_with_options(opts);
    let boards = (0..opts.num_boards).map(|i| new_board(format!("board-{i}"))).collect();
    (game, boards)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_places_both_necromancers() {
        let board = new_board("test");
        let necromancers: Vec<_> = board
            .state
            .piece_by_id
            .values()
            .filter(|p| p.base_stats_name.as_str() == "necromancer")
            .collect();
        assert_eq!(necromancers.len(), 2);
        assert!(necromancers.iter().any(|p| p.side == Side::S0));
        assert!(necromancers.iter().any(|p| p.side == Side::S1));
    }

    #[test]
    fn new_board_seeds_initial_state_this_turn() {
        let board = new_board("test");
        assert_eq!(board.state.piece_by_id.len(), board.initial_state_this_turn.piece_by_id.len());
    }

    #[test]
    fn new_match_creates_requested_board_count() {
        let (game, boards) = new_match(3, 5);
        assert_eq!(boards.len(), 3);
        assert_eq!(game.is_board_done.len(), 3);
        assert_eq!(boards[1].name, "board-1");
    }

    #[test]
    fn new_tech_line_starts_fully_locked() {
        let line = new_tech_line();
        assert!(!line.is_empty());
        for entry in &line {
            assert_eq!(*entry.level.get(Side::S0), TechLevel::Locked);
            assert_eq!(*entry.level.get(Side::S1), TechLevel::Locked);
        }
    }

    #[test]
    fn randomized_tech_line_leaves_the_fixed_prefix_untouched() {
        let fixed = new_tech_line_with_options(true, 1, 42);
        let catalog = swarm_data::default_tech_line();
        assert_eq!(fixed[0].tech_piece, catalog[0]);
        let same_set: std::collections::BTreeSet<_> =
            fixed.iter().map(|t| t.tech_piece.clone()).collect();
        let catalog_set: std::collections::BTreeSet<_> = catalog.iter().cloned().collect();
        assert_eq!(same_set, catalog_set);
    }

    #[test]
    fn unrandomized_tech_line_matches_catalog_order() {
        let line = new_tech_line_with_options(false, 0, 42);
        let catalog = swarm_data::default_tech_line();
        let order: Vec<_> = line.iter().map(|t| t.tech_piece.clone()).collect();
        assert_eq!(order, catalog.to_vec());
    }

    #[test]
    fn match_options_seed_starting_souls_and_extra_income() {
        let opts = MatchOptions {
            num_boards: 1,
            target_num_wins: 3,
            starting_souls: SideArray::new(7, 4),
            extra_souls_per_turn: SideArray::new(2, 0),
            ..MatchOptions::default()
        };
        let game = new_game_with_options(&opts);
        assert_eq!(*game.mana.get(Side::S0), 7);
        assert_eq!(*game.mana.get(Side::S1), 4);
        assert_eq!(*game.extra_mana_per_turn.get(Side::S0), 2);
    }
}
