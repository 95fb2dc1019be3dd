//! Game-meta actions: advancing the shared tech line, undoing that advance,
//! and buying the one-time extra tech-and-spell slot.

use swarm_types::{Game, GameAction, GameError, LegalityError, Side};

type Result<T> = std::result::Result<T, GameError>;

/// Cost in mana to move one tech-line entry up one level.
const TECH_COST: i32 = 3;
/// Cost in mana for `BuyExtraTechAndSpell`.
const EXTRA_TECH_COST: i32 = 5;

/// The mana cost of unlocking the tech at `tech_index`, scaled by its
/// position in the line — later entries cost more per `extraTechCostPerBoard`.
fn tech_cost(game: &Game, tech_index: usize) -> i32 {
    TECH_COST + tech_index as i32 * game.extra_tech_cost_per_board
}

pub fn try_legality(game: &Game, side: Side, action: &GameAction) -> Result<()> {
    match action {
        GameAction::PerformTech { tech_index } => {
            let entry = game
                .tech_line
                .get(*tech_index)
                .ok_or(LegalityError::TechLocked)?;
            if entry.level.get(side).next().is_none() {
                return Err(LegalityError::TechAlreadyAtMax.into());
            }
            if *game.mana.get(side) < tech_cost(game, *tech_index) {
                return Err(LegalityError::NotEnoughMana.into());
            }
            Ok(())
        }
        GameAction::UndoTech { tech_index } => {
            let entry = game
                .tech_line
                .get(*tech_index)
                .ok_or(LegalityError::TechLocked)?;
            if entry.level.get(side) == entry.starting_level_this_turn.get(side) {
                return Err(LegalityError::NothingToUndo.into());
            }
            Ok(())
        }
        GameAction::BuyExtraTechAndSpell => {
            if *game.mana.get(side) < EXTRA_TECH_COST {
                return Err(LegalityError::NotEnoughMana.into());
            }
            Ok(())
        }
        GameAction::UndoBuyExtraTechAndSpell => {
            if *game.extra_tech_and_spell_bought_this_turn.get(side) < 1 {
                return Err(LegalityError::NothingToUndo.into());
            }
            Ok(())
        }
    }
}

pub fn do_action(game: &mut Game, side: Side, action: &GameAction) -> Result<()> {
    try_legality(game, side, action)?;

    match action {
        GameAction::PerformTech { tech_index } => {
            let cost = tech_cost(game, *tech_index);
            *game.mana.get_mut(side) -= cost;
            let entry = &mut game.tech_line[*tech_index];
            let next = entry.level.get(side).next().unwrap();
            entry.level.set(side, next);
        }
        GameAction::UndoTech { tech_index } => {
            let cost = tech_cost(game, *tech_index);
            *game.mana.get_mut(side) += cost;
            let entry = &mut game.tech_line[*tech_index];
            let restored = *entry.starting_level_this_turn.get(side);
            entry.level.set(side, restored);
        }
        GameAction::BuyExtraTechAndSpell => {
            *game.mana.get_mut(side) -= EXTRA_TECH_COST;
            *game.extra_tech_purchases.get_mut(side) += 1;
            *game.extra_spell_grants.get_mut(side) += 1;
            *game.extra_tech_and_spell_bought_this_turn.get_mut(side) += 1;
        }
        GameAction::UndoBuyExtraTechAndSpell => {
            *game.mana.get_mut(side) += EXTRA_TECH_COST;
            *game.extra_tech_purchases.get_mut(side) -= 1;
            *game.extra_spell_grants.get_mut(side) -= 1;
            *game.extra_tech_and_spell_bought_this_turn.get_mut(side) -= 1;
        }
    }

    Ok(())
}

/// Snapshot each side's tech levels as "start of turn" — called once per
/// side at the start of their turn so `UndoTech` has a baseline to restore,
/// and reset the extra-tech-and-spell purchase counter for the same reason.
pub fn snapshot_starting_levels(game: &mut Game) {
    for entry in &mut game.tech_line {
        entry.starting_level_this_turn = entry.level;
    }
    game.extra_tech_and_spell_bought_this_turn = swarm_types::SideArray::new(0, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use swarm_types::SideArray;

    fn game_with_mana(mana: i32) -> Game {
        let mut g = crate::setup::new_game(1, 5);
        g.mana = SideArray::new(mana, mana);
        g
    }

    #[test]
    fn perform_tech_without_enough_mana_is_rejected() {
        let game = game_with_mana(0);
        let result = try_legality(&game, Side::S0, &GameAction::PerformTech { tech_index: 0 });
        assert_eq!(result, Err(LegalityError::NotEnoughMana.into()));
    }

    #[test]
    fn perform_tech_unlocks_and_spends_mana() {
        let mut game = game_with_mana(10);
        do_action(&mut game, Side::S0, &GameAction::PerformTech { tech_index: 0 }).unwrap();
        assert_eq!(*game.mana.get(Side::S0), 10 - TECH_COST);
        assert_eq!(
            *game.tech_line[0].level.get(Side::S0),
            swarm_types::TechLevel::Unlocked
        );
    }

    #[test]
    fn undo_tech_restores_starting_level_and_refunds() {
        let mut game = game_with_mana(10);
        snapshot_starting_levels(&mut game);
        do_action(&mut game, Side::S0, &GameAction::PerformTech { tech_index: 0 }).unwrap();
        do_action(&mut game, Side::S0, &GameAction::UndoTech { tech_index: 0 }).unwrap();
        assert_eq!(*game.mana.get(Side::S0), 10);
        assert_eq!(
            *game.tech_line[0].level.get(Side::S0),
            swarm_types::TechLevel::Locked
        );
    }

    #[test]
    fn later_tech_line_entries_cost_more_when_the_board_scaling_is_set() {
        let mut game = game_with_mana(100);
        game.extra_tech_cost_per_board = 2;
        do_action(&mut game, Side::S0, &GameAction::PerformTech { tech_index: 3 }).unwrap();
        assert_eq!(*game.mana.get(Side::S0), 100 - (TECH_COST + 3 * 2));
    }

    #[test]
    fn buy_extra_tech_and_spell_grants_allowances_and_is_undoable() {
        let mut game = game_with_mana(10);
        do_action(&mut game, Side::S0, &GameAction::BuyExtraTechAndSpell).unwrap();
        assert_eq!(*game.mana.get(Side::S0), 10 - EXTRA_TECH_COST);
        assert_eq!(*game.extra_tech_purchases.get(Side::S0), 1);
        assert_eq!(*game.extra_spell_grants.get(Side::S0), 1);

        do_action(&mut game, Side::S0, &GameAction::UndoBuyExtraTechAndSpell).unwrap();
        assert_eq!(*game.mana.get(Side::S0), 10);
        assert_eq!(*game.extra_tech_purchases.get(Side::S0), 0);
        assert_eq!(*game.extra_spell_grants.get(Side::S0), 0);
    }

    #[test]
    fn undo_buy_extra_tech_and_spell_without_a_purchase_is_rejected() {
        let mut game = game_with_mana(10);
        let result = do_action(&mut game, Side::S0, &GameAction::UndoBuyExtraTechAndSpell);
        assert!(result.is_err());
    }

    #[test]
    fn snapshot_resets_the_extra_tech_and_spell_purchase_counter() {
        let mut game = game_with_mana(10);
        do_action(&mut game, Side::S0, &GameAction::BuyExtraTechAndSpell).unwrap();
        snapshot_starting_levels(&mut game);
        assert_eq!(*game.extra_tech_and_spell_bought_this_turn.get(Side::S0), 0);
        let result = do_action(&mut game, Side::S0, &GameAction::UndoBuyExtraTechAndSpell);
        assert!(result.is_err());
    }
}
