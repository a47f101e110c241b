//! All-or-nothing replay: parse, interpret against a copy, then commit.
//!
//! Parsing finishes before any state is touched, and interpretation runs on a
//! clone of the caller's `GameState`. On any error the caller's state is left
//! exactly as it was.

use crate::game::{GameError, GameState};
use crate::grammar::{parse_game, parse_opening, parse_turn, ParseError};
use crate::interpreter::Interpreter;
use crate::locator::Locator;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("could not parse log: {0}")]
    Parse(#[from] ParseError),

    #[error("could not apply log: {0}")]
    Game(#[from] GameError),
}

/// Replay a complete log.
pub fn replay<L: Locator>(game: &mut GameState, text: &str, locator: L) -> Result<(), ReplayError> {
    let log = parse_game(text)?;
    info!(turns = log.turns.len(), "parsed game log");
    commit(game, locator, |interpreter| interpreter.apply_log(&log))
}

/// Replay the placement phase and the starting resources.
pub fn replay_opening<L: Locator>(
    game: &mut GameState,
    text: &str,
    locator: L,
) -> Result<(), ReplayError> {
    let opening = parse_opening(text)?;
    commit(game, locator, |interpreter| interpreter.apply_opening(&opening))
}

/// Replay one turn on top of an already seated game.
pub fn replay_turn<L: Locator>(
    game: &mut GameState,
    text: &str,
    locator: L,
) -> Result<(), ReplayError> {
    let turn = parse_turn(text)?;
    commit(game, locator, |interpreter| interpreter.apply_turn(&turn))
}

fn commit<L: Locator>(
    game: &mut GameState,
    locator: L,
    apply: impl FnOnce(&mut Interpreter<'_, L>) -> Result<(), GameError>,
) -> Result<(), ReplayError> {
    let mut draft = game.clone();
    apply(&mut Interpreter::new(&mut draft, locator))?;
    *game = draft;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Board;
    use crate::config::ReplayConfig;
    use crate::locator::NoLocator;

    fn seated() -> GameState {
        let mut game = GameState::new(Board::new(), ReplayConfig::default());
        game.set_turn_order(&["bambee", "ZacTodd"]).unwrap();
        game
    }

    #[test]
    fn test_failed_turn_leaves_state_untouched() {
        let mut game = seated();
        game.add_resources("bambee", &[crate::board::Resource::Ore]).unwrap();

        // The roll and the first gain are valid, the unknown player is not
        let err = replay_turn(
            &mut game,
            "bambee rolled: dice_1 dice_1\nbambee got: ore\nNobody got: ore",
            NoLocator,
        )
        .unwrap_err();
        assert_eq!(err, ReplayError::Game(GameError::UnknownPlayer("Nobody".into())));

        let bambee = game.get_player("bambee").unwrap();
        assert_eq!(bambee.hand.total(), 1);
        assert!(game.dice_rolls().is_empty());
    }

    #[test]
    fn test_parse_error_applies_nothing() {
        let mut game = seated();
        let err = replay_turn(&mut game, "bambee rolled: dice_9", NoLocator).unwrap_err();
        assert!(matches!(err, ReplayError::Parse(_)));
        assert!(game.dice_rolls().is_empty());
    }

    #[test]
    fn test_successful_turn_commits() {
        let mut game = seated();
        replay_turn(&mut game, "ZacTodd rolled: dice_4 dice_4\nZacTodd got: grain", NoLocator)
            .unwrap();
        assert_eq!(game.dice_rolls().len(), 1);
        assert_eq!(game.get_player("ZacTodd").unwrap().hand.total(), 1);
    }
}
