//! Applies parsed log events to a `GameState`.

use crate::board::Resource;
use crate::game::{GameError, GameState};
use crate::grammar::{
    Build, CardEffect, CardPlay, ClosingTurn, Event, GameLog, Opening, Robbery, Structure, Turn,
};
use crate::locator::Locator;
use crate::player::{Purchase, ResourceHand};
use std::collections::HashMap;
use tracing::{debug, warn};

/// An open trade: what the proposer gives and what they want
#[derive(Debug, Clone)]
struct Offer {
    give: ResourceHand,
    want: ResourceHand,
}

pub struct Interpreter<'g, L: Locator> {
    game: &'g mut GameState,
    locator: L,
    offers: HashMap<String, Offer>,
}

impl<'g, L: Locator> Interpreter<'g, L> {
    pub fn new(game: &'g mut GameState, locator: L) -> Self {
        Self {
            game,
            locator,
            offers: HashMap::new(),
        }
    }

    pub fn game(&self) -> &GameState {
        &*self.game
    }

    pub fn apply_log(&mut self, log: &GameLog) -> Result<(), GameError> {
        self.apply_opening(&log.opening)?;
        for turn in &log.turns {
            self.apply_turn(turn)?;
        }
        self.apply_closing(&log.closing)
    }

    /// Seat the roster from the first orbit, then register the free
    /// placements and hand out the starting resources.
    pub fn apply_opening(&mut self, opening: &Opening) -> Result<(), GameError> {
        if !self.game.is_seated() {
            let order: Vec<&str> = opening
                .first_orbit()
                .iter()
                .map(|turn| turn.player.as_str())
                .collect();
            self.game.set_turn_order(&order)?;
        }
        for turn in &opening.placements {
            for placement in &turn.placements {
                if placement.by_bot {
                    debug!(player = %turn.player, structure = %placement.structure, "bot placement");
                }
                self.place(&turn.player, placement.structure)?;
            }
        }
        for gain in &opening.starting_resources {
            self.game.add_resources(&gain.player, &gain.resources)?;
        }
        Ok(())
    }

    pub fn apply_turn(&mut self, turn: &Turn) -> Result<(), GameError> {
        debug!(player = %turn.player, events = turn.events.len(), "turn");
        self.offers.clear();
        for event in &turn.events {
            self.apply_event(event)?;
        }
        Ok(())
    }

    pub fn apply_closing(&mut self, closing: &ClosingTurn) -> Result<(), GameError> {
        self.offers.clear();
        for event in &closing.events {
            self.apply_event(event)?;
        }
        self.game.declare_winner(&closing.winner)
    }

    pub fn apply_event(&mut self, event: &Event) -> Result<(), GameError> {
        debug!(?event, "apply");
        match event {
            Event::DiceRolled { player, dice } => {
                self.game.record_roll(player, *dice)?;
            }
            Event::ResourcesGained(gain) => {
                self.game.add_resources(&gain.player, &gain.resources)?;
            }
            Event::DiscardRequired {
                player,
                hand_size,
                discard,
            } => {
                let held = self.game.get_player(player)?.hand.total();
                if held != *hand_size {
                    debug!(player = %player, held, logged = hand_size, discard, "hand size differs from log");
                }
            }
            Event::Discarded { player, resources } => {
                self.game
                    .remove_resources(player, &ResourceHand::from_resources(resources))?;
            }
            Event::Robbery(robbery) => self.robbery(robbery)?,
            Event::DevCardBought { player } => self.game.buy_dev_card(player)?,
            Event::TradeProposed {
                player,
                offer,
                want,
            } => {
                self.game.player_id(player)?;
                self.offers.insert(
                    player.clone(),
                    Offer {
                        give: ResourceHand::from_resources(offer),
                        want: ResourceHand::from_resources(want),
                    },
                );
            }
            Event::TradeAccepted { player, partner } => self.accept_trade(player, partner)?,
            Event::BankTrade { player, gave, took } => {
                self.game
                    .remove_resources(player, &ResourceHand::from_resources(gave))?;
                self.game.add_resources(player, took)?;
            }
            Event::Built(build) => self.build(build, true)?,
            Event::CardPlayed(play) => self.play_card(play)?,
            Event::LargestArmyReceived { player } => self.game.grant_largest_army(player)?,
            Event::LongestRoadReceived { player } => self.game.grant_longest_road(player)?,
            Event::Disconnected { player } => self.game.set_connected(player, false)?,
            Event::Reconnected { player } => self.game.set_connected(player, true)?,
        }
        Ok(())
    }

    /// Opening placements are free
    fn place(&mut self, player: &str, structure: Structure) -> Result<(), GameError> {
        self.build(
            &Build {
                player: player.to_string(),
                structure,
                longest_road: None,
            },
            false,
        )
    }

    fn build(&mut self, build: &Build, charged: bool) -> Result<(), GameError> {
        let player = build.player.as_str();
        let purchase = match build.structure {
            Structure::Road => {
                let location = self.locator.road(player);
                self.game.add_road(player, location)?;
                Purchase::Road
            }
            Structure::Settlement => {
                let location = self.locator.settlement(player);
                self.game.add_settlement(player, location)?;
                Purchase::Settlement
            }
            Structure::City => {
                let location = self.locator.city(player);
                self.game.upgrade_settlement(player, location)?;
                Purchase::City
            }
        };
        if charged {
            self.game.charge(player, purchase)?;
        }
        if let Some(holder) = &build.longest_road {
            self.game.grant_longest_road(holder)?;
        }
        Ok(())
    }

    fn robbery(&mut self, robbery: &Robbery) -> Result<(), GameError> {
        self.game.player_id(&robbery.player)?;
        self.game.move_robber(robbery.tile);
        let Some(theft) = &robbery.theft else {
            return Ok(());
        };
        match theft.resource {
            Some(resource) => {
                self.game
                    .transfer(&theft.victim, &theft.thief, &ResourceHand::single(resource, 1))
            }
            None => {
                self.game.player_id(&theft.victim)?;
                self.game.player_id(&theft.thief)?;
                debug!(thief = %theft.thief, victim = %theft.victim, "unseen theft");
                Ok(())
            }
        }
    }

    /// The proposer gives their offer and receives what they asked for.
    fn accept_trade(&mut self, player: &str, partner: &str) -> Result<(), GameError> {
        self.game.player_id(player)?;
        self.game.player_id(partner)?;
        let (proposer, accepter) = if self.offers.contains_key(player) {
            (player, partner)
        } else {
            (partner, player)
        };
        let Some(offer) = self.offers.remove(proposer) else {
            warn!(player, partner, "trade accepted without a recorded offer");
            return Ok(());
        };
        self.game.transfer(proposer, accepter, &offer.give)?;
        self.game.transfer(accepter, proposer, &offer.want)
    }

    fn play_card(&mut self, play: &CardPlay) -> Result<(), GameError> {
        let player = play.player.as_str();
        self.game.play_dev_card(player, play.card)?;
        match &play.effect {
            Some(CardEffect::Knight {
                largest_army,
                robbery,
            }) => {
                self.robbery(robbery)?;
                if let Some(holder) = largest_army {
                    self.game.grant_largest_army(holder)?;
                }
            }
            Some(CardEffect::Monopoly { resource }) => {
                self.game.monopoly(player, *resource)?;
            }
            Some(CardEffect::RoadBuilding { roads }) => {
                for road in roads {
                    self.build(road, false)?;
                }
            }
            Some(CardEffect::YearOfPlenty { resources }) => {
                self.game.add_resources(player, resources)?;
            }
            None => {}
        }
        Ok(())
    }
}

/// Resources a list of gains hands to one player
pub fn gained_by(events: &[Event], player: &str) -> Vec<Resource> {
    events
        .iter()
        .filter_map(|event| match event {
            Event::ResourcesGained(gain) if gain.player == player => Some(gain.resources.clone()),
            _ => None,
        })
        .flatten()
        .collect()
}
