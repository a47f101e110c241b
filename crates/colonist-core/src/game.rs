//! Game state reconstructed from the log.
//!
//! `GameState` owns the board, the players and the turn order. Every mutator
//! takes the player's name as the log writes it, routes the change to the
//! board and the player, then recomputes the derived state (road lengths,
//! largest army, longest road, victory points) for everyone.

use crate::board::{
    longest_road_avoiding, placement_phase_settlement_triples, potential_road_edges,
    potential_settlement_triples, potential_settlement_upgrades, Board, BoardError, PlayerId,
    Resource, MAX_ROADS,
};
use crate::config::ReplayConfig;
use crate::hex::{Edge, HexCoord, Triple};
use crate::player::{
    BankRates, DevelopmentCard, Player, PlayerColor, Purchase, PurchaseOption, ResourceHand,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Victory points needed to win
pub const VICTORY_POINTS_TO_WIN: u32 = 10;

/// Errors raised while applying a mutation to the game
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("unknown player {0:?}")]
    UnknownPlayer(String),

    #[error("the roster is already seated")]
    RosterAlreadySeated,

    #[error("player {0:?} is seated twice")]
    DuplicatePlayer(String),

    #[error("{0} players cannot be seated")]
    TooManyPlayers(usize),

    #[error("player {player:?} would own {roads} roads, more than {MAX_ROADS}")]
    RoadLimit { player: String, roads: usize },

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// The two bonuses worth 2 victory points each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bonus {
    LargestArmy,
    LongestRoad,
}

impl Bonus {
    fn held(self, player: &Player) -> bool {
        match self {
            Bonus::LargestArmy => player.has_largest_army,
            Bonus::LongestRoad => player.has_longest_road,
        }
    }

    fn set(self, player: &mut Player, held: bool) {
        match self {
            Bonus::LargestArmy => player.has_largest_army = held,
            Bonus::LongestRoad => player.has_longest_road = held,
        }
    }

    fn score(self, player: &Player) -> u32 {
        match self {
            Bonus::LargestArmy => player.knights,
            Bonus::LongestRoad => player.road_length,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Bonus::LargestArmy => "largest army",
            Bonus::LongestRoad => "longest road",
        }
    }
}

/// A dice roll and who rolled it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceRoll {
    pub player: PlayerId,
    pub dice: [u8; 2],
}

impl DiceRoll {
    pub fn total(&self) -> u8 {
        self.dice[0] + self.dice[1]
    }
}

/// The complete reconstructed game state
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub board: Board,
    /// Players indexed by `PlayerId`, which is their seat in the turn order
    players: Vec<Player>,
    roster: HashMap<String, PlayerId>,
    dice_rolls: Vec<DiceRoll>,
    winner: Option<PlayerId>,
    pub config: ReplayConfig,
}

impl GameState {
    pub fn new(board: Board, config: ReplayConfig) -> Self {
        Self {
            board,
            config,
            ..Self::default()
        }
    }

    // ==================== Roster ====================

    /// Seat the players in the order they first acted.
    pub fn set_turn_order<S: AsRef<str>>(&mut self, names: &[S]) -> Result<(), GameError> {
        if !self.players.is_empty() {
            return Err(GameError::RosterAlreadySeated);
        }
        let mut roster = HashMap::new();
        let mut players = Vec::with_capacity(names.len());
        for (seat, name) in names.iter().enumerate() {
            let name = name.as_ref();
            let id =
                PlayerId::try_from(seat).map_err(|_| GameError::TooManyPlayers(names.len()))?;
            if roster.insert(name.to_string(), id).is_some() {
                return Err(GameError::DuplicatePlayer(name.to_string()));
            }
            players.push(Player::new(id, name));
        }
        self.roster = roster;
        self.players = players;
        info!(turn_order = ?self.turn_order(), "seated players");
        Ok(())
    }

    pub fn turn_order(&self) -> Vec<&str> {
        self.players.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn is_seated(&self) -> bool {
        !self.players.is_empty()
    }

    pub fn player_id(&self, name: &str) -> Result<PlayerId, GameError> {
        self.roster
            .get(name)
            .copied()
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))
    }

    pub fn get_player(&self, name: &str) -> Result<&Player, GameError> {
        let id = self.player_id(name)?;
        Ok(&self.players[id as usize])
    }

    fn player_mut(&mut self, name: &str) -> Result<&mut Player, GameError> {
        let id = self.player_id(name)?;
        Ok(&mut self.players[id as usize])
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id as usize)
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn dice_rolls(&self) -> &[DiceRoll] {
        &self.dice_rolls
    }

    pub fn winner(&self) -> Option<&Player> {
        self.winner.and_then(|id| self.player(id))
    }

    // ==================== Resources ====================

    pub fn add_resources(&mut self, name: &str, resources: &[Resource]) -> Result<(), GameError> {
        self.player_mut(name)?.add_resources(resources);
        Ok(())
    }

    /// Remove cards from a hand. The log is authoritative, so a hand that
    /// cannot cover the cards is emptied of them and the gap reported.
    pub fn remove_resources(&mut self, name: &str, cards: &ResourceHand) -> Result<(), GameError> {
        let shortfall = self.player_mut(name)?.remove_resources(cards);
        if !shortfall.is_empty() {
            warn!(player = name, ?shortfall, "hand could not cover removed cards");
        }
        Ok(())
    }

    /// Move cards from one player to another.
    pub fn transfer(&mut self, from: &str, to: &str, cards: &ResourceHand) -> Result<(), GameError> {
        self.player_id(to)?;
        self.remove_resources(from, cards)?;
        self.player_mut(to)?.draw_cards(cards);
        Ok(())
    }

    pub fn charge(&mut self, name: &str, purchase: Purchase) -> Result<(), GameError> {
        self.remove_resources(name, &purchase.cost())
    }

    /// Give a player every card of `resource` held by the others.
    pub fn monopoly(&mut self, name: &str, resource: Resource) -> Result<u32, GameError> {
        let id = self.player_id(name)?;
        let mut taken = 0;
        for player in self.players.iter_mut().filter(|p| p.id != id) {
            taken += player.hand.take_all(resource);
        }
        self.players[id as usize].hand.add(resource, taken);
        debug!(player = name, %resource, taken, "monopoly");
        Ok(taken)
    }

    // ==================== Structures ====================

    /// Register a settlement. `None` records one the log reported without
    /// a known position.
    pub fn add_settlement(&mut self, name: &str, location: Option<Triple>) -> Result<(), GameError> {
        let id = self.player_id(name)?;
        if let Some(triple) = location {
            let port = self.board.place_settlement(triple, id)?.port.clone();
            if let Some(port) = port {
                debug!(player = name, port = %port.text, "settlement on port");
                self.players[id as usize].apply_port(&port.rates);
            }
        }
        self.players[id as usize].add_settlement(location);
        self.refresh();
        Ok(())
    }

    pub fn upgrade_settlement(
        &mut self,
        name: &str,
        location: Option<Triple>,
    ) -> Result<(), GameError> {
        let id = self.player_id(name)?;
        if let Some(triple) = location {
            self.board.upgrade_settlement(triple, id)?;
        }
        self.players[id as usize].upgrade_settlement(location);
        self.refresh();
        Ok(())
    }

    /// Register a road. A player never owns more than [`MAX_ROADS`], which
    /// keeps the longest-road search bounded.
    pub fn add_road(&mut self, name: &str, location: Option<Edge>) -> Result<(), GameError> {
        let id = self.player_id(name)?;
        let roads = self.players[id as usize].total_roads() + 1;
        if roads > MAX_ROADS {
            return Err(GameError::RoadLimit {
                player: name.to_string(),
                roads,
            });
        }
        if let Some(edge) = location {
            self.board.place_road(edge, id)?;
        }
        self.players[id as usize].add_road(location);
        self.refresh();
        Ok(())
    }

    // ==================== Development Cards ====================

    pub fn buy_dev_card(&mut self, name: &str) -> Result<(), GameError> {
        self.charge(name, Purchase::DevelopmentCard)?;
        self.player_mut(name)?.buy_dev_card();
        Ok(())
    }

    pub fn play_dev_card(&mut self, name: &str, card: DevelopmentCard) -> Result<(), GameError> {
        if !self.player_mut(name)?.play_dev_card(card) {
            debug!(player = name, %card, "played a card the reconstructed hand does not hold");
        }
        self.refresh();
        Ok(())
    }

    pub fn add_knight(&mut self, name: &str) -> Result<(), GameError> {
        self.player_mut(name)?.add_knight();
        self.refresh();
        Ok(())
    }

    // ==================== Bonuses ====================

    /// The log says `name` holds largest army.
    pub fn grant_largest_army(&mut self, name: &str) -> Result<(), GameError> {
        self.grant(name, Bonus::LargestArmy)
    }

    /// The log says `name` holds longest road.
    pub fn grant_longest_road(&mut self, name: &str) -> Result<(), GameError> {
        self.grant(name, Bonus::LongestRoad)
    }

    fn grant(&mut self, name: &str, bonus: Bonus) -> Result<(), GameError> {
        let id = self.player_id(name)?;
        if let Some(holder) = self.players.iter().find(|p| bonus.held(p)) {
            if holder.id != id {
                warn!(
                    bonus = bonus.name(),
                    log = name,
                    computed = %holder.name,
                    "log disagrees with computed holder"
                );
            }
        }
        for player in &mut self.players {
            bonus.set(player, player.id == id);
        }
        self.refresh();
        Ok(())
    }

    /// Sticky award: a player takes the bonus only by reaching the minimum
    /// and strictly beating every opponent. Ties leave the holder in place.
    fn award(&mut self, bonus: Bonus, minimum: u32) {
        let Some(leader) = self.players.iter().find(|candidate| {
            let score = bonus.score(candidate);
            score >= minimum
                && self
                    .players
                    .iter()
                    .filter(|p| p.id != candidate.id)
                    .all(|p| bonus.score(p) < score)
        }) else {
            return;
        };
        if bonus.held(leader) {
            return;
        }
        let leader = leader.id;
        debug!(bonus = bonus.name(), player = %self.players[leader as usize].name, "bonus awarded");
        for player in &mut self.players {
            bonus.set(player, player.id == leader);
        }
    }

    /// Recompute every player's derived state
    fn refresh(&mut self) {
        for id in 0..self.players.len() {
            let length = self.road_length_of(id as PlayerId);
            self.players[id].road_length = length;
        }
        self.award(Bonus::LargestArmy, self.config.largest_army_minimum);
        self.award(Bonus::LongestRoad, self.config.longest_road_minimum);
        for player in &mut self.players {
            player.calculate_vp();
        }
    }

    fn road_length_of(&self, id: PlayerId) -> u32 {
        let roads = &self.players[id as usize].roads;
        if roads.is_empty() {
            return 0;
        }
        longest_road_avoiding(roads, &self.board.opponent_settlements(id))
    }

    // ==================== Turn Events ====================

    /// Record a roll and return its total
    pub fn record_roll(&mut self, name: &str, dice: [u8; 2]) -> Result<u8, GameError> {
        let roll = DiceRoll {
            player: self.player_id(name)?,
            dice,
        };
        self.dice_rolls.push(roll);
        Ok(roll.total())
    }

    /// Move the robber onto the tiles numbered `value`
    pub fn move_robber(&mut self, value: u8) -> Vec<HexCoord> {
        let blocked = self.board.move_robber(value);
        if blocked.is_empty() {
            warn!(value, "robber moved to a number no tile carries");
        }
        blocked
    }

    pub fn set_connected(&mut self, name: &str, connected: bool) -> Result<(), GameError> {
        self.player_mut(name)?.connected = connected;
        Ok(())
    }

    /// Record the winner, revealing held cards as victory points until the
    /// winner's total reaches the winning score.
    pub fn declare_winner(&mut self, name: &str) -> Result<(), GameError> {
        let id = self.player_id(name)?;
        let winner = &mut self.players[id as usize];
        while winner.calculate_vp() < VICTORY_POINTS_TO_WIN && winner.reveal_victory_point() {}
        if winner.vp < VICTORY_POINTS_TO_WIN {
            warn!(player = name, vp = winner.vp, "winner short of the winning score");
        }
        info!(player = name, vp = winner.vp, "game won");
        self.winner = Some(id);
        Ok(())
    }

    // ==================== Queries ====================

    pub fn calculate_vp(&self, name: &str) -> Result<u32, GameError> {
        Ok(self.get_player(name)?.vp)
    }

    /// Longest road through the player's placed roads. Opponents'
    /// buildings break a road.
    pub fn longest_road(&self, name: &str) -> Result<u32, GameError> {
        Ok(self.road_length_of(self.player_id(name)?))
    }

    pub fn potential_roads(&self, name: &str) -> Result<HashSet<Edge>, GameError> {
        let player = self.get_player(name)?;
        Ok(potential_road_edges(&player.roads, &self.board.placed_roads()))
    }

    pub fn potential_settlements(&self, name: &str) -> Result<HashSet<Triple>, GameError> {
        let player = self.get_player(name)?;
        Ok(potential_settlement_triples(
            &player.roads,
            &self.board.placed_settlements(),
        ))
    }

    pub fn potential_upgrades(&self, name: &str) -> Result<HashSet<Triple>, GameError> {
        let id = self.player_id(name)?;
        Ok(potential_settlement_upgrades(self.board.settlements_of(id)))
    }

    pub fn placement_phase_settlements(&self) -> HashSet<Triple> {
        placement_phase_settlement_triples(&self.board.placed_settlements())
    }

    pub fn purchase_options(&self, name: &str) -> Result<Vec<PurchaseOption>, GameError> {
        Ok(self.get_player(name)?.purchase_options(self.config.affordability))
    }

    /// Serializable snapshot for collaborators
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            turn_order: self.turn_order().into_iter().map(String::from).collect(),
            players: self.players.iter().map(PlayerSummary::from).collect(),
            robber: self.board.robber_location(),
            rolls: self.dice_rolls.len(),
            winner: self.winner().map(|p| p.name.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub name: String,
    pub color: PlayerColor,
    pub vp: u32,
    pub hand: ResourceHand,
    pub bank_rates: BankRates,
    pub settlements: usize,
    pub cities: usize,
    pub roads: usize,
    pub dev_cards: usize,
    pub knights: u32,
    pub road_length: u32,
    pub has_largest_army: bool,
    pub has_longest_road: bool,
    pub connected: bool,
}

impl From<&Player> for PlayerSummary {
    fn from(player: &Player) -> Self {
        Self {
            name: player.name.clone(),
            color: player.color,
            vp: player.vp,
            hand: player.hand.clone(),
            bank_rates: player.bank_rates.clone(),
            settlements: player.settlements.len() + player.unplaced.settlements as usize,
            cities: player.cities.len() + player.unplaced.cities as usize,
            roads: player.total_roads(),
            dev_cards: player.dev_cards.len(),
            knights: player.knights,
            road_length: player.road_length,
            has_largest_army: player.has_largest_army,
            has_longest_road: player.has_longest_road,
            connected: player.connected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSummary {
    pub turn_order: Vec<String>,
    pub players: Vec<PlayerSummary>,
    /// Tiles the robber sits on
    pub robber: Vec<HexCoord>,
    pub rolls: usize,
    pub winner: Option<String>,
}
