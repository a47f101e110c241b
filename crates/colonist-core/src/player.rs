//! Player state reconstructed from the log.
//!
//! This module contains:
//! - ResourceHand for resource counts
//! - Development cards, including ones bought but not yet revealed
//! - Purchase costs, bank rates and purchase options
//! - The Player struct with structures, bonuses and victory points

use crate::board::{PlayerId, PortRates, Resource};
use crate::config::Affordability;
use crate::hex::{Edge, Triple};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Player color as shown in the game client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerColor {
    Red,
    Blue,
    Orange,
    White,
}

impl PlayerColor {
    /// Get color for a player index
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Orange,
            _ => PlayerColor::White,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::Blue => "blue",
            PlayerColor::Orange => "orange",
            PlayerColor::White => "white",
        }
    }
}

/// Development card types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevelopmentCard {
    /// Move robber and steal, counts toward Largest Army
    Knight,
    /// Worth 1 VP while held
    VictoryPoint,
    /// Build 2 roads for free
    RoadBuilding,
    /// Take any 2 resources from the bank
    YearOfPlenty,
    /// All players must give you all of one resource type
    Monopoly,
    /// Bought, but the log has not said which card it is
    Unrevealed,
}

impl DevelopmentCard {
    /// Playable cards, as the log names them
    pub fn from_log_name(name: &str) -> Option<Self> {
        match name {
            "knight" => Some(DevelopmentCard::Knight),
            "monopoly" => Some(DevelopmentCard::Monopoly),
            "road building" => Some(DevelopmentCard::RoadBuilding),
            "year of plenty" => Some(DevelopmentCard::YearOfPlenty),
            _ => None,
        }
    }

    pub fn log_name(&self) -> &'static str {
        match self {
            DevelopmentCard::Knight => "knight",
            DevelopmentCard::VictoryPoint => "victory point",
            DevelopmentCard::RoadBuilding => "road building",
            DevelopmentCard::YearOfPlenty => "year of plenty",
            DevelopmentCard::Monopoly => "monopoly",
            DevelopmentCard::Unrevealed => "development card",
        }
    }
}

impl fmt::Display for DevelopmentCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.log_name())
    }
}

/// A hand of resources, never negative.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Resource, u32>", from = "BTreeMap<Resource, u32>")]
pub struct ResourceHand {
    counts: [u32; 5],
}

impl ResourceHand {
    /// Create an empty hand
    pub fn new() -> Self {
        Self::default()
    }

    /// One unit per listed resource
    pub fn from_resources(resources: &[Resource]) -> Self {
        resources.iter().copied().collect()
    }

    /// Create a hand with a single resource
    pub fn single(resource: Resource, amount: u32) -> Self {
        let mut hand = Self::new();
        hand.add(resource, amount);
        hand
    }

    /// Total number of resource cards
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Get count of a specific resource
    pub fn get(&self, resource: Resource) -> u32 {
        self.counts[resource.index()]
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        self.counts[resource.index()] += amount;
    }

    /// Add another hand to this one
    pub fn add_hand(&mut self, other: &ResourceHand) {
        for resource in Resource::ALL {
            self.add(resource, other.get(resource));
        }
    }

    /// Remove up to `amount`, returning how many could not be removed.
    pub fn remove(&mut self, resource: Resource, amount: u32) -> u32 {
        let held = &mut self.counts[resource.index()];
        let taken = amount.min(*held);
        *held -= taken;
        amount - taken
    }

    /// Remove another hand from this one, returning the shortfall.
    pub fn remove_hand(&mut self, other: &ResourceHand) -> ResourceHand {
        let mut shortfall = ResourceHand::new();
        for resource in Resource::ALL {
            let missing = self.remove(resource, other.get(resource));
            shortfall.add(resource, missing);
        }
        shortfall
    }

    /// Take every card of one resource
    pub fn take_all(&mut self, resource: Resource) -> u32 {
        std::mem::take(&mut self.counts[resource.index()])
    }

    /// Check if the hand covers a cost under the given rule
    pub fn can_afford(&self, cost: &ResourceHand, rule: Affordability) -> bool {
        Resource::ALL
            .into_iter()
            .filter(|r| cost.get(*r) > 0)
            .all(|r| rule.covers(self.get(r), cost.get(r)))
    }

    /// Non-zero counts
    pub fn iter(&self) -> impl Iterator<Item = (Resource, u32)> + '_ {
        Resource::ALL
            .into_iter()
            .map(|r| (r, self.get(r)))
            .filter(|(_, count)| *count > 0)
    }
}

impl FromIterator<Resource> for ResourceHand {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        let mut hand = Self::new();
        for resource in iter {
            hand.add(resource, 1);
        }
        hand
    }
}

impl From<ResourceHand> for BTreeMap<Resource, u32> {
    fn from(hand: ResourceHand) -> Self {
        hand.iter().collect()
    }
}

impl From<BTreeMap<Resource, u32>> for ResourceHand {
    fn from(map: BTreeMap<Resource, u32>) -> Self {
        let mut hand = Self::new();
        for (resource, count) in map {
            hand.add(resource, count);
        }
        hand
    }
}

/// Things a player can spend resources on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Purchase {
    Road,
    Settlement,
    City,
    DevelopmentCard,
}

impl Purchase {
    pub const ALL: [Purchase; 4] = [
        Purchase::Road,
        Purchase::Settlement,
        Purchase::City,
        Purchase::DevelopmentCard,
    ];

    pub fn cost(&self) -> ResourceHand {
        use Resource::*;
        match self {
            Purchase::Road => ResourceHand::from_resources(&[Lumber, Brick]),
            Purchase::Settlement => ResourceHand::from_resources(&[Lumber, Brick, Wool, Grain]),
            Purchase::City => ResourceHand::from_resources(&[Grain, Grain, Ore, Ore, Ore]),
            Purchase::DevelopmentCard => ResourceHand::from_resources(&[Wool, Grain, Ore]),
        }
    }
}

/// How many of a resource the bank wants for one card of another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<Resource, u32>", from = "BTreeMap<Resource, u32>")]
pub struct BankRates {
    rates: [u32; 5],
}

impl Default for BankRates {
    fn default() -> Self {
        Self { rates: [4; 5] }
    }
}

impl BankRates {
    pub fn get(&self, resource: Resource) -> u32 {
        self.rates[resource.index()]
    }

    /// Lower the rates a port covers; rates never go back up.
    pub fn improve(&mut self, port: &PortRates) {
        for resource in Resource::ALL {
            if let Some(rate) = port.rate_for(resource) {
                let current = &mut self.rates[resource.index()];
                *current = (*current).min(rate);
            }
        }
    }
}

impl From<BankRates> for BTreeMap<Resource, u32> {
    fn from(rates: BankRates) -> Self {
        Resource::ALL.into_iter().map(|r| (r, rates.get(r))).collect()
    }
}

impl From<BTreeMap<Resource, u32>> for BankRates {
    fn from(map: BTreeMap<Resource, u32>) -> Self {
        let mut rates = Self::default();
        for (resource, rate) in map {
            rates.rates[resource.index()] = rate;
        }
        rates
    }
}

/// Something the player could do with their current hand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseOption {
    BankTrade {
        give: Resource,
        count: u32,
        receive: Resource,
    },
    Buy(Purchase),
}

/// Structures the log reported without the locator supplying a position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnplacedStructures {
    pub settlements: u32,
    pub cities: u32,
    pub roads: u32,
}

/// A single player's state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    /// Seat in the turn order
    pub id: PlayerId,
    /// Name as written in the log
    pub name: String,
    pub color: PlayerColor,
    pub hand: ResourceHand,
    /// Vertices of every owned building, cities included
    pub settlements: Vec<Triple>,
    /// The subset of `settlements` upgraded to cities
    pub cities: Vec<Triple>,
    pub roads: Vec<Edge>,
    pub unplaced: UnplacedStructures,
    /// Development cards in hand
    pub dev_cards: Vec<DevelopmentCard>,
    /// Development cards already played
    pub played_cards: Vec<DevelopmentCard>,
    /// Number of knights played (for Largest Army)
    pub knights: u32,
    /// Longest road through owned roads
    pub road_length: u32,
    pub has_largest_army: bool,
    pub has_longest_road: bool,
    pub vp: u32,
    pub bank_rates: BankRates,
    /// False while a bot plays for a disconnected player
    pub connected: bool,
}

impl Player {
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            color: PlayerColor::for_player(id),
            hand: ResourceHand::new(),
            settlements: Vec::new(),
            cities: Vec::new(),
            roads: Vec::new(),
            unplaced: UnplacedStructures::default(),
            dev_cards: Vec::new(),
            played_cards: Vec::new(),
            knights: 0,
            road_length: 0,
            has_largest_army: false,
            has_longest_road: false,
            vp: 0,
            bank_rates: BankRates::default(),
            connected: true,
        }
    }

    pub fn add_resources(&mut self, resources: &[Resource]) {
        for resource in resources {
            self.hand.add(*resource, 1);
        }
    }

    pub fn draw_cards(&mut self, cards: &ResourceHand) {
        self.hand.add_hand(cards);
    }

    /// Remove cards from the hand, returning whatever the hand lacked.
    pub fn remove_resources(&mut self, cards: &ResourceHand) -> ResourceHand {
        self.hand.remove_hand(cards)
    }

    pub fn add_settlement(&mut self, location: Option<Triple>) {
        match location {
            Some(triple) => self.settlements.push(triple),
            None => self.unplaced.settlements += 1,
        }
    }

    pub fn upgrade_settlement(&mut self, location: Option<Triple>) {
        match location {
            Some(triple) => self.cities.push(triple),
            None => self.unplaced.cities += 1,
        }
    }

    pub fn add_road(&mut self, location: Option<Edge>) {
        match location {
            Some(edge) => self.roads.push(edge),
            None => self.unplaced.roads += 1,
        }
    }

    pub fn total_roads(&self) -> usize {
        self.roads.len() + self.unplaced.roads as usize
    }

    /// Owning a port at a settlement improves the bank rates.
    pub fn apply_port(&mut self, port: &PortRates) {
        self.bank_rates.improve(port);
    }

    pub fn buy_dev_card(&mut self) {
        self.dev_cards.push(DevelopmentCard::Unrevealed);
    }

    /// Move a card from the hand to the played pile.
    ///
    /// Cards are bought face down, so when no revealed copy is held an
    /// unrevealed card is taken instead. Returns false when the hand had
    /// neither.
    ///
    /// A victory point card is shown, not spent: it stays in the hand and
    /// keeps counting.
    pub fn play_dev_card(&mut self, card: DevelopmentCard) -> bool {
        if card == DevelopmentCard::VictoryPoint {
            if self.dev_cards.contains(&card) || self.reveal_victory_point() {
                return true;
            }
            self.dev_cards.push(card);
            return false;
        }
        let held = self
            .dev_cards
            .iter()
            .position(|c| *c == card)
            .or_else(|| {
                self.dev_cards
                    .iter()
                    .position(|c| *c == DevelopmentCard::Unrevealed)
            });
        if let Some(index) = held {
            self.dev_cards.remove(index);
        }
        self.played_cards.push(card);
        if card == DevelopmentCard::Knight {
            self.add_knight();
        }
        held.is_some()
    }

    pub fn add_knight(&mut self) {
        self.knights += 1;
    }

    /// Turn an unrevealed card into a victory point card.
    pub fn reveal_victory_point(&mut self) -> bool {
        match self
            .dev_cards
            .iter_mut()
            .find(|c| **c == DevelopmentCard::Unrevealed)
        {
            Some(card) => {
                *card = DevelopmentCard::VictoryPoint;
                true
            }
            None => false,
        }
    }

    pub fn victory_point_cards(&self) -> u32 {
        self.dev_cards
            .iter()
            .filter(|c| matches!(c, DevelopmentCard::VictoryPoint))
            .count() as u32
    }

    /// Points from buildings: one per settlement, one more per city
    pub fn structure_points(&self) -> u32 {
        (self.settlements.len() + self.cities.len()) as u32
            + self.unplaced.settlements
            + self.unplaced.cities
    }

    /// Largest army and longest road are worth 2 each
    pub fn bonus_points(&self) -> u32 {
        2 * (self.has_largest_army as u32 + self.has_longest_road as u32)
    }

    /// Recompute and store the victory point total
    pub fn calculate_vp(&mut self) -> u32 {
        self.vp = self.structure_points() + self.victory_point_cards() + self.bonus_points();
        self.vp
    }

    /// Bank trades and purchases the current hand allows.
    pub fn purchase_options(&self, rule: Affordability) -> Vec<PurchaseOption> {
        let mut options = Vec::new();
        for (give, held) in self.hand.iter() {
            let count = self.bank_rates.get(give);
            if held >= count {
                options.extend(
                    Resource::ALL
                        .into_iter()
                        .filter(|r| *r != give)
                        .map(|receive| PurchaseOption::BankTrade { give, count, receive }),
                );
            }
        }
        options.extend(
            Purchase::ALL
                .into_iter()
                .filter(|p| self.hand.can_afford(&p.cost(), rule))
                .map(PurchaseOption::Buy),
        );
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{triples, HexCoord};
    use pretty_assertions::assert_eq;
    use Resource::*;

    #[test]
    fn test_resource_hand_total() {
        let hand = ResourceHand::from_resources(&[Ore, Lumber, Lumber]);
        assert_eq!(hand.total(), 3);
        assert_eq!(hand.get(Lumber), 2);
        assert_eq!(hand.get(Brick), 0);
    }

    #[test]
    fn test_resource_hand_remove_saturates() {
        let mut hand = ResourceHand::from_resources(&[Wool, Wool]);
        assert_eq!(hand.remove(Wool, 3), 1);
        assert_eq!(hand.get(Wool), 0);

        let mut hand = ResourceHand::from_resources(&[Ore]);
        let shortfall = hand.remove_hand(&ResourceHand::from_resources(&[Ore, Grain]));
        assert_eq!(shortfall, ResourceHand::single(Grain, 1));
        assert!(hand.is_empty());
    }

    #[test]
    fn test_resource_hand_serializes_as_map() {
        let hand = ResourceHand::from_resources(&[Ore, Lumber, Lumber]);
        let json = serde_json::to_string(&hand).unwrap();
        assert_eq!(json, r#"{"lumber":2,"ore":1}"#);
        let back: ResourceHand = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hand);
    }

    #[test]
    fn test_affordability_rules() {
        let hand = ResourceHand::from_resources(&[Lumber, Brick]);
        let road = Purchase::Road.cost();
        assert!(hand.can_afford(&road, Affordability::Inclusive));
        assert!(!hand.can_afford(&road, Affordability::Strict));
    }

    #[test]
    fn test_building_costs() {
        assert_eq!(Purchase::Road.cost().total(), 2);
        assert_eq!(Purchase::Settlement.cost().total(), 4);
        assert_eq!(Purchase::City.cost().total(), 5);
        assert_eq!(Purchase::DevelopmentCard.cost().total(), 3);
    }

    #[test]
    fn test_bank_rates_from_ports() {
        let mut rates = BankRates::default();
        assert_eq!(rates.get(Ore), 4);

        rates.improve(&PortRates::Specific(Ore));
        rates.improve(&PortRates::Generic);
        assert_eq!(rates.get(Ore), 2);
        assert_eq!(rates.get(Wool), 3);
    }

    #[test]
    fn test_purchase_options() {
        let mut player = Player::new(0, "bambee");
        player.draw_cards(&ResourceHand::from_resources(&[Ore, Ore, Ore, Ore, Lumber, Brick]));

        let options = player.purchase_options(Affordability::Inclusive);
        let trades = options
            .iter()
            .filter(|o| matches!(o, PurchaseOption::BankTrade { give: Ore, count: 4, .. }))
            .count();
        assert_eq!(trades, 4);
        assert!(options.contains(&PurchaseOption::Buy(Purchase::Road)));
        assert!(!options.contains(&PurchaseOption::Buy(Purchase::City)));

        let strict = player.purchase_options(Affordability::Strict);
        assert!(!strict.contains(&PurchaseOption::Buy(Purchase::Road)));
    }

    #[test]
    fn test_player_victory_points() {
        let mut player = Player::new(0, "Test");
        assert_eq!(player.calculate_vp(), 0);

        let t = triples(&HexCoord::ORIGIN);
        player.add_settlement(Some(t[0]));
        player.add_settlement(None);
        assert_eq!(player.calculate_vp(), 2);

        player.upgrade_settlement(Some(t[0]));
        assert_eq!(player.calculate_vp(), 3);

        player.has_longest_road = true;
        assert_eq!(player.calculate_vp(), 5);

        player.buy_dev_card();
        assert!(player.reveal_victory_point());
        assert_eq!(player.calculate_vp(), 6);
    }

    #[test]
    fn test_play_dev_card() {
        let mut player = Player::new(1, "Oakes#7878");
        player.buy_dev_card();

        assert!(player.play_dev_card(DevelopmentCard::Knight));
        assert_eq!(player.knights, 1);
        assert!(player.dev_cards.is_empty());
        assert_eq!(player.played_cards, vec![DevelopmentCard::Knight]);

        // The log is authoritative even when the hand shows no card
        assert!(!player.play_dev_card(DevelopmentCard::Monopoly));
        assert_eq!(player.played_cards.len(), 2);
    }

    #[test]
    fn test_playing_victory_point_keeps_the_point() {
        let mut player = Player::new(0, "bambee");
        player.dev_cards.push(DevelopmentCard::VictoryPoint);
        assert_eq!(player.calculate_vp(), 1);
        assert!(player.play_dev_card(DevelopmentCard::VictoryPoint));
        assert_eq!(player.calculate_vp(), 1);

        // A face-down card shown as a victory point is revealed in place
        player.buy_dev_card();
        player.dev_cards.retain(|c| *c != DevelopmentCard::VictoryPoint);
        assert_eq!(player.calculate_vp(), 0);
        assert!(player.play_dev_card(DevelopmentCard::VictoryPoint));
        assert_eq!(player.dev_cards, vec![DevelopmentCard::VictoryPoint]);
        assert_eq!(player.calculate_vp(), 1);

        // Not in the reconstructed hand: the log still earns the point
        let mut other = Player::new(1, "ZacTodd");
        assert!(!other.play_dev_card(DevelopmentCard::VictoryPoint));
        assert_eq!(other.calculate_vp(), 1);
    }

    #[test]
    fn test_dev_card_log_names() {
        for card in [
            DevelopmentCard::Knight,
            DevelopmentCard::Monopoly,
            DevelopmentCard::RoadBuilding,
            DevelopmentCard::YearOfPlenty,
        ] {
            assert_eq!(DevelopmentCard::from_log_name(card.log_name()), Some(card));
        }
        assert_eq!(DevelopmentCard::from_log_name("Knight"), None);
    }
}
