//! Where did that build go?
//!
//! The log says *that* a player built something, never *where*. The position
//! comes from whoever watches the board (image extraction, a recorded
//! fixture). `Locator` is that seam.

use crate::hex::{Edge, Triple};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

pub trait Locator {
    /// Position of the settlement `player` just placed
    fn settlement(&mut self, player: &str) -> Option<Triple>;

    /// Position of the settlement `player` just upgraded
    fn city(&mut self, player: &str) -> Option<Triple>;

    /// Position of the road `player` just placed
    fn road(&mut self, player: &str) -> Option<Edge>;
}

/// Knows nothing; every build is recorded as unplaced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocator;

impl Locator for NoLocator {
    fn settlement(&mut self, _player: &str) -> Option<Triple> {
        None
    }

    fn city(&mut self, _player: &str) -> Option<Triple> {
        None
    }

    fn road(&mut self, _player: &str) -> Option<Edge> {
        None
    }
}

/// Hands out recorded positions per player, in build order.
///
/// ```json
/// {
///   "settlements": { "bambee": [[[0,0,0],[1,-1,0],[1,0,-1]]] },
///   "roads": { "bambee": [[[0,0,0],[1,0,-1]]] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptedLocator {
    pub settlements: HashMap<String, VecDeque<Triple>>,
    pub cities: HashMap<String, VecDeque<Triple>>,
    pub roads: HashMap<String, VecDeque<Edge>>,
}

impl ScriptedLocator {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn push_settlement(&mut self, player: &str, triple: Triple) {
        self.settlements.entry(player.to_string()).or_default().push_back(triple);
    }

    pub fn push_city(&mut self, player: &str, triple: Triple) {
        self.cities.entry(player.to_string()).or_default().push_back(triple);
    }

    pub fn push_road(&mut self, player: &str, edge: Edge) {
        self.roads.entry(player.to_string()).or_default().push_back(edge);
    }

    /// Positions not yet handed out
    pub fn remaining(&self) -> usize {
        self.settlements.values().map(VecDeque::len).sum::<usize>()
            + self.cities.values().map(VecDeque::len).sum::<usize>()
            + self.roads.values().map(VecDeque::len).sum::<usize>()
    }
}

impl Locator for ScriptedLocator {
    fn settlement(&mut self, player: &str) -> Option<Triple> {
        self.settlements.get_mut(player)?.pop_front()
    }

    fn city(&mut self, player: &str) -> Option<Triple> {
        self.cities.get_mut(player)?.pop_front()
    }

    fn road(&mut self, player: &str) -> Option<Edge> {
        self.roads.get_mut(player)?.pop_front()
    }
}

impl<L: Locator + ?Sized> Locator for &mut L {
    fn settlement(&mut self, player: &str) -> Option<Triple> {
        (**self).settlement(player)
    }

    fn city(&mut self, player: &str) -> Option<Triple> {
        (**self).city(player)
    }

    fn road(&mut self, player: &str) -> Option<Edge> {
        (**self).road(player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::HexCoord;

    #[test]
    fn test_scripted_locator_from_json() {
        let json = r#"{
            "settlements": { "bambee": [[[0, 0, 0], [1, -1, 0], [1, 0, -1]]] },
            "roads": { "bambee": [[[0, 0, 0], [1, 0, -1]], [[1, 0, -1], [0, 0, 0]]] }
        }"#;
        let mut locator = ScriptedLocator::from_json(json).unwrap();
        assert_eq!(locator.remaining(), 3);

        let settlement = locator.settlement("bambee").unwrap();
        assert!(settlement.contains(&HexCoord::new(1, -1)));
        assert_eq!(locator.settlement("bambee"), None);
        assert_eq!(locator.city("bambee"), None);

        // Both spellings of the same edge normalize to one key
        assert_eq!(locator.road("bambee"), locator.road("bambee"));
        assert_eq!(locator.road("ZacTodd"), None);
        assert_eq!(locator.remaining(), 0);
    }

    #[test]
    fn test_invalid_positions_are_rejected() {
        let json = r#"{ "roads": { "bambee": [[[0, 0, 0], [2, 0, -2]]] } }"#;
        assert!(ScriptedLocator::from_json(json).is_err());
    }

    #[test]
    fn test_no_locator() {
        let mut locator = NoLocator;
        assert_eq!(locator.road("bambee"), None);
    }
}
