//! Board entities and the registries that hold them.
//!
//! This module contains:
//! - Resource and terrain types
//! - Hex tiles, ports, settlements and roads, keyed by their grid position
//! - One registry per entity kind, composed into `Board`
//! - Placement queries and the longest-road search
//! - Construction from the records produced by board-image extraction

use crate::hex::{
    hex_ring, hexes_from_centre, spiral_order, triples, triples_from_centre, Edge,
    GeometryError, HexCoord, Triple,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use thiserror::Error;

/// Player identifier, the player's seat in the turn order
pub type PlayerId = u8;

/// Roads a single player may own; the longest-road search relies on it.
pub const MAX_ROADS: usize = 15;

/// Number tokens of the standard board in spiral order (desert skipped).
pub const STANDARD_VALUES: [u8; 18] = [5, 2, 6, 3, 8, 10, 9, 12, 11, 4, 8, 10, 9, 4, 5, 6, 3, 11];

/// Errors raised while registering board entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("{kind} already placed at {location}")]
    Conflict { kind: &'static str, location: String },

    #[error("port text {0:?} is neither \"3:1\" nor \"<resource> 2:1\"")]
    PortFormat(String),

    #[error("no settlement at {0} to upgrade")]
    NoSettlement(Triple),

    #[error("settlement at {triple} belongs to player {owner}, not {claimant}")]
    NotOwner {
        triple: Triple,
        owner: PlayerId,
        claimant: PlayerId,
    },

    #[error("unknown terrain {0:?}")]
    UnknownTerrain(String),

    #[error("{terrain} tile at {coord} cannot carry number {value:?}")]
    InvalidValue {
        coord: HexCoord,
        terrain: String,
        value: Option<u8>,
    },

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Resource types named as they appear in the game log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Lumber,
    Brick,
    Wool,
    Grain,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Lumber,
        Resource::Brick,
        Resource::Wool,
        Resource::Grain,
        Resource::Ore,
    ];

    /// The word the log uses for this resource
    pub fn name(&self) -> &'static str {
        match self {
            Resource::Lumber => "lumber",
            Resource::Brick => "brick",
            Resource::Wool => "wool",
            Resource::Grain => "grain",
            Resource::Ore => "ore",
        }
    }

    /// Exact, case-sensitive lookup by log word
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a hex tile is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Terrain {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    Desert,
    /// Surrounds the playable area; may carry a port
    Sea,
}

impl Terrain {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "desert" => Some(Terrain::Desert),
            "sea" => Some(Terrain::Sea),
            other => Resource::from_name(other).map(Terrain::Resource),
        }
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hex {
    pub coord: HexCoord,
    pub terrain: Terrain,
    /// Dice number that triggers production (2-12, None for desert/sea)
    pub value: Option<u8>,
    /// Where extraction found the tile on screen
    pub pixel: Option<(f64, f64)>,
    /// Whether the robber is currently on this tile
    pub blocked: bool,
}

impl Hex {
    pub fn new(coord: HexCoord, terrain: Terrain, value: Option<u8>) -> Self {
        Self {
            coord,
            terrain,
            value,
            pixel: None,
            blocked: false,
        }
    }

    pub fn with_pixel(mut self, x: f64, y: f64) -> Self {
        self.pixel = Some((x, y));
        self
    }

    /// Get the resource this tile produces, if any
    pub fn resource(&self) -> Option<Resource> {
        match self.terrain {
            Terrain::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn is_land(&self) -> bool {
        !matches!(self.terrain, Terrain::Sea)
    }

    pub fn vertices(&self) -> [Triple; 6] {
        triples(&self.coord)
    }

    pub fn edges(&self) -> [Edge; 6] {
        crate::hex::neighbours(&self.coord).map(|n| {
            Edge::new(self.coord, n).expect("neighbours are always adjacent")
        })
    }
}

/// Port trading bonuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortRates {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl PortRates {
    /// Read the rates from the text printed on the port.
    pub fn parse(text: &str) -> Result<Self, BoardError> {
        if text.contains("3:1") {
            return Ok(PortRates::Generic);
        }
        if text.contains("2:1") {
            if let Some(resource) = Resource::ALL.into_iter().find(|r| text.contains(r.name())) {
                return Ok(PortRates::Specific(resource));
            }
        }
        Err(BoardError::PortFormat(text.to_string()))
    }

    /// The rate this port offers for `resource`, if it covers it
    pub fn rate_for(&self, resource: Resource) -> Option<u32> {
        match self {
            PortRates::Generic => Some(3),
            PortRates::Specific(r) if *r == resource => Some(2),
            PortRates::Specific(_) => None,
        }
    }
}

/// A port on the edge between a sea tile and a land tile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub sea: HexCoord,
    pub land: HexCoord,
    /// The two vertices a settlement can use the port from
    pub triples: [Triple; 2],
    pub rates: PortRates,
    pub text: String,
}

impl Port {
    pub fn new(sea: HexCoord, land: HexCoord, text: &str) -> Result<Self, BoardError> {
        let triples = Edge::new(sea, land)?.triples();
        let rates = PortRates::parse(text)?;
        Ok(Self {
            sea,
            land,
            triples,
            rates,
            text: text.to_string(),
        })
    }
}

/// A settlement or city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub triple: Triple,
    pub owner: PlayerId,
    pub is_city: bool,
    /// The port this settlement sits on, if any
    pub port: Option<Port>,
}

impl Settlement {
    /// Victory points provided by this building
    pub fn victory_points(&self) -> u32 {
        if self.is_city {
            2
        } else {
            1
        }
    }

    /// One-way upgrade to a city
    pub fn upgrade(&mut self) {
        self.is_city = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub edge: Edge,
    pub owner: PlayerId,
}

// ==================== Registries ====================

#[derive(Debug, Clone, Default)]
pub struct HexRegistry {
    hexes: HashMap<HexCoord, Hex>,
}

impl HexRegistry {
    pub fn insert(&mut self, hex: Hex) -> Result<(), BoardError> {
        if self.hexes.contains_key(&hex.coord) {
            return Err(BoardError::Conflict {
                kind: "hex",
                location: hex.coord.to_string(),
            });
        }
        self.hexes.insert(hex.coord, hex);
        Ok(())
    }

    pub fn get(&self, coord: &HexCoord) -> Option<&Hex> {
        self.hexes.get(coord)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Hex> {
        self.hexes.values()
    }

    pub fn len(&self) -> usize {
        self.hexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hexes.is_empty()
    }
}

/// Ports, reachable from either of their two vertices.
#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: Vec<Port>,
    by_triple: HashMap<Triple, usize>,
}

impl PortRegistry {
    pub fn insert(&mut self, port: Port) -> Result<(), BoardError> {
        if let Some(taken) = port.triples.iter().find(|t| self.by_triple.contains_key(t)) {
            return Err(BoardError::Conflict {
                kind: "port",
                location: taken.to_string(),
            });
        }
        let index = self.ports.len();
        for triple in port.triples {
            self.by_triple.insert(triple, index);
        }
        self.ports.push(port);
        Ok(())
    }

    pub fn get(&self, triple: &Triple) -> Option<&Port> {
        self.by_triple.get(triple).map(|&i| &self.ports[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettlementRegistry {
    settlements: HashMap<Triple, Settlement>,
}

impl SettlementRegistry {
    pub fn insert(&mut self, settlement: Settlement) -> Result<(), BoardError> {
        if self.settlements.contains_key(&settlement.triple) {
            return Err(BoardError::Conflict {
                kind: "settlement",
                location: settlement.triple.to_string(),
            });
        }
        self.settlements.insert(settlement.triple, settlement);
        Ok(())
    }

    pub fn get(&self, triple: &Triple) -> Option<&Settlement> {
        self.settlements.get(triple)
    }

    fn get_mut(&mut self, triple: &Triple) -> Option<&mut Settlement> {
        self.settlements.get_mut(triple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Settlement> {
        self.settlements.values()
    }

    pub fn len(&self) -> usize {
        self.settlements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settlements.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RoadRegistry {
    roads: HashMap<Edge, Road>,
}

impl RoadRegistry {
    pub fn insert(&mut self, road: Road) -> Result<(), BoardError> {
        if self.roads.contains_key(&road.edge) {
            return Err(BoardError::Conflict {
                kind: "road",
                location: road.edge.to_string(),
            });
        }
        self.roads.insert(road.edge, road);
        Ok(())
    }

    pub fn get(&self, edge: &Edge) -> Option<&Road> {
        self.roads.get(edge)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Road> {
        self.roads.values()
    }

    pub fn len(&self) -> usize {
        self.roads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty()
    }
}

// ==================== Board ====================

/// A hex tile as delivered by board-image extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HexRecord {
    /// Cube coordinate (q, r, s)
    pub cube: [i32; 3],
    /// "lumber", "brick", "wool", "grain", "ore", "desert" or "sea"
    pub terrain: String,
    #[serde(default)]
    pub value: Option<u8>,
    #[serde(default)]
    pub pixel: Option<(f64, f64)>,
}

/// A port as delivered by board-image extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub sea: [i32; 3],
    pub land: [i32; 3],
    pub text: String,
}

/// Everything extraction knows about the board before the log starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoardRecords {
    #[serde(default)]
    pub hexes: Vec<HexRecord>,
    #[serde(default)]
    pub ports: Vec<PortRecord>,
}

fn cube([q, r, s]: [i32; 3]) -> Result<HexCoord, BoardError> {
    Ok(HexCoord::cube(q, r, s)?)
}

/// The complete game board
#[derive(Debug, Clone, Default)]
pub struct Board {
    pub hexes: HexRegistry,
    pub ports: PortRegistry,
    pub settlements: SettlementRegistry,
    pub roads: RoadRegistry,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a board from extracted hex and port records.
    pub fn from_records(records: &BoardRecords) -> Result<Self, BoardError> {
        let mut board = Self::new();
        let mut hexes = Vec::with_capacity(records.hexes.len());
        for record in &records.hexes {
            let terrain = Terrain::from_name(&record.terrain)
                .ok_or_else(|| BoardError::UnknownTerrain(record.terrain.clone()))?;
            let coord = cube(record.cube)?;
            let valid = match (terrain, record.value) {
                (Terrain::Resource(_), value) => value.map_or(true, |v| (2..=12).contains(&v)),
                (Terrain::Desert | Terrain::Sea, value) => value.is_none(),
            };
            if !valid {
                return Err(BoardError::InvalidValue {
                    coord,
                    terrain: record.terrain.clone(),
                    value: record.value,
                });
            }
            let mut hex = Hex::new(coord, terrain, record.value);
            hex.pixel = record.pixel;
            hexes.push(hex);
        }
        board.set_hexes(hexes)?;
        for record in &records.ports {
            board.place_port(Port::new(cube(record.sea)?, cube(record.land)?, &record.text)?)?;
        }
        Ok(board)
    }

    /// The standard 19-tile layout with shuffled terrain.
    ///
    /// Number tokens follow the fixed spiral sequence, skipping the desert,
    /// which starts with the robber on it.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let mut terrain: Vec<Terrain> = Vec::with_capacity(19);
        for _ in 0..4 {
            terrain.push(Terrain::Resource(Resource::Lumber));
            terrain.push(Terrain::Resource(Resource::Wool));
            terrain.push(Terrain::Resource(Resource::Grain));
        }
        for _ in 0..3 {
            terrain.push(Terrain::Resource(Resource::Brick));
            terrain.push(Terrain::Resource(Resource::Ore));
        }
        terrain.push(Terrain::Desert);
        terrain.shuffle(rng);

        let mut values = STANDARD_VALUES.into_iter();
        let mut board = Self::new();
        for (coord, terrain) in spiral_order(hexes_from_centre(2)).into_iter().zip(terrain) {
            let mut hex = match terrain {
                Terrain::Desert => Hex::new(coord, terrain, None),
                _ => Hex::new(coord, terrain, values.next()),
            };
            hex.blocked = terrain == Terrain::Desert;
            board
                .hexes
                .insert(hex)
                .expect("spiral order visits each coordinate once");
        }
        for coord in hex_ring(3) {
            board
                .hexes
                .insert(Hex::new(coord, Terrain::Sea, None))
                .expect("sea ring is disjoint from land");
        }
        board
    }

    pub fn place_hex(&mut self, hex: Hex) -> Result<(), BoardError> {
        self.hexes.insert(hex)
    }

    pub fn set_hexes(&mut self, hexes: impl IntoIterator<Item = Hex>) -> Result<(), BoardError> {
        for hex in hexes {
            self.place_hex(hex)?;
        }
        Ok(())
    }

    pub fn place_port(&mut self, port: Port) -> Result<(), BoardError> {
        self.ports.insert(port)
    }

    pub fn get_hex(&self, coord: &HexCoord) -> Option<&Hex> {
        self.hexes.get(coord)
    }

    pub fn get_settlement(&self, triple: &Triple) -> Option<&Settlement> {
        self.settlements.get(triple)
    }

    pub fn get_road(&self, edge: &Edge) -> Option<&Road> {
        self.roads.get(edge)
    }

    /// Place a settlement, picking up any port at its vertex.
    pub fn place_settlement(
        &mut self,
        triple: Triple,
        owner: PlayerId,
    ) -> Result<&Settlement, BoardError> {
        let settlement = Settlement {
            triple,
            owner,
            is_city: false,
            port: self.ports.get(&triple).cloned(),
        };
        self.settlements.insert(settlement)?;
        self.settlements
            .get(&triple)
            .ok_or(BoardError::NoSettlement(triple))
    }

    /// Upgrade `owner`'s settlement to a city
    pub fn upgrade_settlement(
        &mut self,
        triple: Triple,
        owner: PlayerId,
    ) -> Result<&Settlement, BoardError> {
        let settlement = self
            .settlements
            .get_mut(&triple)
            .ok_or(BoardError::NoSettlement(triple))?;
        if settlement.owner != owner {
            return Err(BoardError::NotOwner {
                triple,
                owner: settlement.owner,
                claimant: owner,
            });
        }
        if settlement.is_city {
            return Err(BoardError::Conflict {
                kind: "city",
                location: triple.to_string(),
            });
        }
        settlement.upgrade();
        Ok(settlement)
    }

    pub fn place_road(&mut self, edge: Edge, owner: PlayerId) -> Result<&Road, BoardError> {
        self.roads.insert(Road { edge, owner })?;
        self.roads.get(&edge).ok_or(BoardError::Conflict {
            kind: "road",
            location: edge.to_string(),
        })
    }

    /// Move the robber onto every land tile carrying number `value`.
    ///
    /// The log names the target tile only by its number token, so when two
    /// tiles share the number both are flagged. Returns the flagged tiles.
    pub fn move_robber(&mut self, value: u8) -> Vec<HexCoord> {
        let mut blocked = Vec::new();
        for hex in self.hexes.hexes.values_mut() {
            hex.blocked = hex.is_land() && hex.value == Some(value);
            if hex.blocked {
                blocked.push(hex.coord);
            }
        }
        blocked.sort();
        blocked
    }

    /// Tiles the robber currently sits on
    pub fn robber_location(&self) -> Vec<HexCoord> {
        let mut blocked: Vec<HexCoord> = self
            .hexes
            .iter()
            .filter(|h| h.blocked)
            .map(|h| h.coord)
            .collect();
        blocked.sort();
        blocked
    }

    pub fn placed_roads(&self) -> HashSet<Edge> {
        self.roads.iter().map(|r| r.edge).collect()
    }

    pub fn placed_settlements(&self) -> HashSet<Triple> {
        self.settlements.iter().map(|s| s.triple).collect()
    }

    pub fn roads_of(&self, owner: PlayerId) -> Vec<Edge> {
        self.roads
            .iter()
            .filter(|r| r.owner == owner)
            .map(|r| r.edge)
            .collect()
    }

    pub fn settlements_of(&self, owner: PlayerId) -> Vec<&Settlement> {
        self.settlements.iter().filter(|s| s.owner == owner).collect()
    }

    /// Vertices holding a building that is not `owner`'s
    pub fn opponent_settlements(&self, owner: PlayerId) -> HashSet<Triple> {
        self.settlements
            .iter()
            .filter(|s| s.owner != owner)
            .map(|s| s.triple)
            .collect()
    }

    // ==================== Resource Distribution ====================

    /// Calculate resources produced for a dice roll
    pub fn yields_for_roll(&self, roll: u8) -> HashMap<PlayerId, HashMap<Resource, u32>> {
        let mut distribution: HashMap<PlayerId, HashMap<Resource, u32>> = HashMap::new();

        for hex in self.hexes.iter() {
            if hex.value != Some(roll) || hex.blocked {
                continue;
            }
            let Some(resource) = hex.resource() else {
                continue;
            };

            for vertex in hex.vertices() {
                if let Some(settlement) = self.settlements.get(&vertex) {
                    *distribution
                        .entry(settlement.owner)
                        .or_default()
                        .entry(resource)
                        .or_insert(0) += settlement.victory_points();
                }
            }
        }

        distribution
    }
}

// ==================== Placement Queries ====================

/// Empty edges touching the end of an owned road.
pub fn potential_road_edges(owned_roads: &[Edge], placed_roads: &HashSet<Edge>) -> HashSet<Edge> {
    owned_roads
        .iter()
        .flat_map(Edge::neighbours)
        .filter(|e| !placed_roads.contains(e))
        .collect()
}

/// Vertices a settlement may not go on: occupied ones and their neighbours.
pub fn restricted_settlement_triples(placed_settlements: &HashSet<Triple>) -> HashSet<Triple> {
    placed_settlements
        .iter()
        .flat_map(|t| std::iter::once(*t).chain(t.neighbours()))
        .collect()
}

/// Vertices at the end of an owned road that satisfy the distance rule.
pub fn potential_settlement_triples(
    owned_roads: &[Edge],
    placed_settlements: &HashSet<Triple>,
) -> HashSet<Triple> {
    let restricted = restricted_settlement_triples(placed_settlements);
    owned_roads
        .iter()
        .flat_map(Edge::triples)
        .filter(|t| !restricted.contains(t))
        .collect()
}

/// Owned settlements that are not yet cities.
pub fn potential_settlement_upgrades<'a>(
    owned_settlements: impl IntoIterator<Item = &'a Settlement>,
) -> HashSet<Triple> {
    owned_settlements
        .into_iter()
        .filter(|s| !s.is_city)
        .map(|s| s.triple)
        .collect()
}

/// Opening placements: any land vertex satisfying the distance rule, with no
/// road connection required.
pub fn placement_phase_settlement_triples(placed_settlements: &HashSet<Triple>) -> HashSet<Triple> {
    let restricted = restricted_settlement_triples(placed_settlements);
    triples_from_centre(3)
        .into_iter()
        .filter(|t| !restricted.contains(t))
        .collect()
}

// ==================== Longest Road Calculation ====================

/// Length, in roads, of the longest path through `owned_roads`.
///
/// A path enters each road through one end and leaves through the other, so
/// a junction of three roads contributes two of them, never all three.
///
/// The search enumerates every simple path, which is only affordable because
/// a player owns at most [`MAX_ROADS`] roads and each vertex has degree ≤ 3.
/// Do not call it on unbounded road sets.
pub fn longest_road(owned_roads: &[Edge]) -> u32 {
    longest_road_avoiding(owned_roads, &HashSet::new())
}

/// Like [`longest_road`], but a path may end at, and not pass through, any
/// vertex in `blockers` (an opponent's building).
pub fn longest_road_avoiding(owned_roads: &[Edge], blockers: &HashSet<Triple>) -> u32 {
    debug_assert!(
        owned_roads.len() <= MAX_ROADS,
        "longest road search is exponential beyond {MAX_ROADS} roads"
    );
    let roads: HashSet<Edge> = owned_roads.iter().copied().collect();
    let mut visited = HashSet::new();
    let mut longest = 0;

    for road in &roads {
        for entry in road.triples() {
            longest = longest.max(dfs_road_length(&roads, blockers, *road, entry, &mut visited));
        }
    }

    longest
}

/// DFS to find the longest path continuing from `current`, entered at `entry`
fn dfs_road_length(
    roads: &HashSet<Edge>,
    blockers: &HashSet<Triple>,
    current: Edge,
    entry: Triple,
    visited: &mut HashSet<Edge>,
) -> u32 {
    visited.insert(current);

    let [a, b] = current.triples();
    let exit = if a == entry { b } else { a };
    let mut max_continuation = 0;

    if !blockers.contains(&exit) {
        for next in exit.edges() {
            if next != current && roads.contains(&next) && !visited.contains(&next) {
                let continuation = dfs_road_length(roads, blockers, next, exit, visited);
                max_continuation = max_continuation.max(continuation);
            }
        }
    }

    visited.remove(&current);
    1 + max_continuation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hex::{hex_ring, neighbours};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn edge(a: (i32, i32), b: (i32, i32)) -> Edge {
        Edge::new(HexCoord::new(a.0, a.1), HexCoord::new(b.0, b.1)).unwrap()
    }

    /// The six edges around the centre tile, walking one vertex to the next.
    fn ring_path() -> Vec<Edge> {
        neighbours(&HexCoord::ORIGIN)
            .map(|n| Edge::new(HexCoord::ORIGIN, n).unwrap())
            .to_vec()
    }

    #[test]
    fn test_random_board_layout() {
        let mut rng = StdRng::seed_from_u64(7);
        let board = Board::random(&mut rng);
        let land: Vec<&Hex> = board.hexes.iter().filter(|h| h.is_land()).collect();
        assert_eq!(land.len(), 19);
        assert_eq!(board.hexes.len(), 19 + 18);

        let deserts: Vec<&&Hex> = land.iter().filter(|h| h.terrain == Terrain::Desert).collect();
        assert_eq!(deserts.len(), 1);
        assert_eq!(deserts[0].value, None);
        assert!(deserts[0].blocked);
        assert_eq!(board.robber_location(), vec![deserts[0].coord]);

        let mut values: Vec<u8> = land.iter().filter_map(|h| h.value).collect();
        values.sort();
        let mut expected = STANDARD_VALUES.to_vec();
        expected.sort();
        assert_eq!(values, expected);
    }

    #[test]
    fn test_port_rates_from_text() {
        assert_eq!(PortRates::parse("3:1 ?").unwrap(), PortRates::Generic);
        assert_eq!(
            PortRates::parse("ore\n2:1").unwrap(),
            PortRates::Specific(Resource::Ore)
        );
        assert_eq!(
            PortRates::parse("2:1"),
            Err(BoardError::PortFormat("2:1".to_string()))
        );
        assert!(PortRates::parse("wool 4:1").is_err());
    }

    #[test]
    fn test_port_triples_resolve_to_same_port() {
        let sea = hex_ring(3)[0];
        let land = neighbours(&sea).into_iter().find(|n| n.ring() == 2).unwrap();
        let mut board = Board::new();
        board.place_port(Port::new(sea, land, "3:1").unwrap()).unwrap();

        let port = Port::new(sea, land, "3:1").unwrap();
        assert_eq!(board.ports.get(&port.triples[0]), board.ports.get(&port.triples[1]));
        assert!(board.ports.get(&port.triples[0]).is_some());

        // Second port on the same vertices conflicts
        assert!(matches!(
            board.place_port(port),
            Err(BoardError::Conflict { kind: "port", .. })
        ));
    }

    #[test]
    fn test_port_requires_adjacent_tiles() {
        let result = Port::new(HexCoord::new(3, 0), HexCoord::new(0, 0), "3:1");
        assert!(matches!(result, Err(BoardError::Geometry(_))));
    }

    #[test]
    fn test_settlement_conflict_and_upgrade() {
        let mut board = Board::new();
        let t = triples(&HexCoord::ORIGIN)[0];
        board.place_settlement(t, 0).unwrap();
        assert!(matches!(
            board.place_settlement(t, 1),
            Err(BoardError::Conflict { kind: "settlement", .. })
        ));

        assert_eq!(
            board.upgrade_settlement(t, 1),
            Err(BoardError::NotOwner { triple: t, owner: 0, claimant: 1 })
        );
        assert!(!board.get_settlement(&t).unwrap().is_city);

        assert!(board.upgrade_settlement(t, 0).unwrap().is_city);
        assert!(matches!(
            board.upgrade_settlement(t, 0),
            Err(BoardError::Conflict { kind: "city", .. })
        ));

        let other = triples(&HexCoord::ORIGIN)[3];
        assert_eq!(board.upgrade_settlement(other, 0), Err(BoardError::NoSettlement(other)));
    }

    #[test]
    fn test_settlement_picks_up_port() {
        let sea = HexCoord::new(0, -3);
        let land = HexCoord::new(0, -2);
        let mut board = Board::new();
        let port = Port::new(sea, land, "brick 2:1").unwrap();
        let on_port = port.triples[1];
        board.place_port(port).unwrap();

        let settlement = board.place_settlement(on_port, 2).unwrap();
        assert_eq!(
            settlement.port.as_ref().map(|p| p.rates),
            Some(PortRates::Specific(Resource::Brick))
        );
    }

    #[test]
    fn test_road_conflict() {
        let mut board = Board::new();
        let e = edge((0, 0), (1, 0));
        board.place_road(e, 0).unwrap();
        assert!(board.place_road(e, 1).is_err());
        assert_eq!(board.roads_of(0), vec![e]);
        assert!(board.roads_of(1).is_empty());
    }

    #[test]
    fn test_from_records() {
        let records = BoardRecords {
            hexes: vec![
                HexRecord {
                    cube: [0, 0, 0],
                    terrain: "ore".into(),
                    value: Some(8),
                    pixel: Some((400.0, 300.0)),
                },
                HexRecord {
                    cube: [0, -1, 1],
                    terrain: "desert".into(),
                    value: None,
                    pixel: None,
                },
            ],
            ports: vec![PortRecord {
                sea: [0, -3, 3],
                land: [0, -2, 2],
                text: "3:1".into(),
            }],
        };
        let board = Board::from_records(&records).unwrap();
        let centre = board.get_hex(&HexCoord::ORIGIN).unwrap();
        assert_eq!(centre.resource(), Some(Resource::Ore));
        assert_eq!(centre.pixel, Some((400.0, 300.0)));
        assert_eq!(board.ports.len(), 1);

        let mut bad = records.clone();
        bad.hexes[1].cube = [0, -1, 0];
        assert!(matches!(
            Board::from_records(&bad),
            Err(BoardError::Geometry(GeometryError::NotOnPlane { .. }))
        ));

        let mut swamp = records;
        swamp.hexes[1].terrain = "swamp".into();
        assert_eq!(
            Board::from_records(&swamp).unwrap_err(),
            BoardError::UnknownTerrain("swamp".into())
        );
    }

    #[test]
    fn test_from_records_checks_number_tokens() {
        let record = |terrain: &str, value| HexRecord {
            cube: [0, 0, 0],
            terrain: terrain.into(),
            value,
            pixel: None,
        };
        let board = |hex| BoardRecords {
            hexes: vec![hex],
            ports: Vec::new(),
        };

        assert!(Board::from_records(&board(record("wool", Some(12)))).is_ok());
        assert!(Board::from_records(&board(record("wool", None))).is_ok());
        assert_eq!(
            Board::from_records(&board(record("wool", Some(13)))).unwrap_err(),
            BoardError::InvalidValue {
                coord: HexCoord::ORIGIN,
                terrain: "wool".into(),
                value: Some(13),
            }
        );
        assert!(matches!(
            Board::from_records(&board(record("ore", Some(1)))),
            Err(BoardError::InvalidValue { .. })
        ));
        assert!(matches!(
            Board::from_records(&board(record("desert", Some(7)))),
            Err(BoardError::InvalidValue { .. })
        ));
        assert!(matches!(
            Board::from_records(&board(record("sea", Some(4)))),
            Err(BoardError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_robber_blocks_production() {
        let mut board = Board::new();
        board
            .place_hex(Hex::new(HexCoord::ORIGIN, Terrain::Resource(Resource::Grain), Some(6)))
            .unwrap();
        let t = triples(&HexCoord::ORIGIN)[0];
        board.place_settlement(t, 1).unwrap();
        board.upgrade_settlement(t, 1).unwrap();

        let yields = board.yields_for_roll(6);
        assert_eq!(yields[&1][&Resource::Grain], 2);

        assert_eq!(board.move_robber(6), vec![HexCoord::ORIGIN]);
        assert!(board.yields_for_roll(6).is_empty());
        assert!(board.move_robber(9).is_empty());
        assert!(!board.get_hex(&HexCoord::ORIGIN).unwrap().blocked);
    }

    #[test]
    fn test_potential_road_edges() {
        let owned = vec![edge((0, 0), (1, 0))];
        let mut placed: HashSet<Edge> = owned.iter().copied().collect();
        assert_eq!(potential_road_edges(&owned, &placed).len(), 4);

        let taken = owned[0].neighbours()[0];
        placed.insert(taken);
        let options = potential_road_edges(&owned, &placed);
        assert_eq!(options.len(), 3);
        assert!(!options.contains(&taken));
    }

    #[test]
    fn test_distance_rule() {
        let road = edge((0, 0), (1, 0));
        let [near, far] = road.triples();
        let placed: HashSet<Triple> = [near].into_iter().collect();

        // `far` is one edge from `near`, so neither end of the road is available
        let options = potential_settlement_triples(&[road], &placed);
        assert!(options.is_empty(), "{far} should be restricted");

        let restricted = restricted_settlement_triples(&placed);
        assert_eq!(restricted.len(), 4);
    }

    #[test]
    fn test_placement_phase_triples() {
        assert_eq!(placement_phase_settlement_triples(&HashSet::new()).len(), 54);

        let placed: HashSet<Triple> = [triples(&HexCoord::ORIGIN)[0]].into_iter().collect();
        assert_eq!(placement_phase_settlement_triples(&placed).len(), 50);
    }

    #[test]
    fn test_potential_upgrades() {
        let t = triples(&HexCoord::ORIGIN);
        let settlements = [
            Settlement { triple: t[0], owner: 0, is_city: false, port: None },
            Settlement { triple: t[3], owner: 0, is_city: true, port: None },
        ];
        let upgrades = potential_settlement_upgrades(&settlements);
        assert_eq!(upgrades, [t[0]].into_iter().collect());
    }

    #[test]
    fn test_longest_road_single_road() {
        assert_eq!(longest_road(&[edge((0, 0), (1, 0))]), 1);
        assert_eq!(longest_road(&[]), 0);
    }

    #[test]
    fn test_longest_road_chain() {
        let ring = ring_path();
        for k in 1..=5 {
            assert_eq!(longest_road(&ring[..k]), k as u32, "path of {k} roads");
        }
        // Closing the loop around the tile
        assert_eq!(longest_road(&ring), 6);
    }

    #[test]
    fn test_longest_road_star() {
        let centre = triples(&HexCoord::ORIGIN)[0];
        let star = centre.edges().to_vec();
        assert_eq!(longest_road(&star), 2);

        // Extending one branch beyond the junction
        let branch = star[0];
        let [a, b] = branch.triples();
        let outer = if a == centre { b } else { a };
        let extension = outer.edges().into_iter().find(|e| *e != branch).unwrap();
        let mut extended = star.clone();
        extended.push(extension);
        assert_eq!(longest_road(&extended), 3);
    }

    #[test]
    fn test_longest_road_broken_by_opponent() {
        let ring = ring_path();
        let path = &ring[..4];
        // The vertex shared by the second and third roads
        let junction = path[1]
            .triples()
            .into_iter()
            .find(|t| path[2].triples().contains(t))
            .unwrap();
        let blockers: HashSet<Triple> = [junction].into_iter().collect();
        assert_eq!(longest_road_avoiding(path, &blockers), 2);
    }
}
