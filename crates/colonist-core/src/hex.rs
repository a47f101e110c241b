//! Hex coordinate system using cube coordinates (q, r, s).
//!
//! This module provides the geometry every other module is keyed by:
//! - `HexCoord`: identifies an individual hex tile
//! - `Triple`: a vertex, named by the three tiles meeting there
//! - `Edge`: a side, named by the two tiles sharing it
//!
//! Vertices and edges are identified by the tiles around them rather than by
//! a direction from an owning tile. Both are stored sorted, so equality and
//! hashing work by value without any canonicalization pass.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Errors raised by adjacency-dependent geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("hexes {0} and {1} are not adjacent")]
    NotAdjacent(HexCoord, HexCoord),

    #[error("cube coordinate ({q}, {r}, {s}) does not satisfy q + r + s = 0")]
    NotOnPlane { q: i32, r: i32, s: i32 },

    #[error("hexes {0}, {1} and {2} do not meet at a single vertex")]
    NotATriple(HexCoord, HexCoord, HexCoord),
}

/// Unit offsets to the six neighbours, in ring order starting from East.
///
/// Consecutive entries (wrapping) are adjacent to each other, which is what
/// lets `triples` pair them up into corners.
const DIRECTIONS: [(i32, i32); 6] = [
    (1, 0),  // East
    (1, -1), // NorthEast
    (0, -1), // NorthWest
    (-1, 0), // West
    (-1, 1), // SouthWest
    (0, 1),  // SouthEast
];

/// Cube coordinate for a hex tile.
///
/// Only `q` and `r` are stored; `s` is always `-q - r`, so the cube invariant
/// q + r + s = 0 cannot be broken once a value exists.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(try_from = "[i32; 3]", into = "[i32; 3]")]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// The centre of the board.
    pub const ORIGIN: HexCoord = HexCoord::new(0, 0);

    /// Create a coordinate from its axial components.
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Create a coordinate from all three cube components.
    pub fn cube(q: i32, r: i32, s: i32) -> Result<Self, GeometryError> {
        if q + r + s != 0 {
            return Err(GeometryError::NotOnPlane { q, r, s });
        }
        Ok(Self::new(q, r))
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// All three cube components.
    pub const fn components(&self) -> [i32; 3] {
        [self.q, self.r, self.s()]
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// Distance from the board centre.
    pub fn ring(&self) -> u32 {
        self.distance_to(&Self::ORIGIN)
    }

    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.distance_to(other) == 1
    }

    fn offset(&self, (dq, dr): (i32, i32), scale: i32) -> HexCoord {
        HexCoord::new(self.q + dq * scale, self.r + dr * scale)
    }
}

impl TryFrom<[i32; 3]> for HexCoord {
    type Error = GeometryError;

    fn try_from([q, r, s]: [i32; 3]) -> Result<Self, Self::Error> {
        Self::cube(q, r, s)
    }
}

impl From<HexCoord> for [i32; 3] {
    fn from(hex: HexCoord) -> Self {
        hex.components()
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.q, self.r, self.s())
    }
}

/// A vertex of the grid: three mutually adjacent hexes.
///
/// Settlements and cities are built on triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[HexCoord; 3]", into = "[HexCoord; 3]")]
pub struct Triple([HexCoord; 3]);

impl Triple {
    /// Create a triple, checking that the hexes really meet at one corner.
    pub fn new(a: HexCoord, b: HexCoord, c: HexCoord) -> Result<Self, GeometryError> {
        if a.is_adjacent(&b) && a.is_adjacent(&c) && b.is_adjacent(&c) {
            Ok(Self::sorted(a, b, c))
        } else {
            Err(GeometryError::NotATriple(a, b, c))
        }
    }

    fn sorted(a: HexCoord, b: HexCoord, c: HexCoord) -> Self {
        let mut hexes = [a, b, c];
        hexes.sort();
        Self(hexes)
    }

    /// The three hexes meeting at this vertex, in sorted order.
    pub fn hexes(&self) -> [HexCoord; 3] {
        self.0
    }

    pub fn contains(&self, hex: &HexCoord) -> bool {
        self.0.contains(hex)
    }

    /// The three edges that meet at this vertex.
    pub fn edges(&self) -> [Edge; 3] {
        let [a, b, c] = self.0;
        [Edge::sorted(a, b), Edge::sorted(a, c), Edge::sorted(b, c)]
    }

    /// The three vertices one edge away.
    pub fn neighbours(&self) -> [Triple; 3] {
        self.edges().map(|edge| {
            let [first, second] = edge.triples();
            if first == *self {
                second
            } else {
                first
            }
        })
    }

    /// Distance of the farthest of the three hexes from the centre.
    pub fn ring(&self) -> u32 {
        self.0.iter().map(HexCoord::ring).max().unwrap_or(0)
    }
}

impl TryFrom<[HexCoord; 3]> for Triple {
    type Error = GeometryError;

    fn try_from([a, b, c]: [HexCoord; 3]) -> Result<Self, Self::Error> {
        Triple::new(a, b, c)
    }
}

impl From<Triple> for [HexCoord; 3] {
    fn from(triple: Triple) -> Self {
        triple.0
    }
}

impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = planer_order(self);
        write!(f, "{} {} {}", a, b, c)
    }
}

/// A side of the grid: two adjacent hexes.
///
/// Roads are built on edges; ports sit on the edge between sea and land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[HexCoord; 2]", into = "[HexCoord; 2]")]
pub struct Edge([HexCoord; 2]);

impl Edge {
    /// Create an edge, checking that the two hexes share a side.
    pub fn new(a: HexCoord, b: HexCoord) -> Result<Self, GeometryError> {
        if a.is_adjacent(&b) {
            Ok(Self::sorted(a, b))
        } else {
            Err(GeometryError::NotAdjacent(a, b))
        }
    }

    fn sorted(a: HexCoord, b: HexCoord) -> Self {
        if a <= b {
            Self([a, b])
        } else {
            Self([b, a])
        }
    }

    /// The two hexes sharing this edge, in sorted order.
    pub fn hexes(&self) -> [HexCoord; 2] {
        self.0
    }

    /// The two vertices at either end of this edge.
    pub fn triples(&self) -> [Triple; 2] {
        let [a, b] = self.0;
        common_neighbours(&a, &b).map(|c| Triple::sorted(a, b, c))
    }

    /// Edges that share exactly one endpoint with this one.
    pub fn neighbours(&self) -> Vec<Edge> {
        let mut adjacent = Vec::with_capacity(4);
        for vertex in self.triples() {
            for edge in vertex.edges() {
                if edge != *self && !adjacent.contains(&edge) {
                    adjacent.push(edge);
                }
            }
        }
        adjacent
    }
}

impl TryFrom<[HexCoord; 2]> for Edge {
    type Error = GeometryError;

    fn try_from([a, b]: [HexCoord; 2]) -> Result<Self, Self::Error> {
        Edge::new(a, b)
    }
}

impl From<Edge> for [HexCoord; 2] {
    fn from(edge: Edge) -> Self {
        edge.0
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0[0], self.0[1])
    }
}

/// The two hexes adjacent to both `a` and `b`. Only meaningful when `a` and
/// `b` are themselves adjacent.
fn common_neighbours(a: &HexCoord, b: &HexCoord) -> [HexCoord; 2] {
    let mut shared = neighbours(a).into_iter().filter(|n| n.is_adjacent(b));
    let first = shared.next().unwrap_or(*a);
    let second = shared.next().unwrap_or(*b);
    [first, second]
}

// ==================== Adjacency ====================

/// The six hexes at distance one, in ring order starting from East.
pub fn neighbours(hex: &HexCoord) -> [HexCoord; 6] {
    DIRECTIONS.map(|direction| hex.offset(direction, 1))
}

/// The six vertices of a hex, one per corner.
pub fn triples(hex: &HexCoord) -> [Triple; 6] {
    let around = neighbours(hex);
    std::array::from_fn(|i| Triple::sorted(*hex, around[i], around[(i + 1) % 6]))
}

/// The two vertices shared by adjacent hexes `a` and `b`.
pub fn triples_from_neighbours(a: &HexCoord, b: &HexCoord) -> Result<[Triple; 2], GeometryError> {
    Ok(Edge::new(*a, *b)?.triples())
}

/// The two endpoint vertices of an edge.
pub fn edge_triples(edge: &Edge) -> [Triple; 2] {
    edge.triples()
}

/// Edges sharing exactly one endpoint with `edge`.
pub fn edge_neighbours(edge: &Edge) -> Vec<Edge> {
    edge.neighbours()
}

/// The edges meeting at a vertex.
pub fn triple_edges(triple: &Triple) -> [Edge; 3] {
    triple.edges()
}

/// Vertices one edge away from `triple`.
pub fn triple_neighbours(triple: &Triple) -> [Triple; 3] {
    triple.neighbours()
}

// ==================== Enumeration ====================

/// Every hex within `radius` steps of the centre.
pub fn hexes_from_centre(radius: u32) -> Vec<HexCoord> {
    let n = radius as i32;
    let mut hexes = Vec::new();
    for q in -n..=n {
        for r in (-n).max(-q - n)..=n.min(-q + n) {
            hexes.push(HexCoord::new(q, r));
        }
    }
    hexes
}

/// The hexes exactly `radius` steps from the centre, walked in ring order
/// starting from the south-west corner.
pub fn hex_ring(radius: u32) -> Vec<HexCoord> {
    if radius == 0 {
        return vec![HexCoord::ORIGIN];
    }
    let mut hex = HexCoord::ORIGIN.offset(DIRECTIONS[4], radius as i32);
    let mut ring = Vec::with_capacity(6 * radius as usize);
    for direction in DIRECTIONS {
        for _ in 0..radius {
            ring.push(hex);
            hex = hex.offset(direction, 1);
        }
    }
    ring
}

/// Every vertex whose three hexes lie within `radius` of the centre.
///
/// With the sea ring at radius 3, `triples_from_centre(3)` is exactly the set
/// of vertices touching land.
pub fn triples_from_centre(radius: u32) -> HashSet<Triple> {
    hexes_from_centre(radius)
        .iter()
        .flat_map(triples)
        .filter(|t| t.ring() <= radius)
        .collect()
}

/// Vertices whose farthest hex is exactly `radius` from the centre.
pub fn ring_from_centre(radius: u32) -> HashSet<Triple> {
    triples_from_centre(radius)
        .into_iter()
        .filter(|t| t.ring() == radius)
        .collect()
}

/// Edges inside `radius` that touch at least one hex strictly inside it.
pub fn edges_from_centre(radius: u32) -> HashSet<Edge> {
    let mut edges = HashSet::new();
    for hex in hexes_from_centre(radius.saturating_sub(1)) {
        for neighbour in neighbours(&hex) {
            if neighbour.ring() <= radius {
                edges.insert(Edge::sorted(hex, neighbour));
            }
        }
    }
    edges
}

/// Orders coordinates ring by ring outwards from the centre, each ring in
/// the walk order of `hex_ring`.
pub fn spiral_order(coords: impl IntoIterator<Item = HexCoord>) -> Vec<HexCoord> {
    let mut ordered: Vec<(u32, usize, HexCoord)> = coords
        .into_iter()
        .map(|hex| {
            let ring = hex.ring();
            let position = hex_ring(ring)
                .iter()
                .position(|h| *h == hex)
                .unwrap_or(usize::MAX);
            (ring, position, hex)
        })
        .collect();
    ordered.sort();
    ordered.into_iter().map(|(_, _, hex)| hex).collect()
}

/// Orders coordinates top row first, left to right within a row.
pub fn rows_order(coords: impl IntoIterator<Item = HexCoord>) -> Vec<HexCoord> {
    let mut ordered: Vec<HexCoord> = coords.into_iter().collect();
    ordered.sort_by_key(|h| (h.r, h.q));
    ordered
}

/// A vertex's hexes in row order, for display.
pub fn planer_order(triple: &Triple) -> [HexCoord; 3] {
    let mut hexes = triple.hexes();
    hexes.sort_by_key(|h| (h.r, h.q));
    hexes
}

// ==================== Projection ====================

/// Axial (q, r) components of a coordinate.
pub fn cube_to_axial(hex: &HexCoord) -> (i32, i32) {
    (hex.q, hex.r)
}

/// Rebuild a coordinate from axial components.
pub fn axial_to_cube(q: i32, r: i32) -> HexCoord {
    HexCoord::new(q, r)
}

/// Centre of a hex on a pointy-top layout with unit hex size.
pub fn planer_position(hex: &HexCoord) -> (f64, f64) {
    planer_position_scaled(hex, 1.0)
}

/// Centre of a hex on a pointy-top layout with the given hex size (radius).
pub fn planer_position_scaled(hex: &HexCoord, size: f64) -> (f64, f64) {
    let x = size * (3.0_f64.sqrt() * hex.q as f64 + 3.0_f64.sqrt() / 2.0 * hex.r as f64);
    let y = size * (3.0 / 2.0 * hex.r as f64);
    (x, y)
}

/// Hex under a point given relative to the board centre, rounding to the
/// nearest tile.
pub fn pixel_to_cube((x, y): (f64, f64), size: f64) -> HexCoord {
    let q = (3.0_f64.sqrt() / 3.0 * x - 1.0 / 3.0 * y) / size;
    let r = (2.0 / 3.0 * y) / size;
    cube_round(q, r)
}

fn cube_round(q: f64, r: f64) -> HexCoord {
    let s = -q - r;

    let mut rq = q.round();
    let mut rr = r.round();
    let rs = s.round();

    let q_diff = (rq - q).abs();
    let r_diff = (rr - r).abs();
    let s_diff = (rs - s).abs();

    if q_diff > r_diff && q_diff > s_diff {
        rq = -rr - rs;
    } else if r_diff > s_diff {
        rr = -rq - rs;
    }

    HexCoord::new(rq as i32, rr as i32)
}

/// Position of a vertex at unit hex size.
pub fn triple_planer_position(triple: &Triple) -> (f64, f64) {
    let (sx, sy) = triple
        .hexes()
        .iter()
        .map(planer_position)
        .fold((0.0, 0.0), |(ax, ay), (x, y)| (ax + x, ay + y));
    (sx / 3.0, sy / 3.0)
}

/// End points of an edge at unit hex size.
pub fn edge_planer_position(edge: &Edge) -> [(f64, f64); 2] {
    edge.triples().map(|t| triple_planer_position(&t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_neighbours() {
        let center = HexCoord::ORIGIN;
        let around = neighbours(&center);

        let unique: HashSet<_> = around.iter().collect();
        assert_eq!(unique.len(), 6);

        for neighbour in &around {
            assert_eq!(center.distance_to(neighbour), 1);
        }
    }

    #[test]
    fn test_adjacency_is_symmetric() {
        for hex in hexes_from_centre(3) {
            for neighbour in neighbours(&hex) {
                assert!(neighbours(&neighbour).contains(&hex));
            }
        }
    }

    #[test]
    fn test_hex_distance() {
        let a = HexCoord::ORIGIN;
        assert_eq!(a.distance_to(&HexCoord::new(2, -1)), 2);
        assert_eq!(a.distance_to(&HexCoord::new(-3, 3)), 3);
    }

    #[test]
    fn test_cube_rejects_off_plane() {
        assert!(HexCoord::cube(1, -1, 0).is_ok());
        assert_eq!(
            HexCoord::cube(1, 1, 1),
            Err(GeometryError::NotOnPlane { q: 1, r: 1, s: 1 })
        );
    }

    #[test]
    fn test_axial_round_trip() {
        for hex in hexes_from_centre(4) {
            let (q, r) = cube_to_axial(&hex);
            assert_eq!(axial_to_cube(q, r), hex);
        }
    }

    #[test]
    fn test_pixel_round_trip() {
        for size in [1.0, 37.5, 60.0] {
            for hex in hexes_from_centre(3) {
                let (x, y) = planer_position_scaled(&hex, size);
                assert_eq!(pixel_to_cube((x, y), size), hex);
                // Small offsets inside the tile still land on it
                assert_eq!(pixel_to_cube((x + size * 0.3, y - size * 0.2), size), hex);
            }
        }
    }

    #[test]
    fn test_edge_ends_are_one_side_apart() {
        for n in neighbours(&HexCoord::ORIGIN) {
            let [(x1, y1), (x2, y2)] = edge_planer_position(&Edge::new(HexCoord::ORIGIN, n).unwrap());
            let length = ((x1 - x2).powi(2) + (y1 - y2).powi(2)).sqrt();
            assert!((length - 1.0).abs() < 1e-9, "side length {length}");

            // Each end is a corner: one hex radius from the centre
            let (cx, cy) = triple_planer_position(&triples(&HexCoord::ORIGIN)[0]);
            assert!(((cx * cx + cy * cy).sqrt() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_each_hex_has_six_distinct_triples() {
        let corners = triples(&HexCoord::new(1, -1));
        let unique: HashSet<_> = corners.iter().collect();
        assert_eq!(unique.len(), 6);
        for t in corners {
            assert!(t.contains(&HexCoord::new(1, -1)));
        }
    }

    #[test]
    fn test_triple_rejects_non_adjacent_hexes() {
        let result = Triple::new(
            HexCoord::new(0, 0),
            HexCoord::new(1, 0),
            HexCoord::new(2, 0),
        );
        assert!(matches!(result, Err(GeometryError::NotATriple(..))));
    }

    #[test]
    fn test_triples_from_neighbours() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(1, 0);
        let [t1, t2] = triples_from_neighbours(&a, &b).unwrap();
        assert_ne!(t1, t2);
        assert!(t1.contains(&a) && t1.contains(&b));
        assert!(t2.contains(&a) && t2.contains(&b));

        let far = HexCoord::new(2, 0);
        assert_eq!(
            triples_from_neighbours(&a, &far),
            Err(GeometryError::NotAdjacent(a, far))
        );
    }

    #[test]
    fn test_edge_order_does_not_matter() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(0, 1);
        assert_eq!(Edge::new(a, b).unwrap(), Edge::new(b, a).unwrap());
    }

    #[test]
    fn test_edge_neighbours() {
        let edge = Edge::new(HexCoord::new(0, 0), HexCoord::new(1, 0)).unwrap();
        let adjacent = edge_neighbours(&edge);
        assert_eq!(adjacent.len(), 4);
        for other in &adjacent {
            assert_ne!(*other, edge);
            let shared = edge
                .triples()
                .iter()
                .filter(|t| other.triples().contains(t))
                .count();
            assert_eq!(shared, 1);
        }
    }

    #[test]
    fn test_triple_neighbours() {
        let t = triples(&HexCoord::ORIGIN)[0];
        let around = triple_neighbours(&t);
        let unique: HashSet<_> = around.iter().collect();
        assert_eq!(unique.len(), 3);
        for n in around {
            assert_ne!(n, t);
            // Neighbouring vertices share exactly two hexes: the edge between them
            let shared = n.hexes().iter().filter(|h| t.contains(h)).count();
            assert_eq!(shared, 2);
        }
    }

    #[test]
    fn test_vertex_edges_connect() {
        let t = triples(&HexCoord::new(-1, 2))[3];
        for edge in triple_edges(&t) {
            assert!(edge_triples(&edge).contains(&t));
        }
    }

    #[test]
    fn test_standard_board_counts() {
        assert_eq!(hexes_from_centre(2).len(), 19);
        assert_eq!(hex_ring(3).len(), 18);
        // 54 vertices touch land, 30 of them on the coast
        assert_eq!(triples_from_centre(3).len(), 54);
        assert_eq!(ring_from_centre(3).len(), 30);
        // 72 land edges
        assert_eq!(edges_from_centre(3).len(), 72);
    }

    #[test]
    fn test_spiral_order_starts_at_centre() {
        let order = spiral_order(hexes_from_centre(2));
        assert_eq!(order.len(), 19);
        assert_eq!(order[0], HexCoord::ORIGIN);
        assert!(order[1..7].iter().all(|h| h.ring() == 1));
        assert!(order[7..].iter().all(|h| h.ring() == 2));
        assert_eq!(order[1..7], hex_ring(1)[..]);
    }

    #[test]
    fn test_rows_order() {
        let order = rows_order(hexes_from_centre(1));
        assert_eq!(order[0], HexCoord::new(0, -1));
        assert_eq!(order[1], HexCoord::new(1, -1));
        assert_eq!(order[6], HexCoord::new(0, 1));
    }

    #[test]
    fn test_triple_serde_validates() {
        let t = triples(&HexCoord::ORIGIN)[2];
        let json = serde_json::to_string(&t).unwrap();
        let back: Triple = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);

        let bad = r#"[[0,0,0],[3,-3,0],[0,1,-1]]"#;
        assert!(serde_json::from_str::<Triple>(bad).is_err());

        let off_plane = r#"[0,1,1]"#;
        assert!(serde_json::from_str::<HexCoord>(off_plane).is_err());
        assert_eq!(serde_json::to_string(&HexCoord::new(1, -2)).unwrap(), "[1,-2,1]");
    }
}
