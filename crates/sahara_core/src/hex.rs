//! Axial hex-grid coordinates.
//!
//! Cells are addressed by `(q, r)` with the implied cube coordinate
//! `s = -q - r`. Pixel transforms use the flat-top layout: a hex of radius
//! `R` centred at `(q, r)` sits at `x = R * 3/2 * q`, `y = R * (sqrt(3)/2 * q + sqrt(3) * r)`.
//!
//! Coordinates serialize as the string `"q,r"` so they can key JSON maps.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const SQRT_3: f64 = 1.732_050_807_568_877_2;

/// The six axial unit directions, counter-clockwise starting east.
pub const DIRECTIONS: [HexCoord; 6] = [
    HexCoord::new(1, 0),
    HexCoord::new(1, -1),
    HexCoord::new(0, -1),
    HexCoord::new(-1, 0),
    HexCoord::new(-1, 1),
    HexCoord::new(0, 1),
];

/// A hex cell in axial coordinates.
///
/// The usable domain is `|q|, |r| <= HexCoord::LIMIT`. Parsing rejects keys
/// outside it and rounding clamps into it, so neighbors and offsets of any
/// in-domain hex are exact.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct HexCoord {
    /// Column axis.
    pub q: i32,
    /// Diagonal row axis.
    pub r: i32,
}

impl HexCoord {
    /// The world origin, where the player camp sits.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Largest magnitude of either axis.
    pub const LIMIT: i32 = 1 << 30;

    /// Create a coordinate.
    #[must_use]
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// The implied third cube coordinate.
    #[must_use]
    pub const fn s(self) -> i64 {
        -(self.q as i64) - (self.r as i64)
    }

    /// Pixel centre of this hex for a given hex radius.
    #[must_use]
    pub fn to_pixel(self, hex_radius: f64) -> (f64, f64) {
        let q = f64::from(self.q);
        let r = f64::from(self.r);
        let x = hex_radius * (1.5 * q);
        let y = hex_radius * (SQRT_3 / 2.0 * q + SQRT_3 * r);
        (x, y)
    }

    /// Hex containing the pixel `(x, y)` for a given hex radius.
    ///
    /// A zero or non-finite radius maps everything to the origin.
    #[must_use]
    pub fn from_pixel(x: f64, y: f64, hex_radius: f64) -> Self {
        if hex_radius == 0.0 || !hex_radius.is_finite() {
            return Self::ORIGIN;
        }
        let q = (2.0 / 3.0 * x) / hex_radius;
        let r = (-1.0 / 3.0 * x + SQRT_3 / 3.0 * y) / hex_radius;
        Self::round(q, r)
    }

    /// Round fractional axial coordinates to the nearest hex.
    ///
    /// The cube component with the largest rounding error is recomputed from
    /// the other two so that `q + r + s == 0` holds.
    #[must_use]
    pub fn round(qf: f64, rf: f64) -> Self {
        let qf = if qf.is_finite() { qf } else { 0.0 };
        let rf = if rf.is_finite() { rf } else { 0.0 };
        let sf = -qf - rf;

        let mut rq = qf.round();
        let mut rr = rf.round();
        let rs = sf.round();

        let q_diff = (rq - qf).abs();
        let r_diff = (rr - rf).abs();
        let s_diff = (rs - sf).abs();

        if q_diff > r_diff && q_diff > s_diff {
            rq = -rr - rs;
        } else if r_diff > s_diff {
            rr = -rq - rs;
        }

        let limit = f64::from(Self::LIMIT);
        Self::new(
            rq.clamp(-limit, limit) as i32,
            rr.clamp(-limit, limit) as i32,
        )
    }

    /// Number of steps between two hexes.
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let dq = i64::from(self.q) - i64::from(other.q);
        let dr = i64::from(self.r) - i64::from(other.r);
        let steps = (dq.abs() + dr.abs() + (dq + dr).abs()) / 2;
        u32::try_from(steps).unwrap_or(u32::MAX)
    }

    /// Step `steps` hexes in a direction.
    ///
    /// Exact inside the usable domain; results past the `i32` range saturate.
    #[must_use]
    pub fn offset(self, direction: Self, steps: i32) -> Self {
        let axis = |base: i32, delta: i32| {
            let value = i64::from(base) + i64::from(delta) * i64::from(steps);
            value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
        };
        Self::new(axis(self.q, direction.q), axis(self.r, direction.r))
    }

    /// The six adjacent hexes, in [`DIRECTIONS`] order.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        DIRECTIONS.map(|d| self.offset(d, 1))
    }

    /// Every hex within `radius` steps of `self`, in ascending `(q, r)` order.
    #[must_use]
    pub fn within(self, radius: u32) -> Vec<Self> {
        let radius = i32::try_from(radius).unwrap_or(i32::MAX);
        let mut hexes = Vec::new();
        for dq in -radius..=radius {
            let lo = (-radius).max(-dq - radius);
            let hi = radius.min(-dq + radius);
            for dr in lo..=hi {
                hexes.push(Self::new(
                    self.q.saturating_add(dq),
                    self.r.saturating_add(dr),
                ));
            }
        }
        hexes
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.q, self.r)
    }
}

/// Malformed or out-of-domain `"q,r"` key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex key '{0}', expected \"q,r\" within the hex limit")]
pub struct ParseHexError(pub String);

impl FromStr for HexCoord {
    type Err = ParseHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (q, r) = s.split_once(',').ok_or_else(|| ParseHexError(s.into()))?;
        let q = q.trim().parse().map_err(|_| ParseHexError(s.into()))?;
        let r = r.trim().parse().map_err(|_| ParseHexError(s.into()))?;
        let in_domain = |v: i32| (-Self::LIMIT..=Self::LIMIT).contains(&v);
        if !(in_domain(q) && in_domain(r)) {
            return Err(ParseHexError(s.into()));
        }
        Ok(Self::new(q, r))
    }
}

impl TryFrom<String> for HexCoord {
    type Error = ParseHexError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexCoord> for String {
    fn from(hex: HexCoord) -> Self {
        hex.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_examples() {
        let a = HexCoord::new(0, 0);
        assert_eq!(a.distance(HexCoord::new(3, 0)), 3);
        assert_eq!(a.distance(HexCoord::new(2, -1)), 2);
        assert_eq!(a.distance(HexCoord::new(-2, 4)), 4);
        assert_eq!(a.distance(a), 0);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        let h = HexCoord::new(4, -7);
        let neighbors = h.neighbors();
        assert_eq!(neighbors.len(), 6);
        for n in neighbors {
            assert_eq!(h.distance(n), 1);
        }
        assert_eq!(neighbors[0], HexCoord::new(5, -7));
        assert_eq!(neighbors[5], HexCoord::new(4, -6));
    }

    #[test]
    fn test_neighbors_at_domain_edge() {
        let limit = HexCoord::LIMIT;
        for h in [
            HexCoord::new(limit, -limit),
            HexCoord::new(-limit, limit),
            HexCoord::new(limit, limit),
        ] {
            for n in h.neighbors() {
                assert_ne!(n, h);
                assert_eq!(h.distance(n), 1);
            }
        }
        assert_eq!(
            HexCoord::new(i32::MAX, 0).offset(DIRECTIONS[0], 1),
            HexCoord::new(i32::MAX, 0)
        );
    }

    #[test]
    fn test_huge_pixel_clamps_to_domain() {
        let hex = HexCoord::from_pixel(1e300, -1e300, 1.0);
        assert!(hex.q.abs() <= HexCoord::LIMIT);
        assert!(hex.r.abs() <= HexCoord::LIMIT);
    }

    #[test]
    fn test_pixel_round_trip() {
        for hex in HexCoord::ORIGIN.within(4) {
            let (x, y) = hex.to_pixel(30.0);
            assert_eq!(HexCoord::from_pixel(x, y, 30.0), hex);
        }
    }

    #[test]
    fn test_to_pixel_formula() {
        let (x, y) = HexCoord::new(2, 1).to_pixel(10.0);
        assert!((x - 30.0).abs() < 1e-9);
        assert!((y - (10.0 * (SQRT_3 + SQRT_3))).abs() < 1e-9);
    }

    #[test]
    fn test_round_preserves_cube_invariant() {
        // Near a three-way corner the naive rounding breaks q + r + s = 0.
        let hex = HexCoord::round(0.4, 0.4);
        assert_eq!(i64::from(hex.q) + i64::from(hex.r) + hex.s(), 0);
        assert_eq!(HexCoord::round(1.2, -0.3), HexCoord::new(1, 0));
        assert_eq!(HexCoord::round(f64::NAN, 2.2), HexCoord::new(0, 2));
    }

    #[test]
    fn test_from_pixel_degenerate_radius() {
        assert_eq!(HexCoord::from_pixel(100.0, 50.0, 0.0), HexCoord::ORIGIN);
    }

    #[test]
    fn test_within_counts() {
        assert_eq!(HexCoord::ORIGIN.within(0).len(), 1);
        assert_eq!(HexCoord::ORIGIN.within(1).len(), 7);
        assert_eq!(HexCoord::ORIGIN.within(3).len(), 37);
        assert!(HexCoord::new(5, 5)
            .within(2)
            .iter()
            .all(|h| h.distance(HexCoord::new(5, 5)) <= 2));
    }

    #[test]
    fn test_string_key_round_trip() {
        let hex = HexCoord::new(-3, 12);
        assert_eq!(hex.to_string(), "-3,12");
        assert_eq!("-3,12".parse::<HexCoord>(), Ok(hex));
        assert!("nope".parse::<HexCoord>().is_err());
        assert!("2147483647,0".parse::<HexCoord>().is_err());
        assert!(format!("{},0", HexCoord::LIMIT).parse::<HexCoord>().is_ok());

        let json = serde_json::to_string(&hex).unwrap();
        assert_eq!(json, "\"-3,12\"");
        assert_eq!(serde_json::from_str::<HexCoord>(&json).unwrap(), hex);
    }
}
