//! Procedural generation of world features, starting caravans and caravan
//! wander paths.
//!
//! Every function takes the generator explicitly, so a seeded generator gives
//! a reproducible world.

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::caravan::CaravanKind;
use crate::hex::{HexCoord, DIRECTIONS};

/// Static map feature on a hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Water source.
    Oasis,
    /// Abandoned settlement.
    Ruins,
}

/// `true` with probability `p`; `p` is clamped into `[0, 1]` and NaN never fires.
pub fn roll_chance<R: Rng + ?Sized>(rng: &mut R, p: f64) -> bool {
    if p.is_nan() || p <= 0.0 {
        return false;
    }
    rng.random_bool(p.min(1.0))
}

/// Uniform draw between two bounds given in either order.
pub fn random_between<R: Rng + ?Sized>(rng: &mut R, a: f64, b: f64) -> f64 {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0;
    }
    if lo == hi {
        return lo;
    }
    rng.random_range(lo..=hi)
}

/// Uniformly random hex within `radius` of `center`.
pub fn random_hex<R: Rng + ?Sized>(rng: &mut R, center: HexCoord, radius: u32) -> HexCoord {
    let radius = i32::try_from(radius).unwrap_or(i32::MAX / 2);
    // Rejection sampling on the bounding rhombus keeps the draw uniform.
    loop {
        let dq = rng.random_range(-radius..=radius);
        let dr = rng.random_range(-radius..=radius);
        let candidate = center.offset(HexCoord::new(dq, dr), 1);
        if center.distance(candidate) <= radius as u32 {
            return candidate;
        }
    }
}

/// Scatter 2-5 oases and 1-3 ruins within `radius` of the origin.
///
/// Positions may collide; later placements overwrite earlier ones.
pub fn generate_desert_features<R: Rng + ?Sized>(
    rng: &mut R,
    radius: u32,
) -> BTreeMap<HexCoord, FeatureKind> {
    let mut features = BTreeMap::new();

    let oases = rng.random_range(2..=5);
    for _ in 0..oases {
        features.insert(random_hex(rng, HexCoord::ORIGIN, radius), FeatureKind::Oasis);
    }

    let ruins = rng.random_range(1..=3);
    for _ in 0..ruins {
        features.insert(random_hex(rng, HexCoord::ORIGIN, radius), FeatureKind::Ruins);
    }

    features
}

/// Pick `count` spawn points for the initial caravans, with kinds drawn by
/// spawn weight. The camp hex at the origin is never used.
pub fn generate_starting_caravans<R: Rng + ?Sized>(
    rng: &mut R,
    radius: u32,
    count: u32,
) -> Vec<(HexCoord, CaravanKind)> {
    let radius = radius.max(1);
    (0..count)
        .map(|_| {
            let mut hex = random_hex(rng, HexCoord::ORIGIN, radius);
            while hex == HexCoord::ORIGIN {
                hex = random_hex(rng, HexCoord::ORIGIN, radius);
            }
            (hex, CaravanKind::choose(rng))
        })
        .collect()
}

/// A wander route of 5-10 waypoints, each 1-3 hexes from the previous one
/// along a random axial direction.
pub fn generate_movement_path<R: Rng + ?Sized>(
    rng: &mut R,
    origin: HexCoord,
) -> VecDeque<HexCoord> {
    let length = rng.random_range(5..=10);
    let mut path = VecDeque::with_capacity(length);
    let mut current = origin;
    for _ in 0..length {
        let direction = DIRECTIONS[rng.random_range(0..DIRECTIONS.len())];
        let steps = rng.random_range(1..=3);
        current = current.offset(direction, steps);
        path.push_back(current);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_features_within_radius() {
        let mut rng = SmallRng::seed_from_u64(1);
        for _ in 0..100 {
            let features = generate_desert_features(&mut rng, 10);
            assert!(!features.is_empty());
            assert!(features.len() <= 8);
            assert!(features.keys().all(|h| HexCoord::ORIGIN.distance(*h) <= 10));
        }
    }

    #[test]
    fn test_features_reproducible_for_seed() {
        let a = generate_desert_features(&mut SmallRng::seed_from_u64(42), 12);
        let b = generate_desert_features(&mut SmallRng::seed_from_u64(42), 12);
        assert_eq!(a, b);
    }

    #[test]
    fn test_starting_caravans_avoid_camp() {
        let mut rng = SmallRng::seed_from_u64(3);
        let spawns = generate_starting_caravans(&mut rng, 5, 40);
        assert_eq!(spawns.len(), 40);
        for (hex, _) in spawns {
            assert_ne!(hex, HexCoord::ORIGIN);
            assert!(HexCoord::ORIGIN.distance(hex) <= 5);
        }
    }

    #[test]
    fn test_movement_path_shape() {
        let mut rng = SmallRng::seed_from_u64(9);
        let origin = HexCoord::new(3, -2);
        for _ in 0..100 {
            let path = generate_movement_path(&mut rng, origin);
            assert!((5..=10).contains(&path.len()));

            let mut prev = origin;
            for waypoint in &path {
                let step = prev.distance(*waypoint);
                assert!((1..=3).contains(&step));
                prev = *waypoint;
            }
        }
    }

    #[test]
    fn test_roll_chance_edges() {
        let mut rng = SmallRng::seed_from_u64(4);
        assert!(!roll_chance(&mut rng, 0.0));
        assert!(!roll_chance(&mut rng, -3.0));
        assert!(!roll_chance(&mut rng, f64::NAN));
        assert!(roll_chance(&mut rng, 1.0));
        assert!(roll_chance(&mut rng, 7.5));
    }

    #[test]
    fn test_random_between_handles_order() {
        let mut rng = SmallRng::seed_from_u64(4);
        for _ in 0..100 {
            let v = random_between(&mut rng, 900.0, 300.0);
            assert!((300.0..=900.0).contains(&v));
        }
        assert!((random_between(&mut rng, 5.0, 5.0) - 5.0).abs() < f64::EPSILON);
        assert!(random_between(&mut rng, f64::NAN, 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_random_hex_radius_zero() {
        let mut rng = SmallRng::seed_from_u64(0);
        let center = HexCoord::new(4, 4);
        assert_eq!(random_hex(&mut rng, center, 0), center);
    }
}
