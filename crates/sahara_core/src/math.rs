//! Fixed-point math utilities for deterministic simulation.
//!
//! Resource stocks, rates and accumulators use fixed-point arithmetic so the
//! same inputs produce bit-identical stocks on every platform.

use std::collections::BTreeMap;

use fixed::types::I32F32;

/// Fixed-point number type for all economy math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Convert a possibly hostile `f64` into a fixed-point value.
///
/// NaN and infinities become zero; finite values saturate at the type bounds.
#[must_use]
pub fn fixed_from_f64(value: f64) -> Fixed {
    if value.is_finite() {
        Fixed::saturating_from_num(value)
    } else {
        Fixed::ZERO
    }
}

/// Whole units contained in a fixed-point amount (rounded toward negative infinity).
#[must_use]
pub fn whole_units(value: Fixed) -> i64 {
    value.floor().to_num::<i64>()
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for maps with fixed-point values.
///
/// Same raw-bit encoding as [`fixed_serde`], applied to every value.
pub mod fixed_map_serde {
    use super::{BTreeMap, Fixed};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize each value as its raw bit representation.
    pub fn serialize<K, S>(map: &BTreeMap<K, Fixed>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize + Ord,
        S: Serializer,
    {
        let bits: BTreeMap<&K, i64> = map.iter().map(|(k, v)| (k, v.to_bits())).collect();
        bits.serialize(serializer)
    }

    /// Deserialize each value from its raw bit representation.
    pub fn deserialize<'de, K, D>(deserializer: D) -> Result<BTreeMap<K, Fixed>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        D: Deserializer<'de>,
    {
        let bits = BTreeMap::<K, i64>::deserialize(deserializer)?;
        Ok(bits
            .into_iter()
            .map(|(k, v)| (k, Fixed::from_bits(v)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_from_hostile_floats() {
        assert_eq!(fixed_from_f64(f64::NAN), Fixed::ZERO);
        assert_eq!(fixed_from_f64(f64::INFINITY), Fixed::ZERO);
        assert_eq!(fixed_from_f64(1e300), Fixed::MAX);
        assert_eq!(fixed_from_f64(2.5), Fixed::from_num(2.5));
    }

    #[test]
    fn test_whole_units_floors() {
        assert_eq!(whole_units(Fixed::from_num(3.99)), 3);
        assert_eq!(whole_units(Fixed::from_num(-0.5)), -1);
        assert_eq!(whole_units(Fixed::ZERO), 0);
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);
        assert_eq!(a * Fixed::from_num(7), b * Fixed::from_num(7));
    }

    #[test]
    fn test_fixed_map_round_trip() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(with = "fixed_map_serde")]
            values: BTreeMap<String, Fixed>,
        }

        let mut values = BTreeMap::new();
        values.insert("water".to_string(), Fixed::from_num(1) / Fixed::from_num(3));
        let json = serde_json::to_string(&Holder { values: values.clone() }).unwrap();
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values, values);
    }
}
