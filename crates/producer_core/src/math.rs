//! Fixed-point math utilities for deterministic scheduling.
//!
//! Income projections multiply fractional per-worker rates by frame
//! counts. Doing this in floating point would make schedules depend on
//! the CPU, so every rate is a fixed-point number and every projection
//! truncates toward zero. Truncating toward zero (instead of flooring)
//! means that a rate change and its exact reversal cancel out, which the
//! time-shifting code in the resolver relies on.

use fixed::types::I32F32;

/// Fixed-point number type for all scheduling math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Projected amount gathered by `workers` workers at `rate` per worker per
/// frame over `frames` frames, truncated toward zero.
#[must_use]
pub fn project(rate: Fixed, workers: i32, frames: i32) -> i32 {
    (rate * Fixed::from_num(workers) * Fixed::from_num(frames))
        .round_to_zero()
        .to_num::<i32>()
}

/// Number of whole frames `workers` workers need at `rate` to gather
/// `amount`, truncated toward zero. Returns `i32::MAX` for a zero rate.
#[must_use]
pub fn frames_to_gather(amount: i32, rate: Fixed, workers: i32) -> i32 {
    let per_frame = rate * Fixed::from_num(workers);
    if per_frame <= Fixed::ZERO {
        return i32::MAX;
    }
    (Fixed::from_num(amount) / per_frame)
        .round_to_zero()
        .to_num::<i32>()
}

/// Scale an integer amount by a fixed-point factor, truncated toward zero.
#[must_use]
pub fn scale(amount: i32, factor: Fixed) -> i32 {
    (Fixed::from_num(amount) * factor)
        .round_to_zero()
        .to_num::<i32>()
}

/// Serde support for fixed-point numbers written as decimal strings.
///
/// Configuration files carry rates such as `"0.0465"`. Parsing the decimal
/// text directly into fixed point is exact and platform independent, unlike
/// going through `f64`.
pub mod decimal_serde {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::Fixed;

    /// Serialize a fixed-point number as its decimal representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    /// Deserialize a fixed-point number from a decimal string.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        text.trim().parse::<Fixed>().map_err(D::Error::custom)
    }
}

/// Serde support for fixed-point numbers as raw bits.
///
/// Used where exact round-tripping matters more than readability, such as
/// binary schedule digests.
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_project_truncates_toward_zero() {
        let rate = Fixed::from_str("0.0465").unwrap();
        // 10 workers * 0.0465 * 7 frames = 3.255
        assert_eq!(project(rate, 10, 7), 3);
        assert_eq!(project(rate, -10, 7), -3);
    }

    #[test]
    fn test_project_and_reversal_cancel() {
        let rate = Fixed::from_str("0.071").unwrap();
        for frames in 0..500 {
            assert_eq!(project(rate, 3, frames) + project(rate, -3, frames), 0);
        }
    }

    #[test]
    fn test_frames_to_gather() {
        let rate = Fixed::from_str("0.071").unwrap();
        // 100 gas with 3 workers: 100 / 0.213 = 469.48
        assert_eq!(frames_to_gather(100, rate, 3), 469);
        assert_eq!(frames_to_gather(100, rate, 0), i32::MAX);
    }

    #[test]
    fn test_scale() {
        let factor = Fixed::from_str("0.655").unwrap();
        assert_eq!(scale(100, factor), 65);
        assert_eq!(scale(0, factor), 0);
    }

    #[test]
    fn test_fixed_determinism() {
        let a = Fixed::from_str("0.0465").unwrap();
        let b = Fixed::from_str("0.0465").unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
        assert_eq!(project(a, 17, 4499), project(b, 17, 4499));
    }
}
