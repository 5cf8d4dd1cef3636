// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Restart Odds Estimator - Type Definitions

use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Decimal places kept on every elapsed-time key.
pub const TIME_DECIMALS: u32 = 2;

// ─── Elapsed ────────────────────────────────────────────────────────────────

/// Elapsed run time backed by `rust_decimal::Decimal`.
///
/// Every advance adds the duration in binary floating point and rounds the
/// exact value of that sum to [`TIME_DECIMALS`] places (half-to-even), so
/// paths reaching the same nominal time land in the same map bucket. A sum
/// like `0.31 / 2` sits just below its decimal midpoint and rounds down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Elapsed(pub Decimal);

impl Elapsed {
    pub const ZERO: Elapsed = Elapsed(Decimal::ZERO);

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }

    /// Round to the time-key precision.
    pub fn quantize(self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(TIME_DECIMALS, RoundingStrategy::MidpointNearestEven),
        )
    }

    /// Advance by `duration` and quantize the result.
    ///
    /// A sum outside the `Decimal` range leaves the time unchanged; durations
    /// are validated finite and positive before any simulation starts.
    pub fn advance(self, duration: f64) -> Self {
        Decimal::from_f64_retain(self.nearest_f64() + duration)
            .map(|sum| Self(sum).quantize())
            .unwrap_or(self)
    }

    /// The double nearest this key. Mantissa and power of ten are both exact
    /// for quantized keys, so the single division rounds correctly.
    fn nearest_f64(&self) -> f64 {
        self.0.mantissa() as f64 / 10f64.powi(self.0.scale() as i32)
    }
}

impl fmt::Display for Elapsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.quantize().0)
    }
}

// ─── Stage ──────────────────────────────────────────────────────────────────

/// One section of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    /// Probability of clearing the stage without losing a life, in `(0, 1]`.
    #[serde(alias = "rate")]
    pub clear_rate: f64,
    /// Time needed to clear the stage.
    #[serde(alias = "time")]
    pub nominal_time: f64,
    /// Lives awarded on clearing the stage.
    #[serde(default)]
    pub life_gain: u32,
}

impl Stage {
    pub fn new(clear_rate: f64, nominal_time: f64, life_gain: u32) -> Self {
        Self { clear_rate, nominal_time, life_gain }
    }
}

// ─── Start State ────────────────────────────────────────────────────────────

/// Where a simulated run begins: a stage index and a number of lives held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartState {
    #[serde(alias = "query_stage_index")]
    pub stage_index: usize,
    #[serde(alias = "query_lives")]
    pub lives: u32,
}

impl StartState {
    pub fn new(stage_index: usize, lives: u32) -> Self {
        Self { stage_index, lives }
    }
}

impl fmt::Display for StartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} with {} lives", self.stage_index, self.lives)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_advance_quantizes_to_two_places() {
        let t = Elapsed::ZERO.advance(0.333);
        assert_eq!(t, Elapsed(dec!(0.33)));
        let t = t.advance(0.336);
        assert_eq!(t, Elapsed(dec!(0.67)));
    }

    #[test]
    fn test_quantize_midpoint_is_half_even() {
        assert_eq!(Elapsed(dec!(0.125)).quantize(), Elapsed(dec!(0.12)));
        assert_eq!(Elapsed(dec!(0.135)).quantize(), Elapsed(dec!(0.14)));
    }

    #[test]
    fn test_equal_values_with_different_scale_merge() {
        let a = Elapsed::ZERO.advance(0.5).advance(0.5);
        assert_eq!(a, Elapsed(dec!(1)));
        assert_eq!(a.to_string(), "1.00");
    }

    #[test]
    fn test_advance_rounds_the_float_sum() {
        // 0.31 / 2 is stored as 0.15499..., 0.45 / 2 as 0.22500...06
        assert_eq!(Elapsed::ZERO.advance(0.31 / 2.0), Elapsed(dec!(0.15)));
        assert_eq!(Elapsed::ZERO.advance(0.45 / 2.0), Elapsed(dec!(0.23)));
        // 0.15 + 0.31 = 0.46000000000000002
        assert_eq!(Elapsed(dec!(0.15)).advance(0.31), Elapsed(dec!(0.46)));
    }

    #[test]
    fn test_nearest_f64_matches_float_literals() {
        assert_eq!(Elapsed(dec!(1.23)).nearest_f64(), 1.23);
        assert_eq!(Elapsed(dec!(0.46)).nearest_f64(), 0.46);
        assert_eq!(Elapsed(dec!(17)).nearest_f64(), 17.0);
    }

    #[test]
    fn test_non_finite_advance_keeps_time() {
        let t = Elapsed(dec!(1.5));
        assert_eq!(t.advance(f64::NAN), t);
        assert_eq!(t.advance(f64::INFINITY), t);
    }

    #[test]
    fn test_stage_accepts_short_field_names() {
        let stage: Stage =
            serde_json::from_str(r#"{"rate": 0.8, "time": 0.5, "life_gain": 1}"#).unwrap();
        assert_eq!(stage, Stage::new(0.8, 0.5, 1));
        let stage: Stage = serde_json::from_str(r#"{"clear_rate": 0.8, "nominal_time": 0.5}"#).unwrap();
        assert_eq!(stage.life_gain, 0);
    }
}
