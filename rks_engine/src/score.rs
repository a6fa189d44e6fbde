use serde::{Deserialize, Serialize};

use crate::judgment::JudgmentConfig;

pub const MAX_SCORE: u32 = 1_000_000;
/// Accuracy (in percent) below which a play earns no rating.
pub const RKS_ACCURACY_FLOOR: f64 = 70.0;

const PERFECT_WEIGHT: f64 = 900_000.0;
const GOOD_WEIGHT: f64 = 58_500.0;
const COMBO_WEIGHT: f64 = 100_000.0;
const GOOD_ACCURACY: f64 = 0.65;

/// Raw judgment counts of one completed play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayOutcome {
    pub perfect: u32,
    pub good_early: u32,
    pub good_late: u32,
    pub bad: u32,
    pub miss: u32,
    pub max_combo: u32,
}

impl PlayOutcome {
    pub fn good(&self) -> u64 {
        u64::from(self.good_early) + u64::from(self.good_late)
    }

    pub fn total(&self) -> u64 {
        u64::from(self.perfect) + self.good() + u64::from(self.bad) + u64::from(self.miss)
    }

    pub fn score(&self) -> u32 {
        score(
            self.perfect.into(),
            self.good(),
            self.bad.into(),
            self.miss.into(),
            self.max_combo.into(),
        )
    }

    pub fn accuracy(&self) -> f64 {
        accuracy(self.perfect.into(), self.good(), self.bad.into(), self.miss.into())
    }

    pub fn is_full_combo(&self) -> bool {
        is_full_combo(self.bad.into(), self.miss.into())
    }
}

/// `round((900000 * perfect + 58500 * good + 100000 * max_combo) / total)`,
/// ties rounded to even.
pub fn score(perfect: u64, good: u64, bad: u64, miss: u64, max_combo: u64) -> u32 {
    let total = total(perfect, good, bad, miss);
    if total == 0.0 {
        return 0;
    }
    let raw = (PERFECT_WEIGHT * perfect as f64
        + GOOD_WEIGHT * good as f64
        + COMBO_WEIGHT * max_combo as f64)
        / total;
    raw.round_ties_even() as u32
}

/// `(perfect + 0.65 * good) / total`, 0 for an empty play.
pub fn accuracy(perfect: u64, good: u64, bad: u64, miss: u64) -> f64 {
    let total = total(perfect, good, bad, miss);
    if total == 0.0 {
        return 0.0;
    }
    (perfect as f64 + GOOD_ACCURACY * good as f64) / total
}

/// Rating of one play on a chart of the given difficulty.
///
/// Plays under 70% accuracy rate 0. Above the floor the rating grows with the
/// square of the accuracy beyond 55% and shrinks by half the timing standard
/// deviation. Never negative.
pub fn rks(perfect: u64, good: u64, bad: u64, miss: u64, difficulty: f64, std_deviation_ms: f64) -> f64 {
    let total = total(perfect, good, bad, miss);
    if total == 0.0 {
        return 0.0;
    }
    let accuracy_percent = (100.0 * perfect as f64 + 65.0 * good as f64) / total;
    if accuracy_percent < RKS_ACCURACY_FLOOR {
        return 0.0;
    }
    let shifted = accuracy_percent - 55.0;
    let value = shifted * shifted * difficulty / 2025.0 + 0.032 - std_deviation_ms / 2.0;
    value.max(0.0)
}

pub fn is_full_combo(bad: u64, miss: u64) -> bool {
    bad == 0 && miss == 0
}

/// Population standard deviation of hit offsets, in milliseconds.
pub fn std_deviation_ms(offsets_ms: &[f64]) -> f64 {
    if offsets_ms.is_empty() {
        return 0.0;
    }
    let n = offsets_ms.len() as f64;
    let mean = offsets_ms.iter().sum::<f64>() / n;
    let variance = offsets_ms.iter().map(|o| (o - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

fn total(perfect: u64, good: u64, bad: u64, miss: u64) -> f64 {
    perfect as f64 + good as f64 + bad as f64 + miss as f64
}

/// Everything derived from one play before it is stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayResult {
    pub score: u32,
    pub accuracy: f64,
    pub is_full_combo: bool,
    pub std_deviation_ms: f64,
    /// Chart rating scaled by the player's judgment configuration.
    pub rks: f64,
}

impl PlayResult {
    pub fn evaluate(
        outcome: &PlayOutcome,
        difficulty: f64,
        std_deviation_ms: f64,
        judgment: &JudgmentConfig,
    ) -> Self {
        let base = rks(
            outcome.perfect.into(),
            outcome.good(),
            outcome.bad.into(),
            outcome.miss.into(),
            difficulty,
            std_deviation_ms,
        );
        Self {
            score: outcome.score(),
            accuracy: outcome.accuracy(),
            is_full_combo: outcome.is_full_combo(),
            std_deviation_ms,
            rks: base * judgment.rks_factor(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn empty_play_scores_zero() {
        assert_eq!(score(0, 0, 0, 0, 0), 0);
        assert_eq!(accuracy(0, 0, 0, 0), 0.0);
        assert_eq!(rks(0, 0, 0, 0, 15.0, 0.0), 0.0);
        assert_eq!(PlayOutcome::default().score(), 0);
    }

    #[test]
    fn all_perfect_full_combo_is_max_score() {
        for p in [1, 7, 333, 1024, 2500] {
            assert_eq!(score(p, 0, 0, 0, p), MAX_SCORE);
        }
    }

    #[test]
    fn score_rounds_half_to_even() {
        assert_eq!(score(1, 1, 0, 0, 0), 479_250);
        // 58500 / 8 = 7312.5
        assert_eq!(score(0, 1, 0, 7, 0), 7312);
        // 175500 / 8 = 21937.5
        assert_eq!(score(0, 3, 0, 5, 0), 21938);
    }

    #[test]
    fn accuracy_weights_good_at_65_percent() {
        assert_abs_diff_eq!(accuracy(1, 1, 0, 0), 0.825);
        assert_abs_diff_eq!(accuracy(0, 0, 3, 1), 0.0);
    }

    #[test]
    fn rks_is_zero_below_70_percent() {
        for difficulty in [1.0, 15.0, 16.9] {
            for std in [0.0, 0.05, 10.0] {
                // 69% accuracy
                assert_eq!(rks(69, 0, 31, 0, difficulty, std), 0.0);
                // 65% from goods only
                assert_eq!(rks(0, 100, 0, 0, difficulty, std), 0.0);
            }
        }
        assert!(rks(70, 0, 30, 0, 10.0, 0.0) > 0.0);
    }

    #[test]
    fn rks_scenario() {
        let outcome = PlayOutcome {
            perfect: 900,
            good_early: 30,
            good_late: 20,
            bad: 30,
            miss: 20,
            max_combo: 900,
        };
        let value = rks(
            outcome.perfect.into(),
            outcome.good(),
            outcome.bad.into(),
            outcome.miss.into(),
            15.0,
            0.05,
        );
        // accuracy 93.25%, shifted 38.25
        assert_abs_diff_eq!(value, 38.25 * 38.25 * 15.0 / 2025.0 + 0.032 - 0.025, epsilon = 1e-9);
        assert_abs_diff_eq!(value, 10.844, epsilon = 1e-3);
        assert!(!outcome.is_full_combo());
    }

    #[test]
    fn rks_never_negative() {
        assert_eq!(rks(80, 0, 20, 0, 0.0, 5.0), 0.0);
    }

    #[test]
    fn counts_near_u32_max_do_not_overflow() {
        let outcome = PlayOutcome {
            good_early: u32::MAX,
            good_late: 1,
            bad: u32::MAX,
            miss: u32::MAX,
            perfect: u32::MAX,
            max_combo: u32::MAX,
        };
        assert_eq!(outcome.good(), u64::from(u32::MAX) + 1);
        assert_eq!(outcome.total(), 4 * u64::from(u32::MAX) + 1);
        assert!(outcome.score() < MAX_SCORE);
        assert!(outcome.accuracy() > 0.0 && outcome.accuracy() < 1.0);
        assert!(!outcome.is_full_combo());
    }

    #[test]
    fn full_combo_requires_no_bad_or_miss() {
        assert!(is_full_combo(0, 0));
        assert!(!is_full_combo(1, 0));
        assert!(!is_full_combo(0, 1));
    }

    #[test]
    fn std_deviation_is_population() {
        assert_eq!(std_deviation_ms(&[]), 0.0);
        assert_abs_diff_eq!(std_deviation_ms(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
    }

    #[test]
    fn evaluate_applies_judgment_factor() {
        let outcome = PlayOutcome {
            perfect: 100,
            max_combo: 100,
            ..PlayOutcome::default()
        };
        let strict = PlayResult::evaluate(&outcome, 12.0, 0.0, &JudgmentConfig::new(0.0, 0.0));
        assert_eq!(strict.score, MAX_SCORE);
        assert!(strict.is_full_combo);
        assert_abs_diff_eq!(strict.rks, 45.0 * 45.0 * 12.0 / 2025.0 + 0.032, epsilon = 1e-9);

        let lenient = PlayResult::evaluate(&outcome, 12.0, 0.0, &JudgmentConfig::new(187.5, 0.0));
        assert_eq!(lenient.rks, 0.0);
        assert_eq!(lenient.score, MAX_SCORE);
    }
}
