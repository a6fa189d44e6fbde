use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    judgment::JudgmentConfig,
    score::{PlayOutcome, PlayResult, MAX_SCORE},
};

/// RKS values closer than this are considered equal.
pub const RKS_TOLERANCE: f64 = 1e-5;

/// One stored play. Records are append-only; a new record is derived only when
/// the chart's difficulty is reassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub id: i64,
    pub player_id: i64,
    pub chart_id: i64,
    pub score: u32,
    pub accuracy: f64,
    pub is_full_combo: bool,
    pub std_deviation_ms: f64,
    pub rks: f64,
    pub date_created: DateTime<Utc>,
}

impl RatingRecord {
    pub fn from_result(
        id: i64,
        player_id: i64,
        chart_id: i64,
        result: &PlayResult,
        date_created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            player_id,
            chart_id,
            score: result.score,
            accuracy: result.accuracy,
            is_full_combo: result.is_full_combo,
            std_deviation_ms: result.std_deviation_ms,
            rks: result.rks,
            date_created,
        }
    }

    /// Re-rates the same play after the chart's difficulty changed.
    pub fn recompute_for_difficulty(
        &self,
        outcome: &PlayOutcome,
        difficulty: f64,
        judgment: &JudgmentConfig,
    ) -> Self {
        let result = PlayResult::evaluate(outcome, difficulty, self.std_deviation_ms, judgment);
        Self {
            rks: result.rks,
            ..self.clone()
        }
    }

    pub fn is_phi(&self) -> bool {
        self.score >= MAX_SCORE
    }
}

/// Natural order of records: equal RKS (within [`RKS_TOLERANCE`]) puts the
/// earlier record first, otherwise the higher score comes first.
pub fn natural_cmp(a: &RatingRecord, b: &RatingRecord) -> Ordering {
    if (a.rks - b.rks).abs() < RKS_TOLERANCE {
        a.date_created.cmp(&b.date_created)
    } else {
        b.score.cmp(&a.score)
    }
}

/// RKS in units of [`RKS_TOLERANCE`]; sort keys compare these buckets.
fn rks_bucket(rks: f64) -> f64 {
    (rks / RKS_TOLERANCE).round()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Rks,
    Score,
    Accuracy,
    DateCreated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Ascending,
    Descending,
}

impl SortKey {
    fn compare(self, a: &RatingRecord, b: &RatingRecord) -> Ordering {
        match self {
            SortKey::Rks => rks_bucket(a.rks).total_cmp(&rks_bucket(b.rks)),
            SortKey::Score => a.score.cmp(&b.score),
            SortKey::Accuracy => a.accuracy.total_cmp(&b.accuracy),
            SortKey::DateCreated => a.date_created.cmp(&b.date_created),
        }
    }
}

/// An ordered list of sort keys, applied lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOrder {
    keys: Vec<(SortKey, Direction)>,
}

impl RecordOrder {
    pub fn new(keys: Vec<(SortKey, Direction)>) -> Self {
        Self { keys }
    }

    /// Leaderboard ranking: highest RKS first, earlier record on ties.
    pub fn ranking() -> Self {
        Self::new(vec![
            (SortKey::Rks, Direction::Descending),
            (SortKey::DateCreated, Direction::Ascending),
        ])
    }

    pub fn keys(&self) -> &[(SortKey, Direction)] {
        &self.keys
    }

    pub fn compare(&self, a: &RatingRecord, b: &RatingRecord) -> Ordering {
        for (key, direction) in &self.keys {
            let ord = match direction {
                Direction::Ascending => key.compare(a, b),
                Direction::Descending => key.compare(b, a),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Stable sort of `records` under this order.
    pub fn sort(&self, records: &mut [RatingRecord]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}
