//! Best-N selection over a player's rating history.
//!
//! Records are pulled page by page from a [`RecordSource`] in ranking order
//! (highest RKS first, earlier record on ties). Selection keeps the first
//! record of every chart and stops fetching as soon as it has enough.

use std::{
    collections::{HashSet, VecDeque},
    sync::atomic::{AtomicUsize, Ordering},
};

use futures::{stream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    config::EngineConfig,
    record::{RatingRecord, RecordOrder},
    score::MAX_SCORE,
};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Record source unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to decode records: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFilter {
    /// Every record of the player.
    Ranked,
    /// Only records with a perfect score.
    PerfectOnly,
}

impl RecordFilter {
    pub fn accepts(self, record: &RatingRecord) -> bool {
        match self {
            RecordFilter::Ranked => true,
            RecordFilter::PerfectOnly => record.score == MAX_SCORE,
        }
    }
}

/// One page request. Pages are 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    pub player_id: i64,
    pub page: usize,
    pub page_size: usize,
    pub filter: RecordFilter,
}

/// A paged, ranking-ordered view of stored records.
///
/// A page shorter than `page_size` is the last one.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<RatingRecord>, SourceError>;
}

struct StreamState {
    page: usize,
    buffer: VecDeque<RatingRecord>,
    exhausted: bool,
}

/// Lazily walks the pages of `source`. The next page is requested only once
/// the previous one has been fully consumed.
pub fn record_stream<'a, S: RecordSource>(
    source: &'a S,
    player_id: i64,
    page_size: usize,
    filter: RecordFilter,
) -> impl Stream<Item = Result<RatingRecord, SourceError>> + 'a {
    let state = StreamState {
        page: 0,
        buffer: VecDeque::new(),
        exhausted: false,
    };

    stream::unfold(state, move |mut state| async move {
        loop {
            if let Some(record) = state.buffer.pop_front() {
                return Some((Ok(record), state));
            }
            if state.exhausted {
                return None;
            }

            let query = PageQuery {
                player_id,
                page: state.page,
                page_size,
                filter,
            };
            match source.fetch_page(query).await {
                Ok(records) => {
                    debug!(player_id, page = state.page, len = records.len(), "fetched record page");
                    state.exhausted = records.is_empty() || records.len() < page_size;
                    state.page += 1;
                    state.buffer.extend(records);
                }
                Err(err) => {
                    state.exhausted = true;
                    return Some((Err(err), state));
                }
            }
        }
    })
}

async fn select_distinct<S: RecordSource>(
    source: &S,
    player_id: i64,
    n: usize,
    page_size: usize,
    filter: RecordFilter,
) -> Result<Vec<RatingRecord>, SourceError> {
    let mut selected = Vec::with_capacity(n);
    if n == 0 {
        return Ok(selected);
    }

    let mut seen = HashSet::new();
    let records = record_stream(source, player_id, page_size, filter);
    futures::pin_mut!(records);

    while let Some(record) = records.next().await {
        let record = record?;
        if seen.insert(record.chart_id) {
            selected.push(record);
            if selected.len() == n {
                break;
            }
        }
    }
    Ok(selected)
}

/// The player's `n` best records, at most one per chart.
pub async fn best_n<S: RecordSource>(
    source: &S,
    player_id: i64,
    n: usize,
    page_size: usize,
) -> Result<Vec<RatingRecord>, SourceError> {
    select_distinct(source, player_id, n, page_size, RecordFilter::Ranked).await
}

/// The player's `n` best perfect-score records, at most one per chart.
pub async fn top_phi<S: RecordSource>(
    source: &S,
    player_id: i64,
    n: usize,
    page_size: usize,
) -> Result<Vec<RatingRecord>, SourceError> {
    select_distinct(source, player_id, n, page_size, RecordFilter::PerfectOnly).await
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRatingSummary {
    pub player_id: i64,
    pub phi: Vec<RatingRecord>,
    pub best_n: Vec<RatingRecord>,
    pub overall_rks: f64,
}

/// Builds the player's rating summary.
///
/// `overall_rks` divides by the configured capacities, so a player with fewer
/// records than slots is averaged over the empty slots too.
pub async fn player_summary<S: RecordSource>(
    source: &S,
    player_id: i64,
    config: &EngineConfig,
) -> Result<PlayerRatingSummary, SourceError> {
    let phi = top_phi(source, player_id, config.phi_n, config.page_size).await?;
    let best = best_n(source, player_id, config.best_n, config.page_size).await?;

    let slots = config.best_n + config.phi_n;
    let total: f64 = best.iter().chain(phi.iter()).map(|r| r.rks).sum();
    let overall_rks = if slots == 0 { 0.0 } else { total / slots as f64 };

    info!(
        player_id,
        best_n = best.len(),
        phi = phi.len(),
        overall_rks,
        "computed player rating summary"
    );

    Ok(PlayerRatingSummary {
        player_id,
        phi,
        best_n: best,
        overall_rks,
    })
}

/// Keeps records in memory and serves them in ranking order.
#[derive(Debug, Default)]
pub struct MemoryRecordSource {
    records: Vec<RatingRecord>,
    fetches: AtomicUsize,
}

impl MemoryRecordSource {
    pub fn new(mut records: Vec<RatingRecord>) -> Self {
        RecordOrder::ranking().sort(&mut records);
        Self {
            records,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let records: Vec<RatingRecord> = serde_json::from_str(json)?;
        Ok(Self::new(records))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of pages served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl RecordSource for MemoryRecordSource {
    async fn fetch_page(&self, query: PageQuery) -> Result<Vec<RatingRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let page = self
            .records
            .iter()
            .filter(|r| r.player_id == query.player_id && query.filter.accepts(r))
            .skip(query.page.saturating_mul(query.page_size))
            .take(query.page_size)
            .cloned()
            .collect();
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::record;
    use approx::assert_abs_diff_eq;

    fn history() -> Vec<RatingRecord> {
        vec![
            record(1, 100, 14.0, 990_000, 0),
            record(2, 100, 13.0, 995_000, 10),
            record(3, 101, 15.2, 1_000_000, 20),
            record(4, 102, 12.5, 980_000, 30),
            record(5, 103, 12.5, 985_000, 5),
            record(6, 104, 11.0, 1_000_000, 40),
            record(7, 105, 9.0, 950_000, 50),
            record(8, 101, 15.0, 999_000, 60),
        ]
    }

    fn ids(records: &[RatingRecord]) -> Vec<i64> {
        records.iter().map(|r| r.id).collect()
    }

    #[tokio::test]
    async fn best_n_keeps_one_record_per_chart() {
        let source = MemoryRecordSource::new(history());
        let best = best_n(&source, 1, 27, 3).await.unwrap();

        assert_eq!(ids(&best), [3, 1, 5, 4, 6, 7]);
        let charts: HashSet<_> = best.iter().map(|r| r.chart_id).collect();
        assert_eq!(charts.len(), best.len());
        assert!(best.windows(2).all(|w| w[0].rks >= w[1].rks));
    }

    #[tokio::test]
    async fn equal_rks_prefers_earlier_record() {
        let source = MemoryRecordSource::new(history());
        let best = best_n(&source, 1, 4, 30).await.unwrap();
        // records 4 and 5 share rks 12.5; 5 was created first
        assert_eq!(ids(&best), [3, 1, 5, 4]);
    }

    #[tokio::test]
    async fn stops_fetching_once_enough_charts_are_found() {
        let source = MemoryRecordSource::new(history());
        let best = best_n(&source, 1, 2, 2).await.unwrap();

        assert_eq!(ids(&best), [3, 1]);
        // page 0 holds records 3 and 8, page 1 holds record 1
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn returns_fewer_when_history_is_short() {
        let source = MemoryRecordSource::new(history());
        let best = best_n(&source, 1, 50, 4).await.unwrap();
        assert_eq!(best.len(), 6);
        // 8 records in pages of 4: the third page comes back empty
        assert_eq!(source.fetch_count(), 3);
    }

    #[tokio::test]
    async fn empty_source_is_not_an_error() {
        let source = MemoryRecordSource::default();
        assert!(best_n(&source, 1, 27, 30).await.unwrap().is_empty());
        assert!(top_phi(&source, 1, 3, 30).await.unwrap().is_empty());
        assert_eq!(source.fetch_count(), 2);

        let zero = best_n(&source, 1, 0, 30).await.unwrap();
        assert!(zero.is_empty());
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn top_phi_only_sees_perfect_scores() {
        let source = MemoryRecordSource::new(history());
        let phi = top_phi(&source, 1, 3, 30).await.unwrap();
        assert_eq!(ids(&phi), [3, 6]);
        assert!(phi.iter().all(|r| r.score == MAX_SCORE));
    }

    #[tokio::test]
    async fn other_players_are_ignored() {
        let mut records = history();
        let mut foreign = record(99, 200, 16.0, 1_000_000, 0);
        foreign.player_id = 2;
        records.push(foreign);

        let source = MemoryRecordSource::new(records);
        let best = best_n(&source, 1, 1, 30).await.unwrap();
        assert_eq!(ids(&best), [3]);
        let theirs = best_n(&source, 2, 5, 30).await.unwrap();
        assert_eq!(ids(&theirs), [99]);
    }

    #[tokio::test]
    async fn summary_divides_by_capacity() {
        let source = MemoryRecordSource::new(history());
        let config = EngineConfig {
            best_n: 4,
            phi_n: 2,
            page_size: 3,
            ..EngineConfig::default()
        };
        let summary = player_summary(&source, 1, &config).await.unwrap();

        assert_eq!(summary.player_id, 1);
        assert_eq!(ids(&summary.best_n), [3, 1, 5, 4]);
        assert_eq!(ids(&summary.phi), [3, 6]);
        let expected = (15.2 + 14.0 + 12.5 + 12.5 + 15.2 + 11.0) / 6.0;
        assert_abs_diff_eq!(summary.overall_rks, expected, epsilon = 1e-9);

        let sparse = player_summary(&MemoryRecordSource::default(), 1, &EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(sparse.overall_rks, 0.0);
    }

    struct FailingSource;

    impl RecordSource for FailingSource {
        async fn fetch_page(&self, _query: PageQuery) -> Result<Vec<RatingRecord>, SourceError> {
            Err(SourceError::Unavailable("connection reset".to_string()))
        }
    }

    #[tokio::test]
    async fn source_errors_propagate() {
        let err = best_n(&FailingSource, 1, 27, 30).await.unwrap_err();
        assert_eq!(err.to_string(), "Record source unavailable: connection reset");
    }

    #[tokio::test]
    async fn stream_yields_every_record_in_order() {
        let source = MemoryRecordSource::new(history());
        let all: Vec<_> = record_stream(&source, 1, 3, RecordFilter::Ranked)
            .map(|r| r.unwrap().id)
            .collect()
            .await;
        assert_eq!(all, [3, 8, 1, 2, 5, 4, 6, 7]);
    }

    #[test]
    fn loads_records_from_json() {
        let json = serde_json::to_string(&history()).unwrap();
        let source = MemoryRecordSource::from_json_str(&json).unwrap();
        assert_eq!(source.len(), 8);
        assert!(MemoryRecordSource::from_json_str("{").is_err());
    }
}
