pub mod config;
pub mod judgment;
pub mod leaderboard;
pub mod record;
pub mod score;

pub use config::{ConfigError, EngineConfig};
pub use judgment::{rks_factor, JudgmentConfig};
pub use leaderboard::{
    best_n, player_summary, record_stream, top_phi, MemoryRecordSource, PageQuery,
    PlayerRatingSummary, RecordFilter, RecordSource, SourceError,
};
pub use record::{natural_cmp, Direction, RatingRecord, RecordOrder, SortKey};
pub use score::{PlayOutcome, PlayResult, MAX_SCORE};
