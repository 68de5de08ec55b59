//! 取得 → 時系列順に並べ替え → ウォーターマークで絞り込み → 追記（カテゴリ単位）

pub mod dedup;
pub mod pipeline;

pub use dedup::{filter_new, into_chronological, ties_at_watermark, unseen_at_watermark};
pub use pipeline::{
    append_new, backfill, watermark_collision, DataSourceKind, IngestOptions, IngestOutcome,
    IngestPipeline,
};
