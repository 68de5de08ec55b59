pub mod analytics;
pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod ingest;
pub mod io;
pub mod models;
pub mod utils;

// Re-export the main error types for convenience
pub use error::{WishError, WishResult};

// Re-export the domain model
pub use models::{Category, CategoryConfig, Rank, StoredWish, WishRecord};

// Re-export the gacha log client
pub use api::gacha_log::{GachaLogClient, RawWish, WishSource};
pub use api::query::AuthParams;

// Re-export storage, ingestion and analytics
pub use analytics::{render_report, write_report, WishStatistics};
pub use config::{AppConfig, ConfigManager};
pub use database::{WishDatabase, WishStore};
pub use ingest::{DataSourceKind, IngestOptions, IngestOutcome, IngestPipeline};
