pub mod report;
pub mod wish_stats;

pub use report::{render_report, write_report};
pub use wish_stats::{RankedWish, WishStatistics};
