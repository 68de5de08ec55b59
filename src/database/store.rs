use chrono::NaiveDateTime;

use crate::error::WishResult;
use crate::models::{Category, Rank, StoredWish, WishRecord};

/// カテゴリごとに独立した追記専用の祈願ログ
///
/// id は追記時にストアが採番し、1 から 1 件ずつ増える。更新・削除はしない。
pub trait WishStore {
    /// `records` を順に1トランザクションで保存し、書き込んだ件数を返す
    /// （空スライスは何もしない）
    fn append(&mut self, category: Category, records: &[WishRecord]) -> WishResult<usize>;

    /// 最後に追記したレコードの時刻（ウォーターマーク）
    fn max_time(&self, category: Category) -> WishResult<Option<NaiveDateTime>>;

    /// 最初に追記したレコードの時刻
    fn min_time(&self, category: Category) -> WishResult<Option<NaiveDateTime>>;

    /// 採番済みの最大id（空なら0）
    fn total_count(&self, category: Category) -> WishResult<i64>;

    fn count_by_rank(&self, category: Category, rank: Rank) -> WishResult<i64>;

    /// `rank` の全レコードの `(id, name)`（id昇順）
    fn list_by_rank(&self, category: Category, rank: Rank) -> WishResult<Vec<(i64, String)>>;

    fn all_records(&self, category: Category) -> WishResult<Vec<StoredWish>>;

    /// 時刻が `time` と完全一致する保存済みレコード数
    fn count_at_time(&self, category: Category, time: &NaiveDateTime) -> WishResult<i64>;
}
