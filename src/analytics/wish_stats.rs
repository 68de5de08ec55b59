use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::database::WishStore;
use crate::error::WishResult;
use crate::models::{Category, Rank};

/// 星4・星5の1件（id は祈願の通し番号）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankedWish {
    pub id: i64,
    pub name: String,
}

impl From<(i64, String)> for RankedWish {
    fn from((id, name): (i64, String)) -> Self {
        Self { id, name }
    }
}

/// カテゴリ単位の祈願統計
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct WishStatistics {
    /// 総祈願数
    pub total: i64,
    /// 星5件数
    pub five_count: i64,
    /// 星4件数
    pub four_count: i64,
    /// 星3件数（総数から星5・星4を引いたもの）
    pub three_count: i64,
    /// 星5割合（%、小数2桁）
    pub five_percent: f64,
    pub four_percent: f64,
    pub three_percent: f64,
    /// 星5が出るまでの平均回数（小数1桁）
    pub five_avg: f64,
    pub four_avg: f64,
    /// 最後の星5以降の回数
    pub five_pity: i64,
    /// 最後の星4以降の回数
    pub four_pity: i64,
    /// 星5一覧（id昇順）
    pub five_list: Vec<RankedWish>,
    /// 星4一覧（id昇順）
    pub four_list: Vec<RankedWish>,
    /// 最初の記録時刻
    pub from_date: Option<NaiveDateTime>,
    /// 最後の記録時刻
    pub to_date: Option<NaiveDateTime>,
}

fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round_ties_even() / factor
}

fn percent(count: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * count as f64 / total as f64, 2)
}

/// (平均回数, 天井カウント)
fn interval_stats(total: i64, hits: &[RankedWish]) -> (f64, i64) {
    match hits.last() {
        Some(last) => (
            round_to(last.id as f64 / hits.len() as f64, 1),
            total - last.id,
        ),
        None => (0.0, total),
    }
}

impl WishStatistics {
    /// 永続化済みログから統計を計算
    pub fn compute<S: WishStore + ?Sized>(store: &S, category: Category) -> WishResult<Self> {
        let total = store.total_count(category)?;
        let from_date = store.min_time(category)?;
        let to_date = store.max_time(category)?;
        let five_list = store.list_by_rank(category, Rank::Five)?;
        let four_list = store.list_by_rank(category, Rank::Four)?;

        let stats = Self::from_log(
            total,
            five_list.into_iter().map(RankedWish::from).collect(),
            four_list.into_iter().map(RankedWish::from).collect(),
            from_date,
            to_date,
        );

        tracing::debug!(
            category = %category,
            total = stats.total,
            five = stats.five_count,
            four = stats.four_count,
            "Statistics computed"
        );
        Ok(stats)
    }

    pub fn from_log(
        total: i64,
        five_list: Vec<RankedWish>,
        four_list: Vec<RankedWish>,
        from_date: Option<NaiveDateTime>,
        to_date: Option<NaiveDateTime>,
    ) -> Self {
        let five_count = five_list.len() as i64;
        let four_count = four_list.len() as i64;
        let three_count = total - five_count - four_count;

        let (five_avg, five_pity) = interval_stats(total, &five_list);
        let (four_avg, four_pity) = interval_stats(total, &four_list);

        Self {
            total,
            five_count,
            four_count,
            three_count,
            five_percent: percent(five_count, total),
            four_percent: percent(four_count, total),
            three_percent: percent(three_count, total),
            five_avg,
            four_avg,
            five_pity,
            four_pity,
            five_list,
            four_list,
            from_date,
            to_date,
        }
    }
}
