use chrono::NaiveDateTime;

use crate::api::gacha_log::RawWish;
use crate::error::WishResult;
use crate::models::WishRecord;

/// 新しい順のバッチを時系列順のレコードに変換
///
/// 解釈できないレコードがあればその時点で失敗し、何も返さない。
pub fn into_chronological(raw: Vec<RawWish>) -> WishResult<Vec<WishRecord>> {
    raw.iter().rev().map(RawWish::to_record).collect()
}

/// 保存済みウォーターマークより厳密に新しいレコードだけを順序を保って残す
///
/// 時刻は秒精度のため、ウォーターマークと同じ秒の新規レコードは保存済みと区別できず
/// 落とされる。`ties_at_watermark` でこのケースを検出できる。
pub fn filter_new(batch: Vec<WishRecord>, watermark: Option<NaiveDateTime>) -> Vec<WishRecord> {
    match watermark {
        None => batch,
        Some(watermark) => batch
            .into_iter()
            .filter(|record| record.time > watermark)
            .collect(),
    }
}

/// `batch` 中でウォーターマークと同時刻のレコード数
pub fn ties_at_watermark(batch: &[WishRecord], watermark: &NaiveDateTime) -> usize {
    batch.iter().filter(|record| &record.time == watermark).count()
}

/// ウォーターマークと同じ秒で取りこぼされる件数
///
/// バッチ側の件数が保存済み件数を上回った分だけが未保存のレコード。
/// 同数以下なら取りこぼしはない。
pub fn unseen_at_watermark(ties: usize, stored: i64) -> usize {
    ties.saturating_sub(usize::try_from(stored).unwrap_or(0))
}
