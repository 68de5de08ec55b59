//! カテゴリ単位の分析レポート（テキスト）

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;

use super::wish_stats::{RankedWish, WishStatistics};
use crate::error::WishResult;
use crate::models::format_time;

fn format_date(date: &Option<NaiveDateTime>) -> String {
    date.as_ref().map(format_time).unwrap_or_else(|| "-".to_string())
}

fn push_list(output: &mut String, heading: &str, list: &[RankedWish]) {
    output.push_str("\n\n");
    output.push_str(heading);
    output.push('\n');
    for item in list {
        output.push_str(&format!("{} ({}), ", item.name, item.id));
    }
}

pub fn render_report(title: &str, stats: &WishStatistics) -> String {
    let mut output = format!(
        "Wish history analysis ({}) {} ~ {}\n\n",
        title,
        format_date(&stats.from_date),
        format_date(&stats.to_date)
    );

    output.push_str(&format!("Total: {} wishes\n", stats.total));
    output.push_str("|5-star\t|4-star\t|3-star\t|\n");
    output.push_str(&format!(
        "|{}  \t|{}  \t|{}  \t|\n",
        stats.five_count, stats.four_count, stats.three_count
    ));
    output.push_str(&format!(
        "|{:?}%\t|{:?}%\t|{:?}%\t|\n\n",
        stats.five_percent, stats.four_percent, stats.three_percent
    ));
    output.push_str(&format!(
        "On average {:?} wishes per 5-star, {:?} wishes per 4-star\n",
        stats.five_avg, stats.four_avg
    ));
    output.push_str(&format!(
        "{} wishes since last 5-star, {} wishes since last 4-star",
        stats.five_pity, stats.four_pity
    ));

    if stats.five_count > 0 {
        push_list(&mut output, "5-star list:", &stats.five_list);
    }
    if stats.four_count > 0 {
        push_list(&mut output, "4-star list:", &stats.four_list);
    }

    output
}

pub fn write_report(path: &Path, title: &str, stats: &WishStatistics) -> WishResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, render_report(title, stats))?;

    tracing::info!(path = %path.display(), "📊 Analysis report written");
    Ok(())
}
