//! カテゴリ単位の祈願履歴のCSV入出力
//!
//! ヘッダーは `item_type,name,rank_type,time`、時系列順に1行1レコード（id列なし）。
//! 区切り文字・引用符・改行を含むフィールドは引用符で囲み、内部の引用符は二重にする。

use std::fs;
use std::path::Path;

use crate::error::{WishError, WishResult};
use crate::models::{format_time, parse_time, Rank, WishRecord};

pub const CSV_HEADER: [&str; 4] = ["item_type", "name", "rank_type", "time"];
const DELIMITER: char = ',';

/// CSVフィールドをエスケープ
fn escape_csv_field(field: &str) -> String {
    if field.contains(DELIMITER) || field.contains('"') || field.contains('\n') || field.contains('\r')
    {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn record_to_csv_row(record: &WishRecord) -> String {
    let fields = [
        escape_csv_field(&record.item_type),
        escape_csv_field(&record.name),
        record.rank.to_string(),
        format_time(&record.time),
    ];
    fields.join(&DELIMITER.to_string())
}

pub fn to_csv_string(records: &[WishRecord]) -> String {
    let mut output = CSV_HEADER.join(&DELIMITER.to_string());
    output.push('\n');
    for record in records {
        output.push_str(&record_to_csv_row(record));
        output.push('\n');
    }
    output
}

pub fn write_wishes(path: &Path, records: &[WishRecord]) -> WishResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, to_csv_string(records))?;

    tracing::info!(
        path = %path.display(),
        records = records.len(),
        "📝 Wishes exported to CSV"
    );
    Ok(())
}

/// CSVテキストを行ごとのフィールドに分割（引用符内の区切り文字・改行に対応）
///
/// 戻り値は `(行番号, フィールド)` の一覧。
fn split_rows(content: &str) -> WishResult<Vec<(usize, Vec<String>)>> {
    let mut rows = Vec::new();
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut row_start = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() => in_quotes = true,
            DELIMITER => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                rows.push((row_start, std::mem::take(&mut fields)));
                line += 1;
                row_start = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(WishError::malformed(
            format!("line {}", row_start),
            "unterminated quoted field",
        ));
    }
    if !field.is_empty() || !fields.is_empty() {
        fields.push(field);
        rows.push((row_start, fields));
    }

    Ok(rows)
}

pub fn parse_csv(content: &str) -> WishResult<Vec<WishRecord>> {
    let mut rows = split_rows(content)?
        .into_iter()
        .filter(|(_, fields)| !(fields.len() == 1 && fields[0].trim().is_empty()));

    let Some((_, header)) = rows.next() else {
        return Ok(Vec::new());
    };
    if header.iter().map(|h| h.trim()).ne(CSV_HEADER) {
        return Err(WishError::malformed(
            "line 1",
            format!("expected header '{}'", CSV_HEADER.join(",")),
        ));
    }

    rows.map(|(line, fields)| {
        let context = format!("line {}", line);
        let [item_type, name, rank_type, time]: [String; 4] = fields.try_into().map_err(
            |fields: Vec<String>| {
                WishError::malformed(&context, format!("expected 4 columns, got {}", fields.len()))
            },
        )?;

        let rank: Rank = rank_type
            .parse()
            .map_err(|e: WishError| WishError::malformed(&context, e.to_string()))?;
        let time = parse_time(&time).map_err(|e| WishError::malformed(&context, e.to_string()))?;

        Ok(WishRecord {
            item_type,
            name,
            rank,
            time,
        })
    })
    .collect()
}

pub fn read_wishes(path: &Path) -> WishResult<Vec<WishRecord>> {
    let content = fs::read_to_string(path)?;
    let records = parse_csv(&content)?;

    tracing::debug!(
        path = %path.display(),
        records = records.len(),
        "CSV export loaded"
    );
    Ok(records)
}
