use chrono::NaiveDateTime;
use rusqlite::{params, OptionalExtension};

use super::{WishDatabase, WishStore};
use crate::error::{WishError, WishResult};
use crate::models::{format_time, parse_time, Category, Rank, StoredWish, WishRecord};

impl WishDatabase {
    /// id順で先頭または末尾の時刻を取得
    fn edge_time(&self, category: Category, order: &str) -> WishResult<Option<NaiveDateTime>> {
        let sql = format!(
            "SELECT time FROM {} ORDER BY id {} LIMIT 1",
            category.table_name(),
            order
        );

        let time: Option<String> = self
            .connection
            .query_row(&sql, [], |row| row.get(0))
            .optional()?;

        time.map(|t| parse_time(&t)).transpose()
    }
}

impl WishStore for WishDatabase {
    fn append(&mut self, category: Category, records: &[WishRecord]) -> WishResult<usize> {
        if records.is_empty() {
            tracing::debug!(category = %category, "Nothing to append");
            return Ok(0);
        }

        let sql = format!(
            "INSERT INTO {} (item_type, name, rank_type, time) VALUES (?1, ?2, ?3, ?4)",
            category.table_name()
        );

        // 途中で失敗した場合はロールバックされ、1件も残らない
        let tx = self.connection.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(params![
                    record.item_type,
                    record.name,
                    record.rank.value(),
                    format_time(&record.time),
                ])?;
            }
        }
        tx.commit()?;

        tracing::info!(
            category = %category,
            appended = records.len(),
            "💾 Wishes appended"
        );
        Ok(records.len())
    }

    fn max_time(&self, category: Category) -> WishResult<Option<NaiveDateTime>> {
        self.edge_time(category, "DESC")
    }

    fn min_time(&self, category: Category) -> WishResult<Option<NaiveDateTime>> {
        self.edge_time(category, "ASC")
    }

    fn total_count(&self, category: Category) -> WishResult<i64> {
        let sql = format!("SELECT COALESCE(MAX(id), 0) FROM {}", category.table_name());
        let total: i64 = self.connection.query_row(&sql, [], |row| row.get(0))?;
        Ok(total)
    }

    fn count_by_rank(&self, category: Category, rank: Rank) -> WishResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE rank_type = ?1",
            category.table_name()
        );
        let count: i64 = self
            .connection
            .query_row(&sql, params![rank.value()], |row| row.get(0))?;
        Ok(count)
    }

    fn list_by_rank(&self, category: Category, rank: Rank) -> WishResult<Vec<(i64, String)>> {
        let sql = format!(
            "SELECT id, name FROM {} WHERE rank_type = ?1 ORDER BY id ASC",
            category.table_name()
        );

        let mut stmt = self.connection.prepare(&sql)?;
        let wish_iter = stmt.query_map(params![rank.value()], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut wishes = Vec::new();
        for wish in wish_iter {
            wishes.push(wish?);
        }

        Ok(wishes)
    }

    fn all_records(&self, category: Category) -> WishResult<Vec<StoredWish>> {
        let sql = format!(
            "SELECT id, item_type, name, rank_type, time FROM {} ORDER BY id ASC",
            category.table_name()
        );

        let mut stmt = self.connection.prepare(&sql)?;
        let row_iter = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>("id")?,
                row.get::<_, String>("item_type")?,
                row.get::<_, String>("name")?,
                row.get::<_, i64>("rank_type")?,
                row.get::<_, String>("time")?,
            ))
        })?;

        let mut wishes = Vec::new();
        for row in row_iter {
            let (id, item_type, name, rank_type, time) = row?;
            let rank = Rank::try_from(rank_type).map_err(|e| {
                WishError::malformed(format!("{} row {}", category.table_name(), id), e.to_string())
            })?;
            wishes.push(StoredWish {
                id,
                wish: WishRecord {
                    item_type,
                    name,
                    rank,
                    time: parse_time(&time)?,
                },
            });
        }

        Ok(wishes)
    }

    fn count_at_time(&self, category: Category, time: &NaiveDateTime) -> WishResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM {} WHERE time = ?1",
            category.table_name()
        );
        let count: i64 = self
            .connection
            .query_row(&sql, params![format_time(time)], |row| row.get(0))?;
        Ok(count)
    }
}
