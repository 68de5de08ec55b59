use chrono::NaiveDateTime;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::api::gacha_log::WishSource;
use crate::config::AppConfig;
use crate::database::WishStore;
use crate::error::{WishError, WishResult};
use crate::ingest::dedup::{filter_new, into_chronological, ties_at_watermark, unseen_at_watermark};
use crate::io::csv::{read_wishes, write_wishes};
use crate::models::{Category, WishRecord};

/// 追記元の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceKind {
    /// 祈願履歴APIから取得したばかりのバッチ
    Remote,
    /// 以前にエクスポートしたCSV
    Csv,
}

impl FromStr for DataSourceKind {
    type Err = WishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remote" | "api" => Ok(DataSourceKind::Remote),
            "csv" => Ok(DataSourceKind::Csv),
            other => Err(WishError::UnknownSource(other.to_string())),
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKind::Remote => f.write_str("remote"),
            DataSourceKind::Csv => f.write_str("csv"),
        }
    }
}

/// 取得結果をどこへ書き出すか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    /// 取得したバッチをCSVに書き出す
    pub export: bool,
    /// ストアに追記する
    pub persist: bool,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            export: true,
            persist: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    pub category: Category,
    /// 取得（または読み込み）したレコード数
    pub fetched: usize,
    /// 新たに追記したレコード数
    pub appended: usize,
    pub export_path: Option<PathBuf>,
}

/// 取得元とストアを組み合わせ、カテゴリ単位で取り込みを行う
pub struct IngestPipeline<S, D> {
    source: S,
    store: D,
    config: AppConfig,
}

impl<S, D> IngestPipeline<S, D>
where
    S: WishSource,
    D: WishStore,
{
    pub fn new(source: S, store: D, config: AppConfig) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    pub fn store(&self) -> &D {
        &self.store
    }

    pub fn into_store(self) -> D {
        self.store
    }

    /// `category` の全履歴を取得し、新しい分だけ追記する
    ///
    /// ストアに触れるのは全履歴の取得後。取得に失敗した場合ストアは変化しない。
    pub async fn run(
        &mut self,
        category: Category,
        options: IngestOptions,
    ) -> WishResult<IngestOutcome> {
        let category_config = self.config.category_config(category);
        category_config.validate()?;

        tracing::info!(category = %category, "🎬 Starting ingestion");

        let raw = self
            .source
            .fetch_history(&category_config.remote_type_code)
            .await?;
        let batch = into_chronological(raw)?;
        let fetched = batch.len();

        let export_path = if options.export {
            let path = self.config.export_path(&category_config);
            write_wishes(&path, &batch)?;
            Some(path)
        } else {
            None
        };

        let appended = if options.persist {
            append_new(&mut self.store, category, batch)?
        } else {
            0
        };

        tracing::info!(
            category = %category,
            fetched = fetched,
            appended = appended,
            "✅ Ingestion finished"
        );

        Ok(IngestOutcome {
            category,
            fetched,
            appended,
            export_path,
        })
    }

    /// エクスポート済みCSVを同じウォーターマーク絞り込みで取り込み直す
    pub fn backfill(&mut self, category: Category, path: Option<&Path>) -> WishResult<IngestOutcome> {
        backfill(&mut self.store, &self.config, category, path)
    }

    pub async fn ingest(
        &mut self,
        category: Category,
        kind: DataSourceKind,
        options: IngestOptions,
        path: Option<&Path>,
    ) -> WishResult<IngestOutcome> {
        match kind {
            DataSourceKind::Remote => self.run(category, options).await,
            DataSourceKind::Csv => self.backfill(category, path),
        }
    }
}

/// 保存済みウォーターマークで絞り込み、新しいレコードだけを追記する
///
/// 同じ秒のレコードが取りこぼされる場合は警告を出し、その件数を返す。
pub fn append_new<D>(store: &mut D, category: Category, batch: Vec<WishRecord>) -> WishResult<usize>
where
    D: WishStore + ?Sized,
{
    let watermark = store.max_time(category)?;

    if let Some(watermark) = &watermark {
        let unseen = watermark_collision(store, category, &batch, watermark)?;
        if unseen > 0 {
            tracing::warn!(
                category = %category,
                watermark = %watermark,
                skipped = unseen,
                "⚠️ Records share the watermark second; newer ones at that second are skipped"
            );
        }
    }

    let fresh = filter_new(batch, watermark);
    tracing::debug!(category = %category, fresh = fresh.len(), "Watermark filter applied");

    store.append(category, &fresh)
}

/// ウォーターマークと同じ秒で取りこぼされる件数（0なら警告不要）
pub fn watermark_collision<D>(
    store: &D,
    category: Category,
    batch: &[WishRecord],
    watermark: &NaiveDateTime,
) -> WishResult<usize>
where
    D: WishStore + ?Sized,
{
    let ties = ties_at_watermark(batch, watermark);
    if ties == 0 {
        return Ok(0);
    }
    let stored = store.count_at_time(category, watermark)?;
    Ok(unseen_at_watermark(ties, stored))
}

/// CSVエクスポートからストアへ追記（パス省略時は設定上のエクスポート先）
pub fn backfill<D>(
    store: &mut D,
    config: &AppConfig,
    category: Category,
    path: Option<&Path>,
) -> WishResult<IngestOutcome>
where
    D: WishStore + ?Sized,
{
    let category_config = config.category_config(category);
    category_config.validate()?;

    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.export_path(&category_config));

    tracing::info!(category = %category, path = %path.display(), "📂 Backfilling from CSV");

    let batch = read_wishes(&path)?;
    let fetched = batch.len();
    let appended = append_new(store, category, batch)?;

    Ok(IngestOutcome {
        category,
        fetched,
        appended,
        export_path: None,
    })
}
