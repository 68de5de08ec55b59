//! 祈願履歴APIクライアント（カーソルページング）
//!
//! APIは履歴を新しい順・固定件数のページで返す。各リクエストは直前ページ末尾の
//! id（`end_id`）を持ち、要求件数に満たないページが履歴の終端となる。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::api::query::AuthParams;
use crate::config::FetchConfig;
use crate::error::{WishError, WishResult};
use crate::models::{parse_time, Rank, WishRecord};

pub const DEFAULT_ENDPOINT: &str = "https://hk4e-api.mihoyo.com/event/gacha_info/api/getGachaLog";
pub const DEFAULT_PAGE_SIZE: usize = 6;
pub const DEFAULT_REQUEST_INTERVAL_MS: u64 = 200;

/// APIレスポンス上の1レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawWish {
    pub id: String,
    pub item_type: String,
    pub name: String,
    pub rank_type: String,
    pub time: String,
}

impl RawWish {
    pub fn to_record(&self) -> WishResult<WishRecord> {
        let rank = self.rank_type.parse::<Rank>().map_err(|e| {
            WishError::malformed(format!("remote record {}", self.id), e.to_string())
        })?;
        let time = parse_time(&self.time).map_err(|e| {
            WishError::malformed(format!("remote record {}", self.id), e.to_string())
        })?;

        Ok(WishRecord {
            item_type: self.item_type.clone(),
            name: self.name.clone(),
            rank,
            time,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GachaLogResponse {
    pub message: String,
    #[serde(default)]
    pub data: Option<GachaLogPage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GachaLogPage {
    #[serde(default)]
    pub list: Vec<RawWish>,
}

impl GachaLogResponse {
    pub fn is_ok(&self) -> bool {
        self.message.eq_ignore_ascii_case("ok")
    }

    /// OK以外のメッセージ、またはdata欠落はアップストリームエラー
    pub fn into_list(self) -> WishResult<Vec<RawWish>> {
        if !self.is_ok() {
            return Err(WishError::upstream(self.message));
        }
        self.data
            .map(|page| page.list)
            .ok_or_else(|| WishError::upstream("response has no data field"))
    }
}

/// ページングカーソル（直前ページ末尾のid）
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndId(pub String);

impl Default for EndId {
    fn default() -> Self {
        EndId("0".to_string())
    }
}

/// gacha_type 単位の祈願履歴の取得元
#[async_trait]
pub trait WishSource: Send + Sync {
    /// 全履歴を新しい順で取得
    async fn fetch_history(&self, gacha_type: &str) -> WishResult<Vec<RawWish>>;
}

#[derive(Debug, Clone)]
pub struct GachaLogClient {
    pub endpoint: String,
    pub auth: AuthParams,
    pub page_size: usize,
    pub request_interval: Duration,
    pub http_client: reqwest::Client,
}

impl GachaLogClient {
    pub fn new(auth: AuthParams, config: &FetchConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            auth,
            page_size: config.page_size,
            request_interval: Duration::from_millis(config.request_interval_ms),
            http_client: reqwest::Client::new(),
        }
    }

    pub async fn fetch_page(
        &self,
        gacha_type: &str,
        page: u32,
        end_id: &EndId,
    ) -> WishResult<Vec<RawWish>> {
        let mut query: Vec<(&str, String)> = self
            .auth
            .pairs()
            .iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect();
        query.push(("gacha_type", gacha_type.to_string()));
        query.push(("page", page.to_string()));
        query.push(("size", self.page_size.to_string()));
        query.push(("end_id", end_id.to_string()));

        tracing::debug!(
            gacha_type = gacha_type,
            page = page,
            end_id = %end_id,
            "📡 Requesting gacha log page"
        );

        let response = self
            .http_client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("❌ HTTP request failed: {}", e);
                e
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("❌ Gacha log request failed with status: {}", status);
            return Err(WishError::Network {
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let payload: GachaLogResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("❌ Failed to parse JSON response: {}", e);
            tracing::debug!(
                "🔍 Response text preview: {}",
                body.chars().take(200).collect::<String>()
            );
            e
        })?;

        if !payload.is_ok() {
            tracing::error!("❌ Upstream returned message: {}", payload.message);
        }
        payload.into_list()
    }
}

#[async_trait]
impl WishSource for GachaLogClient {
    async fn fetch_history(&self, gacha_type: &str) -> WishResult<Vec<RawWish>> {
        let mut wishes = Vec::new();
        let mut page = 1u32;
        let mut end_id = EndId::default();

        loop {
            let list = self.fetch_page(gacha_type, page, &end_id).await?;
            let received = list.len();
            let last_id = list.last().map(|w| EndId(w.id.clone()));
            wishes.extend(list);

            if received < self.page_size {
                break;
            }
            let Some(next) = last_id else {
                break;
            };

            end_id = next;
            page += 1;
            tokio::time::sleep(self.request_interval).await;
        }

        tracing::info!(
            gacha_type = gacha_type,
            pages = page,
            records = wishes.len(),
            "✅ Gacha log drained"
        );
        Ok(wishes)
    }
}
