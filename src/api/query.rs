//! 祈願履歴URLから認証パラメータを抽出する
//!
//! ゲームクライアントが開く履歴ページのクエリのうち、下記の識別フィールドだけを
//! APIへ転送する。

use std::collections::HashMap;
use url::Url;

use crate::error::{WishError, WishResult};

/// 各ページリクエストにそのまま転送するキー
pub const AUTH_KEYS: [&str; 13] = [
    "authkey_ver",
    "sign_type",
    "auth_appid",
    "init_type",
    "gacha_id",
    "timestamp",
    "lang",
    "device_type",
    "ext",
    "game_version",
    "region",
    "authkey",
    "game_biz",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthParams {
    pairs: Vec<(String, String)>,
}

impl AuthParams {
    /// URLからクエリを抽出して検証
    pub fn from_url(raw: &str) -> WishResult<Self> {
        let url = Url::parse(raw.trim())
            .map_err(|e| WishError::validation(format!("cannot parse URL: {}", e)))?;

        let query: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if query.is_empty() {
            return Err(WishError::validation("URL has no query string"));
        }

        let mut pairs = Vec::with_capacity(AUTH_KEYS.len());
        for key in AUTH_KEYS {
            let value = query
                .get(key)
                .ok_or_else(|| WishError::validation(format!("missing parameter '{}'", key)))?;
            pairs.push((key.to_string(), value.clone()));
        }

        let params = Self { pairs };
        if params.get("authkey").is_some_and(|v| v.trim().is_empty()) {
            return Err(WishError::validation("authkey is empty"));
        }

        tracing::debug!(
            region = params.get("region").unwrap_or_default(),
            lang = params.get("lang").unwrap_or_default(),
            "🔑 Auth parameters extracted"
        );

        Ok(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}
