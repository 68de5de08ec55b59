//! 取得・保存・取り込み・レポート出力で共通のエラー型

use thiserror::Error;

/// 取り込み・分析で発生するエラー
///
/// いずれもその場では回復せず呼び出し元へ伝播する。取得済みで未追記のデータは破棄される。
#[derive(Error, Debug)]
pub enum WishError {
    /// カテゴリ設定の必須項目が未設定
    #[error("Configuration error: {0}")]
    Config(String),

    /// 祈願履歴URLが不正、または認証パラメータが不足
    #[error("Invalid source URL: {0}")]
    Validation(String),

    /// HTTPステータスが成功以外
    #[error("Request failed with status {status}")]
    Network { status: u16 },

    /// 通信は成功したが message が OK 以外
    #[error("Upstream rejected the request: {message}")]
    Upstream { message: String },

    /// 存在しない取り込み元が指定された
    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    /// APIレスポンスまたはCSVのレコードを解釈できない
    #[error("Malformed record in {context}: {reason}")]
    MalformedRecord { context: String, reason: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WishError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn malformed(context: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            context: context.into(),
            reason: reason.into(),
        }
    }
}

pub type WishResult<T> = Result<T, WishError>;
