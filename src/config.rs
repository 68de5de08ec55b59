//! アプリケーション設定管理モジュール
//!
//! XDGディレクトリを使用した設定ファイルの読み込みと検証を提供します。

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::api::gacha_log::{DEFAULT_ENDPOINT, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_INTERVAL_MS};
use crate::error::{WishError, WishResult};
use crate::models::{Category, CategoryConfig};

/// 取得設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// 祈願履歴APIのエンドポイント
    pub endpoint: String,
    /// 1ページあたりの件数
    pub page_size: usize,
    /// ページ間の待機時間（レート制限対策、リトライではない）
    pub request_interval_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            request_interval_ms: DEFAULT_REQUEST_INTERVAL_MS,
        }
    }
}

/// ログ設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// ログレベル (trace/debug/info/warn/error)
    pub log_level: String,
    /// ファイル出力先（Noneの場合は標準エラーのみ）
    pub log_dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

/// カテゴリごとのファイル名上書き
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryOverride {
    pub local_file_name: Option<String>,
    pub report_file_name: Option<String>,
}

/// アプリケーション設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// SQLiteファイル（Noneの場合はXDGデータディレクトリ）
    pub database_path: Option<PathBuf>,
    /// CSVとレポートの出力先
    pub output_dir: PathBuf,
    pub fetch: FetchConfig,
    pub log: LogConfig,
    /// キーはカテゴリ名（character/novice/weapon/standard）
    pub categories: BTreeMap<String, CategoryOverride>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            output_dir: PathBuf::from("."),
            fetch: FetchConfig::default(),
            log: LogConfig::default(),
            categories: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> WishResult<()> {
        if self.fetch.endpoint.trim().is_empty() {
            return Err(WishError::config("fetch.endpoint should be set"));
        }
        if self.fetch.page_size == 0 {
            return Err(WishError::config("fetch.page_size must be at least 1"));
        }
        Ok(())
    }

    /// 既定値に上書き設定を適用したカテゴリ設定
    pub fn category_config(&self, category: Category) -> CategoryConfig {
        let mut config = category.default_config();
        if let Some(overrides) = self.categories.get(category.as_str()) {
            if let Some(name) = &overrides.local_file_name {
                config.local_file_name = name.clone();
            }
            if let Some(name) = &overrides.report_file_name {
                config.report_file_name = name.clone();
            }
        }
        config
    }

    pub fn export_path(&self, config: &CategoryConfig) -> PathBuf {
        self.output_dir.join(&config.local_file_name)
    }

    pub fn report_path(&self, config: &CategoryConfig) -> PathBuf {
        self.output_dir.join(&config.report_file_name)
    }

    /// データベースパスを解決
    pub fn resolve_database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => crate::database::get_database_path(),
        }
    }
}

/// 設定管理マネージャー
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// XDG設定ディレクトリの config.toml を使う
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Ok(Self { config_path })
    }

    /// 任意のパスを使う
    pub fn with_path(path: impl AsRef<Path>) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("dev", "wishlog", "wishlog")
            .context("Failed to get project directories")?;

        let config_file = project_dirs.config_dir().join("config.toml");
        debug!("Config file path: {}", config_file.display());

        Ok(config_file)
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 設定を読み込み
    pub fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Config file not found, using default settings: {}",
                self.config_path.display()
            );
            return Ok(AppConfig::default());
        }

        let config_content = fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;

        let config: AppConfig = toml::from_str(&config_content).with_context(|| {
            format!(
                "Failed to parse config file: {}",
                self.config_path.display()
            )
        })?;

        config.validate()?;

        info!(
            "✅ Configuration loaded from: {}",
            self.config_path.display()
        );

        Ok(config)
    }

    /// 設定を保存
    pub fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let config_content =
            toml::to_string_pretty(config).context("Failed to serialize config")?;

        fs::write(&self.config_path, config_content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;

        info!("💾 Configuration saved to: {}", self.config_path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.fetch.page_size, 6);
        assert_eq!(config.fetch.request_interval_ms, 200);
        assert_eq!(config.log.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_uses_defaults() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));
        assert_eq!(manager.load_config()?, AppConfig::default());
        Ok(())
    }

    #[test]
    fn test_partial_toml() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
output_dir = "/tmp/wishes"

[fetch]
request_interval_ms = 500

[categories.weapon]
report_file_name = "weapon_report.txt"
"#,
        )?;

        let config = ConfigManager::with_path(&path).load_config()?;
        assert_eq!(config.output_dir, PathBuf::from("/tmp/wishes"));
        assert_eq!(config.fetch.request_interval_ms, 500);
        assert_eq!(config.fetch.page_size, 6);

        let weapon = config.category_config(Category::Weapon);
        assert_eq!(weapon.report_file_name, "weapon_report.txt");
        assert_eq!(weapon.local_file_name, "weapon_wishes.csv");
        assert_eq!(
            config.report_path(&weapon),
            PathBuf::from("/tmp/wishes/weapon_report.txt")
        );
        Ok(())
    }

    #[test]
    fn test_invalid_page_size_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "[fetch]\npage_size = 0\n")?;

        assert!(ConfigManager::with_path(&path).load_config().is_err());
        Ok(())
    }

    #[test]
    fn test_save_and_reload() -> Result<()> {
        let dir = tempdir()?;
        let manager = ConfigManager::with_path(dir.path().join("nested").join("config.toml"));

        let mut config = AppConfig::default();
        config.database_path = Some(dir.path().join("wishes.db"));
        config.categories.insert(
            "character".to_string(),
            CategoryOverride {
                local_file_name: Some("chars.csv".to_string()),
                report_file_name: None,
            },
        );
        manager.save_config(&config)?;

        assert_eq!(manager.load_config()?, config);
        Ok(())
    }
}
