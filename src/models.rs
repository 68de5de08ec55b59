use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{WishError, WishResult};

/// 保存・比較に使う時刻フォーマット（秒精度）
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn parse_time(value: &str) -> WishResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), TIME_FORMAT)
        .map_err(|e| WishError::malformed("time", format!("'{}': {}", value, e)))
}

pub fn format_time(time: &NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// 祈願の種類（カテゴリごとに独立したログとウォーターマークを持つ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Character,
    Novice,
    Weapon,
    Standard,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Character,
        Category::Novice,
        Category::Weapon,
        Category::Standard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Character => "character",
            Category::Novice => "novice",
            Category::Weapon => "weapon",
            Category::Standard => "standard",
        }
    }

    /// カテゴリ→テーブル名の対応表
    pub fn table_name(&self) -> &'static str {
        match self {
            Category::Character => "character_wishes",
            Category::Novice => "novice_wishes",
            Category::Weapon => "weapon_wishes",
            Category::Standard => "standard_wishes",
        }
    }

    /// リモートAPIの gacha_type
    pub fn remote_type_code(&self) -> &'static str {
        match self {
            Category::Character => "301",
            Category::Novice => "100",
            Category::Weapon => "302",
            Category::Standard => "200",
        }
    }

    /// 既定のカテゴリ設定
    pub fn default_config(&self) -> CategoryConfig {
        CategoryConfig {
            remote_type_code: self.remote_type_code().to_string(),
            local_file_name: format!("{}_wishes.csv", self.as_str()),
            report_file_name: format!("{}_analysis.txt", self.as_str()),
            table_name: self.table_name().to_string(),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = WishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" => Ok(Category::Character),
            "novice" => Ok(Category::Novice),
            "weapon" => Ok(Category::Weapon),
            "standard" => Ok(Category::Standard),
            other => Err(WishError::config(format!("unknown category '{}'", other))),
        }
    }
}

/// カテゴリごとの設定レコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub remote_type_code: String,
    pub local_file_name: String,
    pub report_file_name: String,
    pub table_name: String,
}

impl CategoryConfig {
    /// 全フィールドが設定済みか検証
    pub fn validate(&self) -> WishResult<()> {
        let fields = [
            ("remote_type_code", &self.remote_type_code),
            ("local_file_name", &self.local_file_name),
            ("report_file_name", &self.report_file_name),
            ("table_name", &self.table_name),
        ];

        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(WishError::config(format!("{} should be set", name)));
            }
        }

        Ok(())
    }
}

/// レアリティ（3/4/5 の3段階のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rank {
    Three = 3,
    Four = 4,
    Five = 5,
}

impl Rank {
    pub fn value(&self) -> i64 {
        *self as i64
    }
}

impl TryFrom<i64> for Rank {
    type Error = WishError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            3 => Ok(Rank::Three),
            4 => Ok(Rank::Four),
            5 => Ok(Rank::Five),
            other => Err(WishError::malformed(
                "rank_type",
                format!("unknown rank_type {}", other),
            )),
        }
    }
}

impl FromStr for Rank {
    type Err = WishError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| WishError::malformed("rank_type", format!("'{}' is not a number", s)))?;
        Rank::try_from(value)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// 祈願1回分のレコード
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishRecord {
    pub item_type: String,
    pub name: String,
    pub rank: Rank,
    pub time: NaiveDateTime,
}

impl WishRecord {
    pub fn new(
        item_type: impl Into<String>,
        name: impl Into<String>,
        rank: Rank,
        time: NaiveDateTime,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            name: name.into(),
            rank,
            time,
        }
    }
}

/// ストアに永続化済みのレコード（id はストアが採番）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredWish {
    pub id: i64,
    pub wish: WishRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_dispatch_table() {
        for category in Category::ALL {
            let config = category.default_config();
            assert!(config.validate().is_ok());
            assert_eq!(config.table_name, category.table_name());
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }

        assert_eq!(Category::Character.remote_type_code(), "301");
        assert_eq!(Category::Weapon.remote_type_code(), "302");
        assert_eq!(Category::Standard.remote_type_code(), "200");
        assert_eq!(Category::Novice.remote_type_code(), "100");
    }

    #[test]
    fn test_unknown_category() {
        let result = "event".parse::<Category>();
        assert!(matches!(result, Err(WishError::Config(_))));
    }

    #[test]
    fn test_category_config_validation() {
        let mut config = Category::Weapon.default_config();
        config.report_file_name = String::new();

        match config.validate() {
            Err(WishError::Config(message)) => assert!(message.contains("report_file_name")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_rank_parsing() {
        assert_eq!("5".parse::<Rank>().unwrap(), Rank::Five);
        assert_eq!(" 4 ".parse::<Rank>().unwrap(), Rank::Four);
        assert_eq!(Rank::try_from(3).unwrap(), Rank::Three);
        assert!("6".parse::<Rank>().is_err());
        assert!("five".parse::<Rank>().is_err());
        assert_eq!(Rank::Five.value(), 5);
    }

    #[test]
    fn test_time_format() {
        let time = parse_time("2021-03-02 18:04:59").unwrap();
        assert_eq!(format_time(&time), "2021-03-02 18:04:59");
        assert!(parse_time("2021/03/02").is_err());
    }
}
