use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use wishlog::{
    analytics::{render_report, write_report, WishStatistics},
    api::{gacha_log::GachaLogClient, query::AuthParams},
    config::{AppConfig, ConfigManager},
    database::{WishDatabase, WishStore},
    ingest::{self, DataSourceKind, IngestOptions, IngestPipeline},
    io::write_wishes,
    models::{Category, WishRecord},
    utils,
};

/// 原神の祈願履歴を取得・蓄積・分析するCLI
#[derive(Parser)]
#[command(name = "wishlog", version, about = "Genshin Impact wish history logger")]
struct Cli {
    /// 設定ファイル（省略時はXDG設定ディレクトリの config.toml）
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLiteデータベースファイル（設定より優先）
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct CategorySelection {
    /// カテゴリ（character / novice / weapon / standard）
    #[arg(long)]
    category: Option<Category>,

    /// 全カテゴリを対象にする
    #[arg(long)]
    all: bool,
}

impl CategorySelection {
    fn categories(&self) -> Vec<Category> {
        match self.category {
            Some(category) if !self.all => vec![category],
            _ => Category::ALL.to_vec(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 祈願履歴APIから取得し、新しい分だけ追記する
    Fetch {
        /// ゲーム内の祈願履歴ページのURL（authkey を含む）
        #[arg(long)]
        url: String,

        #[command(flatten)]
        target: CategorySelection,

        /// CSVエクスポートを行わない
        #[arg(long)]
        no_export: bool,

        /// データベースに書き込まない
        #[arg(long)]
        no_store: bool,
    },

    /// エクスポート済みCSVから追記する
    Backfill {
        #[arg(long)]
        category: Category,

        #[arg(long, default_value = "csv")]
        source: String,

        /// 省略時は設定上のエクスポート先
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// 統計を計算してレポートを書き出す
    Analyze {
        #[command(flatten)]
        target: CategorySelection,

        /// ファイルではなく標準出力に出す
        #[arg(long)]
        stdout: bool,
    },

    /// 保存済みの履歴をCSVに書き出す
    Export {
        #[arg(long)]
        category: Category,

        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };
    let mut config = manager.load_config()?;

    if let Some(database) = &cli.database {
        config.database_path = Some(database.clone());
    }
    Ok(config)
}

fn open_database(config: &AppConfig) -> Result<WishDatabase> {
    let path = config.resolve_database_path()?;
    tracing::debug!("🗄️ Opening database: {}", path.display());
    WishDatabase::new(&path)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

async fn fetch(
    config: AppConfig,
    url: &str,
    categories: Vec<Category>,
    options: IngestOptions,
) -> Result<()> {
    let auth = AuthParams::from_url(url)?;
    let client = GachaLogClient::new(auth, &config.fetch);
    let database = open_database(&config)?;
    let mut pipeline = IngestPipeline::new(client, database, config);

    for category in categories {
        let outcome = pipeline
            .run(category, options)
            .await
            .with_context(|| format!("Failed to ingest {} wishes", category))?;

        println!(
            "{}: fetched {}, appended {}",
            category, outcome.fetched, outcome.appended
        );
        if let Some(path) = outcome.export_path {
            println!("  exported to {}", path.display());
        }
    }
    Ok(())
}

fn backfill(
    config: &AppConfig,
    category: Category,
    source: &str,
    file: Option<PathBuf>,
) -> Result<()> {
    let kind: DataSourceKind = source.parse()?;
    if kind != DataSourceKind::Csv {
        bail!("backfill reads local exports only; use `wishlog fetch` for the {} source", kind);
    }

    let mut database = open_database(config)?;
    let outcome = ingest::backfill(&mut database, config, category, file.as_deref())?;

    println!(
        "{}: read {}, appended {}",
        category, outcome.fetched, outcome.appended
    );
    Ok(())
}

fn analyze(config: &AppConfig, categories: Vec<Category>, to_stdout: bool) -> Result<()> {
    let database = open_database(config)?;

    for category in categories {
        let category_config = config.category_config(category);
        let stats = WishStatistics::compute(&database, category)?;
        let title = &category_config.report_file_name;

        if to_stdout {
            println!("{}\n", render_report(title, &stats));
        } else {
            let path = config.report_path(&category_config);
            write_report(&path, title, &stats)?;
            println!("{}: report written to {}", category, path.display());
        }
    }
    Ok(())
}

fn export(config: &AppConfig, category: Category, file: Option<PathBuf>) -> Result<()> {
    let database = open_database(config)?;
    let records: Vec<WishRecord> = database
        .all_records(category)?
        .into_iter()
        .map(|stored| stored.wish)
        .collect();

    let path = file.unwrap_or_else(|| config.export_path(&config.category_config(category)));
    write_wishes(&path, &records)?;

    println!(
        "{}: {} records exported to {}",
        category,
        records.len(),
        path.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // ファイル出力ガードはmain終了まで保持
    let _log_guard = utils::init_logging(&config.log)?;

    tracing::info!("🎬 Starting wishlog");

    let result = match cli.command {
        Command::Fetch {
            url,
            target,
            no_export,
            no_store,
        } => {
            let options = IngestOptions {
                export: !no_export,
                persist: !no_store,
            };
            fetch(config, &url, target.categories(), options).await
        }
        Command::Backfill {
            category,
            source,
            file,
        } => backfill(&config, category, &source, file),
        Command::Analyze { target, stdout } => analyze(&config, target.categories(), stdout),
        Command::Export { category, file } => export(&config, category, file),
    };

    if let Err(e) = &result {
        tracing::error!("❌ {:#}", e);
    }
    result
}
