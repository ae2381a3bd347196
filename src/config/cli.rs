use crate::config::toml_config::WardstatsConfig;
use crate::utils::error::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "wardstats")]
#[command(about = "NHS Virtual Ward statistics: download, clean and chart the monthly data")]
pub struct CliConfig {
    /// Path to TOML configuration file (defaults to the built-in configuration)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override `paths.data_dir`
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log memory usage after each ETL phase
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Download every monthly spreadsheet linked from the statistics homepage
    Download {
        /// Replace files that already exist in the raw directory
        #[arg(long)]
        overwrite: bool,
    },
    /// Clean raw spreadsheets into per-month staging CSVs
    Transform,
    /// Concatenate staging CSVs into the processed dataset
    Combine,
    /// Download, transform and combine in one go
    Run {
        /// Use whatever is already in the raw directory
        #[arg(long)]
        skip_download: bool,
    },
    /// Print one metric for every ICB in a month
    Summary {
        #[arg(long, default_value = "capacity_per_population")]
        metric: String,

        /// Month as YYYY-MM (defaults to the latest month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Serve the dashboard
    Serve {
        /// Override `server.bind`
        #[arg(long)]
        bind: Option<String>,
    },
    /// Validate the configuration and print a summary
    CheckConfig,
}

impl CliConfig {
    /// 載入 TOML 配置並套用命令列覆蓋設定
    pub fn load_config(&self) -> Result<WardstatsConfig> {
        let mut config = match &self.config {
            Some(path) => WardstatsConfig::from_file(path)?,
            None => WardstatsConfig::builtin()?,
        };

        if let Some(data_dir) = &self.data_dir {
            config.paths.data_dir = data_dir.clone();
            tracing::info!("🔧 Data directory overridden to: {}", data_dir);
        }

        if let Command::Serve { bind: Some(bind) } = &self.command {
            config.server.bind = bind.clone();
        }

        Ok(config)
    }
}
