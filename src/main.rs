use clap::Parser;
use wardstats::config::cli::Command;
use wardstats::core::combine::combine_staging;
use wardstats::core::{ConfigProvider, Pipeline};
use wardstats::dashboard::summary::{parse_month, summarise};
use wardstats::dashboard::{serve, AppState, Dataset};
use wardstats::domain::model::Metric;
use wardstats::utils::error::ErrorSeverity;
use wardstats::utils::{logger, validation::Validate};
use wardstats::{CliConfig, EtlEngine, EtlError, LocalStorage, VirtualWardPipeline, WardstatsConfig};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting wardstats CLI");
    if cli.verbose {
        tracing::debug!("CLI args: {:?}", cli);
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config: {}", e);
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if let Err(e) = run_command(&cli, config).await {
        exit_with(e);
    }
}

async fn run_command(cli: &CliConfig, mut config: WardstatsConfig) -> wardstats::Result<()> {
    let storage = LocalStorage::new(config.data_dir());

    match &cli.command {
        Command::Download { overwrite } => {
            let pipeline = VirtualWardPipeline::new(storage, config.clone())
                .with_timeout(config.timeout_seconds());
            let downloaded = pipeline.download(*overwrite).await?;
            println!("✅ Downloaded {} files", downloaded.len());
        }
        Command::Transform => {
            let pipeline = VirtualWardPipeline::new(storage, config.clone());
            let sheets = pipeline.read_raw_sheets().await?;
            let result = pipeline.transform(sheets).await?;
            let written = pipeline.write_staging(&result).await?;
            println!("✅ Wrote {} staging files", written.len());
            for skipped in &result.skipped {
                println!("⚠️ Skipped {}", skipped);
            }
        }
        Command::Combine => {
            let summary = combine_staging(&storage, config.staging_dir(), &config.processed_file()).await?;
            println!(
                "✅ Combined {} files ({} records) into {}",
                summary.files, summary.records, summary.output
            );
        }
        Command::Run { skip_download } => {
            if *skip_download {
                config.extract.download = Some(false);
            }
            if cli.monitor {
                tracing::info!("🔍 System monitoring enabled");
            }

            let pipeline = VirtualWardPipeline::new(storage, config.clone())
                .with_timeout(config.timeout_seconds());
            let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
            let output_path = engine.run().await?;

            tracing::info!("✅ ETL process completed successfully!");
            println!("✅ ETL process completed successfully!");
            println!("📁 Output saved to: {}", config.data_dir().join(output_path).display());
        }
        Command::Summary { metric, month } => {
            let metric: Metric = metric.parse()?;
            let month = month.as_deref().map(parse_month).transpose()?;
            let dataset = Dataset::load(&config)?;
            let summary = summarise(&config, &dataset, metric, month)?;

            println!("{} ({})", summary.label, summary.month);
            for line in summary.lines {
                println!("  {:<5} {:<60} {:>10}", line.icb_code, line.icb_name, line.value);
            }
        }
        Command::Serve { .. } => {
            let addr = config.bind_addr()?;
            let dataset = Dataset::load(&config)?;
            serve(AppState::new(config, dataset), addr).await?;
        }
        Command::CheckConfig => {
            display_config_summary(&config);
        }
    }

    Ok(())
}

fn display_config_summary(config: &WardstatsConfig) {
    println!("✅ Configuration is valid");
    println!("📁 Data directory:  {}", config.data_dir().display());
    println!("🌐 Statistics page: {}", config.urls.stats_homepage);
    println!("🗺️ Boundaries:      {}", config.boundaries_path().display());
    println!("📊 Metrics:");
    for option in config.dropdown_options() {
        let formatter = config.formatter(option.value).unwrap_or("?");
        println!("  {:<24} {:<6} {}", option.value.as_str(), formatter, option.label);
    }
}

fn exit_with(e: EtlError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ wardstats failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,  // 重試錯誤
        ErrorSeverity::High => 1,    // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };
    std::process::exit(exit_code);
}
