use crate::core::combine::{combine_staging, encode_records};
use crate::core::download::StatsDownloader;
use crate::core::sheet::SheetCleaner;
use crate::core::workbook::{read_sheet_rows, DATA_SHEET_INDEX};
use crate::core::{ConfigProvider, Pipeline, RawSheet, Storage, TransformResult};
use crate::domain::files::{date_from_raw_filename, should_process, staging_filename};
use crate::utils::error::{EtlError, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;

/// Virtual Ward 月報的 ETL：
/// extract = 下載 + 讀取 xlsx，transform = 清理，load = 寫 staging 並合併
pub struct VirtualWardPipeline<S: Storage + Clone + 'static, C: ConfigProvider> {
    storage: S,
    config: C,
    timeout_seconds: u64,
}

impl<S: Storage + Clone + 'static, C: ConfigProvider> VirtualWardPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub async fn download(&self, overwrite: bool) -> Result<Vec<String>> {
        let downloader = StatsDownloader::new(
            self.config.stats_homepage_url(),
            self.config.raw_dir(),
            self.storage.clone(),
            self.timeout_seconds,
        )?;
        downloader.download_all(overwrite).await
    }

    /// 平行解析 raw 目錄下所有 xlsx，並發數由 `concurrent_files` 控制
    pub async fn read_raw_sheets(&self) -> Result<Vec<RawSheet>> {
        let raw_dir = self.config.raw_dir();
        let files = self.storage.list_files(raw_dir).await?;
        let semaphore = Arc::new(Semaphore::new(self.config.concurrent_files().max(1)));
        let mut tasks = JoinSet::new();

        for file in files {
            if !should_process(&file) {
                tracing::info!("Skipping {}", file);
                continue;
            }

            let date = match date_from_raw_filename(&file) {
                Ok(date) => date,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", file, e);
                    continue;
                }
            };

            let bytes = self.storage.read_file(&format!("{}/{}", raw_dir, file)).await?;
            let semaphore = semaphore.clone();

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| EtlError::processing(e.to_string()))?;
                let source = file.clone();
                let rows = tokio::task::spawn_blocking(move || {
                    read_sheet_rows(bytes, &source, DATA_SHEET_INDEX)
                })
                .await??;
                tracing::debug!("Parsed {} ({} rows)", file, rows.len());
                Ok::<_, EtlError>(RawSheet {
                    source: file,
                    date,
                    rows,
                })
            });
        }

        let mut sheets = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            sheets.push(joined??);
        }

        sheets.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.source.cmp(&b.source)));
        Ok(sheets)
    }

    /// 每個月份寫一個 staging CSV，回傳寫入的路徑
    pub async fn write_staging(&self, result: &TransformResult) -> Result<Vec<String>> {
        let mut written = Vec::new();
        for table in &result.tables {
            let path = format!("{}/{}", self.config.staging_dir(), staging_filename(table.date));
            self.storage
                .write_file(&path, &encode_records(&table.records)?)
                .await?;
            tracing::info!("✅ Processed {} -> {}", table.source, path);
            written.push(path);
        }
        Ok(written)
    }
}

#[async_trait::async_trait]
impl<S: Storage + Clone + 'static, C: ConfigProvider> Pipeline for VirtualWardPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<RawSheet>> {
        if self.config.download_enabled() {
            let downloaded = self.download(self.config.overwrite_downloads()).await?;
            tracing::info!("⬇️ Downloaded {} files", downloaded.len());
        }

        let sheets = self.read_raw_sheets().await?;
        if sheets.is_empty() {
            tracing::warn!("No raw spreadsheets found in '{}'", self.config.raw_dir());
        }
        Ok(sheets)
    }

    async fn transform(&self, data: Vec<RawSheet>) -> Result<TransformResult> {
        let cleaner = SheetCleaner::new(self.config.column_mapping());
        let mut result = TransformResult::default();

        for sheet in data {
            match cleaner.clean(&sheet) {
                Ok(table) => result.tables.push(table),
                Err(e) => {
                    // 單一月份版面異常不影響其他月份
                    tracing::warn!("⚠️ Could not clean {}: {}", sheet.source, e);
                    result.skipped.push(sheet.source);
                }
            }
        }

        if result.tables.is_empty() && !result.skipped.is_empty() {
            return Err(EtlError::processing(format!(
                "None of the {} raw files could be cleaned",
                result.skipped.len()
            )));
        }

        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        self.write_staging(&result).await?;
        let output = self.config.processed_file();
        combine_staging(&self.storage, self.config.staging_dir(), &output).await?;
        Ok(output)
    }
}
