use crate::domain::model::{Column, RawSheet, TransformResult};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// 資料目錄的存取介面；路徑皆相對於資料根目錄
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn exists(&self, path: &str) -> impl std::future::Future<Output = Result<bool>> + Send;
    /// 列出目錄下的檔名 (不含子目錄)，依檔名排序
    fn list_files(&self, dir: &str)
        -> impl std::future::Future<Output = Result<Vec<String>>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn stats_homepage_url(&self) -> &str;
    fn raw_dir(&self) -> &str;
    fn staging_dir(&self) -> &str;
    fn processed_file(&self) -> String;
    fn column_mapping(&self) -> &BTreeMap<String, Column>;
    fn concurrent_files(&self) -> usize;
    fn download_enabled(&self) -> bool;
    fn overwrite_downloads(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawSheet>>;
    async fn transform(&self, data: Vec<RawSheet>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;
}
