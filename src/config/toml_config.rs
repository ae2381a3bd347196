use crate::domain::model::{Column, Metric};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::format::NumberFormat;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// 隨 crate 附帶的預設配置
pub const DEFAULT_CONFIG: &str = include_str!("../../wardstats.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WardstatsConfig {
    pub paths: PathsConfig,
    pub urls: UrlsConfig,
    pub extract: ExtractConfig,
    pub columns: BTreeMap<String, Column>,
    pub boundaries: BoundariesConfig,
    pub dashboard: DashboardConfig,
    pub colours: ColoursConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    pub data_dir: String,
    pub raw_dir: String,
    pub staging_dir: String,
    pub processed_dir: String,
    pub data_filename: String,
    pub boundaries_filename: String,
    pub lookup_filename: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlsConfig {
    pub stats_homepage: String,
    pub virtual_wards_info: String,
    pub gp_population: String,
    pub source_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    pub download: Option<bool>,
    pub overwrite: Option<bool>,
    pub concurrent_files: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundariesConfig {
    pub feature_code_property: String,
    pub feature_name_property: String,
    pub lookup_code_column: String,
    pub lookup_ods_column: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MapCentre {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetBand {
    pub low: f64,
    pub high: f64,
    pub annotation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub header: String,
    pub default_metric: Metric,
    pub default_icb: String,
    pub map_style: String,
    pub map_zoom: f64,
    pub map_centre: MapCentre,
    pub capacity_per_population_map_max: f64,
    pub target: TargetBand,
    pub dropdown_options: BTreeMap<Metric, String>,
    pub formatters: BTreeMap<Metric, String>,
}

/// NHS 識別色
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColoursConfig {
    pub blue: String,
    pub dark_blue: String,
    pub light_blue: String,
    pub white: String,
    #[serde(flatten)]
    pub others: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DropdownOption {
    pub label: String,
    pub value: Metric,
}

impl WardstatsConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 內建的預設配置
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(DEFAULT_CONFIG)
    }

    /// 替換環境變數 (例如 ${WARDSTATS_SOURCE_URL})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 資料根目錄
    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_dir)
    }

    pub fn processed_path(&self) -> PathBuf {
        self.data_dir()
            .join(&self.paths.processed_dir)
            .join(&self.paths.data_filename)
    }

    pub fn boundaries_path(&self) -> PathBuf {
        self.data_dir().join(&self.paths.boundaries_filename)
    }

    pub fn lookup_path(&self) -> PathBuf {
        self.data_dir().join(&self.paths.lookup_filename)
    }

    pub fn label(&self, metric: Metric) -> Result<&str> {
        self.dashboard
            .dropdown_options
            .get(&metric)
            .map(String::as_str)
            .ok_or_else(|| EtlError::lookup("dropdown option", metric.as_str()))
    }

    pub fn formatter(&self, metric: Metric) -> Result<&str> {
        self.dashboard
            .formatters
            .get(&metric)
            .map(String::as_str)
            .ok_or_else(|| EtlError::lookup("formatter", metric.as_str()))
    }

    pub fn number_format(&self, metric: Metric) -> Result<NumberFormat> {
        NumberFormat::parse(self.formatter(metric)?)
    }

    /// 下拉選單內容，依指標順序
    pub fn dropdown_options(&self) -> Vec<DropdownOption> {
        self.dashboard
            .dropdown_options
            .iter()
            .map(|(metric, label)| DropdownOption {
                label: label.clone(),
                value: *metric,
            })
            .collect()
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.extract.timeout_seconds.unwrap_or(60)
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.server
            .bind
            .parse()
            .map_err(|e| EtlError::InvalidConfigValueError {
                field: "server.bind".to_string(),
                value: self.server.bind.clone(),
                reason: format!("{}", e),
            })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        // URL
        validation::validate_url("urls.stats_homepage", &self.urls.stats_homepage)?;
        validation::validate_url("urls.virtual_wards_info", &self.urls.virtual_wards_info)?;
        validation::validate_url("urls.gp_population", &self.urls.gp_population)?;
        if let Some(source_code) = &self.urls.source_code {
            validation::validate_url("urls.source_code", source_code)?;
        }

        // 路徑與檔名
        validation::validate_path("paths.data_dir", &self.paths.data_dir)?;
        validation::validate_path("paths.raw_dir", &self.paths.raw_dir)?;
        validation::validate_path("paths.staging_dir", &self.paths.staging_dir)?;
        validation::validate_path("paths.processed_dir", &self.paths.processed_dir)?;
        validation::validate_file_extension("paths.data_filename", &self.paths.data_filename, &["csv"])?;
        validation::validate_file_extension(
            "paths.boundaries_filename",
            &self.paths.boundaries_filename,
            &["geojson", "json"],
        )?;
        validation::validate_file_extension("paths.lookup_filename", &self.paths.lookup_filename, &["xlsx"])?;

        // 並發數
        if let Some(concurrent) = self.extract.concurrent_files {
            validation::validate_positive_number("extract.concurrent_files", concurrent, 1)?;
        }

        // 欄位對應
        validation::validate_column_mapping(&self.columns)?;

        // 下拉選單與 formatter
        validation::validate_dropdown_formatters(
            &self.dashboard.dropdown_options,
            &self.dashboard.formatters,
        )?;
        for (metric, spec) in &self.dashboard.formatters {
            validation::validate_formatter(*metric, spec)?;
        }
        if !self
            .dashboard
            .dropdown_options
            .contains_key(&self.dashboard.default_metric)
        {
            return Err(EtlError::ConfigValidationError {
                field: "dashboard.default_metric".to_string(),
                message: format!(
                    "Default metric '{}' is not a dropdown option",
                    self.dashboard.default_metric
                ),
            });
        }

        // 地圖
        validation::validate_non_empty_string("dashboard.header", &self.dashboard.header)?;
        validation::validate_non_empty_string("dashboard.default_icb", &self.dashboard.default_icb)?;
        validation::validate_range("dashboard.map_centre.lat", self.dashboard.map_centre.lat, -90.0, 90.0)?;
        validation::validate_range("dashboard.map_centre.lon", self.dashboard.map_centre.lon, -180.0, 180.0)?;
        validation::validate_range("dashboard.map_zoom", self.dashboard.map_zoom, 0.0, 22.0)?;
        if self.dashboard.target.low >= self.dashboard.target.high {
            return Err(EtlError::ConfigValidationError {
                field: "dashboard.target".to_string(),
                message: "target.low must be below target.high".to_string(),
            });
        }

        // 顏色
        validation::validate_hex_colour("colours.blue", &self.colours.blue)?;
        validation::validate_hex_colour("colours.dark_blue", &self.colours.dark_blue)?;
        validation::validate_hex_colour("colours.light_blue", &self.colours.light_blue)?;
        validation::validate_hex_colour("colours.white", &self.colours.white)?;
        for (name, colour) in &self.colours.others {
            validation::validate_hex_colour(&format!("colours.{}", name), colour)?;
        }

        self.bind_addr()?;

        Ok(())
    }
}

impl ConfigProvider for WardstatsConfig {
    fn stats_homepage_url(&self) -> &str {
        &self.urls.stats_homepage
    }

    fn raw_dir(&self) -> &str {
        &self.paths.raw_dir
    }

    fn staging_dir(&self) -> &str {
        &self.paths.staging_dir
    }

    fn processed_file(&self) -> String {
        format!("{}/{}", self.paths.processed_dir, self.paths.data_filename)
    }

    fn column_mapping(&self) -> &BTreeMap<String, Column> {
        &self.columns
    }

    fn concurrent_files(&self) -> usize {
        self.extract.concurrent_files.unwrap_or(4)
    }

    fn download_enabled(&self) -> bool {
        self.extract.download.unwrap_or(true)
    }

    fn overwrite_downloads(&self) -> bool {
        self.extract.overwrite.unwrap_or(false)
    }
}

impl Validate for WardstatsConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
