use crate::config::toml_config::WardstatsConfig;
use crate::core::boundaries::{read_code_lookup, BoundarySet};
use crate::core::combine::decode_records;
use crate::domain::files::month_label;
use crate::domain::model::WardRecord;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone)]
pub struct DashboardRow {
    pub record: WardRecord,
    pub icb_name: String,
}

/// 儀表板使用的資料：processed CSV + 邊界，載入一次後唯讀共用
#[derive(Debug, Clone)]
pub struct Dataset {
    rows: Vec<DashboardRow>,
    dates: Vec<NaiveDate>,
    names: HashMap<String, String>,
    boundaries: BoundarySet,
}

impl Dataset {
    pub fn new(records: Vec<WardRecord>, boundaries: BoundarySet) -> Self {
        let names = boundaries.icb_name_lookup();

        let dates: BTreeSet<NaiveDate> = records.iter().map(|r| r.date).collect();
        let rows = records
            .into_iter()
            .map(|record| {
                // 找不到名稱時直接顯示代碼
                let icb_name = names
                    .get(&record.icb_code)
                    .cloned()
                    .unwrap_or_else(|| record.icb_code.clone());
                DashboardRow { record, icb_name }
            })
            .collect();

        Self {
            rows,
            dates: dates.into_iter().collect(),
            names,
            boundaries,
        }
    }

    pub fn load(config: &WardstatsConfig) -> Result<Self> {
        let processed = config.processed_path();
        let bytes = std::fs::read(&processed).map_err(|e| EtlError::ConfigError {
            message: format!(
                "Cannot read processed data {}: {} (run `wardstats run` first)",
                processed.display(),
                e
            ),
        })?;
        let records = decode_records(&bytes)?;

        let mut boundaries = BoundarySet::from_file(
            &config.boundaries_path(),
            &config.boundaries.feature_code_property,
            &config.boundaries.feature_name_property,
        )?;
        // 沒有對照表時假設邊界檔已經是 ODS 代碼
        let lookup_path = config.lookup_path();
        let rekeyed = if lookup_path.exists() {
            let lookup = read_code_lookup(
                &lookup_path,
                &config.boundaries.lookup_code_column,
                &config.boundaries.lookup_ods_column,
            )?;
            boundaries.rekey(&lookup)
        } else {
            tracing::warn!("No lookup file at {}, boundary codes left as-is", lookup_path.display());
            0
        };

        tracing::info!(
            "🗺️ Loaded {} records, {} boundaries ({} re-keyed)",
            records.len(),
            boundaries.len(),
            rekeyed
        );

        Ok(Self::new(records, boundaries))
    }

    pub fn rows(&self) -> &[DashboardRow] {
        &self.rows
    }

    /// 排序後不重複的月份
    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// 滑桿標籤，格式 `%m/%Y`
    pub fn date_labels(&self) -> Vec<String> {
        self.dates.iter().copied().map(month_label).collect()
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn date_at(&self, index: usize) -> Result<NaiveDate> {
        self.dates
            .get(index)
            .copied()
            .ok_or_else(|| EtlError::lookup("date index", index.to_string()))
    }

    pub fn rows_on(&self, date: NaiveDate) -> Vec<&DashboardRow> {
        self.rows.iter().filter(|r| r.record.date == date).collect()
    }

    pub fn rows_for_icb(&self, icb_code: &str) -> Vec<&DashboardRow> {
        let mut rows: Vec<&DashboardRow> = self
            .rows
            .iter()
            .filter(|r| r.record.icb_code == icb_code)
            .collect();
        rows.sort_by_key(|r| r.record.date);
        rows
    }

    pub fn icb_name(&self, icb_code: &str) -> Option<&str> {
        self.names.get(icb_code).map(String::as_str)
    }

    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }
}
