use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::EtlError;

/// 下拉選單可選的四個指標
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Capacity,
    CapacityPerPopulation,
    NumWardPatients,
    Occupancy,
}

/// 指標數值的語意類型，用來檢查 formatter 是否合理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Count,
    Rate,
    Percentage,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Capacity,
        Metric::CapacityPerPopulation,
        Metric::NumWardPatients,
        Metric::Occupancy,
    ];

    pub fn as_str(&self) -> &'static str {
        self.column().as_str()
    }

    pub fn column(&self) -> Column {
        match self {
            Metric::Capacity => Column::Capacity,
            Metric::CapacityPerPopulation => Column::CapacityPerPopulation,
            Metric::NumWardPatients => Column::NumWardPatients,
            Metric::Occupancy => Column::Occupancy,
        }
    }

    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Capacity | Metric::NumWardPatients => MetricKind::Count,
            Metric::CapacityPerPopulation => MetricKind::Rate,
            Metric::Occupancy => MetricKind::Percentage,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| EtlError::lookup("metric", s))
    }
}

/// 清理後資料集使用的欄位名稱
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Region,
    RegionCode,
    IcbCode,
    Name,
    Capacity,
    CapacityPerPopulation,
    Population,
    NumWardPatients,
    Occupancy,
}

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Region => "region",
            Column::RegionCode => "region_code",
            Column::IcbCode => "icb_code",
            Column::Name => "name",
            Column::Capacity => "capacity",
            Column::CapacityPerPopulation => "capacity_per_population",
            Column::Population => "population",
            Column::NumWardPatients => "num_ward_patients",
            Column::Occupancy => "occupancy",
        }
    }

    /// 清理時會被丟棄的欄位
    pub fn is_dropped(&self) -> bool {
        matches!(self, Column::Region | Column::Name)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一個 ICB 在某個月份的統計資料 (staging / processed CSV 的一列)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WardRecord {
    pub date: NaiveDate,
    pub region_code: Option<String>,
    pub icb_code: String,
    pub capacity: Option<f64>,
    pub capacity_per_population: Option<f64>,
    pub population: Option<f64>,
    pub num_ward_patients: Option<f64>,
    pub occupancy: Option<f64>,
    pub suppressed: bool,
}

impl WardRecord {
    pub fn value(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Capacity => self.capacity,
            Metric::CapacityPerPopulation => self.capacity_per_population,
            Metric::NumWardPatients => self.num_ward_patients,
            Metric::Occupancy => self.occupancy,
        }
    }

    /// 只有 occupancy 會被遮蔽 (原始檔案中以 `*` 標示)
    pub fn is_suppressed(&self, metric: Metric) -> bool {
        metric == Metric::Occupancy && self.suppressed
    }
}

/// 試算表中的一個儲存格
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Number(n) => n.to_string(),
            Cell::Text(s) => s.clone(),
        }
    }

    /// 解析數值；支援 "1,234"、"85%"、"100%*" 之類的文字
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => {
                let trimmed = s.trim().trim_end_matches('*').trim();
                let (digits, percent) = match trimmed.strip_suffix('%') {
                    Some(rest) => (rest.trim(), true),
                    None => (trimmed, false),
                };
                let value: f64 = digits.replace(',', "").parse().ok()?;
                Some(if percent { value / 100.0 } else { value })
            }
        }
    }
}

/// 從原始 xlsx 讀出的工作表
#[derive(Debug, Clone)]
pub struct RawSheet {
    pub source: String,
    pub date: NaiveDate,
    pub rows: Vec<Vec<Cell>>,
}

/// 一個月份清理後的資料
#[derive(Debug, Clone)]
pub struct MonthlyTable {
    pub source: String,
    pub date: NaiveDate,
    pub records: Vec<WardRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub tables: Vec<MonthlyTable>,
    pub skipped: Vec<String>,
}
