use chrono::{Datelike, NaiveDate};

use crate::utils::error::{EtlError, Result};

const RAW_SUFFIX: &str = "_Monthly_Virtual_Ward.xlsx";

/// 原始下載檔名，例如 `2024_02_Monthly_Virtual_Ward.xlsx`
pub fn raw_filename(date: NaiveDate) -> String {
    format!("{}{}", date.format("%Y_%m"), RAW_SUFFIX)
}

/// staging 檔名，例如 `2024_02.csv`
pub fn staging_filename(date: NaiveDate) -> String {
    format!("{}.csv", date.format("%Y_%m"))
}

/// 從 `YYYY_MM_...` 檔名取出月份第一天
pub fn date_from_raw_filename(filename: &str) -> Result<NaiveDate> {
    let mut bits = filename.split('_');
    let year = bits.next().and_then(|y| y.parse::<i32>().ok());
    let month = bits.next().and_then(|m| m.parse::<u32>().ok());

    match (year, month) {
        (Some(year), Some(month)) => NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            EtlError::processing(format!("Invalid year/month in filename '{}'", filename))
        }),
        _ => Err(EtlError::processing(format!(
            "Filename '{}' does not start with YYYY_MM",
            filename
        ))),
    }
}

/// 只處理 xlsx，略過 Excel 的 `~$` 暫存鎖檔
pub fn should_process(filename: &str) -> bool {
    filename.ends_with(".xlsx") && !filename.starts_with('~')
}

pub fn month_label(date: NaiveDate) -> String {
    format!("{:02}/{}", date.month(), date.year())
}
