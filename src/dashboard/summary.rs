use crate::config::toml_config::WardstatsConfig;
use crate::dashboard::dataset::Dataset;
use crate::domain::files::month_label;
use crate::domain::model::Metric;
use crate::utils::error::{EtlError, Result};
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryLine {
    pub icb_code: String,
    pub icb_name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub label: String,
    pub month: String,
    pub lines: Vec<SummaryLine>,
}

/// 某個月份、某個指標的各 ICB 數值，以設定的 formatter 顯示
pub fn summarise(
    config: &WardstatsConfig,
    dataset: &Dataset,
    metric: Metric,
    month: Option<NaiveDate>,
) -> Result<Summary> {
    let date = match month.or_else(|| dataset.latest_date()) {
        Some(date) => date,
        None => {
            return Err(EtlError::ValidationError {
                message: "dataset has no records".to_string(),
            })
        }
    };
    let format = config.number_format(metric)?;

    let rows = dataset.rows_on(date);
    if rows.is_empty() {
        return Err(EtlError::lookup("month", month_label(date)));
    }

    let mut lines: Vec<SummaryLine> = rows
        .into_iter()
        .map(|row| {
            let value = match row.record.value(metric) {
                Some(v) if row.record.is_suppressed(metric) => format!("{}*", format.render(v)),
                Some(v) => format.render(v),
                None => "-".to_string(),
            };
            SummaryLine {
                icb_code: row.record.icb_code.clone(),
                icb_name: row.icb_name.clone(),
                value,
            }
        })
        .collect();
    lines.sort_by(|a, b| a.icb_name.cmp(&b.icb_name));

    Ok(Summary {
        label: config.label(metric)?.to_string(),
        month: month_label(date),
        lines,
    })
}

/// `YYYY-MM` -> 該月第一天
pub fn parse_month(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", text.trim()), "%Y-%m-%d").map_err(|_| {
        EtlError::InvalidConfigValueError {
            field: "month".to_string(),
            value: text.to_string(),
            reason: "expected YYYY-MM".to_string(),
        }
    })
}
