use crate::domain::model::{Column, Metric, MetricKind};
use crate::utils::error::{EtlError, Result};
use crate::utils::format::{FormatKind, NumberFormat};
use std::collections::{BTreeMap, HashMap};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Into<String>, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.into(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value.to_string(),
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_file_extension(field_name: &str, file: &str, allowed_extensions: &[&str]) -> Result<()> {
    validate_path(field_name, file)?;

    match std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_extensions.contains(&extension) => Ok(()),
        Some(extension) => Err(invalid(
            field_name,
            file,
            format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        )),
        None => Err(invalid(
            field_name,
            file,
            "File has no extension or invalid filename",
        )),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// 顏色必須是 `#RRGGBB`
pub fn validate_hex_colour(field_name: &str, colour: &str) -> Result<()> {
    let valid = colour.len() == 7
        && colour.starts_with('#')
        && colour[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        return Err(invalid(field_name, colour, "Colour must be in #RRGGBB form"));
    }
    Ok(())
}

/// 每個下拉選項都必須有對應的 formatter
pub fn validate_dropdown_formatters(
    dropdown_options: &BTreeMap<Metric, String>,
    formatters: &BTreeMap<Metric, String>,
) -> Result<()> {
    for (metric, label) in dropdown_options {
        validate_non_empty_string(&format!("dashboard.dropdown_options.{}", metric), label)?;
        if !formatters.contains_key(metric) {
            return Err(EtlError::ConfigValidationError {
                field: "dashboard.formatters".to_string(),
                message: format!("Dropdown option '{}' has no formatter", metric),
            });
        }
    }
    Ok(())
}

/// formatter 必須能解析，且符合指標的語意類型
pub fn validate_formatter(metric: Metric, spec: &str) -> Result<NumberFormat> {
    let field = format!("dashboard.formatters.{}", metric);
    let format = NumberFormat::parse(spec).map_err(|e| match e {
        EtlError::InvalidConfigValueError { value, reason, .. } => EtlError::InvalidConfigValueError {
            field: field.clone(),
            value,
            reason,
        },
        other => other,
    })?;

    let compatible = match metric.kind() {
        MetricKind::Count => format.kind() == FormatKind::Integer,
        MetricKind::Rate => matches!(format.kind(), FormatKind::Integer | FormatKind::Decimal),
        MetricKind::Percentage => format.kind() == FormatKind::Percentage,
    };

    if !compatible {
        return Err(invalid(
            &field,
            spec,
            format!("{:?} format is not suitable for a {:?} metric", format.kind(), metric.kind()),
        ));
    }

    Ok(format)
}

/// 欄位對應後的名稱不可重複，且必須包含清理時需要的欄位
pub fn validate_column_mapping(mapping: &BTreeMap<String, Column>) -> Result<()> {
    let mut seen: HashMap<Column, &str> = HashMap::new();

    for (source, target) in mapping {
        validate_non_empty_string("columns", source)?;
        if let Some(previous) = seen.insert(*target, source.as_str()) {
            return Err(EtlError::ConfigValidationError {
                field: "columns".to_string(),
                message: format!(
                    "Columns '{}' and '{}' both map to '{}'",
                    previous, source, target
                ),
            });
        }
    }

    let mut required = vec![Column::IcbCode, Column::Population];
    required.extend(Metric::ALL.iter().map(|m| m.column()));
    for column in required {
        if !seen.contains_key(&column) {
            return Err(EtlError::MissingConfigError {
                field: format!("columns -> {}", column),
            });
        }
    }

    Ok(())
}
