//! d3-format 風格的數字格式 (plotly 的 `tickformat` / `hovertemplate` 使用同一套語法)。
//!
//! 只支援儀表板需要的子集：`[sign][,][.precision][~][type]`，
//! type 為 `d`、`f`、`%`、`e` 或省略。

use crate::utils::error::{EtlError, Result};
use std::fmt;

const DEFAULT_PRECISION: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Minus,
    Plus,
    Space,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatType {
    Integer,
    Fixed,
    Percent,
    Exponent,
    General,
}

/// 格式化後數值的語意
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Integer,
    Decimal,
    Percentage,
    Scientific,
    General,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    spec: String,
    sign: Sign,
    grouping: bool,
    precision: Option<usize>,
    trim: bool,
    kind: FormatType,
}

impl NumberFormat {
    pub fn parse(spec: &str) -> Result<Self> {
        let invalid = |reason: &str| EtlError::InvalidConfigValueError {
            field: "formatter".to_string(),
            value: spec.to_string(),
            reason: reason.to_string(),
        };

        let mut chars = spec.chars().peekable();

        let sign = match chars.peek() {
            Some('-') => {
                chars.next();
                Sign::Minus
            }
            Some('+') => {
                chars.next();
                Sign::Plus
            }
            Some(' ') => {
                chars.next();
                Sign::Space
            }
            _ => Sign::Minus,
        };

        let grouping = chars.next_if_eq(&',').is_some();

        let precision = if chars.next_if_eq(&'.').is_some() {
            let mut digits = String::new();
            while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                digits.push(c);
            }
            if digits.is_empty() {
                return Err(invalid("precision must follow '.'"));
            }
            Some(
                digits
                    .parse::<usize>()
                    .map_err(|_| invalid("precision is out of range"))?,
            )
        } else {
            None
        };

        let trim = chars.next_if_eq(&'~').is_some();

        let kind = match chars.next() {
            None => FormatType::General,
            Some('d') => FormatType::Integer,
            Some('f') => FormatType::Fixed,
            Some('%') => FormatType::Percent,
            Some('e') => FormatType::Exponent,
            Some(other) => {
                return Err(invalid(&format!(
                    "unsupported format type '{}', expected one of d, f, %, e",
                    other
                )))
            }
        };

        if chars.next().is_some() {
            return Err(invalid("unexpected characters after format type"));
        }

        Ok(Self {
            spec: spec.to_string(),
            sign,
            grouping,
            precision,
            trim,
            kind,
        })
    }

    pub fn spec(&self) -> &str {
        &self.spec
    }

    pub fn kind(&self) -> FormatKind {
        match self.kind {
            FormatType::Integer => FormatKind::Integer,
            FormatType::Fixed if self.precision == Some(0) => FormatKind::Integer,
            FormatType::Fixed => FormatKind::Decimal,
            FormatType::Percent => FormatKind::Percentage,
            FormatType::Exponent => FormatKind::Scientific,
            FormatType::General => FormatKind::General,
        }
    }

    pub fn render(&self, value: f64) -> String {
        let negative = value.is_sign_negative() && value != 0.0;
        let magnitude = value.abs();
        let precision = self.precision.unwrap_or(DEFAULT_PRECISION);

        let mut body = match self.kind {
            FormatType::Integer => format!("{:.0}", magnitude.round()),
            FormatType::Fixed => format!("{:.*}", precision, magnitude),
            FormatType::Percent => format!("{:.*}", precision, magnitude * 100.0),
            FormatType::Exponent => {
                let raw = format!("{:.*e}", precision, magnitude);
                let (mantissa, exponent) = raw.split_once('e').unwrap_or((raw.as_str(), "0"));
                let mantissa = if self.trim {
                    trim_zeros(mantissa)
                } else {
                    mantissa.to_string()
                };
                if exponent.starts_with('-') {
                    format!("{}e{}", mantissa, exponent)
                } else {
                    format!("{}e+{}", mantissa, exponent)
                }
            }
            FormatType::General => magnitude.to_string(),
        };

        if self.trim && matches!(self.kind, FormatType::Fixed | FormatType::Percent) {
            body = trim_zeros(&body);
        }

        if self.grouping && self.kind != FormatType::Exponent {
            body = group_thousands(&body);
        }

        if self.kind == FormatType::Percent {
            body.push('%');
        }

        // 四捨五入後為零時不顯示負號，例如 -0.2 -> "0"
        let mantissa = body.split('e').next().unwrap_or(&body);
        let negative = negative && mantissa.chars().any(|c| matches!(c, '1'..='9'));

        let prefix = match (negative, self.sign) {
            (true, _) => "-",
            (false, Sign::Plus) => "+",
            (false, Sign::Space) => " ",
            (false, Sign::Minus) => "",
        };

        format!("{}{}", prefix, body)
    }
}

impl fmt::Display for NumberFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.spec)
    }
}

fn trim_zeros(number: &str) -> String {
    if !number.contains('.') {
        return number.to_string();
    }
    number
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn group_thousands(number: &str) -> String {
    let (int_part, frac_part) = match number.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (number, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    match frac_part {
        Some(frac) => format!("{}.{}", grouped, frac),
        None => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        assert_eq!(NumberFormat::parse(",d").unwrap().kind(), FormatKind::Integer);
        assert_eq!(NumberFormat::parse(".0f").unwrap().kind(), FormatKind::Integer);
        assert_eq!(NumberFormat::parse(".1f").unwrap().kind(), FormatKind::Decimal);
        assert_eq!(NumberFormat::parse(".0%").unwrap().kind(), FormatKind::Percentage);
        assert_eq!(NumberFormat::parse(".2e").unwrap().kind(), FormatKind::Scientific);
        assert_eq!(NumberFormat::parse("").unwrap().kind(), FormatKind::General);
    }

    #[test]
    fn test_parse_rejects_unsupported_specs() {
        assert!(NumberFormat::parse("x").is_err());
        assert!(NumberFormat::parse(".f").is_err());
        assert!(NumberFormat::parse(".1fz").is_err());
        assert!(NumberFormat::parse("$,.2f").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(NumberFormat::parse(",d").unwrap().render(12345.4), "12,345");
        assert_eq!(NumberFormat::parse(".1f").unwrap().render(41.26), "41.3");
        assert_eq!(NumberFormat::parse(".0%").unwrap().render(0.724), "72%");
        assert_eq!(NumberFormat::parse(".1%").unwrap().render(1.0), "100.0%");
        assert_eq!(NumberFormat::parse("+.1f").unwrap().render(2.0), "+2.0");
        assert_eq!(NumberFormat::parse(".1f").unwrap().render(-2.0), "-2.0");
        assert_eq!(NumberFormat::parse(".2~f").unwrap().render(1.5), "1.5");
        assert_eq!(NumberFormat::parse(".2e").unwrap().render(1500.0), "1.50e+3");
        assert_eq!(NumberFormat::parse(",.2f").unwrap().render(1234567.891), "1,234,567.89");
    }

    #[test]
    fn test_render_negative_rounding_to_zero() {
        assert_eq!(NumberFormat::parse(",d").unwrap().render(-0.2), "0");
        assert_eq!(NumberFormat::parse(".1f").unwrap().render(-0.04), "0.0");
        assert_eq!(NumberFormat::parse(".0%").unwrap().render(-0.004), "0%");
        assert_eq!(NumberFormat::parse("+.1f").unwrap().render(-0.01), "+0.0");
        assert_eq!(NumberFormat::parse(",d").unwrap().render(-0.6), "-1");
        assert_eq!(NumberFormat::parse(".2e").unwrap().render(-0.00015), "-1.50e-4");
    }
}
