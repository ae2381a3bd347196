use crate::domain::model::{Cell, Column, Metric, MonthlyTable, RawSheet, WardRecord};
use crate::utils::error::{EtlError, Result};
use std::collections::{BTreeMap, HashMap};

/// 把原始月報工作表整理成 `WardRecord`
///
/// 原始檔案在資料表上方有標題、說明等雜訊列，且欄名帶有註腳，
/// 所以需要先找出真正的標題列，再依欄位對應表改名。
pub struct SheetCleaner<'a> {
    mapping: &'a BTreeMap<String, Column>,
}

impl<'a> SheetCleaner<'a> {
    pub fn new(mapping: &'a BTreeMap<String, Column>) -> Self {
        Self { mapping }
    }

    pub fn clean(&self, sheet: &RawSheet) -> Result<MonthlyTable> {
        let rows = pad_rows(&sheet.rows);
        let header_index = header_row_index(&rows).map_err(|e| with_source(e, &sheet.source))?;

        let header = &rows[header_index];
        let data = &rows[header_index + 1..];

        let columns = self
            .locate_columns(header, data)
            .map_err(|e| with_source(e, &sheet.source))?;

        let mut records = Vec::new();
        let mut dropped = 0usize;

        for row in data {
            let icb_code = columns
                .get(&Column::IcbCode)
                .map(|&i| row[i].as_text().trim().to_string())
                .unwrap_or_default();

            // 合計列或空白列的代碼長度 <= 2
            if icb_code.chars().count() <= 2 {
                dropped += 1;
                continue;
            }

            let number = |column: Column| columns.get(&column).and_then(|&i| row[i].as_number());

            let (occupancy, suppressed) = match columns.get(&Column::Occupancy) {
                Some(&i) if is_suppressed(&row[i]) => (Some(1.0), true),
                Some(&i) => (row[i].as_number(), false),
                None => (None, false),
            };

            records.push(WardRecord {
                date: sheet.date,
                region_code: columns
                    .get(&Column::RegionCode)
                    .map(|&i| row[i].as_text().trim().to_string())
                    .filter(|s| !s.is_empty()),
                icb_code,
                capacity: number(Column::Capacity),
                capacity_per_population: number(Column::CapacityPerPopulation),
                population: number(Column::Population),
                num_ward_patients: number(Column::NumWardPatients),
                occupancy,
                suppressed,
            });
        }

        let suppressed = records.iter().filter(|r| r.suppressed).count();
        tracing::debug!(
            "{}: {} records kept, {} rows dropped, {} suppressed occupancy values",
            sheet.source,
            records.len(),
            dropped,
            suppressed
        );

        Ok(MonthlyTable {
            source: sheet.source.clone(),
            date: sheet.date,
            records,
        })
    }

    /// 欄名 -> 欄位索引；整欄都是空值的欄位略過
    fn locate_columns(&self, header: &[Cell], data: &[Vec<Cell>]) -> Result<HashMap<Column, usize>> {
        let mut columns = HashMap::new();

        for (index, cell) in header.iter().enumerate() {
            if data.iter().all(|row| row[index].is_empty()) {
                continue;
            }

            let name = normalise_header(&cell.as_text());
            let Some(column) = self.mapping.get(&name) else {
                tracing::trace!("Unmapped column '{}'", name);
                continue;
            };

            if column.is_dropped() {
                continue;
            }

            columns.entry(*column).or_insert(index);
        }

        let mut required = vec![Column::IcbCode];
        required.extend(Metric::ALL.iter().map(|m| m.column()));
        let missing: Vec<&str> = required
            .iter()
            .filter(|c| !columns.contains_key(*c))
            .map(|c| c.as_str())
            .collect();

        if !missing.is_empty() {
            return Err(EtlError::ValidationError {
                message: format!("missing columns after renaming: {}", missing.join(", ")),
            });
        }

        Ok(columns)
    }
}

fn with_source(err: EtlError, source: &str) -> EtlError {
    match err {
        EtlError::ValidationError { message } => EtlError::ValidationError {
            message: format!("{}: {}", source, message),
        },
        other => other,
    }
}

/// 補齊長度不一的列
fn pad_rows(rows: &[Vec<Cell>]) -> Vec<Vec<Cell>> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    rows.iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(width, Cell::Empty);
            row
        })
        .collect()
}

/// 最後一欄是數值欄；第一個以數字開頭的列的前一列就是標題列
pub fn header_row_index(rows: &[Vec<Cell>]) -> Result<usize> {
    let first_numeric = rows
        .iter()
        .position(|row| {
            row.last()
                .and_then(|cell| cell.as_text().chars().next())
                .is_some_and(|c| c.is_ascii_digit())
        })
        .ok_or_else(|| EtlError::ValidationError {
            message: "no numeric data rows found".to_string(),
        })?;

    first_numeric.checked_sub(1).ok_or_else(|| EtlError::ValidationError {
        message: "data starts on the first row, no header row found".to_string(),
    })
}

/// 去掉換行之後的註腳
pub fn normalise_header(text: &str) -> String {
    text.split('\n').next().unwrap_or_default().trim().to_string()
}

/// 原始檔案以結尾的 `*` 標示被遮蔽的 occupancy
fn is_suppressed(cell: &Cell) -> bool {
    cell.as_text().trim_end().ends_with('*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn num(n: f64) -> Cell {
        Cell::Number(n)
    }

    fn mapping() -> BTreeMap<String, Column> {
        [
            ("Region", Column::Region),
            ("ICB Code", Column::IcbCode),
            ("ICB Name", Column::Name),
            ("Virtual Ward Capacity", Column::Capacity),
            ("Capacity per 100,000", Column::CapacityPerPopulation),
            ("GP registered population", Column::Population),
            ("Number of patients", Column::NumWardPatients),
            ("Virtual Ward Occupancy", Column::Occupancy),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }

    fn sheet() -> RawSheet {
        RawSheet {
            source: "2024_02_Monthly_Virtual_Ward.xlsx".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            rows: vec![
                vec![text("Virtual Ward Capacity and Occupancy")],
                vec![text("Published 14 March 2024")],
                vec![],
                vec![
                    Cell::Empty,
                    text("Region"),
                    text("ICB Code"),
                    text("ICB Name"),
                    text("Virtual Ward Capacity\n(see note 1)"),
                    text("Capacity per 100,000 \n(see note 2)"),
                    text("GP registered population"),
                    text("Number of patients\n(note 3)"),
                    text("Virtual Ward Occupancy\n(note 4)"),
                ],
                vec![
                    Cell::Empty,
                    text("England"),
                    text("-"),
                    text("England"),
                    num(12000.0),
                    num(25.1),
                    num(47_000_000.0),
                    num(9000.0),
                    num(0.75),
                ],
                vec![
                    Cell::Empty,
                    text("London"),
                    text("QMJ"),
                    text("NHS North Central London ICB"),
                    num(300.0),
                    num(21.4),
                    num(1_400_000.0),
                    num(210.0),
                    num(0.7),
                ],
                vec![
                    Cell::Empty,
                    text("North West"),
                    text("QT6"),
                    text("NHS Cornwall and the Isles of Scilly ICB"),
                    num(120.0),
                    num(22.0),
                    num(545_000.0),
                    num(130.0),
                    text("100%*"),
                ],
            ],
        }
    }

    #[test]
    fn test_header_row_index_finds_row_above_first_number() {
        assert_eq!(header_row_index(&pad_rows(&sheet().rows)).unwrap(), 3);
    }

    #[test]
    fn test_header_row_index_without_numbers_fails() {
        let rows = vec![vec![text("a")], vec![text("b")]];
        assert!(header_row_index(&rows).is_err());
    }

    #[test]
    fn test_normalise_header_strips_footnotes() {
        assert_eq!(normalise_header("Virtual Ward Capacity\n(see note 1)"), "Virtual Ward Capacity");
        assert_eq!(normalise_header("  ICB Code "), "ICB Code");
    }

    #[test]
    fn test_clean_drops_totals_and_marks_suppressed() {
        let mapping = mapping();
        let table = SheetCleaner::new(&mapping).clean(&sheet()).unwrap();

        assert_eq!(table.records.len(), 2);
        let qmj = &table.records[0];
        assert_eq!(qmj.icb_code, "QMJ");
        assert_eq!(qmj.capacity, Some(300.0));
        assert_eq!(qmj.capacity_per_population, Some(21.4));
        assert_eq!(qmj.occupancy, Some(0.7));
        assert!(!qmj.suppressed);
        assert_eq!(qmj.date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let qt6 = &table.records[1];
        assert_eq!(qt6.icb_code, "QT6");
        assert_eq!(qt6.occupancy, Some(1.0));
        assert!(qt6.suppressed);
    }

    #[test]
    fn test_clean_reports_missing_columns() {
        let mut mapping = mapping();
        mapping.remove("Virtual Ward Occupancy");
        let err = SheetCleaner::new(&mapping).clean(&sheet()).unwrap_err();
        assert!(err.to_string().contains("occupancy"));
        assert!(err.to_string().contains("2024_02_Monthly_Virtual_Ward.xlsx"));
    }
}
