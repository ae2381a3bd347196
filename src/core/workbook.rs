use crate::domain::model::Cell;
use crate::utils::error::{EtlError, Result};
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;

/// NHS England 的月報中，資料表位於第二個工作表 (第一個是說明頁)
pub const DATA_SHEET_INDEX: usize = 1;

fn to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// 讀取 xlsx 中指定工作表的所有儲存格
pub fn read_sheet_rows(bytes: Vec<u8>, source: &str, sheet_index: usize) -> Result<Vec<Vec<Cell>>> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|e| EtlError::spreadsheet(source, e))?;

    let sheet_names = workbook.sheet_names();
    let range = workbook
        .worksheet_range_at(sheet_index)
        .ok_or_else(|| {
            EtlError::spreadsheet(
                source,
                format!(
                    "expected at least {} worksheets, found {}",
                    sheet_index + 1,
                    sheet_names.len()
                ),
            )
        })?
        .map_err(|e| EtlError::spreadsheet(source, e))?;

    tracing::debug!(
        "Read worksheet '{}' from {} ({} rows)",
        sheet_names.get(sheet_index).map(String::as_str).unwrap_or("?"),
        source,
        range.height()
    );

    Ok(range
        .rows()
        .map(|row| row.iter().map(to_cell).collect())
        .collect())
}
