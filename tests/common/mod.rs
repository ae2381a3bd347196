#![allow(dead_code)]

use anyhow::Result;
use std::io::Write;
use wardstats::domain::model::Cell;
use zip::write::{FileOptions, ZipWriter};

pub fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

pub fn num(n: f64) -> Cell {
    Cell::Number(n)
}

/// 原始月報第二個工作表的內容：上方有標題列，欄名帶註腳，有合計列與一個空白欄
pub fn raw_rows(cornwall_occupancy: Cell) -> Vec<Vec<Cell>> {
    vec![
        vec![text("Virtual Ward Capacity and Occupancy")],
        vec![],
        vec![
            text("Region"),
            text("Region Code"),
            text("ICB Code"),
            text("ICB Name"),
            Cell::Empty,
            text("Virtual Ward Capacity\n(see note 1)"),
            text("Virtual Ward Capacity per 100,000 GP registered population aged 16 years and over\n(see note 2)"),
            text("GP registered population aged 16 years and over"),
            text("Number of patients on a Virtual Ward"),
            text("Virtual Ward Occupancy\n(see note 3)"),
        ],
        vec![
            text("England"),
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            Cell::Empty,
            num(12000.0),
            num(25.1),
            num(45_000_000.0),
            num(9000.0),
            num(0.75),
        ],
        vec![
            text("South West"),
            text("Y58"),
            text("QT6"),
            text("NHS Cornwall and the Isles of Scilly ICB"),
            Cell::Empty,
            num(110.0),
            num(22.0),
            num(500_000.0),
            num(80.0),
            cornwall_occupancy,
        ],
        vec![
            text("London"),
            text("Y56"),
            text("QMJ"),
            text("NHS North Central London ICB"),
            Cell::Empty,
            num(300.0),
            num(30.5),
            num(1_200_000.0),
            num(210.0),
            num(0.7),
        ],
    ]
}

/// 月報格式的活頁簿：第一個工作表是說明，第二個是資料
pub fn raw_workbook(cornwall_occupancy: Cell) -> Result<Vec<u8>> {
    xlsx_workbook(&[
        ("Notes", vec![vec![text("Notes on the statistics")]]),
        ("Data", raw_rows(cornwall_occupancy)),
    ])
}

/// ONS -> ODS 對照表，同一個 ICB 出現在多個地區列上
pub fn lookup_workbook() -> Result<Vec<u8>> {
    xlsx_workbook(&[(
        "LOC22_ICB22",
        vec![
            vec![text("LOC22CD"), text("ICB22CD"), text("ICB22CDH"), text("ICB22NM")],
            vec![
                text("E38000089"),
                text("E54000036"),
                text("QT6"),
                text("NHS Cornwall and the Isles of Scilly ICB"),
            ],
            vec![
                text("E38000090"),
                text("E54000036"),
                text("QT6"),
                text("NHS Cornwall and the Isles of Scilly ICB"),
            ],
            vec![
                text("E38000240"),
                text("E54000028"),
                text("QMJ"),
                text("NHS North Central London ICB"),
            ],
        ],
    )])
}

/// 以最小的 OOXML 結構產生 xlsx；字串使用 inline string，不需要 sharedStrings
pub fn xlsx_workbook(sheets: &[(&str, Vec<Vec<Cell>>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    let overrides: String = (1..=sheets.len())
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            )
        })
        .collect();
    zip.start_file::<_, ()>("[Content_Types].xml", FileOptions::default())?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{}</Types>"#,
        overrides
    )?;

    zip.start_file::<_, ()>("_rels/.rels", FileOptions::default())?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
    )?;

    let sheet_entries: String = sheets
        .iter()
        .enumerate()
        .map(|(i, (name, _))| {
            format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(name),
                i + 1,
                i + 1
            )
        })
        .collect();
    zip.start_file::<_, ()>("xl/workbook.xml", FileOptions::default())?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{}</sheets></workbook>"#,
        sheet_entries
    )?;

    let relationships: String = (1..=sheets.len())
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            )
        })
        .collect();
    zip.start_file::<_, ()>("xl/_rels/workbook.xml.rels", FileOptions::default())?;
    write!(
        zip,
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        relationships
    )?;

    for (i, (_, rows)) in sheets.iter().enumerate() {
        zip.start_file::<_, ()>(format!("xl/worksheets/sheet{}.xml", i + 1), FileOptions::default())?;
        write!(
            zip,
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>{}</sheetData></worksheet>"#,
            sheet_data(rows)
        )?;
    }

    Ok(zip.finish()?.into_inner())
}

fn sheet_data(rows: &[Vec<Cell>]) -> String {
    let mut xml = String::new();
    for (r, row) in rows.iter().enumerate() {
        let cells: String = row
            .iter()
            .enumerate()
            .filter_map(|(c, cell)| {
                let reference = format!("{}{}", column_letter(c), r + 1);
                match cell {
                    Cell::Empty => None,
                    Cell::Number(n) => Some(format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n)),
                    Cell::Text(s) => Some(format!(
                        r#"<c r="{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                        reference,
                        escape_xml(s)
                    )),
                }
            })
            .collect();
        if !cells.is_empty() {
            xml.push_str(&format!(r#"<row r="{}">{}</row>"#, r + 1, cells));
        }
    }
    xml
}

fn column_letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
