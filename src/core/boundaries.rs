use crate::domain::model::Cell;
use crate::utils::error::{EtlError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// ICB 邊界 (GeoJSON FeatureCollection)
///
/// 統計資料用 ODS 代碼 (例如 `QT6`)，邊界檔用 ONS 代碼 (例如 `E54000036`)，
/// 所以載入後要先用對照表把 feature 的代碼屬性換成 ODS 代碼。
#[derive(Debug, Clone)]
pub struct BoundarySet {
    geojson: Value,
    code_property: String,
    name_property: String,
}

impl BoundarySet {
    pub fn from_geojson(geojson: Value, code_property: &str, name_property: &str) -> Result<Self> {
        if geojson.get("features").and_then(Value::as_array).is_none() {
            return Err(EtlError::ValidationError {
                message: "boundary file is not a GeoJSON FeatureCollection".to_string(),
            });
        }

        Ok(Self {
            geojson,
            code_property: code_property.to_string(),
            name_property: name_property.to_string(),
        })
    }

    pub fn from_file(path: &Path, code_property: &str, name_property: &str) -> Result<Self> {
        let content = std::fs::read(path)?;
        let geojson: Value = serde_json::from_slice(&content)?;
        Self::from_geojson(geojson, code_property, name_property)
    }

    pub fn geojson(&self) -> &Value {
        &self.geojson
    }

    /// plotly 的 `featureidkey`
    pub fn feature_id_key(&self) -> String {
        format!("properties.{}", self.code_property)
    }

    fn features(&self) -> impl Iterator<Item = &Value> {
        self.geojson
            .get("features")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.features().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 依對照表替換每個 feature 的代碼，回傳成功替換的數量
    pub fn rekey(&mut self, lookup: &HashMap<String, String>) -> usize {
        let code_property = self.code_property.clone();
        let mut rekeyed = 0;

        let features = self
            .geojson
            .get_mut("features")
            .and_then(Value::as_array_mut)
            .into_iter()
            .flatten();

        for feature in features {
            let Some(properties) = feature.get_mut("properties").and_then(Value::as_object_mut) else {
                continue;
            };
            let Some(code) = properties
                .get(&code_property)
                .and_then(Value::as_str)
                .map(str::to_string)
            else {
                continue;
            };

            match lookup.get(&code) {
                Some(ods) => {
                    properties.insert(code_property.clone(), Value::String(ods.clone()));
                    rekeyed += 1;
                }
                None => tracing::warn!("No ODS code for boundary feature {}", code),
            }
        }

        rekeyed
    }

    /// 代碼 -> ICB 名稱
    pub fn icb_name_lookup(&self) -> HashMap<String, String> {
        self.features()
            .filter_map(|feature| {
                let properties = feature.get("properties")?;
                let code = properties.get(&self.code_property)?.as_str()?;
                let name = properties.get(&self.name_property)?.as_str()?;
                Some((code.to_string(), name.to_string()))
            })
            .collect()
    }
}

/// 從對照表的列中取出 ONS 代碼 -> ODS 代碼；第一列是標題
pub fn code_lookup_from_rows(
    rows: &[Vec<Cell>],
    code_column: &str,
    ods_column: &str,
) -> Result<HashMap<String, String>> {
    let header = rows.first().ok_or_else(|| EtlError::ValidationError {
        message: "lookup sheet is empty".to_string(),
    })?;

    let position = |name: &str| {
        header
            .iter()
            .position(|cell| cell.as_text().trim() == name)
            .ok_or_else(|| EtlError::ValidationError {
                message: format!("lookup sheet has no '{}' column", name),
            })
    };
    let code_index = position(code_column)?;
    let ods_index = position(ods_column)?;

    let mut lookup = HashMap::new();
    for row in &rows[1..] {
        let (Some(code), Some(ods)) = (row.get(code_index), row.get(ods_index)) else {
            continue;
        };
        let (code, ods) = (code.as_text().trim().to_string(), ods.as_text().trim().to_string());
        if code.is_empty() || ods.is_empty() {
            continue;
        }
        // 對照表是以更細的地區為單位，同一個 ICB 會重複出現
        lookup.entry(code).or_insert(ods);
    }

    Ok(lookup)
}

pub fn read_code_lookup(path: &Path, code_column: &str, ods_column: &str) -> Result<HashMap<String, String>> {
    let bytes = std::fs::read(path)?;
    let rows = crate::core::workbook::read_sheet_rows(bytes, &path.display().to_string(), 0)?;
    code_lookup_from_rows(&rows, code_column, ods_column)
}
