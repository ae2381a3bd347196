use crate::domain::model::WardRecord;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineSummary {
    pub files: usize,
    pub records: usize,
    pub output: String,
}

pub fn encode_records(records: &[WardRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::processing(format!("Failed to flush CSV writer: {}", e)))
}

pub fn decode_records(bytes: &[u8]) -> Result<Vec<WardRecord>> {
    let mut reader = csv::Reader::from_reader(bytes);
    let records = reader.deserialize().collect::<std::result::Result<Vec<WardRecord>, _>>()?;
    Ok(records)
}

/// 依檔名 (即日期) 順序串接所有 staging CSV，寫成單一 processed 檔案
pub async fn combine_staging<S: Storage>(
    storage: &S,
    staging_dir: &str,
    output: &str,
) -> Result<CombineSummary> {
    let files: Vec<String> = storage
        .list_files(staging_dir)
        .await?
        .into_iter()
        .filter(|f| f.ends_with(".csv"))
        .collect();

    if files.is_empty() {
        return Err(EtlError::processing(format!(
            "No staging files found in '{}'; run `wardstats transform` first",
            staging_dir
        )));
    }

    let mut combined = Vec::new();
    for file in &files {
        let bytes = storage.read_file(&format!("{}/{}", staging_dir, file)).await?;
        let records = decode_records(&bytes)?;
        tracing::debug!("{}: {} records", file, records.len());
        combined.extend(records);
    }

    storage.write_file(output, &encode_records(&combined)?).await?;
    tracing::info!(
        "📦 Written combined file to {} ({} files, {} records)",
        output,
        files.len(),
        combined.len()
    );

    Ok(CombineSummary {
        files: files.len(),
        records: combined.len(),
        output: output.to_string(),
    })
}
