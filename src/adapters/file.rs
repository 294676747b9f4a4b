use crate::config::cli::ReportFormat;
use crate::core::frame::columns;
use crate::domain::model::{Dataset, Record, Scalar};
use crate::core::reconcile::ReconciliationResult;
use crate::utils::error::{AnalyticsError, Result};
use std::fs;
use std::path::Path;

/// 依副檔名讀取資料集：`.json`（物件陣列）或 `.csv`（含標題列）
pub fn load_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let dataset = match extension.as_str() {
        "json" => parse_json_dataset(&fs::read_to_string(path)?)?,
        "csv" => parse_csv_dataset(fs::File::open(path)?)?,
        _ => {
            return Err(AnalyticsError::validation(format!(
                "Unsupported dataset file '{}': expected .json or .csv",
                path.display()
            )))
        }
    };

    tracing::debug!("📥 Loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

pub fn parse_json_dataset(content: &str) -> Result<Dataset> {
    Ok(serde_json::from_str(content)?)
}

/// 每個儲存格以 `Scalar::infer` 推斷型別，空字串視為缺值
pub fn parse_csv_dataset<R: std::io::Read>(reader: R) -> Result<Dataset> {
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut dataset = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: Record = headers
            .iter()
            .zip(row.iter())
            .map(|(header, cell)| (header, Scalar::infer(cell)))
            .collect();
        dataset.push(record);
    }
    Ok(dataset)
}

/// 將對帳結果序列化：JSON 為完整結果，CSV 僅輸出 `data` 記錄
pub fn render_report(result: &ReconciliationResult, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(result)?),
        ReportFormat::Csv => records_to_csv(&result.data),
    }
}

/// 欄位為所有記錄欄位的聯集（依首次出現順序），缺值寫成空字串
pub fn records_to_csv(records: &[Record]) -> Result<String> {
    let header = columns(records);
    let mut writer = csv::Writer::from_writer(Vec::new());

    if header.is_empty() {
        return Ok(String::new());
    }

    writer.write_record(header.iter())?;
    for record in records {
        writer.write_record(header.iter().map(|column| match record.get(column) {
            Some(Scalar::Null) | None => String::new(),
            Some(value) => value.display_string(),
        }))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AnalyticsError::processing(format!("Failed to flush CSV writer: {}", e)))?;
    String::from_utf8(bytes)
        .map_err(|e| AnalyticsError::processing(format!("CSV output is not valid UTF-8: {}", e)))
}

/// 寫入檔案，必要時建立上層目錄
pub fn write_output<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    tracing::info!("📁 Report written to {}", path.display());
    Ok(())
}
