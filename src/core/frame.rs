use crate::domain::model::Record;
use crate::utils::error::{AnalyticsError, Result};
use indexmap::IndexSet;

/// 非對帳操作在錯誤訊息中使用的資料集名稱
pub const INPUT: &str = "input";

/// 所有記錄欄位名稱的聯集（依首次出現順序）
pub fn columns(data: &[Record]) -> IndexSet<&str> {
    data.iter().flat_map(Record::field_names).collect()
}

pub fn has_column(data: &[Record], column: &str) -> bool {
    data.iter().any(|record| record.contains(column))
}

pub fn require_column(data: &[Record], column: &str) -> Result<()> {
    if data.is_empty() {
        return Err(AnalyticsError::empty_dataset(INPUT));
    }
    if !has_column(data, column) {
        return Err(AnalyticsError::ColumnNotFound {
            dataset: INPUT.to_string(),
            column: column.to_string(),
            available: columns(data).into_iter().collect::<Vec<_>>().join(", "),
        });
    }
    Ok(())
}

/// 取出可轉為數值的值，略過缺值與無法轉換者
pub fn numeric_values(data: &[Record], column: &str) -> Vec<f64> {
    data.iter()
        .filter_map(|record| record.get(column))
        .filter_map(|value| value.as_f64())
        .collect()
}

pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
