use crate::core::frame::{numeric_values, require_column, round_to};
use crate::domain::model::{Record, Scalar};
use crate::utils::error::{AnalyticsError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsInput {
    pub data: Vec<Record>,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanResult {
    pub mean: f64,
    /// 樣本標準差
    pub volatility: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianResult {
    pub median: f64,
    pub iqr: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeResult {
    pub top_value: Scalar,
    pub dominance_pct: f64,
    pub tie: bool,
}

fn numeric_column(data: &[Record], column: &str) -> Result<Vec<f64>> {
    require_column(data, column)?;
    let values = numeric_values(data, column);
    if values.is_empty() {
        return Err(AnalyticsError::processing(format!(
            "Column '{}' has no numeric data",
            column
        )));
    }
    Ok(values)
}

/// 線性內插分位數（輸入需已排序）
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn smart_mean(data: &[Record], column: &str) -> Result<MeanResult> {
    let values = numeric_column(data, column)?;
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;

    let volatility = if values.len() > 1 {
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        variance.sqrt()
    } else {
        0.0
    };

    Ok(MeanResult {
        mean: round_to(mean, 2),
        volatility: round_to(volatility, 2),
    })
}

pub fn smart_median(data: &[Record], column: &str) -> Result<MedianResult> {
    let mut values = numeric_column(data, column)?;
    values.sort_by(f64::total_cmp);

    let median = quantile(&values, 0.5);
    let iqr = quantile(&values, 0.75) - quantile(&values, 0.25);

    Ok(MedianResult {
        median: round_to(median, 2),
        iqr: round_to(iqr, 2),
    })
}

pub fn smart_mode(data: &[Record], column: &str) -> Result<ModeResult> {
    require_column(data, column)?;

    // 以顯示字串計數，保留首次出現的原始值
    let mut counts: IndexMap<String, (&Scalar, usize)> = IndexMap::new();
    let mut total = 0usize;
    for value in data.iter().filter_map(|r| r.get(column)) {
        if value.is_null() {
            continue;
        }
        total += 1;
        counts
            .entry(value.display_string())
            .or_insert((value, 0))
            .1 += 1;
    }

    let mut ranked: Vec<(&Scalar, usize)> = counts.into_values().collect();
    // 穩定排序：同次數時先出現者優先
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let Some(&(top_value, top_count)) = ranked.first() else {
        return Err(AnalyticsError::processing(format!(
            "Column '{}' is empty",
            column
        )));
    };
    let tie = ranked.get(1).is_some_and(|(_, count)| *count == top_count);

    Ok(ModeResult {
        top_value: top_value.clone(),
        dominance_pct: round_to(top_count as f64 / total as f64 * 100.0, 1),
        tie,
    })
}
