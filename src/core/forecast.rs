use crate::core::frame::{numeric_values, require_column, round_to, INPUT};
use crate::domain::model::Record;
use crate::utils::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};

/// 斜率絕對值低於此門檻視為平穩
const TREND_THRESHOLD: f64 = 0.1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInput {
    pub data: Vec<Record>,
    pub x_col: String,
    pub y_col: String,
    #[serde(default = "default_periods")]
    pub periods: usize,
}

fn default_periods() -> usize {
    3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub step_future: usize,
    pub predicted_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub trend: Trend,
    pub slope: f64,
    pub r_squared: f64,
    pub forecast: Vec<ForecastPoint>,
}

/// 以序列索引為 x 的一次最小平方法擬合，並向後推估 `periods` 期
///
/// `x_col` only labels the series; the fit uses the row position of each
/// numeric `y_col` value.
pub fn linear_forecast(
    data: &[Record],
    x_col: &str,
    y_col: &str,
    periods: usize,
) -> Result<ForecastResult> {
    if data.is_empty() {
        return Err(AnalyticsError::empty_dataset(INPUT));
    }
    require_column(data, y_col)?;

    let ys = numeric_values(data, y_col);
    if ys.len() < 2 {
        return Err(AnalyticsError::processing(format!(
            "Need at least 2 numeric values in '{}' to fit a trend, found {}",
            y_col,
            ys.len()
        )));
    }
    tracing::debug!("Fitting {} points of '{}' over '{}'", ys.len(), y_col, x_col);

    let n = ys.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (y - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for (i, y) in ys.iter().enumerate() {
        let predicted = slope * i as f64 + intercept;
        ss_res += (y - predicted).powi(2);
        ss_tot += (y - mean_y).powi(2);
    }
    let r_squared = if ss_tot != 0.0 {
        1.0 - ss_res / ss_tot
    } else {
        0.0
    };

    let last_x = ys.len() - 1;
    let forecast = (1..=periods)
        .map(|step| ForecastPoint {
            step_future: step,
            predicted_value: round_to(slope * (last_x + step) as f64 + intercept, 2),
        })
        .collect();

    let trend = if slope > TREND_THRESHOLD {
        Trend::Increasing
    } else if slope < -TREND_THRESHOLD {
        Trend::Decreasing
    } else {
        Trend::Stable
    };

    Ok(ForecastResult {
        trend,
        slope: round_to(slope, 4),
        r_squared: round_to(r_squared, 4),
        forecast,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn series(values: serde_json::Value) -> Vec<Record> {
        serde_json::from_value(values).unwrap()
    }

    #[test]
    fn test_perfect_line() {
        let data = series(json!([
            {"month": "2024-01", "sales": 10},
            {"month": "2024-02", "sales": 12},
            {"month": "2024-03", "sales": 14},
            {"month": "2024-04", "sales": 16}
        ]));
        let result = linear_forecast(&data, "month", "sales", 2).unwrap();
        assert_eq!(result.trend, Trend::Increasing);
        assert_eq!(result.slope, 2.0);
        assert_eq!(result.r_squared, 1.0);
        assert_eq!(result.forecast.len(), 2);
        assert_eq!(result.forecast[0].step_future, 1);
        assert_eq!(result.forecast[0].predicted_value, 18.0);
        assert_eq!(result.forecast[1].predicted_value, 20.0);
    }

    #[test]
    fn test_flat_series_is_stable() {
        let data = series(json!([{"y": 5}, {"y": 5}, {"y": "bad"}, {"y": 5}]));
        let result = linear_forecast(&data, "x", "y", 1).unwrap();
        assert_eq!(result.trend, Trend::Stable);
        assert_eq!(result.r_squared, 0.0);
        assert_eq!(result.forecast[0].predicted_value, 5.0);
    }

    #[test]
    fn test_decreasing() {
        let data = series(json!([{"y": 9}, {"y": 6}, {"y": 3}]));
        let result = linear_forecast(&data, "x", "y", 1).unwrap();
        assert_eq!(result.trend, Trend::Decreasing);
        assert_eq!(result.slope, -3.0);
    }

    #[test]
    fn test_not_enough_points() {
        let data = series(json!([{"y": 1}]));
        assert!(matches!(
            linear_forecast(&data, "x", "y", 3),
            Err(AnalyticsError::Processing { .. })
        ));
        assert!(matches!(
            linear_forecast(&[], "x", "y", 3),
            Err(AnalyticsError::EmptyDataset { .. })
        ));
    }
}
