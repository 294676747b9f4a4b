use crate::core::frame::{has_column, require_column};
use crate::domain::model::{Record, Scalar};
use crate::utils::error::{AnalyticsError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterInput {
    pub data: Vec<Record>,
    pub column: String,
    pub operator: String,
    pub value: Scalar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingInput {
    pub data: Vec<Record>,
    pub group_by: String,
    pub target_column: String,
    #[serde(default = "default_operation")]
    pub operation: String,
}

fn default_operation() -> String {
    "sum".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopNInput {
    pub data: Vec<Record>,
    pub column: String,
    #[serde(default = "default_n")]
    pub n: usize,
    #[serde(default)]
    pub ascending: bool,
}

fn default_n() -> usize {
    5
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Gt,
    Lt,
    Eq,
    Ne,
    Gte,
    Lte,
}

impl FromStr for FilterOperator {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            ">" | "gt" => Ok(Self::Gt),
            "<" | "lt" => Ok(Self::Lt),
            "==" | "eq" => Ok(Self::Eq),
            "!=" | "ne" => Ok(Self::Ne),
            ">=" | "gte" => Ok(Self::Gte),
            "<=" | "lte" => Ok(Self::Lte),
            other => Err(AnalyticsError::validation(format!(
                "Operator '{}' is not supported. Use one of: >, <, ==, !=, >=, <=",
                other
            ))),
        }
    }
}

impl FilterOperator {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Self::Gt => ordering == Ordering::Greater,
            Self::Lt => ordering == Ordering::Less,
            Self::Eq => ordering == Ordering::Equal,
            Self::Ne => ordering != Ordering::Equal,
            Self::Gte => ordering != Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
    Count,
    Min,
    Max,
}

impl FromStr for Aggregation {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sum" => Ok(Self::Sum),
            "mean" | "avg" => Ok(Self::Mean),
            "count" => Ok(Self::Count),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            other => Err(AnalyticsError::validation(format!(
                "Operation '{}' is not supported. Use one of: sum, mean, count, min, max",
                other
            ))),
        }
    }
}

impl Aggregation {
    fn apply(&self, values: &[f64]) -> Scalar {
        match self {
            Self::Count => Scalar::Int(values.len() as i64),
            Self::Sum => Scalar::Float(values.iter().sum()),
            _ if values.is_empty() => Scalar::Null,
            Self::Mean => Scalar::Float(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => Scalar::Float(values.iter().copied().fold(f64::INFINITY, f64::min)),
            Self::Max => Scalar::Float(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        }
    }
}

/// 兩者皆為數值時以數值比較，否則比較顯示字串
fn compare_scalars(left: &Scalar, right: &Scalar, numeric: bool) -> Ordering {
    if numeric {
        if let (Some(l), Some(r)) = (left.as_f64(), right.as_f64()) {
            return l.total_cmp(&r);
        }
    }
    left.display_string().cmp(&right.display_string())
}

pub fn apply_filter(
    data: &[Record],
    column: &str,
    operator: &str,
    value: &Scalar,
) -> Result<Vec<Record>> {
    let operator: FilterOperator = operator.parse()?;
    if data.is_empty() || !has_column(data, column) {
        return Ok(Vec::new());
    }

    let numeric = value.is_numeric() || matches!(value, Scalar::Bool(_));
    let target = value.as_f64();

    let filtered = data
        .iter()
        .filter(|record| {
            let Some(cell) = present(record, column) else {
                return false;
            };
            if numeric {
                match (cell.as_f64(), target) {
                    (Some(l), Some(r)) => operator.accepts(l.total_cmp(&r)),
                    _ => false,
                }
            } else {
                operator.accepts(cell.display_string().cmp(&value.display_string()))
            }
        })
        .cloned()
        .collect();

    Ok(filtered)
}

pub fn group_and_aggregate(
    data: &[Record],
    group_by: &str,
    target_column: &str,
    operation: &str,
) -> Result<Vec<Record>> {
    require_column(data, group_by)?;
    require_column(data, target_column)?;
    let operation: Aggregation = operation.parse()?;

    let mut groups: IndexMap<String, (Scalar, Vec<f64>)> = IndexMap::new();
    for record in data {
        let (Some(key), Some(target)) = (record.get(group_by), record.get(target_column)) else {
            continue;
        };
        if key.is_null() || target.is_null() {
            continue;
        }
        let entry = groups
            .entry(key.display_string())
            .or_insert_with(|| (key.clone(), Vec::new()));
        if let Some(v) = target.as_f64() {
            entry.1.push(v);
        }
    }

    let numeric_keys = groups.values().all(|(key, _)| key.as_f64().is_some());
    let mut rows: Vec<(Scalar, Vec<f64>)> = groups.into_values().collect();
    rows.sort_by(|a, b| compare_scalars(&a.0, &b.0, numeric_keys));

    Ok(rows
        .into_iter()
        .map(|(key, values)| {
            let mut record = Record::new();
            record.insert(group_by, key);
            record.insert(target_column, operation.apply(&values));
            record
        })
        .collect())
}

fn present<'r>(record: &'r Record, column: &str) -> Option<&'r Scalar> {
    record.get(column).filter(|v| !v.is_null())
}

pub fn top_n(data: &[Record], column: &str, n: usize, ascending: bool) -> Vec<Record> {
    if data.is_empty() || !has_column(data, column) {
        return Vec::new();
    }

    let numeric = data
        .iter()
        .filter_map(|r| present(r, column))
        .all(|v| v.as_f64().is_some());

    let mut sorted: Vec<&Record> = data.iter().collect();
    sorted.sort_by(|a, b| match (present(a, column), present(b, column)) {
        (Some(l), Some(r)) => {
            let ordering = compare_scalars(l, r, numeric);
            if ascending {
                ordering
            } else {
                ordering.reverse()
            }
        }
        // 缺值一律排在最後
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    sorted.into_iter().take(n).cloned().collect()
}
