use crate::utils::error::AnalyticsError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 記錄欄位的鬆散型別值（僅接受 JSON 純量）
///
/// Variant order matters for untagged deserialization: integers that do not
/// fit in `i64` land in `UInt` before they can fall through to `Float`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// 標準字串表示：整數十進位、浮點數保留 `.0`、指數寫成 `1e+20`、文字原樣
    pub fn display_string(&self) -> String {
        match self {
            Scalar::Null => "null".to_string(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::UInt(u) => u.to_string(),
            Scalar::Float(f) => float_string(*f),
            Scalar::Text(s) => s.clone(),
        }
    }

    /// 數值轉換；無法轉換時回傳 None
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(i) => Some(*i as f64),
            Scalar::UInt(u) => Some(*u as f64),
            Scalar::Float(f) if f.is_finite() => Some(*f),
            Scalar::Float(_) => None,
            Scalar::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Scalar::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            Scalar::Null => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Scalar::Int(_) | Scalar::UInt(_) | Scalar::Float(_))
    }

    /// 缺值或顯示字串為空
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// 從 CSV 儲存格推斷型別
    ///
    /// A cell becomes a number or boolean only when its canonical string is
    /// the cell text itself, so `0012`, `+5` or `1.50` stay `Text`.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Scalar::Null;
        }
        let candidate = if let Ok(i) = raw.parse::<i64>() {
            Scalar::Int(i)
        } else if let Ok(u) = raw.parse::<u64>() {
            Scalar::UInt(u)
        } else if let Some(f) = raw.parse::<f64>().ok().filter(|f| f.is_finite()) {
            Scalar::Float(f)
        } else if let Ok(b) = raw.parse::<bool>() {
            Scalar::Bool(b)
        } else {
            return Scalar::Text(raw.to_string());
        };

        if candidate.display_string() == raw {
            candidate
        } else {
            Scalar::Text(raw.to_string())
        }
    }
}

/// 最短往返表示；指數部分帶正負號且至少兩位數（`1e+20`、`1e-05`）
fn float_string(value: f64) -> String {
    let repr = format!("{:?}", value);
    let Some((mantissa, exponent)) = repr.split_once('e') else {
        return repr;
    };
    let (sign, digits) = match exponent.strip_prefix('-') {
        Some(digits) => ('-', digits),
        None => ('+', exponent),
    };
    format!("{}e{}{:0>2}", mantissa, sign, digits)
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar::UInt(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Float(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

/// 欄位名稱 → 值，保留輸入順序
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    pub fields: IndexMap<String, Scalar>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Scalar> {
        self.fields.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Scalar>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Scalar>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

pub type Dataset = Vec<Record>;

/// 對帳時的資料集代號
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::A => write!(f, "A"),
            Side::B => write!(f, "B"),
        }
    }
}

/// 對帳模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// B 有、A 沒有
    MissingInA,
    /// A 有、B 沒有
    MissingInB,
    /// 兩邊都有
    Intersection,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::MissingInA, Mode::MissingInB, Mode::Intersection];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::MissingInA => "missing_in_a",
            Mode::MissingInB => "missing_in_b",
            Mode::Intersection => "intersection",
        }
    }

    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(Mode::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| AnalyticsError::InvalidMode {
                mode: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}
