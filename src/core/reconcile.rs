//! Cross-references two independently sourced datasets on a key column.
//!
//! The call is a fixed five-stage pipeline: validate inputs, resolve the key
//! column on each side, index both datasets by normalized key, select the key
//! set for the requested [`Mode`], and assemble the result. Any failure aborts
//! the whole call before indexing starts.

use crate::domain::model::{Dataset, Mode, Record, Scalar, Side};
use crate::utils::error::{AnalyticsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{hash_map, HashMap};

pub const DEFAULT_KEY_COLUMN: &str = "CUFE";
pub const DEFAULT_MODE: Mode = Mode::MissingInA;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub data_a: Dataset,
    pub data_b: Dataset,
    #[serde(default)]
    pub key_column_a: Option<String>,
    #[serde(default)]
    pub key_column_b: Option<String>,
    /// 兩邊共用的預設鍵欄位
    #[serde(default)]
    pub key_column: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl ReconcileRequest {
    pub fn new(data_a: Dataset, data_b: Dataset) -> Self {
        Self {
            data_a,
            data_b,
            key_column_a: None,
            key_column_b: None,
            key_column: None,
            mode: None,
        }
    }

    /// 補上呼叫端未指定的 key_column 與 mode
    pub fn with_defaults(mut self, key_column: &str, mode: Mode) -> Self {
        self.key_column.get_or_insert_with(|| key_column.to_string());
        self.mode.get_or_insert_with(|| mode.as_str().to_string());
        self
    }

    fn shared_column(&self) -> &str {
        self.key_column.as_deref().unwrap_or(DEFAULT_KEY_COLUMN)
    }

    fn column_for(&self, side: Side) -> &str {
        let specific = match side {
            Side::A => self.key_column_a.as_deref(),
            Side::B => self.key_column_b.as_deref(),
        };
        // 只有缺值或空字串才回退；空白字元視為實際欄位名稱
        specific
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| self.shared_column())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileMetadata {
    pub total_records_a: usize,
    pub total_records_b: usize,
    pub valid_keys_a: usize,
    pub valid_keys_b: usize,
    /// 因重複鍵被後者覆蓋的筆數
    pub duplicate_keys_a: usize,
    pub duplicate_keys_b: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    pub summary: String,
    pub match_count: usize,
    pub mode_used: Mode,
    pub key_column_a: String,
    pub key_column_b: String,
    pub data: Dataset,
    pub metadata: ReconcileMetadata,
}

/// 以第一筆記錄的欄位名稱建立的大小寫不敏感索引
struct ColumnLookup<'a> {
    by_folded: HashMap<String, &'a str>,
}

impl<'a> ColumnLookup<'a> {
    fn from_record(record: &'a Record) -> Self {
        let mut by_folded = HashMap::with_capacity(record.fields.len());
        for name in record.field_names() {
            // 大小寫折疊後重名時保留第一個
            by_folded.entry(name.to_lowercase()).or_insert(name);
        }
        Self { by_folded }
    }

    fn resolve(&self, wanted: &str) -> Option<&'a str> {
        self.by_folded.get(&wanted.to_lowercase()).copied()
    }
}

/// 找出資料集中實際的欄位名稱（大小寫不敏感，以第一筆記錄為準）
pub fn resolve_column(dataset: &[Record], side: Side, wanted: &str) -> Result<String> {
    let first = dataset
        .first()
        .ok_or_else(|| AnalyticsError::empty_dataset(side))?;

    ColumnLookup::from_record(first)
        .resolve(wanted)
        .map(str::to_string)
        .ok_or_else(|| AnalyticsError::ColumnNotFound {
            dataset: side.to_string(),
            column: wanted.to_string(),
            available: first.field_names().collect::<Vec<_>>().join(", "),
        })
}

/// 鍵值正規化：轉字串、去除前後空白、轉小寫
pub fn normalize_key(value: &Scalar) -> String {
    value.display_string().trim().to_lowercase()
}

/// 正規化鍵 → 記錄；重複鍵以最後一筆為準
#[derive(Debug)]
pub struct KeyIndex<'a> {
    entries: HashMap<String, &'a Record>,
    total: usize,
    duplicates: usize,
    skipped: usize,
}

impl<'a> KeyIndex<'a> {
    pub fn build(dataset: &'a [Record], column: &str) -> Self {
        let mut entries = HashMap::with_capacity(dataset.len());
        let mut duplicates = 0;
        let mut skipped = 0;

        for record in dataset {
            let value = match record.get(column) {
                Some(value) if !value.is_blank() => value,
                _ => {
                    skipped += 1;
                    continue;
                }
            };

            if entries.insert(normalize_key(value), record).is_some() {
                duplicates += 1;
            }
        }

        Self {
            entries,
            total: dataset.len(),
            duplicates,
            skipped,
        }
    }

    /// 有效鍵數量
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, key: &str) -> Option<&'a Record> {
        self.entries.get(key).copied()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> hash_map::Keys<'_, String, &'a Record> {
        self.entries.keys()
    }
}

/// 依模式計算鍵集合，並回傳應取用記錄的資料集
///
/// Keys come back sorted so output order does not depend on hash iteration.
pub fn select_keys<'i>(
    index_a: &'i KeyIndex<'_>,
    index_b: &'i KeyIndex<'_>,
    mode: Mode,
) -> (Vec<&'i str>, Side) {
    let (mut keys, source): (Vec<&str>, Side) = match mode {
        Mode::MissingInA => (
            index_b
                .keys()
                .filter(|k| !index_a.contains(k))
                .map(String::as_str)
                .collect(),
            Side::B,
        ),
        Mode::MissingInB => (
            index_a
                .keys()
                .filter(|k| !index_b.contains(k))
                .map(String::as_str)
                .collect(),
            Side::A,
        ),
        Mode::Intersection => {
            // 走訪較小的一邊
            let (small, large) = if index_a.len() <= index_b.len() {
                (index_a, index_b)
            } else {
                (index_b, index_a)
            };
            (
                small
                    .keys()
                    .filter(|k| large.contains(k))
                    .map(String::as_str)
                    .collect(),
                Side::A,
            )
        }
    };

    keys.sort_unstable();
    (keys, source)
}

fn summary_for(mode: Mode, count: usize) -> String {
    match mode {
        Mode::MissingInA => format!(
            "Reconciliation complete. Found {} records in dataset B that are not in dataset A.",
            count
        ),
        Mode::MissingInB => format!(
            "Reconciliation complete. Found {} records in dataset A that are not in dataset B.",
            count
        ),
        Mode::Intersection => format!(
            "Reconciliation complete. Found {} records present in both datasets.",
            count
        ),
    }
}

pub fn assemble(
    keys: &[&str],
    source: &KeyIndex<'_>,
    mode: Mode,
    (key_column_a, key_column_b): (String, String),
    (index_a, index_b): (&KeyIndex<'_>, &KeyIndex<'_>),
) -> ReconciliationResult {
    let data: Dataset = keys
        .iter()
        .filter_map(|key| source.get(key))
        .cloned()
        .collect();
    let match_count = data.len();

    ReconciliationResult {
        summary: summary_for(mode, match_count),
        match_count,
        mode_used: mode,
        key_column_a,
        key_column_b,
        data,
        metadata: ReconcileMetadata {
            total_records_a: index_a.total(),
            total_records_b: index_b.total(),
            valid_keys_a: index_a.len(),
            valid_keys_b: index_b.len(),
            duplicate_keys_a: index_a.duplicates(),
            duplicate_keys_b: index_b.duplicates(),
        },
    }
}

pub fn reconcile(request: &ReconcileRequest) -> Result<ReconciliationResult> {
    // 1. 輸入驗證
    if request.data_a.is_empty() {
        return Err(AnalyticsError::empty_dataset(Side::A));
    }
    if request.data_b.is_empty() {
        return Err(AnalyticsError::empty_dataset(Side::B));
    }
    let mode = match request.mode.as_deref() {
        Some(raw) => raw.parse::<Mode>()?,
        None => DEFAULT_MODE,
    };

    // 2. 欄位解析
    let column_a = resolve_column(&request.data_a, Side::A, request.column_for(Side::A))?;
    let column_b = resolve_column(&request.data_b, Side::B, request.column_for(Side::B))?;
    tracing::debug!("Resolved key columns: A='{}', B='{}'", column_a, column_b);

    // 3. 建立索引
    let index_a = KeyIndex::build(&request.data_a, &column_a);
    let index_b = KeyIndex::build(&request.data_b, &column_b);
    tracing::debug!(
        "Indexed A: {} keys ({} skipped, {} duplicates); B: {} keys ({} skipped, {} duplicates)",
        index_a.len(),
        index_a.skipped(),
        index_a.duplicates(),
        index_b.len(),
        index_b.skipped(),
        index_b.duplicates()
    );

    // 4. 集合運算
    let (keys, source) = select_keys(&index_a, &index_b, mode);
    let source_index = match source {
        Side::A => &index_a,
        Side::B => &index_b,
    };

    // 5. 組裝結果
    let result = assemble(
        &keys,
        source_index,
        mode,
        (column_a, column_b),
        (&index_a, &index_b),
    );

    tracing::info!(
        "🔎 Reconciled {} vs {} records in mode {}: {} matches",
        result.metadata.total_records_a,
        result.metadata.total_records_b,
        mode,
        result.match_count
    );

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: serde_json::Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_resolve_column_case_insensitive() {
        let data = dataset(json!([{"CUFE": "X1", "Date": "2024-01-01"}]));
        assert_eq!(resolve_column(&data, Side::A, "cufe").unwrap(), "CUFE");
        assert_eq!(resolve_column(&data, Side::A, "DATE").unwrap(), "Date");
    }

    #[test]
    fn test_resolve_column_first_fold_wins() {
        let data = dataset(json!([{"Key": 1, "KEY": 2}]));
        assert_eq!(resolve_column(&data, Side::A, "key").unwrap(), "Key");
    }

    #[test]
    fn test_resolve_column_not_found() {
        let data = dataset(json!([{"CUFE": "X1", "Date": "2024-01-01"}]));
        let err = resolve_column(&data, Side::B, "invoice_id").unwrap_err();
        match &err {
            AnalyticsError::ColumnNotFound {
                dataset,
                column,
                available,
            } => {
                assert_eq!(dataset, "B");
                assert_eq!(column, "invoice_id");
                assert_eq!(available, "CUFE, Date");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_resolve_column_empty() {
        let err = resolve_column(&[], Side::A, "CUFE").unwrap_err();
        assert!(matches!(err, AnalyticsError::EmptyDataset { ref dataset } if dataset == "A"));
    }

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(&Scalar::from(" ABC123 ")), "abc123");
        assert_eq!(normalize_key(&Scalar::from("Abc123")), "abc123");
        assert_eq!(normalize_key(&Scalar::Int(42)), "42");
        assert_eq!(normalize_key(&Scalar::Float(42.0)), "42.0");
        assert_eq!(normalize_key(&Scalar::Bool(true)), "true");
    }

    #[test]
    fn test_index_skips_missing_and_empty() {
        let data = dataset(json!([
            {"id": "a"},
            {"id": ""},
            {"id": null},
            {"other": "x"},
            {"id": "   "}
        ]));
        let index = KeyIndex::build(&data, "id");
        assert_eq!(index.total(), 5);
        assert_eq!(index.skipped(), 3);
        // 只有空白的鍵在正規化前不為空，仍會被索引
        assert_eq!(index.len(), 2);
        assert!(index.contains("a"));
        assert!(index.contains(""));
    }

    #[test]
    fn test_index_last_write_wins() {
        let data = dataset(json!([
            {"id": "K1", "v": 1},
            {"id": " k1", "v": 2}
        ]));
        let index = KeyIndex::build(&data, "id");
        assert_eq!(index.len(), 1);
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.get("k1").unwrap().get("v"), Some(&Scalar::Int(2)));
    }

    #[test]
    fn test_select_keys_modes() {
        let a = dataset(json!([{"k": "1"}, {"k": "2"}, {"k": "3"}]));
        let b = dataset(json!([{"k": "3"}, {"k": "2"}, {"k": "4"}]));
        let index_a = KeyIndex::build(&a, "k");
        let index_b = KeyIndex::build(&b, "k");

        let (keys, source) = select_keys(&index_a, &index_b, Mode::MissingInA);
        assert_eq!(keys, vec!["4"]);
        assert_eq!(source, Side::B);

        let (keys, source) = select_keys(&index_a, &index_b, Mode::MissingInB);
        assert_eq!(keys, vec!["1"]);
        assert_eq!(source, Side::A);

        let (keys, source) = select_keys(&index_a, &index_b, Mode::Intersection);
        assert_eq!(keys, vec!["2", "3"]);
        assert_eq!(source, Side::A);
    }

    #[test]
    fn test_intersection_surfaces_a_side_record() {
        let a = dataset(json!([{"CUFE": "X1", "amt": 10}]));
        let b = dataset(json!([{"cufe": "x1 ", "amt": 99}, {"cufe": "Y2"}]));
        let mut request = ReconcileRequest::new(a, b);
        request.mode = Some("intersection".to_string());

        let result = reconcile(&request).unwrap();
        assert_eq!(result.match_count, 1);
        assert_eq!(result.data[0].get("amt"), Some(&Scalar::Int(10)));
        assert_eq!(result.key_column_a, "CUFE");
        assert_eq!(result.key_column_b, "cufe");
    }

    #[test]
    fn test_defaults_applied() {
        let a = dataset(json!([{"CUFE": "X1"}]));
        let b = dataset(json!([{"CUFE": "X2"}]));
        let result = reconcile(&ReconcileRequest::new(a, b)).unwrap();
        assert_eq!(result.mode_used, Mode::MissingInA);
        assert_eq!(result.match_count, 1);
        assert!(result.summary.contains("Found 1 records in dataset B"));
    }

    #[test]
    fn test_blank_override_falls_back() {
        let a = dataset(json!([{"ref": "X1"}]));
        let b = dataset(json!([{"ref": "X1"}]));
        let mut request = ReconcileRequest::new(a, b);
        request.key_column = Some("REF".to_string());
        request.key_column_a = Some("".to_string());
        request.mode = Some("intersection".to_string());

        let result = reconcile(&request).unwrap();
        assert_eq!(result.key_column_a, "ref");
        assert_eq!(result.match_count, 1);
    }

    #[test]
    fn test_whitespace_override_is_used_verbatim() {
        let a = dataset(json!([{"ref": "X1"}]));
        let b = dataset(json!([{"ref": "X1"}]));
        let mut request = ReconcileRequest::new(a, b);
        request.key_column = Some("REF".to_string());
        request.key_column_b = Some(" ".to_string());

        let err = reconcile(&request).unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::ColumnNotFound { ref dataset, ref column, .. }
                if dataset == "B" && column == " "
        ));
    }

    #[test]
    fn test_mode_checked_before_columns() {
        let a = dataset(json!([{"x": 1}]));
        let b = dataset(json!([{"y": 1}]));
        let mut request = ReconcileRequest::new(a, b);
        request.mode = Some("foo".to_string());
        let err = reconcile(&request).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidMode { .. }));
    }

    #[test]
    fn test_with_defaults_keeps_explicit_values() {
        let mut request = ReconcileRequest::new(vec![], vec![]);
        request.mode = Some("intersection".to_string());
        let request = request.with_defaults("DocKey", Mode::MissingInB);
        assert_eq!(request.key_column.as_deref(), Some("DocKey"));
        assert_eq!(request.mode.as_deref(), Some("intersection"));
    }
}
