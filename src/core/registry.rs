use crate::core::chart::{render_chart, ChartInput, ChartKind};
use crate::core::forecast::{linear_forecast, ForecastInput};
use crate::core::reconcile::{reconcile, ReconcileRequest, DEFAULT_KEY_COLUMN, DEFAULT_MODE};
use crate::core::stats::{smart_mean, smart_median, smart_mode, StatsInput};
use crate::core::transform::{
    apply_filter, group_and_aggregate, top_n, FilterInput, GroupingInput, TopNInput,
};
use crate::domain::model::Mode;
use crate::domain::ports::Tool;
use crate::utils::error::{AnalyticsError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// 以型別化輸入包裝同步運算的 tool
pub struct FnTool<I> {
    name: &'static str,
    description: &'static str,
    handler: fn(I) -> Result<Value>,
    _input: PhantomData<fn(I)>,
}

impl<I> FnTool<I> {
    pub fn new(
        name: &'static str,
        description: &'static str,
        handler: fn(I) -> Result<Value>,
    ) -> Self {
        Self {
            name,
            description,
            handler,
            _input: PhantomData,
        }
    }
}

#[async_trait]
impl<I: DeserializeOwned + 'static> Tool for FnTool<I> {
    fn name(&self) -> &'static str {
        self.name
    }

    fn description(&self) -> &'static str {
        self.description
    }

    async fn invoke(&self, payload: Value) -> Result<Value> {
        let input: I = serde_json::from_value(payload)?;
        (self.handler)(input)
    }
}

/// 對帳 tool；套用服務設定中的預設鍵欄位與模式
pub struct ReconcileTool {
    key_column: String,
    mode: Mode,
}

impl ReconcileTool {
    pub fn new(key_column: impl Into<String>, mode: Mode) -> Self {
        Self {
            key_column: key_column.into(),
            mode,
        }
    }
}

#[async_trait]
impl Tool for ReconcileTool {
    fn name(&self) -> &'static str {
        "analytics_reconcile_datasets"
    }

    fn description(&self) -> &'static str {
        "Cross-references two datasets on a key column and returns the records missing \
         from A (missing_in_a), missing from B (missing_in_b) or present in both (intersection)"
    }

    async fn invoke(&self, payload: Value) -> Result<Value> {
        let request: ReconcileRequest = serde_json::from_value(payload)?;
        let request = request.with_defaults(&self.key_column, self.mode);
        to_value(reconcile(&request)?)
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<&'static str, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊所有內建 tool，對帳使用預設 CUFE / missing_in_a
    pub fn with_default_tools() -> Self {
        Self::with_reconcile_defaults(DEFAULT_KEY_COLUMN, DEFAULT_MODE)
    }

    pub fn with_reconcile_defaults(key_column: &str, mode: Mode) -> Self {
        let mut registry = Self::new();

        registry.register(FnTool::new(
            "analytics_stat_mean",
            "Arithmetic mean and volatility (sample standard deviation) of a numeric column",
            |input: StatsInput| to_value(smart_mean(&input.data, &input.column)?),
        ));
        registry.register(FnTool::new(
            "analytics_stat_median",
            "Median and interquartile range of a numeric column",
            |input: StatsInput| to_value(smart_median(&input.data, &input.column)?),
        ));
        registry.register(FnTool::new(
            "analytics_stat_mode",
            "Most frequent value of a column with its dominance percentage",
            |input: StatsInput| to_value(smart_mode(&input.data, &input.column)?),
        ));
        registry.register(FnTool::new(
            "analytics_transform_aggregate",
            "Groups records by a column and applies sum, mean, count, min or max to another",
            |input: GroupingInput| {
                to_value(group_and_aggregate(
                    &input.data,
                    &input.group_by,
                    &input.target_column,
                    &input.operation,
                )?)
            },
        ));
        registry.register(FnTool::new(
            "analytics_transform_filter",
            "Keeps records whose column compares true against a value (>, <, ==, !=, >=, <=)",
            |input: FilterInput| {
                to_value(apply_filter(
                    &input.data,
                    &input.column,
                    &input.operator,
                    &input.value,
                )?)
            },
        ));
        registry.register(FnTool::new(
            "analytics_transform_top_n",
            "Top (or bottom) N records ordered by a column",
            |input: TopNInput| to_value(top_n(&input.data, &input.column, input.n, input.ascending)),
        ));
        registry.register(FnTool::new(
            "analytics_linear_forecast",
            "Linear trend fit with a projection of future periods",
            |input: ForecastInput| {
                to_value(linear_forecast(
                    &input.data,
                    &input.x_col,
                    &input.y_col,
                    input.periods,
                )?)
            },
        ));
        registry.register(FnTool::new(
            "create_bar_chart",
            "Vertical bar chart as base64 PNG or JSON points",
            |input: ChartInput| to_value(render_chart(ChartKind::Bar, &input)?),
        ));
        registry.register(FnTool::new(
            "create_line_chart",
            "Line chart as base64 PNG or JSON points",
            |input: ChartInput| to_value(render_chart(ChartKind::Line, &input)?),
        ));
        registry.register(FnTool::new(
            "create_pie_chart",
            "Pie chart (x is the category, y the value) as base64 PNG or JSON points",
            |input: ChartInput| to_value(render_chart(ChartKind::Pie, &input)?),
        ));
        registry.register(ReconcileTool::new(key_column, mode));

        tracing::debug!("Registered {} tools", registry.len());
        registry
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        tracing::debug!("Tool registered: '{}'", tool.name());
        self.tools.insert(tool.name(), Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.keys().copied().collect()
    }

    pub fn tools(&self) -> impl Iterator<Item = &Arc<dyn Tool>> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(&self, name: &str, payload: Value) -> Result<Value> {
        let tool = self.get(name).ok_or_else(|| AnalyticsError::ToolNotFound {
            name: name.to_string(),
        })?;
        tracing::info!("🛠️  Executing tool '{}'", name);
        tool.invoke(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_tools_registered() {
        let registry = ToolRegistry::with_default_tools();
        assert_eq!(registry.len(), 11);
        let names = registry.names();
        assert!(names.contains(&"analytics_reconcile_datasets"));
        assert!(names.contains(&"create_pie_chart"));
        // BTreeMap 保證排序
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    async fn test_execute_stats_tool() {
        let registry = ToolRegistry::with_default_tools();
        let result = registry
            .execute(
                "analytics_stat_mean",
                json!({"data": [{"v": 1}, {"v": 3}], "column": "v"}),
            )
            .await
            .unwrap();
        assert_eq!(result["mean"], json!(2.0));
    }

    #[tokio::test]
    async fn test_execute_reconcile_uses_defaults() {
        let registry = ToolRegistry::with_reconcile_defaults("DocKey", Mode::Intersection);
        let result = registry
            .execute(
                "analytics_reconcile_datasets",
                json!({
                    "data_a": [{"dockey": "A1"}, {"dockey": "A2"}],
                    "data_b": [{"DocKey": "a1"}]
                }),
            )
            .await
            .unwrap();
        assert_eq!(result["mode_used"], json!("intersection"));
        assert_eq!(result["match_count"], json!(1));
        assert_eq!(result["key_column_a"], json!("dockey"));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry.execute("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_execute_malformed_payload() {
        let registry = ToolRegistry::with_default_tools();
        let err = registry
            .execute("analytics_stat_mean", json!({"column": "v"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Serialization(_)));
    }
}
