use super::response::{ApiResult, StandardResponse};
use super::AppState;
use crate::utils::error::AnalyticsError;
use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
pub struct ExecutionRequest {
    pub tool_name: String,
    pub payload: Value,
}

#[derive(Debug, Serialize)]
struct ToolInfo {
    name: &'static str,
    description: &'static str,
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "online", "service": "analytics-engine"}))
}

pub async fn list_tools(State(state): State<AppState>) -> Json<StandardResponse> {
    let tools: Vec<ToolInfo> = state
        .registry
        .tools()
        .map(|tool| ToolInfo {
            name: tool.name(),
            description: tool.description(),
        })
        .collect();
    Json(StandardResponse::success(json!(tools)))
}

pub async fn execute(State(state): State<AppState>, body: Bytes) -> ApiResult {
    let request: ExecutionRequest = parse_body(&body)?;
    run_tool(&state, &request.tool_name, request.payload).await
}

/// 專用端點：主體直接作為指定 tool 的輸入
pub async fn invoke_tool(state: &AppState, tool_name: &str, body: Bytes) -> ApiResult {
    let payload: Value = parse_body(&body)?;
    run_tool(state, tool_name, payload).await
}

async fn run_tool(state: &AppState, tool_name: &str, payload: Value) -> ApiResult {
    tracing::info!("📨 Request for tool '{}'", tool_name);
    let data = state.registry.execute(tool_name, payload).await?;
    Ok(Json(StandardResponse::success(data)))
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T, AnalyticsError> {
    if body.is_empty() {
        return Err(AnalyticsError::validation("Request body is empty"));
    }
    Ok(serde_json::from_slice(body)?)
}
