use crate::utils::error::Result;
use async_trait::async_trait;

/// 可由名稱呼叫的分析工具（供 `/execute` 與外部 orchestrator 使用）
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn invoke(&self, payload: serde_json::Value) -> Result<serde_json::Value>;
}
