use crate::utils::error::{AnalyticsError, ErrorCategory};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 所有分析端點的統一回應外層
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardResponse {
    pub status: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StandardResponse {
    pub fn success(data: Value) -> Self {
        Self {
            status: "success".to_string(),
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// 將領域錯誤轉成 HTTP 回應；狀態碼只在這一層決定
#[derive(Debug)]
pub struct ApiError(pub AnalyticsError);

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self(err)
    }
}

pub fn status_for(err: &AnalyticsError) -> StatusCode {
    match err.category() {
        ErrorCategory::Input => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Configuration | ErrorCategory::System => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!("❌ Request failed: {} (Category: {:?})", self.0, self.0.category());
        } else {
            tracing::warn!("⚠️  Request rejected: {}", self.0);
        }
        (status, Json(StandardResponse::failure(self.0.to_string()))).into_response()
    }
}

pub type ApiResult = std::result::Result<Json<StandardResponse>, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&AnalyticsError::empty_dataset("A")),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&AnalyticsError::InvalidMode {
                mode: "x".to_string(),
                valid: "y".to_string()
            }),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(&AnalyticsError::ToolNotFound {
                name: "x".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_for(&AnalyticsError::Chart {
                message: "encoder".to_string()
            }),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_failure_shape() {
        let body = serde_json::to_value(StandardResponse::failure("boom")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"status": "error", "data": null, "error": "boom"})
        );
    }
}
