pub mod handlers;
pub mod response;

use crate::config::AppConfig;
use crate::core::registry::ToolRegistry;
use crate::utils::error::Result;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use response::{ApiError, StandardResponse};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
}

impl AppState {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// 依 `[reconcile]` 設定建立 registry
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(ToolRegistry::with_reconcile_defaults(
            &config.reconcile.default_key_column,
            config.default_mode(),
        ))
    }
}

fn tool_route(tool_name: &'static str) -> MethodRouter<AppState> {
    post(move |State(state): State<AppState>, body: Bytes| async move {
        handlers::invoke_tool(&state, tool_name, body).await
    })
}

/// 所有端點；允許任意來源的瀏覽器呼叫
pub fn router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/tools", get(handlers::list_tools))
        .route("/execute", post(handlers::execute))
        .route("/stats/mean", tool_route("analytics_stat_mean"))
        .route("/stats/median", tool_route("analytics_stat_median"))
        .route("/stats/mode", tool_route("analytics_stat_mode"))
        .route("/transform/aggregate", tool_route("analytics_transform_aggregate"))
        .route("/transform/filter", tool_route("analytics_transform_filter"))
        .route("/transform/top_n", tool_route("analytics_transform_top_n"))
        .route("/predict/linear", tool_route("analytics_linear_forecast"))
        .route("/visuals/bar", tool_route("create_bar_chart"))
        .route("/visuals/line", tool_route("create_line_chart"))
        .route("/visuals/pie", tool_route("create_pie_chart"))
        .route("/reconcile", tool_route("analytics_reconcile_datasets"))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// 綁定設定中的位址並服務到收到 Ctrl-C 為止
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = AppState::from_config(config);
    let app = router(state, config.max_body_bytes());

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!("🚀 Analytics engine listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
