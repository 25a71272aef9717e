//! 仓库分析端点

use axum::{
    extract::{rejection::FormRejection, State},
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::services::demo_payload;
use crate::state::AppState;

/// 仓库标识为空时的提示
pub const EMPTY_REPO_MESSAGE: &str = "请输入仓库名称";

/// 分析表单
#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub repo_name: String,
}

/// 分析仓库
///
/// 参数错误以 `{ "error": ... }` 形式返回；上游失败时返回示例数据。
async fn analyze(
    State(state): State<Arc<AppState>>,
    form: Result<Form<AnalyzeForm>, FormRejection>,
) -> AppResult<Json<Value>> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let repo_name = form.repo_name.as_str();

    let started = Instant::now();
    let logger = &state.request_logger;
    let entry = logger.start(
        repo_name,
        state.analysis.upstream_endpoint(),
        state.analysis.api_key(),
    );

    // 仅空白视为未填写；非空标识原样转发
    if repo_name.trim().is_empty() {
        logger.log_rejected(entry, started, EMPTY_REPO_MESSAGE);
        return Ok(Json(json!({ "error": EMPTY_REPO_MESSAGE })));
    }

    match state.analysis.analyze(repo_name).await {
        Ok(result) => {
            let suggestion_count = result["suggestions"].as_array().map_or(0, Vec::len);
            info!("Analyze done: repo_name={:?}, suggestions={}", repo_name, suggestion_count);
            logger.log_success(entry, started, suggestion_count);
            Ok(Json(result))
        }
        Err(e) => {
            warn!("Upstream analysis failed, using demo data: repo_name={:?}, error={}", repo_name, e);
            logger.log_fallback(entry, started, &e.to_string());
            Ok(Json(demo_payload()))
        }
    }
}

/// 创建分析路由
pub fn analyze_routes() -> Router<Arc<AppState>> {
    Router::new().route("/analyze", post(analyze))
}
