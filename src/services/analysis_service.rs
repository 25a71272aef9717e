//! 上游分析服务封装
//!
//! 把仓库标识转换成提示词转发给上游知识库接口，并把返回内容整理成
//! `{ scores, suggestions }` 结构。上游不可用时由调用方回退到示例数据。

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::client::fix_base_url;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

/// 上游失败时返回的说明
pub const FALLBACK_NOTICE: &str = "AI助手请求失败，使用示例数据";

/// 可能携带模型文本回答的字段
const TEXT_FIELDS: &[&str] = &["response", "content", "answer"];

static FENCED_JSON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("valid fenced json regex")
});

/// 构建分析提示词
pub fn build_prompt(repo_name: &str) -> String {
    format!("分析仓库 {}，返回五个健康维度和改进建议", repo_name)
}

/// 示例数据
pub fn demo_payload() -> Value {
    json!({
        "response": FALLBACK_NOTICE,
        "scores": {
            "活跃度": 80,
            "协作度": 70,
            "问题管理": 60,
            "PR管理": 75,
            "流行度": 85
        },
        "suggestions": [
            {"priority": "高", "text": "测试覆盖率低，建议增加单元测试"},
            {"priority": "中", "text": "缺少文档，建议补充README和CONTRIBUTING"},
            {"priority": "低", "text": "项目响应时间较慢，建议设置响应SLA"}
        ]
    })
}

/// 从模型文本中提取 JSON 对象
///
/// 优先取 ```json 代码块，否则取第一个 `{` 到最后一个 `}` 之间的内容。
pub fn extract_json_object(text: &str) -> Option<Value> {
    if let Some(caps) = FENCED_JSON.captures(text) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(&caps[1]) {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(value @ Value::Object(_)) => Some(value),
        _ => None,
    }
}

/// 整理上游返回内容
///
/// - 透传非空 `error`
/// - `radar` 视为 `scores`
/// - 两者都没有时，尝试从文本字段中解析 JSON
pub fn normalize_payload(payload: &Value) -> Option<Value> {
    normalize_inner(payload, true)
}

fn normalize_inner(payload: &Value, allow_text: bool) -> Option<Value> {
    let obj = payload.as_object()?;

    if let Some(message) = obj.get("error").and_then(Value::as_str) {
        if !message.is_empty() {
            return Some(json!({ "error": message }));
        }
    }

    let scores = obj
        .get("scores")
        .or_else(|| obj.get("radar"))
        .filter(|v| v.is_object());
    let suggestions = obj.get("suggestions").filter(|v| v.is_array());

    if scores.is_some() || suggestions.is_some() {
        let mut result = Map::new();
        if let Some(scores) = scores {
            result.insert("scores".to_string(), scores.clone());
        }
        if let Some(suggestions) = suggestions {
            result.insert("suggestions".to_string(), suggestions.clone());
        }
        return Some(Value::Object(result));
    }

    if !allow_text {
        return None;
    }

    text_candidates(obj)
        .filter_map(extract_json_object)
        .find_map(|inner| normalize_inner(&inner, false))
}

fn text_candidates(obj: &Map<String, Value>) -> impl Iterator<Item = &str> {
    let nested = obj.get("data").and_then(Value::as_object);
    TEXT_FIELDS
        .iter()
        .filter_map(move |field| obj.get(*field).and_then(Value::as_str))
        .chain(
            TEXT_FIELDS
                .iter()
                .filter_map(move |field| nested?.get(*field).and_then(Value::as_str)),
        )
}

/// 上游分析服务
pub struct AnalysisService {
    client: Client,
    upstream_url: String,
    api_key: String,
}

impl AnalysisService {
    /// 根据配置创建服务
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("创建 HTTP 客户端失败: {}", e)))?;

        let upstream_url = if config.upstream_url.trim().is_empty() {
            String::new()
        } else {
            fix_base_url(&config.upstream_url)
        };

        Ok(Self {
            client,
            upstream_url,
            api_key: config.upstream_api_key.clone(),
        })
    }

    pub fn upstream_endpoint(&self) -> &str {
        &self.upstream_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// 请求上游并整理结果
    pub async fn analyze(&self, repo_name: &str) -> AppResult<Value> {
        if self.upstream_url.is_empty() {
            return Err(AppError::Config("upstream_url 未配置".to_string()));
        }

        let prompt = build_prompt(repo_name);
        info!("Upstream request: endpoint={}, repo_name={:?}", self.upstream_url, repo_name);

        let mut request = self
            .client
            .post(&self.upstream_url)
            .json(&json!({ "prompt": prompt }));
        if !self.api_key.is_empty() {
            request = request.bearer_auth(&self.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "Upstream error: status={}, body={}",
                status.as_u16(),
                error_text.chars().take(500).collect::<String>()
            );
            return Err(AppError::Upstream(format!("状态码 {}", status.as_u16())));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("响应不是 JSON: {}", e)))?;
        debug!("Upstream payload: {}", payload);

        normalize_payload(&payload)
            .ok_or_else(|| AppError::Upstream("响应中没有分析结果".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};
    use parking_lot::Mutex;
    use std::sync::Arc;

    async fn spawn_upstream(reply: Value, seen: Arc<Mutex<Vec<(String, Value)>>>) -> String {
        let router = Router::new().route(
            "/ui/chat/test",
            post(move |headers: HeaderMap, Json(body): Json<Value>| {
                let seen = Arc::clone(&seen);
                let reply = reply.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    seen.lock().push((auth, body));
                    Json(reply)
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/ui/chat/test", addr)
    }

    #[test]
    fn test_build_prompt() {
        assert_eq!(
            build_prompt("octo/repo"),
            "分析仓库 octo/repo，返回五个健康维度和改进建议"
        );
    }

    #[test]
    fn test_normalize_renames_radar() {
        let payload = json!({
            "radar": {"活跃度": 80},
            "suggestions": [{"priority": "高", "text": "t"}],
            "response": "ok"
        });
        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(
            normalized,
            json!({"scores": {"活跃度": 80}, "suggestions": [{"priority": "高", "text": "t"}]})
        );
    }

    #[test]
    fn test_normalize_passes_error_through() {
        let normalized = normalize_payload(&json!({"error": "仓库不存在"})).unwrap();
        assert_eq!(normalized, json!({"error": "仓库不存在"}));
    }

    #[test]
    fn test_normalize_from_fenced_text() {
        let payload = json!({
            "data": {
                "content": "分析结果如下：\n```json\n{\"radar\": {\"流行度\": 85}, \"suggestions\": []}\n```\n祝好"
            }
        });
        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized, json!({"scores": {"流行度": 85}, "suggestions": []}));
    }

    #[test]
    fn test_normalize_from_bare_text() {
        let payload = json!({"answer": "结果 {\"scores\": {\"a\": 1}} 结束"});
        let normalized = normalize_payload(&payload).unwrap();
        assert_eq!(normalized, json!({"scores": {"a": 1}}));
    }

    #[test]
    fn test_normalize_without_results() {
        assert!(normalize_payload(&json!({"response": "无法分析"})).is_none());
        assert!(normalize_payload(&json!([1, 2])).is_none());
        assert!(normalize_payload(&json!({"scores": [1, 2]})).is_none());
    }

    #[test]
    fn test_demo_payload_shape() {
        let demo = demo_payload();
        assert_eq!(demo["scores"].as_object().unwrap().len(), 5);
        let priorities: Vec<&str> = demo["suggestions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["priority"].as_str().unwrap())
            .collect();
        assert_eq!(priorities, vec!["高", "中", "低"]);
    }

    #[tokio::test]
    async fn test_analyze_without_upstream_is_config_error() {
        let service = AnalysisService::new(&AppConfig::default()).unwrap();
        let err = service.analyze("octo/repo").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_analyze_forwards_prompt_and_key() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let url = spawn_upstream(
            json!({"radar": {"协作度": 70}, "suggestions": []}),
            Arc::clone(&seen),
        )
        .await;

        let config = AppConfig {
            upstream_url: url,
            upstream_api_key: "application-test".to_string(),
            ..Default::default()
        };
        let service = AnalysisService::new(&config).unwrap();
        let result = service.analyze("octo/repo").await.unwrap();
        assert_eq!(result, json!({"scores": {"协作度": 70}, "suggestions": []}));

        let seen = seen.lock();
        assert_eq!(seen[0].0, "Bearer application-test");
        assert_eq!(
            seen[0].1,
            json!({"prompt": "分析仓库 octo/repo，返回五个健康维度和改进建议"})
        );
    }
}
