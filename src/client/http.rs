//! 分析服务 HTTP 客户端

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error, info};

use super::endpoint::build_analyze_endpoint;
use super::types::ClientError;
use crate::config::AppConfig;
use crate::models::{AnalysisRequest, AnalysisResponse};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// 分析服务客户端
///
/// 每次调用发出一个表单 POST 请求，不做重试。
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
}

impl AnalysisClient {
    /// 创建新的分析客户端
    pub fn new(server_url: impl AsRef<str>, timeout: Duration) -> Result<Self, ClientError> {
        let server_url = server_url.as_ref();
        if server_url.trim().is_empty() {
            return Err(ClientError::ConfigError("server_url is required".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(ClientError::HttpError)?;

        Ok(Self {
            client,
            endpoint: build_analyze_endpoint(server_url),
        })
    }

    /// 根据配置创建客户端
    pub fn from_config(config: &AppConfig) -> Result<Self, ClientError> {
        Self::new(&config.server_url, Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 提交分析请求并解析响应
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, ClientError> {
        info!("Analyze request: repo_name={:?}, endpoint={}", request.repo_name, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, FORM_CONTENT_TYPE)
            .body(request.to_form_body())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("Analyze response: status={}, length={}", status.as_u16(), body.len());

        match serde_json::from_str::<AnalysisResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(_) if !status.is_success() => {
                error!(
                    "Analyze API error: status={}, body={}",
                    status.as_u16(),
                    truncate(&body, 500)
                );
                Err(ClientError::ApiError {
                    status: status.as_u16(),
                    message: body,
                })
            }
            Err(e) => Err(ClientError::JsonError(e)),
        }
    }
}

/// 按字符截断，避免切断多字节字符
fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
