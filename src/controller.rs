//! 分析请求控制器
//!
//! 读取仓库标识，发出一次 `/analyze` 请求，成功后把结果交给雷达图和建议面板。

use tracing::{info, warn};

use crate::client::{AnalysisClient, ClientError};
use crate::models::AnalysisRequest;
use crate::render::{Notifier, RenderSink};

/// 传输失败时的提示前缀
pub const TRANSPORT_FAILURE_PREFIX: &str = "分析请求失败";

/// 一次分析调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// 已渲染（未出现的字段不计数）
    Rendered { scores: usize, suggestions: usize },
    /// 服务端返回了错误信息，未渲染
    Rejected(String),
}

/// 分析请求控制器
///
/// 并发调用互不协调，最后返回的响应决定最终渲染结果。
pub struct AnalysisRequestController<S: RenderSink, N: Notifier> {
    client: AnalysisClient,
    sink: S,
    notifier: N,
}

impl<S: RenderSink, N: Notifier> AnalysisRequestController<S, N> {
    pub fn new(client: AnalysisClient, sink: S, notifier: N) -> Self {
        Self {
            client,
            sink,
            notifier,
        }
    }

    /// 分析仓库并渲染结果
    ///
    /// 仓库标识原样提交，不做任何校验。传输或解析失败时提示一次并返回错误，
    /// 两个渲染目标都不会被修改。
    pub async fn analyze(&self, repo_name: &str) -> Result<AnalysisOutcome, ClientError> {
        let request = AnalysisRequest::new(repo_name);

        let response = match self.client.analyze(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Analyze request failed: repo_name={:?}, error={}", repo_name, e);
                self.notifier
                    .notify(&format!("{}: {}", TRANSPORT_FAILURE_PREFIX, e));
                return Err(e);
            }
        };

        if let Some(message) = response.error_message() {
            info!("Analyze rejected: repo_name={:?}, error={}", repo_name, message);
            self.notifier.notify(message);
            return Ok(AnalysisOutcome::Rejected(message.to_string()));
        }

        let mut score_count = 0;
        if let Some(scores) = &response.scores {
            self.sink.set_scores(scores);
            score_count = scores.len();
        }

        // 面板总是整体重建，缺少 suggestions 时只保留标题
        let suggestions = response.suggestions.as_deref().unwrap_or(&[]);
        self.sink.set_suggestions(suggestions);
        let suggestion_count = suggestions.len();

        info!(
            "Analyze rendered: repo_name={:?}, scores={}, suggestions={}",
            repo_name, score_count, suggestion_count
        );

        Ok(AnalysisOutcome::Rendered {
            scores: score_count,
            suggestions: suggestion_count,
        })
    }
}
