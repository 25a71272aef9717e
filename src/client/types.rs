//! 客户端错误类型

/// 分析请求错误
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP 请求错误（连接失败等）
    #[error("HTTP 请求失败: {0}")]
    HttpError(#[source] reqwest::Error),

    /// 服务端返回非 2xx 且响应体不是分析结果
    #[error("服务端错误 ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// 超时错误
    #[error("请求超时")]
    Timeout,

    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// JSON 解析错误
    #[error("JSON 解析失败: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::HttpError(err)
        }
    }
}
