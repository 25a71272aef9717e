//! 应用状态管理
//!
//! 定义在请求处理器之间共享的状态。

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::services::AnalysisService;
use crate::utils::RequestLogger;

/// 应用共享状态
pub struct AppState {
    /// 上游分析服务
    pub analysis: AnalysisService,
    /// 请求日志
    pub request_logger: RequestLogger,
}

impl AppState {
    /// 创建新的应用状态
    ///
    /// `log_dir` 为空时日志写入可执行文件同级的 storage 目录
    pub fn new(config: &AppConfig, log_dir: Option<PathBuf>) -> AppResult<Self> {
        Ok(Self {
            analysis: AnalysisService::new(config)?,
            request_logger: RequestLogger::new(log_dir, config.request_log_max_entries),
        })
    }
}

/// 创建可共享的应用状态
pub fn create_shared_state(config: &AppConfig, log_dir: Option<PathBuf>) -> AppResult<Arc<AppState>> {
    Ok(Arc::new(AppState::new(config, log_dir)?))
}
