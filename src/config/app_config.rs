//! 应用配置管理
//!
//! 配置文件位于可执行文件同级目录（config.json），使用全局单例缓存。
//! 环境变量可覆盖文件中的地址与密钥，命令行参数再覆盖环境变量。

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const ENV_SERVER_URL: &str = "REPO_HEALTH_SERVER_URL";
pub const ENV_UPSTREAM_URL: &str = "REPO_HEALTH_UPSTREAM_URL";
pub const ENV_UPSTREAM_KEY: &str = "REPO_HEALTH_UPSTREAM_KEY";

/// 获取配置文件路径
pub fn get_config_path() -> PathBuf {
    exe_dir().join("config.json")
}

/// 可执行文件所在目录
pub fn exe_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|p| p.to_path_buf()))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// 应用配置结构体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 分析服务地址（客户端使用）
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// 客户端请求超时（秒）
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// 前端服务监听地址
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// 上游知识库接口地址，为空时直接返回示例数据
    #[serde(default)]
    pub upstream_url: String,

    /// 上游接口密钥
    #[serde(default)]
    pub upstream_api_key: String,

    /// 上游请求超时（秒）
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,

    /// 请求日志保留条数
    #[serde(default = "default_request_log_max_entries")]
    pub request_log_max_entries: usize,
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_bind_addr() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_upstream_timeout_secs() -> u64 {
    5
}

fn default_request_log_max_entries() -> usize {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            timeout_secs: default_timeout_secs(),
            bind_addr: default_bind_addr(),
            upstream_url: String::new(),
            upstream_api_key: String::new(),
            upstream_timeout_secs: default_upstream_timeout_secs(),
            request_log_max_entries: default_request_log_max_entries(),
        }
    }
}

impl AppConfig {
    /// 应用环境变量覆盖
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_SERVER_URL).filter(|v| !v.is_empty()) {
            self.server_url = url;
        }
        if let Some(url) = lookup(ENV_UPSTREAM_URL).filter(|v| !v.is_empty()) {
            self.upstream_url = url;
        }
        if let Some(key) = lookup(ENV_UPSTREAM_KEY).filter(|v| !v.is_empty()) {
            self.upstream_api_key = key;
        }
    }
}

/// 全局配置单例
static CONFIG: Lazy<RwLock<AppConfig>> = Lazy::new(|| {
    let mut config = load_config_from_file(&get_config_path()).unwrap_or_default();
    config.apply_env_overrides();
    RwLock::new(config)
});

/// 从文件加载配置
fn load_config_from_file(path: &Path) -> Option<AppConfig> {
    if path.exists() {
        let content = fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    } else {
        None
    }
}

/// 保存配置到文件
fn save_config_to_file(config: &AppConfig, path: &Path) -> Result<(), AppError> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
    fs::write(path, content)
        .map_err(|e| AppError::Config(format!("写入配置文件失败: {}", e)))?;
    Ok(())
}

/// 获取当前配置（克隆）
pub fn get_config() -> AppConfig {
    CONFIG.read().clone()
}

/// 更新配置
///
/// 接收一个闭包来修改配置，修改后自动保存到文件
pub fn update_config<F>(updater: F) -> Result<AppConfig, AppError>
where
    F: FnOnce(&mut AppConfig),
{
    let mut config = CONFIG.write();
    updater(&mut config);
    save_config_to_file(&config, &get_config_path())?;
    Ok(config.clone())
}

/// 替换整个配置
pub fn set_config(new_config: AppConfig) -> Result<(), AppError> {
    save_config_to_file(&new_config, &get_config_path())?;
    *CONFIG.write() = new_config;
    Ok(())
}
