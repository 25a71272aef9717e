//! 分析请求日志记录器
//!
//! 记录所有 `/analyze` 请求到 JSONL 文件，便于排查上游故障。

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::config::exe_dir;

/// 请求处理状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    /// 上游返回了可用结果
    Success,
    /// 上游不可用，返回示例数据
    Fallback,
    /// 请求参数不合法
    Rejected,
}

/// 请求日志条目
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// 请求 ID
    pub request_id: String,
    /// 时间戳
    pub timestamp: DateTime<Utc>,
    /// 仓库标识
    pub repo_name: String,
    /// 上游端点
    pub upstream_endpoint: String,
    /// 上游密钥（脱敏）
    pub api_key_masked: String,
    /// 状态
    pub status: RequestStatus,
    /// 持续时间（毫秒）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// 返回的建议条数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion_count: Option<usize>,
    /// 错误信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// 请求日志记录器
pub struct RequestLogger {
    log_path: PathBuf,
    max_entries: usize,
    file: Mutex<Option<File>>,
}

impl RequestLogger {
    /// 创建新的日志记录器
    pub fn new(log_dir: Option<PathBuf>, max_entries: usize) -> Self {
        let log_dir = log_dir.unwrap_or_else(|| exe_dir().join("storage"));

        // 确保目录存在
        let _ = fs::create_dir_all(&log_dir);

        Self {
            log_path: log_dir.join("analyze_requests.jsonl"),
            max_entries,
            file: Mutex::new(None),
        }
    }

    /// 生成请求 ID
    pub fn generate_request_id() -> String {
        Uuid::new_v4().to_string()[..8].to_string()
    }

    /// API 密钥脱敏
    pub fn mask_api_key(api_key: &str) -> String {
        let chars: Vec<char> = api_key.chars().collect();
        if chars.len() <= 8 {
            "*".repeat(chars.len())
        } else {
            let head: String = chars[..4].iter().collect();
            let tail: String = chars[chars.len() - 4..].iter().collect();
            format!("{}...{}", head, tail)
        }
    }

    /// 截断字符串
    fn truncate(s: &str, max_chars: usize) -> String {
        match s.char_indices().nth(max_chars) {
            Some((idx, _)) => format!("{}...", &s[..idx]),
            None => s.to_string(),
        }
    }

    /// 记录请求开始
    pub fn start(&self, repo_name: &str, upstream_endpoint: &str, api_key: &str) -> LogEntry {
        LogEntry {
            request_id: Self::generate_request_id(),
            timestamp: Utc::now(),
            repo_name: Self::truncate(repo_name, 200),
            upstream_endpoint: upstream_endpoint.to_string(),
            api_key_masked: Self::mask_api_key(api_key),
            status: RequestStatus::Pending,
            duration_ms: None,
            suggestion_count: None,
            error_message: None,
        }
    }

    /// 记录成功
    pub fn log_success(&self, mut entry: LogEntry, start_time: Instant, suggestion_count: usize) {
        entry.status = RequestStatus::Success;
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.suggestion_count = Some(suggestion_count);
        self.write_entry(&entry);
    }

    /// 记录回退到示例数据
    pub fn log_fallback(&self, mut entry: LogEntry, start_time: Instant, error_message: &str) {
        entry.status = RequestStatus::Fallback;
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.error_message = Some(Self::truncate(error_message, 500));
        self.write_entry(&entry);
    }

    /// 记录被拒绝的请求
    pub fn log_rejected(&self, mut entry: LogEntry, start_time: Instant, reason: &str) {
        entry.status = RequestStatus::Rejected;
        entry.duration_ms = Some(start_time.elapsed().as_millis() as u64);
        entry.error_message = Some(reason.to_string());
        self.write_entry(&entry);
    }

    /// 写入日志条目
    fn write_entry(&self, entry: &LogEntry) {
        let mut file_guard = self.file.lock();

        // 懒加载文件
        if file_guard.is_none() {
            if let Ok(f) = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.log_path)
            {
                *file_guard = Some(f);
            }
        }

        if let Some(file) = file_guard.as_mut() {
            if let Ok(json) = serde_json::to_string(entry) {
                let _ = writeln!(file, "{}", json);
                let _ = file.flush();
            }
        }

        // 裁剪会重建文件，之后需重新打开追加句柄
        if self.cleanup_if_needed() {
            *file_guard = None;
        }
    }

    /// 清理旧日志，返回是否发生了裁剪
    fn cleanup_if_needed(&self) -> bool {
        let Ok(file) = File::open(&self.log_path) else {
            return false;
        };
        let reader = BufReader::new(file);
        let lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        if lines.len() <= self.max_entries {
            return false;
        }

        let keep_lines = &lines[lines.len() - self.max_entries..];
        if let Ok(mut file) = File::create(&self.log_path) {
            for line in keep_lines {
                let _ = writeln!(file, "{}", line);
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_entries(dir: &TempDir) -> Vec<LogEntry> {
        let content = fs::read_to_string(dir.path().join("analyze_requests.jsonl")).unwrap();
        content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn test_mask_api_key() {
        assert_eq!(RequestLogger::mask_api_key("short"), "*****");
        assert_eq!(
            RequestLogger::mask_api_key("application-367032ed5055a7239377076902af24b0"),
            "appl...24b0"
        );
        assert_eq!(RequestLogger::mask_api_key("密钥密钥密钥密钥密钥"), "密钥密钥...密钥密钥");
    }

    #[test]
    fn test_request_id_length() {
        assert_eq!(RequestLogger::generate_request_id().len(), 8);
    }

    #[test]
    fn test_entries_written_with_status() {
        let dir = TempDir::new().unwrap();
        let logger = RequestLogger::new(Some(dir.path().to_path_buf()), 100);

        let start = Instant::now();
        let entry = logger.start("octo/repo", "http://upstream/chat", "secret-key-123456");
        logger.log_success(entry, start, 3);

        let entry = logger.start("octo/other", "", "");
        logger.log_fallback(entry, start, "upstream_url not configured");

        let entries = read_entries(&dir);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].status, RequestStatus::Success);
        assert_eq!(entries[0].suggestion_count, Some(3));
        assert_eq!(entries[0].api_key_masked, "secr...3456");
        assert_eq!(entries[1].status, RequestStatus::Fallback);
        assert_eq!(
            entries[1].error_message.as_deref(),
            Some("upstream_url not configured")
        );
    }

    #[test]
    fn test_cleanup_keeps_newest_entries() {
        let dir = TempDir::new().unwrap();
        let logger = RequestLogger::new(Some(dir.path().to_path_buf()), 3);

        for i in 0..5 {
            let entry = logger.start(&format!("repo-{}", i), "", "");
            logger.log_rejected(entry, Instant::now(), "请输入仓库名称");
        }

        let entries = read_entries(&dir);
        let repos: Vec<&str> = entries.iter().map(|e| e.repo_name.as_str()).collect();
        assert_eq!(repos, vec!["repo-2", "repo-3", "repo-4"]);
    }
}
