//! HTML 报告渲染
//!
//! 生成单文件页面：`#radar` 容器内嵌得分 JSON 并调用页面提供的 `updateRadar`，
//! `#suggestions` 容器写入建议面板标记。雷达图的具体绘制不在此处实现。

use chrono::Utc;
use html_escape::{encode_double_quoted_attribute, encode_text};
use parking_lot::Mutex;
use std::fs;
use std::path::Path;

use super::panel::SuggestionsPanel;
use super::sink::RenderSink;
use crate::models::{Scores, Suggestion};

/// 雷达图容器 id
pub const RADAR_CONTAINER_ID: &str = "radar";
/// 建议面板容器 id
pub const SUGGESTIONS_CONTAINER_ID: &str = "suggestions";

/// HTML 报告渲染目标
#[derive(Debug)]
pub struct HtmlReportSink {
    repo_name: String,
    scores: Mutex<Option<Scores>>,
    panel: SuggestionsPanel,
}

impl HtmlReportSink {
    pub fn new(repo_name: impl Into<String>) -> Self {
        Self {
            repo_name: repo_name.into(),
            scores: Mutex::new(None),
            panel: SuggestionsPanel::new(),
        }
    }

    /// 生成完整页面
    pub fn render(&self) -> String {
        let scores_json = self
            .scores
            .lock()
            .as_ref()
            .and_then(|s| serde_json::to_string(s).ok())
            .unwrap_or_else(|| "null".to_string());

        format!(
            r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
    <meta charset="UTF-8">
    <title>仓库健康分析 - {repo}</title>
</head>
<body>
    <h2>{repo}</h2>
    <div id="{radar_id}" data-scores="{scores_attr}"></div>
    <div id="{suggestions_id}">{panel}</div>
    <footer>生成时间: {generated}</footer>
    <script>
        if (typeof updateRadar === "function") {{ updateRadar({scores_js}); }}
    </script>
</body>
</html>
"#,
            repo = encode_text(&self.repo_name),
            radar_id = RADAR_CONTAINER_ID,
            suggestions_id = SUGGESTIONS_CONTAINER_ID,
            scores_attr = encode_double_quoted_attribute(&scores_json),
            scores_js = scores_json.replace("</", "<\\/"),
            panel = self.panel.markup(),
            generated = Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        )
    }

    /// 写入文件
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.render())
    }
}

impl RenderSink for HtmlReportSink {
    fn set_scores(&self, scores: &Scores) {
        *self.scores.lock() = Some(scores.clone());
    }

    fn set_suggestions(&self, suggestions: &[Suggestion]) {
        self.panel.replace(suggestions);
    }
}
