//! 终端渲染

use parking_lot::Mutex;
use std::io::{self, Write};
use tracing::warn;

use super::sink::{Notifier, RenderSink};
use crate::models::{Priority, Scores, Suggestion};

use super::panel::SUGGESTIONS_HEADER;

const BAR_WIDTH: usize = 20;

/// 得分条形图的一行，满分按 100 计
pub fn format_score_line(metric: &str, value: f64, label_width: usize) -> String {
    let ratio = (value / 100.0).clamp(0.0, 1.0);
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let pad = label_width.saturating_sub(display_width(metric));
    format!(
        "{}{} {}{} {}",
        metric,
        " ".repeat(pad),
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        format_value(value)
    )
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

/// 终端显示宽度（CJK 字符按两列计）
fn display_width(s: &str) -> usize {
    s.chars().map(|c| if c.is_ascii() { 1 } else { 2 }).sum()
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!",
        Priority::Medium => "! ",
        Priority::Low => "  ",
    }
}

/// 输出到终端的渲染目标
pub struct ConsoleSink<W: Write + Send> {
    out: Mutex<W>,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_block(&self, lines: &[String]) {
        let mut out = self.out.lock();
        for line in lines {
            if let Err(e) = writeln!(out, "{}", line) {
                warn!("Failed to write console output: {}", e);
                return;
            }
        }
        let _ = out.flush();
    }
}

impl<W: Write + Send> RenderSink for ConsoleSink<W> {
    fn set_scores(&self, scores: &Scores) {
        let label_width = scores
            .iter()
            .map(|s| display_width(&s.metric))
            .max()
            .unwrap_or(0);

        let mut lines = vec!["健康维度".to_string()];
        if scores.is_empty() {
            lines.push("  （无得分数据）".to_string());
        }
        lines.extend(
            scores
                .iter()
                .map(|s| format!("  {}", format_score_line(&s.metric, s.value, label_width))),
        );
        lines.push(String::new());
        self.write_block(&lines);
    }

    fn set_suggestions(&self, suggestions: &[Suggestion]) {
        let mut lines = vec![SUGGESTIONS_HEADER.to_string()];
        lines.extend(suggestions.iter().map(|s| {
            format!("{} [{}] {}", priority_marker(s.level()), s.priority, s.text)
        }));
        self.write_block(&lines);
    }
}

/// 通过标准错误输出提示
#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}
