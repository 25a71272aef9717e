//! 渲染模块
//!
//! 雷达图与建议面板的渲染目标，以及用户提示通道。

mod console;
mod html;
mod panel;
mod sink;

pub use console::{ConsoleNotifier, ConsoleSink};
pub use html::HtmlReportSink;
#[cfg(test)]
pub use panel::SuggestionsPanel;
pub use sink::{Notifier, RenderSink};
