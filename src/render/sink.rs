//! 渲染目标抽象

use crate::models::{Scores, Suggestion};

/// 分析结果的渲染目标
///
/// 两个方法都是整体替换语义：调用后旧的图表/建议内容不再保留。
pub trait RenderSink: Send + Sync {
    /// 用新的维度得分重绘雷达图
    fn set_scores(&self, scores: &Scores);

    /// 清空并重建建议面板
    fn set_suggestions(&self, suggestions: &[Suggestion]);
}

/// 阻塞式用户提示
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

impl<T: RenderSink + ?Sized> RenderSink for std::sync::Arc<T> {
    fn set_scores(&self, scores: &Scores) {
        (**self).set_scores(scores)
    }

    fn set_suggestions(&self, suggestions: &[Suggestion]) {
        (**self).set_suggestions(suggestions)
    }
}

impl<T: Notifier + ?Sized> Notifier for std::sync::Arc<T> {
    fn notify(&self, message: &str) {
        (**self).notify(message)
    }
}

/// 同时渲染到两个目标
impl<A: RenderSink, B: RenderSink> RenderSink for (A, B) {
    fn set_scores(&self, scores: &Scores) {
        self.0.set_scores(scores);
        self.1.set_scores(scores);
    }

    fn set_suggestions(&self, suggestions: &[Suggestion]) {
        self.0.set_suggestions(suggestions);
        self.1.set_suggestions(suggestions);
    }
}
