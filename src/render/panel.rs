//! 建议面板标记生成

use html_escape::encode_text;
use parking_lot::Mutex;

use crate::models::Suggestion;

/// 面板固定标题
pub const SUGGESTIONS_HEADER: &str = "改进建议";

/// 单条建议块
pub fn render_suggestion_block(suggestion: &Suggestion) -> String {
    format!(
        r#"<div class="suggestion {}">[{}] {}</div>"#,
        suggestion.level().css_class(),
        encode_text(&suggestion.priority),
        encode_text(&suggestion.text)
    )
}

/// 完整面板：标题 + 按响应顺序排列的建议块
pub fn render_panel_markup(suggestions: &[Suggestion]) -> String {
    let mut markup = format!("<h3>{}</h3>", SUGGESTIONS_HEADER);
    for suggestion in suggestions {
        markup.push_str(&render_suggestion_block(suggestion));
    }
    markup
}

/// 建议面板
///
/// 对应页面中的建议容器，每次 `replace` 都整体覆盖已有内容。
#[derive(Debug, Default)]
pub struct SuggestionsPanel {
    markup: Mutex<String>,
}

impl SuggestionsPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, suggestions: &[Suggestion]) {
        *self.markup.lock() = render_panel_markup(suggestions);
    }

    pub fn markup(&self) -> String {
        self.markup.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_classes() {
        let cases = [
            ("高", "priority-high"),
            ("中", "priority-medium"),
            ("低", "priority-low"),
            ("紧急", "priority-low"),
        ];
        for (label, class) in cases {
            let block = render_suggestion_block(&Suggestion::new(label, "t"));
            assert_eq!(
                block,
                format!(r#"<div class="suggestion {}">[{}] t</div>"#, class, label)
            );
        }
    }

    #[test]
    fn test_panel_header_only_when_empty() {
        assert_eq!(render_panel_markup(&[]), "<h3>改进建议</h3>");
    }

    #[test]
    fn test_panel_preserves_order() {
        let markup = render_panel_markup(&[
            Suggestion::new("高", "T1"),
            Suggestion::new("低", "T2"),
        ]);
        assert!(markup.find("T1").unwrap() < markup.find("T2").unwrap());

        // 低优先级在前时同样不重排
        let markup = render_panel_markup(&[
            Suggestion::new("低", "T2"),
            Suggestion::new("高", "T1"),
        ]);
        assert!(markup.find("T2").unwrap() < markup.find("T1").unwrap());
    }

    #[test]
    fn test_text_is_escaped() {
        let block = render_suggestion_block(&Suggestion::new("高", "<script>alert(1)</script>"));
        assert!(block.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!block.contains("<script>"));

        let block = render_suggestion_block(&Suggestion::new("<b>", "A & B"));
        assert_eq!(
            block,
            r#"<div class="suggestion priority-low">[&lt;b&gt;] A &amp; B</div>"#
        );
    }

    #[test]
    fn test_replace_discards_previous_content() {
        let panel = SuggestionsPanel::new();
        panel.replace(&[Suggestion::new("高", "旧建议")]);
        panel.replace(&[Suggestion::new("低", "新建议")]);

        let markup = panel.markup();
        assert!(!markup.contains("旧建议"));
        assert_eq!(markup.matches("<h3>").count(), 1);
        assert_eq!(markup.matches(r#"class="suggestion"#).count(), 1);
    }
}
