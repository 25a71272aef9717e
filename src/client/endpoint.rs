//! 分析端点 URL 构建工具

/// 分析端点固定路径
pub const ANALYZE_PATH: &str = "/analyze";

/// 修复 base_url
///
/// - 移除末尾斜杠
/// - 修复双斜杠（保留协议部分）
pub fn fix_base_url(base_url: &str) -> String {
    let mut url = base_url.trim().trim_end_matches('/').to_string();

    if let Some(pos) = url.find("://") {
        let (protocol, rest) = url.split_at(pos + 3);
        let mut fixed_rest = rest.to_string();
        while fixed_rest.contains("//") {
            fixed_rest = fixed_rest.replace("//", "/");
        }
        url = format!("{}{}", protocol, fixed_rest);
    }

    url
}

/// 构建分析端点
pub fn build_analyze_endpoint(base_url: &str) -> String {
    let url = fix_base_url(base_url);

    if url.ends_with(ANALYZE_PATH) {
        url
    } else {
        format!("{}{}", url, ANALYZE_PATH)
    }
}
