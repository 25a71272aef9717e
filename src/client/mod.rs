//! 分析服务客户端模块
//!
//! 以表单 POST 的方式调用 `/analyze`，解析 JSON 结果。

mod endpoint;
mod http;
mod types;

pub use endpoint::fix_base_url;
pub use http::AnalysisClient;
pub use types::ClientError;
