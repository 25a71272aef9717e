//! 服务层模块

mod analysis_service;

pub use analysis_service::{demo_payload, AnalysisService};
