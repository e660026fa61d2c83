//! # PharmaGuard 集成模块
//!
//! 与远端药物基因组学分析服务的HTTP集成：
//! - multipart 分析请求与响应解析
//! - 服务端错误原因提取
//! - 健康检查

pub mod client;
pub mod response;

pub use client::{AnalysisClient, DEFAULT_API_BASE};
pub use response::extract_detail;
