//! # PharmaGuard
//!
//! 药物基因组学风险分析客户端的统一入口，重新导出各子模块。

pub use pgx_core as core;
pub use pgx_intake as intake;
pub use pgx_render as render;
pub use pgx_workflow as workflow;
