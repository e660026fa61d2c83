//! # PharmaGuard 管理模块
//!
//! - 分层配置加载与校验
//! - 日志初始化

pub mod config;
pub mod logging;

pub use config::{
    load_config, ApiConfig, ClientConfig, ConfigLoader, ConfigValidator, IntakeConfig,
    LoggingConfig, RenderConfig, WorkflowConfig, DEFAULT_CONFIG_FILE,
};
pub use logging::{build_filter, init_tracing, LogFormat};
