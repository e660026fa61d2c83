//! 错误定义模块

use thiserror::Error;

/// 传输失败时展示给用户的通用提示
pub const GENERIC_TRANSPORT_MESSAGE: &str =
    "Failed to reach the analysis server. Please check your connection and try again.";

/// 服务端未给出原因时的通用提示
pub const GENERIC_ANALYSIS_MESSAGE: &str = "Analysis failed. Please try again.";

/// PharmaGuard客户端统一错误类型
#[derive(Error, Debug)]
pub enum PgxError {
    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("验证错误: {0}")]
    Validation(String),

    #[error("网络错误: {0}")]
    Transport(String),

    #[error("服务端错误 (HTTP {status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("分析失败: {}", .0.join("; "))]
    Analysis(Vec<String>),

    #[error("工作流错误: {0}")]
    Workflow(String),

    #[error("无效状态转换: 从 {from} 到 {event}")]
    InvalidStateTransition { from: String, event: String },
}

impl PgxError {
    /// 错误界面上展示的文本
    ///
    /// 服务端给出的原因优先，其次才是通用提示。
    pub fn user_message(&self) -> String {
        match self {
            PgxError::Api { detail, .. } if !detail.trim().is_empty() => detail.clone(),
            PgxError::Api { .. } => GENERIC_ANALYSIS_MESSAGE.to_string(),
            PgxError::Analysis(errors) => {
                let joined = errors
                    .iter()
                    .map(|e| e.trim())
                    .filter(|e| !e.is_empty())
                    .collect::<Vec<_>>()
                    .join("; ");
                if joined.is_empty() {
                    GENERIC_ANALYSIS_MESSAGE.to_string()
                } else {
                    joined
                }
            }
            PgxError::Transport(_) | PgxError::Io(_) | PgxError::Serialization(_) => {
                GENERIC_TRANSPORT_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

/// 统一结果类型
pub type Result<T> = std::result::Result<T, PgxError>;
