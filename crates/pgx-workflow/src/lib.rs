//! # PharmaGuard 工作流模块
//!
//! 提供客户端交互核心，包括：
//! - 工作流状态机：输入 → 分析中 → 结果 | 错误
//! - 工作流控制器：持有提交草稿并驱动唯一的网络请求
//! - 进度提示：分析期间轮播的阶段标签
//! - 药物标签输入：去重的标签集合与输入建议

pub mod controller;
pub mod progress;
pub mod state_machine;
pub mod tags;

// 重新导出主要类型
pub use controller::{
    AnalysisBackend, PendingSubmission, WorkflowController, WorkflowSettings, DEFAULT_PATIENT_ID,
};
pub use progress::{PhaseTicker, ANALYSIS_PHASES, DEFAULT_PHASE_INTERVAL};
pub use state_machine::{Stage, WorkflowEvent, WorkflowState, WorkflowStateMachine};
pub use tags::{KeyInput, TagCollector, BLUR_GRACE, DRUG_VOCABULARY, MAX_SUGGESTIONS};
