//! # PharmaGuard 结果展示模块
//!
//! - 风险汇总与标签样式
//! - 逐字显示时间线
//! - 结果视图与条目展开状态
//! - JSON 导出

pub mod clock;
pub mod export;
pub mod summary;
pub mod typewriter;
pub mod view;

#[cfg(test)]
mod fixtures;

pub use clock::{run_until_settled, settle_now};
pub use export::{export_all, export_file_name, export_item, write_export};
pub use summary::{confidence_percent, label_style, LabelStyle, RiskSummary};
pub use typewriter::{RevealTimeline, TickOutcome, DEFAULT_REVEAL_INTERVAL};
pub use view::{DisclosureStage, ItemDisplay, ItemKey, ResultView};
