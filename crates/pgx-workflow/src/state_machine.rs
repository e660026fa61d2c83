//! 工作流状态机
//!
//! 管理 输入 → 分析中 → 结果 | 错误 的界面状态转换

use pgx_core::{AnalysisOutcome, PgxError, Result, ResultItem};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// 界面阶段
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stage {
    Input,
    Loading,
    Results,
    Error,
}

/// 状态转换事件
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowEvent {
    Submit,
    Succeeded,
    Failed,
    Reset,
}

/// 工作流状态，每个阶段携带自己的数据
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowState {
    Input,
    Loading { attempt: Uuid },
    Results(AnalysisOutcome),
    Error(String),
}

impl WorkflowState {
    pub fn stage(&self) -> Stage {
        match self {
            WorkflowState::Input => Stage::Input,
            WorkflowState::Loading { .. } => Stage::Loading,
            WorkflowState::Results(_) => Stage::Results,
            WorkflowState::Error(_) => Stage::Error,
        }
    }

    pub fn results(&self) -> Option<&[ResultItem]> {
        match self {
            WorkflowState::Results(outcome) => Some(&outcome.results),
            _ => None,
        }
    }

    /// 结果阶段的服务端警告，其他阶段为空
    pub fn warnings(&self) -> &[String] {
        match self {
            WorkflowState::Results(outcome) => &outcome.warnings,
            _ => &[],
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            WorkflowState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl Default for WorkflowState {
    fn default() -> Self {
        WorkflowState::Input
    }
}

/// 工作流状态机
#[derive(Debug)]
pub struct WorkflowStateMachine {
    transitions: HashMap<(Stage, WorkflowEvent), Stage>,
}

impl WorkflowStateMachine {
    /// 创建新的状态机实例
    pub fn new() -> Self {
        let mut transitions = HashMap::new();

        // 定义状态转换规则
        transitions.insert((Stage::Input, WorkflowEvent::Submit), Stage::Loading);
        transitions.insert((Stage::Loading, WorkflowEvent::Succeeded), Stage::Results);
        transitions.insert((Stage::Loading, WorkflowEvent::Failed), Stage::Error);

        // 重置在任何阶段都合法且幂等
        for stage in Self::get_all_stages() {
            transitions.insert((stage, WorkflowEvent::Reset), Stage::Input);
        }

        Self { transitions }
    }

    /// 检查状态转换是否有效
    pub fn can_transition(&self, from: Stage, event: WorkflowEvent) -> bool {
        self.transitions.contains_key(&(from, event))
    }

    /// 执行状态转换
    pub fn transition(&self, from: Stage, event: WorkflowEvent) -> Result<Stage> {
        match self.transitions.get(&(from, event)) {
            Some(to) => Ok(*to),
            None => Err(PgxError::InvalidStateTransition {
                from: format!("{:?}", from),
                event: format!("{:?}", event),
            }),
        }
    }

    /// 获取所有可能的阶段
    pub fn get_all_stages() -> Vec<Stage> {
        vec![Stage::Input, Stage::Loading, Stage::Results, Stage::Error]
    }

    /// 获取阶段的所有可能事件
    pub fn get_possible_events(&self, current: Stage) -> Vec<WorkflowEvent> {
        self.transitions
            .keys()
            .filter(|(stage, _)| *stage == current)
            .map(|(_, event)| *event)
            .collect()
    }
}

impl Default for WorkflowStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        let sm = WorkflowStateMachine::new();

        assert!(sm.can_transition(Stage::Input, WorkflowEvent::Submit));
        assert!(sm.can_transition(Stage::Loading, WorkflowEvent::Succeeded));
        assert!(sm.can_transition(Stage::Loading, WorkflowEvent::Failed));
        for stage in WorkflowStateMachine::get_all_stages() {
            assert_eq!(sm.transition(stage, WorkflowEvent::Reset).unwrap(), Stage::Input);
        }
    }

    #[test]
    fn test_loading_never_reenters_loading() {
        let sm = WorkflowStateMachine::new();

        assert!(!sm.can_transition(Stage::Loading, WorkflowEvent::Submit));
        for stage in WorkflowStateMachine::get_all_stages() {
            for event in sm.get_possible_events(stage) {
                if stage == Stage::Loading {
                    assert_ne!(sm.transition(stage, event).unwrap(), Stage::Loading);
                }
            }
        }
    }

    #[test]
    fn test_invalid_transitions() {
        let sm = WorkflowStateMachine::new();

        assert!(!sm.can_transition(Stage::Results, WorkflowEvent::Submit));
        assert!(!sm.can_transition(Stage::Error, WorkflowEvent::Succeeded));

        let result = sm.transition(Stage::Input, WorkflowEvent::Succeeded);
        assert!(matches!(result, Err(PgxError::InvalidStateTransition { .. })));
    }

    #[test]
    fn test_state_payload_accessors() {
        assert_eq!(WorkflowState::default().stage(), Stage::Input);

        let state = WorkflowState::Error("boom".to_string());
        assert_eq!(state.stage(), Stage::Error);
        assert_eq!(state.error_message(), Some("boom"));
        assert!(state.results().is_none());
        assert!(state.warnings().is_empty());

        let state = WorkflowState::Results(AnalysisOutcome {
            results: vec![],
            warnings: vec!["Drug FOO not covered".to_string()],
        });
        assert_eq!(state.stage(), Stage::Results);
        assert_eq!(state.results(), Some(&[][..]));
        assert_eq!(state.warnings(), ["Drug FOO not covered".to_string()]);
    }
}
