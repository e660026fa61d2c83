//! 工作流控制器
//!
//! 协调状态机、文件预检、药物标签与进度提示，负责唯一的网络交互。

use crate::progress::{PhaseTicker, ANALYSIS_PHASES, DEFAULT_PHASE_INTERVAL};
use crate::state_machine::{Stage, WorkflowEvent, WorkflowState, WorkflowStateMachine};
use crate::tags::TagCollector;
use async_trait::async_trait;
use pgx_core::{AnalysisOutcome, AnalysisRequest, PgxError, Result};
use pgx_intake::{FileAcceptance, FileIntake, IntakeDrop, IntakeRejection, IntakeRules};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

pub const DEFAULT_PATIENT_ID: &str = "PATIENT_001";

/// 远端分析服务接口
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// 提交一次分析；只有服务端返回 success 时才返回结果
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome>;
}

/// 控制器设置
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub default_patient_id: String,
    pub phase_interval: Duration,
    pub intake: IntakeRules,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_patient_id: DEFAULT_PATIENT_ID.to_string(),
            phase_interval: DEFAULT_PHASE_INTERVAL,
            intake: IntakeRules::default(),
        }
    }
}

/// 已进入分析中、等待执行的一次提交
#[derive(Debug)]
pub struct PendingSubmission {
    pub attempt: Uuid,
    pub patient_id: String,
    pub drugs: Vec<String>,
    pub file: FileAcceptance,
}

impl PendingSubmission {
    /// 读取文件并调用后端
    pub async fn execute(&self, backend: &dyn AnalysisBackend) -> Result<AnalysisOutcome> {
        let upload = self.file.source.to_upload().await?;
        let request = AnalysisRequest {
            patient_id: self.patient_id.clone(),
            drugs: self.drugs.clone(),
            file: upload,
        };
        backend.analyze(request).await
    }
}

/// 工作流控制器
///
/// 界面阶段的唯一数据源，持有提交草稿（患者ID、药物标签、已接受文件）。
pub struct WorkflowController {
    backend: Arc<dyn AnalysisBackend>,
    state_machine: WorkflowStateMachine,
    settings: WorkflowSettings,
    state: WorkflowState,
    patient_id: String,
    tags: TagCollector,
    intake: FileIntake,
    ticker: Option<PhaseTicker>,
}

impl WorkflowController {
    /// 创建新的工作流控制器
    pub fn new(backend: Arc<dyn AnalysisBackend>, settings: WorkflowSettings) -> Self {
        Self {
            backend,
            state_machine: WorkflowStateMachine::new(),
            patient_id: settings.default_patient_id.clone(),
            intake: FileIntake::new(settings.intake.clone()),
            settings,
            state: WorkflowState::Input,
            tags: TagCollector::default(),
            ticker: None,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn stage(&self) -> Stage {
        self.state.stage()
    }

    pub fn backend(&self) -> Arc<dyn AnalysisBackend> {
        self.backend.clone()
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    /// 设置患者ID，空白时回退为默认值
    pub fn set_patient_id(&mut self, patient_id: &str) {
        let trimmed = patient_id.trim();
        self.patient_id = if trimmed.is_empty() {
            self.settings.default_patient_id.clone()
        } else {
            trimmed.to_string()
        };
    }

    pub fn tags(&self) -> &TagCollector {
        &self.tags
    }

    pub fn tags_mut(&mut self) -> &mut TagCollector {
        &mut self.tags
    }

    pub fn intake(&self) -> &FileIntake {
        &self.intake
    }

    pub fn intake_mut(&mut self) -> &mut FileIntake {
        &mut self.intake
    }

    pub fn accepted_file(&self) -> Option<&FileAcceptance> {
        self.intake.accepted()
    }

    /// 校验并接受文件；被拒绝时保留之前已接受的文件
    pub async fn accept_file(
        &mut self,
        drop: IntakeDrop,
    ) -> std::result::Result<FileAcceptance, IntakeRejection> {
        self.intake.evaluate(drop).await
    }

    /// 移除已接受文件
    pub fn clear_file(&mut self) {
        self.intake.clear();
    }

    /// 草稿是否满足提交条件：至少一个药物且已有通过校验的文件
    pub fn can_submit(&self) -> bool {
        !self.tags.is_empty() && self.intake.accepted().is_some()
    }

    /// 当前进度阶段标签（仅分析中有值）
    pub fn phase_label(&self) -> Option<&'static str> {
        self.ticker.as_ref().map(|t| t.label())
    }

    /// 订阅进度阶段变化
    pub fn phase_updates(&self) -> Option<watch::Receiver<usize>> {
        self.ticker.as_ref().map(|t| t.subscribe())
    }

    /// 提交：进入分析中，完成后进入结果或错误
    pub async fn submit(&mut self) -> Result<Stage> {
        let pending = self.begin_submit()?;
        let backend = self.backend.clone();
        let outcome = pending.execute(backend.as_ref()).await;
        self.complete(pending.attempt, outcome)?;
        Ok(self.stage())
    }

    /// 提交的第一阶段：校验前置条件、切换到分析中并启动进度提示
    ///
    /// 必须在tokio运行时内调用。
    pub fn begin_submit(&mut self) -> Result<PendingSubmission> {
        if !self.can_submit() {
            return Err(PgxError::Validation(
                "At least one drug and an accepted VCF file are required".to_string(),
            ));
        }
        self.state_machine.transition(self.stage(), WorkflowEvent::Submit)?;

        let file = match self.intake.accepted() {
            Some(file) => file.clone(),
            None => return Err(PgxError::Workflow("No accepted file".to_string())),
        };

        let attempt = Uuid::new_v4();
        info!(
            "Submitting analysis {} for patient {}: drugs={}, file={} ({} bytes)",
            attempt,
            self.patient_id,
            self.tags.drugs_field(),
            file.name,
            file.size
        );

        self.state = WorkflowState::Loading { attempt };
        self.ticker = Some(PhaseTicker::start(ANALYSIS_PHASES, self.settings.phase_interval));

        Ok(PendingSubmission {
            attempt,
            patient_id: self.patient_id.clone(),
            drugs: self.tags.tokens().to_vec(),
            file,
        })
    }

    /// 提交的第二阶段：处理网络结果
    ///
    /// 返回 `false` 表示该结果已过期（期间被重置或已有新的提交），结果被丢弃。
    pub fn complete(&mut self, attempt: Uuid, outcome: Result<AnalysisOutcome>) -> Result<bool> {
        if self.state != (WorkflowState::Loading { attempt }) {
            warn!("Discarding stale analysis outcome for attempt {}", attempt);
            return Ok(false);
        }

        self.stop_ticker();

        match outcome {
            Ok(outcome) => {
                self.state_machine.transition(self.stage(), WorkflowEvent::Succeeded)?;
                info!(
                    "Analysis {} completed with {} results and {} warnings",
                    attempt,
                    outcome.results.len(),
                    outcome.warnings.len()
                );
                for warning in &outcome.warnings {
                    warn!("Analysis {} warning: {}", attempt, warning);
                }
                self.state = WorkflowState::Results(outcome);
            }
            Err(err) => {
                self.state_machine.transition(self.stage(), WorkflowEvent::Failed)?;
                let message = err.user_message();
                warn!("Analysis {} failed: {}", attempt, err);
                self.state = WorkflowState::Error(message);
            }
        }

        Ok(true)
    }

    /// 重置：清空草稿、结果与错误，回到输入阶段。任何阶段都可调用。
    pub fn reset(&mut self) {
        let from = self.stage();
        if let Err(e) = self.state_machine.transition(from, WorkflowEvent::Reset) {
            warn!("Unexpected reset rule failure: {}", e);
        }

        self.stop_ticker();
        self.state = WorkflowState::Input;
        self.patient_id = self.settings.default_patient_id.clone();
        self.tags.clear();
        self.intake.clear();

        info!("Workflow reset from {:?}", from);
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}
