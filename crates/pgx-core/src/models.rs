//! 核心数据模型定义
//!
//! 与远端分析服务之间的数据契约。结果一经接收即只读。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PgxError, Result};
use crate::utils::join_drugs;

/// 风险分类
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLabel {
    Safe,
    Adjust,
    Toxic,
    Ineffective,
    #[serde(other)]
    Unknown,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "Safe",
            Self::Adjust => "Adjust",
            Self::Toxic => "Toxic",
            Self::Ineffective => "Ineffective",
            Self::Unknown => "Unknown",
        }
    }

    /// 是否归入"风险"汇总（Toxic 与 Ineffective 合并计数）
    pub fn is_risk(&self) -> bool {
        matches!(self, Self::Toxic | Self::Ineffective)
    }
}

impl Default for RiskLabel {
    fn default() -> Self {
        Self::Unknown
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 风险评估
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    pub risk_label: RiskLabel,
    pub confidence_score: f64, // 0–1
    pub severity: String,      // low | moderate | high | critical
}

/// 药物基因组学档案
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PharmacogenomicProfile {
    pub primary_gene: String,
    pub diplotype: String,
    pub phenotype: String,
}

/// 检出的变异
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedVariant {
    pub rsid: String,
    #[serde(default)]
    pub genotype: Option<String>,
    #[serde(default)]
    pub allelic_depth: Option<String>,
    #[serde(default)]
    pub clinical_recommendation: String,
}

/// AI生成的解释
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmExplanation {
    pub summary: String,
    #[serde(default)]
    pub mechanism: Option<String>,
}

/// 分析质量指标
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityMetrics {
    #[serde(default = "default_true")]
    pub vcf_parsing_success: bool,
    #[serde(default)]
    pub total_variants_extracted: u64,
    #[serde(default)]
    pub pharmacogenes_found: u64,
}

fn default_true() -> bool {
    true
}

impl Default for QualityMetrics {
    fn default() -> Self {
        Self {
            vcf_parsing_success: true,
            total_variants_extracted: 0,
            pharmacogenes_found: 0,
        }
    }
}

/// 单个药物的分析结果
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultItem {
    #[serde(rename = "patient id", alias = "patient_id")]
    pub patient_id: String,
    pub drug: String,
    pub timestamp: DateTime<Utc>,
    pub risk_assessment: RiskAssessment,
    pub pharmacogenomic_profile: PharmacogenomicProfile,
    #[serde(default)]
    pub detected_variants: Vec<DetectedVariant>,
    pub llm_generated_explanation: LlmExplanation,
    #[serde(default)]
    pub quality_metrics: QualityMetrics,
}

impl ResultItem {
    pub fn risk_label(&self) -> RiskLabel {
        self.risk_assessment.risk_label
    }
}

/// 分析接口响应包装
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<ResultItem>,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl AnalysisResponse {
    pub const SUCCESS: &'static str = "success";

    pub fn is_success(&self) -> bool {
        self.status == Self::SUCCESS
    }

    /// 非 success 状态即视为应用层失败，即使HTTP状态为2xx
    ///
    /// success 时 `errors` 中的内容作为警告随结果一起返回。
    pub fn into_outcome(self) -> Result<AnalysisOutcome> {
        if self.is_success() {
            Ok(AnalysisOutcome {
                results: self.results,
                warnings: self.errors,
            })
        } else {
            Err(PgxError::Analysis(self.errors))
        }
    }
}

/// 一次成功的分析
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisOutcome {
    pub results: Vec<ResultItem>,
    /// 服务端随 success 一起返回的提示（单倍型未匹配、药物未覆盖等）
    pub warnings: Vec<String>,
}

impl AnalysisOutcome {
    pub fn new(results: Vec<ResultItem>) -> Self {
        Self {
            results,
            warnings: Vec::new(),
        }
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// 待上传的文件内容
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// 一次分析请求
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub patient_id: String,
    pub drugs: Vec<String>,
    pub file: UploadFile,
}

impl AnalysisRequest {
    /// 表单中 `drugs` 字段的值
    pub fn drugs_field(&self) -> String {
        join_drugs(&self.drugs)
    }
}

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
