//! 测试用结果数据

use pgx_core::{
    LlmExplanation, PharmacogenomicProfile, QualityMetrics, ResultItem, RiskAssessment, RiskLabel,
};

pub fn item(drug: &str, label: RiskLabel) -> ResultItem {
    item_with_text(drug, label, "Summary text.", Some("Mechanism text."))
}

pub fn item_with_text(
    drug: &str,
    label: RiskLabel,
    summary: &str,
    mechanism: Option<&str>,
) -> ResultItem {
    ResultItem {
        patient_id: "PATIENT_001".to_string(),
        drug: drug.to_string(),
        timestamp: chrono::Utc::now(),
        risk_assessment: RiskAssessment {
            risk_label: label,
            confidence_score: 0.9,
            severity: "high".to_string(),
        },
        pharmacogenomic_profile: PharmacogenomicProfile {
            primary_gene: "CYP2D6".to_string(),
            diplotype: "*1/*4".to_string(),
            phenotype: "IM".to_string(),
        },
        detected_variants: vec![],
        llm_generated_explanation: LlmExplanation {
            summary: summary.to_string(),
            mechanism: mechanism.map(str::to_string),
        },
        quality_metrics: QualityMetrics::default(),
    }
}
