//! 工作流演示程序
//!
//! 使用进程内的模拟分析服务演示完整流程：药物标签输入、文件预检、提交、
//! 结果汇总、逐字显示与导出，以及失败后的重置。

use async_trait::async_trait;
use pgx_core::{
    AnalysisOutcome, AnalysisRequest, AnalysisResponse, LlmExplanation, PharmacogenomicProfile,
    QualityMetrics, Result, ResultItem, RiskAssessment, RiskLabel,
};
use pgx_intake::{IntakeDrop, MemoryFile};
use pgx_render::{label_style, settle_now, ResultView};
use pgx_workflow::{AnalysisBackend, KeyInput, WorkflowController, WorkflowSettings, WorkflowState};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const SAMPLE_VCF: &[u8] = b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
chr22\t42128945\trs3892097\tC\tT\t.\tPASS\tGENE=CYP2D6;STAR=*4\n";

/// 模拟分析服务：每个药物给出固定的评估
struct DemoBackend {
    fail: bool,
}

fn assess(patient_id: &str, drug: &str) -> ResultItem {
    let (label, gene, diplotype, phenotype) = match drug {
        "CODEINE" => (RiskLabel::Ineffective, "CYP2D6", "*4/*4", "PM"),
        "WARFARIN" => (RiskLabel::Adjust, "CYP2C9", "*1/*3", "IM"),
        "CLOPIDOGREL" => (RiskLabel::Safe, "CYP2C19", "*1/*1", "NM"),
        _ => (RiskLabel::Unknown, "Unknown", "Unknown", "Unknown"),
    };

    ResultItem {
        patient_id: patient_id.to_string(),
        drug: drug.to_string(),
        timestamp: chrono::Utc::now(),
        risk_assessment: RiskAssessment {
            risk_label: label,
            confidence_score: 0.9,
            severity: "moderate".to_string(),
        },
        pharmacogenomic_profile: PharmacogenomicProfile {
            primary_gene: gene.to_string(),
            diplotype: diplotype.to_string(),
            phenotype: phenotype.to_string(),
        },
        detected_variants: vec![],
        llm_generated_explanation: LlmExplanation {
            summary: format!("{} {} metabolizer profile for {}.", gene, phenotype, drug),
            mechanism: Some(format!("{} activity determines {} exposure.", gene, drug)),
        },
        quality_metrics: QualityMetrics::default(),
    }
}

#[async_trait]
impl AnalysisBackend for DemoBackend {
    async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        tokio::time::sleep(Duration::from_millis(250)).await;

        let response = if self.fail {
            AnalysisResponse {
                status: "error".to_string(),
                results: vec![],
                errors: vec!["No pharmacogenes found in VCF".to_string()],
            }
        } else {
            AnalysisResponse {
                status: AnalysisResponse::SUCCESS.to_string(),
                results: request
                    .drugs
                    .iter()
                    .map(|drug| assess(&request.patient_id, drug))
                    .collect(),
                // success 响应也可能带有提示
                errors: vec!["CYP2C19: no matching haplotype, defaulting to *1/*1".to_string()],
            }
        };

        info!(
            "Demo backend answered {} for patient {}",
            response.status, request.patient_id
        );
        response.into_outcome()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter("workflow_demo=info,warn")
        .with_writer(std::io::stderr)
        .init();

    println!("🚀 PharmaGuard 工作流演示\n");

    let settings = WorkflowSettings {
        phase_interval: Duration::from_millis(100),
        ..Default::default()
    };
    let mut controller = WorkflowController::new(Arc::new(DemoBackend { fail: false }), settings);

    // 1. 药物标签输入
    for c in "codeine,warfarin".chars() {
        controller.tags_mut().handle_key(KeyInput::Char(c));
    }
    controller.tags_mut().handle_key(KeyInput::Enter);
    controller.tags_mut().set_buffer("clopi");
    let suggestion = controller.tags().suggestions().next();
    if let Some(suggestion) = suggestion {
        controller.tags_mut().select_suggestion(suggestion);
    }
    println!("✅ 药物标签: {}", controller.tags().drugs_field());
    info!("Collected {} drug tags", controller.tags().len());

    // 2. 文件预检
    let rejected = controller
        .accept_file(IntakeDrop::single(MemoryFile::new("patient.txt", SAMPLE_VCF)))
        .await;
    if let Err(rejection) = rejected {
        println!("❌ 拒绝: {}", rejection);
    }
    let accepted = controller
        .accept_file(IntakeDrop::single(MemoryFile::new("patient.vcf", SAMPLE_VCF)))
        .await;
    match accepted {
        Ok(file) => println!("✅ 文件已接受: {} ({} bytes)", file.name, file.size),
        Err(rejection) => anyhow::bail!("unexpected rejection: {}", rejection),
    }
    println!("   可以提交: {}", controller.can_submit());

    // 3. 提交并等待结果
    info!("Submitting for {}", controller.patient_id());
    let stage = controller.submit().await?;
    println!("\n📋 提交完成，当前阶段: {:?}", stage);

    // 4. 结果汇总与展示
    if let WorkflowState::Results(outcome) = controller.state() {
        let mut view = ResultView::new(outcome.results.clone());
        let summary = view.summary();
        println!("\n📊 结果汇总:");
        println!("   安全: {}", summary.safe);
        println!("   调整剂量: {}", summary.adjust);
        println!("   风险: {}", summary.risk);
        for warning in &outcome.warnings {
            println!("   ⚠️ 服务端提示: {}", warning);
        }

        view.expand_all();
        let frames = settle_now(&mut view);
        println!("   逐字显示共 {} 帧", frames);

        for (item, display) in view.entries() {
            println!("\n💊 {} [{}]", item.drug, label_style(item.risk_label()).title);
            println!("   {}", display.summary_text());
            if let Some(mechanism) = display.mechanism_text() {
                println!("   机制: {}", mechanism);
            }
        }

        let bytes = view.export_all()?;
        println!("\n💾 导出 {} 字节 JSON", bytes.len());
    }

    // 5. 失败路径与重置
    let mut failing = WorkflowController::new(
        Arc::new(DemoBackend { fail: true }),
        WorkflowSettings::default(),
    );
    failing.tags_mut().add_token("codeine");
    failing
        .accept_file(IntakeDrop::single(MemoryFile::new("patient.vcf", SAMPLE_VCF)))
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    failing.submit().await?;
    if let Some(message) = failing.state().error_message() {
        println!("\n⚠️ 分析失败: {}", message);
    }

    failing.reset();
    info!("Failed workflow reset to {:?}", failing.stage());
    println!(
        "🔄 重置后: 阶段 {:?}，标签 {}，文件 {}",
        failing.stage(),
        failing.tags().len(),
        failing.accepted_file().is_some()
    );

    println!("\n🎉 演示完成");
    Ok(())
}
