//! PharmaGuard 命令行客户端

mod terminal;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use pgx_admin::{init_tracing, load_config, ClientConfig};
use pgx_core::AnalysisOutcome;
use pgx_intake::{FileIntake, IntakeDrop, LocalFile};
use pgx_integration::AnalysisClient;
use pgx_render::{write_export, ItemKey, ResultView};
use pgx_workflow::{TagCollector, WorkflowController, WorkflowState, ANALYSIS_PHASES};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

/// PharmaGuard 命令行参数
#[derive(Parser, Debug)]
#[command(name = "pgx-client")]
#[command(about = "PharmaGuard 药物基因组学风险分析客户端")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 提交VCF文件与药物列表进行分析
    Analyze(AnalyzeArgs),
    /// 只做本地文件预检
    Validate {
        /// VCF文件路径
        path: PathBuf,
    },
    /// 列出药物建议
    Suggest {
        /// 输入片段
        query: Option<String>,
    },
    /// 检查分析服务是否可用
    Health,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// VCF文件路径
    #[arg(long)]
    vcf: PathBuf,

    /// 药物名称，可重复
    #[arg(short, long = "drug")]
    drug: Vec<String>,

    /// 逗号分隔的药物列表
    #[arg(long, value_delimiter = ',')]
    drugs: Vec<String>,

    /// 患者编号
    #[arg(short, long)]
    patient_id: Option<String>,

    /// 展开机制说明
    #[arg(long)]
    expand: bool,

    /// 显示原始结果
    #[arg(long)]
    raw: bool,

    /// 导出结果到文件或目录
    #[arg(long)]
    export: Option<PathBuf>,

    /// 不做逐字显示
    #[arg(long)]
    no_animate: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    init_tracing(&config.logging, cli.log_level.as_deref())?;

    match cli.command {
        Command::Analyze(args) => run_analyze(&config, args).await,
        Command::Validate { path } => run_validate(&config, path).await,
        Command::Suggest { query } => {
            run_suggest(query.as_deref());
            Ok(())
        }
        Command::Health => run_health(&config).await,
    }
}

fn build_client(config: &ClientConfig) -> Result<AnalysisClient> {
    AnalysisClient::new(&config.api.base_url, config.request_timeout())
        .context("Failed to create analysis client")
}

async fn run_analyze(config: &ClientConfig, args: AnalyzeArgs) -> Result<()> {
    let client = build_client(config)?;
    let mut controller = WorkflowController::new(Arc::new(client), config.workflow_settings());

    if let Some(patient_id) = &args.patient_id {
        controller.set_patient_id(patient_id);
    }
    for drug in args.drug.iter().chain(args.drugs.iter()) {
        controller.tags_mut().add_token(drug);
    }

    let file = LocalFile::open(&args.vcf)
        .await
        .with_context(|| format!("Cannot open {}", args.vcf.display()))?;
    if let Err(rejection) = controller.accept_file(IntakeDrop::single(file)).await {
        bail!("{}", rejection);
    }

    let pending = controller.begin_submit()?;
    let attempt = pending.attempt;
    let backend = controller.backend();
    let mut phases = controller.phase_updates();

    println!(
        "🧬 Analysing {} for {} ({})",
        controller.tags().drugs_field(),
        controller.patient_id(),
        pending.file.name
    );
    if let Some(label) = controller.phase_label() {
        println!("   ⏳ {}", label);
    }

    let request = pending.execute(backend.as_ref());
    tokio::pin!(request);

    let outcome = loop {
        tokio::select! {
            outcome = &mut request => break outcome,
            phase = next_phase(&mut phases) => match phase {
                Some(index) => {
                    if let Some(label) = ANALYSIS_PHASES.get(index) {
                        println!("   ⏳ {}", label);
                    }
                }
                None => phases = None,
            },
            _ = tokio::signal::ctrl_c() => {
                warn!("Analysis {} cancelled by user", attempt);
                controller.reset();
                println!("🛑 Cancelled");
                return Ok(());
            }
        }
    };

    controller.complete(attempt, outcome)?;

    match controller.state() {
        WorkflowState::Results(outcome) => {
            let patient_id = controller.patient_id().to_string();
            render_results(config, &args, outcome, &patient_id).await
        }
        WorkflowState::Error(message) => bail!("{}", message),
        other => bail!("Unexpected workflow stage {:?}", other.stage()),
    }
}

/// 等待下一次阶段变化；轮播结束后返回 `None`
async fn next_phase(updates: &mut Option<watch::Receiver<usize>>) -> Option<usize> {
    let Some(rx) = updates.as_mut() else {
        return std::future::pending().await;
    };
    match rx.changed().await {
        Ok(()) => Some(*rx.borrow_and_update()),
        Err(_) => None,
    }
}

async fn render_results(
    config: &ClientConfig,
    args: &AnalyzeArgs,
    outcome: &AnalysisOutcome,
    patient_id: &str,
) -> Result<()> {
    let mut view = ResultView::new(outcome.results.clone());
    terminal::print_summary(&view.summary(), &outcome.warnings);

    let keys: Vec<ItemKey> = view.keys().cloned().collect();
    for key in &keys {
        if args.expand {
            view.toggle_expanded(key);
        }
        if args.raw {
            view.toggle_raw(key);
        }
    }

    if config.render.animate && !args.no_animate {
        terminal::animate(&view, config.reveal_interval()).await;
    } else {
        terminal::print_settled(&mut view);
    }

    if let Some(target) = &args.export {
        let bytes = view.export_all()?;
        let path = write_export(target, patient_id, &bytes).await?;
        println!();
        println!("💾 Exported {} result(s) to {}", view.len(), path.display());
    }

    Ok(())
}

async fn run_validate(config: &ClientConfig, path: PathBuf) -> Result<()> {
    let file = LocalFile::open(&path)
        .await
        .with_context(|| format!("Cannot open {}", path.display()))?;

    let mut intake = FileIntake::new(config.intake_rules());
    match intake.evaluate(IntakeDrop::single(file)).await {
        Ok(accepted) => {
            println!("✅ {} accepted ({} bytes)", accepted.name, accepted.size);
            Ok(())
        }
        Err(rejection) => bail!("{}: {}", path.display(), rejection),
    }
}

fn run_suggest(query: Option<&str>) {
    let mut tags = TagCollector::default();
    tags.set_buffer(query.unwrap_or_default());

    let suggestions: Vec<&str> = tags.suggestions().collect();
    if suggestions.is_empty() {
        println!("No matching drugs");
    }
    for suggestion in suggestions {
        println!("{}", suggestion);
    }
}

async fn run_health(config: &ClientConfig) -> Result<()> {
    let client = build_client(config)?;
    let health = client.health().await.map_err(|e| anyhow::anyhow!(e.user_message()))?;

    info!("Health response from {}: {:?}", client.base_url(), health);
    if !health.is_ok() {
        bail!("Service at {} reports status '{}'", client.base_url(), health.status);
    }

    println!(
        "✅ {} {} is up at {}",
        health.service.as_deref().unwrap_or("service"),
        health.version.as_deref().unwrap_or(""),
        client.base_url()
    );
    Ok(())
}
