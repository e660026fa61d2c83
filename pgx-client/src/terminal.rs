//! 终端输出

use pgx_core::ResultItem;
use pgx_render::{
    confidence_percent, label_style, run_until_settled, settle_now, ItemDisplay, ResultView,
    RiskSummary,
};
use std::io::{self, Write};
use std::time::Duration;
use tracing::warn;

/// 输出风险汇总与服务端警告
pub fn print_summary(summary: &RiskSummary, warnings: &[String]) {
    if let Err(e) = write_summary(&mut io::stdout().lock(), summary, warnings) {
        warn!("Failed to write summary to stdout: {}", e);
    }
}

fn write_summary<W: Write>(out: &mut W, summary: &RiskSummary, warnings: &[String]) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "📊 {} drug(s) analysed", summary.total)?;
    writeln!(out, "   ✅ Safe:   {}", summary.safe)?;
    writeln!(out, "   ⚠️  Adjust: {}", summary.adjust)?;
    writeln!(out, "   ⛔ Risk:   {}", summary.risk)?;
    if summary.unknown > 0 {
        writeln!(out, "   ❔ Unknown: {}", summary.unknown)?;
    }
    if !warnings.is_empty() {
        writeln!(out, "   Server warnings:")?;
        for warning in warnings {
            writeln!(out, "   ⚠️  {}", warning)?;
        }
    }
    Ok(())
}

fn print_header(item: &ResultItem) {
    let style = label_style(item.risk_label());
    let profile = &item.pharmacogenomic_profile;

    println!();
    println!(
        "💊 {}  [{}]  confidence {}  severity {}",
        item.drug,
        style.title,
        confidence_percent(item.risk_assessment.confidence_score),
        item.risk_assessment.severity
    );
    println!("   {}", style.description);
    println!(
        "   {} {} ({})",
        profile.primary_gene, profile.diplotype, profile.phenotype
    );
    for variant in &item.detected_variants {
        println!(
            "   • {} {}",
            variant.rsid,
            variant.genotype.as_deref().unwrap_or("")
        );
    }
}

fn print_raw(item: &ResultItem, display: &ItemDisplay) {
    if !display.show_raw() {
        return;
    }
    match serde_json::to_string_pretty(item) {
        Ok(raw) => println!("   Raw payload:\n{}", raw),
        Err(e) => eprintln!("   Raw payload unavailable: {}", e),
    }
}

/// 已输出的字节数，按帧打印新增部分
#[derive(Default)]
struct Printed {
    summary: usize,
    mechanism: Option<usize>,
}

impl Printed {
    fn flush_frame(&mut self, display: &ItemDisplay) -> io::Result<()> {
        self.write_frame(&mut io::stdout().lock(), display)
    }

    fn write_frame<W: Write>(&mut self, out: &mut W, display: &ItemDisplay) -> io::Result<()> {
        if self.summary == 0 && display.summary().total_len() > 0 {
            write!(out, "   ")?;
        }
        let summary = display.summary_text();
        if summary.len() > self.summary {
            write!(out, "{}", &summary[self.summary..])?;
            self.summary = summary.len();
        }

        if let Some(mechanism) = display.mechanism_text() {
            if self.mechanism.is_none() {
                write!(out, "\n   Mechanism: ")?;
                self.mechanism = Some(0);
            }
            let printed = self.mechanism.get_or_insert(0);
            if mechanism.len() > *printed {
                write!(out, "{}", &mechanism[*printed..])?;
                *printed = mechanism.len();
            }
        }

        out.flush()
    }
}

/// 逐个条目逐字输出
pub async fn animate(view: &ResultView, interval: Duration) {
    for (item, display) in view.entries() {
        print_header(item);

        let mut single = ResultView::new(vec![item.clone()]);
        if display.is_expanded() {
            single.expand_all();
        }

        let mut printed = Printed::default();
        let mut write_failed = false;
        run_until_settled(&mut single, interval, |frame| {
            if let Some((_, d)) = frame.entries().next() {
                if let Err(e) = printed.flush_frame(d) {
                    // 只记录一次，stdout 关闭后每帧都会失败
                    if !write_failed {
                        warn!("Failed to write to stdout: {}", e);
                        write_failed = true;
                    }
                }
            }
        })
        .await;
        println!();

        print_raw(item, display);
    }
}

/// 直接输出完整内容
pub fn print_settled(view: &mut ResultView) {
    settle_now(view);
    for (item, display) in view.entries() {
        print_header(item);
        println!("   {}", display.summary_text());
        if let Some(mechanism) = display.mechanism_text() {
            println!("   Mechanism: {}", mechanism);
        }
        print_raw(item, display);
    }
}
