//! 结果汇总
//!
//! 汇总值总是从结果序列即时计算，不单独存储。

use pgx_core::{ResultItem, RiskLabel};
use serde::Serialize;

/// 风险汇总统计
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RiskSummary {
    pub total: usize,
    pub safe: usize,
    pub adjust: usize,
    /// Toxic 与 Ineffective 合并计数
    pub risk: usize,
    pub unknown: usize,
}

impl RiskSummary {
    pub fn from_results(items: &[ResultItem]) -> Self {
        let mut summary = RiskSummary {
            total: items.len(),
            ..Default::default()
        };

        for item in items {
            match item.risk_label() {
                RiskLabel::Safe => summary.safe += 1,
                RiskLabel::Adjust => summary.adjust += 1,
                RiskLabel::Toxic | RiskLabel::Ineffective => summary.risk += 1,
                RiskLabel::Unknown => summary.unknown += 1,
            }
        }

        summary
    }
}

/// 风险标签的展示信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelStyle {
    pub title: &'static str,
    pub description: &'static str,
    /// 越大越严重，用于排序
    pub rank: u8,
}

pub fn label_style(label: RiskLabel) -> LabelStyle {
    match label {
        RiskLabel::Safe => LabelStyle {
            title: "Safe",
            description: "Standard dosing is appropriate",
            rank: 0,
        },
        RiskLabel::Adjust => LabelStyle {
            title: "Adjust Dosage",
            description: "Dose adjustment is recommended",
            rank: 2,
        },
        RiskLabel::Toxic => LabelStyle {
            title: "Toxic",
            description: "High risk of adverse reaction",
            rank: 4,
        },
        RiskLabel::Ineffective => LabelStyle {
            title: "Ineffective",
            description: "Drug is unlikely to work as intended",
            rank: 3,
        },
        RiskLabel::Unknown => LabelStyle {
            title: "Unknown",
            description: "No guideline coverage for this gene-drug pair",
            rank: 1,
        },
    }
}

/// 置信度显示为百分比
pub fn confidence_percent(score: f64) -> String {
    let clamped = if score.is_finite() { score.clamp(0.0, 1.0) } else { 0.0 };
    format!("{:.0}%", clamped * 100.0)
}
