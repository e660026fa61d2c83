//! 结果导出
//!
//! 导出内容为缩进格式的JSON，与服务端返回的结构一致。

use chrono::{DateTime, Utc};
use pgx_core::{ResultItem, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// 单条结果的导出字节
pub fn export_item(item: &ResultItem) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(item)?)
}

/// 全部结果的导出字节，顺序与结果列表一致
pub fn export_all(items: &[ResultItem]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(items)?)
}

/// 导出文件名：`pharmaguard_<患者>_<时间>.json`
pub fn export_file_name(patient_id: &str, at: DateTime<Utc>) -> String {
    let patient: String = patient_id
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let patient = if patient.is_empty() { "unknown".to_string() } else { patient };

    format!("pharmaguard_{}_{}.json", patient, at.format("%Y%m%dT%H%M%S"))
}

/// 将导出内容写入文件
///
/// 目标为目录时在其中按 [`export_file_name`] 生成文件名。
pub async fn write_export(
    target: &Path,
    patient_id: &str,
    bytes: &[u8],
) -> Result<PathBuf> {
    let path = if tokio::fs::metadata(target)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
    {
        target.join(export_file_name(patient_id, Utc::now()))
    } else {
        target.to_path_buf()
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&path, bytes).await?;

    info!("Exported {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
