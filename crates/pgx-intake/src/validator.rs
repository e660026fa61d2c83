//! VCF文件预检模块
//!
//! 在任何网络请求之前，于客户端完成文件的结构与内容校验：
//! 1. 数量与选择器拒绝标记
//! 2. 扩展名
//! 3. 大小上限
//! 4. 内容前缀（仅读取前若干字节）

use crate::source::FileSource;
use pgx_core::utils::ends_with_ignore_case;
use serde::{Deserialize, Serialize};
use std::io;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// VCF文件头标记
pub const VCF_FORMAT_MARKER: &str = "##fileformat=VCF";

/// 默认大小上限：5 MiB
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// 默认前缀读取长度
pub const DEFAULT_PREFIX_LEN: usize = 500;

/// 文件拒绝原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntakeRejection {
    #[error("Invalid file or size. Please upload a single .vcf file.")]
    InvalidFile,

    #[error("Wrong file type: only {extension} files are accepted.")]
    WrongExtension { extension: String },

    #[error("File too large: {size} bytes exceeds the {limit} byte limit.")]
    TooLarge { size: u64, limit: u64 },

    #[error("Invalid content header: file does not start with {marker}.")]
    InvalidHeader { marker: String },
}

/// 校验规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeRules {
    /// 必需的扩展名
    pub extension: String,
    /// 大小上限（字节）
    pub max_file_bytes: u64,
    /// 内容前缀读取长度
    pub prefix_len: usize,
    /// 文件头标记
    pub format_marker: String,
}

impl Default for IntakeRules {
    fn default() -> Self {
        Self {
            extension: ".vcf".to_string(),
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            prefix_len: DEFAULT_PREFIX_LEN,
            format_marker: VCF_FORMAT_MARKER.to_string(),
        }
    }
}

/// 一次拖放或选择的结果
#[derive(Debug, Clone, Default)]
pub struct IntakeDrop {
    /// 选择器接受的文件
    pub files: Vec<Arc<dyn FileSource>>,
    /// 选择器已标记拒绝的文件数量
    pub picker_rejected: usize,
}

impl IntakeDrop {
    pub fn single(file: impl FileSource + 'static) -> Self {
        Self {
            files: vec![Arc::new(file)],
            picker_rejected: 0,
        }
    }

    pub fn many(files: Vec<Arc<dyn FileSource>>) -> Self {
        Self {
            files,
            picker_rejected: 0,
        }
    }

    pub fn picker_rejection() -> Self {
        Self {
            files: Vec::new(),
            picker_rejected: 1,
        }
    }
}

/// 通过校验的文件
#[derive(Debug, Clone)]
pub struct FileAcceptance {
    pub name: String,
    pub size: u64,
    pub source: Arc<dyn FileSource>,
}

/// 等待内容前缀读取的校验
#[derive(Debug)]
pub struct PendingRead {
    ticket: u64,
    source: Arc<dyn FileSource>,
    prefix_len: usize,
}

impl PendingRead {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn file_name(&self) -> &str {
        self.source.name()
    }

    /// 读取内容前缀
    pub async fn read_prefix(&self) -> io::Result<Vec<u8>> {
        self.source.read_prefix(self.prefix_len).await
    }
}

/// 文件预检器
///
/// 同一时刻只持有一个已接受文件和一条当前错误信息。
#[derive(Debug)]
pub struct FileIntake {
    rules: IntakeRules,
    accepted: Option<FileAcceptance>,
    error: Option<IntakeRejection>,
    next_ticket: u64,
    pending: Option<u64>,
}

impl Default for FileIntake {
    fn default() -> Self {
        Self::new(IntakeRules::default())
    }
}

impl FileIntake {
    /// 创建新的预检器
    pub fn new(rules: IntakeRules) -> Self {
        Self {
            rules,
            accepted: None,
            error: None,
            next_ticket: 0,
            pending: None,
        }
    }

    pub fn rules(&self) -> &IntakeRules {
        &self.rules
    }

    pub fn accepted(&self) -> Option<&FileAcceptance> {
        self.accepted.as_ref()
    }

    pub fn error(&self) -> Option<&IntakeRejection> {
        self.error.as_ref()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// 完整校验：同步检查后读取内容前缀
    pub async fn evaluate(&mut self, drop: IntakeDrop) -> Result<FileAcceptance, IntakeRejection> {
        let pending = self.begin(drop)?;
        let prefix = pending.read_prefix().await;
        match self.finish(pending, prefix) {
            Some(result) => result,
            // 单线程顺序调用下不会出现过期读取
            None => Err(IntakeRejection::InvalidFile),
        }
    }

    /// 同步检查阶段
    ///
    /// 每次调用都会使之前尚未完成的读取失效。
    pub fn begin(&mut self, drop: IntakeDrop) -> Result<PendingRead, IntakeRejection> {
        self.next_ticket += 1;
        self.pending = None;
        self.error = None;

        let source = match self.check_structure(&drop) {
            Ok(source) => source,
            Err(rejection) => return Err(self.reject(rejection)),
        };

        debug!(
            "File {} passed structural checks, reading first {} bytes",
            source.name(),
            self.rules.prefix_len
        );
        self.pending = Some(self.next_ticket);

        Ok(PendingRead {
            ticket: self.next_ticket,
            source,
            prefix_len: self.rules.prefix_len,
        })
    }

    /// 内容检查阶段
    ///
    /// 返回 `None` 表示该读取已被更新的尝试取代，结果被丢弃。
    pub fn finish(
        &mut self,
        pending: PendingRead,
        prefix: io::Result<Vec<u8>>,
    ) -> Option<Result<FileAcceptance, IntakeRejection>> {
        if self.pending != Some(pending.ticket) {
            debug!("Discarding stale prefix read for {}", pending.file_name());
            return None;
        }
        self.pending = None;

        let header_ok = match prefix {
            Ok(bytes) => String::from_utf8_lossy(&bytes).starts_with(&self.rules.format_marker),
            Err(e) => {
                warn!("Failed to read content prefix of {}: {}", pending.file_name(), e);
                false
            }
        };

        if !header_ok {
            return Some(Err(self.reject(IntakeRejection::InvalidHeader {
                marker: self.rules.format_marker.clone(),
            })));
        }

        let acceptance = FileAcceptance {
            name: pending.source.name().to_string(),
            size: pending.source.size(),
            source: pending.source,
        };
        info!("Accepted file {} ({} bytes)", acceptance.name, acceptance.size);
        self.accepted = Some(acceptance.clone());

        Some(Ok(acceptance))
    }

    /// 清除已接受文件，不做任何校验
    pub fn clear(&mut self) {
        self.accepted = None;
        self.error = None;
        self.pending = None;
    }

    fn check_structure(&self, drop: &IntakeDrop) -> Result<Arc<dyn FileSource>, IntakeRejection> {
        if drop.picker_rejected > 0 || drop.files.len() != 1 {
            return Err(IntakeRejection::InvalidFile);
        }
        let source = drop.files[0].clone();

        if !ends_with_ignore_case(source.name(), &self.rules.extension) {
            return Err(IntakeRejection::WrongExtension {
                extension: self.rules.extension.clone(),
            });
        }

        if source.size() > self.rules.max_file_bytes {
            return Err(IntakeRejection::TooLarge {
                size: source.size(),
                limit: self.rules.max_file_bytes,
            });
        }

        Ok(source)
    }

    fn reject(&mut self, rejection: IntakeRejection) -> IntakeRejection {
        warn!("File rejected: {}", rejection);
        self.error = Some(rejection.clone());
        rejection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemoryFile;

    const VALID_VCF: &[u8] = b"##fileformat=VCFv4.2\n#CHROM\tPOS\tID\tREF\tALT\n";

    #[tokio::test]
    async fn test_wrong_extension_rejected_regardless_of_content() {
        let mut intake = FileIntake::default();
        let result = intake.evaluate(IntakeDrop::single(MemoryFile::new("sample.txt", VALID_VCF))).await;
        assert!(matches!(result, Err(IntakeRejection::WrongExtension { .. })));
        assert!(intake.accepted().is_none());
        assert!(intake.error().is_some());
    }

    #[tokio::test]
    async fn test_oversized_file_rejected() {
        let mut bytes = VALID_VCF.to_vec();
        bytes.resize(6 * 1024 * 1024, b'A');

        let mut intake = FileIntake::default();
        let result = intake.evaluate(IntakeDrop::single(MemoryFile::new("sample.vcf", bytes))).await;
        assert!(matches!(result, Err(IntakeRejection::TooLarge { limit, .. }) if limit == DEFAULT_MAX_FILE_BYTES));
    }

    #[tokio::test]
    async fn test_file_at_ceiling_accepted() {
        let mut bytes = VALID_VCF.to_vec();
        bytes.resize(DEFAULT_MAX_FILE_BYTES as usize, b'A');

        let mut intake = FileIntake::default();
        assert!(intake.evaluate(IntakeDrop::single(MemoryFile::new("sample.vcf", bytes))).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_marker_rejected() {
        let mut intake = FileIntake::default();
        let result = intake
            .evaluate(IntakeDrop::single(MemoryFile::new("sample.vcf", b"CHROM\tPOS\n".to_vec())))
            .await;
        assert!(matches!(result, Err(IntakeRejection::InvalidHeader { .. })));
        assert!(intake.accepted().is_none());
    }

    #[tokio::test]
    async fn test_valid_file_accepted_case_insensitive_extension() {
        let mut intake = FileIntake::default();
        let accepted = intake
            .evaluate(IntakeDrop::single(MemoryFile::new("Sample.VCF", VALID_VCF)))
            .await
            .unwrap();
        assert_eq!(accepted.name, "Sample.VCF");
        assert_eq!(accepted.size, VALID_VCF.len() as u64);
        assert!(intake.error().is_none());
    }

    #[tokio::test]
    async fn test_picker_rejection_and_multiple_files() {
        let mut intake = FileIntake::default();
        assert_eq!(
            intake.evaluate(IntakeDrop::picker_rejection()).await.unwrap_err(),
            IntakeRejection::InvalidFile
        );
        assert_eq!(
            intake.evaluate(IntakeDrop::default()).await.unwrap_err(),
            IntakeRejection::InvalidFile
        );

        let files: Vec<Arc<dyn FileSource>> = vec![
            Arc::new(MemoryFile::new("a.vcf", VALID_VCF)),
            Arc::new(MemoryFile::new("b.vcf", VALID_VCF)),
        ];
        assert_eq!(
            intake.evaluate(IntakeDrop::many(files)).await.unwrap_err(),
            IntakeRejection::InvalidFile
        );
    }

    #[tokio::test]
    async fn test_new_acceptance_replaces_previous_and_error_is_replaced() {
        let mut intake = FileIntake::default();
        intake.evaluate(IntakeDrop::single(MemoryFile::new("a.vcf", VALID_VCF))).await.unwrap();

        let _ = intake.evaluate(IntakeDrop::single(MemoryFile::new("bad.txt", VALID_VCF))).await;
        assert!(matches!(intake.error(), Some(IntakeRejection::WrongExtension { .. })));
        // 被拒绝的尝试不会丢弃已接受的文件
        assert_eq!(intake.accepted().unwrap().name, "a.vcf");

        intake.evaluate(IntakeDrop::single(MemoryFile::new("b.vcf", VALID_VCF))).await.unwrap();
        assert_eq!(intake.accepted().unwrap().name, "b.vcf");
        assert!(intake.error().is_none());
    }

    #[tokio::test]
    async fn test_stale_read_discarded() {
        let mut intake = FileIntake::default();

        let first = intake.begin(IntakeDrop::single(MemoryFile::new("first.vcf", VALID_VCF))).unwrap();
        let second = intake.begin(IntakeDrop::single(MemoryFile::new("second.vcf", VALID_VCF))).unwrap();

        let second_prefix = second.read_prefix().await;
        let first_prefix = first.read_prefix().await;

        assert!(intake.finish(second, second_prefix).unwrap().is_ok());
        assert!(intake.finish(first, first_prefix).is_none());
        assert_eq!(intake.accepted().unwrap().name, "second.vcf");
    }

    #[test]
    fn test_read_failure_reports_invalid_header() {
        let mut intake = FileIntake::default();
        let pending = intake.begin(IntakeDrop::single(MemoryFile::new("a.vcf", VALID_VCF))).unwrap();
        let result = intake
            .finish(pending, Err(io::Error::new(io::ErrorKind::Other, "boom")))
            .unwrap();
        assert!(matches!(result, Err(IntakeRejection::InvalidHeader { .. })));
    }

    #[tokio::test]
    async fn test_clear() {
        let mut intake = FileIntake::default();
        intake.evaluate(IntakeDrop::single(MemoryFile::new("a.vcf", VALID_VCF))).await.unwrap();
        intake.clear();
        assert!(intake.accepted().is_none());
        assert!(intake.error().is_none());
    }
}
