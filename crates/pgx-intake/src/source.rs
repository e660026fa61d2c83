//! 候选文件来源
//!
//! 校验器只通过 [`FileSource`] 访问文件，本地文件与内存数据共用同一套校验流程。

use async_trait::async_trait;
use pgx_core::UploadFile;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// 候选文件接口
#[async_trait]
pub trait FileSource: Send + Sync + std::fmt::Debug {
    /// 声明的文件名
    fn name(&self) -> &str;

    /// 字节大小
    fn size(&self) -> u64;

    /// 只读取前 `len` 个字节
    async fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>>;

    /// 读取完整内容（上传时使用）
    async fn read_all(&self) -> io::Result<Vec<u8>>;

    /// 转换为上传载荷
    async fn to_upload(&self) -> io::Result<UploadFile> {
        Ok(UploadFile {
            name: self.name().to_string(),
            bytes: self.read_all().await?,
        })
    }
}

/// 本地磁盘上的文件
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl LocalFile {
    /// 读取元数据并创建句柄，内容延迟读取
    pub async fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        let file = tokio::fs::File::open(&self.path).await?;
        let mut buf = Vec::with_capacity(len);
        file.take(len as u64).read_to_end(&mut buf).await?;
        Ok(buf)
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// 内存中的文件（拖放数据、测试）
#[derive(Debug, Clone)]
pub struct MemoryFile {
    name: String,
    bytes: Vec<u8>,
}

impl MemoryFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    async fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        let end = len.min(self.bytes.len());
        Ok(self.bytes[..end].to_vec())
    }

    async fn read_all(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_file_reads_only_prefix() {
        let path = std::env::temp_dir().join(format!("pgx-source-{}.vcf", uuid::Uuid::new_v4()));
        tokio::fs::write(&path, b"##fileformat=VCFv4.2\n#CHROM\tPOS\n").await.unwrap();

        let file = LocalFile::open(&path).await.unwrap();
        assert!(file.name().ends_with(".vcf"));
        assert_eq!(file.size(), 32);
        assert_eq!(file.read_prefix(4).await.unwrap(), b"##fi");
        assert_eq!(file.read_all().await.unwrap().len(), 32);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_local_file_rejects_directory() {
        let err = LocalFile::open(std::env::temp_dir()).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[tokio::test]
    async fn test_memory_file_prefix_shorter_than_len() {
        let file = MemoryFile::new("a.vcf", b"##".to_vec());
        assert_eq!(file.read_prefix(500).await.unwrap(), b"##");
        let upload = file.to_upload().await.unwrap();
        assert_eq!(upload.name, "a.vcf");
    }
}
