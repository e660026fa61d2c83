//! # PharmaGuard 文件预检模块
//!
//! 上传前在客户端完成VCF文件的校验，只有通过校验的文件才能进入提交草稿。

pub mod source;
pub mod validator;

pub use source::{FileSource, LocalFile, MemoryFile};
pub use validator::{
    FileAcceptance, FileIntake, IntakeDrop, IntakeRejection, IntakeRules, PendingRead,
    DEFAULT_MAX_FILE_BYTES, DEFAULT_PREFIX_LEN, VCF_FORMAT_MARKER,
};
