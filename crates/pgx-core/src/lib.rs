//! # PharmaGuard Core
//!
//! 客户端的核心模块，提供数据契约、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{PgxError, Result};
pub use models::*;
