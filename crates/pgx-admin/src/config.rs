//! 配置管理
//!
//! 按以下顺序叠加配置来源：内置默认值、可选的TOML文件、`PGX` 前缀的环境变量，
//! 最后是 `API_BASE` 环境变量对服务地址的覆盖。

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use pgx_intake::IntakeRules;
use pgx_workflow::WorkflowSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "pharmaguard.toml";
/// 环境变量前缀
pub const ENV_PREFIX: &str = "PGX";
/// 服务地址覆盖变量
pub const API_BASE_VAR: &str = "API_BASE";

/// 客户端完整配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// 分析服务配置
    pub api: ApiConfig,
    /// 文件预检配置
    pub intake: IntakeConfig,
    /// 工作流配置
    pub workflow: WorkflowConfig,
    /// 结果展示配置
    pub render: RenderConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// 分析服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// 服务根地址
    pub base_url: String,
    /// 请求超时（秒）
    pub request_timeout_secs: u64,
}

/// 文件预检配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntakeConfig {
    pub extension: String,
    pub max_file_bytes: u64,
    pub prefix_len: usize,
    pub format_marker: String,
}

/// 工作流配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowConfig {
    /// 未填写患者编号时使用的默认值
    pub default_patient_id: String,
    /// 进度阶段切换间隔（毫秒）
    pub phase_interval_ms: u64,
}

/// 结果展示配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RenderConfig {
    /// 每个字符的显示间隔（毫秒）
    pub reveal_interval_ms: u64,
    /// 是否逐字显示
    pub animate: bool,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// 日志级别或过滤表达式
    pub level: String,
    /// 日志格式：pretty 或 json
    pub format: String,
}

impl ClientConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }

    pub fn reveal_interval(&self) -> Duration {
        Duration::from_millis(self.render.reveal_interval_ms)
    }

    pub fn intake_rules(&self) -> IntakeRules {
        IntakeRules {
            extension: self.intake.extension.clone(),
            max_file_bytes: self.intake.max_file_bytes,
            prefix_len: self.intake.prefix_len,
            format_marker: self.intake.format_marker.clone(),
        }
    }

    pub fn workflow_settings(&self) -> WorkflowSettings {
        WorkflowSettings {
            default_patient_id: self.workflow.default_patient_id.clone(),
            phase_interval: Duration::from_millis(self.workflow.phase_interval_ms),
            intake: self.intake_rules(),
        }
    }
}

/// 配置加载器
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// 配置文件路径，不存在时跳过
    config_path: String,
    /// 环境变量前缀
    env_prefix: String,
    /// 显式给定的服务地址覆盖
    api_base: Option<String>,
}

impl ConfigLoader {
    /// 创建新的配置加载器，服务地址覆盖取自 `API_BASE`
    pub fn new(config_path: Option<&str>) -> Self {
        Self {
            config_path: config_path.unwrap_or(DEFAULT_CONFIG_FILE).to_string(),
            env_prefix: ENV_PREFIX.to_string(),
            api_base: std::env::var(API_BASE_VAR).ok().filter(|v| !v.trim().is_empty()),
        }
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    pub fn with_api_base(mut self, api_base: Option<String>) -> Self {
        self.api_base = api_base;
        self
    }

    /// 加载并校验配置
    pub fn load(&self) -> Result<ClientConfig> {
        let defaults = Config::try_from(&ClientConfig::default())
            .context("Failed to build default configuration")?;

        let settings = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name(&self.config_path).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api.base_url", self.api_base.clone())
            .context("Failed to apply API base override")?
            .build()
            .with_context(|| format!("Failed to load configuration from {}", self.config_path))?;

        let config: ClientConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        ConfigValidator::new().validate(&config)?;

        info!("Configuration loaded (file: {}, api: {})", self.config_path, config.api.base_url);
        Ok(config)
    }
}

/// 按默认规则加载配置
pub fn load_config(config_path: Option<&str>) -> Result<ClientConfig> {
    ConfigLoader::new(config_path).load()
}

/// 配置验证器
#[derive(Debug)]
pub struct ConfigValidator {
    /// 验证规则
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
#[derive(Debug)]
struct ValidationRule {
    /// 字段路径
    field_path: &'static str,
    /// 验证函数
    validator: fn(&ClientConfig) -> Result<()>,
    /// 错误消息
    error_message: &'static str,
}

impl ConfigValidator {
    /// 创建新的配置验证器
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "api.base_url",
                validator: |config| {
                    let url = config.api.base_url.trim();
                    if url.starts_with("http://") || url.starts_with("https://") {
                        Ok(())
                    } else {
                        Err(anyhow::anyhow!("'{}' has no http(s) scheme", url))
                    }
                },
                error_message: "Invalid API base URL",
            },
            ValidationRule {
                field_path: "api.request_timeout_secs",
                validator: |config| {
                    if config.api.request_timeout_secs == 0 {
                        Err(anyhow::anyhow!("Request timeout cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid request timeout",
            },
            ValidationRule {
                field_path: "intake.max_file_bytes",
                validator: |config| {
                    if config.intake.max_file_bytes == 0 {
                        Err(anyhow::anyhow!("File size ceiling cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid file size ceiling",
            },
            ValidationRule {
                field_path: "intake.format_marker",
                validator: |config| {
                    if config.intake.format_marker.is_empty() {
                        Err(anyhow::anyhow!("Format marker cannot be empty"))
                    } else if config.intake.format_marker.len() > config.intake.prefix_len {
                        Err(anyhow::anyhow!("Format marker is longer than the prefix read"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid format marker",
            },
            ValidationRule {
                field_path: "workflow.phase_interval_ms",
                validator: |config| {
                    if config.workflow.phase_interval_ms == 0 {
                        Err(anyhow::anyhow!("Phase interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid phase interval",
            },
            ValidationRule {
                field_path: "render.reveal_interval_ms",
                validator: |config| {
                    if config.render.reveal_interval_ms == 0 {
                        Err(anyhow::anyhow!("Reveal interval cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid reveal interval",
            },
            ValidationRule {
                field_path: "logging.format",
                validator: |config| match config.logging.format.as_str() {
                    "pretty" | "json" => Ok(()),
                    other => Err(anyhow::anyhow!("Unknown log format '{}'", other)),
                },
                error_message: "Invalid log format",
            },
        ];

        Self { validation_rules }
    }

    /// 验证配置
    pub fn validate(&self, config: &ClientConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let rules = IntakeRules::default();
        let workflow = WorkflowSettings::default();
        Self {
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_secs: 120,
            },
            intake: IntakeConfig {
                extension: rules.extension,
                max_file_bytes: rules.max_file_bytes,
                prefix_len: rules.prefix_len,
                format_marker: rules.format_marker,
            },
            workflow: WorkflowConfig {
                default_patient_id: workflow.default_patient_id,
                phase_interval_ms: workflow.phase_interval.as_millis() as u64,
            },
            render: RenderConfig {
                reveal_interval_ms: 15,
                animate: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
