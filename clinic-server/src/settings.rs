//! 服务配置
//!
//! 可选的 TOML 配置文件叠加 `CLINIC__` 前缀的环境变量，
//! 例如 `CLINIC__SERVER__PORT=9090`。

use anyhow::{Context, Result};
use clinic_store::paths_overlap;
use clinic_workflow::{RoomCatalog, RoomSpec, WorkflowConfig};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClinicConfig {
    pub server: ServerConfig,
    pub workflow: WorkflowConfig,
    pub logging: LoggingConfig,
    /// 诊室表
    pub rooms: Vec<RoomSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ClinicConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            workflow: WorkflowConfig::default(),
            logging: LoggingConfig::default(),
            rooms: RoomCatalog::standard().rooms().to_vec(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl ClinicConfig {
    /// 加载配置：文件（若指定）在下，环境变量在上
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }
        Self::build(builder)
            .with_context(|| format!("Failed to load configuration from {:?}", config_path))
    }

    /// 从 TOML 文本加载
    pub fn from_toml(content: &str) -> Result<Self> {
        Self::build(Config::builder().add_source(File::from_str(content, FileFormat::Toml)))
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings = builder
            .add_source(
                Environment::with_prefix("CLINIC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ClinicConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        Ok(config)
    }

    /// 由诊室表构建诊室目录
    pub fn catalog(&self) -> Result<RoomCatalog> {
        Ok(RoomCatalog::new(self.rooms.clone())?)
    }
}

/// 配置验证器
pub struct ConfigValidator {
    validation_rules: Vec<ValidationRule>,
}

/// 验证规则
struct ValidationRule {
    field_path: &'static str,
    validator: fn(&ClinicConfig) -> Result<()>,
    error_message: &'static str,
}

impl ConfigValidator {
    pub fn new() -> Self {
        let validation_rules = vec![
            ValidationRule {
                field_path: "server.port",
                validator: |config| {
                    if config.server.port == 0 {
                        Err(anyhow::anyhow!("Server port cannot be 0"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid server port",
            },
            ValidationRule {
                field_path: "workflow.max_allocation_attempts",
                validator: |config| {
                    if config.workflow.max_allocation_attempts == 0 {
                        Err(anyhow::anyhow!("At least one allocation attempt is required"))
                    } else {
                        Ok(())
                    }
                },
                error_message: "Invalid allocation attempts",
            },
            ValidationRule {
                field_path: "workflow",
                validator: |config| {
                    let workflow = &config.workflow;
                    let paths = [
                        &workflow.counter_key,
                        &workflow.tokens_path,
                        &workflow.occupancy_path,
                    ];
                    if paths.iter().any(|p| p.trim_matches('/').is_empty()) {
                        return Err(anyhow::anyhow!("Store paths cannot be empty"));
                    }
                    for (i, a) in paths.iter().enumerate() {
                        for b in &paths[i + 1..] {
                            if paths_overlap(a, b) {
                                return Err(anyhow::anyhow!("Store paths {} and {} overlap", a, b));
                            }
                        }
                    }
                    Ok(())
                },
                error_message: "Invalid store paths",
            },
            ValidationRule {
                field_path: "rooms",
                validator: |config| config.catalog().map(|_| ()),
                error_message: "Invalid room table",
            },
        ];

        Self { validation_rules }
    }

    /// 逐条验证，遇到第一条失败即返回
    pub fn validate(&self, config: &ClinicConfig) -> Result<()> {
        for rule in &self.validation_rules {
            if let Err(e) = (rule.validator)(config) {
                error!("Configuration validation failed for {}: {}", rule.field_path, e);
                return Err(anyhow::anyhow!("{}: {}", rule.error_message, e));
            }
        }

        info!("Configuration validation passed");
        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ClinicConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.workflow.max_allocation_attempts, 5);
        assert_eq!(config.rooms.len(), 4);
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = ClinicConfig::load(Some("../config/default.toml")).unwrap();
        assert_eq!(config, ClinicConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClinicConfig::from_toml(
            r#"
            [server]
            port = 9000

            [workflow]
            max_allocation_attempts = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.workflow.max_allocation_attempts, 8);
        assert_eq!(config.workflow.tokens_path, "patients/tokens");
        assert_eq!(config.rooms.len(), 4);
    }

    #[test]
    fn test_custom_room_table() {
        let config = ClinicConfig::from_toml(
            r#"
            [[rooms]]
            id = "Room A"
            station = "a"
            label = "A"
            compatible_with = ["General", "Emergency"]
            emergency = true
            default = true
            "#,
        )
        .unwrap();

        assert!(ConfigValidator::new().validate(&config).is_ok());
        let catalog = config.catalog().unwrap();
        assert_eq!(catalog.emergency_room().id, "Room A");
    }

    #[test]
    fn test_room_table_without_emergency_room_is_rejected() {
        let config = ClinicConfig::from_toml(
            r#"
            [[rooms]]
            id = "Room A"
            station = "a"
            label = "A"
            compatible_with = ["General"]
            default = true
            "#,
        )
        .unwrap();

        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_overlapping_paths_are_rejected() {
        let mut config = ClinicConfig::default();
        config.workflow.occupancy_path = "patients/tokens/rooms".to_string();
        assert!(ConfigValidator::new().validate(&config).is_err());

        let mut config = ClinicConfig::default();
        config.server.port = 0;
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
