/// 统一配置系统
///
/// 提供TOML/JSON配置文件、环境变量覆盖，以及日志系统初始化
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 桥接配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// What to do with a reference token that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPolicy {
    /// Report `ConversionError::MalformedToken`.
    Strict,
    /// Bind the stand-in to the root handle and log a warning.
    Lenient,
}

/// How calls with no return value reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoidCallMode {
    Execute,
    Evaluate,
}

/// 桥接主配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// 脚本端句柄表的全局变量名
    pub table_name: String,

    /// 脚本端线格式转换函数的全局变量名
    pub converter_name: String,

    /// 标记已注册对象的属性名
    pub tag_property: String,

    /// 句柄 0 绑定的根对象表达式
    pub root_expression: String,

    pub token_policy: TokenPolicy,

    pub void_calls: VoidCallMode,

    /// 嵌入式引擎配置
    pub engine: EngineLimits,

    /// 日志配置
    pub logging: LoggingConfig,
}

use crate::impl_default;

impl_default!(BridgeConfig {
    table_name: "nsiArray".to_string(),
    converter_name: "convertNsi".to_string(),
    tag_property: "nsiId".to_string(),
    root_expression: "globalThis".to_string(),
    token_policy: TokenPolicy::Strict,
    void_calls: VoidCallMode::Execute,
    engine: EngineLimits::default(),
    logging: LoggingConfig::default(),
});

impl BridgeConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("SCRIPT_PROXY_TABLE_NAME") {
            self.table_name = val;
        }
        if let Ok(val) = env::var("SCRIPT_PROXY_ROOT") {
            self.root_expression = val;
        }
        if let Ok(val) = env::var("SCRIPT_PROXY_TOKEN_POLICY") {
            match val.to_ascii_lowercase().as_str() {
                "strict" => self.token_policy = TokenPolicy::Strict,
                "lenient" => self.token_policy = TokenPolicy::Lenient,
                _ => {}
            }
        }
        if let Ok(val) = env::var("SCRIPT_PROXY_LOG_LEVEL") {
            if let Some(level) = LogLevel::parse(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, value) in [
            ("table_name", &self.table_name),
            ("converter_name", &self.converter_name),
            ("tag_property", &self.tag_property),
        ] {
            if !is_identifier(value) {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be a script identifier, got {:?}",
                    field, value
                )));
            }
        }
        if self.table_name == self.converter_name {
            return Err(ConfigError::ValidationError(
                "table_name and converter_name must differ".to_string(),
            ));
        }
        if !self.root_expression.split('.').all(is_identifier) {
            return Err(ConfigError::ValidationError(format!(
                "root_expression must be a dotted identifier path, got {:?}",
                self.root_expression
            )));
        }
        self.engine.validate()?;
        Ok(())
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./script_proxy.toml
    /// 2. ./script_proxy.json
    /// 3. <用户配置目录>/script_proxy/config.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("script_proxy.toml") {
            tracing::info!(target: "bridge.config", "Loaded config from script_proxy.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("script_proxy.json") {
            tracing::info!(target: "bridge.config", "Loaded config from script_proxy.json");
            return config;
        }

        if let Some(config_path) = user_config_path() {
            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "bridge.config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "bridge.config", "Using default configuration");
        Self::default()
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("script_proxy").join("config.toml"))
}

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// 嵌入式引擎限制
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineLimits {
    /// 运行时内存上限（字节）
    pub memory_limit_bytes: Option<usize>,

    /// 最大栈大小（字节）
    pub max_stack_size_bytes: Option<usize>,
}

impl EngineLimits {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.memory_limit_bytes == Some(0) {
            return Err(ConfigError::ValidationError(
                "memory_limit_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_stack_size_bytes == Some(0) {
            return Err(ConfigError::ValidationError(
                "max_stack_size_bytes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
    log_to_console: true,
});

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// 初始化日志系统
///
/// 配置tracing日志框架；`RUST_LOG`环境变量优先于配置中的级别。
pub fn init_logging(config: &LoggingConfig) {
    if !config.log_to_console {
        return;
    }
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.level.as_directive()));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.table_name, "nsiArray");
        assert_eq!(config.converter_name, "convertNsi");
        assert_eq!(config.token_policy, TokenPolicy::Strict);
    }

    #[test]
    fn test_toml_serialization() {
        let config = BridgeConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: BridgeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.table_name, parsed.table_name);
        assert_eq!(config.void_calls, parsed.void_calls);
    }

    #[test]
    fn test_json_serialization() {
        let config = BridgeConfig::default();
        let json_str = serde_json::to_string(&config).unwrap();
        let parsed: BridgeConfig = serde_json::from_str(&json_str).unwrap();
        assert_eq!(config.root_expression, parsed.root_expression);
        assert_eq!(config.logging.level, parsed.logging.level);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = BridgeConfig::from_toml_str(
            r#"
            root_expression = "window"
            token_policy = "lenient"

            [engine]
            memory_limit_bytes = 1048576
            "#,
        )
        .unwrap();
        assert_eq!(config.root_expression, "window");
        assert_eq!(config.token_policy, TokenPolicy::Lenient);
        assert_eq!(config.engine.memory_limit_bytes, Some(1_048_576));
        assert_eq!(config.table_name, "nsiArray");
    }

    #[test]
    fn test_validation_rejects_bad_names() {
        let config = BridgeConfig {
            table_name: "nsi Array".to_string(),
            ..BridgeConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let config = BridgeConfig {
            root_expression: "window.".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());

        let config = BridgeConfig {
            root_expression: "window.top".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = BridgeConfig {
            converter_name: "nsiArray".to_string(),
            ..BridgeConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.toml");
        let config = BridgeConfig {
            table_name: "handles".to_string(),
            ..BridgeConfig::default()
        };
        config.save_toml(&path).unwrap();
        let loaded = BridgeConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded.table_name, "handles");

        let path = dir.path().join("bridge.json");
        config.save_json(&path).unwrap();
        let loaded = BridgeConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded.table_name, "handles");
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("trace"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Debug.as_directive(), "debug");
    }
}
