//! 定义 xlog 内置 Sink 及整个日志器的配置结构体。
//!
//! A logger configuration lists one entry per sink type, tagged by `mode`:
//!
//! ```toml
//! [[sinks]]
//! mode = "console"
//! level = "info"
//! buffer_size = 64
//! default_fields = ["service", "api"]
//!
//! [[sinks]]
//! mode = "jsonFormat"
//! level = "warn"
//! output = { file = "/var/log/api.json" }
//! ```

use crate::error::{Result, XlogError};
use crate::level::Level;
use crate::registry::{CONSOLE, JSON_FORMAT};
use crate::sinks::destination::Destination;
use crate::value::Value;
use serde::Deserialize;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// 控制台 Sink 配置
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ConsoleConfig {
    /// Sink 接受的最低级别
    #[serde(default)]
    pub level: Level,
    /// 入站队列容量；0 表示最多一条消息在途
    #[serde(default)]
    pub buffer_size: usize,
    #[serde(default)]
    pub output: Destination,
    /// 附加在每条记录前的 `key, value, ...` 序列
    #[serde(default)]
    pub default_fields: Vec<Value>,
    /// 是否按级别着色；默认取决于输出是否为终端
    pub colored: Option<bool>,
    /// Prepend `time=<RFC 3339>` after the default fields
    #[serde(default)]
    pub timestamp: bool,
}

/// JSON Sink 配置
#[derive(Deserialize, Debug, Clone, Default)]
pub struct JsonFormatConfig {
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub buffer_size: usize,
    #[serde(default)]
    pub output: Destination,
    #[serde(default)]
    pub default_fields: Vec<Value>,
    #[serde(default)]
    pub timestamp: bool,
}

/// Configuration value for a user-registered sink type.
#[derive(Clone)]
pub struct CustomConfig {
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl CustomConfig {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            value: Arc::new(value),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for CustomConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomConfig")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// Configuration handed to `Sink::init`, one variant per config shape.
#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "mode")]
pub enum SinkConfig {
    #[serde(rename = "console")]
    Console(ConsoleConfig),
    #[serde(rename = "jsonFormat")]
    JsonFormat(JsonFormatConfig),
    #[serde(skip_deserializing)]
    Custom(CustomConfig),
}

impl SinkConfig {
    pub fn custom<T: Any + Send + Sync>(value: T) -> Self {
        SinkConfig::Custom(CustomConfig::new(value))
    }

    /// Built-in sink type this shape belongs to.
    pub fn mode(&self) -> Option<&'static str> {
        match self {
            SinkConfig::Console(_) => Some(CONSOLE),
            SinkConfig::JsonFormat(_) => Some(JSON_FORMAT),
            SinkConfig::Custom(_) => None,
        }
    }

    /// Name of the carried config type, used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            SinkConfig::Console(_) => "ConsoleConfig",
            SinkConfig::JsonFormat(_) => "JsonFormatConfig",
            SinkConfig::Custom(custom) => custom.type_name(),
        }
    }
}

impl From<ConsoleConfig> for SinkConfig {
    fn from(config: ConsoleConfig) -> Self {
        SinkConfig::Console(config)
    }
}

impl From<JsonFormatConfig> for SinkConfig {
    fn from(config: JsonFormatConfig) -> Self {
        SinkConfig::JsonFormat(config)
    }
}

/// xlog 的顶层配置结构体。
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LoggerConfig {
    #[serde(default)]
    pub sinks: Vec<SinkConfig>,
}

/// 从 TOML 文件加载 [`LoggerConfig`]
pub fn load_config_from_file(path: &Path) -> Result<LoggerConfig> {
    if !path.exists() {
        return Err(XlogError::ConfigFileMissing(
            path.to_string_lossy().into_owned(),
        ));
    }

    let config_str = std::fs::read_to_string(path)?;
    load_config_from_str(&config_str)
}

/// 从 TOML 字符串加载 [`LoggerConfig`]
pub fn load_config_from_str(config_str: &str) -> Result<LoggerConfig> {
    let config: LoggerConfig = toml::from_str(config_str)?;
    validate_config(&config)?;
    Ok(config)
}

/// 验证配置：同一 Sink 类型不能出现两次
pub fn validate_config(config: &LoggerConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for sink in &config.sinks {
        if let Some(mode) = sink.mode() {
            if !seen.insert(mode) {
                return Err(XlogError::config(format!(
                    "sink mode '{}' is configured more than once",
                    mode
                )));
            }
        }
    }
    Ok(())
}
