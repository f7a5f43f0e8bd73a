//! 统一错误处理模块
//!
//! 提供桥接层范围内的统一错误类型定义
//!
//! ## 错误类型分层
//!
//! - **引擎层错误** (`EngineError`): 脚本引擎求值/执行失败
//! - **转换层错误** (`ConversionError`): 线格式与本地值之间的转换失败
//! - **桥接层错误** (`BridgeError`): 面向调用者的顶层错误，可以同时承载以上两类
//!
//! Callers that want the legacy "null on failure" behavior go through
//! [`RemoteCallable::invoke_or_null`](crate::dispatch::RemoteCallable::invoke_or_null)
//! instead of matching on these.

use thiserror::Error;

use crate::config::ConfigError;

/// 脚本引擎错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Script error: {message}")]
    Script { message: String },

    #[error("Engine connection lost")]
    Disconnected,

    #[error("Unsupported value of type '{type_name}' returned by the engine")]
    UnsupportedValue { type_name: String },

    #[error("Engine runtime error: {0}")]
    Runtime(String),
}

impl EngineError {
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }
}

/// 值转换错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Malformed reference token: {0:?}")]
    MalformedToken(String),

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },
}

impl ConversionError {
    pub fn mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// 桥接层顶层错误
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Stale reference to handle {handle}: minted in session generation {generation}, current is {current}")]
    StaleReference {
        handle: u32,
        generation: u64,
        current: u64,
    },

    #[error("Bridge is not installed in the script context")]
    NotInstalled,

    #[error("Handle {handle} belongs to a different session")]
    ForeignSession { handle: u32 },

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// 桥接层结果类型别名
pub type BridgeResult<T> = Result<T, BridgeError>;
pub type EngineResult<T> = Result<T, EngineError>;
pub type ConversionResult<T> = Result<T, ConversionError>;
