//! 核心模块
//!
//! 包含桥接层的基础设施：
//! - `error` - 错误类型定义
//! - `macros` - `impl_default!` 与 `capability!` 宏

pub mod error;
#[macro_use]
pub mod macros;

// 重新导出错误类型
pub use error::{
    BridgeError, BridgeResult, ConversionError, ConversionResult, EngineError, EngineResult,
};
