//! # tao-core
//!
//! Tao 多媒体框架核心库, 提供错误类型与比特流读取工具.

pub mod bitreader;
pub mod error;

// 重导出常用类型
pub use error::{TaoError, TaoResult};
