//! 统一错误类型定义.
//!
//! 所有 Tao crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Tao 框架统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数 (调用方误用)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 码流已耗尽, 请求的位数超出缓冲区
    #[error("已到达流末尾")]
    Eof,

    /// 语法元素取值超过标准规定的上限
    ///
    /// 通常意味着码流损坏或不符合标准. 调用方可选择丢弃整个 slice 或尽力继续.
    #[error("语法元素越界: {element}={value}, 上限 {limit}")]
    SyntaxOutOfRange {
        /// 语法元素名称
        element: &'static str,
        /// 已解码 (或已累计) 的取值
        value: u32,
        /// 允许的最大取值
        limit: u32,
    },

    /// I/O 错误 (读取码流文件等)
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl TaoError {
    /// 是否为码流耗尽错误
    pub fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }

    /// 是否为语法元素越界错误
    pub fn is_syntax_out_of_range(&self) -> bool {
        matches!(self, Self::SyntaxOutOfRange { .. })
    }
}

/// Tao 框架统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
