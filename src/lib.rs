//! # Tao CAVS
//!
//! 纯 Rust 实现的 AVS+ (AVS1-P16 广播档次) ae(v) 上下文自适应算术解码.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use tao_cavs::codec::{AecDecoder, BinDecoder};
//! use tao_cavs::codec::decoders::cavs::{NeighborFlags, SliceKind, decode_mb_type};
//! use tao_cavs::core::bitreader::BitReader;
//!
//! # fn main() -> tao_cavs::core::TaoResult<()> {
//! let slice_data = std::fs::read("slice.bin")?;
//! let mut dec = AecDecoder::from_slice_data(BitReader::new(&slice_data))?;
//! let mb_type = decode_mb_type(&mut dec, SliceKind::P, NeighborFlags::LEFT)?;
//! println!("mb_type={mb_type}");
//! # Ok(())
//! # }
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型与比特读取 |
//! | `tao-codec` | ae(v) 算术解码引擎与语法元素解码 |

/// 核心类型与工具
pub use tao_core as core;

/// ae(v) 熵解码
pub use tao_codec as codec;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
