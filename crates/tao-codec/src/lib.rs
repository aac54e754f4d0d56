//! # tao-codec
//!
//! Tao 多媒体框架编解码器库, 提供 AVS+ (AVS1-P16 广播档次) 的 ae(v) 熵解码.
//!
//! 本 crate 只负责把 slice 数据中的算术编码比特还原为语法元素值,
//! 宏块重建与图像输出由上层完成.
//!
//! ## 使用示例
//!
//! ```rust
//! use tao_codec::{AecDecoder, BinDecoder};
//! use tao_codec::decoders::cavs::{CoeffPlane, decode_coeff_block};
//! use tao_core::bitreader::BitReader;
//!
//! # fn main() -> tao_core::TaoResult<()> {
//! let data = [0x5Au8; 64];
//! let mut dec = AecDecoder::new(BitReader::new(&data))?;
//! let mut pairs = Vec::new();
//! match decode_coeff_block(&mut dec, CoeffPlane::FrameLuma, &mut pairs) {
//!     Ok(state) => println!("{} 个系数, 结束位置 {}", pairs.len(), state.position),
//!     Err(err) => println!("系数块解码失败: {err}"),
//! }
//! let sign = dec.decode_bypass()?;
//! println!("sign={sign}");
//! # Ok(())
//! # }
//! ```

pub mod decoders;

// 重导出常用类型
pub use decoders::cavs::{AecDecoder, BinDecoder};
