//! AVS+ (AVS1-P16 广播档次) ae(v) 上下文自适应算术解码.
//!
//! 包含区间算术解码引擎, 323 项自适应概率上下文,
//! 各语法元素的二值化解码以及变换系数 (level, run) 解码.
//!
//! 宏块循环, 邻居可用性与运动矢量预测不在本模块内, 由调用方以整数/标志形式传入.
//! 一个 [`AecDecoder`] 对应一个 slice 的解码会话, 不可在线程间共享.
//!
//! ```no_run
//! use tao_codec::decoders::cavs::{AecDecoder, BinDecoder, decode_mb_skip_run};
//! use tao_core::bitreader::BitReader;
//!
//! # fn main() -> tao_core::TaoResult<()> {
//! let slice_data = [0xA5u8; 32];
//! let mut dec = AecDecoder::from_slice_data(BitReader::new(&slice_data))?;
//! let skip_run = decode_mb_skip_run(&mut dec, 396)?;
//! let sign = dec.decode_bypass()?;
//! println!("skip_run={skip_run}, sign={sign}");
//! # Ok(())
//! # }
//! ```

mod context;
mod engine;
mod residual;
mod syntax;
#[cfg(test)]
mod tests;

use tao_core::TaoResult;
use tao_core::bitreader::{BitReader, BitSource};

pub use context::{AE_CTX_COUNT, AecContext, ContextBank, LG_PMPS_MAX, SyntaxElement};
pub use engine::{AecEngine, AecRegisters, MIN_LG_PMPS};
pub use residual::{
    CoeffPlane, CoeffScanState, MAX_COEFF_LEVEL, RunLevel, decode_coeff_block,
};
pub use syntax::{
    ChromaFormat, Mvd, NeighborFlags, SliceKind, decode_cbp, decode_intra_chroma_pred_mode,
    decode_intra_luma_pred_mode, decode_mb_part_type, decode_mb_qp_delta,
    decode_mb_reference_index, decode_mb_skip_run, decode_mb_type, decode_mb_type_b,
    decode_mb_type_p, decode_mv_diff, decode_mvd, decode_weighting_prediction, mvd_ctx_inc,
};

// ============================================================
// 二进制符号解码接口
// ============================================================

/// 语法元素解码所需的二进制符号来源
///
/// 上下文以全局下标寻址 (语法元素偏移 + 增量).
pub trait BinDecoder {
    /// 使用单个自适应上下文判决, 并更新该上下文
    fn decode_symbol(&mut self, ctx_idx: usize) -> TaoResult<bool>;

    /// 使用两个上下文的加权概率判决, 并用同一结果更新两者
    fn decode_symbol_weighted(&mut self, ctx_a: usize, ctx_b: usize) -> TaoResult<bool>;

    /// 旁路判决
    fn decode_bypass(&mut self) -> TaoResult<bool>;

    /// 连续解码 N 个旁路位, 先解出的位位于高位
    fn decode_bypass_bits(&mut self, n: u32) -> TaoResult<u32> {
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | u32::from(self.decode_bypass()?);
        }
        Ok(value)
    }
}

// ============================================================
// 解码会话
// ============================================================

/// 一个 slice 的 ae(v) 解码会话: 算术引擎 + 上下文表
#[derive(Debug)]
pub struct AecDecoder<R> {
    engine: AecEngine<R>,
    contexts: ContextBank,
}

impl<R: BitSource> AecDecoder<R> {
    /// 从比特来源当前位置开始算术解码, 上下文全部复位
    pub fn new(reader: R) -> TaoResult<Self> {
        Ok(Self {
            engine: AecEngine::new(reader)?,
            contexts: ContextBank::new(),
        })
    }

    /// 解码 aec 填充位 (slice 结束标志)
    pub fn decode_stuffing_bit(&mut self) -> TaoResult<bool> {
        self.engine.decode_stuffing_bit()
    }

    /// 上下文表
    pub fn contexts(&self) -> &ContextBank {
        &self.contexts
    }

    /// 算术引擎
    pub fn engine(&self) -> &AecEngine<R> {
        &self.engine
    }

    /// 当前寄存器快照
    pub fn registers(&self) -> AecRegisters {
        self.engine.registers()
    }

    /// 取回比特来源
    pub fn into_inner(self) -> R {
        self.engine.into_inner()
    }
}

impl<'a> AecDecoder<BitReader<'a>> {
    /// 从 slice 头之后的位置开始: 先跳过 aec 字节对齐位, 再初始化引擎
    pub fn from_slice_data(mut reader: BitReader<'a>) -> TaoResult<Self> {
        let skipped = reader.align_to_byte();
        if skipped > 0 {
            log::trace!("CAVS AEC: 跳过 {} 个字节对齐位", skipped);
        }
        Self::new(reader)
    }
}

impl<R: BitSource> BinDecoder for AecDecoder<R> {
    fn decode_symbol(&mut self, ctx_idx: usize) -> TaoResult<bool> {
        let ctx = &mut self.contexts[ctx_idx];
        let bin = self.engine.decision(ctx.mps, u32::from(ctx.lg_pmps))?;
        ctx.update(bin);
        Ok(bin)
    }

    fn decode_symbol_weighted(&mut self, ctx_a: usize, ctx_b: usize) -> TaoResult<bool> {
        let (a, b) = self.contexts.pair_mut(ctx_a, ctx_b);
        let (pred_mps, lg_pmps) = context::weighted_prediction(a, b);
        let bin = self.engine.decision(pred_mps, lg_pmps)?;
        a.update(bin);
        b.update(bin);
        Ok(bin)
    }

    fn decode_bypass(&mut self) -> TaoResult<bool> {
        self.engine.decode_bypass()
    }
}
