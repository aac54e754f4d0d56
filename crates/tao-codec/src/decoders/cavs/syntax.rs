//! ae(v) 语法元素解码.
//!
//! 每个语法元素是一棵小的二值判决树, 上下文下标 = 元素偏移 + 增量.
//! 增量依赖的邻居信息由宏块循环计算后传入.

use bitflags::bitflags;
use log::warn;
use tao_core::{TaoError, TaoResult};

use super::BinDecoder;
use super::context::SyntaxElement;

// ============================================================
// 取值上限
// ============================================================

/// P 帧 mb_type 最大值 (I_8x8)
pub const MAX_MB_TYPE_P: u32 = 4;

/// B 帧 mb_type 最大值 (I_8x8)
pub const MAX_MB_TYPE_B: u32 = 23;

/// intra_luma_pred_mode 截断一元码最大值
pub const MAX_INTRA_LUMA_PRED_MODE: u32 = 4;

/// intra_chroma_pred_mode 截断一元码最大值
pub const MAX_INTRA_CHROMA_PRED_MODE: u32 = 3;

/// mv_diff 指数哥伦布前缀最大长度
pub const MAX_MVD_EG_PREFIX: u32 = 16;

/// mb_qp_delta 一元码最大 bin 数 (|delta| <= 32)
pub const MAX_QP_DELTA_BINS: u32 = 64;

// ============================================================
// 调用方输入
// ============================================================

bitflags! {
    /// 左侧 (A) / 上方 (B) 邻居宏块是否满足某语法元素的上下文条件
    ///
    /// 条件本身 (可用且非跳过, 参考索引大于 0 等) 由调用方判断.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NeighborFlags: u8 {
        /// 左侧宏块满足条件
        const LEFT = 1 << 0;
        /// 上方宏块满足条件
        const TOP  = 1 << 1;
    }
}

impl NeighborFlags {
    /// 由两个条件构造
    pub fn from_conditions(left: bool, top: bool) -> Self {
        let mut flags = Self::empty();
        flags.set(Self::LEFT, left);
        flags.set(Self::TOP, top);
        flags
    }

    /// 增量 a + b
    pub fn sum(self) -> usize {
        usize::from(self.contains(Self::LEFT)) + usize::from(self.contains(Self::TOP))
    }

    /// 增量 a + 2b
    pub fn weighted(self) -> usize {
        usize::from(self.bits())
    }
}

/// slice 类型 (决定 mb_type 的二值化)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliceKind {
    P,
    B,
}

/// 色度格式 (4:2:2 时 cbp 额外携带 2 位)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChromaFormat {
    #[default]
    Yuv420,
    Yuv422,
}

/// 运动矢量差
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Mvd {
    pub x: i32,
    pub y: i32,
}

// ============================================================
// 通用二值化
// ============================================================

pub(super) fn syntax_out_of_range(element: &'static str, value: u32, limit: u32) -> TaoError {
    warn!(
        "CAVS AEC: 语法元素越界, element={}, value={}, limit={}",
        element, value, limit
    );
    TaoError::SyntaxOutOfRange {
        element,
        value,
        limit,
    }
}

/// 一元码: 从 `start` 开始计数, 每遇到一个非 `stop` 的 bin 加一.
///
/// `ctx_of_bin` 接收 bin 下标 (从 `start` 起), 返回上下文下标.
/// 计数超过 `limit` 时立即报错, 不再读取后续 bin.
pub(super) fn decode_unary<D: BinDecoder>(
    dec: &mut D,
    element: SyntaxElement,
    stop: bool,
    start: u32,
    limit: u32,
    ctx_of_bin: impl Fn(u32) -> usize,
) -> TaoResult<u32> {
    let mut count = start;
    while dec.decode_symbol(ctx_of_bin(count))? != stop {
        count += 1;
        if count > limit {
            return Err(syntax_out_of_range(element.name(), count, limit));
        }
    }
    Ok(count)
}

/// 截断一元码: 计数到 `max` 时不再读取终止 bin
fn decode_truncated_unary<D: BinDecoder>(
    dec: &mut D,
    stop: bool,
    max: u32,
    ctx_of_bin: impl Fn(u32) -> usize,
) -> TaoResult<u32> {
    let mut count = 0;
    while count < max && dec.decode_symbol(ctx_of_bin(count))? != stop {
        count += 1;
    }
    Ok(count)
}

// ============================================================
// 宏块层语法元素
// ============================================================

/// 解码 mb_skip_run
///
/// `max_run` 为当前位置到 slice 末尾剩余的宏块数.
pub fn decode_mb_skip_run<D: BinDecoder>(dec: &mut D, max_run: u32) -> TaoResult<u32> {
    let base = SyntaxElement::MbSkipRun.ctx_offset();
    decode_unary(dec, SyntaxElement::MbSkipRun, true, 0, max_run, |bin| {
        base + bin.min(3) as usize
    })
}

/// 按 slice 类型解码 mb_type
pub fn decode_mb_type<D: BinDecoder>(
    dec: &mut D,
    kind: SliceKind,
    neighbors: NeighborFlags,
) -> TaoResult<u32> {
    match kind {
        SliceKind::P => decode_mb_type_p(dec),
        SliceKind::B => decode_mb_type_b(dec, neighbors),
    }
}

/// 解码 P 帧 mb_type
pub fn decode_mb_type_p<D: BinDecoder>(dec: &mut D) -> TaoResult<u32> {
    let base = SyntaxElement::MbType.ctx_offset();
    decode_unary(dec, SyntaxElement::MbType, true, 0, MAX_MB_TYPE_P, |bin| {
        base + bin.min(4) as usize
    })
}

/// 解码 B 帧 mb_type
///
/// `neighbors`: 邻居可用且不是 P_Skip/B_Skip/B_Direct_16x16.
pub fn decode_mb_type_b<D: BinDecoder>(dec: &mut D, neighbors: NeighborFlags) -> TaoResult<u32> {
    let base = SyntaxElement::MbType.ctx_offset();
    if !dec.decode_symbol(base + neighbors.sum())? {
        return Ok(0);
    }
    decode_unary(dec, SyntaxElement::MbType, true, 1, MAX_MB_TYPE_B, |bin| {
        base + 8 + (bin - 1).min(6) as usize
    })
}

/// 解码 mb_part_type (B_8x8 子块预测方式, 0..=3)
pub fn decode_mb_part_type<D: BinDecoder>(dec: &mut D) -> TaoResult<u32> {
    let base = SyntaxElement::MbPartType.ctx_offset();
    let b0 = dec.decode_symbol(base)?;
    let b1 = dec.decode_symbol(base + 1 + usize::from(b0))?;
    Ok((u32::from(b0) << 1) | u32::from(b1))
}

/// 解码 intra_luma_pred_mode
///
/// 0 表示使用预测模式, 1..=4 对应余下的 4 种模式.
pub fn decode_intra_luma_pred_mode<D: BinDecoder>(dec: &mut D) -> TaoResult<u32> {
    let base = SyntaxElement::IntraLumaPredMode.ctx_offset();
    decode_truncated_unary(dec, true, MAX_INTRA_LUMA_PRED_MODE, |bin| base + bin as usize)
}

/// 解码 intra_chroma_pred_mode
///
/// `neighbors`: 邻居可用且色度预测模式不是 DC.
pub fn decode_intra_chroma_pred_mode<D: BinDecoder>(
    dec: &mut D,
    neighbors: NeighborFlags,
) -> TaoResult<u32> {
    let base = SyntaxElement::IntraChromaPredMode.ctx_offset();
    let first = base + neighbors.sum();
    decode_truncated_unary(dec, false, MAX_INTRA_CHROMA_PRED_MODE, |bin| {
        if bin == 0 { first } else { base + 3 }
    })
}

/// 解码 mb_reference_index
///
/// `neighbors`: 邻居参考索引大于 0. `max_ref_idx` 为当前 slice 允许的最大参考索引,
/// 为 0 时不读取任何 bin.
pub fn decode_mb_reference_index<D: BinDecoder>(
    dec: &mut D,
    neighbors: NeighborFlags,
    max_ref_idx: u32,
) -> TaoResult<u32> {
    let base = SyntaxElement::MbReferenceIndex.ctx_offset();
    let first = base + neighbors.weighted();
    decode_truncated_unary(dec, false, max_ref_idx, |bin| match bin {
        0 => first,
        1 => base + 4,
        _ => base + 5,
    })
}

/// 由左/上邻居 mv_diff 分量绝对值之和计算首个 bin 的上下文增量
pub fn mvd_ctx_inc(abs_sum: u32) -> usize {
    if abs_sum < 2 {
        0
    } else if abs_sum < 16 {
        1
    } else {
        2
    }
}

/// 解码一个 mv_diff 分量
///
/// `element` 取 [`SyntaxElement::MvDiffX`] 或 [`SyntaxElement::MvDiffY`].
pub fn decode_mv_diff<D: BinDecoder>(
    dec: &mut D,
    element: SyntaxElement,
    ctx_inc: usize,
) -> TaoResult<i32> {
    debug_assert!(matches!(
        element,
        SyntaxElement::MvDiffX | SyntaxElement::MvDiffY
    ));
    let base = element.ctx_offset();
    if !dec.decode_symbol(base + ctx_inc.min(2))? {
        return Ok(0);
    }

    let magnitude = if !dec.decode_symbol(base + 3)? {
        1
    } else if !dec.decode_symbol(base + 4)? {
        2
    } else {
        let parity = u32::from(dec.decode_symbol(base + 5)?);
        // 0 阶指数哥伦布后缀, 全部为旁路 bin
        let mut lzb = 0u32;
        while !dec.decode_bypass()? {
            lzb += 1;
            if lzb > MAX_MVD_EG_PREFIX {
                return Err(syntax_out_of_range(element.name(), lzb, MAX_MVD_EG_PREFIX));
            }
        }
        let suffix = dec.decode_bypass_bits(lzb)?;
        3 + parity + 2 * ((1 << lzb) - 1 + suffix)
    };

    let magnitude = magnitude as i32;
    if dec.decode_bypass()? {
        Ok(-magnitude)
    } else {
        Ok(magnitude)
    }
}

/// 依次解码水平与垂直分量
pub fn decode_mvd<D: BinDecoder>(dec: &mut D, inc_x: usize, inc_y: usize) -> TaoResult<Mvd> {
    let x = decode_mv_diff(dec, SyntaxElement::MvDiffX, inc_x)?;
    let y = decode_mv_diff(dec, SyntaxElement::MvDiffY, inc_y)?;
    Ok(Mvd { x, y })
}

fn cbp_bit(cbp: Option<u32>, b8: u32) -> bool {
    cbp.is_some_and(|v| (v >> b8) & 1 != 0)
}

/// 解码 cbp
///
/// `left_cbp` / `top_cbp` 为邻居宏块的 cbp, 不可用时为 `None`.
/// 低 4 位为亮度 8x8 块 (光栅序), 16/32/48 为色度, 4:2:2 时第 6,7 位为附加色度块.
pub fn decode_cbp<D: BinDecoder>(
    dec: &mut D,
    left_cbp: Option<u32>,
    top_cbp: Option<u32>,
    chroma_format: ChromaFormat,
) -> TaoResult<u32> {
    let base = SyntaxElement::Cbp.ctx_offset();
    let mut cbp = 0u32;

    for b8 in 0..4u32 {
        let cur = |bit: u32| (cbp >> bit) & 1 != 0;
        let (a, b) = match b8 {
            0 => (cbp_bit(left_cbp, 1), cbp_bit(top_cbp, 2)),
            1 => (cur(0), cbp_bit(top_cbp, 3)),
            2 => (cbp_bit(left_cbp, 3), cur(0)),
            _ => (cur(2), cur(1)),
        };
        let inc = NeighborFlags::from_conditions(a, b).weighted();
        if dec.decode_symbol(base + inc)? {
            cbp |= 1 << b8;
        }
    }

    if dec.decode_symbol(base + 4)? {
        cbp |= if dec.decode_symbol(base + 5)? {
            48
        } else if dec.decode_symbol(base + 5)? {
            32
        } else {
            16
        };
    }

    if chroma_format == ChromaFormat::Yuv422 {
        cbp |= dec.decode_bypass_bits(2)? << 6;
    }
    Ok(cbp)
}

/// 解码 mb_qp_delta
///
/// `prev_nonzero`: 解码顺序中上一个宏块的 mb_qp_delta 非零.
pub fn decode_mb_qp_delta<D: BinDecoder>(dec: &mut D, prev_nonzero: bool) -> TaoResult<i32> {
    let base = SyntaxElement::MbQpDelta.ctx_offset();
    let first = base + usize::from(prev_nonzero);
    let val = decode_unary(
        dec,
        SyntaxElement::MbQpDelta,
        false,
        0,
        MAX_QP_DELTA_BINS,
        |bin| match bin {
            0 => first,
            1 => base + 2,
            _ => base + 3,
        },
    )?;

    Ok(match val {
        0 => 0,
        v if v & 1 == 1 => v.div_ceil(2) as i32,
        v => -((v / 2) as i32),
    })
}

/// 解码宏块级 weighting_prediction 标志
pub fn decode_weighting_prediction<D: BinDecoder>(dec: &mut D) -> TaoResult<bool> {
    dec.decode_symbol(SyntaxElement::WeightingPrediction.ctx_offset())
}
