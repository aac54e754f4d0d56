//! 变换系数 (level, run) 解码.
//!
//! 一个 8x8 块按扫描顺序解出若干 (level, run) 对, 以 EOB 结束.
//! 上下文选择依赖块内已解出的最大幅值 (primary index) 与当前扫描位置.

use log::trace;
use tao_core::TaoResult;

use super::BinDecoder;
use super::context::SyntaxElement;
use super::syntax::decode_unary;

/// 系数幅值上限
pub const MAX_COEFF_LEVEL: u32 = 2048;

/// 8x8 块扫描位置数
const SCAN_POSITIONS: u32 = 64;

/// 同一 primary index 下 level 上下文组的跨度
const LEVEL_CTX_STRIDE: usize = 3;

/// EOB 位置相关上下文相对平面基址的偏移
const EOB_POS_CTX_OFFSET: usize = 14;

/// run 上下文相对平面基址的偏移
const RUN_CTX_OFFSET: usize = 46;

// ============================================================
// 系数平面
// ============================================================

/// 系数上下文组 (帧/场 x 亮度/色度)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoeffPlane {
    FrameLuma,
    FrameChroma,
    FieldLuma,
    FieldChroma,
}

impl CoeffPlane {
    /// 由图像结构与分量类型选择上下文组
    pub fn from_picture(field_coding: bool, chroma: bool) -> Self {
        match (field_coding, chroma) {
            (false, false) => Self::FrameLuma,
            (false, true) => Self::FrameChroma,
            (true, false) => Self::FieldLuma,
            (true, true) => Self::FieldChroma,
        }
    }

    /// 对应的语法元素类别
    pub const fn element(self) -> SyntaxElement {
        match self {
            Self::FrameLuma => SyntaxElement::FrameLuma,
            Self::FrameChroma => SyntaxElement::FrameChroma,
            Self::FieldLuma => SyntaxElement::FieldLuma,
            Self::FieldChroma => SyntaxElement::FieldChroma,
        }
    }

    /// 上下文基址
    pub const fn ctx_base(self) -> usize {
        self.element().ctx_offset()
    }
}

// ============================================================
// 扫描状态
// ============================================================

/// 一个 (level, run) 对, level 带符号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLevel {
    pub level: i32,
    pub run: u32,
}

/// 单个变换块的扫描状态, 块结束即丢弃
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoeffScanState {
    /// 下一个系数的扫描位置
    pub position: u32,
    /// 已解出的最大幅值
    pub max_level: u32,
    /// primary index (0..=4)
    pub primary_index: u32,
    /// 最近一个系数的幅值
    pub level: u32,
}

impl CoeffScanState {
    /// 由最大幅值推导 primary index: 1,2,3 原样, 4 归入 3, 5 及以上为 4
    pub fn primary_index_for(max_level: u32) -> u32 {
        match max_level {
            0..=3 => max_level,
            4 => 3,
            _ => 4,
        }
    }

    fn pri(&self) -> usize {
        self.primary_index as usize
    }

    /// EOB 的两个上下文: 幅值相关 + 位置相关
    fn eob_contexts(&self, base: usize) -> (usize, usize) {
        let pos = self.position as usize;
        let amplitude = base + self.pri() * LEVEL_CTX_STRIDE - 1;
        let spatial = base + EOB_POS_CTX_OFFSET + 16 * (pos >> 5) + ((pos >> 1) & 0xF);
        (amplitude, spatial)
    }

    fn level_ctx(&self, base: usize) -> usize {
        base + self.pri() * LEVEL_CTX_STRIDE
    }

    fn run_ctx(&self, base: usize) -> usize {
        base + RUN_CTX_OFFSET + self.pri() * 4 + if self.level > 1 { 2 } else { 0 }
    }

    fn advance(&mut self, level: u32, run: u32) {
        self.max_level = self.max_level.max(level);
        self.primary_index = Self::primary_index_for(self.max_level);
        self.position += run + 1;
        debug_assert!(self.primary_index <= 4);
    }
}

// ============================================================
// 块解码
// ============================================================

/// 解码一个变换块的全部 (level, run) 对
///
/// `out` 先被清空, 再按解码顺序写入. 返回块结束时的扫描状态.
/// 扫描位置到达 64 时块已满, 不再读取 EOB.
pub fn decode_coeff_block<D: BinDecoder>(
    dec: &mut D,
    plane: CoeffPlane,
    out: &mut Vec<RunLevel>,
) -> TaoResult<CoeffScanState> {
    out.clear();
    let element = plane.element();
    let base = plane.ctx_base();
    let mut state = CoeffScanState::default();

    while state.position < SCAN_POSITIONS {
        if state.max_level > 0 {
            let (ctx_a, ctx_b) = state.eob_contexts(base);
            if dec.decode_symbol_weighted(ctx_a, ctx_b)? {
                break;
            }
        }

        let level_ctx = state.level_ctx(base);
        let level = decode_unary(dec, element, true, 1, MAX_COEFF_LEVEL, |bin| {
            level_ctx + usize::from(bin > 1)
        })?;
        let negative = dec.decode_bypass()?;
        state.level = level;

        let run_ctx = state.run_ctx(base);
        let max_run = SCAN_POSITIONS - 1 - state.position;
        let run = decode_unary(dec, element, true, 0, max_run, |bin| {
            run_ctx + usize::from(bin > 0)
        })?;

        let level_i = level as i32;
        out.push(RunLevel {
            level: if negative { -level_i } else { level_i },
            run,
        });
        state.advance(level, run);
    }

    trace!(
        "CAVS AEC: 系数块结束, plane={:?}, pairs={}, position={}, primary_index={}",
        plane,
        out.len(),
        state.position,
        state.primary_index
    );
    Ok(state)
}
