//! AEC 自适应概率上下文.
//!
//! 每个上下文记录当前大概率符号 (MPS), 11 位概率状态 `lg_pmps`
//! 以及决定学习速率的 `cycno` 计数器.

use std::ops::{Index, IndexMut};

// ============================================================
// 上下文常量
// ============================================================

/// 上下文总数
pub const AE_CTX_COUNT: usize = 323;

/// 概率状态上限 (11 位表示的 "距离 50/50" 刻度)
pub const LG_PMPS_MAX: u16 = 1023;

/// LPS 事件时按学习速率累加的增量, 仅下标 3..=5 可达
const LG_PMPS_LPS_INC: [u16; 6] = [46, 46, 46, 197, 95, 46];

// ============================================================
// 语法元素上下文偏移
// ============================================================

/// 使用上下文的语法元素类别
///
/// 每个类别在 323 项上下文表中占据一段互不重叠的区间.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntaxElement {
    MbSkipRun,
    MbType,
    MbPartType,
    IntraLumaPredMode,
    IntraChromaPredMode,
    MbReferenceIndex,
    MvDiffX,
    MvDiffY,
    Cbp,
    MbQpDelta,
    FrameLuma,
    FrameChroma,
    FieldLuma,
    FieldChroma,
    WeightingPrediction,
}

impl SyntaxElement {
    /// 全部类别, 按上下文偏移升序
    pub const ALL: [SyntaxElement; 15] = [
        Self::MbSkipRun,
        Self::MbType,
        Self::MbPartType,
        Self::IntraLumaPredMode,
        Self::IntraChromaPredMode,
        Self::MbReferenceIndex,
        Self::MvDiffX,
        Self::MvDiffY,
        Self::Cbp,
        Self::MbQpDelta,
        Self::FrameLuma,
        Self::FrameChroma,
        Self::FieldLuma,
        Self::FieldChroma,
        Self::WeightingPrediction,
    ];

    /// 该类别在上下文表中的起始下标
    pub const fn ctx_offset(self) -> usize {
        match self {
            Self::MbSkipRun => 0,
            Self::MbType => 4,
            Self::MbPartType => 19,
            Self::IntraLumaPredMode => 22,
            Self::IntraChromaPredMode => 26,
            Self::MbReferenceIndex => 30,
            Self::MvDiffX => 36,
            Self::MvDiffY => 42,
            Self::Cbp => 48,
            Self::MbQpDelta => 54,
            Self::FrameLuma => 58,
            Self::FrameChroma => 124,
            Self::FieldLuma => 190,
            Self::FieldChroma => 256,
            Self::WeightingPrediction => 322,
        }
    }

    /// 该类别占用的上下文数量
    pub const fn ctx_count(self) -> usize {
        match self {
            Self::MbSkipRun => 4,
            Self::MbType => 15,
            Self::MbPartType => 3,
            Self::IntraLumaPredMode
            | Self::IntraChromaPredMode
            | Self::MbQpDelta => 4,
            Self::MbReferenceIndex | Self::MvDiffX | Self::MvDiffY | Self::Cbp => 6,
            Self::FrameLuma | Self::FrameChroma | Self::FieldLuma | Self::FieldChroma => 66,
            Self::WeightingPrediction => 1,
        }
    }

    /// 语法元素名称 (用于日志与错误信息)
    pub const fn name(self) -> &'static str {
        match self {
            Self::MbSkipRun => "mb_skip_run",
            Self::MbType => "mb_type",
            Self::MbPartType => "mb_part_type",
            Self::IntraLumaPredMode => "intra_luma_pred_mode",
            Self::IntraChromaPredMode => "intra_chroma_pred_mode",
            Self::MbReferenceIndex => "mb_reference_index",
            Self::MvDiffX => "mv_diff_x",
            Self::MvDiffY => "mv_diff_y",
            Self::Cbp => "cbp",
            Self::MbQpDelta => "mb_qp_delta",
            Self::FrameLuma => "trans_coefficient(frame_luma)",
            Self::FrameChroma => "trans_coefficient(frame_chroma)",
            Self::FieldLuma => "trans_coefficient(field_luma)",
            Self::FieldChroma => "trans_coefficient(field_chroma)",
            Self::WeightingPrediction => "weighting_prediction",
        }
    }
}

// ============================================================
// 单个上下文
// ============================================================

/// 自适应概率上下文
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AecContext {
    /// 大概率符号
    pub mps: bool,
    /// 学习速率周期计数 (0..=3)
    pub cycno: u8,
    /// LPS 概率状态 (0..=1023), 越小越偏向 MPS
    pub lg_pmps: u16,
}

impl Default for AecContext {
    fn default() -> Self {
        Self {
            mps: false,
            cycno: 0,
            lg_pmps: LG_PMPS_MAX,
        }
    }
}

impl AecContext {
    /// 按已判决的二进制符号更新上下文
    pub fn update(&mut self, bin: bool) {
        let cwr: u32 = match self.cycno {
            0 | 1 => 3,
            2 => 4,
            _ => 5,
        };

        if bin != self.mps {
            self.cycno = (self.cycno + 1).min(3);
        } else if self.cycno == 0 {
            self.cycno = 1;
        }

        if bin == self.mps {
            let p = self.lg_pmps;
            self.lg_pmps = p - (p >> cwr) - (p >> (cwr + 2));
        } else {
            self.lg_pmps += LG_PMPS_LPS_INC[cwr as usize];
            // 越过 50/50, 大概率符号翻转
            if self.lg_pmps > LG_PMPS_MAX {
                self.lg_pmps = 2047 - self.lg_pmps;
                self.mps = !self.mps;
            }
        }

        debug_assert!(self.lg_pmps <= LG_PMPS_MAX);
        debug_assert!(self.cycno <= 3);
    }
}

/// 双上下文加权预测, 返回 (预测符号, lg_pmps)
///
/// 两者 MPS 一致时取平均概率; 不一致时取更确定 (lg_pmps 更小) 的一方的 MPS.
pub fn weighted_prediction(a: &AecContext, b: &AecContext) -> (bool, u32) {
    let (pa, pb) = (u32::from(a.lg_pmps), u32::from(b.lg_pmps));
    if a.mps == b.mps {
        return (a.mps, (pa + pb) / 2);
    }
    if pa < pb {
        (a.mps, 1023 - ((pb - pa) >> 1))
    } else {
        (b.mps, 1023 - ((pa - pb) >> 1))
    }
}

// ============================================================
// 上下文表
// ============================================================

/// 一个解码会话独占的上下文表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextBank {
    states: [AecContext; AE_CTX_COUNT],
}

impl Default for ContextBank {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextBank {
    /// 创建已复位的上下文表
    pub fn new() -> Self {
        Self {
            states: [AecContext::default(); AE_CTX_COUNT],
        }
    }

    /// 整表复位为 {mps=0, cycno=0, lg_pmps=1023}
    pub fn reset(&mut self) {
        self.states.fill(AecContext::default());
    }

    /// 同时可变借用两个不同的上下文
    pub fn pair_mut(&mut self, a: usize, b: usize) -> (&mut AecContext, &mut AecContext) {
        assert_ne!(a, b, "加权判决需要两个不同的上下文");
        if a < b {
            let (lo, hi) = self.states.split_at_mut(b);
            (&mut lo[a], &mut hi[0])
        } else {
            let (lo, hi) = self.states.split_at_mut(a);
            (&mut hi[0], &mut lo[b])
        }
    }

    /// 按全局下标顺序遍历全部上下文
    pub fn iter(&self) -> impl Iterator<Item = &AecContext> {
        self.states.iter()
    }

    /// 某个语法元素类别所占的上下文切片
    pub fn element(&self, element: SyntaxElement) -> &[AecContext] {
        let start = element.ctx_offset();
        &self.states[start..start + element.ctx_count()]
    }
}

impl Index<usize> for ContextBank {
    type Output = AecContext;

    fn index(&self, idx: usize) -> &AecContext {
        &self.states[idx]
    }
}

impl IndexMut<usize> for ContextBank {
    fn index_mut(&mut self, idx: usize) -> &mut AecContext {
        &mut self.states[idx]
    }
}
