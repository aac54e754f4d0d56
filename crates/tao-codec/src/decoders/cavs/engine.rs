//! AEC 区间算术解码引擎.
//!
//! 范围与码值均以 (尺度, 8 位余数) 的形式保存. MPS 判决只收窄范围,
//! 不消耗比特; LPS 判决后重新归一化, 从比特源拉入新位.

use log::debug;
use tao_core::{TaoError, TaoResult};
use tao_core::bitreader::BitSource;

use super::context::LG_PMPS_MAX;

/// 旁路判决使用的固定概率状态
pub const BYPASS_LG_PMPS: u32 = 1023;

/// 填充位判决使用的固定概率状态
pub const STUFFING_LG_PMPS: u32 = 4;

/// 可判决的最小概率状态, 更小的值使 LPS 宽度为 0
pub const MIN_LG_PMPS: u32 = 4;

/// 算术解码器寄存器快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AecRegisters {
    /// 范围尺度 (rS1)
    pub range_s: u32,
    /// 范围余数 (rT1), 8 位
    pub range_t: u32,
    /// 码值尺度 (valueS)
    pub value_s: u32,
    /// 码值余数 (valueT), 判决完成后为 8 位
    pub value_t: u32,
}

/// 区间算术解码引擎
///
/// 独占一个比特来源; 不持有任何上下文, 概率由调用方传入.
#[derive(Debug)]
pub struct AecEngine<R> {
    reader: R,
    regs: AecRegisters,
}

impl<R: BitSource> AecEngine<R> {
    /// 从比特来源当前位置初始化引擎
    ///
    /// 先读 9 位, 若最高位为 0 则继续移入新位并累计码值尺度,
    /// 直到第 8 位为 1, 最后截断为低 8 位.
    pub fn new(mut reader: R) -> TaoResult<Self> {
        let start = reader.bits_read();
        let mut value_t = reader.read_bits(9)?;
        let mut value_s = 0u32;
        while (value_t >> 8) & 1 == 0 {
            value_t = (value_t << 1) | reader.read_bit()?;
            value_s += 1;
        }

        let regs = AecRegisters {
            range_s: 0,
            range_t: 0xFF,
            value_s,
            value_t: value_t & 0xFF,
        };
        debug!(
            "CAVS AEC: 引擎初始化, 消耗 {} 位, value_s={}, value_t=0x{:02X}",
            reader.bits_read() - start,
            regs.value_s,
            regs.value_t,
        );
        Ok(Self { reader, regs })
    }

    /// 以给定的预测符号与概率状态判决一个二进制符号
    ///
    /// `lg_pmps` 须在 `MIN_LG_PMPS..=LG_PMPS_MAX` 内, 否则返回
    /// [`TaoError::InvalidArgument`], 寄存器与比特来源保持不变.
    pub fn decision(&mut self, pred_mps: bool, lg_pmps: u32) -> TaoResult<bool> {
        let max = u32::from(LG_PMPS_MAX);
        if !(MIN_LG_PMPS..=max).contains(&lg_pmps) {
            return Err(TaoError::InvalidArgument(format!(
                "lg_pmps 越界: {lg_pmps}, 有效范围 {MIN_LG_PMPS}..={max}"
            )));
        }
        let AecRegisters {
            range_s: rs1,
            range_t: rt1,
            value_s,
            mut value_t,
        } = self.regs;
        let lps = lg_pmps >> 2;

        // 从余数中切出 LPS 宽度, 不够时向尺度借位
        let (rs2, rt2, borrow) = if rt1 >= lps {
            (rs1, rt1 - lps, false)
        } else {
            (rs1 + 1, 256 + rt1 - lps, true)
        };

        if rs2 < value_s || (rs2 == value_s && value_t < rt2) {
            self.regs.range_s = rs2;
            self.regs.range_t = rt2;
            return Ok(pred_mps);
        }

        // LPS 子区间宽度
        let mut t_rlps = lps + if borrow { rt1 } else { 0 };
        debug_assert!(t_rlps > 0);

        if rs2 == value_s {
            value_t -= rt2;
        } else {
            value_t = 256 + ((value_t << 1) | self.reader.read_bit()?) - rt2;
        }

        while t_rlps < 0x100 {
            t_rlps <<= 1;
            value_t = (value_t << 1) | self.reader.read_bit()?;
        }

        let mut value_s = 0;
        while value_t < 0x100 {
            value_s += 1;
            value_t = (value_t << 1) | self.reader.read_bit()?;
        }

        self.regs = AecRegisters {
            range_s: 0,
            range_t: t_rlps & 0xFF,
            value_s,
            value_t: value_t & 0xFF,
        };
        Ok(!pred_mps)
    }

    /// 旁路判决 (固定近似等概率, 不涉及上下文)
    pub fn decode_bypass(&mut self) -> TaoResult<bool> {
        self.decision(false, BYPASS_LG_PMPS)
    }

    /// 解码 aec 填充位, 为 1 表示 slice 数据结束
    pub fn decode_stuffing_bit(&mut self) -> TaoResult<bool> {
        self.decision(false, STUFFING_LG_PMPS)
    }

    /// 当前寄存器快照
    pub fn registers(&self) -> AecRegisters {
        self.regs
    }

    /// 从比特来源已读取的总位数
    pub fn bits_read(&self) -> usize {
        self.reader.bits_read()
    }

    /// 取回比特来源
    pub fn into_inner(self) -> R {
        self.reader
    }
}
