//! 比特流读取器.
//!
//! 提供从字节缓冲区中按位读取数据的能力, 是熵解码引擎的位来源.
//!
//! 按大端位序读取 (MSB first), 这是多媒体编解码器中最常用的位序.

use crate::{TaoError, TaoResult};

/// 原始比特来源
///
/// 熵解码引擎只通过这一接口拉取原始位, 不关心底层缓冲区.
/// 越过缓冲区末尾读取时必须返回 [`TaoError::Eof`].
pub trait BitSource {
    /// 读取 1 个位
    fn read_bit(&mut self) -> TaoResult<u32>;

    /// 读取 N 个位 (最多 32 位), 先读到的位位于高位
    fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        let mut value = 0u32;
        for _ in 0..n {
            value = (value << 1) | self.read_bit()?;
        }
        Ok(value)
    }

    /// 已读取的总位数
    fn bits_read(&self) -> usize;
}

/// 比特流读取器
///
/// 从字节缓冲区中按位读取数据, 使用大端位序 (MSB first).
///
/// # 示例
/// ```
/// use tao_core::bitreader::{BitReader, BitSource};
///
/// let data = [0b1011_0001, 0b0101_0101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.read_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(8).unwrap(), 0b0101_0101);
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    data: &'a [u8],
    /// 下一个待读位的绝对位置
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取剩余可读位数
    pub fn bits_left(&self) -> usize {
        (self.data.len() * 8).saturating_sub(self.pos)
    }

    /// 是否已到达末尾
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    /// 当前是否位于字节边界
    pub fn is_byte_aligned(&self) -> bool {
        self.pos % 8 == 0
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> TaoResult<()> {
        if n > self.bits_left() {
            return Err(TaoError::Eof);
        }
        self.pos += n;
        Ok(())
    }

    /// 对齐到下一个字节边界, 返回跳过的位数
    ///
    /// 如果当前已在字节边界, 则不做任何事.
    pub fn align_to_byte(&mut self) -> usize {
        let skipped = (8 - self.pos % 8) % 8;
        self.pos = (self.pos + skipped).min(self.data.len() * 8);
        skipped
    }
}

impl BitSource for BitReader<'_> {
    fn read_bit(&mut self) -> TaoResult<u32> {
        let byte = *self.data.get(self.pos >> 3).ok_or(TaoError::Eof)?;
        let bit = (byte >> (7 - (self.pos & 7))) & 1;
        self.pos += 1;
        Ok(u32::from(bit))
    }

    fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "read_bits: n={} 超过 32 位",
                n,
            )));
        }
        if n as usize > self.bits_left() {
            return Err(TaoError::Eof);
        }

        // 按字节块提取, 每轮最多取到当前字节末尾
        let mut result = 0u32;
        let mut remaining = n;
        while remaining > 0 {
            let offset = (self.pos & 7) as u32;
            let take = remaining.min(8 - offset);
            let byte = u32::from(self.data[self.pos >> 3]);
            let bits = (byte >> (8 - offset - take)) & ((1 << take) - 1);
            result = (result << take) | bits;
            self.pos += take as usize;
            remaining -= take;
        }
        Ok(result)
    }

    fn bits_read(&self) -> usize {
        self.pos
    }
}
