/// 头部流的字节游标
///
/// 小端读取，越界返回 `DecodeError::Truncated`。相对偏移字段的目标是
/// “读取该字段时的游标位置 + 存储的有符号值”。

use crate::core::error::DecodeError;

pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 跳转到绝对位置（允许等于末尾）
    pub fn seek(&mut self, pos: usize) -> Result<(), DecodeError> {
        if pos > self.bytes.len() {
            return Err(DecodeError::Truncated {
                offset: pos as u64,
                needed: 0,
                available: self.bytes.len() as u64,
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
        self.seek(self.pos + count)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos.checked_add(count).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => {
                let slice = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(slice)
            }
            None => Err(DecodeError::Truncated {
                offset: self.pos as u64,
                needed: count,
                available: self.bytes.len().saturating_sub(self.pos) as u64,
            }),
        }
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_le_bytes(self.read_array()?))
    }

    pub fn read_f32s<const N: usize>(&mut self) -> Result<[f32; N], DecodeError> {
        let mut out = [0.0f32; N];
        for value in out.iter_mut() {
            *value = self.read_f32()?;
        }
        Ok(out)
    }

    /// 读取相对偏移字段并解析为绝对位置
    ///
    /// 目标 = 字段自身位置 + 字段值，必须落在流内。
    pub fn read_relative_offset(&mut self) -> Result<usize, DecodeError> {
        let field = self.pos;
        let delta = self.read_i32()?;
        let target = field as i64 + delta as i64;
        if target < 0 || target > self.bytes.len() as i64 {
            return Err(DecodeError::OffsetOutOfRange {
                field: field as u64,
                target,
            });
        }
        Ok(target as usize)
    }
}
