/// 数据流协作者
///
/// 子网格的顶点/索引字节存放在与头部分离的数据流里，按元数据表中的
/// 绝对偏移读取。任何 `Read + Seek` 源都可以作为数据流，内存中的字节
/// 用 `std::io::Cursor` 包装。

use std::io::{Read, Seek, SeekFrom};

use crate::core::error::DecodeError;

pub trait DataStream {
    /// 从绝对偏移读取 `len` 字节，不足即为错误
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, DecodeError>;
}

impl<R: Read + Seek> DataStream for R {
    fn read_at(&mut self, offset: u64, len: usize) -> Result<Vec<u8>, DecodeError> {
        self.seek(SeekFrom::Start(offset)).map_err(|e| {
            DecodeError::DataStream(format!("seek to {} failed: {}", offset, e))
        })?;

        // 缓冲只随实际读到的字节增长，不按头部声明的长度预先分配
        let mut buffer = Vec::new();
        self.by_ref().take(len as u64).read_to_end(&mut buffer).map_err(|e| {
            DecodeError::DataStream(format!("read of {} bytes at {} failed: {}", len, offset, e))
        })?;
        if buffer.len() != len {
            return Err(DecodeError::DataStream(format!(
                "read of {} bytes at {} returned only {}",
                len,
                offset,
                buffer.len()
            )));
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_at_absolute_offset() {
        let mut stream = Cursor::new((0u8..32).collect::<Vec<_>>());
        assert_eq!(stream.read_at(10, 3).unwrap(), vec![10, 11, 12]);
        // 偏移与之前的读取位置无关
        assert_eq!(stream.read_at(2, 2).unwrap(), vec![2, 3]);
    }

    #[test]
    fn test_read_past_end_is_error() {
        let mut stream = Cursor::new(vec![0u8; 8]);
        assert!(matches!(stream.read_at(6, 4), Err(DecodeError::DataStream(_))));
    }

    #[test]
    fn test_huge_length_fails_without_allocating() {
        let mut stream = Cursor::new(vec![7u8; 16]);
        let result = stream.read_at(4, u32::MAX as usize);
        assert!(matches!(result, Err(DecodeError::DataStream(_))));
    }

    #[test]
    fn test_zero_length_read() {
        let mut stream = Cursor::new(Vec::<u8>::new());
        assert_eq!(stream.read_at(0, 0).unwrap(), Vec::<u8>::new());
    }
}
