/// 后台解码
///
/// 解码只产出不可变的 `GeomObject`，可以放到后台线程执行。`join()` 在线程
/// 结束后才返回结果，半解码的对象不会被场景图看到。

use std::io::Cursor;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::debug;

use super::geom_decoder::GeomDecoder;
use crate::core::error::DecodeError;
use crate::geometry::geom_object::GeomObject;

/// 进行中的后台解码
pub struct DecodeTask {
    handle: JoinHandle<Result<GeomObject, DecodeError>>,
}

impl DecodeTask {
    /// 解码是否已结束（不阻塞）
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 等待解码完成并发布结果
    pub fn join(self) -> Result<Arc<GeomObject>, DecodeError> {
        match self.handle.join() {
            Ok(result) => result.map(Arc::new),
            Err(_) => Err(DecodeError::DataStream("decode worker panicked".to_string())),
        }
    }
}

/// 在后台线程解码头部与数据流
pub fn spawn_decode(decoder: GeomDecoder, header: Vec<u8>, data: Vec<u8>) -> DecodeTask {
    let handle = thread::spawn(move || {
        debug!(header_bytes = header.len(), data_bytes = data.len(), "Background decode started");
        decoder.decode(&header, &mut Cursor::new(data))
    });
    DecodeTask { handle }
}
