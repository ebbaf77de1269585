use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

/// 字节流 - 解封装器读取数据的同步接口
///
/// 任何 `Read + Seek + Send` 都可以作为字节流，
/// 默认实现通过 seek 到末尾来获取长度
pub trait ByteStream: Read + Seek + Send {
    /// 获取总长度（字节），不改变当前读位置
    fn length(&mut self) -> io::Result<u64> {
        let current = self.stream_position()?;
        let end = self.seek(SeekFrom::End(0))?;
        if current != end {
            self.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }

    /// 是否支持 seek
    fn is_seekable(&self) -> bool {
        true
    }

    /// 关闭字节流
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ByteStream for File {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

impl ByteStream for Cursor<Vec<u8>> {
    fn length(&mut self) -> io::Result<u64> {
        Ok(self.get_ref().len() as u64)
    }
}
