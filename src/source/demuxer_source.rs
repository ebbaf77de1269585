use crate::core::{Result, StreamFormat};
use crate::source::byte_stream::ByteStream;

/// 一次成功读包的信息，数据已写入调用方提供的缓冲区
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    /// 解封装器原生流索引
    pub stream_index: usize,
    /// 写入缓冲区的字节数
    pub size: usize,
    pub pts: Option<i64>,      // 毫秒
    pub duration: Option<i64>, // 毫秒
    pub keyframe: bool,
}

/// 读包结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DemuxRead {
    /// 读到一个包
    Packet(PacketInfo),
    /// 到达文件末尾（对所有流一次性生效）
    EndOfStream,
    /// 缓冲区太小，需要至少这么多字节；同一个包会在下次 read 时重新给出
    BufferTooSmall(usize),
}

/// Demuxer 抽象接口
///
/// 容器格式解析由具体实现负责（FFmpeg、内存脚本等），
/// 媒体源只通过这个 trait 使用它。销毁即 Drop
pub trait Demuxer: Send {
    /// 原生流数量
    fn stream_count(&self) -> usize;

    /// 查询某个原生流的格式
    fn stream_format(&self, index: usize) -> Result<StreamFormat>;

    /// 原始语言标签（例如 MP4 中的 ISO 639-2 三字母代码）
    fn stream_language(&self, _index: usize) -> Option<String> {
        None
    }

    /// 流名称
    fn stream_name(&self, _index: usize) -> Option<String> {
        None
    }

    /// 读取下一个包到 `buffer`
    ///
    /// 返回：
    /// - Ok(Packet): 成功读取，数据在 buffer[..size]
    /// - Ok(EndOfStream): 到达文件末尾
    /// - Ok(BufferTooSmall(n)): 需要更大的缓冲区重试
    /// - Err(e): 读取错误
    fn read(&mut self, buffer: &mut [u8]) -> Result<DemuxRead>;

    /// Seek 到指定位置（毫秒）
    fn seek(&mut self, position_ms: i64) -> Result<()>;

    /// 获取描述信息（用于调试）
    fn description(&self) -> String;
}

/// Demuxer 创建结果
pub struct DemuxerInfo {
    pub demuxer: Box<dyn Demuxer>,
    /// 总时长（毫秒）
    pub duration_ms: i64,
    /// 容器 MIME 类型，例如 "video/mp4"
    pub mime_type: String,
}

/// Demuxer 工厂
pub trait DemuxerFactory: Send + Sync {
    /// 在字节流上创建解封装器，失败则整个媒体源创建失败
    fn create(
        &self,
        url: Option<&str>,
        stream: Box<dyn ByteStream>,
        file_size: u64,
    ) -> Result<DemuxerInfo>;
}
