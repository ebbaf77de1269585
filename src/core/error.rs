use std::collections::TryReserveError;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("媒体源已关闭")]
    Shutdown,

    #[error("状态错误: {0}")]
    InvalidState(String),

    #[error("无效请求: {0}")]
    InvalidRequest(String),

    #[error("无效的流 ID: {0}")]
    InvalidStreamId(u32),

    #[error("流未被选中: {0}")]
    StreamNotActive(u32),

    #[error("流已到达末尾: {0}")]
    EndOfStream(u32),

    #[error("不支持的时间格式")]
    UnsupportedTimeFormat,

    #[error("不支持抽帧播放（thin 模式）")]
    ThinningUnsupported,

    #[error("不支持倒放")]
    ReverseUnsupported,

    #[error("不支持的播放速率: {0}")]
    UnsupportedRate(f32),

    #[error("数据包过大: 需要 {required} 字节，上限 {limit} 字节")]
    SampleTooLarge { required: usize, limit: usize },

    #[error("解封装错误: {0}")]
    Demuxer(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("内存不足: {0}")]
    OutOfMemory(#[from] TryReserveError),

    #[error("配置错误: {0}")]
    Config(#[from] serde_json::Error),

    #[error("事件队列为空")]
    NoEvent,

    #[cfg(feature = "ffmpeg")]
    #[error("FFmpeg 错误: {0}")]
    FFmpegError(#[from] ffmpeg_next::Error),

    #[error("其他错误: {0:#}")]
    Other(#[from] anyhow::Error),
}

impl SourceError {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, SourceError::Shutdown)
    }
}

pub type Result<T> = std::result::Result<T, SourceError>;
