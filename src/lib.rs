//! 拉取式异步媒体源
//!
//! 把一个字节流交给解封装器，按逻辑流对外暴露压缩样本：
//! 消费者在 [`source::MediaSource`] 上 Start/Stop/Pause，
//! 在每个 [`source::MediaStream`] 上请求样本，结果通过事件队列异步交付。

pub mod core;
pub mod source;

pub use crate::core::{Result, SourceConfig, SourceError};
pub use crate::source::{MediaSource, MediaSourceFactory, MediaStream};
