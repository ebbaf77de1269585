use crate::core::logging::log_ctx;
use crate::core::{Result, Sample, SourceError, StartPosition, StreamStatus, Token};
use crate::source::descriptor::StreamDescriptor;
use crate::source::event_queue::{
    EventQueue, EventValue, MediaEventGenerator, MediaEventType, SampleDelivery,
};
use crate::source::media_source::MediaSource;
use crate::source::object_queue::ObjectQueue;
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, Weak};

/// 媒体流 - 一个逻辑基本流（音频、视频或其他）对消费者暴露的句柄
///
/// 状态本身（选中、EOS、样本/令牌队列）由媒体源持有并受媒体源锁保护，
/// 这里只保留描述符、事件队列和对媒体源的弱引用
pub struct MediaStream {
    index: usize,
    descriptor: StreamDescriptor,
    events: Arc<EventQueue>,
    source: Weak<MediaSource>,
}

impl MediaStream {
    pub(crate) fn new(
        index: usize,
        descriptor: StreamDescriptor,
        events: Arc<EventQueue>,
        source: Weak<MediaSource>,
    ) -> Self {
        Self {
            index,
            descriptor,
            events,
            source,
        }
    }

    /// 流 ID（从 1 开始）
    pub fn id(&self) -> u32 {
        self.descriptor.id
    }

    /// 逻辑索引
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn get_stream_descriptor(&self) -> Result<StreamDescriptor> {
        if self.events.is_shutdown() {
            return Err(SourceError::Shutdown);
        }
        Ok(self.descriptor.clone())
    }

    /// 所属媒体源
    pub fn get_media_source(&self) -> Result<Arc<MediaSource>> {
        let source = self.source.upgrade().ok_or(SourceError::Shutdown)?;
        if source.is_shutdown() {
            return Err(SourceError::Shutdown);
        }
        Ok(source)
    }

    /// 请求下一个样本
    ///
    /// 流未选中、已到末尾或媒体源已关闭时立即失败；
    /// 否则异步处理，样本通过本流的 MediaSample 事件交付，并带上 `token`
    pub fn request_sample(&self, token: Option<Token>) -> Result<()> {
        let source = self.source.upgrade().ok_or(SourceError::Shutdown)?;
        source.request_sample(self.index, token)
    }
}

impl MediaEventGenerator for MediaStream {
    fn event_queue(&self) -> &EventQueue {
        &self.events
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.descriptor.id)
            .field("index", &self.index)
            .field("major_type", &self.descriptor.major_type())
            .finish()
    }
}

/// 样本到达的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SampleOutcome {
    /// 有令牌在等，已交付
    Delivered,
    /// 没有令牌，已缓冲；调用方应继续预读
    Buffered,
}

/// 样本请求的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RequestOutcome {
    /// 有缓冲样本，已交付
    Delivered,
    /// 没有缓冲样本，令牌已排队
    Queued,
}

/// 单个流的可变状态，只在持有媒体源锁时访问
///
/// 稳态下样本队列和令牌队列不会同时非空：
/// 到达的样本先匹配等待的令牌，到达的令牌先匹配缓冲的样本
pub(crate) struct StreamState {
    id: u32,
    pub(crate) active: bool,
    pub(crate) eos: bool,
    samples: ObjectQueue<Arc<Sample>>,
    tokens: ObjectQueue<Option<Token>>,
    events: Arc<EventQueue>,
}

impl StreamState {
    pub(crate) fn new(id: u32, events: Arc<EventQueue>) -> Self {
        Self {
            id,
            active: false,
            eos: false,
            samples: ObjectQueue::new(),
            tokens: ObjectQueue::new(),
            events,
        }
    }

    /// Start：seek 时丢弃旧数据并清除 EOS；暂停恢复时把缓冲的样本重新交付
    ///
    /// 返回恢复后仍留在缓冲区、没有令牌认领的样本数，媒体源为每个样本补一次预读
    pub(crate) fn start(
        &mut self,
        selected: bool,
        position: StartPosition,
        seek_message: bool,
    ) -> Result<usize> {
        if position.is_seek() {
            self.samples.clear();
            self.tokens.clear();
            self.eos = false;
        }

        self.active = selected;
        if !self.active {
            return Ok(0);
        }

        let (kind, value) = match position {
            StartPosition::At(time) if seek_message => (MediaEventType::StreamSeeked, EventValue::Time(time)),
            StartPosition::At(time) => (MediaEventType::StreamStarted, EventValue::Time(time)),
            StartPosition::Current => (MediaEventType::StreamStarted, EventValue::Empty),
        };
        self.events.queue_event(kind, value)?;

        if position.is_seek() {
            return Ok(0);
        }
        let unclaimed = self.flush_buffered()?;
        if unclaimed > 0 {
            debug!("{} 流 {} 恢复播放，{} 个缓冲样本无人认领", log_ctx(), self.id, unclaimed);
        }
        Ok(unclaimed)
    }

    /// 缓冲样本按顺序重新走一遍交付，返回重新缓冲的数量
    fn flush_buffered(&mut self) -> Result<usize> {
        let buffered: Vec<_> = std::iter::from_fn(|| self.samples.pop()).collect();
        let mut unclaimed = 0;
        for sample in buffered {
            if self.deliver_or_buffer(sample)? == SampleOutcome::Buffered {
                unclaimed += 1;
            }
        }
        Ok(unclaimed)
    }

    pub(crate) fn stop(&mut self) -> Result<()> {
        self.samples.clear();
        self.tokens.clear();
        if self.active {
            self.events
                .queue_event(MediaEventType::StreamStopped, EventValue::Empty)?;
        }
        Ok(())
    }

    /// Pause：缓冲的数据保留
    pub(crate) fn pause(&mut self) -> Result<()> {
        if self.active {
            self.events
                .queue_event(MediaEventType::StreamPaused, EventValue::Empty)?;
        }
        Ok(())
    }

    /// 从媒体源到达的样本
    pub(crate) fn deliver_or_buffer(&mut self, sample: Arc<Sample>) -> Result<SampleOutcome> {
        match self.tokens.pop() {
            Some(token) => {
                self.send_sample(sample, token)?;
                Ok(SampleOutcome::Delivered)
            }
            None => {
                self.samples.push(sample)?;
                Ok(SampleOutcome::Buffered)
            }
        }
    }

    /// 消费者的样本请求
    pub(crate) fn accept_request(&mut self, token: Option<Token>) -> Result<RequestOutcome> {
        match self.samples.pop() {
            Some(sample) => {
                self.send_sample(sample, token)?;
                Ok(RequestOutcome::Delivered)
            }
            None => {
                self.tokens.push(token)?;
                Ok(RequestOutcome::Queued)
            }
        }
    }

    /// 解封装器报告结束时调用：选中、未结束且没有缓冲样本的流进入 EOS
    pub(crate) fn try_mark_eos(&mut self) -> Result<bool> {
        if !self.active || self.eos || !self.samples.is_empty() {
            return Ok(false);
        }

        self.eos = true;
        // 不会再有样本满足这些请求
        self.tokens.clear();
        info!("{} 📄 流 {} 到达末尾", log_ctx(), self.id);
        self.events
            .queue_event(MediaEventType::EndOfStream, EventValue::Empty)?;
        Ok(true)
    }

    pub(crate) fn pending_tokens(&self) -> usize {
        self.tokens.len()
    }

    pub(crate) fn status(&self) -> StreamStatus {
        StreamStatus {
            active: self.active,
            eos: self.eos,
            buffered_samples: self.samples.len(),
            pending_tokens: self.tokens.len(),
        }
    }

    /// 关闭：释放所有缓冲对象并关闭事件队列
    pub(crate) fn shutdown(&mut self) {
        self.samples.clear();
        self.tokens.clear();
        self.events.shutdown();
    }

    fn send_sample(&self, sample: Arc<Sample>, token: Option<Token>) -> Result<()> {
        self.events.queue_event(
            MediaEventType::MediaSample,
            EventValue::Sample(SampleDelivery { sample, token }),
        )
    }
}
