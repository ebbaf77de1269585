use crate::core::logging::log_ctx;
use crate::core::{Result, Sample, SourceError, Token};
use crate::source::stream::MediaStream;
use crate::source::work_queue::WorkQueue;
use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 事件类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaEventType {
    // 媒体源事件
    SourceStarted,
    SourceSeeked,
    SourceStopped,
    SourcePaused,
    SourceRateChanged,
    NewStream,
    UpdatedStream,
    EndOfPresentation,
    Error,
    // 流事件
    StreamStarted,
    StreamSeeked,
    StreamStopped,
    StreamPaused,
    MediaSample,
    EndOfStream,
}

/// 交付给消费者的样本，附带满足的请求令牌
#[derive(Debug, Clone)]
pub struct SampleDelivery {
    pub sample: Arc<Sample>,
    pub token: Option<Token>,
}

/// 事件附带的值
#[derive(Debug, Clone)]
pub enum EventValue {
    Empty,
    /// 位置（毫秒）
    Time(i64),
    Rate(f32),
    Sample(SampleDelivery),
    Stream(Arc<MediaStream>),
}

/// 媒体事件
#[derive(Debug, Clone)]
pub struct MediaEvent {
    pub kind: MediaEventType,
    pub status: std::result::Result<(), Arc<SourceError>>,
    pub value: EventValue,
}

impl MediaEvent {
    pub fn new(kind: MediaEventType, value: EventValue) -> Self {
        Self {
            kind,
            status: Ok(()),
            value,
        }
    }

    /// 带失败状态的事件
    pub fn failed(kind: MediaEventType, error: SourceError) -> Self {
        Self {
            kind,
            status: Err(Arc::new(error)),
            value: EventValue::Empty,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    pub fn time(&self) -> Option<i64> {
        match self.value {
            EventValue::Time(time) => Some(time),
            _ => None,
        }
    }

    pub fn sample(&self) -> Option<&SampleDelivery> {
        match &self.value {
            EventValue::Sample(delivery) => Some(delivery),
            _ => None,
        }
    }

    pub fn stream(&self) -> Option<&Arc<MediaStream>> {
        match &self.value {
            EventValue::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

/// 异步取事件的回调
pub type EventCallback = Box<dyn FnOnce(Result<MediaEvent>) + Send + 'static>;

struct QueueInner {
    events: VecDeque<MediaEvent>,
    waiter: Option<EventCallback>,
    shutdown: bool,
}

/// 事件队列 - 先进先出，异步交付
///
/// 回调总是通过工作队列执行，不会在推送方（通常持有媒体源锁）的栈上运行
pub struct EventQueue {
    inner: Mutex<QueueInner>,
    available: Condvar,
    work_queue: Arc<dyn WorkQueue>,
}

impl EventQueue {
    pub fn new(work_queue: Arc<dyn WorkQueue>) -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                events: VecDeque::new(),
                waiter: None,
                shutdown: false,
            }),
            available: Condvar::new(),
            work_queue,
        }
    }

    /// 推送事件；关闭后推送会失败
    pub fn push(&self, event: MediaEvent) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return Err(SourceError::Shutdown);
        }

        if let Some(callback) = inner.waiter.take() {
            drop(inner);
            return self.dispatch(callback, Ok(event));
        }

        inner.events.try_reserve(1)?;
        inner.events.push_back(event);
        self.available.notify_one();
        Ok(())
    }

    /// 推送不带值的事件
    pub fn queue_event(&self, kind: MediaEventType, value: EventValue) -> Result<()> {
        self.push(MediaEvent::new(kind, value))
    }

    /// 阻塞获取下一个事件
    pub fn get_event(&self) -> Result<MediaEvent> {
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return Err(SourceError::Shutdown);
            }
            if let Some(event) = inner.events.pop_front() {
                return Ok(event);
            }
            self.available.wait(&mut inner);
        }
    }

    /// 带超时的阻塞获取，超时返回 NoEvent
    pub fn get_event_timeout(&self, timeout: Duration) -> Result<MediaEvent> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock();
        loop {
            if inner.shutdown {
                return Err(SourceError::Shutdown);
            }
            if let Some(event) = inner.events.pop_front() {
                return Ok(event);
            }
            if self.available.wait_until(&mut inner, deadline).timed_out() {
                return inner.events.pop_front().ok_or(SourceError::NoEvent);
            }
        }
    }

    /// 非阻塞获取
    pub fn try_get_event(&self) -> Result<Option<MediaEvent>> {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return Err(SourceError::Shutdown);
        }
        Ok(inner.events.pop_front())
    }

    /// 异步获取：有事件时回调立即被调度，否则等到下一次推送
    ///
    /// 同一时间只允许一个挂起的回调
    pub fn begin_get_event(&self, callback: EventCallback) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.shutdown {
            return Err(SourceError::Shutdown);
        }
        if inner.waiter.is_some() {
            return Err(SourceError::InvalidRequest(
                "已有挂起的异步取事件请求".to_string(),
            ));
        }

        match inner.events.pop_front() {
            Some(event) => {
                drop(inner);
                self.dispatch(callback, Ok(event))
            }
            None => {
                inner.waiter = Some(callback);
                Ok(())
            }
        }
    }

    /// async 版本的取事件
    pub async fn next_event(&self) -> Result<MediaEvent> {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.begin_get_event(Box::new(move |result| {
            let _ = tx.send(result);
        }))?;
        rx.await.map_err(|_| SourceError::Shutdown)?
    }

    /// 关闭队列：丢弃未取的事件，唤醒所有等待者
    pub fn shutdown(&self) {
        let waiter = {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                return;
            }
            inner.shutdown = true;
            let dropped = inner.events.len();
            inner.events.clear();
            if dropped > 0 {
                debug!("{} 事件队列关闭，丢弃 {} 个未取事件", log_ctx(), dropped);
            }
            inner.waiter.take()
        };
        self.available.notify_all();

        if let Some(callback) = waiter {
            let _ = self.dispatch(callback, Err(SourceError::Shutdown));
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.inner.lock().shutdown
    }

    /// 未取事件数
    pub fn len(&self) -> usize {
        self.inner.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn dispatch(&self, callback: EventCallback, result: Result<MediaEvent>) -> Result<()> {
        self.work_queue
            .submit(Box::new(move || callback(result)))
            .map_err(|e| {
                warn!("{} ⚠️ 无法调度事件回调: {}", log_ctx(), e);
                e
            })
    }
}

/// 事件生成器：媒体源和每个流都通过它暴露自己的事件队列
pub trait MediaEventGenerator {
    fn event_queue(&self) -> &EventQueue;

    fn get_event(&self) -> Result<MediaEvent> {
        self.event_queue().get_event()
    }

    fn get_event_timeout(&self, timeout: Duration) -> Result<MediaEvent> {
        self.event_queue().get_event_timeout(timeout)
    }

    fn try_get_event(&self) -> Result<Option<MediaEvent>> {
        self.event_queue().try_get_event()
    }

    fn begin_get_event(&self, callback: EventCallback) -> Result<()> {
        self.event_queue().begin_get_event(callback)
    }
}
