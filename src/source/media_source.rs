use crate::core::logging::log_ctx;
use crate::core::rate::{self, nearest_supported_rate};
use crate::core::{
    RateDirection, Result, Sample, SourceCharacteristics, SourceConfig, SourceError,
    SourceState, SourceStatus, StartPosition, TimeFormat, Token,
};
use crate::source::byte_stream::ByteStream;
use crate::source::demuxer::{DemuxerAdapter, ReadOutcome};
use crate::source::demuxer_source::{DemuxerFactory, DemuxerInfo};
use crate::source::descriptor::{PresentationDescriptor, StreamDescriptor};
use crate::source::event_queue::{
    EventQueue, EventValue, MediaEvent, MediaEventGenerator, MediaEventType,
};
use crate::source::rate_control::{Capability, RateControl, RateSupport, Service};
use crate::source::stream::{MediaStream, RequestOutcome, SampleOutcome, StreamState};
use crate::source::stream_map::{normalize_language, StreamMapping};
use crate::source::work_queue::WorkQueue;
use log::{debug, error, info, warn};
use parking_lot::{Mutex, MutexGuard};
use std::sync::{Arc, Weak};

/// 受媒体源锁保护的全部可变状态（包括每个流的队列）
struct SourceInner {
    state: SourceState,
    rate: f32,
    /// 已调度但还没执行完的预读数
    pending_reads: usize,
    /// 读包出现硬错误后停止预读，直到下一次 Start
    read_halted: bool,
    demuxer: Option<DemuxerAdapter>,
    streams: Vec<StreamState>,
    handles: Vec<Arc<MediaStream>>,
    /// 最近一次 Start 的选中状态（按逻辑索引）
    selection: Vec<bool>,
}

/// 媒体源 - 拉取式的异步解封装引擎
///
/// 消费者在媒体源上 Start/Stop/Pause，在各个 [`MediaStream`] 上请求样本；
/// 所有状态变化都在工作队列上执行，结果通过事件队列通知。
/// 样本按需预读：只有流在等待样本时才会读取解封装器
pub struct MediaSource {
    inner: Mutex<SourceInner>,
    events: EventQueue,
    work_queue: Arc<dyn WorkQueue>,
    mapping: StreamMapping,
    descriptors: Vec<StreamDescriptor>,
    characteristics: SourceCharacteristics,
    duration_ms: i64,
    total_size: u64,
    mime_type: String,
    url: Option<String>,
}

impl MediaSource {
    /// 打开字节流并创建媒体源，初始状态为 Stopped
    pub fn open(
        url: Option<&str>,
        mut stream: Box<dyn ByteStream>,
        factory: &dyn DemuxerFactory,
        work_queue: Arc<dyn WorkQueue>,
        config: SourceConfig,
    ) -> Result<Arc<Self>> {
        config.validate()?;
        info!("🎬 打开媒体源: {}", url.unwrap_or("<byte stream>"));

        let total_size = stream.length()?;
        let can_seek = stream.is_seekable();

        let DemuxerInfo {
            demuxer,
            duration_ms,
            mime_type,
        } = factory.create(url, stream, total_size).map_err(|e| {
            error!("❌ 创建解封装器失败: {}", e);
            e
        })?;
        let adapter = DemuxerAdapter::new(demuxer, &config)?;
        info!("   解封装器: {}", adapter.description());

        let count = adapter.stream_count();
        let mut formats = Vec::with_capacity(count);
        for native in 0..count {
            formats.push(adapter.stream_type(native)?);
        }
        let types: Vec<_> = formats.iter().map(|format| format.major_type()).collect();
        let mapping = StreamMapping::compute(&types, &mime_type);

        let mut descriptors = Vec::with_capacity(count);
        for logical in 0..mapping.len() {
            let Some(native) = mapping.native_index(logical) else {
                continue;
            };
            descriptors.push(StreamDescriptor {
                id: logical as u32 + 1,
                format: formats[native].clone(),
                language: normalize_language(adapter.stream_language(native), &mime_type),
                name: adapter.stream_name(native),
                mutually_exclusive: mapping.is_mutually_exclusive(logical),
            });
        }
        let selection: Vec<bool> = (0..descriptors.len())
            .map(|logical| mapping.is_selected(logical))
            .collect();

        info!(
            "✅ 媒体源已创建: {} 个流，时长 {} ms，{}",
            descriptors.len(),
            duration_ms,
            mime_type
        );
        for sd in &descriptors {
            debug!(
                "   流 {}: {:?} {} lang={:?} 互斥={}",
                sd.id,
                sd.major_type(),
                sd.format.codec(),
                sd.language,
                sd.mutually_exclusive
            );
        }

        let source = Arc::new_cyclic(|weak: &Weak<MediaSource>| {
            let mut streams = Vec::with_capacity(descriptors.len());
            let mut handles = Vec::with_capacity(descriptors.len());
            for (index, sd) in descriptors.iter().enumerate() {
                let events = Arc::new(EventQueue::new(work_queue.clone()));
                streams.push(StreamState::new(sd.id, events.clone()));
                handles.push(Arc::new(MediaStream::new(
                    index,
                    sd.clone(),
                    events,
                    weak.clone(),
                )));
            }

            MediaSource {
                inner: Mutex::new(SourceInner {
                    state: SourceState::Stopped,
                    rate: rate::NORMAL_RATE,
                    pending_reads: 0,
                    read_halted: false,
                    demuxer: Some(adapter),
                    streams,
                    handles,
                    selection,
                }),
                events: EventQueue::new(work_queue.clone()),
                work_queue,
                mapping,
                descriptors,
                characteristics: SourceCharacteristics {
                    can_seek,
                    can_pause: true,
                },
                duration_ms,
                total_size,
                mime_type,
                url: url.map(str::to_string),
            }
        });
        Ok(source)
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn duration_ms(&self) -> i64 {
        self.duration_ms
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn stream_count(&self) -> usize {
        self.descriptors.len()
    }

    /// 按逻辑索引取流句柄；关闭后返回 None
    pub fn stream(&self, index: usize) -> Option<Arc<MediaStream>> {
        self.inner.lock().handles.get(index).cloned()
    }

    pub fn streams(&self) -> Vec<Arc<MediaStream>> {
        self.inner.lock().handles.clone()
    }

    pub fn state(&self) -> SourceState {
        self.inner.lock().state
    }

    pub fn is_shutdown(&self) -> bool {
        self.state() == SourceState::Shutdown
    }

    pub fn pending_reads(&self) -> usize {
        self.inner.lock().pending_reads
    }

    /// 状态快照（调试用）
    pub fn status(&self) -> SourceStatus {
        let inner = self.inner.lock();
        SourceStatus {
            state: inner.state,
            rate: inner.rate,
            pending_reads: inner.pending_reads,
            streams: inner.streams.iter().map(StreamState::status).collect(),
        }
    }

    pub fn get_characteristics(&self) -> Result<SourceCharacteristics> {
        self.lock_alive()?;
        Ok(self.characteristics)
    }

    /// 创建演示描述符，选中状态为最近一次 Start 的选择（初始为默认选择）
    pub fn create_presentation_descriptor(&self) -> Result<PresentationDescriptor> {
        let inner = self.lock_alive()?;
        let streams = self
            .descriptors
            .iter()
            .cloned()
            .zip(inner.selection.iter().copied())
            .collect();
        Ok(PresentationDescriptor::new(
            streams,
            self.duration_ms,
            self.total_size,
            self.mime_type.clone(),
        ))
    }

    /// 开始播放或 seek
    ///
    /// 参数在这里同步检查，状态变化在工作队列上执行，
    /// 结果通过 SourceStarted / SourceSeeked 事件通知
    pub fn start(
        self: &Arc<Self>,
        descriptor: &PresentationDescriptor,
        time_format: TimeFormat,
        position: StartPosition,
    ) -> Result<()> {
        self.lock_alive()?;

        if time_format != TimeFormat::Default {
            return Err(SourceError::UnsupportedTimeFormat);
        }
        if let StartPosition::At(time) = position {
            if time < 0 {
                return Err(SourceError::InvalidRequest(format!("起始位置为负: {} ms", time)));
            }
        }
        for (sd, _) in descriptor.streams() {
            if sd.id == 0 || sd.id as usize > self.descriptors.len() {
                return Err(SourceError::InvalidStreamId(sd.id));
            }
        }

        let selection: Vec<bool> = self
            .descriptors
            .iter()
            .map(|sd| descriptor.is_selected(sd.id))
            .collect();

        info!("▶️ 请求开始: {:?}，选中 {:?}", position, selection);
        self.enqueue_op("start", move |source, inner| {
            source.do_start(inner, selection, position)
        })
    }

    pub fn stop(self: &Arc<Self>) -> Result<()> {
        self.lock_alive()?;
        info!("⏹️ 请求停止");
        self.enqueue_op("stop", |source, inner| source.do_stop(inner))
    }

    /// 只能在 Running 状态下暂停
    pub fn pause(self: &Arc<Self>) -> Result<()> {
        let inner = self.lock_alive()?;
        if inner.state != SourceState::Running {
            return Err(SourceError::InvalidState(format!(
                "只能在播放时暂停，当前状态 {:?}",
                inner.state
            )));
        }
        drop(inner);

        info!("⏸️ 请求暂停");
        self.enqueue_op("pause", |source, inner| source.do_pause(inner))
    }

    /// 关闭媒体源：释放解封装器、所有缓冲的样本和令牌，关闭全部事件队列
    ///
    /// 同步执行；第二次调用返回 `Shutdown`
    pub fn shutdown(&self) -> Result<()> {
        let mut inner = self.lock_alive()?;
        info!("🛑 关闭媒体源");
        Self::release(&mut inner, &self.events);
        Ok(())
    }

    pub fn get_service(&self, capability: Capability) -> Result<Service<'_>> {
        self.lock_alive()?;
        Ok(match capability {
            Capability::RateSupport => Service::RateSupport(self),
            Capability::RateControl => Service::RateControl(self),
        })
    }

    /// 流的样本请求（由 [`MediaStream::request_sample`] 调用）
    pub(crate) fn request_sample(
        self: &Arc<Self>,
        index: usize,
        token: Option<Token>,
    ) -> Result<()> {
        {
            let inner = self.lock_alive()?;
            let stream = inner.streams.get(index).ok_or_else(|| {
                SourceError::InvalidRequest(format!("流索引 {} 不存在", index))
            })?;
            let id = index as u32 + 1;
            if !stream.active {
                return Err(SourceError::StreamNotActive(id));
            }
            if stream.eos {
                return Err(SourceError::EndOfStream(id));
            }
        }

        self.enqueue_op("request_sample", move |source, inner| {
            source.do_request_sample(inner, index, token)
        })
    }

    fn lock_alive(&self) -> Result<MutexGuard<'_, SourceInner>> {
        let inner = self.inner.lock();
        if inner.state == SourceState::Shutdown {
            return Err(SourceError::Shutdown);
        }
        Ok(inner)
    }

    /// 把一个操作放到工作队列上，执行时持有媒体源锁
    fn enqueue_op<F>(self: &Arc<Self>, name: &'static str, op: F) -> Result<()>
    where
        F: FnOnce(&Arc<MediaSource>, &mut SourceInner) -> Result<()> + Send + 'static,
    {
        let source = Arc::clone(self);
        self.work_queue.submit(Box::new(move || {
            let mut inner = source.inner.lock();
            if inner.state == SourceState::Shutdown {
                debug!("{} 媒体源已关闭，跳过 {}", log_ctx(), name);
                return;
            }
            if let Err(e) = op(&source, &mut *inner) {
                error!("{} ❌ {} 失败: {}", log_ctx(), name, e);
            }
        }))
    }

    fn do_start(
        self: &Arc<Self>,
        inner: &mut SourceInner,
        selection: Vec<bool>,
        position: StartPosition,
    ) -> Result<()> {
        // 从 Stopped 开始且未指定位置时从头播放
        let position = match (inner.state, position) {
            (SourceState::Stopped, StartPosition::Current) => StartPosition::At(0),
            (_, position) => position,
        };
        let seek_message = inner.state != SourceState::Stopped && position.is_seek();
        let kind = if seek_message {
            MediaEventType::SourceSeeked
        } else {
            MediaEventType::SourceStarted
        };

        if let StartPosition::At(time) = position {
            let demuxer = inner.demuxer.as_mut().ok_or(SourceError::Shutdown)?;
            if let Err(e) = demuxer.seek(time) {
                error!("{} ❌ Seek 到 {} ms 失败: {}", log_ctx(), time, e);
                return self.events.push(MediaEvent::failed(kind, e));
            }
        }

        // Stopped 之后重新开始算作新选中
        let restarting = inner.state != SourceState::Stopped;
        let mut unclaimed = 0;
        for (index, stream) in inner.streams.iter_mut().enumerate() {
            let selected = selection.get(index).copied().unwrap_or(false);
            if selected {
                let event = if restarting && stream.active {
                    MediaEventType::UpdatedStream
                } else {
                    MediaEventType::NewStream
                };
                if let Some(handle) = inner.handles.get(index) {
                    self.events
                        .queue_event(event, EventValue::Stream(handle.clone()))?;
                }
            }
            unclaimed += stream.start(selected, position, seek_message)?;
        }

        inner.selection = selection;
        inner.state = SourceState::Running;
        inner.read_halted = false;

        let value = match position {
            StartPosition::At(time) => EventValue::Time(time),
            StartPosition::Current => EventValue::Empty,
        };
        info!("{} ▶️ 媒体源已开始: {:?}（seek={}）", log_ctx(), position, seek_message);
        self.events.queue_event(kind, value)?;

        // 恢复后仍在缓冲区的样本各补一次预读，暂停期间排队的令牌再补齐
        for _ in 0..unclaimed {
            self.schedule_read_ahead(inner)?;
        }
        self.top_up_read_ahead(inner)
    }

    fn do_stop(&self, inner: &mut SourceInner) -> Result<()> {
        for stream in inner.streams.iter_mut() {
            stream.stop()?;
        }
        inner.state = SourceState::Stopped;
        info!("{} ⏹️ 媒体源已停止", log_ctx());
        self.events
            .queue_event(MediaEventType::SourceStopped, EventValue::Empty)
    }

    fn do_pause(&self, inner: &mut SourceInner) -> Result<()> {
        // 排队期间状态可能已经变了
        if inner.state != SourceState::Running {
            warn!("{} ⚠️ 暂停时状态为 {:?}，忽略", log_ctx(), inner.state);
            return self.events.push(MediaEvent::failed(
                MediaEventType::SourcePaused,
                SourceError::InvalidState(format!("{:?}", inner.state)),
            ));
        }

        for stream in inner.streams.iter_mut() {
            stream.pause()?;
        }
        inner.state = SourceState::Paused;
        info!("{} ⏸️ 媒体源已暂停", log_ctx());
        self.events
            .queue_event(MediaEventType::SourcePaused, EventValue::Empty)
    }

    fn do_request_sample(
        self: &Arc<Self>,
        inner: &mut SourceInner,
        index: usize,
        token: Option<Token>,
    ) -> Result<()> {
        let Some(stream) = inner.streams.get_mut(index) else {
            return Ok(());
        };
        // 排队期间流可能被取消选中或已结束
        if !stream.active || stream.eos {
            debug!("{} 流 {} 已不可请求，丢弃请求", log_ctx(), index + 1);
            return Ok(());
        }

        match stream.accept_request(token)? {
            RequestOutcome::Delivered => Ok(()),
            RequestOutcome::Queued if inner.state == SourceState::Running && !inner.read_halted => {
                self.schedule_read_ahead(inner)
            }
            RequestOutcome::Queued => Ok(()),
        }
    }

    /// 调度一次预读；调度失败时撤销计数
    fn schedule_read_ahead(self: &Arc<Self>, inner: &mut SourceInner) -> Result<()> {
        inner.pending_reads += 1;

        let source = Arc::clone(self);
        let submitted = self.work_queue.submit(Box::new(move || {
            let mut inner = source.inner.lock();
            inner.pending_reads = inner.pending_reads.saturating_sub(1);
            if let Err(e) = source.read_ahead(&mut inner) {
                error!("{} ❌ 预读失败: {}", log_ctx(), e);
            }
        }));

        if let Err(e) = submitted {
            inner.pending_reads -= 1;
            return Err(e);
        }
        Ok(())
    }

    /// 保证在途预读数不少于所有活跃流上等待的令牌数
    fn top_up_read_ahead(self: &Arc<Self>, inner: &mut SourceInner) -> Result<()> {
        if inner.state != SourceState::Running || inner.read_halted {
            return Ok(());
        }

        let waiting: usize = inner
            .streams
            .iter()
            .filter(|stream| stream.active && !stream.eos)
            .map(StreamState::pending_tokens)
            .sum();
        while inner.pending_reads < waiting {
            self.schedule_read_ahead(inner)?;
        }
        Ok(())
    }

    /// 从解封装器读一个包并分发到对应的流
    fn read_ahead(self: &Arc<Self>, inner: &mut SourceInner) -> Result<()> {
        if inner.state != SourceState::Running {
            debug!("{} 状态为 {:?}，跳过预读", log_ctx(), inner.state);
            return Ok(());
        }
        if inner.read_halted {
            return Ok(());
        }

        let Some(demuxer) = inner.demuxer.as_mut() else {
            return Ok(());
        };
        let outcome = demuxer.read_sample();
        match outcome {
            Ok(ReadOutcome::Sample {
                native_index,
                sample,
            }) => self.dispatch_sample(inner, native_index, sample),
            Ok(ReadOutcome::EndOfStream) => self.end_of_stream(inner),
            Err(e) => {
                error!("{} ❌ 读包失败，停止预读: {}", log_ctx(), e);
                inner.read_halted = true;
                self.events
                    .push(MediaEvent::failed(MediaEventType::Error, e))
            }
        }
    }

    fn dispatch_sample(
        self: &Arc<Self>,
        inner: &mut SourceInner,
        native_index: usize,
        sample: Sample,
    ) -> Result<()> {
        let logical = self.mapping.logical_index(native_index);
        let active = logical
            .and_then(|logical| inner.streams.get(logical))
            .map_or(false, |stream| stream.active);

        if !active {
            debug!(
                "{} 丢弃未选中流的样本（原生索引 {}）",
                log_ctx(),
                native_index
            );
            return self.top_up_read_ahead(inner);
        }

        let Some(stream) = logical.and_then(|logical| inner.streams.get_mut(logical)) else {
            return Ok(());
        };
        match stream.deliver_or_buffer(Arc::new(sample))? {
            SampleOutcome::Delivered => Ok(()),
            // 没人要这个样本，继续读，直到读到有人等待的流
            SampleOutcome::Buffered => self.schedule_read_ahead(inner),
        }
    }

    fn end_of_stream(&self, inner: &mut SourceInner) -> Result<()> {
        debug!("{} 解封装器到达末尾", log_ctx());
        for stream in inner.streams.iter_mut() {
            stream.try_mark_eos()?;
        }

        let finished = inner
            .streams
            .iter()
            .filter(|stream| stream.active)
            .all(|stream| stream.eos);
        if finished {
            info!("{} 🏁 所有流播放结束", log_ctx());
            inner.state = SourceState::Stopped;
            self.events
                .queue_event(MediaEventType::EndOfPresentation, EventValue::Empty)?;
        }
        Ok(())
    }

    fn release(inner: &mut SourceInner, events: &EventQueue) {
        inner.state = SourceState::Shutdown;
        for stream in inner.streams.iter_mut() {
            stream.shutdown();
        }
        inner.handles.clear();
        inner.demuxer = None;
        events.shutdown();
    }
}

impl MediaEventGenerator for MediaSource {
    fn event_queue(&self) -> &EventQueue {
        &self.events
    }
}

impl RateSupport for MediaSource {
    fn get_slowest_rate(&self, direction: RateDirection, thin: bool) -> Result<f32> {
        self.lock_alive()?;
        if thin {
            return Err(SourceError::ThinningUnsupported);
        }
        rate::slowest_rate(direction)
    }

    fn get_fastest_rate(&self, direction: RateDirection, thin: bool) -> Result<f32> {
        self.lock_alive()?;
        if thin {
            return Err(SourceError::ThinningUnsupported);
        }
        rate::fastest_rate(direction)
    }

    fn is_rate_supported(&self, thin: bool, rate: f32) -> Result<f32> {
        self.lock_alive()?;
        rate::validate_rate(thin, rate).map_err(|e| {
            debug!("速率 {} 不支持，最接近 {}", rate, nearest_supported_rate(rate));
            e
        })?;
        Ok(rate)
    }
}

impl RateControl for MediaSource {
    fn set_rate(&self, thin: bool, rate: f32) -> Result<()> {
        let mut inner = self.lock_alive()?;
        rate::validate_rate(thin, rate)?;

        inner.rate = rate;
        info!("⏩ 播放速率: {}", rate);
        self.events
            .queue_event(MediaEventType::SourceRateChanged, EventValue::Rate(rate))
    }

    fn get_rate(&self) -> Result<(bool, f32)> {
        let inner = self.lock_alive()?;
        Ok((false, inner.rate))
    }
}

impl Drop for MediaSource {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == SourceState::Shutdown {
            return;
        }

        warn!("⚠️ 媒体源未关闭就被释放，隐式关闭");
        Self::release(inner, &self.events);
    }
}
