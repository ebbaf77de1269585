use crate::core::{Result, SourceConfig, SourceError};
use crate::source::byte_stream::ByteStream;
use crate::source::demuxer_source::DemuxerFactory;
use crate::source::media_source::MediaSource;
use crate::source::work_queue::{ThreadPoolWorkQueue, WorkQueue};
use crossbeam_channel::Sender;
use log::{error, info};
use std::sync::Arc;

/// 媒体源创建结果
pub enum SourceCreationResult {
    /// 创建成功
    Success {
        source: Arc<MediaSource>,
        url: Option<String>,
    },
    /// 创建失败
    Failed {
        url: Option<String>,
        error: SourceError,
    },
}

/// 媒体源工厂 - 负责（异步）创建媒体源
///
/// 使用方法：
/// ```no_run
/// # use std::sync::Arc;
/// # use myy_media_source::source::{MediaSourceFactory, SourceCreationResult, DemuxerFactory};
/// # use myy_media_source::core::SourceConfig;
/// # fn demo(demuxers: Arc<dyn DemuxerFactory>, file: std::fs::File) -> myy_media_source::core::Result<()> {
/// let factory = MediaSourceFactory::with_thread_pool(demuxers, SourceConfig::default())?;
/// let (tx, rx) = crossbeam_channel::unbounded();
/// factory.create_async(Some("movie.mp4".to_string()), Box::new(file), tx)?;
///
/// match rx.recv() {
///     Ok(SourceCreationResult::Success { source, .. }) => {
///         let pd = source.create_presentation_descriptor()?;
///         println!("{} 个流", pd.stream_count());
///     }
///     Ok(SourceCreationResult::Failed { error, .. }) => eprintln!("创建失败: {}", error),
///     Err(_) => {}
/// }
/// # Ok(())
/// # }
/// ```
pub struct MediaSourceFactory {
    demuxers: Arc<dyn DemuxerFactory>,
    work_queue: Arc<dyn WorkQueue>,
    config: SourceConfig,
}

impl MediaSourceFactory {
    pub fn new(
        demuxers: Arc<dyn DemuxerFactory>,
        work_queue: Arc<dyn WorkQueue>,
        config: SourceConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            demuxers,
            work_queue,
            config,
        })
    }

    /// 使用 `config.worker_threads` 个线程的线程池
    pub fn with_thread_pool(demuxers: Arc<dyn DemuxerFactory>, config: SourceConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolWorkQueue::new(config.worker_threads)?;
        Self::new(demuxers, Arc::new(pool), config)
    }

    pub fn work_queue(&self) -> Arc<dyn WorkQueue> {
        self.work_queue.clone()
    }

    /// 在当前线程同步创建
    pub fn create(&self, url: Option<&str>, stream: Box<dyn ByteStream>) -> Result<Arc<MediaSource>> {
        MediaSource::open(
            url,
            stream,
            &*self.demuxers,
            self.work_queue.clone(),
            self.config.clone(),
        )
    }

    /// 异步创建（在工作队列上）
    ///
    /// 参数：
    /// - url: 媒体地址，原样交给解封装器工厂；FFmpeg 解封装器按它打开输入，其他实现可能只用于识别和日志
    /// - stream: 字节流
    /// - result_tx: 结果发送通道
    pub fn create_async(
        &self,
        url: Option<String>,
        stream: Box<dyn ByteStream>,
        result_tx: Sender<SourceCreationResult>,
    ) -> Result<()> {
        let demuxers = self.demuxers.clone();
        let work_queue = self.work_queue.clone();
        let config = self.config.clone();

        self.work_queue.submit(Box::new(move || {
            info!("🔨 开始在工作线程中创建媒体源");

            let result = match MediaSource::open(
                url.as_deref(),
                stream,
                &*demuxers,
                work_queue,
                config,
            ) {
                Ok(source) => SourceCreationResult::Success { source, url },
                Err(error) => {
                    error!("❌ 媒体源创建失败: {}", error);
                    SourceCreationResult::Failed { url, error }
                }
            };

            // 发送结果
            if let Err(e) = result_tx.send(result) {
                error!("❌ 发送媒体源创建结果失败: {}", e);
            } else {
                info!("✅ 媒体源创建结果已发送");
            }
        }))
    }
}
