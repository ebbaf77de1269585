// 媒体源引擎

pub mod object_queue;
pub mod byte_stream;
pub mod demuxer_source;  // Demuxer 抽象接口
pub mod demuxer;         // Demuxer 适配层（缓冲区重试）
pub mod work_queue;
pub mod event_queue;
pub mod descriptor;
pub mod language;
pub mod stream_map;      // 逻辑流顺序和默认选择
pub mod stream;
pub mod rate_control;
pub mod media_source;
pub mod source_factory;  // 媒体源工厂（异步创建）
#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_demuxer;

#[cfg(test)]
pub(crate) mod testing;

pub use byte_stream::ByteStream;
pub use demuxer_source::{DemuxRead, Demuxer, DemuxerFactory, DemuxerInfo, PacketInfo};
pub use descriptor::{PresentationDescriptor, StreamDescriptor};
pub use event_queue::{EventValue, MediaEvent, MediaEventGenerator, MediaEventType, SampleDelivery};
pub use media_source::MediaSource;
pub use rate_control::{Capability, RateControl, RateSupport, Service};
pub use source_factory::{MediaSourceFactory, SourceCreationResult};
pub use stream::MediaStream;
pub use work_queue::{ManualWorkQueue, ThreadPoolWorkQueue, WorkQueue};
#[cfg(feature = "ffmpeg")]
pub use ffmpeg_demuxer::{FfmpegDemuxer, FfmpegDemuxerFactory};
