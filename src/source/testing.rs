//! 测试用的脚本化解封装器：按固定脚本吐包、报错或 EOF

use crate::core::{Result, SourceConfig, SourceError, StreamFormat};
use crate::source::byte_stream::ByteStream;
use crate::source::demuxer_source::{DemuxRead, Demuxer, DemuxerFactory, DemuxerInfo, PacketInfo};
use crate::source::media_source::MediaSource;
use crate::source::work_queue::ManualWorkQueue;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub(crate) enum Script {
    Packet {
        stream_index: usize,
        data: Vec<u8>,
        pts: Option<i64>,
    },
    /// EOF 会一直保留，之后的读取都返回 EOF
    Eos,
    Error(String),
}

impl Script {
    pub(crate) fn packet(stream_index: usize, data: Vec<u8>) -> Self {
        Script::Packet {
            stream_index,
            data,
            pts: None,
        }
    }
}

/// 测试代码在 Demuxer 被装箱后仍可操作脚本和观察调用
#[derive(Clone, Default)]
pub(crate) struct ScriptHandle {
    script: Arc<Mutex<VecDeque<Script>>>,
    seeks: Arc<Mutex<Vec<i64>>>,
    reads: Arc<AtomicUsize>,
    seek_fails: Arc<AtomicBool>,
}

impl ScriptHandle {
    pub(crate) fn push(&self, item: Script) {
        self.script.lock().push_back(item);
    }

    pub(crate) fn seeks(&self) -> Vec<i64> {
        self.seeks.lock().clone()
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// 之后的 seek 全部失败
    pub(crate) fn fail_seeks(&self) {
        self.seek_fails.store(true, Ordering::SeqCst);
    }
}

pub(crate) struct ScriptedDemuxer {
    formats: Vec<StreamFormat>,
    languages: Vec<Option<String>>,
    handle: ScriptHandle,
    /// 缓冲区太小时报告准确的包大小，而不是偏小的估计
    exact_sizes: bool,
}

impl ScriptedDemuxer {
    pub(crate) fn new(formats: Vec<StreamFormat>) -> Self {
        let languages = vec![None; formats.len()];
        Self {
            formats,
            languages,
            handle: ScriptHandle::default(),
            exact_sizes: false,
        }
    }

    pub(crate) fn with_exact_sizes(mut self) -> Self {
        self.exact_sizes = true;
        self
    }

    pub(crate) fn with_script(self, script: Vec<Script>) -> Self {
        for item in script {
            self.handle.push(item);
        }
        self
    }

    pub(crate) fn with_languages(mut self, languages: Vec<Option<&str>>) -> Self {
        self.languages = languages.into_iter().map(|l| l.map(str::to_string)).collect();
        self
    }

    pub(crate) fn handle(&self) -> ScriptHandle {
        self.handle.clone()
    }
}

impl Demuxer for ScriptedDemuxer {
    fn stream_count(&self) -> usize {
        self.formats.len()
    }

    fn stream_format(&self, index: usize) -> Result<StreamFormat> {
        self.formats
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::Demuxer(format!("no stream {}", index)))
    }

    fn stream_language(&self, index: usize) -> Option<String> {
        self.languages.get(index).cloned().flatten()
    }

    fn stream_name(&self, index: usize) -> Option<String> {
        Some(format!("track {}", index))
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<DemuxRead> {
        self.handle.reads.fetch_add(1, Ordering::SeqCst);
        let mut script = self.handle.script.lock();
        let needed = match script.front() {
            None | Some(Script::Eos) => return Ok(DemuxRead::EndOfStream),
            Some(Script::Packet { data, .. }) if data.len() > buffer.len() => Some(data.len()),
            Some(_) => None,
        };
        if let Some(needed) = needed {
            if self.exact_sizes {
                return Ok(DemuxRead::BufferTooSmall(needed));
            }
            // 像某些解封装器一样，只给出一个偏小的估计
            return Ok(DemuxRead::BufferTooSmall(
                buffer.len().saturating_mul(2).min(needed),
            ));
        }

        match script.pop_front() {
            Some(Script::Packet {
                stream_index,
                data,
                pts,
            }) => {
                buffer[..data.len()].copy_from_slice(&data);
                Ok(DemuxRead::Packet(PacketInfo {
                    stream_index,
                    size: data.len(),
                    pts,
                    duration: None,
                    keyframe: true,
                }))
            }
            Some(Script::Error(message)) => Err(SourceError::Demuxer(message)),
            _ => Ok(DemuxRead::EndOfStream),
        }
    }

    fn seek(&mut self, position_ms: i64) -> Result<()> {
        if self.handle.seek_fails.load(Ordering::SeqCst) {
            return Err(SourceError::Demuxer(format!("seek to {} failed", position_ms)));
        }
        self.handle.seeks.lock().push(position_ms);
        Ok(())
    }

    fn description(&self) -> String {
        format!("Scripted Demuxer ({} streams)", self.formats.len())
    }
}

pub(crate) struct ScriptedDemuxerFactory {
    demuxer: Mutex<Option<ScriptedDemuxer>>,
    mime_type: String,
}

impl ScriptedDemuxerFactory {
    pub(crate) fn new(demuxer: ScriptedDemuxer, mime_type: &str) -> Self {
        Self {
            demuxer: Mutex::new(Some(demuxer)),
            mime_type: mime_type.to_string(),
        }
    }

    /// 创建总是失败的工厂
    pub(crate) fn failing() -> Self {
        Self {
            demuxer: Mutex::new(None),
            mime_type: String::new(),
        }
    }
}

impl DemuxerFactory for ScriptedDemuxerFactory {
    fn create(
        &self,
        _url: Option<&str>,
        _stream: Box<dyn ByteStream>,
        _file_size: u64,
    ) -> Result<DemuxerInfo> {
        let demuxer = self
            .demuxer
            .lock()
            .take()
            .ok_or_else(|| SourceError::Demuxer("无法识别的容器格式".to_string()))?;
        Ok(DemuxerInfo {
            demuxer: Box::new(demuxer),
            duration_ms: 10_000,
            mime_type: self.mime_type.clone(),
        })
    }
}

pub(crate) fn audio_format() -> StreamFormat {
    StreamFormat::Audio {
        codec: "aac".to_string(),
        sample_rate: 48000,
        channels: 2,
    }
}

pub(crate) fn video_format() -> StreamFormat {
    StreamFormat::Video {
        codec: "h264".to_string(),
        width: 1280,
        height: 720,
        fps: 25.0,
    }
}

pub(crate) fn subtitle_format() -> StreamFormat {
    StreamFormat::Subtitle {
        codec: "mov_text".to_string(),
    }
}

pub(crate) fn byte_stream() -> Box<dyn ByteStream> {
    Box::new(Cursor::new(vec![0u8; 4096]))
}

/// 在手动工作队列上打开一个媒体源
pub(crate) fn open_source(
    demuxer: ScriptedDemuxer,
    mime_type: &str,
) -> (Arc<MediaSource>, Arc<ManualWorkQueue>, ScriptHandle) {
    let handle = demuxer.handle();
    let queue = Arc::new(ManualWorkQueue::new());
    let factory = ScriptedDemuxerFactory::new(demuxer, mime_type);
    let source = MediaSource::open(
        Some("memory://test"),
        byte_stream(),
        &factory,
        queue.clone(),
        SourceConfig::default(),
    )
    .unwrap();
    (source, queue, handle)
}
