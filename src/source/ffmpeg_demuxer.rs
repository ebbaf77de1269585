use crate::core::{Result, SourceError, StreamFormat};
use crate::source::byte_stream::ByteStream;
use crate::source::demuxer_source::{DemuxRead, Demuxer, DemuxerFactory, DemuxerInfo, PacketInfo};
use ffmpeg_next as ffmpeg;
use ffmpeg_next::{format, media, Rational, Rescale};
use log::{debug, info, warn};
use std::sync::Once;

const MILLISECONDS: Rational = Rational(1, 1000);

/// 基于 FFmpeg 的解封装器
pub struct FfmpegDemuxer {
    input_ctx: format::context::Input,
    formats: Vec<StreamFormat>,
    languages: Vec<Option<String>>,
    titles: Vec<Option<String>>,
    time_bases: Vec<Rational>,
    /// 上次因缓冲区太小而没有交出去的包
    pending: Option<ffmpeg::Packet>,
    source_path: String,
}

impl FfmpegDemuxer {
    /// 打开媒体文件或网络地址
    pub fn open(path: &str) -> Result<Self> {
        info!("正在打开文件: {}", path);
        let input_ctx = format::input(&path)
            .map_err(|e| SourceError::Demuxer(format!("无法打开文件: {}", e)))?;

        let mut formats = Vec::new();
        let mut languages = Vec::new();
        let mut titles = Vec::new();
        let mut time_bases = Vec::new();
        for stream in input_ctx.streams() {
            let format = Self::stream_format_of(&stream)?;
            debug!("流 {}: {:?}", stream.index(), format);
            formats.push(format);

            let metadata = stream.metadata();
            languages.push(metadata.get("language").map(str::to_string));
            titles.push(metadata.get("title").map(str::to_string));
            time_bases.push(stream.time_base());
        }

        Ok(Self {
            input_ctx,
            formats,
            languages,
            titles,
            time_bases,
            pending: None,
            source_path: path.to_string(),
        })
    }

    fn stream_format_of(stream: &format::stream::Stream) -> Result<StreamFormat> {
        let parameters = stream.parameters();
        let codec = parameters.id().name().to_string();

        Ok(match parameters.medium() {
            media::Type::Video => {
                let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?;
                let video = decoder.decoder().video()?;
                let fps = stream.avg_frame_rate();
                let fps = if fps.denominator() == 0 {
                    0.0
                } else {
                    fps.numerator() as f64 / fps.denominator() as f64
                };
                StreamFormat::Video {
                    codec,
                    width: video.width(),
                    height: video.height(),
                    fps,
                }
            }
            media::Type::Audio => {
                let decoder = ffmpeg::codec::context::Context::from_parameters(parameters)?;
                let audio = decoder.decoder().audio()?;
                StreamFormat::Audio {
                    codec,
                    sample_rate: audio.rate(),
                    channels: audio.channels(),
                }
            }
            media::Type::Subtitle => StreamFormat::Subtitle { codec },
            _ => StreamFormat::Other { codec },
        })
    }

    /// 总时长（毫秒）
    pub fn duration_ms(&self) -> i64 {
        self.input_ctx.duration().max(0) / 1000 // 微秒转毫秒
    }

    /// 根据 FFmpeg 的格式名推断 MIME 类型
    pub fn mime_type(&self) -> String {
        let name = self.input_ctx.format().name().to_string();
        let has_video = self
            .formats
            .iter()
            .any(|format| matches!(format, StreamFormat::Video { .. }));
        mime_type_for(&name, has_video).to_string()
    }
}

fn mime_type_for(format_name: &str, has_video: bool) -> &'static str {
    let names: Vec<&str> = format_name.split(',').collect();
    let has = |name: &str| names.contains(&name);

    if has("mp4") || has("mov") {
        if has_video {
            "video/mp4"
        } else {
            "audio/mp4"
        }
    } else if has("avi") {
        "video/x-msvideo"
    } else if has("matroska") || has("webm") {
        "video/x-matroska"
    } else if has("asf") {
        "video/x-ms-asf"
    } else if has("wav") {
        "audio/wav"
    } else if has("mp3") {
        "audio/mpeg"
    } else {
        "application/octet-stream"
    }
}

impl Demuxer for FfmpegDemuxer {
    fn stream_count(&self) -> usize {
        self.formats.len()
    }

    fn stream_format(&self, index: usize) -> Result<StreamFormat> {
        self.formats
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::Demuxer(format!("流 {} 不存在", index)))
    }

    fn stream_language(&self, index: usize) -> Option<String> {
        self.languages.get(index).cloned().flatten()
    }

    fn stream_name(&self, index: usize) -> Option<String> {
        self.titles.get(index).cloned().flatten()
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<DemuxRead> {
        let packet = match self.pending.take() {
            Some(packet) => packet,
            None => {
                let mut packet = ffmpeg::Packet::empty();
                match packet.read(&mut self.input_ctx) {
                    Ok(()) => packet,
                    Err(ffmpeg::Error::Eof) => return Ok(DemuxRead::EndOfStream),
                    Err(e) => return Err(e.into()),
                }
            }
        };

        let size = packet.size();
        if size > buffer.len() {
            self.pending = Some(packet);
            return Ok(DemuxRead::BufferTooSmall(size));
        }
        if let Some(data) = packet.data() {
            buffer[..size].copy_from_slice(data);
        }

        let stream_index = packet.stream();
        let time_base = self
            .time_bases
            .get(stream_index)
            .copied()
            .unwrap_or(MILLISECONDS);
        let duration = packet.duration();

        Ok(DemuxRead::Packet(PacketInfo {
            stream_index,
            size,
            pts: packet.pts().map(|pts| pts.rescale(time_base, MILLISECONDS)),
            duration: (duration > 0).then(|| duration.rescale(time_base, MILLISECONDS)),
            keyframe: packet.is_key(),
        }))
    }

    fn seek(&mut self, position_ms: i64) -> Result<()> {
        self.pending = None;
        let timestamp = position_ms * 1000; // 毫秒转微秒
        self.input_ctx.seek(timestamp, ..timestamp)?;
        Ok(())
    }

    fn description(&self) -> String {
        format!("FFmpeg Demuxer: {}", self.source_path)
    }
}

/// FFmpeg 解封装器工厂
///
/// FFmpeg 自己按 URL 打开输入，字节流只用来提供总大小
#[derive(Debug, Default)]
pub struct FfmpegDemuxerFactory;

impl FfmpegDemuxerFactory {
    pub fn new() -> Self {
        Self
    }
}

impl DemuxerFactory for FfmpegDemuxerFactory {
    fn create(
        &self,
        url: Option<&str>,
        mut stream: Box<dyn ByteStream>,
        file_size: u64,
    ) -> Result<DemuxerInfo> {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            if let Err(e) = ffmpeg::init() {
                warn!("⚠️ FFmpeg 初始化失败: {}", e);
            }
        });

        let url = url.ok_or_else(|| {
            SourceError::InvalidRequest("FFmpeg 解封装器需要 URL".to_string())
        })?;
        stream.close()?;

        let demuxer = FfmpegDemuxer::open(url)?;
        let duration_ms = demuxer.duration_ms();
        let mime_type = demuxer.mime_type();
        info!(
            "✅ FFmpeg 打开成功: {} 个流，{} 字节，{}",
            demuxer.stream_count(),
            file_size,
            mime_type
        );

        Ok(DemuxerInfo {
            demuxer: Box::new(demuxer),
            duration_ms,
            mime_type,
        })
    }
}
