use crate::core::logging::log_ctx;
use crate::core::{Result, Sample, SourceConfig, SourceError, StreamFormat};
use crate::source::demuxer_source::{DemuxRead, Demuxer};
use log::{debug, info, warn};

/// 读样本结果
#[derive(Debug)]
pub enum ReadOutcome {
    Sample { native_index: usize, sample: Sample },
    EndOfStream,
}

/// 解封装适配器 - 在不透明的 Demuxer 之上提供同步、带类型的视图
///
/// 负责"缓冲区太小"的透明重试：扩大缓冲区后重读同一个包，
/// 直到成功、真正的 EOF 或不可恢复的错误
pub struct DemuxerAdapter {
    demuxer: Box<dyn Demuxer>,
    scratch: Vec<u8>,
    max_sample_size: usize,
}

impl DemuxerAdapter {
    pub fn new(demuxer: Box<dyn Demuxer>, config: &SourceConfig) -> Result<Self> {
        let mut scratch = Vec::new();
        scratch.try_reserve_exact(config.initial_sample_capacity)?;
        scratch.resize(config.initial_sample_capacity, 0);

        info!(
            "{} 📎 解封装适配器就绪: {}（{} 个流）",
            log_ctx(),
            demuxer.description(),
            demuxer.stream_count()
        );

        Ok(Self {
            demuxer,
            scratch,
            max_sample_size: config.max_sample_size,
        })
    }

    pub fn stream_count(&self) -> usize {
        self.demuxer.stream_count()
    }

    /// 查询原生流格式
    pub fn stream_type(&self, index: usize) -> Result<StreamFormat> {
        self.check_index(index)?;
        self.demuxer.stream_format(index)
    }

    pub fn stream_language(&self, index: usize) -> Option<String> {
        self.demuxer.stream_language(index)
    }

    pub fn stream_name(&self, index: usize) -> Option<String> {
        self.demuxer.stream_name(index)
    }

    pub fn description(&self) -> String {
        self.demuxer.description()
    }

    /// 读取一个样本（阻塞）
    pub fn read_sample(&mut self) -> Result<ReadOutcome> {
        loop {
            match self.demuxer.read(&mut self.scratch)? {
                DemuxRead::Packet(packet) => {
                    if packet.size > self.scratch.len() {
                        return Err(SourceError::Demuxer(format!(
                            "包大小 {} 超出缓冲区 {}",
                            packet.size,
                            self.scratch.len()
                        )));
                    }
                    self.check_index(packet.stream_index)?;

                    let mut data = Vec::new();
                    data.try_reserve_exact(packet.size)?;
                    data.extend_from_slice(&self.scratch[..packet.size]);

                    return Ok(ReadOutcome::Sample {
                        native_index: packet.stream_index,
                        sample: Sample {
                            data,
                            pts: packet.pts,
                            duration: packet.duration,
                            keyframe: packet.keyframe,
                        },
                    });
                }
                DemuxRead::EndOfStream => {
                    debug!("{} 📄 Demuxer 到达文件末尾", log_ctx());
                    return Ok(ReadOutcome::EndOfStream);
                }
                DemuxRead::BufferTooSmall(required) => self.grow(required)?,
            }
        }
    }

    /// Seek 到指定位置（毫秒）
    pub fn seek(&mut self, position_ms: i64) -> Result<()> {
        info!("{} ⏩ Demuxer Seek: {}ms", log_ctx(), position_ms);
        self.demuxer.seek(position_ms)
    }

    /// 当前缓冲区大小
    pub fn buffer_capacity(&self) -> usize {
        self.scratch.len()
    }

    fn grow(&mut self, required: usize) -> Result<()> {
        let current = self.scratch.len();
        if required > self.max_sample_size {
            return Err(SourceError::SampleTooLarge {
                required,
                limit: self.max_sample_size,
            });
        }

        // 至少翻倍，保证每次重试都有进展
        let grown = required
            .max(current.saturating_mul(2))
            .min(self.max_sample_size);
        if grown <= current {
            return Err(SourceError::SampleTooLarge {
                required: current.saturating_add(1),
                limit: self.max_sample_size,
            });
        }

        debug!("{} 🔁 缓冲区太小，扩大: {} -> {} 字节", log_ctx(), current, grown);
        self.scratch.try_reserve_exact(grown - current)?;
        self.scratch.resize(grown, 0);
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<()> {
        let count = self.demuxer.stream_count();
        if index >= count {
            warn!("{} ⚠️ 无效的原生流索引 {}（共 {} 个）", log_ctx(), index, count);
            return Err(SourceError::Demuxer(format!(
                "无效的原生流索引 {}（共 {} 个）",
                index, count
            )));
        }
        Ok(())
    }
}

impl Drop for DemuxerAdapter {
    fn drop(&mut self) {
        debug!("{} 🗑 销毁解封装器: {}", log_ctx(), self.demuxer.description());
    }
}
