use crate::core::{MajorType, Result, SourceError, StreamFormat};
use serde::Serialize;

/// 流描述符 - 一个逻辑流的格式和元数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDescriptor {
    /// 流 ID，从 1 开始（逻辑索引 + 1）
    pub id: u32,
    pub format: StreamFormat,
    /// 语言（MP4 中已规范化为两字母代码）
    pub language: Option<String>,
    pub name: Option<String>,
    /// 是否与同类型的其他流互斥（备选音轨/视频轨）
    pub mutually_exclusive: bool,
}

impl StreamDescriptor {
    pub fn major_type(&self) -> MajorType {
        self.format.major_type()
    }
}

/// 演示描述符 - 媒体源所有流及其选中状态的目录
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationDescriptor {
    streams: Vec<(StreamDescriptor, bool)>,
    /// 总时长（毫秒）
    pub duration_ms: i64,
    /// 字节流总大小
    pub total_size: u64,
    pub mime_type: String,
}

impl PresentationDescriptor {
    pub fn new(
        streams: Vec<(StreamDescriptor, bool)>,
        duration_ms: i64,
        total_size: u64,
        mime_type: String,
    ) -> Self {
        Self {
            streams,
            duration_ms,
            total_size,
            mime_type,
        }
    }

    pub fn stream_count(&self) -> usize {
        self.streams.len()
    }

    /// 按索引获取流描述符和选中状态
    pub fn stream_by_index(&self, index: usize) -> Option<(&StreamDescriptor, bool)> {
        self.streams.get(index).map(|(sd, selected)| (sd, *selected))
    }

    pub fn streams(&self) -> impl Iterator<Item = (&StreamDescriptor, bool)> {
        self.streams.iter().map(|(sd, selected)| (sd, *selected))
    }

    pub fn select_stream(&mut self, index: usize) -> Result<()> {
        self.set_selected(index, true)
    }

    pub fn deselect_stream(&mut self, index: usize) -> Result<()> {
        self.set_selected(index, false)
    }

    /// 某个流 ID 是否被选中
    pub fn is_selected(&self, id: u32) -> bool {
        self.streams
            .iter()
            .any(|(sd, selected)| sd.id == id && *selected)
    }

    pub fn selected_count(&self) -> usize {
        self.streams.iter().filter(|(_, selected)| *selected).count()
    }

    fn set_selected(&mut self, index: usize, value: bool) -> Result<()> {
        let count = self.streams.len();
        let (_, selected) = self.streams.get_mut(index).ok_or_else(|| {
            SourceError::InvalidRequest(format!("流索引 {} 超出范围（共 {} 个）", index, count))
        })?;
        *selected = value;
        Ok(())
    }
}
