use crate::core::logging::log_ctx;
use crate::core::MajorType;
use crate::source::language::iso_639_2_to_1;
use log::{debug, warn};

/// 是否为 MP4 容器
pub fn is_mp4(mime_type: &str) -> bool {
    matches!(
        mime_type.trim().to_ascii_lowercase().as_str(),
        "video/mp4" | "audio/mp4"
    )
}

/// 流映射 - 逻辑流顺序、默认选中和互斥标记
///
/// 打开时计算一次，之后不再改变
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamMapping {
    /// 逻辑索引 -> 原生索引
    map: Vec<usize>,
    /// 按逻辑索引：默认是否选中
    selected: Vec<bool>,
    /// 按逻辑索引：是否与同类型的流互斥
    mutually_exclusive: Vec<bool>,
}

impl StreamMapping {
    /// 根据原生流类型和容器 MIME 计算映射
    ///
    /// - 默认：原生顺序不变，第一个音频和第一个视频默认选中
    /// - MP4：音频、视频、其他三段，每段内按原生顺序倒序；
    ///   最后一个音频和最后一个视频默认选中
    pub fn compute(native_types: &[MajorType], mime_type: &str) -> Self {
        let mp4 = is_mp4(mime_type);

        let map: Vec<usize> = if mp4 {
            let band = |wanted: fn(MajorType) -> bool| {
                (0..native_types.len())
                    .rev()
                    .filter(move |&native| wanted(native_types[native]))
            };
            band(|t| t == MajorType::Audio)
                .chain(band(|t| t == MajorType::Video))
                .chain(band(|t| t != MajorType::Audio && t != MajorType::Video))
                .collect()
        } else {
            (0..native_types.len()).collect()
        };

        let count = map.len();
        let mut selected = vec![false; count];
        let mut mutually_exclusive = vec![false; count];

        let mut first_audio = None;
        let mut last_audio: Option<usize> = None;
        let mut first_video = None;
        let mut last_video: Option<usize> = None;

        for (logical, &native) in map.iter().enumerate() {
            let (first, last) = match native_types[native] {
                MajorType::Audio => (&mut first_audio, &mut last_audio),
                MajorType::Video => (&mut first_video, &mut last_video),
                _ => continue,
            };
            // 同类型的相邻两条流互为备选
            if let Some(previous) = *last {
                mutually_exclusive[previous] = true;
                mutually_exclusive[logical] = true;
            }
            first.get_or_insert(logical);
            *last = Some(logical);
        }

        let defaults = if mp4 {
            [last_audio, last_video]
        } else {
            [first_audio, first_video]
        };
        for logical in defaults.into_iter().flatten() {
            selected[logical] = true;
        }

        debug!(
            "{} 🗺 流映射（mp4={}）: {:?}，默认选中 {:?}",
            log_ctx(),
            mp4,
            map,
            selected
        );

        Self {
            map,
            selected,
            mutually_exclusive,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// 逻辑索引 -> 原生索引
    pub fn native_index(&self, logical: usize) -> Option<usize> {
        self.map.get(logical).copied()
    }

    /// 原生索引 -> 逻辑索引
    pub fn logical_index(&self, native: usize) -> Option<usize> {
        self.map.iter().position(|&n| n == native)
    }

    pub fn is_selected(&self, logical: usize) -> bool {
        self.selected.get(logical).copied().unwrap_or(false)
    }

    pub fn is_mutually_exclusive(&self, logical: usize) -> bool {
        self.mutually_exclusive.get(logical).copied().unwrap_or(false)
    }
}

/// 规范化语言标签：MP4 中的三字母代码转为两字母代码
///
/// 找不到映射不是错误，原样保留
pub fn normalize_language(language: Option<String>, mime_type: &str) -> Option<String> {
    let language = language?;
    if !is_mp4(mime_type) {
        return Some(language);
    }

    match iso_639_2_to_1(&language) {
        Some(code) => Some(code.to_string()),
        None => {
            warn!("{} ⚠️ 无法规范化语言代码: {:?}", log_ctx(), language);
            Some(language)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MajorType::{Audio, Other, Subtitle, Video};

    #[test]
    fn test_default_identity_mapping() {
        // 场景 A：1 音频 + 1 视频的非 MP4 文件
        let mapping = StreamMapping::compute(&[Audio, Video], "video/x-msvideo");
        assert_eq!(mapping.native_index(0), Some(0));
        assert_eq!(mapping.native_index(1), Some(1));
        assert!(mapping.is_selected(0));
        assert!(mapping.is_selected(1));
        assert!(!mapping.is_mutually_exclusive(0));
    }

    #[test]
    fn test_mp4_band_reordering() {
        // 场景 B：原生顺序 [视频, 音频, 字幕]
        let mapping = StreamMapping::compute(&[Video, Audio, Subtitle], "video/mp4");
        assert_eq!(mapping.native_index(0), Some(1));
        assert_eq!(mapping.native_index(1), Some(0));
        assert_eq!(mapping.native_index(2), Some(2));
        assert!(mapping.is_selected(0));
        assert!(mapping.is_selected(1));
        assert!(!mapping.is_selected(2));
        assert_eq!(mapping.logical_index(0), Some(1));
    }

    #[test]
    fn test_mp4_reverse_within_band() {
        let native = [Audio, Video, Audio, Other, Video, Audio];
        let mapping = StreamMapping::compute(&native, "video/mp4");
        let order: Vec<usize> = (0..mapping.len())
            .map(|l| mapping.native_index(l).unwrap())
            .collect();
        assert_eq!(order, vec![5, 2, 0, 4, 1, 3]);

        // MP4：逻辑顺序中最后一个音频和最后一个视频默认选中
        let selected: Vec<bool> = (0..mapping.len()).map(|l| mapping.is_selected(l)).collect();
        assert_eq!(selected, vec![false, false, true, false, true, false]);
    }

    #[test]
    fn test_mutual_exclusion_pairs() {
        let native = [Audio, Audio, Audio, Video, Subtitle];
        let mapping = StreamMapping::compute(&native, "video/x-matroska");

        // 三个音频两两相邻配对，全部标记互斥；唯一的视频不互斥
        assert!(mapping.is_mutually_exclusive(0));
        assert!(mapping.is_mutually_exclusive(1));
        assert!(mapping.is_mutually_exclusive(2));
        assert!(!mapping.is_mutually_exclusive(3));
        assert!(!mapping.is_mutually_exclusive(4));

        // 非 MP4：第一个音频 + 第一个视频
        let selected: Vec<bool> = (0..mapping.len()).map(|l| mapping.is_selected(l)).collect();
        assert_eq!(selected, vec![true, false, false, true, false]);
    }

    #[test]
    fn test_no_audio_or_video() {
        let mapping = StreamMapping::compute(&[Subtitle, Other], "video/mp4");
        assert_eq!(mapping.len(), 2);
        assert!(!mapping.is_selected(0));
        assert!(!mapping.is_selected(1));
        assert!(StreamMapping::compute(&[], "video/mp4").is_empty());
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(
            normalize_language(Some("eng".to_string()), "video/mp4"),
            Some("en".to_string())
        );
        // 找不到映射，原样保留
        assert_eq!(
            normalize_language(Some("xyz".to_string()), "video/mp4"),
            Some("xyz".to_string())
        );
        // 非 MP4 不做转换
        assert_eq!(
            normalize_language(Some("eng".to_string()), "video/x-matroska"),
            Some("eng".to_string())
        );
        assert_eq!(normalize_language(None, "video/mp4"), None);
    }
}
