use std::process;
use std::thread;

/// 初始化日志
///
/// 默认 Info 级别，可通过 RUST_LOG 覆盖；重复调用是安全的
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        // 过滤掉 FFmpeg 绑定的调试日志，减少日志噪音
        .filter_module("ffmpeg_next", log::LevelFilter::Warn)
        .parse_default_env()
        .is_test(cfg!(test))
        .try_init();
}

/// 日志前缀：进程号 + 线程号
pub(crate) fn log_ctx() -> String {
    format!("[pid:{} tid:{:?}]", process::id(), thread::current().id())
}
