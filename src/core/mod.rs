// 核心数据结构和类型定义

pub mod types;
pub mod error;
pub mod config;
pub mod rate;
pub mod logging;

pub use types::*;
pub use error::*;
pub use config::SourceConfig;
