//! 检测模块：各证据维度匹配器 + 并发检测管线 + 关联规则后处理

pub mod analyzer;
pub mod postprocess;
pub mod detector;

pub use detector::{TechDetector, AnalysisOutput};
