//! HTML提取模块

pub mod html_extractor;

pub use html_extractor::{HtmlExtractor, PageAssets};
