//! 全局错误类型定义

use thiserror::Error;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RswebstackError {
    // 指纹目录相关错误
    #[error("指纹目录加载失败：{0}")]
    CatalogLoadError(String),

    // 配置相关错误
    #[error("未知的爬取器：{0}")]
    UnknownScraper(String),

    // 分析相关错误
    #[error("URL格式无效：{0}")]
    InvalidUrl(String),
    #[error("页面抓取失败：{0}")]
    ScrapeError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
}

// 全局Result类型
pub type RwsResult<T> = Result<T, RswebstackError>;
