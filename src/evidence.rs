//! 页面证据模型
//! 归一化单次抓取得到的全部可观测信号，供各匹配器只读消费

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// 导航链中的单个URL及其HTTP状态
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScrapedUrl {
    pub url: String,
    pub status: u16,
}

/// 单次抓取的页面证据
/// 键归一化约定：header/cookie/meta键小写，DNS记录类型大写
#[derive(Debug, Clone, Default)]
pub struct Evidence {
    pub urls: Vec<ScrapedUrl>,
    pub headers: FxHashMap<String, Vec<String>>,
    pub cookies: FxHashMap<String, String>,
    pub scripts: Vec<String>,
    pub meta: FxHashMap<String, Vec<String>>,
    pub dns: FxHashMap<String, Vec<String>>,
    pub html: String,
    pub cert_issuers: Vec<String>,
}

impl Evidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录导航链中的一个URL
    pub fn push_url(&mut self, url: impl Into<String>, status: u16) {
        self.urls.push(ScrapedUrl { url: url.into(), status });
    }

    /// 追加一个响应头（键自动转小写）
    pub fn push_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into());
    }

    /// 记录一个Cookie（键自动转小写，同名后写覆盖）
    pub fn set_cookie(&mut self, name: &str, value: impl Into<String>) {
        self.cookies.insert(name.to_lowercase(), value.into());
    }

    /// 追加一个meta内容（键自动转小写）
    pub fn push_meta(&mut self, name: &str, content: impl Into<String>) {
        self.meta
            .entry(name.to_lowercase())
            .or_default()
            .push(content.into());
    }

    /// 追加一条DNS记录（类型自动转大写）
    pub fn push_dns(&mut self, record_type: &str, value: impl Into<String>) {
        self.dns
            .entry(record_type.to_uppercase())
            .or_default()
            .push(value.into());
    }
}
