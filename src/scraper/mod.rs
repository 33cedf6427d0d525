//! 爬取器抽象层
//! 引擎只依赖 `Scraper` 契约；内置离线实现服务于已保存页面的批量分析，
//! 浏览器驱动等具备渲染能力的实现由调用方注入

use std::sync::RwLock;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::debug;
use url::Url;

use crate::config::GlobalConfig;
use crate::error::{RwsResult, RswebstackError};
use crate::evidence::Evidence;
use crate::extractor::HtmlExtractor;

/// 证据抓取契约
#[async_trait]
pub trait Scraper: Send + Sync {
    /// 一次性初始化，失败应中止引擎构建
    async fn init(&mut self) -> RwsResult<()>;

    /// 抓取页面并返回填充好的证据
    async fn scrape(&self, url: &str) -> RwsResult<Evidence>;

    /// 在页面上下文中求值点分属性链（如 `window.jQuery.fn.jquery`）
    /// 取值非字符串/数值或不存在时返回 None
    /// 实现必须可被并发调用，单页面实现应在内部自行串行化
    async fn eval_js(&self, property: &str) -> RwsResult<Option<String>>;

    /// 是否具备执行JS与读取真实DOM的能力，门控 js/dom 匹配器
    fn can_render_page(&self) -> bool;

    /// 告知递归爬取深度（大于0时启用robots.txt处理）
    fn set_depth(&mut self, depth: usize);
}

/// 按配置名构建内置爬取器
pub fn build_scraper(config: &GlobalConfig) -> RwsResult<Box<dyn Scraper>> {
    match config.scraper.as_str() {
        "offline" => Ok(Box::new(OfflineScraper::new())),
        other => Err(RswebstackError::UnknownScraper(other.to_string())),
    }
}

/// 预存页面（离线分析的输入单元）
#[derive(Debug, Clone, Default)]
pub struct StoredPage {
    pub status: u16,
    pub html: String,
    pub headers: Vec<(String, String)>,
    pub dns: Vec<(String, String)>,
    pub cert_issuers: Vec<String>,
}

/// 离线爬取器
/// 从预注册的页面库返回证据：Cookie由Set-Cookie头推导，
/// script/meta由HTML提取器补齐，不具备渲染能力
#[derive(Debug, Default)]
pub struct OfflineScraper {
    pages: RwLock<FxHashMap<String, StoredPage>>,
}

impl OfflineScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个已保存的页面
    pub fn insert_page(&self, url: &str, page: StoredPage) {
        let key = Self::normalize_url(url);
        self.pages
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, page);
    }

    /// URL归一化（解析失败时按原文索引）
    fn normalize_url(url: &str) -> String {
        Url::parse(url)
            .map(|parsed| parsed.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    /// 由预存页面构建证据
    fn build_evidence(url: &str, page: &StoredPage) -> Evidence {
        let mut evidence = Evidence::new();
        evidence.push_url(Self::normalize_url(url), page.status);
        evidence.html = page.html.clone();
        evidence.cert_issuers = page.cert_issuers.clone();

        for (name, value) in &page.headers {
            evidence.push_header(name, value.clone());
            // Set-Cookie头推导Cookie（仅取首个键值对）
            if name.eq_ignore_ascii_case("set-cookie") {
                if let Some((cookie_name, cookie_value)) = value
                    .split(';')
                    .next()
                    .and_then(|pair| pair.split_once('='))
                {
                    evidence.set_cookie(cookie_name.trim(), cookie_value.trim().to_string());
                }
            }
        }

        for (record_type, value) in &page.dns {
            evidence.push_dns(record_type, value.clone());
        }

        // HTML提取的资产键已小写，直接并入证据
        let assets = HtmlExtractor::extract(&page.html);
        evidence.scripts = assets.script_srcs;
        evidence.meta = assets.meta;

        evidence
    }
}

#[async_trait]
impl Scraper for OfflineScraper {
    async fn init(&mut self) -> RwsResult<()> {
        Ok(())
    }

    async fn scrape(&self, url: &str) -> RwsResult<Evidence> {
        let key = Self::normalize_url(url);
        let pages = self.pages.read().unwrap_or_else(|e| e.into_inner());
        let Some(page) = pages.get(&key) else {
            debug!("离线页面库未命中：{}", url);
            return Err(RswebstackError::ScrapeError(format!(
                "离线页面库中不存在：{}",
                url
            )));
        };
        Ok(Self::build_evidence(url, page))
    }

    async fn eval_js(&self, _property: &str) -> RwsResult<Option<String>> {
        Ok(None)
    }

    fn can_render_page(&self) -> bool {
        false
    }

    // 离线实现不做robots.txt处理，深度忽略
    fn set_depth(&mut self, _depth: usize) {}
}
