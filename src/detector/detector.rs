//! 检测器核心：整合目录编译、证据抓取、并发匹配与后处理，输出检测报告

use std::sync::Arc;

use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, error, warn};

use super::analyzer::{
    CookieAnalyzer, DnsAnalyzer, DomAnalyzer, HeaderAnalyzer, HtmlAnalyzer, JsAnalyzer,
    MetaAnalyzer, ScriptAnalyzer, UrlAnalyzer,
};
use super::postprocess::PostProcessor;
use crate::compiler::{CompiledRuleLibrary, RuleCompiler};
use crate::config::GlobalConfig;
use crate::error::{RwsResult, RswebstackError};
use crate::rule::{Report, RuleLoader};
use crate::scraper::{build_scraper, Scraper};
use crate::utils::DetectionSet;

/// 输入URL校验
static URL_VALIDATION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:https?://)?[\w.-]+(?:\.[\w.-]+)+[\w\-._~:/?#\[\]@!$&'()*+,;=.]+$").unwrap()
});

/// 分析输出：按配置开关选择JSON字符串或结构化报告
#[derive(Debug, Clone)]
pub enum AnalysisOutput {
    Json(String),
    Structured(Report),
}

/// 技术检测器
/// 指纹目录与输出开关都随实例持有，不依赖任何进程级全局状态
pub struct TechDetector {
    compiled_lib: Arc<CompiledRuleLibrary>,
    scraper: Arc<dyn Scraper>,
    config: GlobalConfig,
}

impl TechDetector {
    /// 创建检测器（按配置名选择内置爬取器）
    pub async fn new(config: GlobalConfig) -> RwsResult<Self> {
        let scraper = build_scraper(&config)?;
        Self::with_scraper(config, scraper).await
    }

    /// 使用外部爬取器实现创建检测器
    pub async fn with_scraper(
        config: GlobalConfig,
        mut scraper: Box<dyn Scraper>,
    ) -> RwsResult<Self> {
        // 1. 初始化爬取器并下发深度
        scraper.init().await?;
        scraper.set_depth(config.max_depth);

        // 2. 加载并编译指纹目录
        let rule_lib = RuleLoader::load(&config).await?;
        let compiled_lib = RuleCompiler::compile(&rule_lib)?;

        Ok(Self {
            compiled_lib: Arc::new(compiled_lib),
            scraper: Arc::from(scraper),
            config,
        })
    }

    /// 分析目标URL使用的技术栈
    pub async fn analyze(&self, url: &str) -> RwsResult<Report> {
        // 1. 校验输入URL（不通过则不发起任何抓取）
        if !URL_VALIDATION_REGEX.is_match(url) {
            error!("URL格式无效：{}", url);
            return Err(RswebstackError::InvalidUrl(url.to_string()));
        }

        // 2. 抓取一次，构建只读证据
        let evidence = Arc::new(self.scraper.scrape(url).await?);
        let detection = Arc::new(DetectionSet::new());
        let can_render = self.scraper.can_render_page();

        // 3. 每个技术一个独立匹配单元，共享同一检测集
        let mut units = Vec::with_capacity(self.compiled_lib.tech_patterns.len());
        for tech in self.compiled_lib.tech_patterns.values() {
            let tech = tech.clone();
            let evidence = evidence.clone();
            let detection = detection.clone();
            let scraper = self.scraper.clone();
            let target_url = url.to_string();

            units.push(tokio::spawn(async move {
                UrlAnalyzer::analyze(&tech, &target_url, &detection);
                if !evidence.html.is_empty() && !tech.html_patterns.is_empty() {
                    HtmlAnalyzer::analyze(&tech, &evidence.html, &detection);
                }
                if !evidence.headers.is_empty() && !tech.header_patterns.is_empty() {
                    HeaderAnalyzer::analyze(&tech, &evidence.headers, &detection);
                }
                if !evidence.cookies.is_empty() && !tech.cookie_patterns.is_empty() {
                    CookieAnalyzer::analyze(&tech, &evidence.cookies, &detection);
                }
                if !evidence.scripts.is_empty() && !tech.script_patterns.is_empty() {
                    ScriptAnalyzer::analyze(&tech, &evidence.scripts, &detection);
                }
                if !evidence.meta.is_empty() && !tech.meta_patterns.is_empty() {
                    MetaAnalyzer::analyze(&tech, &evidence.meta, &detection);
                }
                if !evidence.dns.is_empty() && !tech.dns_patterns.is_empty() {
                    DnsAnalyzer::analyze(&tech, &evidence.dns, &detection);
                }
                // js/dom 匹配依赖渲染能力
                if can_render {
                    DomAnalyzer::analyze(&tech, &evidence.html, &detection);
                    if !tech.js_patterns.is_empty() {
                        JsAnalyzer::analyze(&tech, scraper.as_ref(), &detection).await;
                    }
                }
            }));
        }

        // 4. 汇合屏障：单个技术的匹配失败不影响其他技术
        for joined in join_all(units).await {
            if let Err(e) = joined {
                warn!("匹配单元异常退出：{}", e);
            }
        }

        // 5. 后处理：excludes先行，implies闭包扩展
        PostProcessor::apply(&detection, &self.compiled_lib);

        // 6. 组装报告（技术顺序不保证）
        let report = Report {
            urls: evidence.urls.clone(),
            technologies: detection.technologies(),
        };
        debug!("分析完成：{}，检出技术{}个", url, report.technologies.len());
        Ok(report)
    }

    /// 按配置的输出开关分析：json为真时返回序列化字符串
    pub async fn analyze_output(&self, url: &str) -> RwsResult<AnalysisOutput> {
        let report = self.analyze(url).await?;
        if self.config.json {
            Ok(AnalysisOutput::Json(report.to_json()?))
        } else {
            Ok(AnalysisOutput::Structured(report))
        }
    }
}
