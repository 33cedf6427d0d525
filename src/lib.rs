//! rswebstack - Rust Web技术栈指纹识别引擎
//! 基于指纹目录对页面证据并发匹配，输出技术、版本、置信度与分类

// 导出全局错误类型
pub use self::error::{RswebstackError, RwsResult};

// 导出配置模块
pub use self::config::{GlobalConfig, ConfigManager, CustomConfigBuilder};

// 导出指纹目录模块核心接口
pub use self::rule::{
    TechRule, CategoryRule, RuleLibrary, Technology, Report, RuleLoader,
};

// 导出证据模型
pub use self::evidence::{Evidence, ScrapedUrl};

// 导出编译模块核心接口
pub use self::compiler::{
    Pattern, PatternGroup, DomPattern, DomTarget,
    CompiledTechRule, CompiledRuleLibrary, RuleCompiler,
};

// 导出提取模块核心接口
pub use self::extractor::{HtmlExtractor, PageAssets};

// 导出工具模块核心接口
pub use self::utils::{VersionResolver, DetectionSet, DetectedApp};

// 导出爬取器契约与内置实现
pub use self::scraper::{Scraper, OfflineScraper, StoredPage, build_scraper};

// 导出检测模块核心接口
pub use self::detector::{TechDetector, AnalysisOutput};

// 声明所有子模块
pub mod config;
pub mod error;
pub mod rule;
pub mod evidence;
pub mod compiler;
pub mod extractor;
pub mod utils;
pub mod scraper;
pub mod detector;
