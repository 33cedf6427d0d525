//! 全局配置管理，存储所有可配置项

/// 全局配置
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    // 自定义指纹目录路径（为空时使用内置目录）
    pub apps_json_path: String,
    // 浏览器超时（单位：秒），透传给爬取器实现
    pub browser_timeout_seconds: u64,
    // 网络超时（单位：秒）
    pub network_timeout_seconds: u64,
    // 页面加载超时（单位：秒）
    pub page_load_timeout_seconds: u64,
    // 是否输出JSON字符串
    pub json: bool,
    // 爬取器选择（内置："offline"）
    pub scraper: String,
    // 爬取深度（大于0时爬取器启用robots.txt检查）
    pub max_depth: usize,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            apps_json_path: String::new(),
            browser_timeout_seconds: 4,
            network_timeout_seconds: 3,
            page_load_timeout_seconds: 3,
            json: true,
            scraper: "offline".to_string(),
            max_depth: 0,
        }
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> GlobalConfig {
        GlobalConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone)]
pub struct CustomConfigBuilder {
    config: GlobalConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: GlobalConfig::default(),
        }
    }

    pub fn apps_json_path(mut self, path: impl Into<String>) -> Self {
        self.config.apps_json_path = path.into();
        self
    }

    pub fn browser_timeout_seconds(mut self, timeout: u64) -> Self {
        self.config.browser_timeout_seconds = timeout;
        self
    }

    pub fn network_timeout_seconds(mut self, timeout: u64) -> Self {
        self.config.network_timeout_seconds = timeout;
        self
    }

    pub fn page_load_timeout_seconds(mut self, timeout: u64) -> Self {
        self.config.page_load_timeout_seconds = timeout;
        self
    }

    pub fn json(mut self, json: bool) -> Self {
        self.config.json = json;
        self
    }

    pub fn scraper(mut self, scraper: impl Into<String>) -> Self {
        self.config.scraper = scraper.into();
        self
    }

    pub fn max_depth(mut self, depth: usize) -> Self {
        self.config.max_depth = depth;
        self
    }

    pub fn build(self) -> GlobalConfig {
        self.config
    }
}

impl Default for CustomConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
