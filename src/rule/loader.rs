//! 指纹目录加载管理器
//! 优先加载用户指定的目录文件，缺省或不可用时回落到内置目录

use tracing::{debug, warn};

use super::model::RuleLibrary;
use crate::error::{RwsResult, RswebstackError};
use crate::config::GlobalConfig;

/// 内置指纹目录（随二进制发布）
static EMBEDDED_CATALOG: &str = include_str!("../../assets/technologies.json");

/// 指纹目录加载管理器
pub struct RuleLoader;

impl RuleLoader {
    /// 加载指纹目录（用户路径优先，内置目录兜底）
    pub async fn load(config: &GlobalConfig) -> RwsResult<RuleLibrary> {
        // 1. 尝试用户指定路径
        if !config.apps_json_path.is_empty() {
            debug!("尝试加载自定义指纹目录：{}", config.apps_json_path);
            match tokio::fs::read_to_string(&config.apps_json_path).await {
                Ok(content) if !content.is_empty() => {
                    return Self::parse(&content);
                }
                Ok(_) => {
                    warn!("自定义指纹目录为空：{}，回落到内置目录", config.apps_json_path);
                }
                Err(e) => {
                    warn!("无法读取自定义指纹目录 {}：{}，回落到内置目录", config.apps_json_path, e);
                }
            }
        }

        // 2. 内置目录兜底
        debug!("加载内置指纹目录");
        Self::parse(EMBEDDED_CATALOG)
    }

    /// 解析指纹目录文档
    fn parse(content: &str) -> RwsResult<RuleLibrary> {
        let library: RuleLibrary = serde_json::from_str(content)
            .map_err(|e| RswebstackError::CatalogLoadError(format!("目录解析失败：{}", e)))?;

        debug!(
            "指纹目录解析成功，技术数：{}，分类数：{}",
            library.technologies.len(),
            library.categories.len()
        );

        Ok(library)
    }
}
