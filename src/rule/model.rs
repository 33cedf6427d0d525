//! 指纹目录数据模型定义
//! 仅存储目录数据与检测结果，无任何业务逻辑，支持序列化/反序列化

use std::collections::HashMap;
use std::fmt;
use serde::{Deserialize, Serialize};

use crate::evidence::ScrapedUrl;

/// 技术指纹规则（从指纹目录JSON解析）
/// 各匹配字段为多态载荷（字符串 | 数组 | 键值映射），统一由编译器归一化
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TechRule {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(rename = "cats", default)]
    pub category_ids: Vec<u32>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,

    // 匹配规则
    #[serde(default)]
    pub url: Option<serde_json::Value>,
    #[serde(default)]
    pub html: Option<serde_json::Value>,
    #[serde(default, alias = "scriptSrc")]
    pub scripts: Option<serde_json::Value>,
    #[serde(default)]
    pub js: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub headers: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub cookies: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub meta: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub dns: Option<HashMap<String, serde_json::Value>>,
    #[serde(default)]
    pub dom: Option<HashMap<String, serde_json::Value>>,

    // 关联规则
    #[serde(default)]
    pub implies: Option<serde_json::Value>,
    #[serde(default)]
    pub excludes: Option<serde_json::Value>,
}

/// 分类规则（从指纹目录JSON解析）
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
}

/// 完整指纹目录
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleLibrary {
    pub technologies: HashMap<String, TechRule>,
    pub categories: HashMap<String, CategoryRule>,
}

/// 技术检测结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    pub confidence: u8,
    pub version: String,
    pub categories: Vec<String>,
}

// ======== 为 Technology 实现 Display trait（用于日志与报告输出） ========
impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.version.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} {}", self.name, self.version)
        }
    }
}

/// 单次分析的完整报告
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Report {
    pub urls: Vec<ScrapedUrl>,
    pub technologies: Vec<Technology>,
}

impl Report {
    /// 序列化为紧凑JSON字符串
    pub fn to_json(&self) -> crate::error::RwsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
