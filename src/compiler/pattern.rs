//! 编译后模式模型
//! 正则编译后的结构，目录加载时构建一次，匹配阶段只读共享

use std::sync::Arc;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::utils::VersionResolver;

/// 编译后的单条模式
/// `regex` 为 None 表示编译失败，该模式惰性化（永不命中，但不报错）
#[derive(Debug, Clone)]
pub struct Pattern {
    pub source: String,
    pub regex: Option<Regex>,
    pub version_template: String,
    pub confidence: u8,
}

impl Pattern {
    /// 对候选值执行匹配
    /// 命中返回提取到的版本号（可能为空串），未命中返回 None
    pub fn evaluate(&self, value: &str) -> Option<String> {
        // 空匹配体：证据键存在即命中
        if self.source.is_empty() {
            return Some(String::new());
        }
        match &self.regex {
            Some(regex) if regex.is_match(value) => {
                Some(VersionResolver::resolve(self, value))
            }
            _ => None,
        }
    }
}

/// 子键 -> 模式列表（扁平形式使用哨兵子键 "main"）
pub type PatternGroup = FxHashMap<String, Vec<Pattern>>;

/// DOM模式的取值来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomTarget {
    /// 元素文本
    Text,
    /// 指定属性（properties 未实现浏览器内取值，降级为属性读取）
    Attribute(String),
    /// 仅判断选择器是否命中元素
    Exists,
}

/// 编译后的单条DOM模式
#[derive(Debug, Clone)]
pub struct DomPattern {
    pub selector: String,
    pub target: DomTarget,
    pub patterns: Vec<Pattern>,
}

/// 技术编译后的规则
#[derive(Debug, Clone)]
pub struct CompiledTechRule {
    pub name: String,
    pub categories: Vec<String>,
    pub website: Option<String>,
    pub url_patterns: Vec<Pattern>,
    pub html_patterns: Vec<Pattern>,
    pub script_patterns: Vec<Pattern>,
    pub header_patterns: PatternGroup,
    pub cookie_patterns: PatternGroup,
    pub meta_patterns: PatternGroup,
    pub dns_patterns: PatternGroup,
    pub js_patterns: PatternGroup,
    pub dom_patterns: Vec<DomPattern>,
    pub implies: Arc<Vec<Pattern>>,
    pub excludes: Arc<Vec<Pattern>>,
}

/// 编译后的指纹目录
#[derive(Debug, Clone)]
pub struct CompiledRuleLibrary {
    pub tech_patterns: FxHashMap<String, Arc<CompiledTechRule>>,
    pub category_map: FxHashMap<u32, String>, // 分类ID -> 分类名称
}
