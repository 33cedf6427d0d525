//! 规则编译器核心
//! 将原始指纹目录一次性编译为可执行的匹配结构，匹配阶段不再做任何分派

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use regex::Regex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use tracing::{debug, warn};

use super::pattern::{Pattern, PatternGroup, DomPattern, DomTarget, CompiledTechRule, CompiledRuleLibrary};
use crate::rule::{RuleLibrary, TechRule};
use crate::error::{RwsResult, RswebstackError};

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译指纹目录
    pub fn compile(library: &RuleLibrary) -> RwsResult<CompiledRuleLibrary> {
        let start = Instant::now();

        // 1. 构建分类映射（ID -> 名称），非法ID视为目录结构错误
        let mut category_map = FxHashMap::default();
        for (id_str, category) in &library.categories {
            let id: u32 = id_str.parse().map_err(|_| {
                RswebstackError::CatalogLoadError(format!("非法分类ID：{}", id_str))
            })?;
            category_map.insert(id, category.name.clone());
        }

        // 2. 编译每个技术规则
        let mut stats = CompileStats::default();
        let mut tech_patterns = FxHashMap::default();
        for (tech_name, rule) in &library.technologies {
            let compiled = Self::compile_tech_rule(tech_name, rule, &category_map, &mut stats)?;
            tech_patterns.insert(tech_name.clone(), Arc::new(compiled));
        }

        // 3. 输出编译统计
        debug!("指纹目录编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "编译统计：URL模式{}条、HTML模式{}条、Script模式{}条、Header模式{}条、Cookie模式{}条、Meta模式{}条、DNS模式{}条、JS模式{}条、DOM模式{}条",
            stats.url_count,
            stats.html_count,
            stats.script_count,
            stats.header_count,
            stats.cookie_count,
            stats.meta_count,
            stats.dns_count,
            stats.js_count,
            stats.dom_count
        );

        Ok(CompiledRuleLibrary {
            tech_patterns,
            category_map,
        })
    }

    /// 编译单个技术规则
    fn compile_tech_rule(
        tech_name: &str,
        rule: &TechRule,
        category_map: &FxHashMap<u32, String>,
        stats: &mut CompileStats,
    ) -> RwsResult<CompiledTechRule> {
        // 解析分类ID为分类名称，未定义ID视为目录结构错误
        let categories = rule
            .category_ids
            .iter()
            .map(|id| {
                category_map.get(id).cloned().ok_or_else(|| {
                    RswebstackError::CatalogLoadError(format!(
                        "技术 {} 引用了未定义的分类ID：{}",
                        tech_name, id
                    ))
                })
            })
            .collect::<RwsResult<Vec<_>>>()?;

        let url_patterns = Self::flat_patterns(rule.url.as_ref());
        let html_patterns = Self::flat_patterns(rule.html.as_ref());
        let script_patterns = Self::flat_patterns(rule.scripts.as_ref());
        stats.url_count += url_patterns.len();
        stats.html_count += html_patterns.len();
        stats.script_count += script_patterns.len();

        // 键值型模式在编译期做大小写归一化
        let header_patterns = Self::keyed_patterns(rule.headers.as_ref(), KeyCase::Lower);
        let cookie_patterns = Self::keyed_patterns(rule.cookies.as_ref(), KeyCase::Lower);
        let meta_patterns = Self::keyed_patterns(rule.meta.as_ref(), KeyCase::Lower);
        let dns_patterns = Self::keyed_patterns(rule.dns.as_ref(), KeyCase::Upper);
        let js_patterns = Self::keyed_patterns(rule.js.as_ref(), KeyCase::Verbatim);
        stats.header_count += header_patterns.values().map(Vec::len).sum::<usize>();
        stats.cookie_count += cookie_patterns.values().map(Vec::len).sum::<usize>();
        stats.meta_count += meta_patterns.values().map(Vec::len).sum::<usize>();
        stats.dns_count += dns_patterns.values().map(Vec::len).sum::<usize>();
        stats.js_count += js_patterns.values().map(Vec::len).sum::<usize>();

        let dom_patterns = Self::compile_dom(tech_name, rule.dom.as_ref());
        stats.dom_count += dom_patterns.len();

        let implies = rule
            .implies
            .as_ref()
            .map(Self::compile_pattern_list)
            .unwrap_or_default();
        let excludes = rule
            .excludes
            .as_ref()
            .map(Self::compile_pattern_list)
            .unwrap_or_default();

        Ok(CompiledTechRule {
            name: tech_name.to_string(),
            categories,
            website: rule.website.clone(),
            url_patterns,
            html_patterns,
            script_patterns,
            header_patterns,
            cookie_patterns,
            meta_patterns,
            dns_patterns,
            js_patterns,
            dom_patterns,
            implies: Arc::new(implies),
            excludes: Arc::new(excludes),
        })
    }

    /// 归一化任意模式载荷为 子键 -> 模式列表
    /// 字符串与数组归入哨兵子键 "main"，映射按自身子键展开
    pub(crate) fn normalize_patterns(value: &Value) -> PatternGroup {
        let mut group: PatternGroup = FxHashMap::default();
        match value {
            Value::String(s) => {
                group.insert("main".to_string(), vec![Self::compile_single(s)]);
            }
            Value::Array(items) => {
                let patterns = Self::string_items(items);
                group.insert("main".to_string(), patterns);
            }
            Value::Object(map) => {
                for (key, val) in map {
                    match val {
                        Value::String(s) => {
                            group
                                .entry(key.clone())
                                .or_default()
                                .push(Self::compile_single(s));
                        }
                        Value::Array(items) => {
                            group
                                .entry(key.clone())
                                .or_default()
                                .extend(Self::string_items(items));
                        }
                        _ => {
                            warn!("模式载荷中的未知取值类型：{}", val);
                        }
                    }
                }
            }
            _ => {
                warn!("未知的模式载荷类型：{}", value);
            }
        }
        group
    }

    /// 编译扁平型模式（url/html/scripts），所有子键合并为单个列表
    fn flat_patterns(value: Option<&Value>) -> Vec<Pattern> {
        let Some(value) = value else {
            return Vec::new();
        };
        Self::normalize_patterns(value)
            .into_values()
            .flatten()
            .collect()
    }

    /// 编译键值型模式（headers/cookies/meta/dns/js），按指定规则归一化子键
    fn keyed_patterns(
        value: Option<&HashMap<String, Value>>,
        key_case: KeyCase,
    ) -> PatternGroup {
        let Some(map) = value else {
            return FxHashMap::default();
        };
        let mut group: PatternGroup = FxHashMap::default();
        for (key, val) in map {
            let normalized_key = match key_case {
                KeyCase::Lower => key.to_lowercase(),
                KeyCase::Upper => key.to_uppercase(),
                KeyCase::Verbatim => key.clone(),
            };
            group
                .entry(normalized_key)
                .or_default()
                .extend(Self::compile_pattern_list(val));
        }
        group
    }

    /// 编译字符串或字符串数组为模式列表（implies/excludes与DOM内层复用）
    pub(crate) fn compile_pattern_list(value: &Value) -> Vec<Pattern> {
        match value {
            Value::String(s) => vec![Self::compile_single(s)],
            Value::Array(items) => Self::string_items(items),
            _ => {
                warn!("模式列表中的未知取值类型：{}", value);
                Vec::new()
            }
        }
    }

    fn string_items(items: &[Value]) -> Vec<Pattern> {
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(Self::compile_single(s)),
                _ => {
                    warn!("模式数组中的非字符串元素：{}", item);
                    None
                }
            })
            .collect()
    }

    /// 编译DOM模式
    /// 目录结构：选择器 -> { text | attributes | properties } -> 属性名或"main" -> 模式
    fn compile_dom(
        tech_name: &str,
        value: Option<&HashMap<String, Value>>,
    ) -> Vec<DomPattern> {
        let Some(map) = value else {
            return Vec::new();
        };
        let mut compiled = Vec::new();
        for (selector, inner) in map {
            let Value::Object(targets) = inner else {
                warn!("技术 {} 的DOM规则结构异常：{}", tech_name, inner);
                continue;
            };
            for (target_kind, payload) in targets {
                match target_kind.as_str() {
                    "text" => {
                        compiled.push(DomPattern {
                            selector: selector.clone(),
                            target: DomTarget::Text,
                            patterns: Self::compile_pattern_list(payload),
                        });
                    }
                    // properties 无浏览器内取值通道，降级为属性读取
                    "attributes" | "properties" => {
                        if let Value::Object(attrs) = payload {
                            for (attr, patterns) in attrs {
                                compiled.push(DomPattern {
                                    selector: selector.clone(),
                                    target: DomTarget::Attribute(attr.clone()),
                                    patterns: Self::compile_pattern_list(patterns),
                                });
                            }
                        }
                    }
                    _ => {
                        // 其余键（如 exists）退化为存在性判断
                        compiled.push(DomPattern {
                            selector: selector.clone(),
                            target: DomTarget::Exists,
                            patterns: Self::compile_pattern_list(payload),
                        });
                    }
                }
            }
        }
        compiled
    }

    /// 编译单条模式字符串
    /// 字段以字面量 `\;` 分隔：首字段为匹配体，后续字段为 name:value 附加项
    pub(crate) fn compile_single(raw: &str) -> Pattern {
        let mut pattern = Pattern {
            source: String::new(),
            regex: None,
            version_template: String::new(),
            confidence: 100,
        };

        for (index, field) in raw.split("\\;").enumerate() {
            if field.is_empty() {
                continue;
            }
            if index == 0 {
                pattern.source = field.to_string();
                // 匹配体 -> 正则：还原转义斜杠后统一重转义，并强制忽略大小写
                let body = field.replace("\\/", "/").replace("\\\\", "\\");
                let body = body.replace('/', "\\/");
                match Regex::new(&format!("(?i){}", body)) {
                    Ok(regex) => pattern.regex = Some(regex),
                    Err(e) => {
                        debug!("模式正则编译失败，惰性化处理：{} ({})", raw, e);
                    }
                }
            } else if let Some((name, value)) = field.split_once(':') {
                match name {
                    "version" => pattern.version_template = value.to_string(),
                    "confidence" => pattern.confidence = value.parse().unwrap_or(100),
                    // 未知附加字段忽略
                    _ => {}
                }
            }
        }

        pattern
    }
}

/// 键值型模式的子键归一化规则
#[derive(Debug, Clone, Copy)]
enum KeyCase {
    Lower,
    Upper,
    Verbatim,
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    url_count: usize,
    html_count: usize,
    script_count: usize,
    header_count: usize,
    cookie_count: usize,
    meta_count: usize,
    dns_count: usize,
    js_count: usize,
    dom_count: usize,
}
