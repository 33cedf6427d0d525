//! 各证据维度的匹配器
//! 每个匹配器接收单个技术的编译规则与对应证据切片，命中时写入共享检测集

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compiler::pattern::{CompiledTechRule, DomTarget, Pattern};
use crate::scraper::Scraper;
use crate::utils::DetectionSet;

/// 对一组候选值套用模式列表，命中即记录
fn apply_patterns<'a>(
    tech: &CompiledTechRule,
    patterns: &[Pattern],
    values: impl IntoIterator<Item = &'a str>,
    detection: &DetectionSet,
) {
    for value in values {
        for pattern in patterns {
            if let Some(version) = pattern.evaluate(value) {
                detection.add_app(tech, version, pattern.confidence);
            }
        }
    }
}

// URL 匹配器
pub struct UrlAnalyzer;

impl UrlAnalyzer {
    pub fn analyze(tech: &CompiledTechRule, url: &str, detection: &DetectionSet) {
        apply_patterns(tech, &tech.url_patterns, [url], detection);
    }
}

// Script 匹配器：逐条script-src匹配
pub struct ScriptAnalyzer;

impl ScriptAnalyzer {
    pub fn analyze(tech: &CompiledTechRule, scripts: &[String], detection: &DetectionSet) {
        apply_patterns(
            tech,
            &tech.script_patterns,
            scripts.iter().map(String::as_str),
            detection,
        );
    }
}

// HTML 匹配器：整页序列化HTML
pub struct HtmlAnalyzer;

impl HtmlAnalyzer {
    pub fn analyze(tech: &CompiledTechRule, html: &str, detection: &DetectionSet) {
        apply_patterns(tech, &tech.html_patterns, [html], detection);
    }
}

// Header 匹配器：按小写头名索引，逐个取值匹配
pub struct HeaderAnalyzer;

impl HeaderAnalyzer {
    pub fn analyze(
        tech: &CompiledTechRule,
        headers: &FxHashMap<String, Vec<String>>,
        detection: &DetectionSet,
    ) {
        for (name, patterns) in &tech.header_patterns {
            let Some(values) = headers.get(name) else {
                continue;
            };
            apply_patterns(tech, patterns, values.iter().map(String::as_str), detection);
        }
    }
}

// Cookie 匹配器：按小写Cookie名索引单值
pub struct CookieAnalyzer;

impl CookieAnalyzer {
    pub fn analyze(
        tech: &CompiledTechRule,
        cookies: &FxHashMap<String, String>,
        detection: &DetectionSet,
    ) {
        for (name, patterns) in &tech.cookie_patterns {
            let Some(value) = cookies.get(name) else {
                continue;
            };
            apply_patterns(tech, patterns, [value.as_str()], detection);
        }
    }
}

// Meta 匹配器：按小写meta名索引，逐条内容匹配
pub struct MetaAnalyzer;

impl MetaAnalyzer {
    pub fn analyze(
        tech: &CompiledTechRule,
        metas: &FxHashMap<String, Vec<String>>,
        detection: &DetectionSet,
    ) {
        for (name, patterns) in &tech.meta_patterns {
            let Some(values) = metas.get(name) else {
                continue;
            };
            apply_patterns(tech, patterns, values.iter().map(String::as_str), detection);
        }
    }
}

// DNS 匹配器：按大写记录类型索引，逐条记录匹配
pub struct DnsAnalyzer;

impl DnsAnalyzer {
    pub fn analyze(
        tech: &CompiledTechRule,
        dns: &FxHashMap<String, Vec<String>>,
        detection: &DetectionSet,
    ) {
        for (record_type, patterns) in &tech.dns_patterns {
            let Some(values) = dns.get(record_type) else {
                continue;
            };
            apply_patterns(tech, patterns, values.iter().map(String::as_str), detection);
        }
    }
}

// JS 匹配器：子键为属性链表达式，取值由爬取器在页面上下文求得
pub struct JsAnalyzer;

impl JsAnalyzer {
    pub async fn analyze(
        tech: &CompiledTechRule,
        scraper: &dyn Scraper,
        detection: &DetectionSet,
    ) {
        for (property, patterns) in &tech.js_patterns {
            // 求值失败与空值一律视为无证据
            let Ok(Some(value)) = scraper.eval_js(property).await else {
                continue;
            };
            apply_patterns(tech, patterns, [value.as_str()], detection);
        }
    }
}

// DOM 匹配器：每个选择器只考察首个命中元素
pub struct DomAnalyzer;

impl DomAnalyzer {
    pub fn analyze(tech: &CompiledTechRule, html: &str, detection: &DetectionSet) {
        if tech.dom_patterns.is_empty() {
            return;
        }
        let document = ::scraper::Html::parse_document(html);
        for dom in &tech.dom_patterns {
            let Ok(selector) = ::scraper::Selector::parse(&dom.selector) else {
                debug!("DOM选择器解析失败，跳过：{}", dom.selector);
                continue;
            };
            let Some(element) = document.select(&selector).next() else {
                continue;
            };
            let value = match &dom.target {
                DomTarget::Text => element.text().collect::<String>(),
                DomTarget::Attribute(attr) => element.attr(attr).unwrap_or("").to_string(),
                DomTarget::Exists => String::new(),
            };
            apply_patterns(tech, &dom.patterns, [value.as_str()], detection);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::pattern::CompiledRuleLibrary;
    use crate::compiler::RuleCompiler;
    use crate::rule::RuleLibrary;
    use serde_json::json;

    fn compiled(tech_json: serde_json::Value) -> CompiledRuleLibrary {
        let library: RuleLibrary = serde_json::from_value(json!({
            "technologies": tech_json,
            "categories": {}
        }))
        .unwrap();
        RuleCompiler::compile(&library).unwrap()
    }

    fn names(detection: &DetectionSet) -> Vec<String> {
        let mut names: Vec<_> = detection
            .technologies()
            .into_iter()
            .map(|t| t.name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_url_analyzer_matches() {
        let library = compiled(json!({"Example": {"url": "example\\.com"}}));
        let detection = DetectionSet::new();
        UrlAnalyzer::analyze(
            &library.tech_patterns["Example"],
            "http://example.com/",
            &detection,
        );
        assert_eq!(names(&detection), vec!["Example"]);
    }

    #[test]
    fn test_script_analyzer_extracts_version() {
        let library = compiled(json!({
            "jQuery": {"scripts": "jquery-([\\d.]+)\\.min\\.js\\;version:\\1"}
        }));
        let detection = DetectionSet::new();
        ScriptAnalyzer::analyze(
            &library.tech_patterns["jQuery"],
            &["https://cdn.example.com/jquery-3.6.0.min.js".to_string()],
            &detection,
        );
        let technologies = detection.technologies();
        assert_eq!(technologies[0].version, "3.6.0");
    }

    #[test]
    fn test_header_analyzer_case_insensitive_catalog_key() {
        // 测试场景：目录中头名任意大小写均可命中小写证据键
        let library = compiled(json!({
            "ExpressLower": {"headers": {"x-powered-by": "Express"}},
            "ExpressUpper": {"headers": {"X-POWERED-BY": "Express"}}
        }));
        let mut headers = FxHashMap::default();
        headers.insert("x-powered-by".to_string(), vec!["Express".to_string()]);
        let detection = DetectionSet::new();
        HeaderAnalyzer::analyze(&library.tech_patterns["ExpressLower"], &headers, &detection);
        HeaderAnalyzer::analyze(&library.tech_patterns["ExpressUpper"], &headers, &detection);
        assert_eq!(names(&detection), vec!["ExpressLower", "ExpressUpper"]);
    }

    #[test]
    fn test_cookie_analyzer_empty_pattern_presence_semantics() {
        // 测试场景：空匹配体在证据键存在时命中，缺失时不命中
        let library = compiled(json!({"PHP": {"cookies": {"PHPSESSID": ""}}}));
        let tech = &library.tech_patterns["PHP"];

        let mut cookies = FxHashMap::default();
        cookies.insert("phpsessid".to_string(), "whatever".to_string());
        let detection = DetectionSet::new();
        CookieAnalyzer::analyze(tech, &cookies, &detection);
        assert_eq!(names(&detection), vec!["PHP"]);

        let detection = DetectionSet::new();
        CookieAnalyzer::analyze(tech, &FxHashMap::default(), &detection);
        assert!(names(&detection).is_empty());
    }

    #[test]
    fn test_dns_analyzer_upper_case_record_type() {
        let library = compiled(json!({
            "GoogleWorkspace": {"dns": {"mx": "aspmx\\.l\\.google\\.com"}}
        }));
        let mut dns = FxHashMap::default();
        dns.insert(
            "MX".to_string(),
            vec!["aspmx.l.google.com".to_string()],
        );
        let detection = DetectionSet::new();
        DnsAnalyzer::analyze(&library.tech_patterns["GoogleWorkspace"], &dns, &detection);
        assert_eq!(names(&detection), vec!["GoogleWorkspace"]);
    }

    #[test]
    fn test_dom_analyzer_text_and_attribute() {
        let library = compiled(json!({
            "Ghost": {
                "dom": {
                    "meta[name=generator]": {"attributes": {"content": "Ghost ([\\d.]+)\\;version:\\1"}}
                }
            },
            "ShopTitle": {
                "dom": {"title": {"text": "Shop"}}
            }
        }));
        let html = r#"<html><head>
            <meta name="generator" content="Ghost 5.2">
            <title>My Shop</title>
        </head><body></body></html>"#;

        let detection = DetectionSet::new();
        DomAnalyzer::analyze(&library.tech_patterns["Ghost"], html, &detection);
        DomAnalyzer::analyze(&library.tech_patterns["ShopTitle"], html, &detection);

        let technologies = detection.technologies();
        assert_eq!(technologies.len(), 2);
        let ghost = technologies.iter().find(|t| t.name == "Ghost").unwrap();
        assert_eq!(ghost.version, "5.2");
    }

    #[test]
    fn test_dom_analyzer_first_element_only() {
        // 测试场景：选择器命中多个元素时只考察第一个
        let library = compiled(json!({
            "First": {"dom": {"p": {"text": "second"}}}
        }));
        let html = "<html><body><p>first</p><p>second</p></body></html>";
        let detection = DetectionSet::new();
        DomAnalyzer::analyze(&library.tech_patterns["First"], html, &detection);
        assert!(names(&detection).is_empty());
    }

    #[test]
    fn test_dom_analyzer_exists_target() {
        let library = compiled(json!({
            "VueApp": {"dom": {"#app": {"exists": ""}}}
        }));
        let detection = DetectionSet::new();
        DomAnalyzer::analyze(
            &library.tech_patterns["VueApp"],
            "<html><body><div id=\"app\"></div></body></html>",
            &detection,
        );
        assert_eq!(names(&detection), vec!["VueApp"]);
    }

    #[test]
    fn test_dom_analyzer_invalid_selector_is_inert() {
        let library = compiled(json!({
            "Broken": {"dom": {":::!!": {"exists": ""}}}
        }));
        let detection = DetectionSet::new();
        DomAnalyzer::analyze(
            &library.tech_patterns["Broken"],
            "<html><body></body></html>",
            &detection,
        );
        assert!(names(&detection).is_empty());
    }

    #[tokio::test]
    async fn test_js_analyzer_uses_scraper_eval() {
        use crate::error::RwsResult;
        use async_trait::async_trait;

        struct EvalOnly;

        #[async_trait]
        impl Scraper for EvalOnly {
            async fn init(&mut self) -> RwsResult<()> {
                Ok(())
            }
            async fn scrape(&self, _url: &str) -> RwsResult<crate::evidence::Evidence> {
                Ok(crate::evidence::Evidence::new())
            }
            async fn eval_js(&self, property: &str) -> RwsResult<Option<String>> {
                Ok((property == "jQuery.fn.jquery").then(|| "3.6.0".to_string()))
            }
            fn can_render_page(&self) -> bool {
                true
            }
            fn set_depth(&mut self, _depth: usize) {}
        }

        let library = compiled(json!({
            "jQuery": {"js": {"jQuery.fn.jquery": "([\\d.]+)\\;version:\\1"}},
            "React": {"js": {"React.version": ""}}
        }));
        let detection = DetectionSet::new();
        JsAnalyzer::analyze(&library.tech_patterns["jQuery"], &EvalOnly, &detection).await;
        JsAnalyzer::analyze(&library.tech_patterns["React"], &EvalOnly, &detection).await;

        let technologies = detection.technologies();
        assert_eq!(technologies.len(), 1);
        assert_eq!(technologies[0].name, "jQuery");
        assert_eq!(technologies[0].version, "3.6.0");
    }
}
