//! 关联规则后处理
//! 所有匹配单元汇合后执行：先在原始检测集上应用excludes，再做implies闭包扩展

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::compiler::pattern::{CompiledRuleLibrary, Pattern};
use crate::utils::detection::{DetectedApp, DetectionSet};

/// 后处理器
pub struct PostProcessor;

impl PostProcessor {
    /// 对检测集应用excludes与implies规则（整体持锁执行）
    pub fn apply(detection: &DetectionSet, library: &CompiledRuleLibrary) {
        let mut apps = detection.lock();

        // 1. excludes：在implies扩展前的快照上逐条移除
        let exclude_lists: Vec<_> = apps
            .values()
            .filter(|app| !app.excludes.is_empty())
            .map(|app| app.excludes.clone())
            .collect();
        for excludes in exclude_lists {
            for excluded in excludes.iter() {
                if apps.remove(&excluded.source).is_some() {
                    debug!("excludes规则移除技术：{}", excluded.source);
                }
            }
        }

        // 2. implies：闭包扩展，已检测守卫保证环路终止
        let imply_lists: Vec<_> = apps
            .values()
            .filter(|app| !app.implies.is_empty())
            .map(|app| app.implies.clone())
            .collect();
        for implies in imply_lists {
            Self::resolve_implies(&mut apps, library, &implies);
        }
    }

    /// 递归插入被推导的技术
    fn resolve_implies(
        apps: &mut FxHashMap<String, DetectedApp>,
        library: &CompiledRuleLibrary,
        implies: &[Pattern],
    ) {
        for implied in implies {
            // 未知技术名或已检测到的技术直接跳过
            let Some(tech) = library.tech_patterns.get(&implied.source) else {
                continue;
            };
            if apps.contains_key(&implied.source) {
                continue;
            }

            apps.insert(
                implied.source.clone(),
                DetectedApp {
                    name: tech.name.clone(),
                    version: implied.version_template.clone(),
                    categories: tech.categories.clone(),
                    confidence: implied.confidence,
                    implies: tech.implies.clone(),
                    excludes: tech.excludes.clone(),
                },
            );
            debug!("implies规则补充技术：{}", implied.source);

            if !tech.implies.is_empty() {
                let next = tech.implies.clone();
                Self::resolve_implies(apps, library, &next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn test_implies_closure() {
        // 测试场景：WordPress命中后implies补充PHP与MySQL
        let library = compiled(json!({
            "WordPress": {"html": "wp-content", "implies": ["PHP", "MySQL"]},
            "PHP": {},
            "MySQL": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["WordPress"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["MySQL", "PHP", "WordPress"]);

        // 被推导技术默认置信度100
        let technologies = detection.technologies();
        assert!(technologies.iter().all(|t| t.confidence == 100));
    }

    #[test]
    fn test_implies_transitive() {
        // 测试场景：implies链式传递（A -> B -> C）
        let library = compiled(json!({
            "A": {"implies": "B"},
            "B": {"implies": "C"},
            "C": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["A"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_implies_cycle_terminates() {
        // 测试场景：A与B互相implies，闭包应终止且两者都在
        let library = compiled(json!({
            "A": {"implies": "B"},
            "B": {"implies": "A"}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["A"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["A", "B"]);
    }

    #[test]
    fn test_implies_with_confidence_and_version_tags() {
        // 测试场景：implies条目携带confidence/version附加字段
        let library = compiled(json!({
            "Shop": {"implies": ["PHP\\;confidence:50\\;version:8"]},
            "PHP": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["Shop"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        let technologies = detection.technologies();
        let php = technologies.iter().find(|t| t.name == "PHP").unwrap();
        assert_eq!(php.confidence, 50);
        assert_eq!(php.version, "8");
    }

    #[test]
    fn test_implies_unknown_technology_skipped() {
        let library = compiled(json!({
            "A": {"implies": "NotInCatalog"}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["A"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["A"]);
    }

    #[test]
    fn test_excludes_removes_detected() {
        // 测试场景：Apache与nginx同时命中，Apache的excludes移除nginx
        let library = compiled(json!({
            "Apache": {"excludes": "nginx"},
            "nginx": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["Apache"], String::new(), 100);
        detection.add_app(&library.tech_patterns["nginx"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["Apache"]);
    }

    #[test]
    fn test_excludes_is_idempotent() {
        // 测试场景：excludes重复执行结果不变
        let library = compiled(json!({
            "Apache": {"excludes": "nginx"},
            "nginx": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["Apache"], String::new(), 100);
        detection.add_app(&library.tech_patterns["nginx"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        let first = names(&detection);
        PostProcessor::apply(&detection, &library);
        assert_eq!(first, names(&detection));
    }

    #[test]
    fn test_excludes_runs_before_implies() {
        // 测试场景：被排除技术的implies不应生效
        let library = compiled(json!({
            "Apache": {"excludes": "nginx"},
            "nginx": {"implies": "OpenResty"},
            "OpenResty": {}
        }));
        let detection = DetectionSet::new();
        detection.add_app(&library.tech_patterns["Apache"], String::new(), 100);
        detection.add_app(&library.tech_patterns["nginx"], String::new(), 100);

        PostProcessor::apply(&detection, &library);
        assert_eq!(names(&detection), vec!["Apache"]);
    }
}
