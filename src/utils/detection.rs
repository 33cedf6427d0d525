//! 检测结果集
//! 单把互斥锁守护的技术名 -> 检测记录映射，供并发匹配单元共享写入

use std::sync::{Arc, Mutex, MutexGuard};
use rustc_hash::FxHashMap;

use crate::compiler::pattern::{Pattern, CompiledTechRule};
use crate::rule::Technology;

/// 单条检测记录
/// implies/excludes 随首次命中一并携带，供后处理阶段消费
#[derive(Debug, Clone)]
pub struct DetectedApp {
    pub name: String,
    pub version: String,
    pub categories: Vec<String>,
    pub confidence: u8,
    pub implies: Arc<Vec<Pattern>>,
    pub excludes: Arc<Vec<Pattern>>,
}

/// 线程安全的检测结果集
#[derive(Debug, Default)]
pub struct DetectionSet {
    apps: Mutex<FxHashMap<String, DetectedApp>>,
}

impl DetectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次命中
    /// 首次命中插入完整记录；重复命中仅补空版本、抬升置信度（取最大值，不累加）
    pub fn add_app(&self, tech: &CompiledTechRule, version: String, confidence: u8) {
        let mut apps = self.lock();
        match apps.get_mut(&tech.name) {
            Some(existing) => {
                if existing.version.is_empty() {
                    existing.version = version;
                }
                if confidence > existing.confidence {
                    existing.confidence = confidence;
                }
            }
            None => {
                apps.insert(
                    tech.name.clone(),
                    DetectedApp {
                        name: tech.name.clone(),
                        version,
                        categories: tech.categories.clone(),
                        confidence,
                        implies: tech.implies.clone(),
                        excludes: tech.excludes.clone(),
                    },
                );
            }
        }
    }

    /// 获取内部映射的互斥访问（后处理阶段整体读改写）
    pub(crate) fn lock(&self) -> MutexGuard<'_, FxHashMap<String, DetectedApp>> {
        self.apps.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 导出最终技术列表（顺序不保证）
    pub fn technologies(&self) -> Vec<Technology> {
        self.lock()
            .values()
            .map(|app| Technology {
                name: app.name.clone(),
                confidence: app.confidence,
                version: app.version.clone(),
                categories: app.categories.clone(),
            })
            .collect()
    }
}
