//! 版本提取工具模块
//! 命中模式后，根据版本模板从正则捕获结果中提取技术版本号
//! 支持 \1/\2 分组引用与 \i?X:Y 三元语法（分组非空取X，否则取Y）

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compiler::pattern::Pattern;

/// 三元标记：\i?X:Y（X不含冒号，Y延伸至模板末尾）
static TERNARY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\\(\d+)\?([^:]+):(.*)$").unwrap()
});

/// 版本提取工具类
pub struct VersionResolver;

impl VersionResolver {
    /// 从匹配值中提取版本号
    ///
    /// # 参数
    /// - `pattern`: 已命中的编译模式（携带正则与版本模板）
    /// - `value`: 命中的候选值
    ///
    /// # 返回值
    /// 提取到的版本号；模板为空或全部分组落空时返回空串（未版本化检测）
    ///
    /// # 提取流程
    /// 1. 对候选值做全局匹配，逐次得到捕获分组
    /// 2. 对每个分组 i（0为整体匹配）：先求值三元标记，再替换 \i 为分组文本
    /// 3. 多次匹配产生不同版本时，取字典序最大者
    pub fn resolve(pattern: &Pattern, value: &str) -> String {
        let Some(regex) = &pattern.regex else {
            return String::new();
        };
        if pattern.version_template.is_empty() {
            return String::new();
        }

        let mut best = String::new();
        for captures in regex.captures_iter(value) {
            let mut version = pattern.version_template.clone();
            for group_index in 0..captures.len() {
                let group_text = captures
                    .get(group_index)
                    .map(|m| m.as_str())
                    .unwrap_or("");
                version = Self::apply_ternary(&version, group_index, group_text);
                version = version.replace(&format!("\\{}", group_index), group_text);
            }
            if !version.is_empty() && version > best {
                best = version;
            }
        }
        best
    }

    /// 求值三元标记：分组非空取X，否则取Y
    fn apply_ternary(template: &str, group_index: usize, group_text: &str) -> String {
        let Some(captures) = TERNARY_REGEX.captures(template) else {
            return template.to_string();
        };
        let token_index: usize = match captures[1].parse() {
            Ok(index) => index,
            Err(_) => return template.to_string(),
        };
        if token_index != group_index {
            return template.to_string();
        }

        let branch = if group_text.is_empty() {
            captures.get(3).map(|m| m.as_str()).unwrap_or("")
        } else {
            captures.get(2).map(|m| m.as_str()).unwrap_or("")
        };

        let token_start = captures.get(0).map(|m| m.start()).unwrap_or(0);
        let mut resolved = template[..token_start].to_string();
        resolved.push_str(branch);
        resolved
    }
}
