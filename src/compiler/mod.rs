//! 模式编译模块：将目录中的多态模式载荷一次性归一化并编译为可执行正则

pub mod pattern;
pub mod compiler;

pub use pattern::{Pattern, PatternGroup, DomPattern, DomTarget, CompiledTechRule, CompiledRuleLibrary};
pub use compiler::RuleCompiler;
