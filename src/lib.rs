//! Reel - 后期制作里程碑依赖与冲突检查引擎
//!
//! 模块划分：
//! - **catalog**: 里程碑类型目录（依赖 DAG、拓扑序、环检测）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型、项目会话、逐项目串行的会话注册表
//! - **dates**: 自然语言日期解析
//! - **engine**: 依赖冲突评估、what-if 级联推演、移动事务
//! - **interpreter**: 指令解析（模式匹配 + 可选 LLM）与执行
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: 日志初始化
//! - **schedule**: 剧集、里程碑、日历事件与快照持久化

pub mod catalog;
pub mod config;
pub mod core;
pub mod dates;
pub mod engine;
pub mod interpreter;
pub mod llm;
pub mod observability;
pub mod schedule;
