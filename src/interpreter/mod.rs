//! 指令解释：自由文本 → 意图 → 解析目标 → 执行

pub mod assisted;
pub mod executor;
pub mod intent;
pub mod parser;
pub mod resolver;

pub use assisted::{AssistedInterpreter, PromptContext};
pub use executor::{execute, execute_and_save, Reply};
pub use intent::{Intent, ListKind};
pub use parser::parse;
pub use resolver::{resolve_date, resolve_episode, resolve_target, ResolvedTarget};
