//! 里程碑类型目录：类型定义、依赖图（前置/后继）、构建器

pub mod builder;
pub mod graph;
pub mod types;

pub use builder::CatalogBuilder;
pub use graph::MilestoneCatalog;
pub use types::*;
