//! 核心层：错误类型、项目会话、逐项目加锁的注册表

pub mod error;
pub mod registry;
pub mod session;

pub use error::ScheduleError;
pub use registry::{ProjectRegistry, SharedSession};
pub use session::{EngineOptions, ProjectSession};
