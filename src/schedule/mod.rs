//! 排期状态：剧集、里程碑实例、日历事件，以及 JSON 快照持久化

pub mod persistence;
pub mod state;
pub mod types;

pub use persistence::{ProjectInfo, ProjectSnapshot, SnapshotFile};
pub use state::ScheduleState;
pub use types::*;
