//! 引擎错误类型
//!
//! 除目录配置错误外，所有错误都在本地恢复：转换为 `MoveResult { success: false, .. }` 交给调用方展示。

use thiserror::Error;

use crate::catalog::CatalogError;
use crate::engine::ScheduleConflict;

/// 排期引擎可能出现的错误
#[derive(Error, Debug)]
pub enum ScheduleError {
    /// 目录有环或格式错误，加载时即拒绝
    #[error("Invalid milestone catalog: {0}")]
    Configuration(#[from] CatalogError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Could not understand the date \"{0}\"")]
    UnparseableDate(String),

    /// 违反前置顺序，拒绝修改
    #[error("Cannot move due to dependency conflicts")]
    DependencyConflict(Vec<ScheduleConflict>),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl ScheduleError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// 随错误携带的冲突列表（仅依赖冲突有）
    pub fn conflicts(&self) -> &[ScheduleConflict] {
        match self {
            Self::DependencyConflict(conflicts) => conflicts,
            _ => &[],
        }
    }
}
