//! 项目快照持久化
//!
//! 将项目的类型目录、剧集、里程碑、日历事件写入/从单个 JSON 文件加载。
//! 加载时重建依赖图（有环即拒绝）并校验里程碑引用。

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::catalog::{MilestoneCatalog, MilestoneType, ProjectId};
use crate::core::ProjectSession;
use crate::schedule::state::ScheduleState;
use crate::schedule::types::*;

/// 项目基本信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub id: ProjectId,
    #[serde(default)]
    pub name: String,
}

/// 后端提供的只读快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub project: ProjectInfo,
    pub milestone_types: Vec<MilestoneType>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default)]
    pub milestones: Vec<Milestone>,
    #[serde(default)]
    pub calendar_events: Vec<CalendarEvent>,
}

impl ProjectSnapshot {
    /// 构建会话：目录错误（环、未知前置等）与引用错误均返回 Err
    pub fn into_session(self) -> anyhow::Result<ProjectSession> {
        let catalog = MilestoneCatalog::new(self.project.id.clone(), self.milestone_types)
            .context("Failed to load milestone catalog")?;
        let state = ScheduleState::new(
            self.project.id,
            self.episodes,
            self.milestones,
            self.calendar_events,
        );
        Ok(ProjectSession::new(catalog, state)?)
    }

    pub fn from_session(session: &ProjectSession, name: impl Into<String>) -> Self {
        let (id, episodes, milestones, calendar_events) = session.state().clone().into_parts();
        Self {
            project: ProjectInfo {
                id,
                name: name.into(),
            },
            milestone_types: session.catalog().iter().cloned().collect(),
            episodes,
            milestones,
            calendar_events,
        }
    }
}

/// 单文件 JSON 快照
#[derive(Debug)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn load(&self) -> anyhow::Result<ProjectSnapshot> {
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read snapshot {}", self.path.display()))?;
        let snapshot = serde_json::from_str(&data)
            .with_context(|| format!("Malformed snapshot {}", self.path.display()))?;
        Ok(snapshot)
    }

    /// 写入快照；父目录不存在时自动创建
    pub fn save(&self, snapshot: &ProjectSnapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create snapshot directory {}", parent.display())
            })?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(snapshot)?)
            .with_context(|| format!("Failed to write snapshot {}", self.path.display()))?;
        Ok(())
    }
}
