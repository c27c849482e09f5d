//! 排期数据类型：剧集、里程碑实例、日历事件

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{MilestoneTypeId, ProjectId};

pub type EpisodeId = String;
pub type MilestoneId = String;

/// 剧集（一个制作单元）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub project_id: ProjectId,
    /// 显示编号，如 "304"
    pub number: String,
    pub sort_order: i32,
    #[serde(default = "default_episode_status")]
    pub status: String,
}

fn default_episode_status() -> String {
    "active".to_string()
}

impl Episode {
    pub fn new(project_id: impl Into<ProjectId>, number: impl Into<String>, sort_order: i32) -> Self {
        Self {
            id: format!("ep_{}", uuid::Uuid::new_v4()),
            project_id: project_id.into(),
            number: number.into(),
            sort_order,
            status: default_episode_status(),
        }
    }
}

/// 里程碑状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Skipped,
}

impl MilestoneStatus {
    /// 已完成或跳过的里程碑不再算作待办
    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Skipped => "skipped",
        }
    }

    /// 解析用户输入（"done"、"in progress" 等）
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "scheduled" | "pending" => Some(Self::Scheduled),
            "in progress" | "started" | "start" => Some(Self::InProgress),
            "completed" | "complete" | "done" | "finished" => Some(Self::Completed),
            "skipped" | "skip" => Some(Self::Skipped),
            _ => None,
        }
    }
}

/// 某剧集某类型的里程碑实例
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,
    pub episode_id: EpisodeId,
    pub milestone_type_id: MilestoneTypeId,
    pub scheduled_date: Option<NaiveDate>,
    #[serde(default)]
    pub status: MilestoneStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(
        episode_id: impl Into<EpisodeId>,
        milestone_type_id: impl Into<MilestoneTypeId>,
        scheduled_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            id: format!("ms_{}", uuid::Uuid::new_v4()),
            episode_id: episode_id.into(),
            milestone_type_id: milestone_type_id.into(),
            scheduled_date,
            status: MilestoneStatus::Scheduled,
            notes: None,
            updated_at: Utc::now(),
        }
    }
}

/// 移动成功后交给持久化方的更新记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneUpdate {
    pub milestone_id: MilestoneId,
    pub scheduled_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEventType {
    Holiday,
    Hold,
    Block,
    Note,
}

/// 日历事件（只读上下文，用于资源类提示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub project_id: ProjectId,
    pub name: String,
    pub event_type: CalendarEventType,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub affects_all: bool,
}

impl CalendarEvent {
    /// 无结束日期时视为单日事件
    pub fn covers(&self, date: NaiveDate) -> bool {
        let end = self.end_date.unwrap_or(self.start_date);
        self.start_date <= date && date <= end
    }
}
