//! 排期状态：一个项目的剧集、里程碑与日历事件
//!
//! 由 ProjectSession 独占持有；评估器只读借用，移动事务通过 `&mut` 修改日期。

use std::collections::HashMap;

use chrono::{Days, NaiveDate, Utc};

use crate::catalog::{MilestoneCatalog, ProjectId};
use crate::core::ScheduleError;
use crate::schedule::types::*;

#[derive(Debug, Clone)]
pub struct ScheduleState {
    project_id: ProjectId,
    /// 按 sort_order 排序
    episodes: Vec<Episode>,
    milestones: Vec<Milestone>,
    calendar_events: Vec<CalendarEvent>,
    milestone_index: HashMap<MilestoneId, usize>,
}

impl ScheduleState {
    pub fn new(
        project_id: impl Into<ProjectId>,
        mut episodes: Vec<Episode>,
        milestones: Vec<Milestone>,
        calendar_events: Vec<CalendarEvent>,
    ) -> Self {
        episodes.sort_by_key(|e| e.sort_order);
        let milestone_index = milestones
            .iter()
            .enumerate()
            .map(|(i, m)| (m.id.clone(), i))
            .collect();
        Self {
            project_id: project_id.into(),
            episodes,
            milestones,
            calendar_events,
            milestone_index,
        }
    }

    /// 空项目
    pub fn empty(project_id: impl Into<ProjectId>) -> Self {
        Self::new(project_id, Vec::new(), Vec::new(), Vec::new())
    }

    /// 校验里程碑引用的剧集与类型均存在
    pub fn validate(&self, catalog: &MilestoneCatalog) -> Result<(), ScheduleError> {
        for m in &self.milestones {
            if self.episode(&m.episode_id).is_none() {
                return Err(ScheduleError::Snapshot(format!(
                    "milestone {} references unknown episode {}",
                    m.id, m.episode_id
                )));
            }
            if catalog.get_by_id(&m.milestone_type_id).is_none() {
                return Err(ScheduleError::Snapshot(format!(
                    "milestone {} references unknown milestone type {}",
                    m.id, m.milestone_type_id
                )));
            }
        }
        Ok(())
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }

    pub fn milestones(&self) -> &[Milestone] {
        &self.milestones
    }

    pub fn calendar_events(&self) -> &[CalendarEvent] {
        &self.calendar_events
    }

    pub fn episode(&self, id: &str) -> Option<&Episode> {
        self.episodes.iter().find(|e| e.id == id)
    }

    /// 按显示编号宽松匹配：子串包含，取 sort_order 最靠前的一个
    ///
    /// "3" 会命中 "303" 或 "1300"，保留该行为以兼容既有用法。
    pub fn find_episode(&self, reference: &str) -> Option<&Episode> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        self.episodes.iter().find(|e| e.number.contains(reference))
    }

    pub fn milestone(&self, id: &str) -> Option<&Milestone> {
        self.milestone_index.get(id).map(|&i| &self.milestones[i])
    }

    /// 某剧集某类型的里程碑（常见情况下唯一）
    pub fn milestone_for(&self, episode_id: &str, milestone_type_id: &str) -> Option<&Milestone> {
        self.milestones
            .iter()
            .find(|m| m.episode_id == episode_id && m.milestone_type_id == milestone_type_id)
    }

    pub fn milestones_of_episode<'a>(&'a self, episode_id: &'a str) -> impl Iterator<Item = &'a Milestone> + 'a {
        self.milestones.iter().filter(move |m| m.episode_id == episode_id)
    }

    pub fn add_episode(&mut self, episode: Episode) {
        self.episodes.push(episode);
        self.episodes.sort_by_key(|e| e.sort_order);
    }

    pub fn add_milestone(&mut self, milestone: Milestone) {
        self.milestone_index
            .insert(milestone.id.clone(), self.milestones.len());
        self.milestones.push(milestone);
    }

    pub fn add_calendar_event(&mut self, event: CalendarEvent) {
        self.calendar_events.push(event);
    }

    /// 按目录为新剧集生成全部里程碑：按拓扑序从 `start` 起每隔 `spacing_days` 天排一个
    pub fn provision_episode(
        &mut self,
        catalog: &MilestoneCatalog,
        number: impl Into<String>,
        start: Option<NaiveDate>,
        spacing_days: u64,
    ) -> EpisodeId {
        let sort_order = self
            .episodes
            .iter()
            .map(|e| e.sort_order)
            .max()
            .map_or(1, |m| m + 1);
        let episode = Episode::new(self.project_id.clone(), number, sort_order);
        let episode_id = episode.id.clone();
        self.add_episode(episode);

        for (step, milestone_type) in catalog.topological_order().into_iter().enumerate() {
            let date = start.and_then(|s| s.checked_add_days(Days::new(step as u64 * spacing_days)));
            self.add_milestone(Milestone::new(
                episode_id.clone(),
                milestone_type.id.clone(),
                date,
            ));
        }
        episode_id
    }

    /// 直接更新状态（无需依赖校验）
    pub fn update_status(
        &mut self,
        milestone_id: &str,
        status: MilestoneStatus,
    ) -> Result<&Milestone, ScheduleError> {
        let milestone = self.milestone_mut(milestone_id)?;
        milestone.status = status;
        milestone.updated_at = Utc::now();
        Ok(milestone)
    }

    pub fn set_notes(
        &mut self,
        milestone_id: &str,
        notes: Option<String>,
    ) -> Result<&Milestone, ScheduleError> {
        let milestone = self.milestone_mut(milestone_id)?;
        milestone.notes = notes;
        milestone.updated_at = Utc::now();
        Ok(milestone)
    }

    /// 仅供移动事务（及级联模拟）调用：写入日期并返回更新记录
    pub(crate) fn apply_date(
        &mut self,
        milestone_id: &str,
        date: NaiveDate,
    ) -> Result<MilestoneUpdate, ScheduleError> {
        let milestone = self.milestone_mut(milestone_id)?;
        milestone.scheduled_date = Some(date);
        milestone.updated_at = Utc::now();
        Ok(MilestoneUpdate {
            milestone_id: milestone.id.clone(),
            scheduled_date: date,
            updated_at: milestone.updated_at,
        })
    }

    /// 拆回各部分（用于写快照）
    pub fn into_parts(self) -> (ProjectId, Vec<Episode>, Vec<Milestone>, Vec<CalendarEvent>) {
        (self.project_id, self.episodes, self.milestones, self.calendar_events)
    }

    fn milestone_mut(&mut self, id: &str) -> Result<&mut Milestone, ScheduleError> {
        match self.milestone_index.get(id) {
            Some(&i) => Ok(&mut self.milestones[i]),
            None => Err(ScheduleError::not_found(format!("Milestone {id}"))),
        }
    }
}
