//! 依赖图评估器
//!
//! 只读借用目录与排期状态，判断把某个里程碑移到新日期是否安全。
//! 只看直接邻居（前置与后继），不做传递闭包：级联由调用方决定是否继续推演。

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{MilestoneCatalog, MilestoneType};
use crate::schedule::{CalendarEventType, Episode, Milestone, MilestoneId, ScheduleState};

/// 冲突类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    Dependency,
    Resource,
    Deadline,
}

/// 严重级别：error 阻止移动，warning / info 仅提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// 评估结果（不持久化）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConflict {
    pub kind: ConflictKind,
    pub severity: Severity,
    pub message: String,
    /// 依赖冲突中第一个是被移动的里程碑，第二个是对方
    pub affected_milestone_ids: Vec<MilestoneId>,
    pub suggested_resolution: Option<String>,
}

impl ScheduleConflict {
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// 是否存在阻止移动的冲突
pub fn has_blocking(conflicts: &[ScheduleConflict]) -> bool {
    conflicts.iter().any(ScheduleConflict::is_blocking)
}

/// 依赖评估器：持有目录与状态的共享借用
pub struct DependencyEvaluator<'a> {
    catalog: &'a MilestoneCatalog,
    state: &'a ScheduleState,
}

impl<'a> DependencyEvaluator<'a> {
    pub fn new(catalog: &'a MilestoneCatalog, state: &'a ScheduleState) -> Self {
        Self { catalog, state }
    }

    /// 检查移动：先前置（error），后后继（warning），均按目录顺序
    pub fn check_move(&self, milestone: &Milestone, proposed: NaiveDate) -> Vec<ScheduleConflict> {
        let Some(milestone_type) = self.catalog.get_by_id(&milestone.milestone_type_id) else {
            debug!(milestone = %milestone.id, "milestone type not in catalog, nothing to check");
            return Vec::new();
        };
        let episode = self.episode_label(milestone);
        let mut conflicts = Vec::new();

        for prereq_type in self.catalog.prerequisites_of(&milestone_type.code) {
            let Some((prereq, prereq_date)) = self.scheduled_sibling(milestone, prereq_type) else {
                continue;
            };
            if prereq_date > proposed {
                conflicts.push(ScheduleConflict {
                    kind: ConflictKind::Dependency,
                    severity: Severity::Error,
                    message: format!(
                        "{episode}: {} on {proposed} would come before its prerequisite {} on {prereq_date}",
                        label(milestone_type),
                        label(prereq_type),
                    ),
                    affected_milestone_ids: vec![milestone.id.clone(), prereq.id.clone()],
                    suggested_resolution: Some(format!(
                        "Move {} to {proposed} or earlier, or move {} to {prereq_date} or later",
                        prereq_type.code, milestone_type.code,
                    )),
                });
            }
        }

        for dependent_type in self.catalog.dependents_of(&milestone_type.code) {
            let Some((dependent, dependent_date)) = self.scheduled_sibling(milestone, dependent_type)
            else {
                continue;
            };
            if dependent_date < proposed {
                let shift = (proposed - dependent_date).num_days();
                conflicts.push(ScheduleConflict {
                    kind: ConflictKind::Dependency,
                    severity: Severity::Warning,
                    message: format!(
                        "{episode}: moving {} to {proposed} forces {} (currently {dependent_date}) to move",
                        label(milestone_type),
                        label(dependent_type),
                    ),
                    affected_milestone_ids: vec![milestone.id.clone(), dependent.id.clone()],
                    suggested_resolution: Some(format!(
                        "Shift {} from {dependent_date} to {proposed} or later (+{shift} day{})",
                        dependent_type.code,
                        if shift == 1 { "" } else { "s" },
                    )),
                });
            }
        }

        debug!(
            milestone = %milestone.id,
            %proposed,
            conflicts = conflicts.len(),
            "dependency check finished"
        );
        conflicts
    }

    /// 附加提示：日历事件（resource）与硬性截止（deadline），永远不会是 error
    pub fn check_advisories(&self, milestone: &Milestone, proposed: NaiveDate) -> Vec<ScheduleConflict> {
        let mut conflicts = Vec::new();
        let name = self
            .catalog
            .get_by_id(&milestone.milestone_type_id)
            .map(label)
            .unwrap_or_else(|| milestone.milestone_type_id.clone());
        let episode = self.episode_label(milestone);

        for event in self.state.calendar_events() {
            if !event.affects_all || !event.covers(proposed) {
                continue;
            }
            let severity = match event.event_type {
                CalendarEventType::Holiday | CalendarEventType::Block => Severity::Warning,
                CalendarEventType::Hold => Severity::Info,
                CalendarEventType::Note => continue,
            };
            conflicts.push(ScheduleConflict {
                kind: ConflictKind::Resource,
                severity,
                message: format!("{episode}: {name} on {proposed} falls on {}", event.name),
                affected_milestone_ids: vec![milestone.id.clone()],
                suggested_resolution: Some(format!("Pick a date outside {}", event.name)),
            });
        }

        if let Some(milestone_type) = self.catalog.get_by_id(&milestone.milestone_type_id) {
            if milestone_type.is_hard_deadline {
                if let Some(current) = milestone.scheduled_date.filter(|d| *d < proposed) {
                    conflicts.push(ScheduleConflict {
                        kind: ConflictKind::Deadline,
                        severity: Severity::Warning,
                        message: format!(
                            "{episode}: {name} is a hard deadline; moving it from {current} to {proposed} pushes it later"
                        ),
                        affected_milestone_ids: vec![milestone.id.clone()],
                        suggested_resolution: Some(format!(
                            "Confirm the new {} date with the network or distributor",
                            milestone_type.code
                        )),
                    });
                }
            }
        }

        conflicts
    }

    /// 同一剧集中该类型、且已排期的里程碑
    fn scheduled_sibling(
        &self,
        milestone: &Milestone,
        sibling_type: &MilestoneType,
    ) -> Option<(&'a Milestone, NaiveDate)> {
        let sibling = self
            .state
            .milestone_for(&milestone.episode_id, &sibling_type.id)?;
        sibling.scheduled_date.map(|date| (sibling, date))
    }

    fn episode_label(&self, milestone: &Milestone) -> String {
        self.state
            .episode(&milestone.episode_id)
            .map(episode_label)
            .unwrap_or_else(|| format!("Episode {}", milestone.episode_id))
    }
}

pub(crate) fn label(milestone_type: &MilestoneType) -> String {
    format!("{} ({})", milestone_type.name, milestone_type.code)
}

pub(crate) fn episode_label(episode: &Episode) -> String {
    format!("Episode {}", episode.number)
}

/// "Episode 304 Director's Cut (DC)"
pub(crate) fn describe_milestone(
    catalog: &MilestoneCatalog,
    state: &ScheduleState,
    milestone: &Milestone,
) -> String {
    let episode = state
        .episode(&milestone.episode_id)
        .map(episode_label)
        .unwrap_or_else(|| format!("Episode {}", milestone.episode_id));
    let kind = catalog
        .get_by_id(&milestone.milestone_type_id)
        .map(label)
        .unwrap_or_else(|| milestone.milestone_type_id.clone());
    format!("{episode} {kind}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::schedule::{CalendarEvent, Episode};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    /// EC → DC → LOCK
    fn builder() -> CatalogBuilder {
        CatalogBuilder::new("p1")
            .milestone_type("EC", "Editor's Cut")
            .milestone_type("DC", "Director's Cut")
            .milestone_type("LOCK", "Picture Lock")
            .requires("DC", ["EC"])
            .requires("LOCK", ["DC"])
    }

    /// 剧集 304
    fn fixture(ec: NaiveDate, dc: NaiveDate, lock: Option<NaiveDate>) -> (MilestoneCatalog, ScheduleState) {
        fixture_from(builder(), ec, dc, lock)
    }

    fn fixture_from(
        builder: CatalogBuilder,
        ec: NaiveDate,
        dc: NaiveDate,
        lock: Option<NaiveDate>,
    ) -> (MilestoneCatalog, ScheduleState) {
        let catalog = builder.build().unwrap();
        let episode = Episode::new("p1", "304", 1);
        let ms = vec![
            Milestone::new(episode.id.clone(), catalog.get("EC").unwrap().id.clone(), Some(ec)),
            Milestone::new(episode.id.clone(), catalog.get("DC").unwrap().id.clone(), Some(dc)),
            Milestone::new(episode.id.clone(), catalog.get("LOCK").unwrap().id.clone(), lock),
        ];
        let state = ScheduleState::new("p1", vec![episode], ms, Vec::new());
        (catalog, state)
    }

    #[test]
    fn test_prerequisite_after_proposed_is_error() {
        let (catalog, state) = fixture(date(3, 5), date(3, 8), None);
        let dc = &state.milestones()[1];
        let conflicts = DependencyEvaluator::new(&catalog, &state).check_move(dc, date(3, 4));

        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Error);
        assert_eq!(conflicts[0].kind, ConflictKind::Dependency);
        assert!(conflicts[0].message.contains("DC") && conflicts[0].message.contains("EC"));
    }

    #[test]
    fn test_same_day_as_prerequisite_is_allowed() {
        let (catalog, state) = fixture(date(3, 5), date(3, 8), None);
        let dc = &state.milestones()[1];
        let conflicts = DependencyEvaluator::new(&catalog, &state).check_move(dc, date(3, 5));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_unscheduled_neighbour_is_ignored() {
        let (catalog, state) = fixture(date(3, 5), date(3, 8), None);
        let dc = &state.milestones()[1];
        // LOCK 未排期，推迟 DC 不产生后继警告
        let conflicts = DependencyEvaluator::new(&catalog, &state).check_move(dc, date(3, 20));
        assert!(conflicts.is_empty());
    }

    #[test]
    fn test_later_dependent_is_warning() {
        let (catalog, state) = fixture(date(3, 5), date(3, 8), Some(date(3, 9)));
        let dc = &state.milestones()[1];
        let conflicts = DependencyEvaluator::new(&catalog, &state).check_move(dc, date(3, 10));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].severity, Severity::Warning);
        assert_eq!(conflicts[0].affected_milestone_ids[1], state.milestones()[2].id);
        assert!(conflicts[0].suggested_resolution.as_deref().unwrap().contains("+1 day"));
    }

    #[test]
    fn test_errors_precede_warnings() {
        let (catalog, state) = fixture(date(3, 12), date(3, 8), Some(date(3, 9)));
        let dc = &state.milestones()[1];
        let conflicts = DependencyEvaluator::new(&catalog, &state).check_move(dc, date(3, 11));
        let severities: Vec<_> = conflicts.iter().map(|c| c.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning]);
    }

    #[test]
    fn test_check_is_deterministic() {
        let (catalog, state) = fixture(date(3, 12), date(3, 8), Some(date(3, 9)));
        let dc = &state.milestones()[1];
        let evaluator = DependencyEvaluator::new(&catalog, &state);
        let first = evaluator.check_move(dc, date(3, 11));
        for _ in 0..5 {
            assert_eq!(evaluator.check_move(dc, date(3, 11)), first);
        }
    }

    #[test]
    fn test_holiday_advisory() {
        let (catalog, mut state) = fixture(date(3, 5), date(3, 8), None);
        state.add_calendar_event(CalendarEvent {
            project_id: "p1".into(),
            name: "Studio shutdown".into(),
            event_type: CalendarEventType::Block,
            start_date: date(3, 11),
            end_date: Some(date(3, 15)),
            affects_all: true,
        });
        let dc = state.milestones()[1].clone();
        let evaluator = DependencyEvaluator::new(&catalog, &state);
        let advisories = evaluator.check_advisories(&dc, date(3, 12));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].kind, ConflictKind::Resource);
        assert_eq!(advisories[0].severity, Severity::Warning);
        assert!(evaluator.check_advisories(&dc, date(3, 16)).is_empty());
    }

    fn event(name: &str, event_type: CalendarEventType, day: NaiveDate, affects_all: bool) -> CalendarEvent {
        CalendarEvent {
            project_id: "p1".into(),
            name: name.into(),
            event_type,
            start_date: day,
            end_date: None,
            affects_all,
        }
    }

    #[test]
    fn test_hard_deadline_moved_later_is_warning() {
        let (catalog, state) = fixture_from(
            builder().hard_deadline("LOCK"),
            date(3, 5),
            date(3, 8),
            Some(date(3, 20)),
        );
        let lock = state.milestones()[2].clone();
        let evaluator = DependencyEvaluator::new(&catalog, &state);

        let advisories = evaluator.check_advisories(&lock, date(3, 25));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].kind, ConflictKind::Deadline);
        assert_eq!(advisories[0].severity, Severity::Warning);
        assert!(advisories[0].message.contains("2024-03-20"));
        assert!(evaluator.check_move(&lock, date(3, 25)).is_empty());

        // 提前或不变不提示
        assert!(evaluator.check_advisories(&lock, date(3, 18)).is_empty());
        assert!(evaluator.check_advisories(&lock, date(3, 20)).is_empty());
    }

    #[test]
    fn test_soft_deadline_moved_later_is_silent() {
        let (catalog, state) = fixture(date(3, 5), date(3, 8), Some(date(3, 20)));
        let lock = state.milestones()[2].clone();
        let advisories = DependencyEvaluator::new(&catalog, &state).check_advisories(&lock, date(3, 25));
        assert!(advisories.is_empty());
    }

    #[test]
    fn test_hold_is_info_and_note_is_silent() {
        let (catalog, mut state) = fixture(date(3, 5), date(3, 8), None);
        state.add_calendar_event(event("Mix stage hold", CalendarEventType::Hold, date(3, 12), true));
        state.add_calendar_event(event("Wrap party", CalendarEventType::Note, date(3, 12), true));
        // 只影响部分剧组的事件不参与
        state.add_calendar_event(event("Editor vacation", CalendarEventType::Holiday, date(3, 12), false));
        let dc = state.milestones()[1].clone();

        let advisories = DependencyEvaluator::new(&catalog, &state).check_advisories(&dc, date(3, 12));
        assert_eq!(advisories.len(), 1);
        assert_eq!(advisories[0].kind, ConflictKind::Resource);
        assert_eq!(advisories[0].severity, Severity::Info);
        assert!(advisories[0].message.contains("Mix stage hold"));
    }

    #[test]
    fn test_advisories_never_block() {
        let (catalog, mut state) = fixture_from(
            builder().hard_deadline("LOCK"),
            date(3, 5),
            date(3, 8),
            Some(date(3, 20)),
        );
        for event_type in [
            CalendarEventType::Holiday,
            CalendarEventType::Block,
            CalendarEventType::Hold,
            CalendarEventType::Note,
        ] {
            state.add_calendar_event(event(&format!("{event_type:?}"), event_type, date(3, 25), true));
        }
        let lock = state.milestones()[2].clone();

        let advisories = DependencyEvaluator::new(&catalog, &state).check_advisories(&lock, date(3, 25));
        // holiday + block + hold + deadline
        assert_eq!(advisories.len(), 4);
        assert!(advisories.iter().all(|c| c.severity != Severity::Error));
        assert!(!has_blocking(&advisories));
    }
}
