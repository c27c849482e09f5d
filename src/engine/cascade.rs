//! 级联推演（what-if 预览）
//!
//! 评估器只报告直接后继的被迫移动；这里在状态副本上反复调用评估器：
//! 把被迫移动的后继挪到其前置的新日期，再检查它的后继，直到没有新警告或达到深度上限。
//! 后继挪动后若违反其它前置（error），记录为受阻，不再往下推。

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::catalog::MilestoneCatalog;
use crate::core::ScheduleError;
use crate::engine::evaluator::{
    describe_milestone, ConflictKind, DependencyEvaluator, ScheduleConflict, Severity,
};
use crate::schedule::{MilestoneId, ScheduleState};

/// 推演出的一次被迫移动
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeShift {
    pub milestone_id: MilestoneId,
    /// "Episode 304 Director's Cut (DC)"
    pub label: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    /// 1 表示被直接移动的里程碑的直接后继
    pub depth: usize,
}

/// 推演结果；不会写回真实状态
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadePlan {
    pub shifts: Vec<CascadeShift>,
    /// 挪动后仍违反前置顺序的冲突
    pub blocked: Vec<ScheduleConflict>,
    /// 因深度上限而停止
    pub truncated: bool,
}

impl CascadePlan {
    pub fn is_empty(&self) -> bool {
        self.shifts.is_empty() && self.blocked.is_empty() && !self.truncated
    }
}

/// 在 `state` 的副本上推演移动 `milestone_id` 到 `date` 的完整级联
pub fn simulate(
    catalog: &MilestoneCatalog,
    state: &ScheduleState,
    milestone_id: &str,
    date: NaiveDate,
    max_depth: usize,
) -> Result<CascadePlan, ScheduleError> {
    if state.milestone(milestone_id).is_none() {
        return Err(ScheduleError::not_found(format!("Milestone {milestone_id}")));
    }

    let mut scratch = state.clone();
    let mut plan = CascadePlan::default();
    // 每个里程碑被推到的最晚日期；只有更晚的日期才会再次入队
    let mut settled: HashMap<MilestoneId, NaiveDate> = HashMap::new();
    let mut queue = VecDeque::from([(milestone_id.to_string(), date, 0usize)]);

    while let Some((id, target, depth)) = queue.pop_front() {
        let Some(milestone) = scratch.milestone(&id).cloned() else {
            continue;
        };
        let conflicts = DependencyEvaluator::new(catalog, &scratch).check_move(&milestone, target);

        if depth > 0 {
            let blocking: Vec<_> = conflicts
                .iter()
                .filter(|c| c.severity == Severity::Error)
                .cloned()
                .collect();
            if !blocking.is_empty() {
                plan.blocked.extend(blocking);
                continue;
            }
            if let Some(from) = milestone.scheduled_date {
                plan.shifts.retain(|s| s.milestone_id != id);
                plan.shifts.push(CascadeShift {
                    milestone_id: id.clone(),
                    label: describe_milestone(catalog, state, &milestone),
                    from: state
                        .milestone(&id)
                        .and_then(|m| m.scheduled_date)
                        .unwrap_or(from),
                    to: target,
                    depth,
                });
            }
        }
        scratch.apply_date(&id, target)?;

        let forced: Vec<MilestoneId> = conflicts
            .iter()
            .filter(|c| c.kind == ConflictKind::Dependency && c.severity == Severity::Warning)
            .filter_map(|c| c.affected_milestone_ids.get(1).cloned())
            .collect();
        if forced.is_empty() {
            continue;
        }
        if depth >= max_depth {
            plan.truncated = true;
            continue;
        }
        for dependent in forced {
            if settled.get(&dependent).is_some_and(|d| *d >= target) {
                continue;
            }
            settled.insert(dependent.clone(), target);
            queue.push_back((dependent, target, depth + 1));
        }
    }

    debug!(
        milestone = %milestone_id,
        shifts = plan.shifts.len(),
        blocked = plan.blocked.len(),
        truncated = plan.truncated,
        "cascade simulated"
    );
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::schedule::{Episode, Milestone};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn chain(dates: &[(&str, u32)]) -> (MilestoneCatalog, ScheduleState) {
        let catalog = CatalogBuilder::post_production("p1").build().unwrap();
        let episode = Episode::new("p1", "101", 1);
        let milestones = dates
            .iter()
            .map(|(code, day)| {
                Milestone::new(
                    episode.id.clone(),
                    catalog.get(code).unwrap().id.clone(),
                    Some(date(4, *day)),
                )
            })
            .collect();
        (catalog, ScheduleState::new("p1", vec![episode], milestones, Vec::new()))
    }

    fn id_of(catalog: &MilestoneCatalog, state: &ScheduleState, code: &str) -> String {
        let type_id = &catalog.get(code).unwrap().id;
        state
            .milestones()
            .iter()
            .find(|m| &m.milestone_type_id == type_id)
            .unwrap()
            .id
            .clone()
    }

    #[test]
    fn test_cascade_follows_chain() {
        let (catalog, state) = chain(&[("EC", 1), ("DC", 3), ("PC", 5), ("LOCK", 7)]);
        let ec = id_of(&catalog, &state, "EC");
        let plan = simulate(&catalog, &state, &ec, date(4, 6), 8).unwrap();

        let moved: Vec<_> = plan.shifts.iter().map(|s| (s.depth, s.to)).collect();
        assert_eq!(moved, vec![(1, date(4, 6)), (2, date(4, 6))]);
        assert!(plan.blocked.is_empty());
        assert!(!plan.truncated);
        // 真实状态不变
        assert_eq!(state.milestone(&ec).unwrap().scheduled_date, Some(date(4, 1)));
    }

    #[test]
    fn test_cascade_depth_guard() {
        let (catalog, state) = chain(&[("EC", 1), ("DC", 2), ("PC", 3), ("LOCK", 4)]);
        let ec = id_of(&catalog, &state, "EC");
        let plan = simulate(&catalog, &state, &ec, date(4, 10), 1).unwrap();
        assert_eq!(plan.shifts.len(), 1);
        assert!(plan.truncated);
    }

    #[test]
    fn test_cascade_unknown_milestone() {
        let (catalog, state) = chain(&[("EC", 1)]);
        assert!(simulate(&catalog, &state, "missing", date(4, 2), 8).is_err());
    }

    #[test]
    fn test_cascade_blocked_by_other_prerequisite() {
        // COLOR 已在 4/20，DELIVERY 被 VFX/MIX 推到 4/10 后违反 COLOR
        let (catalog, state) = chain(&[
            ("LOCK", 1),
            ("VFX", 2),
            ("MIX", 3),
            ("COLOR", 20),
            ("DELIVERY", 5),
        ]);
        let lock = id_of(&catalog, &state, "LOCK");
        let delivery = id_of(&catalog, &state, "DELIVERY");
        let color = id_of(&catalog, &state, "COLOR");
        let plan = simulate(&catalog, &state, &lock, date(4, 10), 8).unwrap();

        let moved: Vec<_> = plan.shifts.iter().map(|s| s.milestone_id.clone()).collect();
        assert_eq!(
            moved,
            vec![id_of(&catalog, &state, "VFX"), id_of(&catalog, &state, "MIX")]
        );
        assert!(!moved.contains(&delivery));

        assert_eq!(plan.blocked.len(), 1);
        let blocked = &plan.blocked[0];
        assert_eq!(blocked.severity, Severity::Error);
        assert_eq!(blocked.affected_milestone_ids, vec![delivery, color]);
        assert!(!plan.truncated);
        assert!(!plan.is_empty());
    }

    #[test]
    fn test_cascade_diamond_shifts_join_once() {
        // LOCK → VFX/MIX/COLOR → DELIVERY
        let (catalog, state) = chain(&[
            ("LOCK", 1),
            ("VFX", 2),
            ("MIX", 2),
            ("COLOR", 2),
            ("DELIVERY", 3),
        ]);
        let lock = id_of(&catalog, &state, "LOCK");
        let delivery = id_of(&catalog, &state, "DELIVERY");
        let plan = simulate(&catalog, &state, &lock, date(4, 10), 8).unwrap();

        assert_eq!(plan.shifts.len(), 4);
        let joins: Vec<_> = plan
            .shifts
            .iter()
            .filter(|s| s.milestone_id == delivery)
            .collect();
        assert_eq!(joins.len(), 1);
        assert_eq!(joins[0].depth, 2);
        assert_eq!((joins[0].from, joins[0].to), (date(4, 3), date(4, 10)));
        assert!(plan.shifts.iter().all(|s| s.to == date(4, 10)));
        assert!(plan.blocked.is_empty());
    }
}
