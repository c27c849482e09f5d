//! 移动事务
//!
//! 查找 → 校验（评估器）→ 应用或拒绝。what-if 只走前两步，永远不会修改状态。

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::{ProjectSession, ScheduleError};
use crate::engine::cascade::{self, CascadePlan};
use crate::engine::evaluator::{has_blocking, DependencyEvaluator, ScheduleConflict};
use crate::schedule::MilestoneUpdate;

/// 事务结果，展示层直接消费
#[derive(Debug, Clone, Serialize)]
pub struct MoveResult {
    pub success: bool,
    pub message: String,
    pub conflicts: Vec<ScheduleConflict>,
    /// 成功应用后交给持久化方的记录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<MilestoneUpdate>,
    /// what-if 的级联预览
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cascade: Option<CascadePlan>,
}

impl MoveResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            conflicts: Vec::new(),
            updated: None,
            cascade: None,
        }
    }
}

impl From<ScheduleError> for MoveResult {
    fn from(err: ScheduleError) -> Self {
        let conflicts = err.conflicts().to_vec();
        Self {
            conflicts,
            ..Self::failure(err.to_string())
        }
    }
}

/// 移动里程碑；有 error 级冲突时拒绝且不修改任何字段
pub fn move_milestone(session: &mut ProjectSession, milestone_id: &str, new_date: NaiveDate) -> MoveResult {
    match try_move(session, milestone_id, new_date) {
        Ok(result) => result,
        Err(err) => {
            warn!(milestone = %milestone_id, %new_date, error = %err, "move rejected");
            err.into()
        }
    }
}

/// 只分析不应用：查询本身成功即 success=true
pub fn what_if(session: &ProjectSession, milestone_id: &str, new_date: NaiveDate) -> MoveResult {
    match try_what_if(session, milestone_id, new_date) {
        Ok(result) => result,
        Err(err) => err.into(),
    }
}

fn try_move(
    session: &mut ProjectSession,
    milestone_id: &str,
    new_date: NaiveDate,
) -> Result<MoveResult, ScheduleError> {
    let conflicts = analyze(session, milestone_id, new_date)?;
    if has_blocking(&conflicts) {
        return Err(ScheduleError::DependencyConflict(conflicts));
    }

    let update = session.state.apply_date(milestone_id, new_date)?;
    let description = session
        .state
        .milestone(milestone_id)
        .map(|m| session.describe(m))
        .unwrap_or_else(|| milestone_id.to_string());
    info!(
        milestone = %milestone_id,
        %new_date,
        warnings = conflicts.len(),
        "milestone moved"
    );

    Ok(MoveResult {
        success: true,
        message: format!("Moved {description} to {new_date}"),
        conflicts,
        updated: Some(update),
        cascade: None,
    })
}

fn try_what_if(
    session: &ProjectSession,
    milestone_id: &str,
    new_date: NaiveDate,
) -> Result<MoveResult, ScheduleError> {
    let conflicts = analyze(session, milestone_id, new_date)?;
    let description = session
        .state
        .milestone(milestone_id)
        .map(|m| session.describe(m))
        .unwrap_or_else(|| milestone_id.to_string());

    let message = if conflicts.is_empty() {
        format!("No conflicts: {description} can move to {new_date}")
    } else if has_blocking(&conflicts) {
        format!(
            "Moving {description} to {new_date} would be blocked by {} conflict(s)",
            conflicts.len()
        )
    } else {
        format!(
            "Moving {description} to {new_date} is allowed with {} warning(s)",
            conflicts.len()
        )
    };

    let cascade = cascade::simulate(
        &session.catalog,
        &session.state,
        milestone_id,
        new_date,
        session.options.max_cascade_depth,
    )?;

    Ok(MoveResult {
        success: true,
        message,
        conflicts,
        updated: None,
        cascade: (!cascade.is_empty()).then_some(cascade),
    })
}

/// 查找 + 校验：依赖冲突在前，日历/截止提示在后
fn analyze(
    session: &ProjectSession,
    milestone_id: &str,
    new_date: NaiveDate,
) -> Result<Vec<ScheduleConflict>, ScheduleError> {
    let milestone = session
        .state
        .milestone(milestone_id)
        .ok_or_else(|| ScheduleError::not_found(format!("Milestone {milestone_id}")))?;

    let evaluator = DependencyEvaluator::new(&session.catalog, &session.state);
    let mut conflicts = evaluator.check_move(milestone, new_date);
    if session.options.calendar_advisories {
        conflicts.extend(evaluator.check_advisories(milestone, new_date));
    }
    Ok(conflicts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::engine::evaluator::Severity;
    use crate::schedule::{Episode, Milestone, ScheduleState};

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn session() -> (ProjectSession, String, String) {
        let catalog = CatalogBuilder::new("p1")
            .milestone_type("EC", "Editor's Cut")
            .milestone_type("DC", "Director's Cut")
            .requires("DC", ["EC"])
            .build()
            .unwrap();
        let episode = Episode::new("p1", "304", 1);
        let ec = Milestone::new(episode.id.clone(), catalog.get("EC").unwrap().id.clone(), Some(date(5, 6)));
        let dc = Milestone::new(episode.id.clone(), catalog.get("DC").unwrap().id.clone(), Some(date(5, 10)));
        let (ec_id, dc_id) = (ec.id.clone(), dc.id.clone());
        let state = ScheduleState::new("p1", vec![episode], vec![ec, dc], Vec::new());
        (ProjectSession::new(catalog, state).unwrap(), ec_id, dc_id)
    }

    #[test]
    fn test_move_not_found() {
        let (mut session, _, _) = session();
        let result = move_milestone(&mut session, "nope", date(5, 1));
        assert!(!result.success);
        assert!(result.message.contains("not found"));
    }

    #[test]
    fn test_move_rejected_leaves_state_unchanged() {
        let (mut session, _, dc) = session();
        let before = session.state().milestone(&dc).unwrap().clone();
        let result = move_milestone(&mut session, &dc, date(5, 3));
        assert!(!result.success);
        assert_eq!(result.message, "Cannot move due to dependency conflicts");
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(session.state().milestone(&dc).unwrap(), &before);
    }

    #[test]
    fn test_move_applies_date() {
        let (mut session, _, dc) = session();
        let result = move_milestone(&mut session, &dc, date(5, 8));
        assert!(result.success);
        assert!(result.conflicts.is_empty());
        assert_eq!(session.state().milestone(&dc).unwrap().scheduled_date, Some(date(5, 8)));
        assert_eq!(result.updated.unwrap().scheduled_date, date(5, 8));
        assert!(result.message.contains("Episode 304"));
    }

    #[test]
    fn test_move_with_warning_still_applies() {
        let (mut session, ec, _) = session();
        let result = move_milestone(&mut session, &ec, date(5, 12));
        assert!(result.success);
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].severity, Severity::Warning);
        assert_eq!(session.state().milestone(&ec).unwrap().scheduled_date, Some(date(5, 12)));
    }

    #[test]
    fn test_what_if_never_applies() {
        let (mut session, _, dc) = session();
        let result = what_if(&session, &dc, date(5, 3));
        assert!(result.success);
        assert!(result.conflicts.iter().any(|c| c.severity == Severity::Error));
        assert_eq!(session.state().milestone(&dc).unwrap().scheduled_date, Some(date(5, 10)));

        let ok = what_if(&session, &dc, date(5, 20));
        assert!(ok.message.starts_with("No conflicts"));

        // what-if 之后真实移动仍按原状态校验
        assert!(!move_milestone(&mut session, &dc, date(5, 3)).success);
    }
}
