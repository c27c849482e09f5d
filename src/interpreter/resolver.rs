//! 目标解析：剧集引用 + 类型代码 → 里程碑；日期文本 → 日期
//!
//! 任何一步失败都返回描述性错误，不会 panic。

use chrono::NaiveDate;

use crate::catalog::MilestoneType;
use crate::core::{ProjectSession, ScheduleError};
use crate::dates;
use crate::schedule::{Episode, Milestone};

/// 解析出的目标里程碑
#[derive(Debug, Clone, Copy)]
pub struct ResolvedTarget<'a> {
    pub episode: &'a Episode,
    pub milestone_type: &'a MilestoneType,
    pub milestone: &'a Milestone,
}

pub fn resolve_episode<'a>(session: &'a ProjectSession, episode_ref: &str) -> Result<&'a Episode, ScheduleError> {
    session
        .state()
        .find_episode(episode_ref)
        .ok_or_else(|| ScheduleError::not_found(format!("Episode {episode_ref}")))
}

/// 剧集 → 类型 → 里程碑
pub fn resolve_target<'a>(
    session: &'a ProjectSession,
    episode_ref: &str,
    milestone_code: &str,
) -> Result<ResolvedTarget<'a>, ScheduleError> {
    let episode = resolve_episode(session, episode_ref)?;
    let milestone_type = session.catalog().get(milestone_code).ok_or_else(|| {
        ScheduleError::not_found(format!(
            "Milestone type {} (known types: {})",
            milestone_code.to_uppercase(),
            session.type_codes().join(", ")
        ))
    })?;
    let milestone = session
        .state()
        .milestone_for(&episode.id, &milestone_type.id)
        .ok_or_else(|| {
            ScheduleError::not_found(format!(
                "{} milestone for episode {}",
                milestone_type.code, episode.number
            ))
        })?;

    Ok(ResolvedTarget {
        episode,
        milestone_type,
        milestone,
    })
}

/// 日期文本解析失败时返回澄清错误，绝不默认到某天
pub fn resolve_date(date_text: &str, today: NaiveDate) -> Result<NaiveDate, ScheduleError> {
    dates::resolve(date_text, today).ok_or_else(|| ScheduleError::UnparseableDate(date_text.trim().to_string()))
}
