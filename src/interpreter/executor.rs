//! 意图执行
//!
//! 移动 / what-if 交给事务；查询类意图直接读排期状态生成文本报告。

use std::fmt;

use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::core::{ProjectSession, ScheduleError};
use crate::engine::{move_milestone, what_if, MoveResult, Severity};
use crate::interpreter::intent::{Intent, ListKind};
use crate::interpreter::resolver::{resolve_date, resolve_episode, resolve_target};
use crate::schedule::persistence::{ProjectSnapshot, SnapshotFile};
use crate::schedule::Milestone;

/// 执行结果
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// 移动或 what-if 的事务结果
    Move(MoveResult),
    /// 查询报告
    Report { title: String, lines: Vec<String> },
    /// 直接字段更新（状态、备注）
    Updated { message: String },
    /// 需要用户澄清
    Clarify { message: String },
    /// 操作失败（如快照写入失败），排期未改变
    Failed { message: String },
}

impl Reply {
    /// 是否修改了排期（调用方据此决定是否持久化）
    pub fn mutated(&self) -> bool {
        match self {
            Self::Move(result) => result.updated.is_some(),
            Self::Updated { .. } => true,
            _ => false,
        }
    }

    pub fn success(&self) -> bool {
        match self {
            Self::Move(result) => result.success,
            Self::Report { .. } | Self::Updated { .. } => true,
            Self::Clarify { .. } | Self::Failed { .. } => false,
        }
    }

    fn report(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self::Report {
            title: title.into(),
            lines,
        }
    }
}

impl From<ScheduleError> for Reply {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::UnparseableDate(text) => Self::Clarify {
                message: format!(
                    "Could not understand the date \"{text}\". Try a weekday, \"tomorrow\", \"next week\" or M/D."
                ),
            },
            other => Self::Move(other.into()),
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move(result) => {
                let mark = if result.success { "ok" } else { "rejected" };
                writeln!(f, "[{mark}] {}", result.message)?;
                for conflict in &result.conflicts {
                    let level = match conflict.severity {
                        Severity::Error => "error",
                        Severity::Warning => "warning",
                        Severity::Info => "info",
                    };
                    writeln!(f, "  {level}: {}", conflict.message)?;
                    if let Some(hint) = &conflict.suggested_resolution {
                        writeln!(f, "    -> {hint}")?;
                    }
                }
                if let Some(plan) = &result.cascade {
                    writeln!(f, "  cascade preview:")?;
                    for shift in &plan.shifts {
                        writeln!(
                            f,
                            "    {}{} {} -> {}",
                            "  ".repeat(shift.depth.saturating_sub(1)),
                            shift.label,
                            shift.from,
                            shift.to
                        )?;
                    }
                    for blocked in &plan.blocked {
                        writeln!(f, "    blocked: {}", blocked.message)?;
                    }
                    if plan.truncated {
                        writeln!(f, "    (stopped at depth limit)")?;
                    }
                }
                Ok(())
            }
            Self::Report { title, lines } => {
                writeln!(f, "{title}")?;
                if lines.is_empty() {
                    writeln!(f, "  (nothing)")?;
                }
                for line in lines {
                    writeln!(f, "  {line}")?;
                }
                Ok(())
            }
            Self::Updated { message } | Self::Clarify { message } => writeln!(f, "{message}"),
            Self::Failed { message } => writeln!(f, "[failed] {message}"),
        }
    }
}

const HELP_LINES: [&str; 10] = [
    "move 304 LOCK to Friday",
    "what if 304 EC moves to 12/20",
    "mark 304 LOCK as done",
    "note 304 VFX: waiting on shot 12",
    "what's due this week / next week",
    "what's late?",
    "what's blocking 304?",
    "show 304",
    "list episodes | types | milestones [for 304] | events",
    "help",
];

/// 执行意图；`today` 为相对日期与逾期判断的参考日
pub fn execute(session: &mut ProjectSession, intent: &Intent, today: NaiveDate) -> Reply {
    match run(session, intent, today) {
        Ok(reply) => reply,
        Err(err) => err.into(),
    }
}

/// 执行并落盘：修改先作用在会话副本上，快照写入成功后才替换原会话
///
/// 写入失败时返回 `Reply::Failed`，原会话保持不变。
pub fn execute_and_save(
    session: &mut ProjectSession,
    intent: &Intent,
    today: NaiveDate,
    file: &SnapshotFile,
    project_name: &str,
) -> Reply {
    if !intent.is_mutation() {
        return execute(session, intent, today);
    }

    let mut draft = session.clone();
    let reply = execute(&mut draft, intent, today);
    if !reply.mutated() {
        return reply;
    }

    match file.save(&ProjectSnapshot::from_session(&draft, project_name)) {
        Ok(()) => {
            *session = draft;
            reply
        }
        Err(e) => {
            warn!(error = %e, path = %file.path().display(), "snapshot save failed, change discarded");
            Reply::Failed {
                message: format!("Change not saved: {e:#}"),
            }
        }
    }
}

fn run(session: &mut ProjectSession, intent: &Intent, today: NaiveDate) -> Result<Reply, ScheduleError> {
    match intent {
        Intent::Move {
            episode_ref,
            milestone_code,
            date_text,
        } => {
            let milestone_id = resolve_target(session, episode_ref, milestone_code)?
                .milestone
                .id
                .clone();
            let date = resolve_date(date_text, today)?;
            Ok(Reply::Move(move_milestone(session, &milestone_id, date)))
        }
        Intent::WhatIf {
            episode_ref,
            milestone_code,
            date_text,
        } => {
            let target = resolve_target(session, episode_ref, milestone_code)?;
            let date = resolve_date(date_text, today)?;
            Ok(Reply::Move(what_if(session, &target.milestone.id, date)))
        }
        Intent::SetStatus {
            episode_ref,
            milestone_code,
            status,
        } => {
            let target = resolve_target(session, episode_ref, milestone_code)?;
            let milestone_id = target.milestone.id.clone();
            let message = format!(
                "Episode {} {} marked {}",
                target.episode.number,
                target.milestone_type.code,
                status.as_str()
            );
            session.state_mut().update_status(&milestone_id, *status)?;
            info!(milestone = %milestone_id, status = status.as_str(), "milestone status updated");
            Ok(Reply::Updated { message })
        }
        Intent::Note {
            episode_ref,
            milestone_code,
            text,
        } => {
            let target = resolve_target(session, episode_ref, milestone_code)?;
            let milestone_id = target.milestone.id.clone();
            let message = format!(
                "Episode {} {} note {}",
                target.episode.number,
                target.milestone_type.code,
                if text.is_some() { "saved" } else { "cleared" }
            );
            session.state_mut().set_notes(&milestone_id, text.clone())?;
            Ok(Reply::Updated { message })
        }
        Intent::ShowThisWeek => Ok(week_report(session, "This week", week_start(today))),
        Intent::ShowNextWeek => {
            let start = week_start(today)
                .checked_add_days(Days::new(7))
                .unwrap_or(today);
            Ok(week_report(session, "Next week", start))
        }
        Intent::ShowEpisode { episode_ref } => episode_report(session, episode_ref),
        Intent::Late => Ok(late_report(session, today)),
        Intent::Blocking { episode_ref } => blocking_report(session, episode_ref),
        Intent::List { kind, episode_ref } => list_report(session, *kind, episode_ref.as_deref()),
        Intent::Help => Ok(Reply::report(
            "Things you can say:",
            HELP_LINES.iter().map(|s| s.to_string()).collect(),
        )),
        Intent::Unknown { raw } => Ok(Reply::Clarify {
            message: format!("I didn't understand \"{raw}\". Type \"help\" for examples."),
        }),
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = u64::from(date.weekday().num_days_from_monday());
    date.checked_sub_days(Days::new(offset)).unwrap_or(date)
}

/// "2024-03-08  Episode 304 Director's Cut (DC)  [scheduled]"
fn milestone_line(session: &ProjectSession, milestone: &Milestone) -> String {
    let date = milestone
        .scheduled_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    format!(
        "{date}  {}  [{}]",
        session.describe(milestone),
        milestone.status.as_str()
    )
}

/// 按日期、剧集顺序、类型顺序排序
fn sorted<'a>(session: &ProjectSession, mut milestones: Vec<&'a Milestone>) -> Vec<&'a Milestone> {
    let episode_order = |m: &Milestone| {
        session
            .state()
            .episode(&m.episode_id)
            .map_or(i32::MAX, |e| e.sort_order)
    };
    let type_order = |m: &Milestone| {
        session
            .catalog()
            .get_by_id(&m.milestone_type_id)
            .map_or(i32::MAX, |t| t.sort_order)
    };
    milestones.sort_by_key(|m| (m.scheduled_date, episode_order(*m), type_order(*m)));
    milestones
}

fn week_report(session: &ProjectSession, label: &str, start: NaiveDate) -> Reply {
    let end = start.checked_add_days(Days::new(6)).unwrap_or(start);
    let due: Vec<_> = session
        .state()
        .milestones()
        .iter()
        .filter(|m| m.scheduled_date.is_some_and(|d| start <= d && d <= end))
        .collect();
    let lines = sorted(session, due)
        .into_iter()
        .map(|m| milestone_line(session, m))
        .collect();
    Reply::report(format!("{label} ({start} to {end}):"), lines)
}

fn episode_report(session: &ProjectSession, episode_ref: &str) -> Result<Reply, ScheduleError> {
    let episode = resolve_episode(session, episode_ref)?;
    let mut lines = Vec::new();
    for milestone_type in session.catalog().iter() {
        if let Some(m) = session.state().milestone_for(&episode.id, &milestone_type.id) {
            let date = m
                .scheduled_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "unscheduled".to_string());
            let mut line = format!(
                "{:<9} {:<18} {date}  [{}]",
                milestone_type.code,
                milestone_type.name,
                m.status.as_str()
            );
            if let Some(notes) = &m.notes {
                line.push_str(&format!("  note: {notes}"));
            }
            lines.push(line);
        }
    }
    Ok(Reply::report(
        format!("Episode {} ({}):", episode.number, episode.status),
        lines,
    ))
}

fn late_report(session: &ProjectSession, today: NaiveDate) -> Reply {
    let late: Vec<_> = session
        .state()
        .milestones()
        .iter()
        .filter(|m| !m.status.is_closed() && m.scheduled_date.is_some_and(|d| d < today))
        .collect();
    let lines = sorted(session, late)
        .into_iter()
        .map(|m| milestone_line(session, m))
        .collect();
    Reply::report(format!("Late as of {today}:"), lines)
}

/// 未完成、且是本集其它未完成里程碑前置的里程碑
fn blocking_report(session: &ProjectSession, episode_ref: &str) -> Result<Reply, ScheduleError> {
    let episode = resolve_episode(session, episode_ref)?;
    let catalog = session.catalog();
    let state = session.state();
    let open = |code: &str| {
        catalog
            .get(code)
            .and_then(|t| state.milestone_for(&episode.id, &t.id))
            .is_some_and(|m| !m.status.is_closed())
    };

    let mut lines = Vec::new();
    for milestone_type in catalog.iter() {
        if !open(&milestone_type.code) {
            continue;
        }
        let waiting: Vec<_> = catalog
            .dependents_of(&milestone_type.code)
            .into_iter()
            .filter(|t| open(&t.code))
            .map(|t| t.code.clone())
            .collect();
        if waiting.is_empty() {
            continue;
        }
        if let Some(m) = state.milestone_for(&episode.id, &milestone_type.id) {
            lines.push(format!("{} blocks {}", milestone_line(session, m), waiting.join(", ")));
        }
    }
    Ok(Reply::report(
        format!("Blocking episode {}:", episode.number),
        lines,
    ))
}

fn list_report(session: &ProjectSession, kind: ListKind, episode_ref: Option<&str>) -> Result<Reply, ScheduleError> {
    let state = session.state();
    let reply = match kind {
        ListKind::Episodes => Reply::report(
            "Episodes:",
            state
                .episodes()
                .iter()
                .map(|e| format!("{} ({})", e.number, e.status))
                .collect(),
        ),
        ListKind::Types => Reply::report(
            "Milestone types:",
            session
                .catalog()
                .iter()
                .map(|t| {
                    let mut line = format!("{:<9} {}", t.code, t.name);
                    if !t.requires_completion_of.is_empty() {
                        line.push_str(&format!("  requires {}", t.requires_completion_of.join(", ")));
                    }
                    if t.is_hard_deadline {
                        line.push_str("  [hard deadline]");
                    }
                    line
                })
                .collect(),
        ),
        ListKind::Milestones => {
            let (title, milestones): (String, Vec<&Milestone>) = match episode_ref {
                Some(reference) => {
                    let episode = resolve_episode(session, reference)?;
                    (
                        format!("Milestones for episode {}:", episode.number),
                        state.milestones_of_episode(&episode.id).collect(),
                    )
                }
                None => ("Milestones:".to_string(), state.milestones().iter().collect()),
            };
            let lines = sorted(session, milestones)
                .into_iter()
                .map(|m| milestone_line(session, m))
                .collect();
            Reply::report(title, lines)
        }
        ListKind::Events => Reply::report(
            "Calendar events:",
            state
                .calendar_events()
                .iter()
                .map(|e| {
                    let span = match e.end_date {
                        Some(end) if end != e.start_date => format!("{} to {end}", e.start_date),
                        _ => e.start_date.to_string(),
                    };
                    format!("{span}  {} ({:?})", e.name, e.event_type)
                })
                .collect(),
        ),
    };
    Ok(reply)
}
