//! 项目会话：一个项目的目录 + 排期状态 + 引擎选项
//!
//! 显式传递、独占持有，不使用全局状态。并发访问通过 ProjectRegistry 的逐项目锁串行化。

use crate::catalog::MilestoneCatalog;
use crate::config::EngineSection;
use crate::core::ScheduleError;
use crate::engine::evaluator::describe_milestone;
use crate::schedule::{Milestone, ScheduleState};

/// 引擎行为选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// 移动时附加日历/截止提示
    pub calendar_advisories: bool,
    /// what-if 级联推演的最大深度
    pub max_cascade_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            calendar_advisories: true,
            max_cascade_depth: 8,
        }
    }
}

impl From<&EngineSection> for EngineOptions {
    fn from(section: &EngineSection) -> Self {
        Self {
            calendar_advisories: section.calendar_advisories,
            max_cascade_depth: section.max_cascade_depth,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProjectSession {
    pub(crate) catalog: MilestoneCatalog,
    pub(crate) state: ScheduleState,
    pub(crate) options: EngineOptions,
}

impl ProjectSession {
    /// 组合目录与状态；项目不一致或里程碑引用失效时拒绝
    pub fn new(catalog: MilestoneCatalog, state: ScheduleState) -> Result<Self, ScheduleError> {
        if catalog.project_id() != state.project_id() {
            return Err(ScheduleError::Snapshot(format!(
                "catalog belongs to project {}, schedule to {}",
                catalog.project_id(),
                state.project_id()
            )));
        }
        state.validate(&catalog)?;
        Ok(Self {
            catalog,
            state,
            options: EngineOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn project_id(&self) -> &str {
        self.state.project_id()
    }

    pub fn catalog(&self) -> &MilestoneCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &ScheduleState {
        &self.state
    }

    /// 可变状态访问，仅用于不需要依赖校验的字段（状态、备注）及数据装载
    pub fn state_mut(&mut self) -> &mut ScheduleState {
        &mut self.state
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// "Episode 304 Director's Cut (DC)"
    pub fn describe(&self, milestone: &Milestone) -> String {
        describe_milestone(&self.catalog, &self.state, milestone)
    }

    /// 类型代码列表（按 sort_order），供提示与 LLM 上下文使用
    pub fn type_codes(&self) -> Vec<String> {
        self.catalog.iter().map(|t| t.code.clone()).collect()
    }
}
