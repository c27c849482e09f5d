//! 里程碑类型定义
//!
//! 每个项目一套类型目录；类型之间通过 `requires_completion_of`（按代码）声明前置关系。

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type ProjectId = String;
pub type MilestoneTypeId = String;
/// 类型代码（项目内唯一，如 `EC`、`LOCK`）
pub type TypeCode = String;

/// 里程碑类型（如 "Editor's Cut"）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneType {
    pub id: MilestoneTypeId,
    pub project_id: ProjectId,
    pub code: TypeCode,
    pub name: String,
    pub sort_order: i32,
    /// 硬性截止（如交付），推迟时给出 deadline 提示
    #[serde(default)]
    pub is_hard_deadline: bool,
    /// 有序的前置类型代码
    #[serde(default)]
    pub requires_completion_of: Vec<TypeCode>,
}

impl MilestoneType {
    pub fn new(
        project_id: impl Into<ProjectId>,
        code: impl Into<TypeCode>,
        name: impl Into<String>,
        sort_order: i32,
    ) -> Self {
        let code = code.into();
        Self {
            id: format!("mt_{}", uuid::Uuid::new_v4()),
            project_id: project_id.into(),
            code: code.to_uppercase(),
            name: name.into(),
            sort_order,
            is_hard_deadline: false,
            requires_completion_of: Vec::new(),
        }
    }

    pub fn hard_deadline(mut self) -> Self {
        self.is_hard_deadline = true;
        self
    }

    pub fn requires<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TypeCode>,
    {
        self.requires_completion_of = codes.into_iter().map(|c| c.into().to_uppercase()).collect();
        self
    }
}

/// 目录加载错误（配置错误，加载时即拒绝，不会静默丢弃边）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Duplicate milestone type code: {0}")]
    DuplicateCode(TypeCode),

    #[error("Milestone type {0} lists itself as a prerequisite")]
    SelfReference(TypeCode),

    #[error("Milestone type {code} requires unknown type {missing}")]
    UnknownPrerequisite { code: TypeCode, missing: TypeCode },

    #[error("Cyclic prerequisite relation among: {}", .0.join(", "))]
    Cycle(Vec<TypeCode>),

    #[error("Milestone type {code} belongs to project {found}, expected {expected}")]
    ForeignProject {
        code: TypeCode,
        expected: ProjectId,
        found: ProjectId,
    },
}
