//! 指令意图
//!
//! 模式解析器与 LLM 助手都产出同一种 Intent，之后统一走解析目标 → 事务校验。

use serde::{Deserialize, Serialize};

use crate::schedule::MilestoneStatus;

/// 识别出的意图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case")]
pub enum Intent {
    /// 移动里程碑（校验后应用）
    Move {
        episode_ref: String,
        milestone_code: String,
        date_text: String,
    },
    /// 只分析不应用
    WhatIf {
        episode_ref: String,
        milestone_code: String,
        date_text: String,
    },
    ShowThisWeek,
    ShowNextWeek,
    ShowEpisode {
        episode_ref: String,
    },
    Late,
    Blocking {
        episode_ref: String,
    },
    List {
        kind: ListKind,
        #[serde(default)]
        episode_ref: Option<String>,
    },
    /// 直接改状态，不需要依赖校验
    SetStatus {
        episode_ref: String,
        milestone_code: String,
        status: MilestoneStatus,
    },
    /// 设置备注；text 为空表示清除
    Note {
        episode_ref: String,
        milestone_code: String,
        #[serde(default)]
        text: Option<String>,
    },
    Help,
    /// 无法识别，原样保留
    Unknown {
        raw: String,
    },
}

impl Intent {
    pub fn unknown(raw: impl Into<String>) -> Self {
        Self::Unknown { raw: raw.into() }
    }

    /// 是否可能修改排期
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::SetStatus { .. } | Self::Note { .. }
        )
    }
}

/// List 的对象
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Episodes,
    Types,
    Milestones,
    Events,
}

impl ListKind {
    pub fn parse(text: &str) -> Option<Self> {
        let lower = text.trim().to_lowercase();
        match lower.as_str() {
            "episodes" | "eps" => Some(Self::Episodes),
            "types" | "milestone types" => Some(Self::Types),
            "milestones" => Some(Self::Milestones),
            "events" | "calendar" | "calendar events" => Some(Self::Events),
            _ => None,
        }
    }
}
