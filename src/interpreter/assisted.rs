//! LLM 辅助的指令解析
//!
//! 先走模式解析；只有模式解析得到 Unknown 时才请求 LLM 把自由文本翻译成意图 JSON。
//! LLM 产出的意图与模式解析的意图走同一条执行路径，不会绕过依赖校验。

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::interpreter::intent::Intent;
use crate::interpreter::parser::parse;
use crate::llm::{LlmClient, Message};

/// 提示上下文：让 LLM 只在已知代码和集号里选
#[derive(Debug, Clone)]
pub struct PromptContext {
    pub type_codes: Vec<String>,
    pub episode_numbers: Vec<String>,
    pub today: NaiveDate,
}

pub struct AssistedInterpreter {
    llm: Option<Arc<dyn LlmClient>>,
    timeout: Duration,
}

impl AssistedInterpreter {
    pub fn new(llm: Option<Arc<dyn LlmClient>>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    /// 仅模式解析
    pub fn pattern_only() -> Self {
        Self::new(None, Duration::from_secs(0))
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// 累计 token 用量 (prompt, completion, total)；未配置 LLM 时为 None
    pub fn token_usage(&self) -> Option<(u64, u64, u64)> {
        self.llm.as_ref().map(|llm| llm.token_usage())
    }

    pub async fn interpret(&self, input: &str, context: &PromptContext) -> Intent {
        let intent = parse(input);
        if !matches!(intent, Intent::Unknown { .. }) {
            return intent;
        }
        let Some(llm) = &self.llm else {
            return intent;
        };

        let messages = vec![
            Message::system(system_prompt(context)),
            Message::user(input.trim().to_string()),
        ];

        let response = match tokio::time::timeout(self.timeout, llm.complete(&messages)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!(error = %e, "LLM command parsing failed");
                return intent;
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "LLM command parsing timed out");
                return intent;
            }
        };

        match decode_intent(&response) {
            Some(Intent::Unknown { .. }) | None => {
                debug!(response = %response, "LLM could not map command");
                intent
            }
            Some(decoded) => normalize(decoded),
        }
    }
}

fn system_prompt(context: &PromptContext) -> String {
    format!(
        r#"You translate post-production scheduling commands into JSON. Today is {today}.
Known milestone codes: {codes}
Known episodes: {episodes}

Output ONLY one JSON object, no explanation. Shapes:
{{"intent": "move", "episode_ref": "304", "milestone_code": "LOCK", "date_text": "Friday"}}
{{"intent": "what_if", "episode_ref": "304", "milestone_code": "LOCK", "date_text": "2024-03-15"}}
{{"intent": "set_status", "episode_ref": "304", "milestone_code": "DC", "status": "completed"}}
{{"intent": "note", "episode_ref": "304", "milestone_code": "VFX", "text": "waiting on shot 12"}}
{{"intent": "show_episode", "episode_ref": "304"}}
{{"intent": "blocking", "episode_ref": "304"}}
{{"intent": "list", "kind": "episodes"}}
{{"intent": "show_this_week"}}
{{"intent": "show_next_week"}}
{{"intent": "late"}}
{{"intent": "help"}}
{{"intent": "unknown", "raw": "<the input>"}}

Keep date_text as the user wrote it. Status is one of scheduled, in_progress, completed, skipped.
List kind is one of episodes, types, milestones, events."#,
        today = context.today,
        codes = context.type_codes.join(", "),
        episodes = context.episode_numbers.join(", "),
    )
}

/// 取首个 '{' 到最后一个 '}' 之间的内容反序列化
fn decode_intent(response: &str) -> Option<Intent> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&response[start..=end]).ok()
}

fn normalize(intent: Intent) -> Intent {
    match intent {
        Intent::Move {
            episode_ref,
            milestone_code,
            date_text,
        } => Intent::Move {
            episode_ref,
            milestone_code: milestone_code.to_uppercase(),
            date_text,
        },
        Intent::WhatIf {
            episode_ref,
            milestone_code,
            date_text,
        } => Intent::WhatIf {
            episode_ref,
            milestone_code: milestone_code.to_uppercase(),
            date_text,
        },
        Intent::SetStatus {
            episode_ref,
            milestone_code,
            status,
        } => Intent::SetStatus {
            episode_ref,
            milestone_code: milestone_code.to_uppercase(),
            status,
        },
        Intent::Note {
            episode_ref,
            milestone_code,
            text,
        } => Intent::Note {
            episode_ref,
            milestone_code: milestone_code.to_uppercase(),
            text,
        },
        other => other,
    }
}
