//! 模式匹配指令解析（不调用 LLM）
//!
//! 按顺序尝试正则，第一个命中即返回；大小写不敏感。LLM 不可用时这是唯一的解析路径。

use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::interpreter::intent::{Intent, ListKind};
use crate::schedule::MilestoneStatus;

/// 剧集引用：可带 "ep"/"episode"/"#" 前缀，捕获数字
const EPISODE: &str = r"(?:ep(?:isode)?\.?\s*#?\s*)?(\d+)(?:'s)?";
/// 里程碑类型代码
const CODE: &str = r"([a-z][a-z0-9_-]*)";

struct Patterns {
    help: Regex,
    what_if: Regex,
    set_status: Regex,
    note: Regex,
    move_to: Regex,
    list: Regex,
    blocking: Regex,
    late: Regex,
    this_week: Regex,
    next_week: Regex,
    show_episode: Regex,
    bare_episode: Regex,
}

static PATTERNS: OnceLock<Patterns> = OnceLock::new();

fn patterns() -> &'static Patterns {
    PATTERNS.get_or_init(|| {
        let re = |pattern: String| Regex::new(&format!("(?i){pattern}")).unwrap();
        Patterns {
            help: re(r"^(?:help|\?|commands|what\s+can\s+you\s+do\??)$".into()),
            what_if: re(format!(
                r"^what\s+(?:if|happens\s+if|would\s+happen\s+if)\s+(?:i\s+|we\s+)?(?:move|push|shift|slide|reschedule)?\s*{EPISODE}\s+{CODE}\s+(?:(?:moves?|moved|slips?|slipped|goes|went)\s+)?(?:to|on|until|till)\s+(.+?)[\s?.!]*$"
            )),
            set_status: re(format!(
                r"^(?:mark|set|flag)\s+{EPISODE}\s+{CODE}\s+(?:as\s+)?(done|completed?|finished|skipped|skip|in[\s_-]?progress|started|scheduled)[\s.!]*$"
            )),
            note: re(format!(
                r"^(?:note|annotate)\s+{EPISODE}\s+{CODE}(?:\s*:\s*|\s+)?(.*?)\s*$"
            )),
            move_to: re(format!(
                r"^(?:please\s+)?(?:move|push|shift|slide|reschedule|set|change)\s+{EPISODE}\s+{CODE}\s+(?:date\s+)?(?:to|on|until|till|for)\s+(.+?)[\s?.!]*$"
            )),
            list: re(r"^(?:list|show(?:\s+all)?|all)\s+(?:the\s+)?(episodes|eps|milestone\s+types|types|milestones|calendar\s+events|calendar|events)\b(?:\D*?(\d+))?".into()),
            blocking: re(r"\bblock(?:ing|ed|ers?|s)?\b\D*(\d+)".into()),
            late: re(r"\b(?:late|overdue|behind(?:\s+schedule)?|past\s+due)\b".into()),
            this_week: re(r"\bthis\s+week\b".into()),
            next_week: re(r"\bnext\s+week\b".into()),
            show_episode: re(format!(
                r"^(?:show|view|open|display|status(?:\s+of)?|how(?:'s|\s+is)|what'?s\s+(?:on|up\s+with|the\s+status\s+of))\s+(?:me\s+)?{EPISODE}\b"
            )),
            bare_episode: re(format!(r"^{EPISODE}[\s?]*$")),
        }
    })
}

/// 解析自由文本为意图；识别不了返回 `Intent::Unknown`
pub fn parse(text: &str) -> Intent {
    let input = text.trim();
    if input.is_empty() {
        return Intent::unknown(text);
    }
    let p = patterns();

    if p.help.is_match(input) {
        return Intent::Help;
    }
    if let Some(caps) = p.what_if.captures(input) {
        let (episode_ref, milestone_code, date_text) = target_parts(&caps);
        return Intent::WhatIf {
            episode_ref,
            milestone_code,
            date_text,
        };
    }
    if let Some(caps) = p.set_status.captures(input) {
        if let Some(status) = MilestoneStatus::parse(&caps[3]) {
            return Intent::SetStatus {
                episode_ref: caps[1].to_string(),
                milestone_code: caps[2].to_uppercase(),
                status,
            };
        }
    }
    if let Some(caps) = p.note.captures(input) {
        let text = caps[3].trim();
        let cleared = text.is_empty() || matches!(text.to_lowercase().as_str(), "clear" | "none");
        return Intent::Note {
            episode_ref: caps[1].to_string(),
            milestone_code: caps[2].to_uppercase(),
            text: (!cleared).then(|| text.to_string()),
        };
    }
    if let Some(caps) = p.move_to.captures(input) {
        let (episode_ref, milestone_code, date_text) = target_parts(&caps);
        return Intent::Move {
            episode_ref,
            milestone_code,
            date_text,
        };
    }
    if let Some(caps) = p.list.captures(input) {
        let kind_text = caps[1].split_whitespace().collect::<Vec<_>>().join(" ");
        if let Some(kind) = ListKind::parse(&kind_text) {
            return Intent::List {
                kind,
                episode_ref: caps.get(2).map(|m| m.as_str().to_string()),
            };
        }
    }
    if let Some(caps) = p.blocking.captures(input) {
        return Intent::Blocking {
            episode_ref: caps[1].to_string(),
        };
    }
    if p.late.is_match(input) {
        return Intent::Late;
    }
    if p.this_week.is_match(input) {
        return Intent::ShowThisWeek;
    }
    if p.next_week.is_match(input) {
        return Intent::ShowNextWeek;
    }
    if let Some(caps) = p
        .show_episode
        .captures(input)
        .or_else(|| p.bare_episode.captures(input))
    {
        return Intent::ShowEpisode {
            episode_ref: caps[1].to_string(),
        };
    }

    Intent::unknown(input)
}

fn target_parts(caps: &Captures<'_>) -> (String, String, String) {
    (
        caps[1].to_string(),
        caps[2].to_uppercase(),
        caps[3].trim().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_move() {
        assert_eq!(
            parse("move 304 lock to Friday"),
            Intent::Move {
                episode_ref: "304".into(),
                milestone_code: "LOCK".into(),
                date_text: "Friday".into(),
            }
        );
    }

    #[test]
    fn test_parse_move_variants() {
        let intent = parse("Push episode 12's DC to 12/20.");
        assert_eq!(
            intent,
            Intent::Move {
                episode_ref: "12".into(),
                milestone_code: "DC".into(),
                date_text: "12/20".into(),
            }
        );
        assert!(matches!(
            parse("reschedule ep 101 mix for next week"),
            Intent::Move { ref date_text, .. } if date_text == "next week"
        ));
    }

    #[test]
    fn test_parse_what_if() {
        let expected = Intent::WhatIf {
            episode_ref: "304".into(),
            milestone_code: "EC".into(),
            date_text: "next Friday".into(),
        };
        assert_eq!(parse("what if we move 304 ec to next Friday?"), expected);
        assert_eq!(parse("What if 304 EC slips to next Friday"), expected);
    }

    #[test]
    fn test_parse_late() {
        assert_eq!(parse("what's late?"), Intent::Late);
        assert_eq!(parse("anything overdue"), Intent::Late);
    }

    #[test]
    fn test_parse_weeks() {
        assert_eq!(parse("what's due this week"), Intent::ShowThisWeek);
        assert_eq!(parse("show me next week"), Intent::ShowNextWeek);
    }

    #[test]
    fn test_parse_episode_queries() {
        assert_eq!(
            parse("show 304"),
            Intent::ShowEpisode {
                episode_ref: "304".into()
            }
        );
        assert_eq!(
            parse("ep 12?"),
            Intent::ShowEpisode {
                episode_ref: "12".into()
            }
        );
        assert_eq!(
            parse("what's blocking 304?"),
            Intent::Blocking {
                episode_ref: "304".into()
            }
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse("list milestones for ep 304"),
            Intent::List {
                kind: ListKind::Milestones,
                episode_ref: Some("304".into()),
            }
        );
        assert_eq!(
            parse("show all episodes"),
            Intent::List {
                kind: ListKind::Episodes,
                episode_ref: None,
            }
        );
    }

    #[test]
    fn test_parse_set_status() {
        assert_eq!(
            parse("mark 304 lock as done"),
            Intent::SetStatus {
                episode_ref: "304".into(),
                milestone_code: "LOCK".into(),
                status: MilestoneStatus::Completed,
            }
        );
    }

    #[test]
    fn test_parse_note() {
        assert_eq!(
            parse("note 304 vfx: waiting on shot 12"),
            Intent::Note {
                episode_ref: "304".into(),
                milestone_code: "VFX".into(),
                text: Some("waiting on shot 12".into()),
            }
        );
        assert_eq!(
            parse("note 304 vfx clear"),
            Intent::Note {
                episode_ref: "304".into(),
                milestone_code: "VFX".into(),
                text: None,
            }
        );
    }

    #[test]
    fn test_parse_unknown() {
        assert_eq!(parse("order pizza"), Intent::unknown("order pizza"));
        assert_eq!(parse("help"), Intent::Help);
    }
}
