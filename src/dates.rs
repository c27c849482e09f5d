//! 相对日期解析
//!
//! 将 "Friday"、"next week"、"12/20" 之类的表达换算成具体日期。识别不了返回 None，
//! 由调用方提示用户澄清，绝不静默回退到某个默认日期。

use std::sync::OnceLock;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use regex::Regex;

const WEEKDAYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// 依次尝试的日历格式（含年份）
const DATE_FORMATS: [&str; 6] = [
    "%Y-%m-%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%Y/%m/%d",
    "%d.%m.%Y",
];

/// 不含年份的格式，补上参考年份后再解析
const YEARLESS_FORMATS: [&str; 2] = ["%B %d %Y", "%d %B %Y"];

static SLASH_DATE_RE: OnceLock<Regex> = OnceLock::new();
static ORDINAL_RE: OnceLock<Regex> = OnceLock::new();

/// 以 `reference` 为基准解析日期表达
///
/// 优先级：today/tomorrow/yesterday → 星期名 → "next week" → M/D[/YY[YY]] → 通用日历格式。
pub fn resolve(text: &str, reference: NaiveDate) -> Option<NaiveDate> {
    let lower = text.trim().to_lowercase();
    if lower.is_empty() {
        return None;
    }

    if lower.contains("today") {
        return Some(reference);
    }
    if lower.contains("tomorrow") {
        return reference.checked_add_days(Days::new(1));
    }
    if lower.contains("yesterday") {
        return reference.checked_sub_days(Days::new(1));
    }

    if let Some((_, weekday)) = WEEKDAYS.iter().find(|(name, _)| lower.contains(name)) {
        return next_weekday(reference, *weekday, lower.contains("next"));
    }

    if lower.contains("next week") {
        return reference.checked_add_days(Days::new(7));
    }

    if let Some(date) = parse_slash_date(&lower, reference.year()) {
        return Some(date);
    }

    parse_calendar_date(&lower, reference.year())
}

/// 参考日当天或之后最近的该星期几；已过去或带 "next" 时顺延一周（只顺延一次）
fn next_weekday(reference: NaiveDate, target: Weekday, next: bool) -> Option<NaiveDate> {
    let current = i64::from(reference.weekday().num_days_from_monday());
    let wanted = i64::from(target.num_days_from_monday());
    let mut ahead = wanted - current;
    if ahead < 0 || next {
        ahead += 7;
    }
    reference.checked_add_days(Days::new(ahead.unsigned_abs()))
}

fn parse_slash_date(text: &str, default_year: i32) -> Option<NaiveDate> {
    let re = SLASH_DATE_RE
        .get_or_init(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b").unwrap());
    let caps = re.captures(text)?;
    let month: u32 = caps.get(1)?.as_str().parse().ok()?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;
    let year = match caps.get(3) {
        Some(y) if y.as_str().len() == 2 => 2000 + y.as_str().parse::<i32>().ok()?,
        Some(y) => y.as_str().parse().ok()?,
        None => default_year,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_calendar_date(text: &str, default_year: i32) -> Option<NaiveDate> {
    let ordinal = ORDINAL_RE.get_or_init(|| Regex::new(r"(\d)(?:st|nd|rd|th)\b").unwrap());
    let cleaned = ordinal.replace_all(text, "$1");
    let cleaned = cleaned
        .trim_start_matches("on ")
        .trim_end_matches(['?', '.', '!'])
        .trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(cleaned, format) {
            return Some(date);
        }
    }

    let with_year = format!("{cleaned} {default_year}");
    YEARLESS_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&with_year, format).ok())
}
