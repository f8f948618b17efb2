//! Locale-aware display strings and name collation.
//!
//! One `Locale` implementation per supported language; the application picks
//! one at startup from `Config::language` and shares it behind an `Arc`.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Supported display languages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    En,
    Zh,
}

impl Language {
    /// Build the locale implementation for this language
    pub fn locale(&self) -> Arc<dyn Locale> {
        match self {
            Language::En => Arc::new(English),
            Language::Zh => Arc::new(Chinese),
        }
    }
}

/// Non-negative days/hours/minutes/seconds split of a time delta
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Breakdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Breakdown {
    /// Split a delta; negative deltas clamp to zero
    pub fn from_duration(delta: Duration) -> Self {
        let total = delta.num_seconds().max(0);
        Self {
            days: total / 86_400,
            hours: (total % 86_400) / 3_600,
            minutes: (total % 3_600) / 60,
            seconds: total % 60,
        }
    }
}

/// Unit labels for `compact`
struct Units {
    day: &'static str,
    hour: &'static str,
    minute: &'static str,
    second: &'static str,
    separator: &'static str,
    under_minute: &'static str,
}

/// Two largest units: days+hours, hours+minutes, or minutes alone.
/// Seconds are added only on request and only when no day/hour unit is shown.
fn compact(b: Breakdown, with_seconds: bool, units: &Units) -> String {
    let pair = |major: i64, major_unit: &str, minor: i64, minor_unit: &str| {
        if minor > 0 {
            format!("{}{}{}{}{}", major, major_unit, units.separator, minor, minor_unit)
        } else {
            format!("{}{}", major, major_unit)
        }
    };

    if b.days > 0 {
        pair(b.days, units.day, b.hours, units.hour)
    } else if b.hours > 0 {
        pair(b.hours, units.hour, b.minutes, units.minute)
    } else if b.minutes > 0 {
        if with_seconds {
            pair(b.minutes, units.minute, b.seconds, units.second)
        } else {
            format!("{}{}", b.minutes, units.minute)
        }
    } else if with_seconds {
        format!("{}{}", b.seconds, units.second)
    } else {
        units.under_minute.to_string()
    }
}

/// Display strings and collation for one language
pub trait Locale: Send + Sync {
    /// Compact remaining-time string; callers handle the due state themselves
    fn format_remaining(&self, breakdown: Breakdown, with_seconds: bool) -> String;

    /// Timestamp in the language's usual date/time pattern
    fn format_timestamp(&self, ts: NaiveDateTime) -> String;

    fn due_label(&self) -> &'static str;
    fn done_label(&self) -> &'static str;
    fn deleting_label(&self) -> &'static str;

    /// Title and body for a "task is due" notification
    fn due_notification(&self, account: &str, name: &str) -> (String, String);

    /// Collation for account and task names
    fn compare_names(&self, a: &str, b: &str) -> Ordering;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct English;

impl Locale for English {
    fn format_remaining(&self, breakdown: Breakdown, with_seconds: bool) -> String {
        compact(
            breakdown,
            with_seconds,
            &Units {
                day: "d",
                hour: "h",
                minute: "m",
                second: "s",
                separator: " ",
                under_minute: "<1m",
            },
        )
    }

    fn format_timestamp(&self, ts: NaiveDateTime) -> String {
        ts.format("%Y-%m-%d %H:%M").to_string()
    }

    fn due_label(&self) -> &'static str {
        "Due"
    }

    fn done_label(&self) -> &'static str {
        "Done"
    }

    fn deleting_label(&self) -> &'static str {
        "Deleting"
    }

    fn due_notification(&self, account: &str, name: &str) -> (String, String) {
        let title = format!("Upgrade finished - {}", account);
        let body = if name.is_empty() {
            "An upgrade is ready".to_string()
        } else {
            format!("{} is ready", name)
        };
        (title, body)
    }

    fn compare_names(&self, a: &str, b: &str) -> Ordering {
        a.to_lowercase()
            .cmp(&b.to_lowercase())
            .then_with(|| a.cmp(b))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Chinese;

impl Locale for Chinese {
    fn format_remaining(&self, breakdown: Breakdown, with_seconds: bool) -> String {
        compact(
            breakdown,
            with_seconds,
            &Units {
                day: "天",
                hour: "小时",
                minute: "分钟",
                second: "秒",
                separator: "",
                under_minute: "不到1分钟",
            },
        )
    }

    fn format_timestamp(&self, ts: NaiveDateTime) -> String {
        ts.format("%Y年%m月%d日 %H:%M").to_string()
    }

    fn due_label(&self) -> &'static str {
        "已完成"
    }

    fn done_label(&self) -> &'static str {
        "已确认"
    }

    fn deleting_label(&self) -> &'static str {
        "删除中"
    }

    fn due_notification(&self, account: &str, name: &str) -> (String, String) {
        let title = format!("升级完成 - {}", account);
        let body = if name.is_empty() {
            "有升级已完成".to_string()
        } else {
            format!("{} 已完成", name)
        };
        (title, body)
    }

    fn compare_names(&self, a: &str, b: &str) -> Ordering {
        a.cmp(b)
    }
}
