use super::time::{add_months, add_span};
use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Upper bound on skip-rule retries before recurrence gives up
pub const MAX_SKIP_ITERATIONS: u32 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("empty period")]
    Empty,
    #[error("missing number before unit '{0}'")]
    MissingNumber(String),
    #[error("number without unit: {0}")]
    MissingUnit(String),
    #[error("unknown unit '{0}' (use y, mo, d, h, m, s)")]
    UnknownUnit(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
    #[error("unexpected character '{0}' in period")]
    InvalidChar(char),
    #[error("unknown repeat kind '{0}' (use daily, weekly, monthly, yearly)")]
    UnknownKind(String),
}

/// A custom recurrence period, added component by component
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    #[serde(default)]
    pub years: u32,
    #[serde(default)]
    pub months: u32,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub hours: u32,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub seconds: u32,
}

impl Period {
    /// All six components zero: such a rule never regenerates
    pub fn is_empty(&self) -> bool {
        *self == Period::default()
    }

    /// Parse a compact period like "1y2mo3d4h5m6s" (any subset, any order)
    pub fn parse(input: &str) -> Result<Self, RecurrenceError> {
        let input = input.trim().to_lowercase();
        if input.is_empty() {
            return Err(RecurrenceError::Empty);
        }

        let mut period = Period::default();
        let mut chars = input.chars().peekable();

        while chars.peek().is_some() {
            let mut digits = String::new();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_digit) {
                digits.push(c);
                chars.next();
            }
            let mut unit = String::new();
            while let Some(c) = chars.peek().copied().filter(char::is_ascii_alphabetic) {
                unit.push(c);
                chars.next();
            }
            if digits.is_empty() && unit.is_empty() {
                match chars.next() {
                    Some(c) if c.is_whitespace() => continue,
                    Some(c) => return Err(RecurrenceError::InvalidChar(c)),
                    None => break,
                }
            }
            if digits.is_empty() {
                return Err(RecurrenceError::MissingNumber(unit));
            }
            if unit.is_empty() {
                return Err(RecurrenceError::MissingUnit(digits));
            }
            let value: u32 = digits
                .parse()
                .map_err(|_| RecurrenceError::OutOfRange(digits.clone()))?;
            let slot = match unit.as_str() {
                "y" => &mut period.years,
                "mo" => &mut period.months,
                "d" => &mut period.days,
                "h" => &mut period.hours,
                "m" => &mut period.minutes,
                "s" => &mut period.seconds,
                _ => return Err(RecurrenceError::UnknownUnit(unit)),
            };
            *slot = slot.saturating_add(value);
        }

        Ok(period)
    }

    /// Apply this period `n` times to `base`: years, then months, then the clock units
    fn advance(&self, base: NaiveDateTime, n: u32) -> NaiveDateTime {
        let n = u64::from(n);
        let after_years = add_months(base, u64::from(self.years) * 12 * n);
        let after_months = add_months(after_years, u64::from(self.months) * n);
        add_span(
            after_months,
            u64::from(self.days) * n,
            u64::from(self.hours) * n,
            u64::from(self.minutes) * n,
            u64::from(self.seconds) * n,
        )
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = [
            (self.years, "y"),
            (self.months, "mo"),
            (self.days, "d"),
            (self.hours, "h"),
            (self.minutes, "m"),
            (self.seconds, "s"),
        ];
        let mut wrote = false;
        for (value, unit) in parts {
            if value > 0 {
                write!(f, "{}{}", value, unit)?;
                wrote = true;
            }
        }
        if !wrote {
            f.write_str("0s")?;
        }
        Ok(())
    }
}

/// How a completed task regenerates its next occurrence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecurrenceRule {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Custom(Period),
}

impl RecurrenceRule {
    /// Parse a named repeat kind ("daily", "weekly", ...)
    pub fn from_kind(kind: &str) -> Result<Self, RecurrenceError> {
        match kind.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            other => Err(RecurrenceError::UnknownKind(other.to_string())),
        }
    }

    /// Whether completing a task with this rule can regenerate it
    pub fn is_active(&self) -> bool {
        match self {
            Self::None => false,
            Self::Custom(period) => !period.is_empty(),
            _ => true,
        }
    }

    /// Candidate `n` steps after `base`, anchored so month clamping never drifts
    fn advance(&self, base: NaiveDateTime, n: u32) -> NaiveDateTime {
        let n64 = u64::from(n);
        match self {
            Self::None => base,
            Self::Daily => add_span(base, n64, 0, 0, 0),
            Self::Weekly => add_span(base, 7 * n64, 0, 0, 0),
            Self::Monthly => add_months(base, n64),
            Self::Yearly => add_months(base, 12 * n64),
            Self::Custom(period) => period.advance(base, n),
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Daily => f.write_str("daily"),
            Self::Weekly => f.write_str("weekly"),
            Self::Monthly => f.write_str("monthly"),
            Self::Yearly => f.write_str("yearly"),
            Self::Custom(period) => write!(f, "every {}", period),
        }
    }
}

/// Predicate deferring a recurrence candidate to a later step
pub trait SkipPredicate {
    fn should_skip(&self, candidate: NaiveDateTime) -> bool;
}

impl<F> SkipPredicate for F
where
    F: Fn(NaiveDateTime) -> bool,
{
    fn should_skip(&self, candidate: NaiveDateTime) -> bool {
        self(candidate)
    }
}

/// Skip rules that can be stored on a task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipRule {
    #[default]
    None,
    Weekends,
    Weekdays,
}

impl SkipRule {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" => Some(Self::None),
            "weekends" => Some(Self::Weekends),
            "weekdays" => Some(Self::Weekdays),
            _ => None,
        }
    }
}

impl SkipPredicate for SkipRule {
    fn should_skip(&self, candidate: NaiveDateTime) -> bool {
        let weekend = matches!(candidate.weekday(), Weekday::Sat | Weekday::Sun);
        match self {
            Self::None => false,
            Self::Weekends => weekend,
            Self::Weekdays => !weekend,
        }
    }
}

/// Compute the start of the next occurrence after a task finished at `previous_finish`.
///
/// Returns `None` when the rule is inactive, the candidate passes `repeat_until`,
/// or the skip predicate rejects `MAX_SKIP_ITERATIONS` candidates in a row.
pub fn next_start(
    rule: &RecurrenceRule,
    previous_finish: NaiveDateTime,
    repeat_until: Option<NaiveDateTime>,
    skip: &dyn SkipPredicate,
) -> Option<NaiveDateTime> {
    if !rule.is_active() {
        return None;
    }

    for step in 1..=MAX_SKIP_ITERATIONS {
        let candidate = rule.advance(previous_finish, step);
        if repeat_until.is_some_and(|end| candidate > end) {
            tracing::debug!(%rule, %candidate, "recurrence passed its end boundary");
            return None;
        }
        // A saturated candidate cannot move any further
        if candidate <= previous_finish {
            return None;
        }
        if !skip.should_skip(candidate) {
            return Some(candidate);
        }
    }

    tracing::warn!(
        %rule,
        %previous_finish,
        "skip rule rejected every candidate; recurrence stopped"
    );
    None
}
