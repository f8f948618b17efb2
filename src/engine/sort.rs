use crate::domain::Task;
use crate::locale::Locale;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// Ordering policy for the task list.
///
/// `sort` must be stable, and `insert` must land a new item after every
/// element that compares equal to it, so that inserting items one by one
/// yields the same list as appending them and sorting once.
pub trait SortStrategy: Send + Sync {
    fn compare(&self, a: &Task, b: &Task) -> Ordering;

    /// Full in-place reorder
    fn sort(&self, tasks: &mut [Task]) {
        tasks.sort_by(|a, b| self.compare(a, b));
    }

    /// Splice `item` into an already sorted list; returns its index
    fn insert(&self, tasks: &mut Vec<Task>, item: Task) -> usize {
        let index =
            tasks.partition_point(|existing| self.compare(existing, &item) != Ordering::Greater);
        tasks.insert(index, item);
        index
    }
}

/// Soonest finish first, then account, then name
pub struct ByFinish {
    locale: Arc<dyn Locale>,
}

impl ByFinish {
    pub fn new(locale: Arc<dyn Locale>) -> Self {
        Self { locale }
    }
}

impl SortStrategy for ByFinish {
    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        a.finish()
            .cmp(&b.finish())
            .then_with(|| self.locale.compare_names(&a.account, &b.account))
            .then_with(|| self.locale.compare_names(&a.name, &b.name))
    }
}

/// Grouped by account, soonest finish first inside each group
pub struct ByAccount {
    locale: Arc<dyn Locale>,
}

impl ByAccount {
    pub fn new(locale: Arc<dyn Locale>) -> Self {
        Self { locale }
    }
}

impl SortStrategy for ByAccount {
    fn compare(&self, a: &Task, b: &Task) -> Ordering {
        self.locale
            .compare_names(&a.account, &b.account)
            .then_with(|| a.finish().cmp(&b.finish()))
            .then_with(|| self.locale.compare_names(&a.name, &b.name))
    }
}

/// Configurable choice of strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKind {
    #[default]
    ByFinish,
    ByAccount,
}

impl SortKind {
    pub fn strategy(&self, locale: Arc<dyn Locale>) -> Box<dyn SortStrategy> {
        match self {
            SortKind::ByFinish => Box::new(ByFinish::new(locale)),
            SortKind::ByAccount => Box::new(ByAccount::new(locale)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskDuration;
    use crate::locale::English;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn t0() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn task(account: &str, name: &str, hours: i64) -> Task {
        Task::new(account, name, t0(), TaskDuration::new(0, hours, 0).unwrap()).unwrap()
    }

    fn ids(tasks: &[Task]) -> Vec<Uuid> {
        tasks.iter().map(|t| t.id).collect()
    }

    fn sample() -> Vec<Task> {
        vec![
            task("main", "Lab", 5),
            task("alt", "Mine", 2),
            task("main", "Wall", 2),
            task("alt", "Mine", 2),
            task("Main", "Barracks", 9),
            task("alt", "", 1),
            task("main", "Lab", 5),
        ]
    }

    #[test]
    fn test_by_finish_order() {
        let strategy = ByFinish::new(Arc::new(English));
        let mut tasks = sample();
        strategy.sort(&mut tasks);

        let summary: Vec<(String, String)> = tasks
            .iter()
            .map(|t| (t.account.clone(), t.name.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("alt".to_string(), "".to_string()),
                ("alt".to_string(), "Mine".to_string()),
                ("alt".to_string(), "Mine".to_string()),
                ("main".to_string(), "Wall".to_string()),
                ("main".to_string(), "Lab".to_string()),
                ("main".to_string(), "Lab".to_string()),
                ("Main".to_string(), "Barracks".to_string()),
            ]
        );
    }

    #[test]
    fn test_sort_is_stable_for_equal_keys() {
        let strategy = ByFinish::new(Arc::new(English));
        let tasks = sample();
        let first_mine = tasks[1].id;
        let second_mine = tasks[3].id;

        let mut sorted = tasks;
        strategy.sort(&mut sorted);
        assert_eq!(sorted[1].id, first_mine);
        assert_eq!(sorted[2].id, second_mine);
    }

    #[test]
    fn test_insert_matches_sort_of_appended() {
        for strategy in [
            SortKind::ByFinish.strategy(Arc::new(English)),
            SortKind::ByAccount.strategy(Arc::new(English)),
        ] {
            let items = sample();

            let mut inserted = Vec::new();
            for item in items.clone() {
                strategy.insert(&mut inserted, item);
            }

            let mut appended = items;
            strategy.sort(&mut appended);

            assert_eq!(ids(&inserted), ids(&appended));
        }
    }

    #[test]
    fn test_insert_returns_position_after_equals() {
        let strategy = ByFinish::new(Arc::new(English));
        let mut tasks = vec![task("a", "x", 1), task("a", "x", 2), task("a", "x", 3)];
        let index = strategy.insert(&mut tasks, task("a", "x", 2));
        assert_eq!(index, 2);
        let index = strategy.insert(&mut tasks, task("a", "x", 0));
        assert_eq!(index, 0);
        let index = strategy.insert(&mut tasks, task("a", "x", 7));
        assert_eq!(index, tasks.len() - 1);
    }

    #[test]
    fn test_by_account_groups() {
        let strategy = ByAccount::new(Arc::new(English));
        let mut tasks = sample();
        strategy.sort(&mut tasks);
        let accounts: Vec<&str> = tasks.iter().map(|t| t.account.as_str()).collect();
        // Case-insensitive collation with ordinal tie-break puts "Main" before "main"
        assert_eq!(accounts, vec!["alt", "alt", "alt", "Main", "main", "main", "main"]);
        assert_eq!(tasks[4].name, "Wall");
    }
}
