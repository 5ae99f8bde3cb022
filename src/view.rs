use std::cmp::Ordering;
use std::rc::Rc;

use crate::models::{FilterState, SortField, SortOrder, Task};

/// Computes the filtered and sorted projection of `tasks`.
///
/// Filters apply in order search, status, priority. The sort is stable, so
/// tasks with equal keys keep their relative order from `tasks`.
pub fn derive_view(tasks: &[Task], filters: &FilterState) -> Vec<Task> {
    let query = filters.search.to_lowercase();
    let mut result: Vec<Task> = tasks
        .iter()
        .filter(|task| query.is_empty() || matches_search(task, &query))
        .filter(|task| filters.status.matches(task.status))
        .filter(|task| filters.priority.matches(task.priority))
        .cloned()
        .collect();

    result.sort_by(|a, b| compare_tasks(a, b, filters.sort_field, filters.sort_order));
    result
}

/// `query` must already be lowercased.
fn matches_search(task: &Task, query: &str) -> bool {
    task.title.to_lowercase().contains(query) || task.description.to_lowercase().contains(query)
}

/// Default direction per field: due date ascending, priority high first,
/// created newest first, title ascending. `Desc` keeps that direction and
/// `Asc` inverts it. Tasks without a due date stay last in both orders.
pub fn compare_tasks(a: &Task, b: &Task, field: SortField, order: SortOrder) -> Ordering {
    if field == SortField::DueDate {
        return match (a.due_date, b.due_date) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Greater,
            (Some(_), None) => Ordering::Less,
            (Some(left), Some(right)) => apply_order(left.cmp(&right), order),
        };
    }
    apply_order(default_direction(a, b, field), order)
}

fn default_direction(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        SortField::DueDate => a.due_date.cmp(&b.due_date),
        SortField::Priority => b.priority.weight().cmp(&a.priority.weight()),
        SortField::CreatedAt => b.created_at.cmp(&a.created_at),
        SortField::Title => compare_titles(&a.title, &b.title),
    }
}

fn apply_order(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Desc => ordering,
        SortOrder::Asc => ordering.reverse(),
    }
}

/// Lowercased comparison, exact comparison as tiebreak. This only
/// approximates a collator: letters are ordered by code point, so accented
/// initials such as "Éclair" land after "zebra".
fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[derive(Debug)]
pub struct ViewCache {
    key: Option<(u64, FilterState)>,
    view: Rc<[Task]>,
    recomputations: u64,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewCache {
    pub fn new() -> Self {
        Self {
            key: None,
            view: Rc::from(Vec::new()),
            recomputations: 0,
        }
    }

    /// Returns the cached view, recomputing only when `version` or `filters`
    /// differ from the last call.
    pub fn get_or_compute(
        &mut self,
        version: u64,
        tasks: &[Task],
        filters: &FilterState,
    ) -> Rc<[Task]> {
        let fresh = matches!(
            &self.key,
            Some((cached_version, cached_filters))
                if *cached_version == version && cached_filters == filters
        );
        if !fresh {
            self.view = Rc::from(derive_view(tasks, filters));
            self.key = Some((version, filters.clone()));
            self.recomputations += 1;
            log::debug!(
                "view: recomputed version={version} shown={} total={}",
                self.view.len(),
                tasks.len()
            );
        }
        Rc::clone(&self.view)
    }

    pub fn recomputations(&self) -> u64 {
        self.recomputations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriorityFilter, StatusFilter, TaskPriority, TaskStatus};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn make_task(id: &str, title: &str, minutes: i64) -> Task {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes);
        Task {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: TaskPriority::Medium,
            due_date: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    fn ids(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.id.as_str()).collect()
    }

    fn sorted_by(field: SortField, order: SortOrder) -> FilterState {
        FilterState {
            sort_field: field,
            sort_order: order,
            ..FilterState::default()
        }
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut a = make_task("a", "Buy MILK", 0);
        let mut b = make_task("b", "Groceries", 1);
        b.description = "eggs and milk".to_string();
        let c = make_task("c", "Ship release", 2);
        a.description = String::new();

        let filters = FilterState {
            search: "Milk".to_string(),
            ..FilterState::default()
        };
        let view = derive_view(&[a, b, c], &filters);
        assert_eq!(ids(&view), vec!["b", "a"]);
    }

    #[test]
    fn status_and_priority_filters_combine() {
        let mut a = make_task("a", "a", 0);
        a.status = TaskStatus::Done;
        a.priority = TaskPriority::High;
        let mut b = make_task("b", "b", 1);
        b.status = TaskStatus::Done;
        b.priority = TaskPriority::Low;
        let mut c = make_task("c", "c", 2);
        c.priority = TaskPriority::High;

        let filters = FilterState {
            status: StatusFilter::Done,
            priority: PriorityFilter::High,
            ..FilterState::default()
        };
        assert_eq!(ids(&derive_view(&[a, b, c], &filters)), vec!["a"]);
    }

    #[test]
    fn created_at_defaults_to_newest_first() {
        let tasks = vec![
            make_task("old", "x", 0),
            make_task("new", "y", 10),
            make_task("mid", "z", 5),
        ];
        let desc = derive_view(&tasks, &FilterState::default());
        assert_eq!(ids(&desc), vec!["new", "mid", "old"]);
    }

    #[test]
    fn created_at_desc_reversed_equals_asc() {
        let tasks: Vec<Task> = [7, 3, 9, 1, 4]
            .iter()
            .map(|m| make_task(&format!("t{m}"), "x", *m))
            .collect();
        let mut desc = derive_view(&tasks, &sorted_by(SortField::CreatedAt, SortOrder::Desc));
        let asc = derive_view(&tasks, &sorted_by(SortField::CreatedAt, SortOrder::Asc));
        desc.reverse();
        assert_eq!(desc, asc);
    }

    #[test]
    fn priority_default_direction_puts_high_first() {
        let mut low = make_task("low", "Buy milk", 10);
        low.priority = TaskPriority::Low;
        let mut high = make_task("high", "Ship release", 0);
        high.priority = TaskPriority::High;
        let medium = make_task("medium", "Call", 5);
        let tasks = vec![low, medium, high];

        let desc = derive_view(&tasks, &sorted_by(SortField::Priority, SortOrder::Desc));
        assert_eq!(ids(&desc), vec!["high", "medium", "low"]);
        let asc = derive_view(&tasks, &sorted_by(SortField::Priority, SortOrder::Asc));
        assert_eq!(ids(&asc), vec!["low", "medium", "high"]);
    }

    #[test]
    fn due_date_missing_dates_sort_last_in_both_orders() {
        let mut a = make_task("jan5", "a", 0);
        a.due_date = date(2024, 1, 5);
        let b = make_task("none", "b", 1);
        let mut c = make_task("jan1", "c", 2);
        c.due_date = date(2024, 1, 1);
        let tasks = vec![a, b, c];

        let default_direction = derive_view(&tasks, &sorted_by(SortField::DueDate, SortOrder::Desc));
        assert_eq!(ids(&default_direction), vec!["jan1", "jan5", "none"]);

        let inverted = derive_view(&tasks, &sorted_by(SortField::DueDate, SortOrder::Asc));
        assert_eq!(ids(&inverted), vec!["jan5", "jan1", "none"]);
    }

    #[test]
    fn multiple_missing_due_dates_stay_behind_dated_tasks() {
        let mut dated = make_task("dated", "a", 0);
        dated.due_date = date(2030, 6, 1);
        let tasks = vec![
            make_task("n1", "b", 1),
            dated,
            make_task("n2", "c", 2),
        ];
        for order in [SortOrder::Asc, SortOrder::Desc] {
            let view = derive_view(&tasks, &sorted_by(SortField::DueDate, order));
            assert_eq!(view[0].id, "dated");
            assert!(view[1..].iter().all(|t| t.due_date.is_none()));
        }
    }

    #[test]
    fn title_sort_ignores_case() {
        let tasks = vec![
            make_task("c", "cherry", 0),
            make_task("a", "Apple", 1),
            make_task("b", "banana", 2),
        ];
        let view = derive_view(&tasks, &sorted_by(SortField::Title, SortOrder::Desc));
        assert_eq!(ids(&view), vec!["a", "b", "c"]);
        let view = derive_view(&tasks, &sorted_by(SortField::Title, SortOrder::Asc));
        assert_eq!(ids(&view), vec!["c", "b", "a"]);
    }

    #[test]
    fn accented_titles_sort_by_code_point() {
        let tasks = vec![
            make_task("eclair", "Éclair", 0),
            make_task("zebra", "zebra", 1),
            make_task("apple", "apple", 2),
        ];
        let view = derive_view(&tasks, &sorted_by(SortField::Title, SortOrder::Desc));
        assert_eq!(ids(&view), vec!["apple", "zebra", "eclair"]);
    }

    #[test]
    fn equal_keys_keep_input_order() {
        let tasks = vec![
            make_task("first", "same", 0),
            make_task("second", "same", 0),
            make_task("third", "same", 0),
        ];
        let view = derive_view(&tasks, &sorted_by(SortField::Priority, SortOrder::Desc));
        assert_eq!(ids(&view), vec!["first", "second", "third"]);
    }

    #[test]
    fn derive_view_is_idempotent_and_leaves_input_untouched() {
        let mut a = make_task("a", "Write docs", 3);
        a.due_date = date(2024, 2, 1);
        let tasks = vec![make_task("b", "Review", 1), a, make_task("c", "Deploy", 2)];
        let before = tasks.clone();
        let filters = sorted_by(SortField::DueDate, SortOrder::Asc);

        let first = derive_view(&tasks, &filters);
        let second = derive_view(&tasks, &filters);
        assert_eq!(first, second);
        assert_eq!(tasks, before);
    }

    #[test]
    fn cache_recomputes_only_when_version_or_filters_change() {
        let tasks = vec![make_task("a", "a", 0), make_task("b", "b", 1)];
        let mut cache = ViewCache::new();
        let filters = FilterState::default();

        assert_eq!(cache.get_or_compute(0, &tasks, &filters).len(), 2);
        let first = cache.get_or_compute(0, &tasks, &filters);
        let again = cache.get_or_compute(0, &tasks, &filters);
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!(cache.recomputations(), 1);

        cache.get_or_compute(1, &tasks, &filters);
        assert_eq!(cache.recomputations(), 2);

        let searching = FilterState {
            search: "a".to_string(),
            ..FilterState::default()
        };
        assert_eq!(cache.get_or_compute(1, &tasks, &searching).len(), 1);
        assert_eq!(cache.recomputations(), 3);
    }
}
