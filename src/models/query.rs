//! Filter and sort specification for issue lists.
//!
//! `IssueFilter` is transient view state: it is never persisted. The active
//! list turns it into query parameters for `/issue/filtra-avanzato`, the
//! archived list evaluates it in memory with [`IssueFilter::apply`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::{Issue, IssueType, Priority, Status};

/// Sort order for an issue list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    NewestFirst,
    OldestFirst,
    TitleAsc,
    TitleDesc,
    PriorityHighFirst,
    PriorityLowFirst,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        SortKey::NewestFirst,
        SortKey::OldestFirst,
        SortKey::TitleAsc,
        SortKey::TitleDesc,
        SortKey::PriorityHighFirst,
        SortKey::PriorityLowFirst,
    ];

    /// Value of the `ordinamento` query parameter.
    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::NewestFirst => "data_recente",
            SortKey::OldestFirst => "data_vecchio",
            SortKey::TitleAsc => "titolo_az",
            SortKey::TitleDesc => "titolo_za",
            SortKey::PriorityHighFirst => "priorita_alta",
            SortKey::PriorityLowFirst => "priorita_bassa",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::NewestFirst => "Newest first",
            SortKey::OldestFirst => "Oldest first",
            SortKey::TitleAsc => "Title A-Z",
            SortKey::TitleDesc => "Title Z-A",
            SortKey::PriorityHighFirst => "Priority high to low",
            SortKey::PriorityLowFirst => "Priority low to high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|k| k.as_param() == lower)
            .or(match lower.as_str() {
                "newest" | "recent" => Some(SortKey::NewestFirst),
                "oldest" => Some(SortKey::OldestFirst),
                "title" | "title-asc" | "az" => Some(SortKey::TitleAsc),
                "title-desc" | "za" => Some(SortKey::TitleDesc),
                "priority" | "priority-high" => Some(SortKey::PriorityHighFirst),
                "priority-low" => Some(SortKey::PriorityLowFirst),
                _ => None,
            })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        SortKey::parse(s).ok_or_else(|| {
            format!(
                "invalid sort '{}' (newest, oldest, title, title-desc, priority, priority-low)",
                s
            )
        })
    }
}

/// Which timestamp date-based sorts compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateField {
    Created,
    Archived,
}

/// Filter/sort specification for an issue list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueFilter {
    /// Case-insensitive substring matched against the title. Blank means none.
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub issue_type: Option<IssueType>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub sort: SortKey,
    /// Archived scope: `false` for active views, `true` for archived ones.
    #[serde(default)]
    pub archived: bool,
}

/// A single edit to a filter, as produced by one UI control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    Search(String),
    Status(Option<Status>),
    Type(Option<IssueType>),
    Priority(Option<Priority>),
    Sort(SortKey),
    /// Clear every predicate and restore the default sort. The archived
    /// scope is part of the view, not of the user's selection, and survives.
    Reset,
}

impl IssueFilter {
    pub fn active() -> Self {
        Self::default()
    }

    pub fn archived() -> Self {
        Self {
            archived: true,
            ..Self::default()
        }
    }

    /// Apply one change. Returns true when the filter actually changed.
    ///
    /// Each field is independent: changing the status never touches the
    /// search term and so on.
    pub fn apply_change(&mut self, change: FilterChange) -> bool {
        let before = self.clone();
        match change {
            FilterChange::Search(term) => self.search = term,
            FilterChange::Status(status) => self.status = status,
            FilterChange::Type(issue_type) => self.issue_type = issue_type,
            FilterChange::Priority(priority) => self.priority = priority,
            FilterChange::Sort(sort) => self.sort = sort,
            FilterChange::Reset => {
                *self = Self {
                    archived: self.archived,
                    ..Self::default()
                }
            }
        }
        *self != before
    }

    pub fn search_term(&self) -> Option<&str> {
        let term = self.search.trim();
        (!term.is_empty()).then_some(term)
    }

    pub fn has_predicates(&self) -> bool {
        self.search_term().is_some()
            || self.status.is_some()
            || self.issue_type.is_some()
            || self.priority.is_some()
    }

    /// True when `issue` satisfies every predicate. The archived scope is not
    /// checked here; callers select the population first.
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(term) = self.search_term() {
            if !issue.title.to_lowercase().contains(&term.to_lowercase()) {
                return false;
            }
        }
        self.status.is_none_or(|s| issue.status == s)
            && self.issue_type.is_none_or(|t| issue.issue_type == t)
            && self.priority.is_none_or(|p| issue.priority == p)
    }

    /// Filter and sort in memory.
    pub fn apply(&self, issues: &[Issue], date_field: DateField) -> Vec<Issue> {
        let mut out: Vec<Issue> = issues.iter().filter(|i| self.matches(i)).cloned().collect();
        sort_issues(&mut out, self.sort, date_field);
        out
    }

    /// Query parameters for `/issue/filtra-avanzato`. Absent predicates are
    /// omitted; the sort and archived scope are always sent.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(status) = self.status {
            params.push(("stato", status.as_param().to_string()));
        }
        if let Some(priority) = self.priority {
            params.push(("priorita", priority.as_param().to_string()));
        }
        if let Some(issue_type) = self.issue_type {
            params.push(("tipo", issue_type.as_param().to_string()));
        }
        if let Some(term) = self.search_term() {
            params.push(("ricerca", term.to_string()));
        }
        params.push(("ordinamento", self.sort.as_param().to_string()));
        params.push(("archiviata", self.archived.to_string()));
        params
    }
}

/// Stable sort by `key`. Equal keys keep their incoming (server) order.
///
/// Issues without the compared timestamp sort after those that have one,
/// whatever the direction.
pub fn sort_issues(issues: &mut [Issue], key: SortKey, date_field: DateField) {
    let date = |issue: &Issue| match date_field {
        DateField::Created => issue.created_at,
        DateField::Archived => issue.archived_at.or(issue.created_at),
    };
    match key {
        SortKey::NewestFirst => issues.sort_by(|a, b| cmp_dates(date(a), date(b), true)),
        SortKey::OldestFirst => issues.sort_by(|a, b| cmp_dates(date(a), date(b), false)),
        SortKey::TitleAsc => issues.sort_by_cached_key(|i| i.title.to_lowercase()),
        SortKey::TitleDesc => {
            issues.sort_by(|a, b| b.title.to_lowercase().cmp(&a.title.to_lowercase()))
        }
        SortKey::PriorityHighFirst => issues.sort_by_key(|i| i.priority.urgency_rank()),
        SortKey::PriorityLowFirst => {
            issues.sort_by_key(|i| std::cmp::Reverse(i.priority.urgency_rank()))
        }
    }
}

fn cmp_dates<T: Ord>(a: Option<T>, b: Option<T>, descending: bool) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) if descending => b.cmp(&a),
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::issue;
    use chrono::NaiveDate;

    fn at(day: u32) -> Option<chrono::NaiveDateTime> {
        NaiveDate::from_ymd_opt(2025, 3, day).and_then(|d| d.and_hms_opt(12, 0, 0))
    }

    fn titles(issues: &[Issue]) -> Vec<&str> {
        issues.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive_substring_on_title() {
        let filter = IssueFilter {
            search: "LOGIN".into(),
            ..Default::default()
        };
        let mut hit = issue(1, "Crash on login page");
        hit.description = "nothing".into();
        let mut miss = issue(2, "Slow dashboard");
        miss.description = "login is slow too".into();
        assert!(filter.matches(&hit));
        assert!(!filter.matches(&miss));
    }

    #[test]
    fn test_changing_other_field_keeps_search_term() {
        let mut filter = IssueFilter::archived();
        filter.apply_change(FilterChange::Search("crash".into()));
        filter.apply_change(FilterChange::Status(Some(Status::Done)));
        filter.apply_change(FilterChange::Sort(SortKey::TitleAsc));
        assert_eq!(filter.search, "crash");
        assert_eq!(filter.status, Some(Status::Done));
    }

    #[test]
    fn test_reset_keeps_archived_scope() {
        let mut filter = IssueFilter::archived();
        filter.apply_change(FilterChange::Priority(Some(Priority::High)));
        assert!(filter.apply_change(FilterChange::Reset));
        assert_eq!(filter, IssueFilter::archived());
        assert!(!filter.apply_change(FilterChange::Reset));
    }

    #[test]
    fn test_query_params_omit_absent_predicates() {
        let params = IssueFilter::active().query_params();
        assert_eq!(
            params,
            vec![
                ("ordinamento", "data_recente".to_string()),
                ("archiviata", "false".to_string())
            ]
        );
    }

    #[test]
    fn test_query_params_full() {
        let filter = IssueFilter {
            search: "  crash ".into(),
            status: Some(Status::InProgress),
            issue_type: Some(IssueType::Feature),
            priority: Some(Priority::Critical),
            sort: SortKey::PriorityLowFirst,
            archived: false,
        };
        let params = filter.query_params();
        assert!(params.contains(&("stato", "inprogress".into())));
        assert!(params.contains(&("tipo", "features".into())));
        assert!(params.contains(&("priorita", "critical".into())));
        assert!(params.contains(&("ricerca", "crash".into())));
        assert!(params.contains(&("ordinamento", "priorita_bassa".into())));
    }

    #[test]
    fn test_sort_by_priority_is_stable() {
        let mut a = issue(1, "a");
        a.priority = Priority::High;
        let mut b = issue(2, "b");
        b.priority = Priority::Critical;
        let mut c = issue(3, "c");
        c.priority = Priority::High;
        let mut d = issue(4, "d");
        d.priority = Priority::None;
        let mut list = vec![a, b, c, d];

        sort_issues(&mut list, SortKey::PriorityHighFirst, DateField::Created);
        assert_eq!(titles(&list), vec!["b", "a", "c", "d"]);

        sort_issues(&mut list, SortKey::PriorityLowFirst, DateField::Created);
        assert_eq!(titles(&list), vec!["d", "a", "c", "b"]);
    }

    #[test]
    fn test_sort_by_title_ignores_case() {
        let mut list = vec![issue(1, "beta"), issue(2, "Alpha"), issue(3, "gamma")];
        sort_issues(&mut list, SortKey::TitleAsc, DateField::Created);
        assert_eq!(titles(&list), vec!["Alpha", "beta", "gamma"]);
        sort_issues(&mut list, SortKey::TitleDesc, DateField::Created);
        assert_eq!(titles(&list), vec!["gamma", "beta", "Alpha"]);
    }

    #[test]
    fn test_sort_by_archival_date() {
        let mut old = issue(1, "archived early, created late");
        old.created_at = at(20);
        old.archived_at = at(21);
        let mut new = issue(2, "archived late, created early");
        new.created_at = at(1);
        new.archived_at = at(25);
        let mut list = vec![old.clone(), new.clone()];

        sort_issues(&mut list, SortKey::NewestFirst, DateField::Archived);
        assert_eq!(list[0].id, 2);
        sort_issues(&mut list, SortKey::NewestFirst, DateField::Created);
        assert_eq!(list[0].id, 1);
    }

    #[test]
    fn test_missing_dates_sort_last() {
        let mut dated = issue(1, "dated");
        dated.created_at = at(3);
        let mut undated = issue(2, "undated");
        undated.created_at = None;
        let mut list = vec![undated.clone(), dated.clone()];
        sort_issues(&mut list, SortKey::OldestFirst, DateField::Created);
        assert_eq!(list[0].id, 1);
        sort_issues(&mut list, SortKey::NewestFirst, DateField::Created);
        assert_eq!(list[0].id, 1);
    }

    #[test]
    fn test_sort_key_parse_accepts_param_and_alias() {
        assert_eq!(SortKey::parse("titolo_za"), Some(SortKey::TitleDesc));
        assert_eq!("oldest".parse::<SortKey>(), Ok(SortKey::OldestFirst));
        assert!("sideways".parse::<SortKey>().is_err());
    }
}
