use chrono::NaiveDate;

use crate::filter::{Condition, DateValue};

/// Builder for search expressions; every filter set is ANDed together.
#[derive(Debug, Clone, Default)]
pub struct FilterBuilder {
    name: Option<String>,
    list: Option<String>,
    tags: Vec<String>,
    completed: Option<bool>,
    due_after: Option<NaiveDate>,
    due_before: Option<NaiveDate>,
    start_after: Option<NaiveDate>,
    start_before: Option<NaiveDate>,
    extra: Vec<Condition>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn list(mut self, name: &str) -> Self {
        self.list = Some(name.to_string());
        self
    }

    /// May be called more than once; a task must carry every tag.
    pub fn tag(mut self, name: &str) -> Self {
        self.tags.push(name.to_string());
        self
    }

    pub fn completed(mut self, val: bool) -> Self {
        self.completed = Some(val);
        self
    }

    pub fn due_after(mut self, date: NaiveDate) -> Self {
        self.due_after = Some(date);
        self
    }

    pub fn due_before(mut self, date: NaiveDate) -> Self {
        self.due_before = Some(date);
        self
    }

    pub fn start_after(mut self, date: NaiveDate) -> Self {
        self.start_after = Some(date);
        self
    }

    pub fn start_before(mut self, date: NaiveDate) -> Self {
        self.start_before = Some(date);
        self
    }

    pub fn condition(mut self, condition: Condition) -> Self {
        self.extra.push(condition);
        self
    }

    fn conditions(&self) -> Vec<Condition> {
        let mut conditions = Vec::new();
        if let Some(ref name) = self.name {
            conditions.push(Condition::NameIs(name.clone()));
        }
        if let Some(ref list) = self.list {
            conditions.push(Condition::ListIs(list.clone()));
        }
        for tag in &self.tags {
            conditions.push(Condition::TagIs(tag.clone()));
        }
        if let Some(completed) = self.completed {
            conditions.push(Condition::Status(completed));
        }
        if let Some(d) = self.due_after {
            conditions.push(Condition::DueAfter(DateValue::Day(d)));
        }
        if let Some(d) = self.due_before {
            conditions.push(Condition::DueBefore(DateValue::Day(d)));
        }
        if let Some(d) = self.start_after {
            conditions.push(Condition::StartAfter(DateValue::Day(d)));
        }
        if let Some(d) = self.start_before {
            conditions.push(Condition::StartBefore(DateValue::Day(d)));
        }
        conditions.extend(self.extra.iter().cloned());
        conditions
    }

    /// Combine everything set so far; `None` when no filter was set.
    pub fn build_condition(&self) -> Option<Condition> {
        self.conditions().into_iter().reduce(Condition::and)
    }

    /// Render the expression. An empty builder renders an empty string,
    /// which the service treats as "all tasks".
    pub fn build(&self) -> String {
        self.build_condition()
            .map(|c| c.text())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_default() {
        assert_eq!(FilterBuilder::new().build(), "");
        assert!(FilterBuilder::new().build_condition().is_none());
    }

    #[test]
    fn test_build_single() {
        assert_eq!(FilterBuilder::new().name("Pay rent").build(), "name:\"Pay rent\"");
    }

    #[test]
    fn test_build_with_filters() {
        let filter = FilterBuilder::new()
            .list("Chores")
            .tag("home")
            .completed(false)
            .due_before(NaiveDate::from_ymd_opt(2021, 6, 3).unwrap())
            .build();
        assert_eq!(
            filter,
            "(((list:\"Chores\") AND (tag:home)) AND (status:incomplete)) AND (dueBefore:06/03/2021)"
        );
    }

    #[test]
    fn test_extra_condition_is_last() {
        let filter = FilterBuilder::new()
            .tag("a")
            .condition(Condition::IsTagged(true).not())
            .build();
        assert_eq!(filter, "(tag:a) AND (NOT (isTagged:true))");
    }
}
