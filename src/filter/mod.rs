//! Search expressions for selecting which remote tasks to fetch.

pub mod builder;

use std::fmt;

use chrono::NaiveDate;

use crate::task::date::filter_date;

pub use builder::FilterBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    None,
    High,
    Medium,
    Low,
}

/// A date operand: a calendar day, or free text such as `"tomorrow"` that the
/// service interprets itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateValue {
    Day(NaiveDate),
    Text(String),
}

impl From<NaiveDate> for DateValue {
    fn from(d: NaiveDate) -> Self {
        DateValue::Day(d)
    }
}

impl From<&str> for DateValue {
    fn from(s: &str) -> Self {
        DateValue::Text(s.to_string())
    }
}

impl fmt::Display for DateValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateValue::Day(d) => f.write_str(&filter_date(*d)),
            DateValue::Text(s) => write!(f, "\"{s}\""),
        }
    }
}

/// One clause of a search expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    NameIs(String),
    ListIs(String),
    TagIs(String),
    IsTagged(bool),
    /// `true` selects completed tasks.
    Status(bool),
    Priority(Priority),
    HasNotes(bool),
    Due(DateValue),
    DueBefore(DateValue),
    DueAfter(DateValue),
    Start(DateValue),
    StartBefore(DateValue),
    StartAfter(DateValue),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn and(self, rhs: Condition) -> Condition {
        Condition::And(Box::new(self), Box::new(rhs))
    }

    pub fn or(self, rhs: Condition) -> Condition {
        Condition::Or(Box::new(self), Box::new(rhs))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// Render in the service's search syntax.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::NameIs(name) => write!(f, "name:\"{name}\""),
            Condition::ListIs(name) => write!(f, "list:\"{name}\""),
            Condition::TagIs(name) => write!(f, "tag:{name}"),
            Condition::IsTagged(v) => write!(f, "isTagged:{}", bool_text(*v)),
            Condition::Status(complete) => {
                let s = if *complete { "completed" } else { "incomplete" };
                write!(f, "status:{s}")
            }
            Condition::Priority(p) => {
                let s = match p {
                    Priority::None => "none",
                    Priority::High => "1",
                    Priority::Medium => "2",
                    Priority::Low => "3",
                };
                write!(f, "priority:{s}")
            }
            Condition::HasNotes(v) => write!(f, "hasNotes:{}", bool_text(*v)),
            Condition::Due(d) => write!(f, "due:{d}"),
            Condition::DueBefore(d) => write!(f, "dueBefore:{d}"),
            Condition::DueAfter(d) => write!(f, "dueAfter:{d}"),
            Condition::Start(d) => write!(f, "start:{d}"),
            Condition::StartBefore(d) => write!(f, "startBefore:{d}"),
            Condition::StartAfter(d) => write!(f, "startAfter:{d}"),
            Condition::And(lhs, rhs) => write!(f, "({lhs}) AND ({rhs})"),
            Condition::Or(lhs, rhs) => write!(f, "({lhs}) OR ({rhs})"),
            Condition::Not(c) => write!(f, "NOT ({c})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_or() {
        let c = Condition::NameIs("the-name".into()).and(Condition::Status(true));
        assert_eq!(c.text(), "(name:\"the-name\") AND (status:completed)");

        let c = Condition::Priority(Priority::High).or(Condition::NameIs("the-name".into()));
        assert_eq!(c.text(), "(priority:1) OR (name:\"the-name\")");
    }

    #[test]
    fn test_not_and_dates() {
        let c = Condition::Due(NaiveDate::from_ymd_opt(2021, 6, 3).unwrap().into()).not();
        assert_eq!(c.text(), "NOT (due:06/03/2021)");
        let c = Condition::StartBefore("tomorrow".into());
        assert_eq!(c.text(), "startBefore:\"tomorrow\"");
    }

    #[test]
    fn test_simple_conditions() {
        assert_eq!(Condition::TagIs("home".into()).text(), "tag:home");
        assert_eq!(Condition::IsTagged(false).text(), "isTagged:false");
        assert_eq!(Condition::HasNotes(true).text(), "hasNotes:true");
        assert_eq!(Condition::Status(false).text(), "status:incomplete");
        assert_eq!(Condition::ListIs("Work".into()).text(), "list:\"Work\"");
    }
}
