//! Condition trees for WHERE clauses.
//!
//! Conditions are plain immutable values. Building one never touches a
//! parameter list; only a dialect renderer does, so the same tree can be
//! rendered against any dialect and parameter style.
//!
//! ```
//! use sqlbind::prelude::*;
//!
//! let enabled: Option<bool> = None;
//! let filter = and_([
//!     Some(field("registered").gt("2024-01-01")),
//!     elide(enabled, |v| field("enabled").eq(v)),
//! ]);
//! assert_eq!(render(filter).unwrap(), ("registered > ?".to_string(), vec!["2024-01-01".into()]));
//! ```

use std::ops::{BitAnd, BitOr, Not};

use crate::template::CheckedTemplate;
use crate::value::Value;

/// A column reference, possibly qualified (`users.id`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    parts: Vec<String>,
}

/// Create a field reference.
pub fn field(name: &str) -> Field {
    Field::new(name)
}

impl Field {
    pub fn new(name: &str) -> Self {
        Self {
            parts: name.split('.').map(str::to_string).collect(),
        }
    }

    pub fn parts(&self) -> &[String] {
        &self.parts
    }

    /// Qualify with a child name: `field("users").dot("id")`.
    pub fn dot(mut self, name: &str) -> Self {
        self.parts.push(name.to_string());
        self
    }

    fn compare(&self, op: Operator, value: Value) -> Condition {
        Condition::Comparison {
            field: self.clone(),
            op,
            value,
        }
    }

    /// `field = value`; a NULL value builds `field IS NULL`.
    pub fn eq(&self, value: impl Into<Value>) -> Condition {
        let value = value.into();
        if value.is_null() {
            return self.is_null();
        }
        self.compare(Operator::Eq, value)
    }

    /// `field != value`; a NULL value builds `field IS NOT NULL`.
    pub fn ne(&self, value: impl Into<Value>) -> Condition {
        let value = value.into();
        if value.is_null() {
            return self.is_not_null();
        }
        self.compare(Operator::Ne, value)
    }

    pub fn lt(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Lt, value.into())
    }

    pub fn le(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Le, value.into())
    }

    pub fn gt(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Gt, value.into())
    }

    pub fn ge(&self, value: impl Into<Value>) -> Condition {
        self.compare(Operator::Ge, value.into())
    }

    pub fn like(&self, pattern: impl Into<Value>) -> Condition {
        self.compare(Operator::Like, pattern.into())
    }

    /// Membership test (`IN`).
    pub fn is_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        Condition::Membership {
            field: self.clone(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not_in<V: Into<Value>>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        not_(self.is_in(values))
    }

    pub fn is_null(&self) -> Condition {
        Condition::IsNull {
            field: self.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Condition {
        Condition::IsNull {
            field: self.clone(),
            negated: true,
        }
    }

    /// Assignment for SET clauses.
    pub fn to(&self, value: impl Into<Value>) -> Assignment {
        Assignment {
            field: self.clone(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.parts.join("."))
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Operator {
    pub fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
        }
    }
}

/// `field = value` pair of a SET clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: Field,
    pub value: Value,
}

/// An immutable condition tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        field: Field,
        op: Operator,
        value: Value,
    },
    Membership {
        field: Field,
        values: Vec<Value>,
    },
    IsNull {
        field: Field,
        negated: bool,
    },
    Conjunction(Vec<Condition>),
    Disjunction(Vec<Condition>),
    Negation(Box<Condition>),
    /// Static SQL or a checked template, rendered as-is
    RawFragment(CheckedTemplate),
    /// What a combinator collapses to when every child was elided
    Constant(bool),
}

impl Condition {
    pub fn is_constant(&self, value: bool) -> bool {
        matches!(self, Condition::Constant(v) if *v == value)
    }
}

/// Join conditions with AND, dropping elided (`None`) entries.
///
/// Returns `Constant(true)` when nothing is left and the sole survivor when
/// only one is.
pub fn and_<I, C>(items: I) -> Condition
where
    I: IntoIterator<Item = C>,
    C: Into<Option<Condition>>,
{
    combine(items, true)
}

/// Join conditions with OR, dropping elided (`None`) entries.
///
/// Returns `Constant(false)` when nothing is left.
pub fn or_<I, C>(items: I) -> Condition
where
    I: IntoIterator<Item = C>,
    C: Into<Option<Condition>>,
{
    combine(items, false)
}

fn combine<I, C>(items: I, conjunction: bool) -> Condition
where
    I: IntoIterator<Item = C>,
    C: Into<Option<Condition>>,
{
    let mut children = Vec::new();
    for item in items.into_iter().filter_map(Into::<Option<Condition>>::into) {
        match item {
            // A fully elided group: TRUE under AND, FALSE under OR.
            Condition::Constant(value) if value == conjunction => {}
            Condition::Conjunction(nested) if conjunction => children.extend(nested),
            Condition::Disjunction(nested) if !conjunction => children.extend(nested),
            other => children.push(other),
        }
    }

    match children.len() {
        0 => Condition::Constant(conjunction),
        1 => children.remove(0),
        _ if conjunction => Condition::Conjunction(children),
        _ => Condition::Disjunction(children),
    }
}

pub fn not_(condition: Condition) -> Condition {
    Condition::Negation(Box::new(condition))
}

/// Static SQL text.
pub fn text(sql: &'static str) -> Condition {
    Condition::RawFragment(CheckedTemplate::literal(sql))
}

/// Build a clause only when its driving value is present.
///
/// `None` elides the clause entirely: it contributes no SQL text and no
/// parameters wherever it is combined.
pub fn elide<T, R>(value: Option<T>, build: impl FnOnce(T) -> R) -> Option<R> {
    value.map(build)
}

/// Keep `item` only when `enabled` holds.
pub fn cond<R>(enabled: bool, item: R) -> Option<R> {
    enabled.then_some(item)
}

impl From<CheckedTemplate> for Condition {
    fn from(template: CheckedTemplate) -> Self {
        Condition::RawFragment(template)
    }
}

impl BitAnd for Condition {
    type Output = Condition;

    fn bitand(self, rhs: Condition) -> Condition {
        and_([self, rhs])
    }
}

impl BitOr for Condition {
    type Output = Condition;

    fn bitor(self, rhs: Condition) -> Condition {
        or_([self, rhs])
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Condition {
        not_(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eq_none_is_null_check_not_elision() {
        assert_eq!(
            field("deleted_at").eq(None::<i64>),
            Condition::IsNull {
                field: field("deleted_at"),
                negated: false
            }
        );
        assert_eq!(
            field("deleted_at").ne(None::<i64>),
            field("deleted_at").is_not_null()
        );
    }

    #[test]
    fn test_and_drops_elided_children() {
        let a = field("a").eq(1);
        assert_eq!(and_([Some(a.clone()), elide(None::<i64>, |v| field("b").eq(v))]), a);
        assert_eq!(
            and_([Some(a.clone()), elide(Some(2), |v| field("b").eq(v))]),
            Condition::Conjunction(vec![a, field("b").eq(2)])
        );
    }

    #[test]
    fn test_all_elided_collapses_to_constant() {
        assert_eq!(and_(Vec::<Option<Condition>>::new()), Condition::Constant(true));
        assert_eq!(or_([None::<Condition>, None]), Condition::Constant(false));
    }

    #[test]
    fn test_nested_same_kind_flattens() {
        let (a, b, c) = (field("a").eq(1), field("b").eq(2), field("c").eq(3));
        assert_eq!(
            (a.clone() & b.clone()) & c.clone(),
            Condition::Conjunction(vec![a.clone(), b.clone(), c.clone()])
        );
        assert_eq!(
            (a.clone() | b.clone()) & c.clone(),
            Condition::Conjunction(vec![Condition::Disjunction(vec![a, b]), c])
        );
    }

    #[test]
    fn test_fully_elided_group_vanishes_from_parent() {
        let a = field("a").eq(1);
        let empty_and = and_([elide(None::<i64>, |v| field("b").eq(v))]);
        let empty_or = or_([None::<Condition>]);

        assert_eq!(and_([a.clone(), empty_and.clone()]), a);
        assert_eq!(or_([a.clone(), empty_or.clone()]), a);
        assert_eq!(and_([empty_and]), Condition::Constant(true));
        assert_eq!(
            and_([a.clone(), empty_or.clone()]),
            Condition::Conjunction(vec![a, empty_or])
        );
    }

    #[test]
    fn test_cond_flag() {
        assert_eq!(cond(false, field("a").eq(1)), None);
        assert!(cond(true, field("a").eq(1)).is_some());
    }

    #[test]
    fn test_qualified_field() {
        let f = field("users").dot("id");
        assert_eq!(f, field("users.id"));
        assert_eq!(f.to_string(), "users.id");
    }
}
