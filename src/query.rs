//! Renderable SQL pieces and top-level clauses.

use chrono::NaiveDateTime;

use crate::condition::{Assignment, Condition, and_};
use crate::template::CheckedTemplate;
use crate::value::Value;

/// Anything a dialect can render.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Template(CheckedTemplate),
    Condition(Condition),
    Clause(Clause),
}

impl From<CheckedTemplate> for Query {
    fn from(t: CheckedTemplate) -> Self {
        Query::Template(t)
    }
}

impl From<Condition> for Query {
    fn from(c: Condition) -> Self {
        Query::Condition(c)
    }
}

impl From<Clause> for Query {
    fn from(c: Clause) -> Self {
        Query::Clause(c)
    }
}

/// The evaluated value of a template placeholder.
///
/// Plain values are bound as parameters; SQL pieces are rendered in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Value(Value),
    Sql(Query),
}

impl From<Query> for Fragment {
    fn from(q: Query) -> Self {
        Fragment::Sql(q)
    }
}

impl From<CheckedTemplate> for Fragment {
    fn from(t: CheckedTemplate) -> Self {
        Fragment::Sql(Query::Template(t))
    }
}

impl From<Condition> for Fragment {
    fn from(c: Condition) -> Self {
        Fragment::Sql(Query::Condition(c))
    }
}

impl From<Clause> for Fragment {
    fn from(c: Clause) -> Self {
        Fragment::Sql(Query::Clause(c))
    }
}

macro_rules! fragment_from_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Fragment {
                fn from(v: $ty) -> Self {
                    Fragment::Value(v.into())
                }
            }
        )*
    };
}

fragment_from_value!(
    Value,
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    &str,
    String,
    &String,
    NaiveDateTime,
);

impl<T: Into<Value>> From<Option<T>> for Fragment {
    fn from(opt: Option<T>) -> Self {
        Fragment::Value(opt.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Fragment {
    fn from(items: Vec<T>) -> Self {
        Fragment::Value(items.into())
    }
}

/// Top-level clauses that vanish when they have nothing to say.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// `WHERE <condition>`, empty when the condition is trivially true
    Where(Condition),
    /// `SET a = ?, b = ?`
    Set(Vec<Assignment>),
    /// `LIMIT ?`
    Limit(Option<Value>),
    /// `OFFSET ?`
    Offset(Option<Value>),
}

/// WHERE clause over the AND of `items`; elided entries are dropped.
pub fn where_<I, C>(items: I) -> Clause
where
    I: IntoIterator<Item = C>,
    C: Into<Option<Condition>>,
{
    Clause::Where(and_(items))
}

/// SET clause; elided assignments are dropped.
pub fn set_<I, A>(items: I) -> Clause
where
    I: IntoIterator<Item = A>,
    A: Into<Option<Assignment>>,
{
    Clause::Set(items.into_iter().filter_map(Into::<Option<Assignment>>::into).collect())
}

pub fn limit<V: Into<Value>>(value: Option<V>) -> Clause {
    Clause::Limit(value.map(Into::into))
}

pub fn offset<V: Into<Value>>(value: Option<V>) -> Clause {
    Clause::Offset(value.map(Into::into))
}
