//! # sqlbind: SQL templates that cannot leak values into text
//!
//! > **Mark your SQL. Bind everything else.**
//!
//! sqlbind turns marker-prefixed templates and condition trees into SQL text
//! plus an ordered list of bound values for the target dialect.
//!
//! ## Quick Example
//!
//! ```rust
//! use sqlbind::prelude::*;
//!
//! let registered = "2024-01-01";
//! let enabled: Option<bool> = None;
//! let filter = where_([
//!     Some(field("registered").gt(registered)),
//!     elide(enabled, |v| field("enabled").eq(v)),
//! ]);
//!
//! let query = sql!("@SELECT * FROM users {filter} ORDER BY registered", filter).unwrap();
//! let (text, values) = render(query).unwrap();
//! assert_eq!(text, "SELECT * FROM users WHERE registered > ? ORDER BY registered");
//! assert_eq!(values, vec![Value::from("2024-01-01")]);
//! ```
//!
//! ## Building blocks
//!
//! | Piece                  | Role                                        |
//! |------------------------|---------------------------------------------|
//! | `@"..."`               | Marked template, the only way to write SQL  |
//! | `{expr}`               | Placeholder: bound value or nested fragment |
//! | `field(..).eq(..)`     | Condition leaf                              |
//! | `and_` / `or_` / `not_`| Condition composition                       |
//! | `elide` / `cond`       | Drop a clause when there is nothing to test |
//! | `Dialect`              | ANSI, PostgreSQL or SQLite rendering        |
//! | `ParamStyle`           | `?`, `$1`, `:1`, `:p1` or `%s` markers      |

pub mod condition;
pub mod config;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod params;
pub mod parser;
pub mod query;
pub mod scope;
pub mod template;
pub mod value;

pub use error::{SqlbindError, SqlbindResult};
pub use query::{Fragment, Query};
pub use value::Value;

pub mod prelude {
    pub use crate::condition::{
        Assignment, Condition, Field, Operator, and_, cond, elide, field, not_, or_, text,
    };
    pub use crate::config::Config;
    pub use crate::dialect::{AnsiRenderer, Dialect, PostgresRenderer, Renderer, SqliteRenderer};
    pub use crate::engine::{Executor, Session};
    pub use crate::error::*;
    pub use crate::params::{ParamStyle, QueryParams};
    pub use crate::query::{Clause, Fragment, Query, limit, offset, set_, where_};
    pub use crate::scope::{ScopeMatcher, ScopePattern, match_path};
    pub use crate::template::{CheckedTemplate, Template, TemplateTransformer, Transformed};
    pub use crate::value::Value;
    pub use crate::{render, sql};
}

/// Render with the ANSI dialect and `?` markers.
///
/// # Example
///
/// ```
/// use sqlbind::{render, Value};
/// use sqlbind::condition::field;
///
/// let (sql, values) = render(field("id").is_in([1, 2])).unwrap();
/// assert_eq!(sql, "id IN (?, ?)");
/// assert_eq!(values, vec![Value::Int(1), Value::Int(2)]);
/// ```
pub fn render(query: impl Into<Query>) -> SqlbindResult<(String, Vec<Value>)> {
    use dialect::Renderer;
    dialect::AnsiRenderer.render(&query.into(), params::ParamStyle::QMark)
}

/// Build a [`template::CheckedTemplate`] from a marked literal.
///
/// Placeholders are resolved against the listed names, either captured
/// (`sql!("@... {id}", id)`) or given explicitly (`sql!("@... {id}", id = 5)`).
/// Each name is evaluated at most once, at its first placeholder, and the
/// resulting [`Fragment`] is reused for every later placeholder with that
/// name. Names no placeholder refers to are never evaluated; unlike
/// `format!`, they are not a compile error. The template is parsed on first
/// successful use at each call site and cached.
///
/// Unmarked literals fail with [`SqlbindError::MarkerRequired`] before any
/// placeholder is evaluated.
///
/// ```
/// use sqlbind::{sql, render, Value};
///
/// let id = 7;
/// let (text, values) = render(sql!("@SELECT * FROM t WHERE id = {id}", id).unwrap()).unwrap();
/// assert_eq!(text, "SELECT * FROM t WHERE id = ?");
/// assert_eq!(values, vec![Value::Int(7)]);
///
/// assert!(sql!("SELECT * FROM t WHERE id = {id}", id).is_err());
/// ```
#[macro_export]
macro_rules! sql {
    (@arg $name:ident = $value:expr) => {
        $crate::Fragment::from(::std::clone::Clone::clone(&$value))
    };
    (@arg $name:ident) => {
        $crate::Fragment::from(::std::clone::Clone::clone(&$name))
    };
    ($source:literal $(, $name:ident $(= $value:expr)?)* $(,)?) => {{
        static TRANSFORMED: ::std::sync::OnceLock<$crate::template::Transformed> =
            ::std::sync::OnceLock::new();
        let transformed = match TRANSFORMED.get() {
            Some(t) => Ok(t),
            None => $crate::template::TemplateTransformer::default()
                .transform($source)
                .map(|t| TRANSFORMED.get_or_init(|| t)),
        };
        transformed
            .and_then($crate::template::Transformed::as_template)
            .and_then(|template| {
                let mut evaluated: ::std::collections::HashMap<&'static str, $crate::Fragment> =
                    ::std::collections::HashMap::new();
                template.evaluate(|placeholder| match placeholder.value.as_str() {
                    $(stringify!($name) => Ok(evaluated
                        .entry(stringify!($name))
                        .or_insert_with(|| $crate::sql!(@arg $name $(= $value)?))
                        .clone()),)*
                    _ => Err(placeholder.unbound()),
                })
            })
    }};
}
