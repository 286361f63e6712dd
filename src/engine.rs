//! Execution boundary.
//!
//! sqlbind renders SQL; running it belongs to whatever driver the caller
//! uses. [`Executor`] is the seam: anything that can take `(sql, values)`.
//! Connections and transactions stay on the caller's side.

use tracing::debug;

use crate::dialect::{Dialect, Renderer};
use crate::error::SqlbindResult;
use crate::params::ParamStyle;
use crate::query::Query;
use crate::value::Value;

/// Something that executes rendered SQL.
pub trait Executor {
    type Output;

    fn execute(&self, sql: &str, values: &[Value]) -> SqlbindResult<Self::Output>;
}

impl<F, T> Executor for F
where
    F: Fn(&str, &[Value]) -> SqlbindResult<T>,
{
    type Output = T;

    fn execute(&self, sql: &str, values: &[Value]) -> SqlbindResult<T> {
        self(sql, values)
    }
}

/// An executor paired with the rendering rules its driver expects.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::new(&conn, Dialect::Postgres).style(ParamStyle::Dollar);
/// let rows = session.execute(sql!("@SELECT * FROM users WHERE id = {id}", id)?)?;
/// ```
pub struct Session<'a, E: Executor> {
    executor: &'a E,
    renderer: Box<dyn Renderer>,
    style: ParamStyle,
}

impl<'a, E: Executor> Session<'a, E> {
    pub fn new(executor: &'a E, dialect: Dialect) -> Self {
        Self::with_renderer(executor, dialect.renderer())
    }

    pub fn with_renderer(executor: &'a E, renderer: Box<dyn Renderer>) -> Self {
        Self {
            executor,
            renderer,
            style: ParamStyle::default(),
        }
    }

    /// Set the parameter marker style.
    pub fn style(mut self, style: ParamStyle) -> Self {
        self.style = style;
        self
    }

    /// Get the generated SQL and values without executing.
    pub fn sql(&self, query: impl Into<Query>) -> SqlbindResult<(String, Vec<Value>)> {
        self.renderer.render(&query.into(), self.style)
    }

    /// Render `query` and hand it to the executor.
    pub fn execute(&self, query: impl Into<Query>) -> SqlbindResult<E::Output> {
        let (sql, values) = self.sql(query)?;
        debug!(
            dialect = self.renderer.name(),
            params = values.len(),
            "executing {}",
            sql
        );
        self.executor.execute(&sql, &values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::field;
    use crate::error::SqlbindError;

    #[test]
    fn test_session_renders_then_executes() {
        let conn = |sql: &str, values: &[Value]| -> SqlbindResult<(String, usize)> {
            Ok((sql.to_string(), values.len()))
        };
        let session = Session::new(&conn, Dialect::Postgres).style(ParamStyle::Dollar);

        let (sql, count) = session.execute(field("id").is_in([1, 2, 3])).unwrap();
        assert_eq!(sql, "id = ANY($1)");
        assert_eq!(count, 1);
    }

    #[test]
    fn test_render_errors_skip_execution() {
        let conn = |_: &str, _: &[Value]| -> SqlbindResult<()> {
            Err(SqlbindError::Execution("should not run".to_string()))
        };
        let session = Session::new(&conn, Dialect::Sqlite);

        let mut items: Vec<Value> = (0..11).map(Value::Int).collect();
        items.push(Value::Null);
        let err = session.execute(field("id").is_in(items)).unwrap_err();
        assert!(matches!(err, SqlbindError::UnsupportedLiteral { .. }));
    }
}
