use tracing::debug;

use crate::condition::Field;
use crate::error::{SqlbindError, SqlbindResult};
use crate::params::QueryParams;
use crate::value::Value;

use super::{Renderer, bind_each};

/// Lists longer than this are inlined instead of bound.
pub const IN_MAX_VALUES: usize = 10;

/// SQLite: `0`/`1` constants and a cap on markers per `IN` list.
///
/// Up to `in_max_values` elements are bound one marker each. Longer lists are
/// written as literals to stay clear of SQLite's host parameter limit; only
/// numbers and strings can be inlined.
#[derive(Debug, Clone, Copy)]
pub struct SqliteRenderer {
    in_max_values: usize,
}

impl Default for SqliteRenderer {
    fn default() -> Self {
        Self {
            in_max_values: IN_MAX_VALUES,
        }
    }
}

impl SqliteRenderer {
    pub fn with_in_max_values(in_max_values: usize) -> Self {
        Self { in_max_values }
    }

    pub fn in_max_values(&self) -> usize {
        self.in_max_values
    }
}

impl Renderer for SqliteRenderer {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn false_literal(&self) -> &'static str {
        "0"
    }

    fn true_literal(&self) -> &'static str {
        "1"
    }

    fn membership(
        &self,
        field: &Field,
        values: &[Value],
        params: &mut QueryParams,
    ) -> SqlbindResult<String> {
        let f = self.field(field);
        if values.len() > self.in_max_values {
            debug!(
                count = values.len(),
                limit = self.in_max_values,
                "inlining IN list literals"
            );
            return Ok(format!("{} IN ({})", f, sqlite_value_list(values)?));
        }
        Ok(bind_each(&f, values, params))
    }
}

/// Escape a value for literal embedding into SQLite SQL.
///
/// Only integers, finite floats and strings qualify; anything else is an
/// error rather than a guess.
pub fn sqlite_escape(value: &Value) -> SqlbindResult<String> {
    match value {
        Value::Text(s) => Ok(format!("'{}'", s.replace('\'', "''"))),
        Value::Int(n) => Ok(n.to_string()),
        Value::UInt(n) => Ok(n.to_string()),
        Value::Float(n) if n.is_finite() => Ok(format!("{:?}", n)),
        Value::Float(_) => Err(SqlbindError::UnsupportedLiteral {
            kind: "non-finite float",
        }),
        Value::Null | Value::Bool(_) | Value::Timestamp(_) | Value::Array(_) => {
            Err(SqlbindError::UnsupportedLiteral { kind: value.kind() })
        }
    }
}

/// Comma-separated SQLite literal list.
pub fn sqlite_value_list(values: &[Value]) -> SqlbindResult<String> {
    let escaped = values
        .iter()
        .map(sqlite_escape)
        .collect::<SqlbindResult<Vec<_>>>()?;
    Ok(escaped.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_numbers_and_strings() {
        assert_eq!(sqlite_escape(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(sqlite_escape(&Value::UInt(u64::MAX)).unwrap(), "18446744073709551615");
        assert_eq!(sqlite_escape(&Value::Float(1.0)).unwrap(), "1.0");
        assert_eq!(sqlite_escape(&Value::from("it's")).unwrap(), "'it''s'");
    }

    #[test]
    fn test_escape_rejects_other_types() {
        for value in [
            Value::Null,
            Value::Bool(true),
            Value::from(vec![1]),
            Value::Float(f64::NAN),
        ] {
            let err = sqlite_escape(&value).unwrap_err();
            assert!(err.to_string().starts_with("Invalid type"));
        }
    }

    #[test]
    fn test_value_list() {
        let values = vec![Value::Int(1), Value::from("a'b"), Value::Float(2.5)];
        assert_eq!(sqlite_value_list(&values).unwrap(), "1,'a''b',2.5");
    }
}
