//! Dialect renderers.
//!
//! Turns templates, conditions and clauses into SQL text plus an ordered list
//! of bound values. The tree walk lives here; dialects override the pieces
//! that differ between engines (constants, membership tests, quoting).
//!
//! Values reach SQL text only through [`QueryParams::compile`], except for the
//! SQLite long-list path, which inlines numbers and quoted strings.

pub mod postgres;
pub mod sqlite;


use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::condition::{Condition, Field};
use crate::error::{SqlbindError, SqlbindResult};
use crate::params::{ParamStyle, QueryParams};
use crate::query::{Clause, Fragment, Query};
use crate::template::{CheckedTemplate, Segment};
use crate::value::Value;

pub use postgres::PostgresRenderer;
pub use sqlite::SqliteRenderer;

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[default]
    Ansi,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn renderer(&self) -> Box<dyn Renderer> {
        match self {
            Dialect::Ansi => Box::new(AnsiRenderer),
            Dialect::Postgres => Box::new(PostgresRenderer),
            Dialect::Sqlite => Box::new(SqliteRenderer::default()),
        }
    }
}

impl FromStr for Dialect {
    type Err = SqlbindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ansi" => Ok(Dialect::Ansi),
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(SqlbindError::Config(format!("unknown dialect '{}'", other))),
        }
    }
}

/// Rendering rules for one SQL engine.
///
/// Implementations are stateless apart from fixed settings and can be shared
/// across threads; all per-render state lives in the [`QueryParams`] passed in.
pub trait Renderer: Send + Sync {
    fn name(&self) -> &'static str;

    fn false_literal(&self) -> &'static str {
        "FALSE"
    }

    fn true_literal(&self) -> &'static str {
        "TRUE"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    /// Render a field, quoting only the parts that need it.
    fn field(&self, field: &Field) -> String {
        field
            .parts()
            .iter()
            .map(|part| {
                if is_plain_identifier(part) {
                    part.clone()
                } else {
                    self.quote_identifier(part)
                }
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Membership test against a non-empty list.
    ///
    /// Empty lists never reach this method; they render as
    /// [`Renderer::false_literal`].
    fn membership(
        &self,
        field: &Field,
        values: &[Value],
        params: &mut QueryParams,
    ) -> SqlbindResult<String> {
        Ok(bind_each(&self.field(field), values, params))
    }

    /// Render into an existing accumulator.
    fn render_params(&self, query: &Query, params: &mut QueryParams) -> SqlbindResult<String> {
        render_query(self, query, params)
    }

    /// Render with a fresh accumulator: `(sql, values)`.
    fn render(&self, query: &Query, style: ParamStyle) -> SqlbindResult<(String, Vec<Value>)> {
        let mut params = QueryParams::new(style);
        let sql = self.render_params(query, &mut params)?;
        trace!(
            dialect = self.name(),
            ?style,
            params = params.len(),
            "rendered query"
        );
        Ok((sql, params.into_values()))
    }
}

/// The base dialect: `TRUE`/`FALSE` constants and one marker per `IN` element.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnsiRenderer;

impl Renderer for AnsiRenderer {
    fn name(&self) -> &'static str {
        "ansi"
    }
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `field IN (?, ?, ...)` with one parameter per value.
pub(crate) fn bind_each(field: &str, values: &[Value], params: &mut QueryParams) -> String {
    let markers: Vec<String> = values.iter().map(|v| params.compile(v.clone())).collect();
    format!("{} IN ({})", field, markers.join(", "))
}

fn render_query<R: Renderer + ?Sized>(
    r: &R,
    query: &Query,
    params: &mut QueryParams,
) -> SqlbindResult<String> {
    match query {
        Query::Template(t) => render_template(r, t, params),
        Query::Condition(c) => render_condition(r, c, params),
        Query::Clause(c) => render_clause(r, c, params),
    }
}

fn render_template<R: Renderer + ?Sized>(
    r: &R,
    template: &CheckedTemplate,
    params: &mut QueryParams,
) -> SqlbindResult<String> {
    let mut sql = String::new();
    for segment in template.segments() {
        match segment {
            Segment::Literal(text) => sql.push_str(text),
            Segment::Placeholder(p) => match &p.value {
                Fragment::Value(value) => {
                    if let Some(spec) = &p.format_spec {
                        return Err(SqlbindError::FormatSpec {
                            expression: p.expression.clone(),
                            spec: format!(":{}", spec),
                        });
                    }
                    let value = match p.conversion {
                        Some(conversion) => conversion.apply(value.clone()),
                        None => value.clone(),
                    };
                    sql.push_str(&params.compile(value));
                }
                Fragment::Sql(query) => {
                    if let Some(conversion) = p.conversion {
                        return Err(SqlbindError::FormatSpec {
                            expression: p.expression.clone(),
                            spec: format!("!{}", conversion.as_char()),
                        });
                    }
                    if let Some(spec) = &p.format_spec {
                        return Err(SqlbindError::FormatSpec {
                            expression: p.expression.clone(),
                            spec: format!(":{}", spec),
                        });
                    }
                    sql.push_str(&render_query(r, query, params)?);
                }
            },
        }
    }
    Ok(sql)
}

fn render_condition<R: Renderer + ?Sized>(
    r: &R,
    condition: &Condition,
    params: &mut QueryParams,
) -> SqlbindResult<String> {
    match condition {
        Condition::Comparison { field, op, value } => Ok(format!(
            "{} {} {}",
            r.field(field),
            op.as_sql(),
            params.compile(value.clone())
        )),
        Condition::Membership { values, .. } if values.is_empty() => {
            Ok(r.false_literal().to_string())
        }
        Condition::Membership { field, values } => r.membership(field, values, params),
        Condition::IsNull { field, negated } => Ok(format!(
            "{} IS {}NULL",
            r.field(field),
            if *negated { "NOT " } else { "" }
        )),
        Condition::Conjunction(children) => join_children(r, children, true, params),
        Condition::Disjunction(children) => join_children(r, children, false, params),
        Condition::Negation(child) => Ok(format!("NOT ({})", render_condition(r, child, params)?)),
        Condition::RawFragment(template) => render_template(r, template, params),
        Condition::Constant(true) => Ok(r.true_literal().to_string()),
        Condition::Constant(false) => Ok(r.false_literal().to_string()),
    }
}

fn join_children<R: Renderer + ?Sized>(
    r: &R,
    children: &[Condition],
    conjunction: bool,
    params: &mut QueryParams,
) -> SqlbindResult<String> {
    match children {
        [] if conjunction => return Ok(r.true_literal().to_string()),
        [] => return Ok(r.false_literal().to_string()),
        [only] => return render_condition(r, only, params),
        _ => {}
    }

    let joiner = if conjunction { " AND " } else { " OR " };
    let parts = children
        .iter()
        .map(|child| {
            let sql = render_condition(r, child, params)?;
            Ok(if needs_parens(child, conjunction) {
                format!("({})", sql)
            } else {
                sql
            })
        })
        .collect::<SqlbindResult<Vec<_>>>()?;
    Ok(parts.join(joiner))
}

/// Whether `child` must be wrapped when joined under AND (`conjunction`) or OR.
fn needs_parens(child: &Condition, conjunction: bool) -> bool {
    match child {
        Condition::Disjunction(c) => conjunction && c.len() > 1,
        Condition::Conjunction(c) => !conjunction && c.len() > 1,
        Condition::RawFragment(_) => true,
        _ => false,
    }
}

fn render_clause<R: Renderer + ?Sized>(
    r: &R,
    clause: &Clause,
    params: &mut QueryParams,
) -> SqlbindResult<String> {
    match clause {
        Clause::Where(condition) if condition.is_constant(true) => Ok(String::new()),
        Clause::Where(condition) => Ok(format!("WHERE {}", render_condition(r, condition, params)?)),
        Clause::Set(assignments) if assignments.is_empty() => Ok(String::new()),
        Clause::Set(assignments) => {
            let parts: Vec<String> = assignments
                .iter()
                .map(|a| format!("{} = {}", r.field(&a.field), params.compile(a.value.clone())))
                .collect();
            Ok(format!("SET {}", parts.join(", ")))
        }
        Clause::Limit(Some(value)) => Ok(format!("LIMIT {}", params.compile(value.clone()))),
        Clause::Offset(Some(value)) => Ok(format!("OFFSET {}", params.compile(value.clone()))),
        Clause::Limit(None) | Clause::Offset(None) => Ok(String::new()),
    }
}
