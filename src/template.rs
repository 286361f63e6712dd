//! Marker-prefixed templates.
//!
//! A template goes through two stages:
//!
//! 1. [`TemplateTransformer::transform`] checks the marker and parses the
//!    body once into a [`Template`] of literal and placeholder segments.
//!    Sources without the marker are left alone as [`Transformed::Plain`].
//! 2. [`Template::evaluate`] asks the caller for each placeholder's value,
//!    in source order, and yields a [`CheckedTemplate`] that can be rendered.
//!
//! Only the second stage runs per call. Plain text never becomes a
//! [`CheckedTemplate`]: the checked constructor rejects it before any
//! placeholder is evaluated.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use serde::Serialize;
use tracing::debug;

use crate::error::{SqlbindError, SqlbindResult, line_column};
use crate::parser;
use crate::query::Fragment;
use crate::scope::ScopeMatcher;
use crate::value::Value;

/// Default marker: `@SELECT ...`.
pub const DEFAULT_MARKER: &str = "@";

/// Position of a placeholder expression in its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// Byte offset
    pub offset: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column, in chars
    pub column: usize,
}

impl Span {
    pub(crate) fn at(source: &str, offset: usize) -> Self {
        let (line, column) = line_column(source, offset);
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Placeholder conversion: `!s`, `!r` or `!a`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Conversion {
    Str,
    Repr,
    Ascii,
}

impl Conversion {
    pub fn as_char(self) -> char {
        match self {
            Conversion::Str => 's',
            Conversion::Repr => 'r',
            Conversion::Ascii => 'a',
        }
    }

    /// Turn a value into the text the conversion describes.
    pub fn apply(self, value: Value) -> Value {
        match self {
            Conversion::Str => match value {
                Value::Text(s) => Value::Text(s),
                other => Value::Text(other.to_string()),
            },
            Conversion::Repr => Value::Text(value.repr()),
            Conversion::Ascii => Value::Text(ascii_escape(&value.repr())),
        }
    }
}

fn ascii_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c as u32 {
            0..=0x7f => out.push(c),
            n @ 0x80..=0xff => out.push_str(&format!("\\x{:02x}", n)),
            n @ 0x100..=0xffff => out.push_str(&format!("\\u{:04x}", n)),
            n => out.push_str(&format!("\\U{:08x}", n)),
        }
    }
    out
}

/// A placeholder with its value and formatting metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder<T> {
    /// Expression text for parsed templates, the evaluated value afterwards
    pub value: T,
    /// Source text of the expression
    pub expression: String,
    pub conversion: Option<Conversion>,
    pub format_spec: Option<String>,
    pub span: Span,
}

impl<T> Placeholder<T> {
    /// Error for a placeholder whose expression has no value.
    pub fn unbound(&self) -> SqlbindError {
        SqlbindError::unbound(&self.expression, self.span.line, self.span.column)
    }

    fn with_value<U>(&self, value: U) -> Placeholder<U> {
        Placeholder {
            value,
            expression: self.expression.clone(),
            conversion: self.conversion,
            format_spec: self.format_spec.clone(),
            span: self.span,
        }
    }
}

/// One piece of a template.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment<T> {
    Literal(String),
    Placeholder(Placeholder<T>),
}

/// A parsed, marker-verified template whose placeholders hold expression text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    segments: Vec<Segment<String>>,
}

impl Template {
    pub fn segments(&self) -> &[Segment<String>] {
        &self.segments
    }

    /// Placeholders in source order.
    pub fn placeholders(&self) -> impl Iterator<Item = &Placeholder<String>> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(p) => Some(p),
            Segment::Literal(_) => None,
        })
    }

    pub fn placeholder_count(&self) -> usize {
        self.placeholders().count()
    }

    /// The static text with placeholders removed.
    pub fn literal_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Literal(text) => Some(text.as_str()),
                Segment::Placeholder(_) => None,
            })
            .collect()
    }

    /// Append `other`, merging touching literals.
    pub fn concat(mut self, other: Template) -> Template {
        for segment in other.segments {
            if let (Some(Segment::Literal(head)), Segment::Literal(tail)) =
                (self.segments.last_mut(), &segment)
            {
                head.push_str(tail);
                continue;
            }
            self.segments.push(segment);
        }
        self
    }

    /// Evaluate every placeholder in source order.
    ///
    /// `eval` is called exactly once per placeholder, left to right; the
    /// first error stops evaluation.
    pub fn evaluate<F>(&self, mut eval: F) -> SqlbindResult<CheckedTemplate>
    where
        F: FnMut(&Placeholder<String>) -> SqlbindResult<Fragment>,
    {
        let segments = self
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => Ok(Segment::Literal(text.clone())),
                Segment::Placeholder(p) => Ok(Segment::Placeholder(p.with_value(eval(p)?))),
            })
            .collect::<SqlbindResult<Vec<_>>>()?;
        Ok(CheckedTemplate { segments })
    }

    /// Evaluate placeholders by looking their expressions up in `args`.
    pub fn bind<K>(&self, args: &HashMap<K, Fragment>) -> SqlbindResult<CheckedTemplate>
    where
        K: Borrow<str> + Eq + Hash,
    {
        self.evaluate(|p| args.get(p.value.as_str()).cloned().ok_or_else(|| p.unbound()))
    }
}

/// A template proven to come from a marked source, with evaluated placeholders.
///
/// There is no constructor from arbitrary text; see [`CheckedTemplate::literal`]
/// for static SQL.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CheckedTemplate {
    segments: Vec<Segment<Fragment>>,
}

impl CheckedTemplate {
    /// A template made of one static literal.
    pub fn literal(sql: &'static str) -> Self {
        Self {
            segments: vec![Segment::Literal(sql.to_string())],
        }
    }

    pub fn segments(&self) -> &[Segment<Fragment>] {
        &self.segments
    }

    pub fn placeholder_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder(_)))
            .count()
    }
}

/// Result of transforming a source string.
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// Marked source, parsed into segments
    Template(Template),
    /// Source left untouched: no marker, or outside the configured scope
    Plain { text: String, marker: String },
}

impl Transformed {
    /// The checked constructor: fails with "prefixed template required" on plain text.
    pub fn into_template(self) -> SqlbindResult<Template> {
        match self {
            Transformed::Template(t) => Ok(t),
            Transformed::Plain { marker, .. } => Err(SqlbindError::MarkerRequired { marker }),
        }
    }

    pub fn as_template(&self) -> SqlbindResult<&Template> {
        match self {
            Transformed::Template(t) => Ok(t),
            Transformed::Plain { marker, .. } => Err(SqlbindError::MarkerRequired {
                marker: marker.clone(),
            }),
        }
    }

    pub fn is_template(&self) -> bool {
        matches!(self, Transformed::Template(_))
    }
}

/// Rewrites marker-prefixed sources into templates.
#[derive(Debug, Clone)]
pub struct TemplateTransformer {
    marker: String,
    scope: Option<ScopeMatcher>,
}

impl Default for TemplateTransformer {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            scope: None,
        }
    }
}

impl TemplateTransformer {
    pub fn new(marker: impl Into<String>) -> SqlbindResult<Self> {
        let marker = marker.into();
        if marker.is_empty() || marker.contains(['{', '}']) {
            return Err(SqlbindError::InvalidMarker(marker));
        }
        Ok(Self {
            marker,
            scope: None,
        })
    }

    /// Restrict rewriting to module paths matched by `scope`.
    pub fn with_scope(mut self, scope: ScopeMatcher) -> Self {
        self.scope = Some(scope);
        self
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }

    pub fn scope(&self) -> Option<&ScopeMatcher> {
        self.scope.as_ref()
    }

    /// Parse `source` if it starts with the marker.
    pub fn transform(&self, source: &str) -> SqlbindResult<Transformed> {
        if !source.starts_with(&self.marker) {
            return Ok(self.plain(source.to_string()));
        }

        let segments = parser::parse_body(source, self.marker.len()..source.len())?;
        let template = Template { segments };
        debug!(
            placeholders = template.placeholder_count(),
            "transformed template"
        );
        Ok(Transformed::Template(template))
    }

    /// Transform implicitly concatenated parts.
    ///
    /// Only the first part carries the marker. Each part is parsed on its own,
    /// so a placeholder never spans two parts; spans are relative to the
    /// joined text.
    pub fn transform_parts(&self, parts: &[&str]) -> SqlbindResult<Transformed> {
        let joined = parts.concat();
        if !parts.first().is_some_and(|first| first.starts_with(&self.marker)) {
            return Ok(self.plain(joined));
        }

        let mut template = Template::default();
        let mut start = self.marker.len();
        let mut end = 0;
        for part in parts {
            end += part.len();
            let segments = parser::parse_body(&joined, start..end)?;
            template = template.concat(Template { segments });
            start = end;
        }

        debug!(
            parts = parts.len(),
            placeholders = template.placeholder_count(),
            "transformed concatenated template"
        );
        Ok(Transformed::Template(template))
    }

    /// Transform `source` on behalf of `module_path`.
    ///
    /// Outside the configured scope the source stays plain text.
    pub fn transform_in(&self, module_path: &str, source: &str) -> SqlbindResult<Transformed> {
        if let Some(scope) = &self.scope {
            if !scope.matches(module_path) {
                debug!(module = module_path, "module outside template scope");
                return Ok(self.plain(source.to_string()));
            }
        }
        self.transform(source)
    }

    /// Transform and require a template in one step.
    pub fn check(&self, source: &str) -> SqlbindResult<Template> {
        self.transform(source)?.into_template()
    }

    fn plain(&self, text: String) -> Transformed {
        Transformed::Plain {
            text,
            marker: self.marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn values(checked: &CheckedTemplate) -> Vec<Fragment> {
        checked
            .segments()
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(p) => Some(p.value.clone()),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_simple() {
        let template = TemplateTransformer::default().check("@SELECT {name}").unwrap();
        let checked = template
            .evaluate(|_| Ok(Fragment::from("zoom")))
            .unwrap();

        assert_eq!(checked.segments().len(), 2);
        assert_eq!(checked.segments()[0], Segment::Literal("SELECT ".to_string()));
        assert_eq!(values(&checked), vec![Fragment::from("zoom")]);
    }

    #[test]
    fn test_unmarked_template_is_rejected_without_evaluation() {
        let transformer = TemplateTransformer::default();
        let transformed = transformer.transform("SELECT {name}").unwrap();
        assert!(!transformed.is_template());

        let calls = Cell::new(0);
        let result = transformed
            .as_template()
            .and_then(|t| t.evaluate(|_| {
                calls.set(calls.get() + 1);
                Ok(Fragment::from(1))
            }));

        let err = result.unwrap_err();
        assert!(err.to_string().contains("prefixed template required"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_placeholders_evaluated_in_source_order() {
        let template = TemplateTransformer::default()
            .check("@SELECT {a} FROM t WHERE x = {b} AND y = {c}")
            .unwrap();
        let mut seen = Vec::new();
        let checked = template
            .evaluate(|p| {
                seen.push(p.value.clone());
                Ok(Fragment::from(seen.len() as i64))
            })
            .unwrap();

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(checked.placeholder_count(), 3);
        assert_eq!(
            values(&checked),
            vec![Fragment::from(1i64), Fragment::from(2i64), Fragment::from(3i64)]
        );
    }

    #[test]
    fn test_literal_text_reproduces_static_text() {
        let template = TemplateTransformer::default()
            .check("@SELECT {a} FROM t WHERE x = {b}")
            .unwrap();
        assert_eq!(template.literal_text(), "SELECT  FROM t WHERE x = ");
    }

    #[test]
    fn test_custom_marker() {
        let transformer = TemplateTransformer::new("sql:").unwrap();
        assert!(transformer.transform("sql:SELECT {x}").unwrap().is_template());
        assert!(!transformer.transform("@SELECT {x}").unwrap().is_template());

        assert!(TemplateTransformer::new("").is_err());
        assert!(TemplateTransformer::new("{").is_err());
    }

    #[test]
    fn test_bind_by_name() {
        let template = TemplateTransformer::default()
            .check("@SELECT * FROM users WHERE id = {id}")
            .unwrap();

        let mut args = HashMap::new();
        args.insert("id", Fragment::from(7));
        let checked = template.bind(&args).unwrap();
        assert_eq!(values(&checked), vec![Fragment::from(7)]);

        let err = template.bind(&HashMap::<&str, Fragment>::new()).unwrap_err();
        assert!(matches!(err, SqlbindError::Unbound { .. }));
    }

    #[test]
    fn test_transform_parts_preserves_order() {
        let transformer = TemplateTransformer::default();
        let template = transformer
            .transform_parts(&["@SELECT {a} ", "FROM t ", "WHERE x = {b}"])
            .unwrap()
            .into_template()
            .unwrap();

        let names: Vec<&str> = template.placeholders().map(|p| p.value.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(template.segments()[2], Segment::Literal(" FROM t WHERE x = ".to_string()));
        assert_eq!(template.placeholders().nth(1).unwrap().span.offset, 30);

        let plain = transformer.transform_parts(&["SELECT ", "@{a}"]).unwrap();
        assert!(!plain.is_template());
    }

    #[test]
    fn test_placeholder_cannot_span_parts() {
        let transformer = TemplateTransformer::default();
        assert!(transformer.transform_parts(&["@SELECT {a", "}"]).is_err());
    }

    #[test]
    fn test_scope_gates_rewriting() {
        let scope = ScopeMatcher::new(["app.queries.*"]).unwrap();
        let transformer = TemplateTransformer::default().with_scope(scope);

        assert!(transformer
            .transform_in("app.queries.users", "@SELECT {x}")
            .unwrap()
            .is_template());

        let legacy = transformer.transform_in("app.models", "@SELECT {x}").unwrap();
        assert_eq!(
            legacy,
            Transformed::Plain {
                text: "@SELECT {x}".to_string(),
                marker: "@".to_string()
            }
        );
        assert!(legacy.into_template().is_err());
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Conversion::Str.apply(Value::Int(5)), Value::from("5"));
        assert_eq!(Conversion::Repr.apply(Value::from("a")), Value::from("'a'"));
        assert_eq!(Conversion::Ascii.apply(Value::from("é")), Value::from("'\\xe9'"));
    }
}
