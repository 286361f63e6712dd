//! Template parser using nom.
//!
//! Splits a template body into literal text and placeholders.
//!
//! # Syntax Overview
//!
//! ```text
//! @SELECT * FROM users WHERE id = {user_id!r:>8} AND tag = '{{x}}'
//! ┬ ──────────┬────────────────── ───┬─── ┬ ─┬─        ──┬──
//! │           │                      │    │  │           └── Escaped braces
//! │           │                      │    │  └── Format spec
//! │           │                      │    └── Conversion (s, r, a)
//! │           │                      └── Expression
//! │           └── Literal text
//! └── Marker (checked by the transformer, not here)
//! ```

use std::ops::Range;

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_till1},
    character::complete::char,
    combinator::{cut, opt, value},
    error::{context, VerboseError, VerboseErrorKind},
    sequence::preceded,
    IResult, Offset,
};

use crate::error::{SqlbindError, SqlbindResult};
use crate::template::{Conversion, Placeholder, Segment, Span};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// A replacement field as it appears in the source.
struct Field<'a> {
    expression: &'a str,
    expression_at: &'a str,
    conversion: Option<Conversion>,
    format_spec: Option<&'a str>,
}

/// Parse `source[range]` as a template body.
///
/// Spans are reported relative to the whole of `source`.
pub fn parse_body(source: &str, range: Range<usize>) -> SqlbindResult<Vec<Segment<String>>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut rest = &source[range];

    while !rest.is_empty() {
        if let Ok((next, text)) = literal_text(rest) {
            literal.push_str(text);
            rest = next;
            continue;
        }

        if let Ok((next, brace)) = escaped_brace(rest) {
            literal.push(brace);
            rest = next;
            continue;
        }

        if rest.starts_with('}') {
            return Err(SqlbindError::parse(
                source,
                source.offset(rest),
                "single '}' is not allowed",
            ));
        }

        match replacement_field(rest) {
            Ok((next, field)) => {
                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let expression = field.expression.trim().to_string();
                segments.push(Segment::Placeholder(Placeholder {
                    value: expression.clone(),
                    expression,
                    conversion: field.conversion,
                    format_spec: field
                        .format_spec
                        .filter(|spec| !spec.is_empty())
                        .map(str::to_string),
                    span: Span::at(source, source.offset(field.expression_at)),
                }));
                rest = next;
            }
            Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
                return Err(to_error(source, e));
            }
            Err(nom::Err::Incomplete(_)) => {
                return Err(SqlbindError::parse(
                    source,
                    source.offset(rest),
                    "incomplete placeholder",
                ));
            }
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    Ok(segments)
}

/// Plain text up to the next brace.
fn literal_text(input: &str) -> PResult<&str> {
    take_till1(|c| c == '{' || c == '}')(input)
}

/// `{{` or `}}`.
fn escaped_brace(input: &str) -> PResult<char> {
    alt((value('{', tag("{{")), value('}', tag("}}"))))(input)
}

/// Parse `{expression[!conversion][:format_spec]}`.
fn replacement_field(input: &str) -> PResult<Field<'_>> {
    let (input, _) = char('{')(input)?;
    let expression_at = input;
    let (input, expression) = expression(input)?;
    let (input, conversion) = opt(preceded(
        char('!'),
        cut(context("expected conversion 's', 'r' or 'a'", conversion)),
    ))(input)?;
    let (input, format_spec) =
        opt(preceded(char(':'), take_till(|c| c == '{' || c == '}')))(input)?;
    let (input, _) = cut(context("expected '}' to close placeholder", char('}')))(input)?;

    Ok((
        input,
        Field {
            expression,
            expression_at,
            conversion,
            format_spec,
        },
    ))
}

fn conversion(input: &str) -> PResult<Conversion> {
    alt((
        value(Conversion::Str, char('s')),
        value(Conversion::Repr, char('r')),
        value(Conversion::Ascii, char('a')),
    ))(input)
}

/// Scan an expression up to a top-level `!`, `:` or `}`.
///
/// Brackets nest and quoted strings are skipped, so `{items[0]}` and
/// `{labels['a:b']}` keep their inner punctuation. `!=` is part of the
/// expression, not a conversion.
fn expression(input: &str) -> PResult<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut chars = input.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if let Some(q) = quote {
            if c == '\\' {
                chars.next();
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' if depth > 0 => depth -= 1,
            ')' | ']' => return Err(failure(&input[i..], "unbalanced closing bracket")),
            '}' | ':' if depth == 0 => return finish(input, i),
            '!' if depth == 0 && !matches!(chars.peek(), Some((_, '='))) => {
                return finish(input, i);
            }
            _ => {}
        }
    }

    let message = if quote.is_some() {
        "unterminated string in placeholder"
    } else {
        "unterminated placeholder"
    };
    Err(failure(input, message))
}

fn finish(input: &str, end: usize) -> PResult<&str> {
    let expression = &input[..end];
    if expression.trim().is_empty() {
        return Err(failure(input, "empty expression not allowed"));
    }
    Ok((&input[end..], expression))
}

fn failure<'a>(at: &'a str, message: &'static str) -> nom::Err<VerboseError<&'a str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(at, VerboseErrorKind::Context(message))],
    })
}

/// Report the innermost context attached to a nom error.
fn to_error(source: &str, e: VerboseError<&str>) -> SqlbindError {
    let located = e
        .errors
        .iter()
        .find_map(|(at, kind)| match kind {
            VerboseErrorKind::Context(message) => Some((*at, *message)),
            _ => None,
        })
        .or_else(|| e.errors.first().map(|(at, _)| (*at, "invalid placeholder")));

    match located {
        Some((at, message)) => SqlbindError::parse(source, source.offset(at), message),
        None => SqlbindError::parse(source, 0, "invalid placeholder"),
    }
}
