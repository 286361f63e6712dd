//! Per-render parameter accumulation.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Parameter marker style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamStyle {
    /// `?` (SQLite, MySQL, most DB-API drivers)
    #[default]
    QMark,
    /// `$1, $2, ...` (PostgreSQL)
    Dollar,
    /// `:1, :2, ...` (Oracle)
    Numeric,
    /// `:p1, :p2, ...`
    Named,
    /// `%s` (psycopg, MySQLdb)
    Format,
}

impl ParamStyle {
    /// Marker text for the 1-based parameter `index`.
    pub fn marker(self, index: usize) -> String {
        match self {
            ParamStyle::QMark => "?".to_string(),
            ParamStyle::Dollar => format!("${}", index),
            ParamStyle::Numeric => format!(":{}", index),
            ParamStyle::Named => format!(":{}", param_name(index)),
            ParamStyle::Format => "%s".to_string(),
        }
    }
}

fn param_name(index: usize) -> String {
    format!("p{}", index)
}

/// Ordered values collected during one render.
///
/// A fresh instance belongs to exactly one render call; the Nth call to
/// [`QueryParams::compile`] corresponds to the Nth entry of [`QueryParams::values`].
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    style: ParamStyle,
    values: Vec<Value>,
}

impl QueryParams {
    pub fn new(style: ParamStyle) -> Self {
        Self {
            style,
            values: Vec::new(),
        }
    }

    /// Record `value` and return the marker to place in SQL text.
    ///
    /// The value is stored untouched; no escaping happens on this path.
    pub fn compile(&mut self, value: impl Into<Value>) -> String {
        self.values.push(value.into());
        self.style.marker(self.values.len())
    }

    pub fn style(&self) -> ParamStyle {
        self.style
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values paired with the names used by [`ParamStyle::Named`] markers.
    pub fn named(&self) -> Vec<(String, &Value)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (param_name(i + 1), v))
            .collect()
    }
}
