//! Configuration loading.
//!
//! ```toml
//! marker = "@"
//! dialect = "sqlite"
//! param_style = "qmark"
//! sqlite_in_max_values = 10
//!
//! [scope]
//! patterns = ["app.queries.**", "tests.*"]
//! ```
//!
//! Nothing in the library reads configuration on its own; callers load a
//! [`Config`] and build transformers and renderers from it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::{Dialect, Renderer, SqliteRenderer, sqlite::IN_MAX_VALUES};
use crate::error::SqlbindResult;
use crate::params::ParamStyle;
use crate::scope::ScopeMatcher;
use crate::template::{DEFAULT_MARKER, TemplateTransformer};

/// File name looked up by [`Config::discover`].
pub const CONFIG_FILE: &str = "sqlbind.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub marker: String,
    pub dialect: Dialect,
    pub param_style: ParamStyle,
    pub sqlite_in_max_values: usize,
    pub scope: ScopeConfig,
}

/// Module paths where template rewriting is enabled.
///
/// An empty list leaves rewriting unrestricted.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScopeConfig {
    pub patterns: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            dialect: Dialect::default(),
            param_style: ParamStyle::default(),
            sqlite_in_max_values: IN_MAX_VALUES,
            scope: ScopeConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml_str(content: &str) -> SqlbindResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn load(path: impl AsRef<Path>) -> SqlbindResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading config");
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `./sqlbind.toml`, else `<config dir>/sqlbind/sqlbind.toml`.
    pub fn discover() -> SqlbindResult<Option<Self>> {
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("sqlbind").join(CONFIG_FILE));
        }
        paths
    }

    /// Scope matcher for the configured patterns, validated eagerly.
    pub fn scope_matcher(&self) -> SqlbindResult<Option<ScopeMatcher>> {
        if self.scope.patterns.is_empty() {
            return Ok(None);
        }
        ScopeMatcher::new(&self.scope.patterns).map(Some)
    }

    pub fn transformer(&self) -> SqlbindResult<TemplateTransformer> {
        let transformer = TemplateTransformer::new(self.marker.clone())?;
        Ok(match self.scope_matcher()? {
            Some(scope) => transformer.with_scope(scope),
            None => transformer,
        })
    }

    pub fn renderer(&self) -> Box<dyn Renderer> {
        match self.dialect {
            Dialect::Sqlite => Box::new(SqliteRenderer::with_in_max_values(
                self.sqlite_in_max_values,
            )),
            dialect => dialect.renderer(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqlbindError;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.marker, "@");
        assert_eq!(config.sqlite_in_max_values, 10);
        assert!(config.scope_matcher().unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            marker = "sql:"
            dialect = "sqlite"
            param_style = "named"
            sqlite_in_max_values = 3

            [scope]
            patterns = ["app.**.queries"]
            "#,
        )
        .unwrap();

        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(config.param_style, ParamStyle::Named);

        let transformer = config.transformer().unwrap();
        assert_eq!(transformer.marker(), "sql:");
        assert!(transformer
            .transform_in("app.billing.queries", "sql:SELECT 1")
            .unwrap()
            .is_template());
        assert!(!transformer
            .transform_in("app.models", "sql:SELECT 1")
            .unwrap()
            .is_template());

        assert_eq!(config.renderer().name(), "sqlite");
    }

    #[test]
    fn test_invalid_pattern_fails_at_load() {
        let config = Config::from_toml_str("[scope]\npatterns = [\"app.x*\"]").unwrap();
        assert!(matches!(
            config.transformer().unwrap_err(),
            SqlbindError::InvalidPattern { .. }
        ));
    }

    #[test]
    fn test_malformed_toml() {
        let err = Config::from_toml_str("dialect = \"oracle\"").unwrap_err();
        assert!(matches!(err, SqlbindError::Toml(_)));
    }
}
