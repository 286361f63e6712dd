//! sqlbind: render and inspect marked SQL templates.
//!
//! # Usage
//!
//! ```bash
//! # Render with bound values
//! sqlbind render '@SELECT * FROM users WHERE id = {id}' --bind id=42
//!
//! # PostgreSQL markers
//! sqlbind render '@SELECT * FROM t WHERE a = {a}' --bind a=x --dialect postgres --style dollar
//!
//! # Show placeholders and spans
//! sqlbind explain '@SELECT {a!r}, {b}'
//!
//! # Check a module path against scope patterns
//! sqlbind scope app.billing.queries 'app.**'
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use sqlbind::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlbind")]
#[command(version)]
#[command(about = "Render marker-prefixed SQL templates with bound parameters", long_about = None)]
#[command(after_help = "EXAMPLES:
    sqlbind render '@SELECT * FROM users WHERE id = {id}' --bind id=42
    sqlbind render '@SELECT * FROM t WHERE a = {a}' -b a=x -d postgres -s dollar
    sqlbind explain '@SELECT {a!r}, {b}'
    sqlbind scope app.billing.queries 'app.**'")]
struct Cli {
    /// Config file (defaults to ./sqlbind.toml, then the user config dir)
    #[arg(short, long, global = true, env = "SQLBIND_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template to SQL and parameters
    Render {
        /// The marked template, e.g. '@SELECT {x}'
        template: String,

        /// Placeholder bindings (name=value)
        #[arg(short, long)]
        bind: Vec<String>,

        /// SQL dialect (ansi, postgres, sqlite)
        #[arg(short, long)]
        dialect: Option<Dialect>,

        /// Parameter marker style
        #[arg(short, long, value_enum)]
        style: Option<StyleArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },
    /// Parse a template and list its segments
    Explain {
        /// The marked template
        template: String,
    },
    /// Test a dotted module path against scope patterns
    Scope {
        /// Module path, e.g. app.billing.queries
        path: String,

        /// Patterns to test (defaults to the configured ones)
        patterns: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StyleArg {
    Qmark,
    Dollar,
    Numeric,
    Named,
    Format,
}

impl From<StyleArg> for ParamStyle {
    fn from(style: StyleArg) -> Self {
        match style {
            StyleArg::Qmark => ParamStyle::QMark,
            StyleArg::Dollar => ParamStyle::Dollar,
            StyleArg::Numeric => ParamStyle::Numeric,
            StyleArg::Named => ParamStyle::Named,
            StyleArg::Format => ParamStyle::Format,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "sqlbind=debug" } else { "sqlbind=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Commands::Render {
            template,
            bind,
            dialect,
            style,
            format,
        } => {
            let mut config = config;
            if let Some(dialect) = dialect {
                config.dialect = *dialect;
            }
            if let Some(style) = style {
                config.param_style = (*style).into();
            }
            render_template(&config, template, bind, *format)
        }
        Commands::Explain { template } => explain_template(&config, template),
        Commands::Scope { path, patterns } => check_scope(&config, path, patterns),
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::discover()?.unwrap_or_default()),
    }
}

fn render_template(
    config: &Config,
    source: &str,
    bindings: &[String],
    format: OutputFormat,
) -> Result<()> {
    let args = parse_bindings(bindings)?;
    let template = config.transformer()?.check(source)?;
    let checked = template.bind(&args)?;

    let renderer = config.renderer();
    let (sql, values) = renderer.render(&checked.into(), config.param_style)?;

    match format {
        OutputFormat::Json => {
            let out = serde_json::json!({
                "dialect": renderer.name(),
                "sql": sql,
                "params": values,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        OutputFormat::Table => {
            println!("{}", "Generated SQL:".green().bold());
            println!("{}", sql.white());
            if !values.is_empty() {
                println!();
                println!("{}", "Parameters:".cyan());
                for (i, value) in values.iter().enumerate() {
                    let marker = config.param_style.marker(i + 1);
                    println!(
                        "  {:<6} {} {}",
                        marker,
                        value.repr().yellow(),
                        format!("({})", value.kind()).dimmed()
                    );
                }
            }
        }
    }
    Ok(())
}

/// `name=value` pairs; values are parsed as int, float, bool, null, else text.
fn parse_bindings(bindings: &[String]) -> Result<HashMap<String, Fragment>> {
    bindings
        .iter()
        .map(|binding| {
            let (name, raw) = binding
                .split_once('=')
                .ok_or_else(|| anyhow!("invalid binding '{}': expected name=value", binding))?;
            Ok((name.trim().to_string(), Fragment::Value(parse_value(raw))))
        })
        .collect()
}

fn parse_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Float(f);
    }
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        "null" => Value::Null,
        _ => Value::Text(raw.to_string()),
    }
}

fn explain_template(config: &Config, source: &str) -> Result<()> {
    let template = config.transformer()?.check(source)?;

    println!("{}", "📋 Template Analysis".cyan().bold());
    println!();
    println!("  {} {}", "Marker:".dimmed(), config.marker.yellow());
    println!("  {} {}", "SQL text:".dimmed(), template.literal_text().white());
    println!(
        "  {} {}",
        "Placeholders:".dimmed(),
        template.placeholder_count().to_string().yellow()
    );

    for p in template.placeholders() {
        let mut extra = Vec::new();
        if let Some(conversion) = p.conversion {
            extra.push(format!("!{}", conversion.as_char()));
        }
        if let Some(spec) = &p.format_spec {
            extra.push(format!(":{}", spec));
        }
        println!(
            "    {} {} {}",
            format!("{}:{}", p.span.line, p.span.column).dimmed(),
            p.expression.green(),
            extra.join(" ").magenta()
        );
    }
    Ok(())
}

fn check_scope(config: &Config, path: &str, patterns: &[String]) -> Result<()> {
    let patterns = if patterns.is_empty() {
        config.scope.patterns.as_slice()
    } else {
        patterns
    };
    if patterns.is_empty() {
        return Err(anyhow!("no patterns given and none configured"));
    }

    let matcher = ScopeMatcher::new(patterns)?;
    for pattern in matcher.patterns() {
        let hit = pattern.matches(path);
        let mark = if hit { "✓".green() } else { "✗".red() };
        println!("  {} {}", mark, pattern);
    }

    if matcher.matches(path) {
        println!("{} {}", path.yellow(), "is in scope".green().bold());
    } else {
        println!("{} {}", path.yellow(), "is out of scope".red().bold());
    }
    Ok(())
}
