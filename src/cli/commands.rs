use std::io::Write;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use http::Method;
use serde_json::json;

use crate::loader::load_routes;
use crate::router::Router;
use crate::runtime_config::RuntimeConfig;

/// Command-line interface for piperoute
///
/// Inspects a route file: lists the table, resolves requests against it and
/// builds paths from helpers.
#[derive(Parser)]
#[command(name = "piperoute")]
#[command(about = "piperoute route table tools", long_about = None)]
pub struct Cli {
    /// Route file (YAML or JSON); defaults to `PIPEROUTE_ROUTES_FILE`
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Print the compiled routing table in match order
    Routes,
    /// Resolve a request against the table
    Match {
        /// Request method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request path
        #[arg(short, long)]
        path: String,

        /// Request host
        #[arg(long, default_value = "localhost")]
        host: String,
    },
    /// Build a path from a named helper
    Path {
        /// Helper name
        #[arg(long)]
        helper: String,

        /// Parameter as `name=value`; repeatable
        #[arg(short, long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got `{s}`"))
}

/// Execute a parsed command against a loaded router, writing to `out`.
///
/// # Errors
///
/// Write failures, unknown methods, unmatched requests and helper errors.
pub fn execute(command: &Commands, router: &Router, out: &mut impl Write) -> Result<()> {
    match command {
        Commands::Routes => {
            write!(out, "{}", router.format_routes())?;
        }
        Commands::Match { method, path, host } => {
            let method = Method::from_bytes(method.to_uppercase().as_bytes())
                .map_err(|_| anyhow!("invalid method `{method}`"))?;
            let matched = router
                .route(&method, host, path)
                .ok_or_else(|| anyhow!("no route matches {method} {host}{path}"))?;
            let report = json!({
                "index": matched.index,
                "route": matched.route.to_string(),
                "handler": matched.route.handler.to_string(),
                "pipe_through": &matched.route.pipe_through,
                "path_params": matched.path_params_map(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
        }
        Commands::Path { helper, params } => {
            let pairs: Vec<(&str, &str)> = params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            let path = router.path_for(helper, &pairs)?;
            writeln!(out, "{path}")?;
        }
    }
    Ok(())
}

/// Parse arguments, load the route file and run the command.
///
/// # Errors
///
/// Any load or command failure.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    let config = RuntimeConfig::from_env();
    let file = cli.file.clone().unwrap_or(config.routes_file);
    let router = load_routes(&file)
        .with_context(|| format!("could not load routes from {}", file.display()))?
        .with_slow_match_threshold(config.slow_match);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(&cli.command, &router, &mut out)
}
