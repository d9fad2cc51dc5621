use crate::config::SettingsFile;
use crate::output::{Output, OutputFormat};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use paperless_search::prelude::*;
use paperless_search::{PAPERLESS_TOKEN_ENV, PAPERLESS_URL_ENV};
use std::path::PathBuf;
use tracing::warn;

pub mod cache;
pub mod config;
pub mod search;

#[derive(Parser, Debug)]
#[command(name = "plq")]
#[command(author, version, about = "Search a Paperless document archive", long_about = None)]
#[command(
    after_help = "Logging:\n  RUST_LOG=warn,paperless_search::http_json=trace   Log JSON requests/responses\n  RUST_LOG=info                                       Refresh and download logs\n"
)]
pub struct Cli {
    /// Paperless instance url (overrides the settings file)
    #[arg(short = 'u', long, env = PAPERLESS_URL_ENV, global = true)]
    pub url: Option<String>,

    /// API token (overrides the settings file)
    #[arg(long, env = PAPERLESS_TOKEN_ENV, hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Settings file (default: <config dir>/plq/settings.json)
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory for snapshot files (default: <cache dir>/plq)
    #[arg(long, value_name = "DIR", global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Write output to file (default: stdout)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub output: Option<PathBuf>,

    /// JSON output (default)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Table output format
    #[arg(short, long, global = true)]
    pub table: bool,

    /// Quiet mode - suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (repeat for more: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Triggered query: refreshes a stale cache, returns up to result_limit items
    Search(QueryArgs),

    /// Global query: answered from the cached snapshot only
    Global(QueryArgs),

    /// Run an action on a search result
    Run(RunArgs),

    /// Fetch all documents now and replace the cached snapshot
    Refresh,

    /// Show snapshot, scheduler and http status
    Status,

    /// Keep running with background refresh, answering queries read from stdin
    Watch(WatchArgs),

    /// Show or change persisted settings
    Config(ConfigArgs),
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Search text; words are joined with spaces
    pub text: Vec<String>,
}

impl QueryArgs {
    pub fn text(&self) -> String {
        self.text.join(" ")
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Position of the item in the search results, starting at 0
    pub index: usize,

    /// Action id: download, open, copy, copy-dl or refresh
    pub action: String,

    /// Search text
    pub text: Vec<String>,

    /// Print desktop side effects instead of performing them
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Prefix that marks a line as a triggered query; other lines are global queries
    #[arg(long, default_value = paperless_search::query::DEFAULT_TRIGGER)]
    pub trigger: String,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Set one setting
    Set { key: SettingKeyArg, value: String },
    /// Remove one setting, restoring its default
    Unset { key: SettingKeyArg },
    /// Delete the settings file
    Reset,
    /// Print the settings file path
    Path,
}

/// Setting names, as used in the settings file
#[derive(Clone, Debug)]
pub struct SettingKeyArg(pub SettingKey);

impl std::str::FromStr for SettingKeyArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.replace('-', "_").parse::<SettingKey>().map(Self).map_err(|_| {
            use strum::IntoEnumIterator;
            let names: Vec<String> = SettingKey::iter().map(|k| k.to_string()).collect();
            format!("unknown setting '{s}', expected one of: {}", names.join(", "))
        })
    }
}

pub struct AppContext {
    pub plugin: PaperlessSearch,
    pub output: Output,
}

pub async fn run(cli: Cli) -> Result<()> {
    let output = Output::new(resolve_output_format(&cli), cli.output.clone());
    let config_path = cli.config.clone().unwrap_or_else(SettingsFile::default_path);

    if let Commands::Config(args) = &cli.command {
        return config::handle(args, &config_path, &output);
    }

    let settings = resolve_settings(&cli, &config_path)?;
    let cache_dir = cli.cache_dir.clone().unwrap_or_else(default_cache_dir);
    let plugin = PaperlessSearch::new(settings, cache_dir)?;
    let ctx = AppContext { plugin, output };

    let result = match cli.command {
        Commands::Search(args) => search::handle_search(&ctx, &args).await,
        Commands::Global(args) => search::handle_global(&ctx, &args),
        Commands::Run(args) => search::handle_run(&ctx, &args).await,
        Commands::Refresh => cache::handle_refresh(&ctx).await,
        Commands::Status => cache::handle_status(&ctx).await,
        Commands::Watch(args) => cache::handle_watch(&ctx, &args).await,
        Commands::Config(_) => Ok(()),
    };
    ctx.plugin.shutdown().await;
    result
}

/// Settings from the file, with command line and environment overrides applied.
fn resolve_settings(cli: &Cli, config_path: &std::path::Path) -> Result<Settings> {
    let file = SettingsFile::load(config_path)?;
    let mut settings = Settings::load(&file);
    if let Some(url) = &cli.url {
        settings.set(SettingKey::InstanceUrl, SettingValue::String(url.clone()))?;
    }
    if let Some(token) = &cli.token {
        settings.api_token = Secret::new(token.as_str());
    }
    settings.validate()?;
    Ok(settings)
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("plq")
}

fn resolve_output_format(cli: &Cli) -> OutputFormat {
    if cli.quiet {
        OutputFormat::Quiet
    } else if cli.pretty {
        if cli.table {
            warn!("--pretty conflicts with --table. Using json pretty format");
        }
        OutputFormat::Pretty
    } else if cli.json {
        if cli.table {
            warn!("--json conflicts with --table. Using json format");
        }
        OutputFormat::Json
    } else if cli.table {
        OutputFormat::Table
    } else {
        OutputFormat::Json
    }
}
