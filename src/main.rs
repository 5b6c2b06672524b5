//! Galleon CLI - render documents bound to JSON endpoints

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use url::Url;

use galleon::credential::parse_auth_list;
use galleon::logging::{self, LogLevel};
use galleon::{
    AttributeNames, BindingEngine, EventLog, FetchFailure, FixSuggestion, GalleonConfig,
    GalleonError, HttpFetcher, JsonSource, MemoryDocument, Orchestrator, PathExpression, StaticEnvironment,
};

#[derive(Parser)]
#[command(name = "galleon")]
#[command(about = "Galleon - declarative JSON-to-document binding")]
#[command(version)]
struct Cli {
    /// Log verbosity (NONE, ERROR, WARN, INFO, DEBUG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Config file (default: ~/.config/galleon/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bind a document (YAML/JSON node tree) and print the resulting HTML
    Render {
        /// Path to the document file
        document: PathBuf,

        /// Base URL for relative endpoints
        #[arg(long)]
        base_url: Option<String>,

        /// Print the event log as JSON to stderr
        #[arg(long)]
        events: bool,

        #[command(flatten)]
        credentials: CredentialArgs,
    },

    /// Resolve a path against a JSON file
    Resolve {
        /// Path to the JSON data file
        data: PathBuf,

        /// Path such as items[0].name
        path: String,
    },

    /// Fetch one endpoint and print its JSON
    Fetch {
        url: String,

        /// Credential sources, e.g. "local:token, global:getToken()"
        #[arg(long)]
        auth: Option<String>,

        #[command(flatten)]
        credentials: CredentialArgs,
    },
}

/// Page environment credentials are looked up in
#[derive(Args)]
struct CredentialArgs {
    /// Local storage entry (key=value)
    #[arg(long = "local", value_parser = parse_key_value)]
    local: Vec<(String, String)>,

    /// Session storage entry (key=value)
    #[arg(long = "session", value_parser = parse_key_value)]
    session: Vec<(String, String)>,

    /// Global value (dotted.path=value, value parsed as JSON when possible)
    #[arg(long = "global", value_parser = parse_key_value)]
    global: Vec<(String, String)>,

    /// Page URL used by query sources
    #[arg(long)]
    page_url: Option<Url>,
}

impl CredentialArgs {
    fn environment(self) -> StaticEnvironment {
        let mut env = StaticEnvironment::new();
        for (key, value) in self.local {
            env = env.with_local(key, value);
        }
        for (key, value) in self.session {
            env = env.with_session(key, value);
        }
        for (path, raw) in self.global {
            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            env = env.with_global(&path, value);
        }
        if let Some(url) = self.page_url {
            env = env.with_page_url(url);
        }
        env
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), GalleonError> {
    let cli_level = cli
        .log_level
        .as_deref()
        .map(str::parse::<LogLevel>)
        .transpose()?;
    let env_level = LogLevel::from_env()?;
    let config = load_config(cli.config.as_deref())?;
    let file_level = config.log_level;
    let config = config.with_env()?;

    match cli.command {
        Commands::Render {
            document,
            base_url,
            events,
            credentials,
        } => {
            let mut config = config;
            if let Some(url) = base_url {
                config.base_url = Some(url);
            }
            // Read async to not block the runtime
            let source = tokio::fs::read_to_string(&document).await?;
            let mut doc = MemoryDocument::from_yaml_str(&source)?;
            let names = AttributeNames::new(&config.attribute_prefix);
            let doc_level = LogLevel::from_document(&doc, &names)?;
            logging::init(logging::effective_level(&[
                cli_level, env_level, doc_level, file_level,
            ]));

            render(&config, &mut doc, credentials.environment(), events).await
        }
        Commands::Resolve { data, path } => {
            logging::init(logging::effective_level(&[cli_level, env_level, file_level]));
            resolve(&data, &path)
        }
        Commands::Fetch {
            url,
            auth,
            credentials,
        } => {
            logging::init(logging::effective_level(&[cli_level, env_level, file_level]));
            let fetcher = HttpFetcher::from_config(&config, Arc::new(credentials.environment()))?;
            let sources = match auth.as_deref().map(parse_auth_list) {
                Some(None) => {
                    return Err(GalleonError::Fetch {
                        endpoint: url,
                        failure: FetchFailure::AuthRequiredMissing,
                    })
                }
                Some(Some(sources)) => sources,
                None => Vec::new(),
            };
            let value = fetcher
                .fetch(&url, &sources)
                .await
                .map_err(|failure| GalleonError::Fetch {
                    endpoint: url.clone(),
                    failure,
                })?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<GalleonConfig, GalleonError> {
    match path {
        Some(path) => GalleonConfig::load_from(path),
        None => GalleonConfig::load(),
    }
}

async fn render(
    config: &GalleonConfig,
    doc: &mut MemoryDocument,
    environment: StaticEnvironment,
    print_events: bool,
) -> Result<(), GalleonError> {
    let fetcher = HttpFetcher::from_config(config, Arc::new(environment))?;
    let engine = BindingEngine::from_config(config, EventLog::new());
    let log = Orchestrator::new(fetcher, engine).run(doc).await;

    println!("{}", doc.to_html());

    for event in log.problems() {
        eprintln!("{} {}", "⚠".yellow(), serde_json::to_string(&event.kind)?);
    }
    if print_events {
        eprintln!("{}", serde_json::to_string_pretty(&log.to_json())?);
    }
    Ok(())
}

fn resolve(data: &Path, path: &str) -> Result<(), GalleonError> {
    let root: Value = serde_json::from_str(&std::fs::read_to_string(data)?)?;
    let expression = PathExpression::parse(path)?;

    match expression.apply(&root) {
        Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
        None => println!("undefined"),
    }
    Ok(())
}
