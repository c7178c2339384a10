mod config;
mod generate_cmd;
mod serve_cmd;
mod session_cmd;
#[cfg(test)]
mod test_util;

use std::path::PathBuf;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use weekplan_core::{GeminiConfig, PlanSession, SourceDocument};

use config::{RulesSource, WeekplanConfig};
use generate_cmd::{GenerateArgs, OutputFormat};

#[derive(Parser)]
#[command(
    name = "weekplan",
    about = "Turn a weekly classroom schedule into a refinable five-day activity plan"
)]
struct Cli {
    /// Model name (overrides WEEKPLAN_MODEL and the config file)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write a weekplan config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Print the structured-output response schema
    Schema,
    /// Generate a weekly plan from a schedule image or PDF
    Generate {
        /// Schedule document (image or PDF, at most 10 MiB)
        document: PathBuf,
        /// Rule-set file replacing the built-in rules
        #[arg(long)]
        rules: Option<PathBuf>,
        /// Refinement instruction, applied in order after generation (repeatable)
        #[arg(long = "refine")]
        refinements: Vec<String>,
        /// Output file (defaults to stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Render only this day (0-based)
        #[arg(long)]
        day: Option<usize>,
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Interactive session over one in-memory plan
    Session {
        /// Schedule document to attach on start
        document: Option<PathBuf>,
        /// Rule-set file replacing the built-in rules
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Serve the plan session over HTTP
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Port to listen on
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// Schedule document to attach on start
        #[arg(long)]
        document: Option<PathBuf>,
        /// Rule-set file replacing the built-in rules
        #[arg(long)]
        rules: Option<PathBuf>,
    },
    /// Print shell completions
    Completions {
        /// Target shell
        shell: Shell,
    },
}

/// Execute the `weekplan init` command: write config file.
fn cmd_init(model: Option<&str>, force: bool) -> anyhow::Result<()> {
    let path = config::config_path();

    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    let defaults = GeminiConfig::default();
    let model = model.map_or_else(|| defaults.model.clone(), str::to_string);
    let cfg = config::ConfigFile {
        backend: config::BackendSection {
            model: Some(model.clone()),
            endpoint: Some(defaults.endpoint.clone()),
            temperature: Some(defaults.temperature),
            timeout_secs: Some(defaults.timeout_secs),
            api_key: None,
        },
        rules: config::RulesSection::default(),
    };

    config::save_config(&cfg)?;

    println!("Config written to {}", path.display());
    println!("  backend.model = {model}");
    println!("  backend.endpoint = {}", defaults.endpoint);
    println!();
    println!("Next: export GEMINI_API_KEY (or set backend.api_key), then run `weekplan generate <document>`.");

    Ok(())
}

fn resolve(model: Option<&str>, rules: Option<&PathBuf>) -> anyhow::Result<WeekplanConfig> {
    let resolved = WeekplanConfig::resolve(model, rules.map(PathBuf::as_path))?;
    tracing::debug!(
        model = %resolved.gemini.model,
        endpoint = %resolved.gemini.endpoint,
        custom_rules = resolved.rules_source != RulesSource::Default,
        "configuration resolved"
    );
    Ok(resolved)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(cli.model.as_deref(), force)?;
        }
        Commands::Schema => {
            let schema = weekplan_core::schema::response_schema();
            println!("{}", serde_json::to_string_pretty(schema)?);
        }
        Commands::Generate {
            document,
            rules,
            refinements,
            output,
            day,
            format,
        } => {
            let resolved = resolve(cli.model.as_deref(), rules.as_ref())?;
            let invoker = resolved.invoker()?;
            let args = GenerateArgs {
                document,
                refinements,
                output,
                day,
                format,
            };
            generate_cmd::run_generate(&invoker, resolved.rules, args).await?;
        }
        Commands::Session { document, rules } => {
            let resolved = resolve(cli.model.as_deref(), rules.as_ref())?;
            let invoker = resolved.invoker()?;
            session_cmd::run_session(&invoker, resolved.rules, document).await?;
        }
        Commands::Serve {
            bind,
            port,
            document,
            rules,
        } => {
            let resolved = resolve(cli.model.as_deref(), rules.as_ref())?;
            let invoker = resolved.invoker()?;
            let mut session = PlanSession::new();
            session.set_rules(resolved.rules)?;
            if let Some(path) = document {
                let doc = SourceDocument::from_path(&path)
                    .with_context(|| format!("cannot use {}", path.display()))?;
                session.attach_document(doc)?;
            }
            let state = serve_cmd::AppState::new(session, invoker);
            serve_cmd::run_serve(state, &bind, port).await?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "weekplan", &mut std::io::stdout());
        }
    }

    Ok(())
}
