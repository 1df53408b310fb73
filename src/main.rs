use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use frog_core::{AppConfig, EventBus, Workflow, WorkflowEvent};
use frog_engine::{
    default_workflow, execution_order, validate, ContextBuilder, RunLogger, WorkflowRunner,
};
use frog_tools::ToolRegistry;
use frog_vault::{generate_key, InMemorySecretStore, SecretCipher};

#[derive(Parser)]
#[command(name = "frog", version, about = "DAG workflow execution engine")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "frog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workflow and print its events as NDJSON
    Run {
        /// Workflow JSON file, or `-` for stdin. Omit to run the default template
        file: Option<PathBuf>,
        /// Account whose secrets are injected into the run
        #[arg(long)]
        account: Option<String>,
        /// Prompt for the default think/plan/execute template
        #[arg(long)]
        prompt: Option<String>,
    },
    /// Validate a workflow and print its execution order
    Validate {
        /// Workflow JSON file, or `-` for stdin
        file: PathBuf,
    },
    /// Start the HTTP gateway
    Serve,
    /// List registered tools and their parameter schemas
    Tools,
    /// Show current configuration
    Config,
    /// Produce key material and ciphertexts for the [vault] section
    Vault {
        #[command(subcommand)]
        action: VaultAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
enum VaultAction {
    /// Print a fresh base64 vault key
    Keygen,
    /// Encrypt a value with the configured vault key
    Encrypt {
        /// Plaintext secret
        value: String,
    },
}

/// Engine pieces shared by `run` and `serve`.
struct Runtime {
    runner: Arc<WorkflowRunner>,
    contexts: Arc<ContextBuilder>,
    event_bus: Arc<EventBus>,
}

fn build_runtime(config: &AppConfig) -> anyhow::Result<Runtime> {
    let registry = ToolRegistry::with_builtins(&config.tools)
        .with_timeout_ceiling(config.engine.tool_timeout_secs);
    info!(tools = registry.list().len(), "Tool registry ready");

    let event_bus = Arc::new(EventBus::default());
    let runner = WorkflowRunner::from_config(Arc::new(registry), &config.engine)
        .with_event_bus(event_bus.clone());

    let store = InMemorySecretStore::from_config(&config.vault)?;
    let contexts = ContextBuilder::new()
        .with_store(Arc::new(store))
        .with_shared_secrets(config.vault.shared.clone())
        .with_policy(config.engine.secret_policy);

    Ok(Runtime {
        runner: Arc::new(runner),
        contexts: Arc::new(contexts),
        event_bus,
    })
}

fn read_workflow(path: &Path) -> anyhow::Result<Workflow> {
    let content = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("cannot read workflow file {}", path.display()))?
    };
    Ok(Workflow::from_json(&content)?)
}

/// The config with secret material masked, for display.
fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if shown.vault.key.is_some() {
        shown.vault.key = Some("***".to_string());
    }
    for value in shown.vault.shared.values_mut() {
        *value = "***".to_string();
    }
    shown
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries NDJSON events, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("frog=info,warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle completions before config loading
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "frog", &mut std::io::stdout());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)?;

    match cli.command {
        Commands::Run {
            file,
            account,
            prompt,
        } => {
            let workflow = match (file, prompt) {
                (Some(path), _) => read_workflow(&path)?,
                (None, Some(prompt)) => default_workflow(&prompt),
                (None, None) => anyhow::bail!("give a workflow file or --prompt"),
            };

            let runtime = build_runtime(&config)?;
            let ctx = runtime.contexts.build(&workflow, account.as_deref()).await?;

            let cancel = CancellationToken::new();
            let logger = config.log.enabled.then(|| {
                RunLogger::new(config.log_dir()).spawn(
                    &runtime.event_bus,
                    ctx.request_id().clone(),
                    cancel.clone(),
                )
            });

            let mut events = runtime.runner.run(workflow, ctx);
            let mut failure = None;
            let mut stdout = std::io::stdout();
            while let Some(event) = events.next().await {
                stdout.write_all(event.to_ndjson_line().as_bytes())?;
                stdout.flush()?;
                if let WorkflowEvent::WorkflowError { error } = event {
                    failure = Some(error);
                }
            }

            if let Some(handle) = logger {
                handle.await.ok();
            }
            if let Some(error) = failure {
                anyhow::bail!("workflow failed: {}", error);
            }
        }
        Commands::Validate { file } => {
            let workflow = read_workflow(&file)?;
            validate(&workflow)?;
            let order = execution_order(&workflow)?;
            println!(
                "Workflow '{}' is valid ({} nodes)",
                workflow.name,
                workflow.nodes.len()
            );
            println!("Execution order: {}", order.join(" -> "));
        }
        Commands::Serve => {
            let runtime = build_runtime(&config)?;
            info!(bind = %config.gateway.bind, "Starting gateway");
            let mut server = frog_gateway::GatewayServer::new(
                config.gateway.clone(),
                runtime.runner,
                runtime.contexts,
                runtime.event_bus,
            );
            if config.log.enabled {
                server = server.with_run_logs(config.log_dir());
            }

            let cancel = CancellationToken::new();
            let cancel_clone = cancel.clone();

            // Graceful shutdown on Ctrl-C
            tokio::spawn(async move {
                tokio::signal::ctrl_c().await.ok();
                info!("Shutting down gateway...");
                cancel_clone.cancel();
            });

            server.run(cancel).await?;
        }
        Commands::Tools => {
            let registry = ToolRegistry::with_builtins(&config.tools);
            println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        }
        Commands::Config => {
            println!("{}", toml::to_string_pretty(&redacted(&config))?);
        }
        Commands::Vault { action } => match action {
            VaultAction::Keygen => println!("{}", generate_key()),
            VaultAction::Encrypt { value } => {
                let key = config
                    .vault
                    .key
                    .as_deref()
                    .context("no vault key configured; set [vault] key or FROG_VAULT_KEY")?;
                let cipher = SecretCipher::from_base64_key(key)?;
                println!("{}", cipher.encrypt(&value)?);
            }
        },
        // Handled before config loading
        Commands::Completions { .. } => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::try_parse_from(["frog", "run", "wf.json", "--account", "acme"]).unwrap();
        match cli.command {
            Commands::Run { file, account, prompt } => {
                assert_eq!(file, Some(PathBuf::from("wf.json")));
                assert_eq!(account.as_deref(), Some("acme"));
                assert!(prompt.is_none());
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let mut config = AppConfig::default();
        config.vault.key = Some("c2VjcmV0".into());
        config
            .vault
            .shared
            .insert("OPENAI_API_KEY".into(), "sk-live".into());
        let shown = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!shown.contains("sk-live"));
        assert!(!shown.contains("c2VjcmV0"));
    }
}
