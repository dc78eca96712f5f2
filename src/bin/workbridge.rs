//! workbridge command-line front end
//!
//! Usage:
//!   workbridge serve                                   # Run the REST server
//!   workbridge command "show open issues in api"       # Classify and dispatch once
//!   workbridge status                                  # Check every platform
//!   workbridge sync asana github 1204561234            # Task -> issue
//!   workbridge secrets setup --github-token ghp_...    # Write vault secrets
//!   workbridge secrets get --secret-name github-token  # Check a secret (value hidden)

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use workbridge::bootstrap;
use workbridge::config::AppConfig;
use workbridge::router::SyncRequest;
use workbridge::secrets::{KeyVaultSecretStore, SecretName, SecretStore};

#[derive(Parser)]
#[command(name = "workbridge")]
#[command(about = "Route natural-language commands to Asana, GitHub and VS Code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API server
    Serve,

    /// Classify a command and dispatch it
    Command {
        /// The command text
        text: Vec<String>,

        /// JSON object forwarded to the classifier as context
        #[arg(long)]
        context: Option<String>,
    },

    /// Check every platform
    Status,

    /// Copy an entity between Asana and GitHub
    Sync {
        /// Source platform (asana or github)
        source: String,
        /// Target platform (asana or github)
        target: String,
        /// Task gid or issue number
        id: String,

        /// Target repository for asana -> github
        #[arg(long)]
        repo: Option<String>,

        /// Target project for github -> asana
        #[arg(long)]
        project: Option<String>,
    },

    /// Manage credentials in Azure Key Vault
    Secrets {
        #[command(subcommand)]
        action: SecretsAction,

        /// Vault URL (defaults to AZURE_KEY_VAULT_URL)
        #[arg(long, global = true)]
        key_vault_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum SecretsAction {
    /// Store platform credentials; prompts for any not given as flags
    Setup {
        #[arg(long)]
        asana_token: Option<String>,
        #[arg(long)]
        github_token: Option<String>,
        #[arg(long)]
        openai_key: Option<String>,
        #[arg(long)]
        anthropic_key: Option<String>,
    },

    /// List secret names
    List,

    /// Check that a secret exists (the value is never printed)
    Get {
        #[arg(long)]
        secret_name: String,
    },

    /// Delete a secret
    Delete {
        #[arg(long)]
        secret_name: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,workbridge=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    match cli.command {
        Commands::Serve => {
            workbridge::api::serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Command { text, context } => {
            let command = text.join(" ");
            let context: Option<Value> = context
                .map(|c| serde_json::from_str(&c))
                .transpose()
                .context("--context must be valid JSON")?;
            let assistant = bootstrap::build_assistant(&config).await;
            let result = assistant.process_command(&command, context.as_ref()).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        Commands::Status => {
            let assistant = bootstrap::build_assistant(&config).await;
            let report = assistant.status().await;
            print_json(&report)?;
            Ok(exit_code(report.all_available()))
        }
        Commands::Sync {
            source,
            target,
            id,
            repo,
            project,
        } => {
            let mut request = SyncRequest::new(source, target, id);
            if let Some(repo) = repo {
                request
                    .additional_params
                    .insert("repo_name".into(), Value::String(repo));
            }
            if let Some(project) = project {
                request
                    .additional_params
                    .insert("project_gid".into(), Value::String(project));
            }
            let assistant = bootstrap::build_assistant(&config).await;
            let result = assistant.sync(request).await;
            print_json(&result)?;
            Ok(exit_code(result.success))
        }
        Commands::Secrets {
            action,
            key_vault_url,
        } => {
            let url = key_vault_url
                .or_else(|| config.vault.url.clone())
                .context("No Key Vault URL: pass --key-vault-url or set AZURE_KEY_VAULT_URL")?;
            let store = KeyVaultSecretStore::from_config(&url, &config.vault, config.http_timeout)?;
            let prefix = config.vault.secret_prefix.clone().unwrap_or_default();
            run_secrets(&store, &prefix, action).await
        }
    }
}

/// `prefix` is prepended to the well-known names written by `setup`
async fn run_secrets(store: &dyn SecretStore, prefix: &str, action: SecretsAction) -> Result<ExitCode> {
    match action {
        SecretsAction::Setup {
            asana_token,
            github_token,
            openai_key,
            anthropic_key,
        } => {
            let provided = [
                (SecretName::ASANA_ACCESS_TOKEN, asana_token),
                (SecretName::GITHUB_TOKEN, github_token),
                (SecretName::OPENAI_API_KEY, openai_key),
                (SecretName::ANTHROPIC_API_KEY, anthropic_key),
            ];
            let interactive = provided.iter().all(|(_, value)| value.is_none());

            let mut written = 0;
            for (secret, value) in provided {
                let value = match value {
                    Some(value) => Some(value),
                    None if interactive => prompt(&format!("{} (blank to skip): ", secret.env_var))?,
                    None => None,
                };
                let Some(value) = value else {
                    continue;
                };
                let name = format!("{}{}", prefix, secret.vault_name);
                store.set_secret(&name, &value).await?;
                println!("{} {}", "set".green(), name);
                written += 1;
            }
            if written == 0 {
                println!("No secrets to set up");
            }
            Ok(ExitCode::SUCCESS)
        }
        SecretsAction::List => {
            let names = store.list_secrets().await?;
            if names.is_empty() {
                println!("No secrets found in {}", store.store_name());
            }
            for name in names {
                println!("{}", name);
            }
            Ok(ExitCode::SUCCESS)
        }
        SecretsAction::Get { secret_name } => match store.get_secret(&secret_name).await? {
            Some(value) => {
                println!(
                    "{} '{}' ({} characters, value hidden)",
                    "found".green(),
                    secret_name,
                    value.chars().count()
                );
                Ok(ExitCode::SUCCESS)
            }
            None => {
                println!("{} '{}'", "not found".red(), secret_name);
                Ok(ExitCode::FAILURE)
            }
        },
        SecretsAction::Delete { secret_name, yes } => {
            if !yes {
                let answer = prompt(&format!("Delete '{}'? (y/N): ", secret_name))?;
                if !matches!(answer.as_deref(), Some("y" | "Y" | "yes")) {
                    println!("Deletion cancelled");
                    return Ok(ExitCode::SUCCESS);
                }
            }
            store.delete_secret(&secret_name).await?;
            println!("{} {}", "deleted".yellow(), secret_name);
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Read one trimmed line from stdin; `None` when blank
fn prompt(message: &str) -> Result<Option<String>> {
    print!("{}", message);
    io::stdout().flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("stdin closed");
    }
    let line = line.trim();
    Ok((!line.is_empty()).then(|| line.to_string()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

