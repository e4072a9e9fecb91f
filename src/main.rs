// rabit-guard: policy sidecar and operator tooling

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rabit_guard::access::{generate_token, token_digest, PermissionEngine, PermissionTable, Role, Subject};
use rabit_guard::config::{GuardConfig, SessionEntry, CONFIG_PATH_ENV};
use rabit_guard::gate::AccessGate;
use rabit_guard::rate_limit::spawn_sweeper;
use rabit_guard::server::GuardServer;
use rabit_guard::utils::{env_opt, init_logging, init_logging_from_config, wait_for_shutdown_signal};
use rabit_guard::validation::{sanitize_input, validate_identifier_name_in, Locale};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "rabit-guard")]
#[command(about = "Validation and role-based authorization for the HQ platform", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the policy sidecar HTTP server
    Serve {
        /// Config file (JSON or TOML); defaults to $RABIT_GUARD_CONFIG
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the listening address
        #[arg(short, long)]
        listen: Option<SocketAddr>,
    },

    /// Validate a project or resource identifier
    CheckName {
        /// Identifier to check
        name: String,

        /// Message language (en, ar)
        #[arg(short, long, default_value = "en")]
        locale: Locale,
    },

    /// Ask whether a role may perform an action
    Can {
        /// Role name (e.g. FINANCE)
        #[arg(short, long)]
        role: Role,

        /// Action name (e.g. finance:read)
        #[arg(short, long)]
        action: String,

        /// Config file with a permission table override
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Issue a session token and print its config entry
    IssueToken {
        /// Subject identifier
        #[arg(short, long)]
        id: String,

        /// Subject role
        #[arg(short, long)]
        role: Role,
    },

    /// Strip markup and script vectors from text
    Sanitize {
        /// Text to sanitize
        text: String,
    },
}

fn load_config(path: Option<&Path>) -> Result<GuardConfig> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| env_opt(CONFIG_PATH_ENV).map(PathBuf::from));
    match path {
        Some(path) => GuardConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(GuardConfig::default()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let verbose_filter = cli.verbose.then_some("debug");

    match cli.command {
        Commands::Serve { config, listen } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if cli.verbose {
                init_logging(verbose_filter);
            } else {
                init_logging_from_config(config.logging.as_ref());
            }
            serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckName { name, locale } => {
            init_logging(Some(verbose_filter.unwrap_or("warn")));
            let result = validate_identifier_name_in(&name, locale);
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(if result.is_valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Can { role, action, config } => {
            init_logging(Some(verbose_filter.unwrap_or("warn")));
            let config = load_config(config.as_deref())?;
            let table = match &config.permissions {
                Some(permissions) => PermissionTable::from_config(permissions),
                None => PermissionTable::default(),
            };
            let engine = PermissionEngine::new(Arc::new(table));
            let subject = Subject::new("cli", role);
            let allowed = engine.can(Some(&subject), &action);
            println!("{} {} {}", role, if allowed { "may" } else { "may not" }, action);
            Ok(if allowed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::IssueToken { id, role } => {
            let token = generate_token();
            let entry = SessionEntry {
                token_sha256: token_digest(&token),
                id,
                role,
            };
            println!("token: {}", token);
            println!("session entry: {}", serde_json::to_string(&entry)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Sanitize { text } => {
            println!("{}", sanitize_input(&text));
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn serve(config: GuardConfig) -> Result<()> {
    let gate = Arc::new(AccessGate::from_config(&config)?);
    let sweeper = spawn_sweeper(Arc::clone(gate.limiter()), config.rate_limit.sweep_interval());
    let server = GuardServer::new(config.listen_addr, Arc::clone(&gate));

    info!("Starting rabit-guard on {}", config.listen_addr);
    let result = tokio::select! {
        result = server.start() => result,
        _ = wait_for_shutdown_signal() => Ok(()),
    };

    sweeper.abort();
    info!("rabit-guard stopped");
    result
}
