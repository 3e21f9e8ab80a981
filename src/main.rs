use anyhow::{Context, Result};
use artprov::artifactory::auth::Credentials;
use artprov::artifactory::client::ArtifactoryClient;
use artprov::artifactory::http::{format_api_error, ApiError};
use artprov::cli::{self, Commands, ConnectionArgs, Invocation, LogLevel};
use artprov::config::{Config, ConnectionSettings};
use artprov::resource::{ResourceKind, SchemaRegistry};
use serde_json::Value;
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::MakeWriterExt;

fn setup_logging(level: LogLevel) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let Some(tracing_level) = level.to_tracing_level() else {
        return Ok(None);
    };

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("artprov {} started with log level: {:?}", env!("CARGO_PKG_VERSION"), level);
    tracing::info!("Log file: {:?}", log_path);

    Ok(Some(guard))
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("artprov").join("artprov.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".artprov").join("artprov.log");
    }
    PathBuf::from("artprov.log")
}

#[tokio::main]
async fn main() -> Result<()> {
    let registry = SchemaRegistry::builtin().context("Failed to load built-in resource schemas")?;
    let invocation = cli::parse(&registry);

    let _log_guard = setup_logging(invocation.cli.log_level)?;

    let output = match run(invocation, &registry).await {
        Ok(output) => output,
        Err(err) => {
            if let Some(api_err) = err.chain().find_map(|e| e.downcast_ref::<ApiError>()) {
                eprintln!("{}", format_api_error(api_err));
            }
            return Err(err);
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

async fn run(invocation: Invocation, registry: &SchemaRegistry) -> Result<Value> {
    let Invocation { cli: parsed, params } = invocation;
    let connection = &parsed.connection;

    match parsed.command {
        Commands::Config { action } => cli::execute_config(action, connection),
        Commands::Ldap { action } => cli::execute_ldap(&connect(connection)?, action).await,
        Commands::Apikey { action } => cli::execute_apikey(&connect(connection)?, action).await,
        Commands::Repo(args) => {
            let client = connect(connection)?;
            cli::execute_resource(&client, registry, ResourceKind::Repository, &args, &params).await
        }
        Commands::User(args) => {
            let client = connect(connection)?;
            cli::execute_resource(&client, registry, ResourceKind::User, &args, &params).await
        }
        Commands::Group(args) => {
            let client = connect(connection)?;
            cli::execute_resource(&client, registry, ResourceKind::Group, &args, &params).await
        }
        Commands::Permission(args) => {
            let client = connect(connection)?;
            cli::execute_resource(&client, registry, ResourceKind::Permission, &args, &params).await
        }
    }
}

/// Client from environment, flags and config file
fn connect(connection: &ConnectionArgs) -> Result<ArtifactoryClient> {
    let config = Config::load()?;
    let settings = ConnectionSettings::from_env(&config, &connection.into())?;
    let credentials = Credentials::from_parts(
        settings.username.clone(),
        settings.password.clone(),
        settings.api_key.clone(),
    );

    tracing::info!("Connecting to {} as {:?}", settings.url, credentials);
    ArtifactoryClient::new(&settings.url, &settings.redirect, credentials, settings.timeout)
        .context("Failed to create Artifactory client")
}
