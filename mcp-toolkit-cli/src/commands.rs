use crate::cli::{Cli, Command};
use mcp_toolkit_core::lifecycle::wait_for_termination_signal;
use mcp_toolkit_core::{AppConfig, CallableTool, ServerConfig, ShutdownCoordinator, Toolkit};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("server '{0}' is not configured")]
    UnknownServer(String),
    #[error("server '{server}' has no tool named '{tool}'")]
    UnknownTool { server: String, tool: String },
    #[error("tool arguments must be a JSON object: {0}")]
    InvalidArguments(String),
    #[error("interrupted by signal")]
    Interrupted,
}

pub async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    debug!(command = ?cli.command, config = ?cli.config, "CLI arguments parsed");
    let config = AppConfig::load(cli.config.as_deref().map(Path::new))?;
    info!(servers = ?config.server_names(), "Loaded toolkit configuration");

    let coordinator = ShutdownCoordinator::global();
    let on_signal = interrupted(&cli.command);
    let outcome = coordinator
        .run_until(execute(&config, cli.command), wait_for_termination_signal())
        .await;

    // Anything registered outside the interrupted work goes down here.
    coordinator.trigger().await;
    match outcome {
        Some(result) => result,
        None => on_signal.map_err(Into::into),
    }
}

/// Result reported when a signal stops `command`: the normal end of `watch`, a
/// failure for the one-shot commands.
fn interrupted(command: &Command) -> Result<(), CliError> {
    match command {
        Command::Watch => Ok(()),
        Command::List { .. } | Command::Call { .. } => Err(CliError::Interrupted),
    }
}

async fn execute(config: &AppConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List { server } => list(config, server.as_deref()).await,
        Command::Call { server, tool, args } => call(config, &server, &tool, &args).await,
        Command::Watch => watch(config).await,
    }
}

async fn list(config: &AppConfig, only: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    for server in select_servers(config, only)? {
        let toolkit = Toolkit::new(server);
        if let Err(err) = toolkit.initialize().await {
            warn!(server = %toolkit.name(), %err, "Skipping server");
            println!("{}: unavailable ({err})", toolkit.name());
            continue;
        }

        println!("{}:", toolkit.name());
        for tool in toolkit.tools() {
            println!("  {} - {}", tool.name(), tool.description());
            println!("    schema: {}", tool.argument_schema());
        }
        toolkit.cleanup().await;
    }
    Ok(())
}

async fn call(
    config: &AppConfig,
    server: &str,
    tool: &str,
    args: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let arguments = parse_arguments(args)?;
    let server_config = config
        .server(server)
        .cloned()
        .ok_or_else(|| CliError::UnknownServer(server.to_string()))?;

    let toolkit = Toolkit::new(server_config);
    toolkit.initialize().await?;
    let result = match toolkit.tool(tool) {
        Some(callable) => {
            println!("{}", callable.invoke(arguments).await);
            Ok(())
        }
        None => Err(CliError::UnknownTool {
            server: server.to_string(),
            tool: tool.to_string(),
        }
        .into()),
    };
    toolkit.cleanup().await;
    result
}

async fn watch(config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut toolkits = Vec::new();
    for server in &config.servers {
        let toolkit = Toolkit::new(server.clone());
        match toolkit.initialize().await {
            Ok(()) => {
                info!(
                    server = %toolkit.name(),
                    pid = ?toolkit.pid(),
                    tool_count = toolkit.tools().len(),
                    "Server ready"
                );
                toolkits.push(toolkit);
            }
            Err(err) => warn!(server = %toolkit.name(), %err, "Server failed to start"),
        }
    }
    info!(running = toolkits.len(), "Watching servers; press Ctrl-C to stop");
    std::future::pending::<()>().await;
    Ok(())
}

fn select_servers(config: &AppConfig, only: Option<&str>) -> Result<Vec<ServerConfig>, CliError> {
    match only {
        Some(name) => config
            .server(name)
            .cloned()
            .map(|server| vec![server])
            .ok_or_else(|| CliError::UnknownServer(name.to_string())),
        None => Ok(config.servers.clone()),
    }
}

fn parse_arguments(raw: &str) -> Result<Value, CliError> {
    match serde_json::from_str::<Value>(raw) {
        Ok(value @ Value::Object(_)) => Ok(value),
        Ok(other) => Err(CliError::InvalidArguments(format!("got {other}"))),
        Err(err) => Err(CliError::InvalidArguments(err.to_string())),
    }
}
