use anyhow::Result;
use azsqlctl_core::config::Config;
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{Cli, Commands};
use commands::pipeline::RunOptions;
use connection::ConnectionManager;
use error::AzSqlCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let conn_mgr = match load_config(&cli) {
        Ok(conn_mgr) => conn_mgr,
        Err(e) => {
            e.print_diagnostic();
            std::process::exit(1);
        }
    };

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

/// Load configuration from the specified path or the default location
fn load_config(cli: &Cli) -> Result<ConnectionManager, AzSqlCtlError> {
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    Ok(ConnectionManager::with_config_path(config, config_path))
}

fn init_tracing(verbose: u8) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "azsqlctl=warn,azsqlctl_core=warn",
            1 => "azsqlctl=info,azsqlctl_core=info",
            2 => "azsqlctl=debug,azsqlctl_core=debug",
            _ => "azsqlctl=trace,azsqlctl_core=trace,tiberius=debug",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), AzSqlCtlError> {
    trace!("Executing command: {:?}", cli.command);
    info!("Command: {}", format_command(&cli.command));

    let profile = cli.profile.as_deref();
    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Version => {
            debug!("Showing version information");
            match output::OutputFormat::structured(cli.output) {
                Some(fmt) => {
                    let output_data = serde_json::json!({
                        "version": env!("CARGO_PKG_VERSION"),
                        "name": env!("CARGO_PKG_NAME"),
                    });
                    output::print_output(&output_data, fmt)?;
                }
                None => {
                    println!("azsqlctl {}", env!("CARGO_PKG_VERSION"));
                }
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
        Commands::Profile(profile_cmd) => {
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, profile, cli.output)
                .await
        }
        Commands::Run {
            best_effort,
            keep,
            order_id,
            parent_id,
        } => {
            let options = RunOptions {
                best_effort: *best_effort,
                keep: *keep,
                order_id: *order_id,
                parent_id: *parent_id,
            };
            commands::pipeline::handle_run(conn_mgr, profile, options, cli.output).await
        }
        Commands::Provision { best_effort } => {
            commands::provision::handle_provision(conn_mgr, profile, *best_effort, cli.output)
                .await
        }
        Commands::Deprovision => {
            commands::provision::handle_deprovision(conn_mgr, profile, cli.output).await
        }
        Commands::Connect => commands::data::handle_connect(conn_mgr, profile, cli.output).await,
        Commands::Insert { parent_id, name } => {
            commands::data::handle_insert(
                conn_mgr,
                profile,
                *parent_id,
                name.as_deref(),
                cli.output,
            )
            .await
        }
        Commands::Query { order_id } => {
            commands::data::handle_query(conn_mgr, profile, *order_id, cli.output).await
        }
        Commands::Proc { order_id } => {
            commands::data::handle_proc(conn_mgr, profile, *order_id, cli.output).await
        }
        Commands::Orm {
            order_id,
            parent_id,
            name,
        } => {
            commands::data::handle_orm(
                conn_mgr,
                profile,
                *order_id,
                *parent_id,
                name.as_deref(),
                cli.output,
            )
            .await
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }

    result
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging
fn format_command(command: &Commands) -> String {
    match command {
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name.as_deref().unwrap_or("")),
                Validate => "profile validate".to_string(),
                Remove { name } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
            }
        }
        Commands::Run {
            best_effort, keep, ..
        } => format!("run (best_effort={}, keep={})", best_effort, keep),
        Commands::Provision { best_effort } => format!("provision (best_effort={})", best_effort),
        Commands::Deprovision => "deprovision".to_string(),
        Commands::Connect => "connect".to_string(),
        Commands::Insert { parent_id, .. } => format!("insert --parent-id {}", parent_id),
        Commands::Query { order_id } => format!("query --order-id {}", order_id),
        Commands::Proc { order_id } => format!("proc --order-id {}", order_id),
        Commands::Orm { order_id, .. } => format!("orm --order-id {}", order_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_format_command_run() {
        let cli = Cli::parse_from(["azsqlctl", "run", "--keep"]);
        assert_eq!(
            format_command(&cli.command),
            "run (best_effort=false, keep=true)"
        );
    }

    #[test]
    fn test_proc_alias_parses() {
        let cli = Cli::parse_from(["azsqlctl", "procedure", "--order-id", "71774"]);
        assert!(matches!(cli.command, Commands::Proc { order_id: 71774 }));
    }
}
